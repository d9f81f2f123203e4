use super::{
    disp::Framebuffer,
    error::MachineError,
    input::Keypad,
    instr::{Instruction, Opcode},
    mem::{Memory, FONT_STARTING_ADDRESS, MEMORY_SIZE, PROGRAM_STARTING_ADDRESS},
    rom::Rom,
};

use rand::{rngs::StdRng, RngCore, SeedableRng};

pub const VFLAG: usize = 15;
pub const STACK_DEPTH: usize = 16;

/// How a cycle ended.
///
/// `Blocked` means a wait-for-key found no key held: nothing was mutated,
/// the timers were not ticked, and the same instruction runs again next
/// cycle. The caller owns the poll cadence while blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { beep: bool },
    Blocked,
}

/// The whole machine state: memory, register file, call stack, framebuffer,
/// keypad and timers, owned by the caller and mutated one cycle at a time.
pub struct Machine {
    pub memory: Memory,
    pub registers: [u8; 16],
    pub index: u16,
    pub pc: u16,
    pub stack: Vec<u16>,
    pub framebuffer: Framebuffer,
    pub keypad: Keypad,
    pub delay_timer: u8,
    pub sound_timer: u8,
    rng: StdRng,
}

impl Default for Machine {
    fn default() -> Self {
        Machine {
            memory: Memory::default(),
            registers: [0; 16],
            index: 0,
            pc: PROGRAM_STARTING_ADDRESS,
            stack: Vec::with_capacity(STACK_DEPTH),
            framebuffer: Framebuffer::default(),
            keypad: Keypad::default(),
            delay_timer: 0,
            sound_timer: 0,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the machine to its power-on state and reseeds the random
    /// source. Safe to call repeatedly to restart a program.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.registers = [0; 16];
        self.index = 0;
        self.pc = PROGRAM_STARTING_ADDRESS;
        self.stack.clear();
        self.framebuffer = Framebuffer::default();
        self.keypad.clear();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.rng = StdRng::from_entropy();
    }

    pub fn load_rom(&mut self, rom: &Rom) {
        self.memory.load_program(&rom.data);
    }

    /// Runs one fetch-decode-execute cycle and then ticks the timers.
    ///
    /// An unknown opcode aborts the cycle with `pc` unchanged and the timers
    /// untouched; the error is recoverable and the machine stays usable. A
    /// blocked wait-for-key also leaves the timers alone.
    pub fn cycle(&mut self) -> Result<CycleOutcome, MachineError> {
        let word = self.memory.read_word(self.pc)?;
        let instruction = Opcode::from(word)
            .decode()
            .ok_or(MachineError::UnknownOpcode { word, pc: self.pc })?;

        log::trace!("{:#05X}: {}", self.pc, instruction);

        if !self.exec(instruction)? {
            return Ok(CycleOutcome::Blocked);
        }

        Ok(CycleOutcome::Completed { beep: self.tick_timers() })
    }

    // one decrement per completed cycle; reports the beep trigger as the
    // sound timer passes through 1
    fn tick_timers(&mut self) -> bool {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }
        if self.sound_timer > 0 {
            let beep = self.sound_timer == 1;
            self.sound_timer -= 1;
            beep
        } else {
            false
        }
    }

    // the keypad code held in Vx, which only the low 16 key slots can satisfy
    fn key_code(&self, x: u8) -> Result<u8, MachineError> {
        let code = self.registers[x as usize];
        if code > 0xF {
            return Err(MachineError::InvalidKey { code, pc: self.pc });
        }
        Ok(code)
    }

    // Every operation advances pc itself. Returns Ok(false) when the cycle
    // blocked on a key instead of completing.
    fn exec(&mut self, instruction: Instruction) -> Result<bool, MachineError> {
        match instruction {
            Instruction::ClearScreen => {
                self.framebuffer.clear();
                self.pc += 2;
            }

            Instruction::SubroutineReturn => {
                let return_address = self
                    .stack
                    .pop()
                    .ok_or(MachineError::StackUnderflow { pc: self.pc })?;
                self.pc = return_address + 2;
            }

            Instruction::Jump(address) => self.pc = address,

            Instruction::CallSubroutine(address) => {
                if self.stack.len() == STACK_DEPTH {
                    return Err(MachineError::StackOverflow { pc: self.pc });
                }
                self.stack.push(self.pc);
                self.pc = address;
            }

            Instruction::SkipIfEqualsConstant(x, value) => {
                self.pc += if self.registers[x as usize] == value { 4 } else { 2 };
            }

            Instruction::SkipIfNotEqualsConstant(x, value) => {
                self.pc += if self.registers[x as usize] != value { 4 } else { 2 };
            }

            Instruction::SkipIfEquals(x, y) => {
                self.pc += if self.registers[x as usize] == self.registers[y as usize] {
                    4
                } else {
                    2
                };
            }

            Instruction::SkipIfNotEquals(x, y) => {
                self.pc += if self.registers[x as usize] != self.registers[y as usize] {
                    4
                } else {
                    2
                };
            }

            Instruction::SetConstant(x, value) => {
                self.registers[x as usize] = value;
                self.pc += 2;
            }

            Instruction::AddConstant(x, change) => {
                self.registers[x as usize] = self.registers[x as usize].wrapping_add(change);
                self.pc += 2;
            }

            Instruction::Set(x, y) => {
                self.registers[x as usize] = self.registers[y as usize];
                self.pc += 2;
            }

            Instruction::Or(x, y) => {
                self.registers[x as usize] |= self.registers[y as usize];
                self.pc += 2;
            }

            Instruction::And(x, y) => {
                self.registers[x as usize] &= self.registers[y as usize];
                self.pc += 2;
            }

            Instruction::Xor(x, y) => {
                self.registers[x as usize] ^= self.registers[y as usize];
                self.pc += 2;
            }

            Instruction::Add(x, y) => {
                let (value, overflowed) =
                    self.registers[x as usize].overflowing_add(self.registers[y as usize]);
                self.registers[x as usize] = value;
                self.registers[VFLAG] = overflowed as u8;
                self.pc += 2;
            }

            Instruction::Sub(x, y, x_minus_y) => {
                let (value, overflowed) = if x_minus_y {
                    self.registers[x as usize].overflowing_sub(self.registers[y as usize])
                } else {
                    self.registers[y as usize].overflowing_sub(self.registers[x as usize])
                };
                self.registers[x as usize] = value;
                self.registers[VFLAG] = !overflowed as u8; // VF is 0 on borrow instead of 1 like Add
                self.pc += 2;
            }

            Instruction::Shift(x, right) => {
                let bits = self.registers[x as usize];
                if right {
                    self.registers[x as usize] = bits >> 1;
                    self.registers[VFLAG] = bits & 1;
                } else {
                    self.registers[x as usize] = bits << 1;
                    self.registers[VFLAG] = bits >> 7;
                }
                self.pc += 2;
            }

            Instruction::SetIndex(address) => {
                self.index = address;
                self.pc += 2;
            }

            Instruction::JumpWithOffset(address) => {
                self.pc = address + self.registers[0] as u16;
            }

            Instruction::GenerateRandom(x, bound) => {
                self.registers[x as usize] = (self.rng.next_u32() & bound as u32) as u8;
                self.pc += 2;
            }

            Instruction::Draw(x, y, height) => {
                self.exec_draw(x, y, height)?;
                self.pc += 2;
            }

            Instruction::SkipIfKeyDown(x) => {
                let code = self.key_code(x)?;
                self.pc += if self.keypad.is_down(code) { 4 } else { 2 };
            }

            Instruction::SkipIfKeyNotDown(x) => {
                let code = self.key_code(x)?;
                self.pc += if self.keypad.is_down(code) { 2 } else { 4 };
            }

            Instruction::GetDelayTimer(x) => {
                self.registers[x as usize] = self.delay_timer;
                self.pc += 2;
            }

            Instruction::WaitForKey(x) => {
                let Some(code) = self.keypad.first_down() else {
                    return Ok(false);
                };
                self.registers[x as usize] = code;
                self.pc += 2;
            }

            Instruction::SetDelayTimer(x) => {
                self.delay_timer = self.registers[x as usize];
                self.pc += 2;
            }

            Instruction::SetSoundTimer(x) => {
                self.sound_timer = self.registers[x as usize];
                self.pc += 2;
            }

            Instruction::AddToIndex(x) => {
                let index = self.index + self.registers[x as usize] as u16;
                if index as usize >= MEMORY_SIZE {
                    return Err(MachineError::MemoryOutOfBounds { address: index });
                }
                self.index = index;
                self.pc += 2;
            }

            Instruction::SetIndexToHexChar(x) => {
                self.index = FONT_STARTING_ADDRESS + self.registers[x as usize] as u16;
                self.pc += 2;
            }

            Instruction::StoreBinaryCodedDecimal(x) => {
                let decimal = self.registers[x as usize];
                let bcd = [decimal / 100, decimal / 10 % 10, decimal % 10];
                self.memory.import(&bcd, self.index)?;
                self.pc += 2;
            }

            Instruction::Store(x) => {
                let registers = &self.registers[..=x as usize];
                self.memory.import(registers, self.index)?;
                self.pc += 2;
            }

            Instruction::Load(x) => {
                self.memory
                    .export(self.index, &mut self.registers[..=x as usize])?;
                self.pc += 2;
            }
        }

        Ok(true)
    }

    // XOR-draws an 8-wide, `height`-tall sprite at (Vx, Vy), most significant
    // bit leftmost. No wraparound: a set bit past the display edge is fatal.
    fn exec_draw(&mut self, x: u8, y: u8, height: u8) -> Result<(), MachineError> {
        let origin_x = self.registers[x as usize] as usize;
        let origin_y = self.registers[y as usize] as usize;

        self.framebuffer.redraw = true;

        let mut collision = false;
        for row in 0..height as usize {
            let byte = self.memory.read_byte(self.index + row as u16)?;
            for bit in 0..8 {
                if byte & (0x80 >> bit) != 0 {
                    collision |= self.framebuffer.flip(origin_x + bit, origin_y + row)?;
                }
            }
        }

        self.registers[VFLAG] = collision as u8;
        Ok(())
    }
}
