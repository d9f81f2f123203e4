use super::error::MachineError;

pub const MEMORY_SIZE: usize = 4096;

pub const PROGRAM_STARTING_ADDRESS: u16 = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_STARTING_ADDRESS as usize;

pub const FONT_STARTING_ADDRESS: u16 = 0x50; // font lives in memory from 0x50 to 0x9F inclusive

/*
 pixels are represented as on/off by the bit, so 0xF0 = 1111 0000 = a row of 4 lit pixels

  DEC   HEX    BIN         RESULT    DEC   HEX    BIN         RESULT
  240   0xF0   1111 0000    ****     240   0xF0   1111 0000    ****
  144   0x90   1001 0000    *  *      16   0x10   0001 0000       *
  144   0x90   1001 0000    *  *      32   0x20   0010 0000      *
  144   0x90   1001 0000    *  *      64   0x40   0100 0000     *
  240   0xF0   1111 0000    ****      64   0x40   0100 0000     *
*/
const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The machine's 4096-byte address space.
///
/// Every access is bounds-checked: an address past the end of the space is a
/// `MemoryOutOfBounds` error rather than a wraparound, so a runaway program
/// stops with a diagnostic instead of silently corrupting itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        let mut memory = Memory { bytes: [0; MEMORY_SIZE] };
        memory.reset();
        memory
    }
}

impl Memory {
    /// Zeroes the address space and rewrites the font table.
    pub fn reset(&mut self) {
        self.bytes = [0; MEMORY_SIZE];
        let font_start = FONT_STARTING_ADDRESS as usize;
        self.bytes[font_start..font_start + FONT.len()].copy_from_slice(&FONT);
    }

    /// Copies program bytes verbatim to the program starting address.
    /// The size bound is validated when the ROM is read.
    pub fn load_program(&mut self, program: &[u8]) {
        let start = PROGRAM_STARTING_ADDRESS as usize;
        self.bytes[start..start + program.len()].copy_from_slice(program);
    }

    pub fn read_byte(&self, address: u16) -> Result<u8, MachineError> {
        self.bytes
            .get(address as usize)
            .copied()
            .ok_or(MachineError::MemoryOutOfBounds { address })
    }

    /// Reads the big-endian 16-bit word at `address`.
    pub fn read_word(&self, address: u16) -> Result<u16, MachineError> {
        let hi = self.read_byte(address)?;
        let lo = self.read_byte(address.wrapping_add(1))?;
        Ok((hi as u16) << 8 | lo as u16)
    }

    /// Copies `dst.len()` bytes starting at `address` out of memory.
    pub fn export(&self, address: u16, dst: &mut [u8]) -> Result<(), MachineError> {
        let start = address as usize;
        let end = start + dst.len();
        if end > MEMORY_SIZE {
            return Err(MachineError::MemoryOutOfBounds { address });
        }
        dst.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }

    /// Copies `src` into memory starting at `address`.
    pub fn import(&mut self, src: &[u8], address: u16) -> Result<(), MachineError> {
        let start = address as usize;
        let end = start + src.len();
        if end > MEMORY_SIZE {
            return Err(MachineError::MemoryOutOfBounds { address });
        }
        self.bytes[start..end].copy_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zeroes_everything_but_the_font() {
        let mut memory = Memory::default();
        memory.import(&[0xAB; 16], 0x300).unwrap();
        memory.reset();

        let mut font = [0; 80];
        memory.export(FONT_STARTING_ADDRESS, &mut font).unwrap();
        assert_eq!(font, FONT);

        for address in (0..MEMORY_SIZE as u16).filter(|&a| {
            a < FONT_STARTING_ADDRESS || a >= FONT_STARTING_ADDRESS + FONT.len() as u16
        }) {
            assert_eq!(memory.read_byte(address).unwrap(), 0);
        }
    }

    #[test]
    fn program_bytes_land_at_the_program_starting_address() {
        let mut memory = Memory::default();
        memory.load_program(&[0x12, 0x34, 0x56]);
        assert_eq!(memory.read_byte(0x200).unwrap(), 0x12);
        assert_eq!(memory.read_byte(0x201).unwrap(), 0x34);
        assert_eq!(memory.read_byte(0x202).unwrap(), 0x56);
        assert_eq!(memory.read_byte(0x203).unwrap(), 0x00);
    }

    #[test]
    fn words_are_read_big_endian() {
        let mut memory = Memory::default();
        memory.import(&[0xAA, 0xBB], 0x200).unwrap();
        assert_eq!(memory.read_word(0x200).unwrap(), 0xAABB);
    }

    #[test]
    fn reads_past_the_end_fail() {
        let memory = Memory::default();
        assert_eq!(
            memory.read_byte(0x1000),
            Err(MachineError::MemoryOutOfBounds { address: 0x1000 })
        );
        assert_eq!(
            memory.read_word(0xFFF),
            Err(MachineError::MemoryOutOfBounds { address: 0x1000 })
        );
        assert!(memory.read_word(0xFFE).is_ok());
    }

    #[test]
    fn export_and_import_are_bounds_checked() {
        let mut memory = Memory::default();
        let mut buffer = [0; 4];
        assert!(memory.export(0xFFC, &mut buffer).is_ok());
        assert_eq!(
            memory.export(0xFFD, &mut buffer),
            Err(MachineError::MemoryOutOfBounds { address: 0xFFD })
        );
        assert_eq!(
            memory.import(&buffer, 0xFFD),
            Err(MachineError::MemoryOutOfBounds { address: 0xFFD })
        );
    }
}
