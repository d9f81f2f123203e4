use std::fmt;

/// A 16-bit instruction word decomposed into its operand fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opcode {
    pub bits: u16,
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl From<u16> for Opcode {
    fn from(bits: u16) -> Self {
        Opcode {
            bits,
            op: ((bits & 0xF000) >> 12) as u8,
            x: ((bits & 0x0F00) >> 8) as u8,
            y: ((bits & 0x00F0) >> 4) as u8,
            n: (bits & 0x000F) as u8,
            nn: (bits & 0x00FF) as u8,
            nnn: bits & 0x0FFF,
        }
    }
}

impl Opcode {
    pub fn from_bytes(byte0: u8, byte1: u8) -> Self {
        Opcode::from((byte0 as u16) << 8 | byte1 as u16)
    }

    /// Maps the instruction word to its operation, or `None` for a word that
    /// matches nothing in the instruction set (including the historical
    /// `0nnn` machine-code escape and `5xyn`/`9xyn` with a nonzero `n`).
    pub fn decode(&self) -> Option<Instruction> {
        let Opcode { op, x, y, n, nn, nnn, .. } = *self;

        match op {
            0x0 => match nnn {
                0x0E0 => Some(Instruction::ClearScreen),
                0x0EE => Some(Instruction::SubroutineReturn),
                _ => None,
            },
            0x1 => Some(Instruction::Jump(nnn)),
            0x2 => Some(Instruction::CallSubroutine(nnn)),
            0x3 => Some(Instruction::SkipIfEqualsConstant(x, nn)),
            0x4 => Some(Instruction::SkipIfNotEqualsConstant(x, nn)),
            0x5 => match n {
                0x0 => Some(Instruction::SkipIfEquals(x, y)),
                _ => None,
            },
            0x6 => Some(Instruction::SetConstant(x, nn)),
            0x7 => Some(Instruction::AddConstant(x, nn)),
            0x8 => match n {
                0x0 => Some(Instruction::Set(x, y)),
                0x1 => Some(Instruction::Or(x, y)),
                0x2 => Some(Instruction::And(x, y)),
                0x3 => Some(Instruction::Xor(x, y)),
                0x4 => Some(Instruction::Add(x, y)),
                0x5 => Some(Instruction::Sub(x, y, true)),
                0x6 => Some(Instruction::Shift(x, true)),
                0x7 => Some(Instruction::Sub(x, y, false)),
                0xE => Some(Instruction::Shift(x, false)),
                _ => None,
            },
            0x9 => match n {
                0x0 => Some(Instruction::SkipIfNotEquals(x, y)),
                _ => None,
            },
            0xA => Some(Instruction::SetIndex(nnn)),
            0xB => Some(Instruction::JumpWithOffset(nnn)),
            0xC => Some(Instruction::GenerateRandom(x, nn)),
            0xD => Some(Instruction::Draw(x, y, n)),
            0xE => match nn {
                0x9E => Some(Instruction::SkipIfKeyDown(x)),
                0xA1 => Some(Instruction::SkipIfKeyNotDown(x)),
                _ => None,
            },
            0xF => match nn {
                0x07 => Some(Instruction::GetDelayTimer(x)),
                0x0A => Some(Instruction::WaitForKey(x)),
                0x15 => Some(Instruction::SetDelayTimer(x)),
                0x18 => Some(Instruction::SetSoundTimer(x)),
                0x1E => Some(Instruction::AddToIndex(x)),
                0x29 => Some(Instruction::SetIndexToHexChar(x)),
                0x33 => Some(Instruction::StoreBinaryCodedDecimal(x)),
                0x55 => Some(Instruction::Store(x)),
                0x65 => Some(Instruction::Load(x)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#06X} (op = {:#X?}, x = {:?}, y = {:?}, n = {:?}, nn = {:?}, nnn = {:?})",
            self.bits, self.op, self.x, self.y, self.n, self.nn, self.nnn
        )
    }
}

/// The CHIP-8 operation set as a closed enumeration.
///
/// `Sub(x, y, true)` is `Vx - Vy` (8xy5) and `Sub(x, y, false)` is `Vy - Vx`
/// (8xy7); `Shift(x, true)` is the right shift (8xy6) and `Shift(x, false)`
/// the left shift (8xyE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ClearScreen,
    SubroutineReturn,
    Jump(u16),
    CallSubroutine(u16),
    SkipIfEqualsConstant(u8, u8),
    SkipIfNotEqualsConstant(u8, u8),
    SkipIfEquals(u8, u8),
    SkipIfNotEquals(u8, u8),
    SetConstant(u8, u8),
    AddConstant(u8, u8),
    Set(u8, u8),
    Or(u8, u8),
    And(u8, u8),
    Xor(u8, u8),
    Add(u8, u8),
    Sub(u8, u8, bool),
    Shift(u8, bool),
    SetIndex(u16),
    JumpWithOffset(u16),
    GenerateRandom(u8, u8),
    Draw(u8, u8, u8),
    SkipIfKeyDown(u8),
    SkipIfKeyNotDown(u8),
    GetDelayTimer(u8),
    WaitForKey(u8),
    SetDelayTimer(u8),
    SetSoundTimer(u8),
    AddToIndex(u8),
    SetIndexToHexChar(u8),
    StoreBinaryCodedDecimal(u8),
    Store(u8),
    Load(u8),
}

impl fmt::Display for Instruction {
    /// Conventional CHIP-8 assembly mnemonics, shared by `check` output and
    /// trace logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::ClearScreen => write!(f, "CLS"),
            Instruction::SubroutineReturn => write!(f, "RET"),
            Instruction::Jump(nnn) => write!(f, "JP {:#05X}", nnn),
            Instruction::CallSubroutine(nnn) => write!(f, "CALL {:#05X}", nnn),
            Instruction::SkipIfEqualsConstant(x, nn) => write!(f, "SE V{:X}, {:#04X}", x, nn),
            Instruction::SkipIfNotEqualsConstant(x, nn) => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            Instruction::SkipIfEquals(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            Instruction::SkipIfNotEquals(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            Instruction::SetConstant(x, nn) => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Instruction::AddConstant(x, nn) => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Instruction::Set(x, y) => write!(f, "LD V{:X}, V{:X}", x, y),
            Instruction::Or(x, y) => write!(f, "OR V{:X}, V{:X}", x, y),
            Instruction::And(x, y) => write!(f, "AND V{:X}, V{:X}", x, y),
            Instruction::Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x, y),
            Instruction::Add(x, y) => write!(f, "ADD V{:X}, V{:X}", x, y),
            Instruction::Sub(x, y, true) => write!(f, "SUB V{:X}, V{:X}", x, y),
            Instruction::Sub(x, y, false) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Instruction::Shift(x, true) => write!(f, "SHR V{:X}", x),
            Instruction::Shift(x, false) => write!(f, "SHL V{:X}", x),
            Instruction::SetIndex(nnn) => write!(f, "LD I, {:#05X}", nnn),
            Instruction::JumpWithOffset(nnn) => write!(f, "JP V0, {:#05X}", nnn),
            Instruction::GenerateRandom(x, nn) => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Instruction::Draw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Instruction::SkipIfKeyDown(x) => write!(f, "SKP V{:X}", x),
            Instruction::SkipIfKeyNotDown(x) => write!(f, "SKNP V{:X}", x),
            Instruction::GetDelayTimer(x) => write!(f, "LD V{:X}, DT", x),
            Instruction::WaitForKey(x) => write!(f, "LD V{:X}, K", x),
            Instruction::SetDelayTimer(x) => write!(f, "LD DT, V{:X}", x),
            Instruction::SetSoundTimer(x) => write!(f, "LD ST, V{:X}", x),
            Instruction::AddToIndex(x) => write!(f, "ADD I, V{:X}", x),
            Instruction::SetIndexToHexChar(x) => write!(f, "LD F, V{:X}", x),
            Instruction::StoreBinaryCodedDecimal(x) => write!(f, "LD B, V{:X}", x),
            Instruction::Store(x) => write!(f, "LD [I], V{:X}", x),
            Instruction::Load(x) => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_fields_are_extracted() {
        let opcode = Opcode::from(0xD124);
        assert_eq!(opcode.op, 0xD);
        assert_eq!(opcode.x, 0x1);
        assert_eq!(opcode.y, 0x2);
        assert_eq!(opcode.n, 0x4);
        assert_eq!(opcode.nn, 0x24);
        assert_eq!(opcode.nnn, 0x124);
    }

    #[test]
    fn words_compose_big_endian() {
        assert_eq!(Opcode::from_bytes(0xA2, 0xF0).bits, 0xA2F0);
    }

    #[test]
    fn every_operation_decodes() {
        let cases = [
            (0x00E0, Instruction::ClearScreen),
            (0x00EE, Instruction::SubroutineReturn),
            (0x1ABC, Instruction::Jump(0xABC)),
            (0x2ABC, Instruction::CallSubroutine(0xABC)),
            (0x3144, Instruction::SkipIfEqualsConstant(0x1, 0x44)),
            (0x4144, Instruction::SkipIfNotEqualsConstant(0x1, 0x44)),
            (0x5120, Instruction::SkipIfEquals(0x1, 0x2)),
            (0x6244, Instruction::SetConstant(0x2, 0x44)),
            (0x7244, Instruction::AddConstant(0x2, 0x44)),
            (0x8120, Instruction::Set(0x1, 0x2)),
            (0x8121, Instruction::Or(0x1, 0x2)),
            (0x8122, Instruction::And(0x1, 0x2)),
            (0x8123, Instruction::Xor(0x1, 0x2)),
            (0x8124, Instruction::Add(0x1, 0x2)),
            (0x8125, Instruction::Sub(0x1, 0x2, true)),
            (0x8126, Instruction::Shift(0x1, true)),
            (0x8127, Instruction::Sub(0x1, 0x2, false)),
            (0x812E, Instruction::Shift(0x1, false)),
            (0x9120, Instruction::SkipIfNotEquals(0x1, 0x2)),
            (0xAABC, Instruction::SetIndex(0xABC)),
            (0xBABC, Instruction::JumpWithOffset(0xABC)),
            (0xC144, Instruction::GenerateRandom(0x1, 0x44)),
            (0xD124, Instruction::Draw(0x1, 0x2, 0x4)),
            (0xE19E, Instruction::SkipIfKeyDown(0x1)),
            (0xE1A1, Instruction::SkipIfKeyNotDown(0x1)),
            (0xF107, Instruction::GetDelayTimer(0x1)),
            (0xF10A, Instruction::WaitForKey(0x1)),
            (0xF115, Instruction::SetDelayTimer(0x1)),
            (0xF118, Instruction::SetSoundTimer(0x1)),
            (0xF11E, Instruction::AddToIndex(0x1)),
            (0xF129, Instruction::SetIndexToHexChar(0x1)),
            (0xF133, Instruction::StoreBinaryCodedDecimal(0x1)),
            (0xF155, Instruction::Store(0x1)),
            (0xF165, Instruction::Load(0x1)),
        ];

        for (word, instruction) in cases {
            assert_eq!(Opcode::from(word).decode(), Some(instruction), "{:#06X}", word);
        }
    }

    #[test]
    fn unassigned_words_do_not_decode() {
        for word in [0x0000, 0x0123, 0x00E1, 0x5121, 0x8128, 0x812F, 0x9121, 0xE19F, 0xE1A2, 0xF100, 0xF156, 0xF166] {
            assert_eq!(Opcode::from(word).decode(), None, "{:#06X}", word);
        }
    }

    #[test]
    fn mnemonics_read_as_assembly() {
        assert_eq!(Opcode::from(0x6244).decode().unwrap().to_string(), "LD V2, 0x44");
        assert_eq!(Opcode::from(0x00E0).decode().unwrap().to_string(), "CLS");
        assert_eq!(Opcode::from(0xD12F).decode().unwrap().to_string(), "DRW V1, V2, 15");
        assert_eq!(Opcode::from(0xF10A).decode().unwrap().to_string(), "LD V1, K");
    }
}
