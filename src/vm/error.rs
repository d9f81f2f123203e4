use thiserror::Error;

/// Everything that can go wrong while the machine is executing.
///
/// Unknown opcodes are recoverable: the offending cycle is aborted with `pc`
/// untouched and the run loop carries on. Every other variant means the
/// machine state can no longer be trusted and the run must stop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    #[error("unknown opcode {word:#06X} at {pc:#05X}")]
    UnknownOpcode { word: u16, pc: u16 },

    #[error("call stack overflow at {pc:#05X}")]
    StackOverflow { pc: u16 },

    #[error("call stack underflow at {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("sprite drawn outside the display at ({x}, {y})")]
    DisplayOutOfBounds { x: usize, y: usize },

    #[error("invalid key code {code:#04X} at {pc:#05X}")]
    InvalidKey { code: u8, pc: u16 },
}

impl MachineError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MachineError::UnknownOpcode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_opcode_is_recoverable() {
        assert!(!MachineError::UnknownOpcode { word: 0x00E1, pc: 0x200 }.is_fatal());
        assert!(MachineError::StackOverflow { pc: 0x200 }.is_fatal());
        assert!(MachineError::StackUnderflow { pc: 0x200 }.is_fatal());
        assert!(MachineError::MemoryOutOfBounds { address: 0x1000 }.is_fatal());
        assert!(MachineError::DisplayOutOfBounds { x: 64, y: 0 }.is_fatal());
        assert!(MachineError::InvalidKey { code: 0x10, pc: 0x200 }.is_fatal());
    }
}
