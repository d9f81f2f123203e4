use super::mem::MAX_PROGRAM_SIZE;

use std::{ffi::OsStr, fs::read, io, path::Path};

#[derive(Clone)]
pub struct RomConfig {
    pub name: String,
    pub logging: bool,
}

/// A program image validated against the memory left above the program
/// starting address. The bytes are never interpreted here; `check` and the
/// machine do that.
#[derive(Clone)]
pub struct Rom {
    pub config: RomConfig,
    pub data: Vec<u8>,
}

impl Rom {
    pub fn read<P: AsRef<Path>>(path: P, logging: bool) -> io::Result<Rom> {
        let name = path
            .as_ref()
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("Untitled")
            .into();
        Rom::from_bytes(read(path)?, name, logging)
    }

    pub fn from_bytes(data: Vec<u8>, name: String, logging: bool) -> io::Result<Rom> {
        if data.len() < 2 {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("ROM size ({}B) is below minimum size (2B)", data.len()),
            ))
        } else if data.len() > MAX_PROGRAM_SIZE {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "ROM size ({}B) exceeds maximum size ({}B)",
                    data.len(),
                    MAX_PROGRAM_SIZE
                ),
            ))
        } else {
            Ok(Rom {
                config: RomConfig { name, logging },
                data,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roms_within_bounds_load() {
        let rom = Rom::from_bytes(vec![0x00, 0xE0], "ok".into(), false).unwrap();
        assert_eq!(rom.data, vec![0x00, 0xE0]);
        assert_eq!(rom.config.name, "ok");
    }

    #[test]
    fn a_degenerate_rom_is_refused() {
        assert!(Rom::from_bytes(vec![0x00], "tiny".into(), false).is_err());
        assert!(Rom::from_bytes(vec![], "empty".into(), false).is_err());
    }

    #[test]
    fn an_oversized_rom_is_refused() {
        assert!(Rom::from_bytes(vec![0; MAX_PROGRAM_SIZE], "max".into(), false).is_ok());
        assert!(Rom::from_bytes(vec![0; MAX_PROGRAM_SIZE + 1], "big".into(), false).is_err());
    }
}
