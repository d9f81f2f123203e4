use crossterm::event::KeyCode as CrosstermKey;
use device_query::Keycode as DeviceKey;

/// The 16 host keys mapped onto the hexadecimal keypad:
///
/// ```text
///   1 2 3 4        1 2 3 C
///   Q W E R   ->   4 5 6 D
///   A S D F        7 8 9 E
///   Z X C V        A 0 B F
/// ```
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Key {
    One,
    Two,
    Three,
    Four,
    Q,
    W,
    E,
    R,
    A,
    S,
    D,
    F,
    Z,
    X,
    C,
    V,
}

impl Key {
    // Key enum to the keypad code read by the machine
    pub fn to_code(self) -> u8 {
        match self {
            Key::One => 0x1,
            Key::Two => 0x2,
            Key::Three => 0x3,
            Key::Four => 0xC,
            Key::Q => 0x4,
            Key::W => 0x5,
            Key::E => 0x6,
            Key::R => 0xD,
            Key::A => 0x7,
            Key::S => 0x8,
            Key::D => 0x9,
            Key::F => 0xE,
            Key::Z => 0xA,
            Key::X => 0x0,
            Key::C => 0xB,
            Key::V => 0xF,
        }
    }
}

impl TryFrom<DeviceKey> for Key {
    type Error = &'static str;
    fn try_from(key: DeviceKey) -> Result<Self, Self::Error> {
        match key {
            DeviceKey::Key1 => Ok(Key::One),
            DeviceKey::Key2 => Ok(Key::Two),
            DeviceKey::Key3 => Ok(Key::Three),
            DeviceKey::Key4 => Ok(Key::Four),
            DeviceKey::Q => Ok(Key::Q),
            DeviceKey::W => Ok(Key::W),
            DeviceKey::E => Ok(Key::E),
            DeviceKey::R => Ok(Key::R),
            DeviceKey::A => Ok(Key::A),
            DeviceKey::S => Ok(Key::S),
            DeviceKey::D => Ok(Key::D),
            DeviceKey::F => Ok(Key::F),
            DeviceKey::Z => Ok(Key::Z),
            DeviceKey::X => Ok(Key::X),
            DeviceKey::C => Ok(Key::C),
            DeviceKey::V => Ok(Key::V),
            _ => Err("not a keypad key"),
        }
    }
}

impl TryFrom<CrosstermKey> for Key {
    type Error = &'static str;
    fn try_from(key: CrosstermKey) -> Result<Self, Self::Error> {
        match key {
            CrosstermKey::Char(c) => match c {
                '1' => Ok(Key::One),
                '2' => Ok(Key::Two),
                '3' => Ok(Key::Three),
                '4' => Ok(Key::Four),
                'Q' | 'q' => Ok(Key::Q),
                'W' | 'w' => Ok(Key::W),
                'E' | 'e' => Ok(Key::E),
                'R' | 'r' => Ok(Key::R),
                'A' | 'a' => Ok(Key::A),
                'S' | 's' => Ok(Key::S),
                'D' | 'd' => Ok(Key::D),
                'F' | 'f' => Ok(Key::F),
                'Z' | 'z' => Ok(Key::Z),
                'X' | 'x' => Ok(Key::X),
                'C' | 'c' => Ok(Key::C),
                'V' | 'v' => Ok(Key::V),
                _ => Err("not a keypad char"),
            },
            _ => Err("not a keypad key"),
        }
    }
}

/// The keypad state the machine reads: one slot per key code, 0 released,
/// nonzero held. Only the input events mutate it; the operations Ex9E, ExA1
/// and Fx0A read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    focused: bool,
    down: [u8; 16],
}

impl Default for Keypad {
    fn default() -> Self {
        // the terminal may not deliver an initial focus event at all, so
        // start focused and let an explicit unfocus clear the state
        Keypad { focused: true, down: [0; 16] }
    }
}

impl Keypad {
    pub fn clear(&mut self) {
        *self = Keypad::default();
    }

    pub fn is_down(&self, code: u8) -> bool {
        self.down[code as usize] != 0
    }

    /// The lowest held key code, used to complete a wait-for-key.
    pub fn first_down(&self) -> Option<u8> {
        self.down.iter().position(|&held| held != 0).map(|code| code as u8)
    }

    // on terminal focus
    pub fn handle_focus(&mut self) {
        if !self.focused {
            self.focused = true;
            log::info!("focus gained");
        }
    }

    // on terminal unfocus: release everything so no key sticks down while
    // the input poller cannot observe it
    pub fn handle_unfocus(&mut self) {
        self.focused = false;
        self.down = [0; 16];
        log::info!("clearing pressed keys because of focus lost");
    }

    // a crossterm key event means the terminal is focused even if no focus
    // event fired (or the terminal does not support them), so correct the
    // state and register the key that proved it
    pub fn handle_focusing_key_down(&mut self, key: Key) {
        if !self.focused {
            self.handle_focus();
            self.handle_key_down(key);
        }
    }

    pub fn handle_key_down(&mut self, key: Key) {
        if !self.focused {
            return;
        }
        let code = key.to_code();
        if self.down[code as usize] == 0 {
            self.down[code as usize] = 1;
            log::debug!("pressed key {:?} code {:X?}", key, code);
        }
    }

    pub fn handle_key_up(&mut self, key: Key) {
        if !self.focused {
            return;
        }
        let code = key.to_code();
        if self.down[code as usize] != 0 {
            self.down[code as usize] = 0;
            log::debug!("released key {:?} code {:X?}", key, code);
        }
    }
}
