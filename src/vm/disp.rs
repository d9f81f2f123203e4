use super::error::MachineError;

use tui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// The 64x32 monochrome display, row-major, one byte per pixel (0 or 1).
///
/// `redraw` is the signal to the renderer that the contents changed since the
/// last consumed frame; only the renderer clears it.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [u8; DISPLAY_WIDTH * DISPLAY_HEIGHT],
    pub redraw: bool,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer {
            pixels: [0; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            redraw: false,
        }
    }
}

impl Framebuffer {
    pub fn clear(&mut self) {
        self.pixels = [0; DISPLAY_WIDTH * DISPLAY_HEIGHT];
        self.redraw = true;
    }

    /// XOR-flips the pixel at `(x, y)` and reports whether a lit pixel was
    /// turned off (a sprite collision). Coordinates are not wrapped; a flip
    /// outside the grid is a fatal bounds error.
    pub fn flip(&mut self, x: usize, y: usize) -> Result<bool, MachineError> {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return Err(MachineError::DisplayOutOfBounds { x, y });
        }
        self.redraw = true;
        let pixel = &mut self.pixels[y * DISPLAY_WIDTH + x];
        *pixel ^= 1;
        Ok(*pixel == 0)
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * DISPLAY_WIDTH + x]
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&pixel| pixel != 0).count()
    }
}

pub struct FramebufferWidget<'a, 'b> {
    pub framebuffer: &'a Framebuffer,
    pub rom_name: &'b str,
    pub cycle_frequency: u32,
}

impl FramebufferWidget<'_, '_> {
    pub fn title(&self) -> String {
        format!(" CHIP-8 Virtual Machine ({}) {}Hz ", self.rom_name, self.cycle_frequency)
    }

    pub fn window_dimensions() -> (u16, u16) {
        // 2 display rows per terminal row, plus the border
        (DISPLAY_WIDTH as u16 + 2, DISPLAY_HEIGHT as u16 / 2 + 2)
    }
}

impl Widget for FramebufferWidget<'_, '_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // terminal cells are roughly twice as tall as they are wide, so the
        // bottom-half block (▄) lets one cell carry two display rows: the
        // background color is the upper pixel and the foreground the lower
        let rendered_width = (area.width as usize).min(DISPLAY_WIDTH);
        let rendered_height = (2 * area.height as usize).min(DISPLAY_HEIGHT);

        for y in 0..rendered_height {
            for x in 0..rendered_width {
                let color = if self.framebuffer.pixel(x, y) != 0 {
                    Color::White
                } else {
                    Color::Black
                };

                let cell = buf.get_mut(area.left() + x as u16, area.top() + y as u16 / 2);
                if y % 2 == 0 {
                    cell.set_bg(color);
                } else {
                    cell.set_fg(color).set_symbol("▄");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_toggles_and_reports_collisions() {
        let mut framebuffer = Framebuffer::default();
        assert_eq!(framebuffer.flip(3, 5), Ok(false));
        assert_eq!(framebuffer.pixel(3, 5), 1);
        assert!(framebuffer.redraw);

        // flipping a lit pixel turns it off again
        assert_eq!(framebuffer.flip(3, 5), Ok(true));
        assert_eq!(framebuffer.pixel(3, 5), 0);
    }

    #[test]
    fn flips_outside_the_grid_fail() {
        let mut framebuffer = Framebuffer::default();
        assert_eq!(
            framebuffer.flip(DISPLAY_WIDTH, 0),
            Err(MachineError::DisplayOutOfBounds { x: DISPLAY_WIDTH, y: 0 })
        );
        assert_eq!(
            framebuffer.flip(0, DISPLAY_HEIGHT),
            Err(MachineError::DisplayOutOfBounds { x: 0, y: DISPLAY_HEIGHT })
        );
    }

    #[test]
    fn clear_unlights_everything_and_flags_a_redraw() {
        let mut framebuffer = Framebuffer::default();
        for x in 0..DISPLAY_WIDTH {
            for y in 0..DISPLAY_HEIGHT {
                framebuffer.flip(x, y).unwrap();
            }
        }
        framebuffer.redraw = false;

        framebuffer.clear();
        assert_eq!(framebuffer.lit_count(), 0);
        assert!(framebuffer.redraw);
    }
}
