use crate::vm::{
    disp::{Framebuffer, FramebufferWidget},
    rom::RomConfig,
    MachineLock,
};

use anyhow::{anyhow, Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use std::{
    io::{self, stdout},
    sync::mpsc::{channel, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

pub const TARGET_FRAME_RATE: u32 = 60;
pub const TARGET_FRAME_DURATION: Duration =
    Duration::from_micros(1_000_000 / TARGET_FRAME_RATE as u64);

type Terminal = tui::Terminal<CrosstermBackend<io::Stdout>>;

fn cleanup_terminal(terminal: &mut Terminal) -> Result<()> {
    // clean up the terminal so its usable after program exit
    disable_raw_mode().context("Failed to disable terminal raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate terminal screen")?;
    terminal
        .show_cursor()
        .context("Failed to show terminal cursor")?;
    Ok(())
}

pub fn panic_cleanup_terminal() -> Result<()> {
    cleanup_terminal(
        &mut tui::Terminal::new(CrosstermBackend::new(stdout()))
            .context("Failed to create interface to terminal backend")?,
    )
}

pub fn spawn_render_thread(
    machine: MachineLock,
    config: RomConfig,
    cycle_frequency: u32,
) -> (Sender<()>, JoinHandle<()>) {
    let (render_sender, render_receiver) = channel::<()>();
    let render_thread_handle = thread::spawn(move || {
        // change terminal to an alternate screen so user doesnt lose terminal history on exit
        // and enable raw mode so we have full authority over event handling and output
        enable_raw_mode().expect("Failed to enable terminal raw mode");

        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen).expect("Failed to enter alternate terminal screen");

        let mut terminal = tui::Terminal::new(CrosstermBackend::new(stdout))
            .expect("Failed to create interface to terminal backend");

        let mut renderer = Renderer {
            config,
            cycle_frequency,
            framebuffer: Framebuffer::default(),
        };

        let mut should_redraw = true;

        let mut frame_start = Instant::now();

        loop {
            if render_receiver.try_iter().last().is_some() {
                should_redraw = true;
            }

            if let Err(TryRecvError::Disconnected) = render_receiver.try_recv() {
                if let Err(e) = cleanup_terminal(&mut terminal) {
                    eprintln!("Failed to cleanup terminal: {}", e);
                }
                return;
            }

            renderer
                .step(&mut terminal, should_redraw, &machine)
                .expect("Failed render step");
            should_redraw = false;

            frame_start = frame_start
                .checked_add(TARGET_FRAME_DURATION)
                .expect("Could not calculate next frame start");
            thread::sleep(frame_start.saturating_duration_since(Instant::now()));
        }
    });

    (render_sender, render_thread_handle)
}

struct Renderer {
    config: RomConfig,
    cycle_frequency: u32,

    // last consumed frame, redrawn as-is on resizes and log updates
    framebuffer: Framebuffer,
}

impl Renderer {
    fn step(&mut self, terminal: &mut Terminal, should_redraw: bool, machine: &MachineLock) -> Result<()> {
        let new_frame = {
            let mut guard = machine
                .lock()
                .map_err(|_| anyhow!("Failed to lock machine for render step"))?;

            if guard.framebuffer.redraw {
                guard.framebuffer.redraw = false;
                Some(guard.framebuffer.clone())
            } else {
                None
            }
        };

        if let Some(framebuffer) = new_frame {
            self.framebuffer = framebuffer;
        } else if !should_redraw {
            return Ok(());
        }

        terminal.draw(|f| self.render_machine(f))?;

        Ok(())
    }

    fn render_machine<B: Backend>(&self, f: &mut Frame<B>) {
        let area = f.size();
        let framebuffer_widget = FramebufferWidget {
            framebuffer: &self.framebuffer,
            rom_name: &self.config.name,
            cycle_frequency: self.cycle_frequency,
        };

        let [area, bottom_area] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(area.height.saturating_sub(1)),
                Constraint::Length(1),
            ])
            .split(area)[..] else { unreachable!() };

        let (display_width, display_height) = FramebufferWidget::window_dimensions();
        let [display_column, logger_column, ..] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(display_width),
                Constraint::Length(area.width.saturating_sub(display_width)),
            ])
            .split(area)[..] else { unreachable!() };

        let [display_row, logger_row] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(display_height),
                Constraint::Length(area.height.saturating_sub(display_height)),
            ])
            .split(area)[..] else { unreachable!() };

        if self.config.logging {
            f.render_widget(
                logger_widget(Borders::ALL),
                if logger_column.area() >= logger_row.area() {
                    logger_column
                } else {
                    logger_row
                },
            );
        }

        let display_block = Block::default()
            .title(framebuffer_widget.title())
            .borders(Borders::ALL);
        let display_area = display_row.intersection(display_column);
        f.render_widget(framebuffer_widget, display_block.inner(display_area));
        f.render_widget(display_block, display_area);

        let bottom_area_style = Style::default().bg(Color::White).fg(Color::Black);

        f.render_widget(Block::default().style(bottom_area_style), bottom_area);
        f.render_widget(
            Paragraph::new(" Esc or Ctrl+C to exit").style(bottom_area_style),
            bottom_area,
        );
    }
}

pub fn logger_widget(borders: Borders) -> TuiLoggerWidget<'static> {
    TuiLoggerWidget::default()
        .block(
            Block::default()
                .title(" Log ")
                .border_style(Style::default().fg(Color::White))
                .borders(borders),
        )
        .output_separator('|')
        .output_timestamp(Some("%H:%M:%S%.3f".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false)
        .style_error(Style::default().fg(Color::Red))
        .style_debug(Style::default().fg(Color::Cyan))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_trace(Style::default().fg(Color::White))
        .style_info(Style::default().fg(Color::Green))
}
