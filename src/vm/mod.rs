pub mod audio;
pub mod disp;
pub mod error;
pub mod input;
pub mod instr;
pub mod machine;
pub mod mem;
pub mod rom;

use {
    audio::AudioEvent,
    error::MachineError,
    input::Key,
    machine::{CycleOutcome, Machine},
    rom::Rom,
};

use crate::render::{spawn_render_thread, TARGET_FRAME_DURATION};

use crossterm::{
    event::{
        poll, read, Event, KeyCode as CrosstermKey, KeyEventKind,
        KeyModifiers as CrosstermKeyModifiers,
    },
    style::Stylize,
};
use device_query::DeviceQuery;

use std::{
    collections::HashSet,
    fmt::Display,
    sync::{
        mpsc::{channel, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

pub type MachineLock = Arc<Mutex<Machine>>;
pub type RunResult = Result<RunSummary, MachineError>;

pub const GOOD_CYCLE_FREQUENCY_PERCENT_DIFF: f64 = 1.0;
pub const OKAY_CYCLE_FREQUENCY_PERCENT_DIFF: f64 = 10.0;

/// Input and focus changes forwarded from the event-polling thread. The
/// cycle loop drains these into the keypad at the top of each frame while
/// holding the machine lock; nothing else touches the machine.
#[derive(Debug)]
pub enum MachineEvent {
    KeyUp(Key),
    KeyDown(Key),
    Focus,
    Unfocus,
    FocusingKeyDown(Key),
}

/// Spawns the cycle loop and render threads, then turns the calling
/// thread's closure into the event loop that feeds them.
pub fn spawn_run_threads(
    rom: Rom,
    target_frequency: u32,
    audio_sender: Sender<AudioEvent>,
) -> (JoinHandle<RunResult>, JoinHandle<()>) {
    let rom_config = rom.config.clone();

    let runner = Runner::spawn(rom, target_frequency, audio_sender);

    let (render_sender, render_thread) =
        spawn_render_thread(runner.machine(), rom_config.clone(), target_frequency);

    let event_sender = runner.event_sender();

    let main_thread = thread::spawn(move || -> RunResult {
        let device_state = device_query::DeviceState::new();
        let mut last_keys = HashSet::new();

        loop {
            // event loop
            let terminal_event_received =
                poll(Duration::from_millis(15)).expect("Unable to poll for terminal events");

            if runner.is_finished() {
                return runner.exit();
            }

            if terminal_event_received {
                let event = read().expect("Unable to read terminal event");
                match event {
                    Event::Resize(_, _) => {
                        render_sender.send(()).ok();
                    }
                    Event::FocusGained => {
                        event_sender.send(MachineEvent::Focus).ok();
                    }
                    Event::FocusLost => {
                        event_sender.send(MachineEvent::Unfocus).ok();
                    }
                    Event::Key(key_event) => {
                        // Esc or Ctrl+C ends the run cleanly
                        if key_event.code == CrosstermKey::Esc
                            || key_event.modifiers.contains(CrosstermKeyModifiers::CONTROL)
                                && (key_event.code == CrosstermKey::Char('c')
                                    || key_event.code == CrosstermKey::Char('C'))
                        {
                            return runner.exit();
                        }

                        // a crossterm key event implies the terminal has focus
                        if let KeyEventKind::Repeat | KeyEventKind::Press = key_event.kind {
                            if let Ok(key) = Key::try_from(key_event.code) {
                                event_sender.send(MachineEvent::FocusingKeyDown(key)).ok();
                            }
                        }
                    }
                    _ => (),
                }
            }

            // device_query observes key releases, which terminal input
            // cannot deliver
            let keys = HashSet::from_iter(
                device_state
                    .get_keys()
                    .into_iter()
                    .filter_map(|keycode| Key::try_from(keycode).ok()),
            );

            for &key in keys.difference(&last_keys) {
                event_sender.send(MachineEvent::KeyDown(key)).ok();
            }

            for &key in last_keys.difference(&keys) {
                event_sender.send(MachineEvent::KeyUp(key)).ok();
            }

            last_keys = keys;

            // the logger pane fills up independently of the framebuffer
            if rom_config.logging {
                render_sender.send(()).ok();
            }
        }
    });

    (main_thread, render_thread)
}

pub struct Runner {
    machine: MachineLock,

    thread_handle: JoinHandle<RunResult>,
    shutdown_sender: Sender<()>,

    event_sender: Sender<MachineEvent>,
}

impl Runner {
    pub fn machine(&self) -> MachineLock {
        Arc::clone(&self.machine)
    }

    pub fn event_sender(&self) -> Sender<MachineEvent> {
        self.event_sender.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread_handle.is_finished()
    }

    pub fn spawn(rom: Rom, target_frequency: u32, audio_sender: Sender<AudioEvent>) -> Self {
        let (event_sender, event_receiver) = channel::<MachineEvent>();
        let (shutdown_sender, shutdown_receiver) = channel::<()>();

        let rom_name = rom.config.name.clone();

        let machine = Arc::new(Mutex::new({
            let mut machine = Machine::new();
            machine.load_rom(&rom);
            machine
        }));

        // timers tick once per cycle, so the cycle rate is the timer rate
        let cycles_per_frame = (TARGET_FRAME_DURATION.as_secs_f64() * target_frequency as f64)
            .round()
            .max(1.0) as u32;

        let thread_handle = {
            let machine = Arc::clone(&machine);
            thread::spawn(move || {
                run_cycle_loop(
                    machine,
                    event_receiver,
                    shutdown_receiver,
                    audio_sender,
                    cycles_per_frame,
                    target_frequency,
                    rom_name,
                )
            })
        };

        Runner {
            machine,
            thread_handle,
            shutdown_sender,
            event_sender,
        }
    }

    pub fn exit(self) -> RunResult {
        let Runner {
            shutdown_sender,
            thread_handle,
            ..
        } = self;
        // the cycle thread detects the sender was dropped (we hold the only
        // one) and finishes with its summary if still alive
        drop(shutdown_sender);
        thread_handle.join().expect("Runner exited without result")
    }
}

fn run_cycle_loop(
    machine: MachineLock,
    event_receiver: Receiver<MachineEvent>,
    shutdown_receiver: Receiver<()>,
    audio_sender: Sender<AudioEvent>,
    cycles_per_frame: u32,
    target_frequency: u32,
    rom_name: String,
) -> RunResult {
    let thread_start = Instant::now();
    let mut cycles_executed = 0_u64;
    let mut frame_start = Instant::now();

    loop {
        if let Err(TryRecvError::Disconnected) = shutdown_receiver.try_recv() {
            break;
        }

        let mut guard = machine
            .lock()
            .expect("Failed to lock machine for cycle loop");

        // the latest input lands before any cycle of this frame
        for event in event_receiver.try_iter() {
            log::debug!("Processing event {:?}", event);
            match event {
                MachineEvent::KeyUp(key) => guard.keypad.handle_key_up(key),
                MachineEvent::KeyDown(key) => guard.keypad.handle_key_down(key),
                MachineEvent::Focus => guard.keypad.handle_focus(),
                MachineEvent::Unfocus => guard.keypad.handle_unfocus(),
                MachineEvent::FocusingKeyDown(key) => guard.keypad.handle_focusing_key_down(key),
            }
        }

        for _ in 0..cycles_per_frame {
            match guard.cycle() {
                Ok(CycleOutcome::Completed { beep }) => {
                    cycles_executed += 1;
                    if beep {
                        audio_sender.send(AudioEvent::Beep).ok();
                    }
                }
                Ok(CycleOutcome::Blocked) => {
                    // waiting on a key; the frame pacer below is the poll
                    // interval, so just end the frame
                    break;
                }
                Err(e) if e.is_fatal() => {
                    log::error!("machine halted: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    // unknown opcode: the cycle was aborted with pc intact,
                    // keep running from the next frame
                    log::warn!("{}", e);
                    break;
                }
            }
        }

        drop(guard);

        frame_start = frame_start
            .checked_add(TARGET_FRAME_DURATION)
            .expect("Could not calculate next frame start");
        let sleep_start = Instant::now();
        let sleep_duration = frame_start.saturating_duration_since(sleep_start);

        if sleep_duration.is_zero() {
            log::warn!(
                "Overran target frame time by {} us! Starting next frame immediately",
                sleep_start.duration_since(frame_start).as_micros()
            );
            frame_start = sleep_start;
        } else {
            spin_sleep::sleep(sleep_duration);
        }
    }

    Ok(RunSummary {
        rom_name,
        up_time: thread_start.elapsed(),
        cycles_executed,
        target_frequency,
    })
}

pub struct RunSummary {
    rom_name: String,
    up_time: Duration,
    cycles_executed: u64,
    target_frequency: u32,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let achieved = self.cycles_executed as f64 / self.up_time.as_secs_f64();
        let diff = (achieved - self.target_frequency as f64) / self.target_frequency as f64 * 100.0;
        let color_diff = if diff.abs() > OKAY_CYCLE_FREQUENCY_PERCENT_DIFF {
            Stylize::red
        } else if diff.abs() > GOOD_CYCLE_FREQUENCY_PERCENT_DIFF {
            Stylize::yellow
        } else {
            Stylize::green
        };

        writeln!(
            f,
            "{} \"{}\" runtime",
            "Analyzing".green().bold(),
            self.rom_name
        )?;
        writeln!(
            f,
            "    {} Ran for {:.3}s ({} cycles)",
            "|".blue().bold(),
            self.up_time.as_secs_f64(),
            self.cycles_executed
        )?;
        write!(
            f,
            "    {} Cycled at {:#07.2}Hz",
            "=".blue().bold(),
            if achieved.is_finite() { achieved } else { 0.0 }
        )?;

        if achieved.is_finite() {
            write!(
                f,
                " ( {} from {:#04}Hz target )",
                color_diff(format!(
                    "{}{:.2}%",
                    if diff >= 0.0 { "+" } else { "" },
                    diff
                ))
                .bold(),
                self.target_frequency
            )?;
        }

        Ok(())
    }
}
