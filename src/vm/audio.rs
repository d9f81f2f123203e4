use anyhow::{Context, Result};
use rodio::{buffer::SamplesBuffer, OutputStream, Sink};

use std::{
    sync::mpsc::{channel, Receiver, Sender},
    thread::JoinHandle,
    time::Duration,
};

const SAMPLE_RATE: u32 = 4000;
const BEEP_FREQUENCY: u32 = 500;
const BEEP_DURATION: Duration = Duration::from_millis(100);

/// Fire-and-forget triggers from the cycle loop to the audio thread.
#[derive(Debug, Clone, Copy)]
pub enum AudioEvent {
    Beep,
}

/// Spawns the thread that owns the output stream and sink. When no output
/// device is available the thread logs the failure and swallows events, so
/// beeps degrade rather than crashing the run. The thread exits once every
/// sender is dropped.
pub fn spawn_audio_thread() -> (Sender<AudioEvent>, JoinHandle<()>) {
    let (event_sender, event_receiver) = channel::<AudioEvent>();
    let handle = std::thread::spawn(move || run_beeper(event_receiver));

    (event_sender, handle)
}

fn run_beeper(event_receiver: Receiver<AudioEvent>) {
    let (_stream, sink) = match open_output() {
        Ok(output) => output,
        Err(e) => {
            log::error!("audio output unavailable, beeps are disabled: {:#}", e);
            for _ in event_receiver.iter() {}
            return;
        }
    };

    for event in event_receiver.iter() {
        match event {
            AudioEvent::Beep => {
                log::trace!("beep");
                if sink.empty() {
                    sink.append(beep_source());
                }
            }
        }
    }

    sink.stop();
}

fn open_output() -> Result<(OutputStream, Sink)> {
    let (stream, stream_handle) =
        OutputStream::try_default().context("Failed to get default audio output stream")?;
    let sink = Sink::try_new(&stream_handle).context("Failed to create audio sink")?;
    Ok((stream, sink))
}

// a plain square wave, BEEP_DURATION long
fn beep_source() -> SamplesBuffer<f32> {
    let samples = (SAMPLE_RATE as f64 * BEEP_DURATION.as_secs_f64()) as usize;
    let period = SAMPLE_RATE / BEEP_FREQUENCY;
    let data: Vec<f32> = (0..samples)
        .map(|i| if (i as u32 % period) < period / 2 { 1.0 } else { 0.0 })
        .collect();

    SamplesBuffer::new(1, SAMPLE_RATE, data)
}
