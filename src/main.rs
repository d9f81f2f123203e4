mod cli;
mod render;
mod vm;

use {
    cli::{Cli, CliCommand},
    vm::{audio::spawn_audio_thread, instr::Opcode, rom::Rom, spawn_run_threads},
};

use anyhow::{bail, Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    match Cli::parse().command {
        CliCommand::Run { path, hz, log } => {
            if let Some(level) = log {
                tui_logger::init_logger(level.to_level_filter())
                    .context("Failed to initialize logger")?;
                tui_logger::set_default_level(level.to_level_filter());
            }

            let rom = Rom::read(&path, log.is_some())
                .with_context(|| format!("Failed to read ROM \"{}\"", path.display()))?;

            // a panic inside any thread must not leave the terminal in raw
            // mode on the alternate screen
            let default_panic_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |panic_info| {
                render::panic_cleanup_terminal().ok();
                default_panic_hook(panic_info);
            }));

            let (audio_sender, audio_thread) = spawn_audio_thread();
            let (main_thread, render_thread) = spawn_run_threads(rom, hz, audio_sender);

            render_thread
                .join()
                .map_err(|_| anyhow::anyhow!("Render thread panicked"))?;

            let run_result = main_thread
                .join()
                .map_err(|_| anyhow::anyhow!("Main thread panicked"))?;

            audio_thread
                .join()
                .map_err(|_| anyhow::anyhow!("Audio thread panicked"))?;

            match run_result {
                Ok(summary) => println!("{}", summary),
                Err(e) => bail!("machine halted: {}", e),
            }
        }

        CliCommand::Check { path, log } => {
            if let Some(level) = log {
                simple_logger::init_with_level(level.to_level())
                    .context("Failed to initialize logger")?;
            }

            let rom = Rom::read(&path, log.is_some())
                .with_context(|| format!("Failed to read ROM \"{}\"", path.display()))?;

            let mut unknown_words = 0_usize;

            for (i, pair) in rom.data.chunks(2).enumerate() {
                let address = vm::mem::PROGRAM_STARTING_ADDRESS + 2 * i as u16;

                let &[b0, b1] = pair else {
                    println!("{:#05X}: trailing byte {:#04X}", address, pair[0]);
                    continue;
                };

                let opcode = Opcode::from_bytes(b0, b1);
                match opcode.decode() {
                    Some(instruction) => println!("{:#05X}: {}", address, instruction),
                    None => {
                        println!("{:#05X}: unknown {}", address, opcode);
                        unknown_words += 1;
                    }
                }
            }

            if unknown_words > 0 {
                bail!(
                    "\"{}\" contains {} unknown instruction word{}",
                    rom.config.name,
                    unknown_words,
                    if unknown_words == 1 { "" } else { "s" }
                );
            }

            println!("\"{}\" decoded cleanly", rom.config.name);
        }
    }

    Ok(())
}
