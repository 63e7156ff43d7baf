//! mooflash - SST25WF040 flash tool
//!
//! Runs the `mooflash-core` engine, kill switch and command dispatcher
//! against an emulated chip whose array is persisted in an image file.
//! The engine talks to the emulator through the same interrupt-latched
//! serial transport a board would use.

mod cli;
mod commands;
mod config;
mod error;
mod image;

use clap::Parser;
use cli::{Cli, Commands};
use config::Settings;
use mooflash_core::transport::RxLatch;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    let settings = match cli.config.as_deref() {
        Some(path) => Settings::from_toml_file(path)?,
        None => Settings::default(),
    };

    let latch = RxLatch::new();
    let mut flash = image::open(&settings, &cli.image, &latch)?;

    let persist = match cli.command {
        Commands::Id => {
            commands::flash::run_id(&mut flash)?;
            false
        }
        Commands::Status => {
            commands::flash::run_status(&mut flash)?;
            false
        }
        Commands::Read {
            address,
            length,
            output,
        } => {
            commands::flash::run_read(&mut flash, address, length, output.as_deref())?;
            false
        }
        Commands::Write { address, value } => {
            commands::flash::run_write(&mut flash, address, value)?;
            true
        }
        Commands::Erase { kind, address } => {
            commands::flash::run_erase(&mut flash, kind, address)?;
            true
        }
        Commands::Unprotect => {
            commands::flash::run_unprotect(&mut flash)?;
            true
        }
        Commands::Kill => {
            commands::kill::run_kill(&mut flash)?;
            true
        }
        Commands::IsKilled => {
            commands::kill::run_is_killed(&mut flash)?;
            false
        }
        Commands::Rpc { id, param } => {
            // A failed or rejected call may still have changed the array.
            let result = commands::rpc::run_rpc(&mut flash, settings.tone, id, param);
            image::close(flash, &cli.image)?;
            return result.map(|_| ());
        }
        Commands::Sweep { start, end } => {
            let result = commands::sweep::run_sweep(&mut flash, start, end);
            image::close(flash, &cli.image)?;
            return result.map(|_| ());
        }
    };

    if persist {
        image::close(flash, &cli.image)?;
    }
    Ok(())
}
