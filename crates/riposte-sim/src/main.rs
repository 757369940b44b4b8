//! # Riposte
//!
//! Headless arena for the Riposte gameplay core.
//!
//! Plays a scripted encounter between the player character and chasing
//! enemies, printing every gameplay event as a JSON line followed by a
//! summary. Pass a `.toml` or `.ron` scenario path to override the
//! built-in encounter.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod arena;
mod scenario;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use riposte_gameplay::{config, EventBus, GameEvent};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::scenario::{Encounter, Scenario};

/// Loads the scenario named on the command line, falling back to the
/// built-in one when the file can't be used.
fn load_scenario() -> Scenario {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        info!("No scenario given, using the built-in encounter");
        return Scenario::default();
    };
    match config::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            warn!("Failed to load scenario {}: {e}", path.display());
            Scenario::default()
        },
    }
}

/// Write one event as a JSON line.
fn write_event(out: &mut impl Write, event: &GameEvent) -> Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("riposte=info".parse()?))
        .init();

    info!("Riposte arena starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let scenario = load_scenario();
    let mut encounter = Encounter::new(scenario, EventBus::new(4096))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;
    let summary = encounter.run(|event| {
        if write_error.is_none() {
            write_error = write_event(&mut out, event).err();
        }
    });
    if let Some(e) = write_error {
        return Err(e);
    }

    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}
