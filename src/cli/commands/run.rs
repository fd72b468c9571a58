//! The `run` command: load a definition, drive the tick loop, and serve
//! the operator console.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::args::RunArgs;
use crate::config;
use crate::error::TrialflowError;
use crate::observability::EventEmitter;
use crate::phases::PhaseRegistry;
use crate::phases::registry::parse_duration;
use crate::runner::ExperimentRunner;
use crate::signals::SignalBus;

/// Runs an experiment definition to completion (or cancellation).
///
/// # Errors
///
/// Returns a configuration error for an unloadable definition or a bad
/// `--tick-interval`, and an I/O error if the event file cannot be opened.
pub async fn run(args: &RunArgs) -> Result<(), TrialflowError> {
    let registry = PhaseRegistry::with_defaults();
    let loaded = config::load(&args.config, &registry)?;

    let emitter = match &args.events {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stdout(),
    };

    let bus = SignalBus::new();
    let mut runner =
        ExperimentRunner::from_config(&loaded.config, &registry, bus.clone(), emitter)?;
    if let Some(raw) = &args.tick_interval {
        runner.set_tick_interval(parse_duration(raw, "--tick-interval")?);
    }

    let cancel = CancellationToken::new();
    let console = if args.no_console {
        None
    } else {
        info!("operator console ready (next, input <text>, quit)");
        Some(tokio::spawn(console_loop(bus, cancel.clone())))
    };

    let reason = runner.run(cancel.clone()).await;
    info!(?reason, "run finished");

    cancel.cancel();
    if let Some(handle) = console {
        handle.abort();
    }
    Ok(())
}

/// Reads operator commands from stdin until cancelled or EOF.
async fn console_loop(bus: SignalBus, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_command(&bus, &cancel, line.trim()),
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }
}

/// Applies one console command.
fn handle_command(bus: &SignalBus, cancel: &CancellationToken, line: &str) {
    if line.is_empty() {
        return;
    }
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match command {
        "next" | "n" => {
            bus.force_next_phase();
        }
        "input" | "i" => {
            bus.input(rest.trim());
        }
        "quit" | "q" => cancel.cancel(),
        other => eprintln!("unknown command: {other} (try: next, input <text>, quit)"),
    }
}

#[cfg(test)]
mod tests {
    use crate::signals::Signal;

    use super::*;

    #[test]
    fn test_next_command_broadcasts_override() {
        let bus = SignalBus::new();
        let cancel = CancellationToken::new();
        let mut rx = bus.subscribe();
        handle_command(&bus, &cancel, "next");
        assert_eq!(rx.try_recv().unwrap(), Signal::NextPhase);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_input_command_carries_payload() {
        let bus = SignalBus::new();
        let cancel = CancellationToken::new();
        let mut rx = bus.subscribe();
        handle_command(&bus, &cancel, "input left arrow");
        assert_eq!(
            rx.try_recv().unwrap(),
            Signal::Input {
                value: "left arrow".to_string()
            }
        );
    }

    #[test]
    fn test_quit_command_cancels() {
        let bus = SignalBus::new();
        let cancel = CancellationToken::new();
        handle_command(&bus, &cancel, "quit");
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_unknown_and_empty_commands_are_inert() {
        let bus = SignalBus::new();
        let cancel = CancellationToken::new();
        let mut rx = bus.subscribe();
        handle_command(&bus, &cancel, "");
        handle_command(&bus, &cancel, "dance");
        assert!(rx.try_recv().is_err());
        assert!(!cancel.is_cancelled());
    }
}
