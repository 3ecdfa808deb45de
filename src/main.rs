use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use pyroseq::checkpoint::{Checkpoint, CheckpointError, FileCheckpointStore};
use pyroseq::config::Config;
use pyroseq::console::ConsoleObserver;
use pyroseq::countdown::{skip_channel, spawn_stdin_listener};
use pyroseq::error::ShowError;
use pyroseq::link::{open_port, protocol, DryRunLink, SerialLink};
use pyroseq::runner::{check_start, RunOutcome, ShowRunner};
use pyroseq::show::{load_show, Pin, Show};
use pyroseq::shutdown::{spawn_signal_listener, ShutdownHandle};

/// Fire a pyrotechnic show over a serial link.
///
/// Without --gogogo every mode is a dry run: the full sequence and timing are
/// rehearsed but nothing is sent to the controller.
#[derive(Debug, Parser)]
#[command(name = "pyroseq", version)]
struct Cli {
    /// Config file (default: ~/.config/pyroseq/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show file to run instead of the configured one
    #[arg(long, value_name = "PATH")]
    show: Option<PathBuf>,

    /// Serial device instead of the configured one
    #[arg(long, value_name = "DEVICE")]
    port: Option<String>,

    /// Zero-based step to start from; earlier steps are skipped
    #[arg(long, value_name = "STEP", default_value_t = 0)]
    start: usize,

    /// Print the expected show and exit
    #[arg(short, long)]
    dump: bool,

    /// Check communication with the controller and exit
    #[arg(short, long)]
    comm: bool,

    /// Trigger each test pin in order
    #[arg(short, long, conflicts_with_all = ["fire", "recover"])]
    test: bool,

    /// Fire a single pin
    #[arg(short, long, value_name = "PIN", value_parser = parse_pin, conflicts_with = "recover")]
    fire: Option<Pin>,

    /// Resume from the checkpoint left by a failed run
    #[arg(short, long, conflicts_with = "start")]
    recover: bool,

    /// Actually run the show
    #[arg(long)]
    gogogo: bool,
}

fn parse_pin(value: &str) -> Result<Pin, String> {
    let raw: i64 = value.parse().map_err(|e| format!("{e}"))?;
    Pin::try_from(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    pyroseq::logging::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli)?;
    let store = FileCheckpointStore::new(config.show.checkpoint_path.clone());

    if cli.comm {
        let mut link = open_link(&config)?;
        let reply = protocol::check_liveness(&mut link).await;
        if reply.is_ack() {
            println!("Controller communication: OK");
            return Ok(ExitCode::SUCCESS);
        }
        println!("Controller communication: FAILED");
        return Ok(ExitCode::from(1));
    }

    let show = select_show(&cli, &config)?;
    // The checkpoint is only consumed once a live resume actually starts.
    let start = if cli.recover {
        let checkpoint = pending_checkpoint(&store)?;
        let verb = if cli.gogogo && !cli.dump { "Recovering" } else { "Would recover" };
        println!("{verb} to (zero-indexed) step {}", checkpoint.step_index);
        checkpoint.step_index
    } else {
        cli.start
    };
    check_start(&show, start)?;

    if cli.dump {
        println!("{}", show.plan(start));
        if let Some(checkpoint) = store.peek()? {
            println!(
                "Pending checkpoint in '{}': step {} pin {}",
                store.path().display(),
                checkpoint.step_index,
                checkpoint.failed_pin
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let shutdown = ShutdownHandle::new();
    spawn_signal_listener(shutdown.clone());
    let (trigger, skip) = skip_channel();
    spawn_stdin_listener(trigger);

    let outcome = if cli.gogogo {
        let link = open_link(&config)?;
        let mut runner = ShowRunner::new(link, store, ConsoleObserver::new(), skip, shutdown)
            .with_liveness(config.show.liveness);
        if cli.recover {
            runner.resume(&show).await?
        } else {
            runner.run(&show, start).await?
        }
    } else {
        println!("No --gogogo so running in dry run mode, will not trigger any pins.");
        let link = DryRunLink::new();
        let mut runner = ShowRunner::new(link, store, ConsoleObserver::new(), skip, shutdown)
            .with_liveness(config.show.liveness);
        let outcome = runner.run(&show, start).await?;
        println!(
            "Dry run: {} command(s) were not sent.",
            runner.link().suppressed().len()
        );
        outcome
    };

    report(&outcome, &config);
    Ok(ExitCode::from(outcome.exit_code()))
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(show) = &cli.show {
        config.show.show_path = show.clone();
    }
    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    config.validate()?;
    Ok(config)
}

fn select_show(cli: &Cli, config: &Config) -> anyhow::Result<Show> {
    if let Some(pin) = cli.fire {
        return Ok(Show::single_pin(pin));
    }
    if cli.test {
        return Ok(config.pin_test_show()?);
    }
    load_show(&config.show.show_path)
        .with_context(|| format!("Cannot load show '{}'", config.show.show_path.display()))
}

fn pending_checkpoint(store: &FileCheckpointStore) -> Result<Checkpoint, CheckpointError> {
    store.peek()?.ok_or_else(|| CheckpointError::NotFound {
        path: store.path().to_path_buf(),
    })
}

fn open_link(config: &Config) -> Result<SerialLink<tokio_serial::SerialStream>, ShowError> {
    let serial = &config.serial;
    open_port(&serial.port, serial.baud_rate, serial.read_timeout()).map_err(|source| {
        ShowError::SerialOpen {
            port: serial.port.clone(),
            source,
        }
    })
}

fn report(outcome: &RunOutcome, config: &Config) {
    match outcome {
        RunOutcome::Completed { steps_run } => tracing::info!(steps_run, "Run finished"),
        RunOutcome::Aborted {
            step_index,
            failed_pin,
            ..
        } => eprintln!(
            "Checkpoint '{}' records step {} pin {}.",
            config.show.checkpoint_path.display(),
            step_index,
            failed_pin
        ),
        RunOutcome::Interrupted { next_step } => {
            tracing::warn!(next_step, "Run interrupted by operator")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_dry_run_of_the_configured_show() {
        let cli = Cli::try_parse_from(["pyroseq"]).unwrap();
        assert!(!cli.gogogo);
        assert_eq!(cli.start, 0);
        assert!(cli.fire.is_none());
    }

    #[test]
    fn fire_rejects_reserved_pin() {
        assert!(Cli::try_parse_from(["pyroseq", "--fire", "0"]).is_err());
        assert!(Cli::try_parse_from(["pyroseq", "--fire", "200"]).is_err());
        let cli = Cli::try_parse_from(["pyroseq", "-f", "12"]).unwrap();
        assert_eq!(cli.fire.map(Pin::get), Some(12));
    }

    #[test]
    fn recover_conflicts_with_other_sequences() {
        assert!(Cli::try_parse_from(["pyroseq", "--recover", "--test"]).is_err());
        assert!(Cli::try_parse_from(["pyroseq", "--recover", "--fire", "3"]).is_err());
        assert!(Cli::try_parse_from(["pyroseq", "--recover", "--start", "2"]).is_err());
    }

    #[test]
    fn single_pin_overrides_show_file() {
        let cli =
            Cli::try_parse_from(["pyroseq", "--fire", "7", "--show", "/missing.json"]).unwrap();
        let show = select_show(&cli, &Config::default()).unwrap();
        assert_eq!(show, Show::single_pin(Pin::new(7).unwrap()));
    }
}
