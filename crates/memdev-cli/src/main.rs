use clap::{Parser, Subcommand};
use tracing::Level;

use memdev_cli::{ExerciseArgs, StressArgs, commands};

#[derive(Parser)]
#[command(
    name = "memdev",
    about = "Exercise and stress a synchronized in-memory buffer device",
    version,
    author,
    long_about = "A command-line tool for driving a synchronized in-memory byte-buffer device: a scripted end-to-end exercise of the read, write, and control surface, plus a multi-session stress runner with cancellable lock waits."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted end-to-end exercise against a fresh device
    Exercise(ExerciseArgs),

    /// Hammer one device from many concurrent sessions
    Stress(StressArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Exercise(args) => commands::exercise::handle(args)?,
        Commands::Stress(args) => commands::stress::handle(args)?,
    }

    Ok(())
}
