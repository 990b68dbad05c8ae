use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use clap::{Parser, ValueEnum};
use simplelog::{Config, LevelFilter, WriteLogger};
use snake_engine::config::{
    BoardSize, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH, EngineConfig, config_path,
    load_config_from_path,
};
use snake_engine::engine::Engine;
use snake_engine::events::{ChannelObserver, EngineEvent};
use snake_engine::input::{Command, SharedDirection};

/// Runs the snake engine headless: commands on stdin, events as JSON lines on stdout.
///
/// Commands: up/down/left/right (or wasd, hjkl), enter or an empty line to
/// restart, stop, quit.
#[derive(Debug, Parser)]
#[command(name = "snake-engine", version)]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_BOARD_WIDTH)]
    width: u32,

    #[arg(long, default_value_t = DEFAULT_BOARD_HEIGHT)]
    height: u32,

    /// Segment side length; also the distance moved per tick.
    #[arg(long)]
    extent: Option<u32>,

    /// Milliseconds between ticks.
    #[arg(long = "tick-ms")]
    tick_ms: Option<u64>,

    /// Fixed RNG seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,

    /// Accept immediate 180° turns on a multi-segment snake.
    #[arg(long = "allow-reversal")]
    allow_reversal: bool,

    /// JSON config file. Defaults to the platform config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr.
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = resolve_config(&cli)?;
    log::info!("starting snake-engine with {config:?}");

    run(&cli, config)
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let level = LevelFilter::from(cli.log_level);
    match &cli.log_file {
        Some(path) => WriteLogger::init(level, Config::default(), File::create(path)?)?,
        None => WriteLogger::init(level, Config::default(), io::stderr())?,
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<EngineConfig, Box<dyn Error>> {
    let path = cli.config.clone().unwrap_or_else(config_path);
    let mut config = load_config_from_path(&path)?;

    if let Some(extent) = cli.extent {
        config.segment_extent = extent;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.allow_reversal {
        config.allow_reversal = true;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli, config: EngineConfig) -> Result<(), Box<dyn Error>> {
    let engine = Engine::new(config)?;
    let (tx, rx) = mpsc::channel();
    engine.set_observer(Box::new(ChannelObserver::new(tx)));

    let printer = thread::Builder::new()
        .name("event-printer".into())
        .spawn(move || print_events(&rx))?;

    engine.start(BoardSize::new(cli.width, cli.height))?;
    let direction = engine.direction_handle();

    let stdin = io::stdin();
    'input: for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            handle_command(&engine, &direction, Command::Restart)?;
            continue;
        }

        for token in line.split_whitespace() {
            match Command::parse(token) {
                Some(Command::Quit) => break 'input,
                Some(command) => handle_command(&engine, &direction, command)?,
                None => log::warn!("ignoring unknown command {token:?}"),
            }
        }
    }

    engine.stop();
    drop(engine);

    if printer.join().is_err() {
        log::error!("event printer panicked");
    }
    Ok(())
}

fn handle_command(
    engine: &Engine,
    direction: &SharedDirection,
    command: Command,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Direction(next) => direction.store(next),
        Command::Restart => engine.restart()?,
        Command::Stop => engine.stop(),
        Command::Quit => {}
    }
    Ok(())
}

/// Prints events until the engine releases its end of the channel.
fn print_events(rx: &Receiver<EngineEvent>) {
    let stdout = io::stdout();
    for event in rx {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(error) => {
                log::error!("failed to encode event: {error}");
                continue;
            }
        };

        let mut out = stdout.lock();
        if writeln!(out, "{line}").and_then(|()| out.flush()).is_err() {
            log::warn!("stdout closed, no longer printing events");
            return;
        }
    }
}
