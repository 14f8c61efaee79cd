//! Command-line host for the engine bridge.
//!
//! Runs the table engine on a dedicated `engine` thread, prints every event it
//! produces, and drives it with line commands from stdin.
//!
//! Usage:
//!   imebridge-host --app-data data --app-lib lib --ext-data home
//!   imebridge-host --config bridge.toml --capture-output --json

mod commands;
mod output;

use anyhow::Context;
use clap::Parser;
use commands::{HostCommand, HELP};
use imebridge_core::{
    init_logging, Bridge, BridgeConfig, ChannelSink, Event, OutputRedirector, Phase,
    TracingLineSink, DEFAULT_FILTER,
};
use imebridge_table::TableEngine;
use output::Format;
use parking_lot::Mutex;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

type SharedOutput = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Parser, Debug)]
#[command(name = "imebridge-host")]
#[command(about = "Drive an input-method engine through the bridge from stdin")]
struct Args {
    /// Read-only application data directory (models live under ime/models)
    #[arg(long)]
    app_data: Option<PathBuf>,

    /// Engine add-on library directory
    #[arg(long)]
    app_lib: Option<PathBuf>,

    /// Writable data directory; becomes the engine's home
    #[arg(long)]
    ext_data: Option<PathBuf>,

    /// TOML configuration file; command-line paths override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input methods to enable, in order (repeatable)
    #[arg(long = "input-method")]
    input_methods: Vec<String>,

    /// Forward stdout/stderr of the process into the log
    #[arg(long)]
    capture_output: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

impl Args {
    fn bridge_config(&self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load_toml(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(dir) = &self.app_data {
            config.paths.app_data = dir.clone();
        }
        if let Some(dir) = &self.app_lib {
            config.paths.app_lib = dir.clone();
        }
        if let Some(dir) = &self.ext_data {
            config.paths.ext_data = dir.clone();
        }
        if !self.input_methods.is_empty() {
            config.input_methods = self.input_methods.clone();
            config.default_input_method = String::new();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Set up logging (and output capture if requested); returns the stream
/// events are printed to.
fn init_output(capture: bool) -> anyhow::Result<(SharedOutput, Option<OutputRedirector>)> {
    if !capture {
        init_logging(DEFAULT_FILTER, io::stderr)?;
        let out: Box<dyn Write + Send> = Box::new(io::stdout());
        return Ok((Arc::new(Mutex::new(out)), None));
    }

    let redirector = OutputRedirector::install(TracingLineSink)?;
    let log = redirector.original_stderr()?;
    init_logging(DEFAULT_FILTER, std::sync::Mutex::new(log))?;
    let out: Box<dyn Write + Send> = Box::new(redirector.saved().stdout.try_clone()?);
    tracing::info!("capturing engine output");
    Ok((Arc::new(Mutex::new(out)), Some(redirector)))
}

fn print_events(events: Receiver<Event>, out: SharedOutput, format: Format) {
    for event in events {
        match output::render(&event, format) {
            Ok(line) => {
                let mut out = out.lock();
                if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
                    tracing::warn!("failed to write event");
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to render event"),
        }
    }
    tracing::debug!("event stream closed");
}

fn execute(bridge: &Bridge, command: HostCommand, out: &SharedOutput) -> anyhow::Result<bool> {
    match command {
        HostCommand::Key(desc) => bridge.send_key(desc)?,
        HostCommand::Char(ch) => bridge.send_char(ch)?,
        HostCommand::Type(text) => {
            for ch in text.chars() {
                bridge.send_char(ch)?;
            }
        }
        HostCommand::Select(index) => bridge.select_candidate(index)?,
        HostCommand::Reset => bridge.reset_input_panel()?,
        HostCommand::Empty => {
            let empty = bridge.is_input_panel_empty();
            writeln!(out.lock(), "empty: {}", empty)?;
        }
        HostCommand::Stop => bridge.stop()?,
        HostCommand::Quit => {
            if bridge.is_running() {
                bridge.stop()?;
            }
            return Ok(false);
        }
        HostCommand::Help => writeln!(out.lock(), "{}", HELP)?,
    }
    Ok(true)
}

fn run(args: Args) -> anyhow::Result<i32> {
    let config = args.bridge_config().context("invalid configuration")?;
    let (out, _redirector) = init_output(args.capture_output)?;
    let format = if args.json { Format::Json } else { Format::Text };
    let bridge = Bridge::global();

    let (tx, rx) = mpsc::channel();
    let engine = thread::Builder::new()
        .name("engine".to_string())
        .spawn(move || {
            Bridge::global().start(&config, TableEngine::from_environment, ChannelSink::new(tx))
        })?;
    let printer = {
        let out = out.clone();
        thread::Builder::new()
            .name("events".to_string())
            .spawn(move || print_events(rx, out, format))?
    };

    let deadline = Instant::now() + STARTUP_TIMEOUT;
    while !bridge.wait_until_running(Duration::from_millis(50)) {
        if engine.is_finished() || Instant::now() >= deadline {
            tracing::warn!("engine is not running");
            break;
        }
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<HostCommand>() {
            Ok(command) => command,
            Err(err) => {
                writeln!(out.lock(), "error: {}", err)?;
                continue;
            }
        };
        match execute(bridge, command, &out) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => writeln!(out.lock(), "error: {:#}", err)?,
        }
        if engine.is_finished() {
            break;
        }
    }

    // End of input stops the engine too.
    if bridge.phase() == Phase::Starting {
        bridge.wait_until_running(STARTUP_TIMEOUT);
    }
    if bridge.is_running() {
        let _ = bridge.stop();
    }

    let status = match engine.join() {
        Ok(Ok(code)) => code,
        Ok(Err(err)) => {
            tracing::error!(error = %err, "engine failed");
            err.exit_status()
        }
        Err(_) => anyhow::bail!("engine thread panicked"),
    };
    if printer.join().is_err() {
        tracing::warn!("event printer panicked");
    }
    out.lock().flush()?;
    tracing::info!(status, "host exiting");
    Ok(status)
}

fn main() -> anyhow::Result<()> {
    let status = run(Args::parse())?;
    std::process::exit(status);
}
