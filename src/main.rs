//! pcode-run: run a pseudocode program in the terminal.
//!
//! The program runs on the background worker; this thread renders its output
//! and answers its input requests from stdin. Lines typed (or piped) before a
//! request arrives are queued. Once stdin is closed every request is answered
//! with empty input.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pcode_runner::config::{RunnerConfig, RunnerFlags};
use pcode_runner::console::Console;
use pcode_runner::events::{Message, WorkerEvent};
use pcode_runner::input::StdinReader;
use pcode_runner::pipeline::RunController;
use pcode_runner::script::{ScriptInterpreter, samples};
use pcode_runner::shared_buffer::DEFAULT_CAPACITY;

/// Run a pseudocode program with blocking input on a background worker
#[derive(Parser, Debug)]
#[command(name = "pcode-run")]
#[command(version, about, long_about = None)]
struct Args {
    /// Program file to run
    #[arg(conflicts_with = "sample")]
    file: Option<PathBuf>,

    /// Run a bundled sample instead of a file
    #[arg(short, long, value_name = "NAME")]
    sample: Option<String>,

    /// List bundled samples and exit
    #[arg(long)]
    list_samples: bool,

    /// Input buffer capacity in bytes (answers are truncated to capacity - 1)
    #[arg(long, env = "PCODE_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Log filter for stderr (falls back to RUST_LOG, then "warn")
    #[arg(long, env = "PCODE_LOG", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,

    /// Echo answers after the prompt (useful with piped input)
    #[arg(long)]
    echo: bool,

    /// Do not print the finish summary
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(args: &Args) {
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let layer = fmt::layer().with_target(false).with_writer(io::stderr);
    tracing_subscriber::registry().with(layer.with_filter(filter)).init();
}

fn load_program(args: &Args) -> Result<(String, String)> {
    if let Some(name) = &args.sample {
        let source = samples::get(name).with_context(|| {
            let known: Vec<&str> = samples::names().collect();
            format!("unknown sample `{name}` (available: {})", known.join(", "))
        })?;
        return Ok((samples::display_title(name), source.to_string()));
    }
    let Some(path) = &args.file else {
        bail!("no program given; pass a file or --sample NAME (see --list-samples)");
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((path.display().to_string(), source))
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(&args);

    if args.list_samples {
        for name in samples::names() {
            println!("{name:<12} {}", samples::display_title(name));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (title, source) = load_program(&args)?;

    let mut flags = RunnerFlags::default();
    flags.set(RunnerFlags::COLOR, !args.no_color);
    flags.set(RunnerFlags::SHOW_SUMMARY, !args.quiet);
    flags.set(RunnerFlags::ECHO_INPUT, args.echo);
    let config = RunnerConfig::default().with_capacity(args.capacity).with_flags(flags);

    let mut controller =
        RunController::spawn(config, ScriptInterpreter::new()).context("failed to start runner")?;
    let _reader = StdinReader::stdin(controller.sender()).context("failed to start stdin reader")?;
    let mut console = Console::new(io::stdout().lock(), flags);

    let run = controller.start_run(source)?;
    info!(%run, program = %title, "running");

    let mut queued: VecDeque<String> = VecDeque::new();
    let mut stdin_closed = false;

    let code = loop {
        match controller.recv()? {
            Message::Worker(WorkerEvent::Ready) => debug!("worker ready"),
            Message::Worker(WorkerEvent::InputRequested { prompt, .. }) => {
                console.prompt(&prompt)?;
                if let Some(answer) = queued.pop_front() {
                    console.echo(&answer)?;
                    controller.submit(&answer);
                } else if stdin_closed {
                    console.echo("")?;
                    controller.cancel_input();
                }
            }
            Message::Worker(WorkerEvent::OutputProduced { text, .. }) => console.output(&text)?,
            Message::Worker(WorkerEvent::RunFinished { text, .. }) => {
                console.finished(&text)?;
                break ExitCode::SUCCESS;
            }
            Message::Worker(WorkerEvent::RunFailed { message, .. }) => {
                console.failed(&message)?;
                break ExitCode::FAILURE;
            }
            Message::Line(line) => {
                if controller.pending().is_some() {
                    console.echo(&line)?;
                    controller.submit(&line);
                } else {
                    queued.push_back(line);
                }
            }
            Message::Closed => {
                debug!("stdin closed");
                stdin_closed = true;
                if controller.pending().is_some() {
                    console.echo("")?;
                    controller.cancel_input();
                }
            }
        }
    };

    Ok(code)
}
