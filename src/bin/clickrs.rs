// Clickrs Replay CLI
// Feeds a textual edge script through the classification engine and prints
// every trigger, for poking at the state machine without HID plumbing

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;

use clickrs_core::{
    ButtonEngine, ButtonNumber, CapabilityOracle, ClickTiming, DeviceId, MaxClickLevel,
    PassThrough, Trigger, TriggerSink,
};

/// Replay button edge scripts through the trigger classifier
#[derive(Parser, Debug)]
#[command(name = "clickrs")]
#[command(author = "clickrs contributors")]
#[command(about = "Replay button edge scripts through the trigger classifier", long_about = None)]
struct Args {
    /// Edge script file (reads stdin when omitted)
    script: Option<PathBuf>,

    /// TOML configuration file with a [timing] section
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Hold window in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    hold_ms: Option<u64>,

    /// Click-cycle window in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    level_ms: Option<u64>,

    /// Maximum meaningful click level (unbounded when omitted)
    #[arg(long, value_name = "LEVEL")]
    max_level: Option<u32>,

    /// Report Suppress for every classified trigger
    #[arg(long)]
    suppress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Sink that prints each trigger as it is emitted.
struct PrintSink {
    decision: PassThrough,
}

impl TriggerSink for PrintSink {
    fn handle(&self, trigger: &Trigger) -> PassThrough {
        println!("trigger: {trigger}");
        self.decision
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.verbose { "debug" } else { "warn" }),
    )
    .init();

    let mut timing = match &args.config {
        Some(path) => ClickTiming::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClickTiming::default(),
    };
    if let Some(hold_ms) = args.hold_ms {
        timing.hold_ms = hold_ms;
    }
    if let Some(level_ms) = args.level_ms {
        timing.level_ms = level_ms;
    }

    let oracle: Arc<dyn CapabilityOracle> = Arc::new(match args.max_level {
        Some(max) => MaxClickLevel::new(max),
        None => MaxClickLevel::unbounded(),
    });
    let sink = Arc::new(PrintSink {
        decision: if args.suppress {
            PassThrough::Suppress
        } else {
            PassThrough::Forward
        },
    });

    let engine = ButtonEngine::new(timing, oracle, sink)?;

    let reader: Box<dyn Read> = match &args.script {
        Some(path) => Box::new(
            std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(std::io::stdin()),
    };

    for (number, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if let Err(err) = run_command(&engine, line.trim()) {
            bail!("line {}: {err}", number + 1);
        }
    }

    Ok(())
}

fn run_command(engine: &ButtonEngine, line: &str) -> anyhow::Result<()> {
    if line.is_empty() || line.starts_with('#') {
        return Ok(());
    }
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();

    match command {
        "down" | "up" => {
            let device = parse_device(parts.next())?;
            let button = parse_button(parts.next())?;
            let decision = engine.on_edge(device, button, command == "down", Instant::now());
            match decision {
                Ok(PassThrough::Forward) => println!("passthrough: forward"),
                Ok(PassThrough::Suppress) => println!("passthrough: suppress"),
                Err(err) => {
                    // Degrade to forwarding the hardware event, per policy.
                    log::error!("edge dropped: {err}");
                    println!("passthrough: forward");
                }
            }
        }
        "wait" => {
            let ms: u64 = parts
                .next()
                .context("wait needs a duration in ms")?
                .parse()
                .context("invalid duration")?;
            std::thread::sleep(Duration::from_millis(ms));
        }
        "mods" => match parts.next() {
            Some(raw) => {
                let device = parse_device(Some(raw))?;
                let chord = engine.modifiers().active_modifiers(device);
                println!("mods(device={device}): {}", format_chord(&chord));
            }
            None => match engine.modifiers().active_modifiers_any() {
                Some((device, chord)) => {
                    println!("mods(any -> device={device}): {}", format_chord(&chord));
                }
                None => println!("mods(any): none"),
            },
        },
        "detach" => {
            engine.on_device_detached(parse_device(parts.next())?);
        }
        "reset" => {
            let device = parse_device(parts.next())?;
            let button = parse_button(parts.next())?;
            engine.reset_button(device, button);
        }
        other => bail!("unknown command '{other}'"),
    }
    Ok(())
}

fn parse_device(raw: Option<&str>) -> anyhow::Result<DeviceId> {
    let raw = raw.context("missing device id")?;
    Ok(DeviceId::new(raw.parse().context("invalid device id")?))
}

fn parse_button(raw: Option<&str>) -> anyhow::Result<ButtonNumber> {
    let raw = raw.context("missing button number")?;
    Ok(ButtonNumber::new(raw.parse().context("invalid button number")?))
}

fn format_chord(chord: &[clickrs_core::ActiveModifier]) -> String {
    if chord.is_empty() {
        return "none".to_string();
    }
    chord
        .iter()
        .map(|m| format!("button {} (level {})", m.button, m.click_level))
        .collect::<Vec<_>>()
        .join(", ")
}
