//! Command-line front-end for macro files.
//!
//! Usage:
//!   clickloop init run
//!   clickloop inspect run.json
//!   clickloop edit run.json 0 offset_x 10
//!   clickloop add-scroll run.json --x 400 --y 300 --amount -5
//!   clickloop dry-run run.json --cycles 3

use clap::{Parser, Subcommand};
use clickloop::{
    ChannelSource, ClickKind, ClickRecord, ClickSequence, Controller, DryRunInjector, RecordField,
    persist,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clickloop")]
#[command(author, version, about = "Inspect, edit and dry-run click macros")]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty macro file (".json" is added when missing)
    Init {
        /// File name, at most 20 characters (default: `save_file` from config)
        name: Option<String>,
    },

    /// Print every record in a macro file
    Inspect { file: PathBuf },

    /// Change one field of one record
    Edit {
        file: PathBuf,
        index: usize,
        /// x, y, button, delay, is_double_click, offset_x, offset_y, is_scroll, scroll_amount
        field: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Delete one record
    Remove { file: PathBuf, index: usize },

    /// Append a scroll action
    AddScroll {
        file: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        x: i32,
        #[arg(long, allow_hyphen_values = true)]
        y: i32,
        /// Positive scrolls up, negative down
        #[arg(long, allow_hyphen_values = true)]
        amount: i32,
        /// Seconds to wait afterwards
        #[arg(long, default_value_t = 0.0)]
        delay: f64,
    },

    /// Replay a macro without touching real input, printing each action
    DryRun {
        file: PathBuf,
        /// Cycle limit (overrides config; 0 = until Ctrl+C)
        #[arg(long)]
        cycles: Option<u32>,
        /// Seconds between injected actions (overrides config)
        #[arg(long)]
        step_time: Option<f64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("clickloop={},warn", log_level))),
        )
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> clickloop::Result<()> {
    let config = clickloop::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Init { name } => {
            let name = name.unwrap_or_else(|| config.save_file.clone());
            let Some(file) = persist::normalize_file_name(&name) else {
                return Err(clickloop::Error::Config(format!(
                    "invalid file name {name:?}: 1 to {} characters",
                    persist::MAX_FILE_NAME_LEN
                )));
            };
            persist::save(&ClickSequence::new(), &file)?;
            println!("Created {file}");
        }
        Command::Inspect { file } => {
            print_table(&persist::load(&file)?);
        }
        Command::Edit {
            file,
            index,
            field,
            value,
        } => {
            let field: RecordField = field.parse()?;
            update(&file, |seq| seq.edit(index, field, &value))?;
        }
        Command::Remove { file, index } => {
            update(&file, |seq| seq.remove(index).map(|_| ()))?;
        }
        Command::AddScroll {
            file,
            x,
            y,
            amount,
            delay,
        } => {
            let mut record = ClickRecord::scroll(x, y, amount);
            record.apply_edit(RecordField::Delay, &delay.to_string())?;
            update(&file, |seq| {
                seq.push(record);
                Ok(())
            })?;
        }
        Command::DryRun {
            file,
            cycles,
            step_time,
        } => {
            let mut config = config;
            if let Some(cycles) = cycles {
                config.replay.max_cycles = cycles;
            }
            if let Some(step_time) = step_time {
                config.step_time = step_time;
            }
            dry_run(&file, &config)?;
        }
    }
    Ok(())
}

/// Load, modify, save back.
fn update(
    file: &Path,
    f: impl FnOnce(&mut ClickSequence) -> clickloop::Result<()>,
) -> clickloop::Result<()> {
    let mut seq = persist::load(file)?;
    f(&mut seq)?;
    persist::save(&seq, file)?;
    print_table(&seq);
    Ok(())
}

fn print_table(seq: &ClickSequence) {
    println!(
        "{:>3}  {:>6} {:>6}  {:<7} {:<6} {:>7} {:>5} {:>5} {:>6}",
        "#", "x", "y", "button", "kind", "delay", "dx", "dy", "scroll"
    );
    for (i, rec) in seq.iter().enumerate() {
        let kind = match rec.kind() {
            ClickKind::Single => "click",
            ClickKind::Double => "double",
            ClickKind::Scroll => "scroll",
        };
        let button = rec.button.map(|b| b.name()).unwrap_or("-");
        println!(
            "{:>3}  {:>6} {:>6}  {:<7} {:<6} {:>7.3} {:>5} {:>5} {:>6}",
            i, rec.x, rec.y, button, kind, rec.delay, rec.offset_x, rec.offset_y, rec.scroll_amount
        );
    }
    println!("{} records", seq.len());
}

fn dry_run(file: &Path, config: &clickloop::Config) -> clickloop::Result<()> {
    let (pointer, _pointer_feed) = ChannelSource::new();
    let (keyboard, _keyboard_feed) = ChannelSource::new();
    let injector = Arc::new(DryRunInjector::new());
    let controller = Arc::new(Controller::from_config(
        Box::new(pointer),
        Box::new(keyboard),
        injector.clone(),
        config,
    )?);

    // Handle Ctrl+C
    let handle = Arc::downgrade(&controller);
    ctrlc::set_handler(move || {
        if let Some(controller) = handle.upgrade() {
            controller.stop_replay();
        }
    })
    .map_err(|e| clickloop::Error::ThreadError(format!("failed to set Ctrl-C handler: {e}")))?;

    let count = controller.load(file)?;
    if config.replay.max_cycles == 0 {
        println!("No cycle limit; press Ctrl+C to stop.");
    }
    println!("Replaying {count} records...");
    controller.start_replay()?;

    if let Some(report) = controller.wait_replay() {
        println!(
            "Replay finished after {} cycles ({:?}): {} clicks, {} double clicks, {} scrolls, {} failures",
            report.cycles,
            report.reason,
            report.clicks,
            report.double_clicks,
            report.scrolls,
            report.failures
        );
    }
    println!("{} injected actions", injector.actions().len());
    Ok(())
}
