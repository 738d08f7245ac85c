//! WhatsGone: drive inventory snapshots.
//!
//! Thin binary entry point. All logic lives in the `whatsgone-core` crate;
//! this file parses arguments, sets up logging and Ctrl+C, and renders the
//! progress messages of the background run.

use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use whatsgone_core::config::{Config, DEFAULT_CONFIG_FILE};
use whatsgone_core::invoke::{CancelToken, WizTree};
use whatsgone_core::run::progress::{RunProgress, SkipReason};

#[derive(Parser)]
#[command(name = "whatsgone", version)]
#[command(about = "Snapshot drive contents with WizTree so you can diff what used to be there")]
struct Cli {
    /// Scan table to run
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Only run scans with this tag (repeatable)
    #[arg(short, long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Give up on a scan after this many seconds (overrides the config)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    // Progress owns stdout; log lines go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.retain_tags(&cli.tags);
    if let Some(secs) = cli.timeout {
        config.tool.timeout_secs = Some(secs);
    }

    if config.scans.is_empty() {
        println!("No scans to run.");
        return Ok(());
    }
    tracing::info!(
        "WhatsGone starting: {} scan(s), scanner {}",
        config.scans.len(),
        config.tool.path.display()
    );

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Received Ctrl+C, cancelling after the current step");
            cancel.cancel();
        })
        .context("installing Ctrl+C handler")?;
    }

    let handle = whatsgone_core::run::start_run(WizTree::new(config.tool), config.scans, cancel)
        .context("starting scan thread")?;

    let mut waiting_line = false;
    for msg in handle.progress_rx.iter() {
        if waiting_line && !matches!(msg, RunProgress::Waiting { .. }) {
            println!();
            waiting_line = false;
        }
        render(&msg, &mut waiting_line);
    }

    if handle.join().is_none() {
        anyhow::bail!("scan thread panicked");
    }
    Ok(())
}

fn render(msg: &RunProgress, waiting_line: &mut bool) {
    match msg {
        RunProgress::Started { tag, drive } => match drive {
            Some(d) => println!("[{tag}] scanning drive {}", d.volume()),
            None => println!("[{tag}] starting"),
        },
        RunProgress::Waiting {
            process, elapsed, ..
        } => {
            print!(
                "\rWaiting for {process} to finish... {}",
                format_elapsed(*elapsed)
            );
            let _ = std::io::stdout().flush();
            *waiting_line = true;
        }
        RunProgress::Skipped { tag, reason } => match reason {
            SkipReason::NoDrive => println!("[{tag}] skipped: no drive configured"),
            SkipReason::DriveMissing { preserved } => {
                println!("[{tag}] skipped: drive is missing");
                for path in preserved {
                    println!("[{tag}] previous snapshot kept as {}", path.display());
                }
            }
            SkipReason::Cancelled => println!("[{tag}] skipped: cancelled"),
        },
        RunProgress::Finished {
            tag,
            paths,
            output,
            backup,
        } => {
            println!("[{tag}] {paths} paths written to {}", output.display());
            if let Some(b) = backup {
                println!("[{tag}] backed up to {}", b.display());
            }
        }
        RunProgress::Failed { tag, message } => println!("[{tag}] failed: {message}"),
        RunProgress::Complete {
            duration,
            finished,
            skipped,
            failed,
        } => println!(
            "Done in {}: {finished} finished, {skipped} skipped, {failed} failed",
            format_elapsed(*duration)
        ),
    }
}

fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0s");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "59s");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "1m 01s");
    }

    #[test]
    fn cli_parses_repeated_tags() {
        let cli = Cli::parse_from([
            "whatsgone", "-c", "x.toml", "-t", "Movies", "--tag", "Music",
        ]);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert_eq!(cli.tags, ["Movies", "Music"]);
        assert_eq!(cli.timeout, None);
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["whatsgone"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(cli.tags.is_empty());
        assert!(!cli.verbose);
    }
}
