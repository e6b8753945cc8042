use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;

use procstat::cli::CommandArgs;
use procstat::models::Selector;
use procstat::{ProcessTracker, SystemTable, TableFinder};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    let selectors = args.selectors();
    if selectors.is_empty() {
        bail!("no selector given; use --pid-file, --pattern, --user, --full-pattern or --child-pattern");
    }

    print_banner(&args, &selectors);

    let table = Arc::new(SystemTable::new());
    let finder = TableFinder::new(table.clone());
    let mut tracker = ProcessTracker::new(table);
    let collector = args.stats_collector();

    let mut ticker = tokio::time::interval(args.poll_interval());
    let mut polls = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted, stopping");
                break;
            }
        }

        let samples = tracker.poll(&finder, &selectors, &collector);
        log::debug!("poll {}: {} samples", polls + 1, samples.len());

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for sample in &samples {
            let line = serde_json::to_string(sample).context("failed to encode sample")?;
            writeln!(out, "{}", line).context("failed to write sample")?;
        }
        out.flush().context("failed to flush stdout")?;

        polls += 1;
        if args.count > 0 && polls >= args.count {
            break;
        }
    }

    Ok(())
}

fn print_banner(args: &CommandArgs, selectors: &[Selector]) {
    log::info!("procstat v{}", env!("CARGO_PKG_VERSION"));
    log::info!("polling every {}s", args.poll_interval().as_secs());
    for selector in selectors {
        log::info!("  selector {}", selector);
    }
    if args.memory_maps {
        log::info!("  collecting memory maps");
    }
    if args.rlimits {
        log::info!("  collecting resource limits");
    }
}
