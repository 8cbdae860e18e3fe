#![forbid(unsafe_code)]

//! Builders overview demo.
//!
//! Seeds an in-memory session, mounts one overview component and pages
//! through the builders, printing which renders hit the server.

mod cli;
mod logging;
mod overview;

use std::process::ExitCode;

use bbui_runtime::RuntimeConfig;
use tracing::error;

fn main() -> ExitCode {
    let opts = cli::Opts::parse();
    logging::init(opts.log_format);

    let summary = match overview::run(&opts, RuntimeConfig::from_env()) {
        Ok(summary) => summary,
        Err(err) => {
            error!(%err, "demo run failed");
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if opts.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    for frame in &summary.frames {
        println!(
            "render {:>3}  builders {:<12}  builds {:>3}  pending {:>3}  {}",
            frame.render,
            frame.shown.to_string(),
            frame.builds,
            frame.pending,
            if frame.refetched { "fetched" } else { "cached" },
        );
    }
    println!(
        "{} builders, {} active masters, {} workers",
        summary.builders, summary.masters, summary.workers
    );
    println!(
        "handles opened {} closed {}, fetches {}",
        summary.stats.handles_opened, summary.stats.handles_closed, summary.stats.fetches
    );
    ExitCode::SUCCESS
}
