//! The `drillkit history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use drillkit_core::history::summarize;
use drillkit_core::sink::{load_results, JsonlSink};
use drillkit_providers::load_config_from;

pub fn execute(results_dir: Option<PathBuf>, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let dir = match results_dir {
        Some(dir) => dir,
        None => load_config_from(config_path.as_deref())?.results_dir,
    };
    let path = dir.join(JsonlSink::FILE_NAME);
    let results = load_results(&path)?;

    let summaries = summarize(&results);
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No sessions recorded in {}", path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Variant",
        "Sessions",
        "Completed",
        "Best score",
        "Mean accuracy",
        "Top level",
        "Best streak",
        "Time played",
    ]);

    for summary in summaries {
        let secs = summary.total_time.as_secs();
        table.add_row(vec![
            Cell::new(summary.variant),
            Cell::new(summary.sessions),
            Cell::new(summary.completed),
            Cell::new(summary.best_score),
            Cell::new(format!("{:.1}%", summary.mean_accuracy * 100.0)),
            Cell::new(summary.highest_level),
            Cell::new(summary.best_streak),
            Cell::new(format!("{}m {:02}s", secs / 60, secs % 60)),
        ]);
    }

    println!("{table}");
    println!("{} session(s) in {}", results.len(), path.display());
    Ok(())
}
