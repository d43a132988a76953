//! The `drillkit play` command: an interactive session on stdin/stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::Table;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

use drillkit_core::content::bank::load_banks;
use drillkit_core::content::BankSource;
use drillkit_core::engine::{AssessmentEngine, SessionHandle};
use drillkit_core::item::Item;
use drillkit_core::model::{Answer, Difficulty, ItemFlow, Phase, SessionResult, Variant};
use drillkit_core::session::SessionSnapshot;
use drillkit_core::sink::{FanoutSink, JsonlSink, LogSink};
use drillkit_core::traits::ResultSink;
use drillkit_providers::load_config_from;

pub struct PlayArgs {
    pub variant: Variant,
    pub items: Option<usize>,
    pub seed: Option<u64>,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub bank: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
}

pub async fn execute(args: PlayArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let mut session = config.session_config(args.variant);
    if let Some(n) = args.items {
        session.item_count = n;
    }
    if args.seed.is_some() {
        session.seed = args.seed;
    }
    if args.subject.is_some() {
        session.subject = args.subject.clone();
    }
    if let Some(difficulty) = args.difficulty {
        session.difficulty = difficulty;
    }

    let results_dir = args
        .results_dir
        .clone()
        .unwrap_or_else(|| config.results_dir.clone());
    let jsonl = JsonlSink::in_dir(&results_dir);
    let results_path = jsonl.path().to_path_buf();
    let sinks: Vec<Arc<dyn ResultSink>> = vec![Arc::new(jsonl), Arc::new(LogSink)];
    let sink: Arc<dyn ResultSink> = Arc::new(FanoutSink::new(sinks));
    let mut engine = AssessmentEngine::new(sink);

    if let Some(path) = &args.bank {
        anyhow::ensure!(
            matches!(args.variant, Variant::Quiz | Variant::Challenge),
            "--bank only applies to quiz and challenge"
        );
        let source = BankSource::new(load_banks(path)?);
        anyhow::ensure!(
            source.question_count() > 0,
            "no questions found in {}",
            path.display()
        );
        engine.register(Arc::new(source));
        session.content_source = "bank".into();
    } else if session.content_source == "remote" {
        engine.register(Arc::new(config.remote_source()?));
    }

    tracing::debug!(
        source = %session.content_source,
        items = session.item_count,
        results = %results_path.display(),
        "starting session"
    );
    let handle = engine
        .start(session)
        .await
        .with_context(|| format!("could not start {} session", args.variant))?;

    println!(
        "drillkit {} - answer each prompt and press Enter (:pause, :resume, :quit)",
        args.variant
    );
    drive(&handle, args.variant.flow()).await?;

    let result = handle.wait().await?;
    print_result(&result);
    println!("Saved to {}", results_path.display());
    Ok(())
}

/// Read answers until the session completes or input closes.
async fn drive(handle: &SessionHandle, flow: ItemFlow) -> Result<()> {
    let mut updates = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut acknowledged = 0usize;
    let mut last_shown: Option<(usize, usize, bool)> = None;
    let mut current: Option<Item> = None;

    loop {
        let snapshot = updates.borrow_and_update().clone();
        if snapshot.phase == Phase::Complete {
            if snapshot.answered > acknowledged {
                println!("Time's up!");
            }
            break;
        }
        if snapshot.awaiting_batch {
            if updates.changed().await.is_err() {
                break;
            }
            continue;
        }

        if snapshot.answered > acknowledged {
            match &current {
                Some(item) if flow == ItemFlow::Sequential => {
                    println!("Time's up! The answer was {}", item.expected())
                }
                _ => println!("Time's up!"),
            }
            acknowledged = snapshot.answered;
        }

        let key = (snapshot.answered, snapshot.open_items.len(), snapshot.paused);
        if last_shown != Some(key) {
            render(&snapshot, flow);
            current = snapshot.current_item().cloned();
            last_shown = Some(key);
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!("\nInput closed, abandoning session.");
                    handle.abandon().await?;
                    break;
                };
                if !respond(handle, line.trim(), flow, current.as_ref(), &mut acknowledged).await? {
                    break;
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Handle one input line. Returns `false` once the player quits.
async fn respond(
    handle: &SessionHandle,
    line: &str,
    flow: ItemFlow,
    current: Option<&Item>,
    acknowledged: &mut usize,
) -> Result<bool> {
    match line {
        "" => {}
        ":pause" | ":p" => {
            if handle.pause().await? {
                println!("Paused. Type :resume to continue.");
            }
        }
        ":resume" | ":r" => {
            if handle.resume().await? {
                println!("Resumed.");
            }
        }
        ":quit" | ":q" => {
            handle.abandon().await?;
            return Ok(false);
        }
        answer => {
            let step = handle.submit(Answer::new(answer)).await?;
            if step.is_ignored() {
                println!("(not accepted)");
            }
            *acknowledged += step.records.len();
            for record in &step.records {
                if record.correct {
                    println!(
                        "Correct! +{} (score {})",
                        record.points_awarded, record.score_after.points
                    );
                } else if let (ItemFlow::Sequential, Some(item)) = (flow, current) {
                    println!("Wrong. The answer was {}", item.expected());
                } else {
                    println!("Miss.");
                }
            }
        }
    }
    Ok(true)
}

fn render(snapshot: &SessionSnapshot, flow: ItemFlow) {
    if snapshot.paused {
        return;
    }
    let Some(item) = snapshot.current_item() else {
        return;
    };
    let clock = snapshot
        .remaining_at(Instant::now())
        .map(|left| format!(" [{}s left]", left.as_secs()))
        .unwrap_or_default();

    match flow {
        ItemFlow::Sequential => println!(
            "\n({}/{}){clock} {}",
            snapshot.answered + 1,
            snapshot.planned,
            item.prompt()
        ),
        ItemFlow::OpenBoard => println!(
            "\n{} left, score {}{clock}\n{}",
            snapshot.open_items.len(),
            snapshot.score.points,
            item.prompt()
        ),
    }
}

fn print_result(result: &SessionResult) {
    println!("\nSession over: {}", result.end_reason);
    println!("Final score: {}", result.final_score);

    let mut table = Table::new();
    table.set_header(vec!["Level", "Correct", "Accuracy", "Best streak", "Time"]);
    table.add_row(vec![
        result.level.to_string(),
        format!("{}/{}", result.correct_count, result.total_count),
        format!("{:.1}%", result.accuracy * 100.0),
        result.best_streak.to_string(),
        format!("{:.1}s", result.total_elapsed.as_secs_f64()),
    ]);
    println!("{table}");

    let missed: Vec<_> = result
        .per_item_breakdown
        .iter()
        .filter(|b| b.attempts > 0 && !b.correct)
        .collect();
    if !missed.is_empty() {
        println!("\nMissed:");
        for b in missed {
            let note = if b.timed_out { " (timed out)" } else { "" };
            println!("  {} -> {}{note}", b.prompt.lines().next().unwrap_or(""), b.expected);
        }
    }
}
