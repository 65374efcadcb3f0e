//! dayplan: triage and reschedule a plan stored as JSON.
//!
//! Results are printed as JSON. `--write` saves the updated plan back to
//! `--plan` (and the review log to `--history`). Set `RUST_LOG` for logs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use dayplan::config::load_config;
use dayplan::progress::{day_load, progress_summary};
use dayplan::services::plan as plan_service;
use dayplan::util::{atomic_write_str, parse_date, parse_datetime};
use dayplan::workflow::review::{completion_rate, draft_review};
use dayplan::{AiSuggestion, EngineConfig, EngineError, EngineErrorPayload, Plan, Review, ReviewLog};

/// Task scheduling and daily triage over a JSON plan file.
#[derive(Parser)]
#[command(name = "dayplan", version, about)]
struct Cli {
    /// Plan file to read (and, with --write, update).
    #[arg(long, global = true)]
    plan: Option<PathBuf>,

    /// Save the updated plan back to --plan.
    #[arg(long, global = true)]
    write: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show (or allocate) the top 3 and backlog for a day.
    Today {
        /// Day to plan (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = day_arg)]
        date: Option<NaiveDate>,
        /// Available hours when a new plan has to be allocated.
        #[arg(long)]
        hours: Option<f64>,
    },

    /// Move a task and propagate the change to its dependents.
    Move {
        /// Id of the task to move.
        #[arg(long)]
        task: String,
        #[arg(long, value_parser = datetime_arg)]
        start: NaiveDateTime,
        #[arg(long, value_parser = datetime_arg)]
        end: NaiveDateTime,
    },

    /// Draft a review for a day, or submit one with --review.
    Review {
        /// Review JSON to reconcile into tomorrow's plan.
        #[arg(long)]
        review: Option<PathBuf>,
        /// Review log used for risk escalation.
        #[arg(long)]
        history: Option<PathBuf>,
        /// Day to draft a review for. Defaults to today.
        #[arg(long, value_parser = day_arg)]
        date: Option<NaiveDate>,
        /// Tomorrow's available hours for a drafted review.
        #[arg(long)]
        hours: Option<f64>,
    },

    /// Summarize progress, plus the load of one day if given.
    Progress {
        #[arg(long, value_parser = day_arg)]
        date: Option<NaiveDate>,
    },

    /// Apply an accepted suggestion.
    Apply {
        /// Suggestion JSON as printed by `move`.
        #[arg(long)]
        suggestion: PathBuf,
    },
}

fn day_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got `{}`", raw))
}

fn datetime_arg(raw: &str) -> Result<NaiveDateTime, String> {
    parse_datetime(raw).ok_or_else(|| format!("expected a date or date-time, got `{}`", raw))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let payload = EngineErrorPayload::from(&e);
        match serde_json::to_string_pretty(&payload) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("dayplan failed: {}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let config = load_config()?;
    let path = cli
        .plan
        .ok_or_else(|| EngineError::ParseError("missing --plan".to_string()))?;
    let write = cli.write;

    match cli.command {
        Command::Today { date, hours } => cmd_today(&path, write, date, hours, &config),
        Command::Move { task, start, end } => cmd_move(&path, write, &task, start, end, &config),
        Command::Review {
            review: Some(review),
            history,
            ..
        } => cmd_submit_review(&path, write, &review, history.as_deref(), &config),
        Command::Review {
            review: None,
            date,
            hours,
            ..
        } => cmd_draft_review(&path, date, hours, &config),
        Command::Progress { date } => cmd_progress(&path, date),
        Command::Apply { suggestion } => cmd_apply(&path, write, &suggestion),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn cmd_today(
    path: &Path,
    write: bool,
    date: Option<NaiveDate>,
    hours: Option<f64>,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    let mut plan: Plan = read_json(path)?;
    let date = date.unwrap_or_else(today);
    let daily = plan_service::today_plan(&plan, date, hours, config);

    if write {
        plan.upsert_daily_plan(daily.clone());
        write_json(path, &plan)?;
    }
    print_json(&daily)
}

fn cmd_move(
    path: &Path,
    write: bool,
    task_id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    let plan: Plan = read_json(path)?;
    plan_service::validate_tasks(&plan.tasks)?;

    let outcome = plan_service::move_task(&plan, task_id, start, end, config)?;
    if write {
        write_json(path, &outcome.plan)?;
    }
    print_json(&json!({
        "moves": outcome.moves,
        "tasks": outcome.plan.tasks,
    }))
}

fn cmd_draft_review(
    path: &Path,
    date: Option<NaiveDate>,
    hours: Option<f64>,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    let plan: Plan = read_json(path)?;
    let date = date.unwrap_or_else(today);

    let draft = draft_review(&plan, date, hours.unwrap_or(config.default_available_hours));
    let rate = plan
        .daily_plan(date)
        .map(|daily| completion_rate(daily, &plan.tasks))
        .unwrap_or(0);
    print_json(&json!({ "draft": draft, "completionRate": rate }))
}

fn cmd_submit_review(
    path: &Path,
    write: bool,
    review_path: &Path,
    history_path: Option<&Path>,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    let plan: Plan = read_json(path)?;
    plan_service::validate_tasks(&plan.tasks)?;
    let review: Review = read_json(review_path)?;
    let mut history = match history_path {
        Some(p) => ReviewLog::load(p)?,
        None => ReviewLog::default(),
    };

    let outcome = plan_service::submit_review(&plan, &review, &history, config);
    if write {
        write_json(path, &outcome.plan)?;
        if let Some(p) = history_path {
            history.record(review);
            history.save(p)?;
        }
    }
    print_json(&outcome)
}

fn cmd_progress(path: &Path, date: Option<NaiveDate>) -> Result<(), EngineError> {
    let plan: Plan = read_json(path)?;
    let summary = progress_summary(&plan.tasks);
    let load = date
        .and_then(|date| plan.daily_plan(date))
        .map(|daily| day_load(daily, &plan.tasks));

    print_json(&json!({ "summary": summary, "dayLoad": load }))
}

fn cmd_apply(path: &Path, write: bool, suggestion_path: &Path) -> Result<(), EngineError> {
    let plan: Plan = read_json(path)?;
    let suggestion: AiSuggestion = read_json(suggestion_path)?;

    let updated = plan_service::apply_suggestion(&plan, &suggestion);
    if write {
        write_json(path, &updated)?;
    }
    print_json(&updated)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let content = fs::read_to_string(path)
        .map_err(|e| EngineError::IoError(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| EngineError::ParseError(format!("{}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), EngineError> {
    let content = serde_json::to_string_pretty(value)?;
    atomic_write_str(path, &content)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), EngineError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
