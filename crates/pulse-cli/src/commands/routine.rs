use clap::Subcommand;
use pulse_core::format::format_minutes_seconds;
use pulse_core::{Config, Routine, StoreError};
use serde::Serialize;

#[derive(Subcommand)]
pub enum RoutineAction {
    /// List routines with their interval and session length
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one routine and its exercises as JSON
    Show {
        /// Routine name
        name: String,
    },
}

#[derive(Serialize)]
struct RoutineSummary<'a> {
    name: &'a str,
    interval_minutes: u32,
    is_active: bool,
    exercises: usize,
    total_duration_seconds: u64,
}

#[derive(Serialize)]
struct RoutineDetail<'a> {
    #[serde(flatten)]
    routine: &'a Routine,
    total_duration_seconds: u64,
}

pub fn run(action: RoutineAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let routines = config.routines();

    match action {
        RoutineAction::List { json } => {
            if json {
                let summaries: Vec<RoutineSummary> = routines
                    .iter()
                    .map(|r| RoutineSummary {
                        name: &r.name,
                        interval_minutes: config.clamp_interval(r.interval_minutes),
                        is_active: r.is_active,
                        exercises: r.exercises.len(),
                        total_duration_seconds: r.total_duration_seconds(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for r in &routines {
                    let status = if r.is_schedulable() { "" } else { "  (inactive)" };
                    println!(
                        "{:<20} every {:>3} min  {} exercises  {}{status}",
                        r.name,
                        config.clamp_interval(r.interval_minutes),
                        r.exercises.len(),
                        format_minutes_seconds(r.total_duration_seconds()),
                    );
                }
            }
        }
        RoutineAction::Show { name } => {
            let routine = routines
                .iter()
                .find(|r| r.name == name)
                .ok_or(StoreError::UnknownRoutine(name))?;
            let detail = RoutineDetail {
                routine,
                total_duration_seconds: routine.total_duration_seconds(),
            };
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
    }
    Ok(())
}
