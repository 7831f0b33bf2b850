use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::Args;
use pulse_core::{Config, ManualClock};

use super::{build_coordinator, print_events};

#[derive(Args)]
pub struct SimulateArgs {
    /// Virtual seconds to run
    #[arg(long)]
    seconds: u64,
    /// Fire this routine before the first second
    #[arg(long)]
    fire: Option<String>,
    /// Start every exercise right away instead of waiting through the
    /// preparation countdown or a manual start
    #[arg(long)]
    auto_skip: bool,
    /// Print snapshots of both engines at the end
    #[arg(long)]
    status: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let start = Utc
        .with_ymd_and_hms(2026, 1, 5, 9, 0, 0)
        .single()
        .ok_or("invalid simulation start")?;
    let clock = ManualClock::new(start);
    let mut coordinator = build_coordinator(config, Arc::new(clock.clone()));

    print_events(&coordinator.start()?)?;
    if let Some(routine) = &args.fire {
        let events = coordinator.trigger_routine(routine);
        if events.is_empty() {
            return Err(format!("routine '{routine}' has no running timer").into());
        }
        print_events(&events)?;
    }

    for _ in 0..args.seconds {
        if args.auto_skip && coordinator.session().phase().allows_postpone() {
            print_events(&coordinator.start_now())?;
        }
        clock.advance(1);
        print_events(&coordinator.tick())?;
    }

    if args.status {
        print_events(&coordinator.status())?;
    }
    tracing::debug!(seconds = args.seconds, "simulation finished");
    Ok(())
}
