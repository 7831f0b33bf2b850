use std::sync::Arc;

use clap::Args;
use pulse_core::{Config, Coordinator, Event, Heartbeat, SystemClock};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_coordinator, print_events};

#[derive(Args)]
pub struct RunArgs {
    /// Do not start the routine timers until `start` is entered
    #[arg(long)]
    no_start: bool,
}

/// A line read from stdin.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start,
    Pause,
    Resume,
    Skip,
    Trigger(String),
    Snooze(Option<u64>),
    Restart(String),
    StartNow,
    Cancel,
    Postpone(u32),
    SessionPause,
    SessionResume,
    SkipExercise,
    Background,
    Foreground,
    ScreenOff,
    ScreenOn,
    Status,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".into());
    };
    let rest: Vec<&str> = words.collect();
    let arg = rest.join(" ");
    let number = |what: &str| -> Result<u64, String> {
        arg.parse::<u64>()
            .map_err(|_| format!("{verb} expects {what}, got '{arg}'"))
    };

    let command = match verb {
        "start" => Command::Start,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "skip" => Command::Skip,
        "trigger" if !arg.is_empty() => Command::Trigger(arg.clone()),
        "snooze" if arg.is_empty() => Command::Snooze(None),
        "snooze" => Command::Snooze(Some(number("seconds")?)),
        "restart" if !arg.is_empty() => Command::Restart(arg.clone()),
        "go" | "start-now" => Command::StartNow,
        "cancel" => Command::Cancel,
        "postpone" => {
            let minutes = u32::try_from(number("minutes")?).map_err(|e| e.to_string())?;
            Command::Postpone(minutes)
        }
        "session-pause" => Command::SessionPause,
        "session-resume" => Command::SessionResume,
        "skip-exercise" => Command::SkipExercise,
        "background" => Command::Background,
        "foreground" => Command::Foreground,
        "screen-off" => Command::ScreenOff,
        "screen-on" => Command::ScreenOn,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

/// Apply one command. `None` means quit.
fn apply(
    coordinator: &mut Coordinator,
    command: Command,
) -> Result<Option<Vec<Event>>, Box<dyn std::error::Error>> {
    let events = match command {
        Command::Quit => return Ok(None),
        Command::Start => coordinator.start()?,
        Command::Pause => coordinator.pause_timers(),
        Command::Resume => coordinator.resume_timers(),
        Command::Skip => coordinator.skip_timer(),
        Command::Trigger(id) => coordinator.trigger_routine(&id),
        Command::Snooze(Some(seconds)) => coordinator.snooze(seconds),
        Command::Snooze(None) => coordinator.snooze_default(),
        Command::Restart(id) => coordinator.restart_routine(&id),
        Command::StartNow => {
            let mut events = coordinator.start_now();
            events.extend(coordinator.start_current_exercise());
            events
        }
        Command::Cancel => coordinator.cancel_session(),
        Command::Postpone(minutes) => coordinator.postpone(minutes),
        Command::SessionPause => {
            if !coordinator.pause_session() {
                coordinator.pause_preparing();
            }
            coordinator.status()
        }
        Command::SessionResume => {
            if !coordinator.resume_session() {
                coordinator.resume_preparing();
            }
            coordinator.status()
        }
        Command::SkipExercise => coordinator.skip_exercise(),
        Command::Background => {
            coordinator.enter_background();
            Vec::new()
        }
        Command::Foreground => coordinator.enter_foreground(),
        Command::ScreenOff => coordinator.screen_inactive(),
        Command::ScreenOn => coordinator.screen_active(),
        Command::Status => coordinator.status(),
    };
    Ok(Some(events))
}

async fn run_loop(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let auto_start = config.timers.auto_start && !args.no_start;
    let mut coordinator = build_coordinator(config, Arc::new(SystemClock));
    if auto_start {
        print_events(&coordinator.start()?)?;
    }

    let (heartbeat, mut ticks) = Heartbeat::every_second();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(()) = ticks.recv() => {
                print_events(&coordinator.tick())?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => match apply(&mut coordinator, command)? {
                        Some(events) => print_events(&events)?,
                        None => break,
                    },
                    Err(message) => eprintln!("error: {message}"),
                }
            }
        }
    }

    heartbeat.cancel();
    tracing::debug!("heartbeat stopped");
    Ok(())
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_loop(args))
}
