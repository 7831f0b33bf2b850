pub mod config;
pub mod routine;
pub mod run;
pub mod simulate;

use std::sync::Arc;

use pulse_core::{Clock, Config, Coordinator, Event, MemoryRoutineStore, TracingCueSink};

/// Coordinator over the configured routines, speaking through the log.
pub(crate) fn build_coordinator(config: Config, clock: Arc<dyn Clock>) -> Coordinator {
    let store = Arc::new(MemoryRoutineStore::new(config.routines()));
    let cues = Arc::new(TracingCueSink::new(config.voice()));
    Coordinator::new(config, store, cues, clock)
}

/// One JSON object per line.
pub(crate) fn print_events(events: &[Event]) -> Result<(), serde_json::Error> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
