//! Routine definitions and the store the host reads them from.

mod memory;
mod routine;
mod work_session;

pub use memory::MemoryRoutineStore;
pub use routine::{default_routines, validate_routines, Routine};
pub use work_session::WorkSession;

use crate::error::StoreError;

/// Where routines come from and where finished work sessions go.
///
/// The coordinator reads a fresh copy of a routine each time it starts a
/// session, so edits apply from the next session on.
pub trait RoutineStore: Send + Sync {
    /// Every routine, in display order.
    fn routines(&self) -> Result<Vec<Routine>, StoreError>;

    fn routine(&self, name: &str) -> Result<Routine, StoreError>;

    fn record_session(&self, session: WorkSession) -> Result<(), StoreError>;

    /// Routines that get a timer: active and with at least one exercise.
    fn active_routines(&self) -> Result<Vec<Routine>, StoreError> {
        Ok(self
            .routines()?
            .into_iter()
            .filter(Routine::is_schedulable)
            .collect())
    }
}
