use std::sync::{Mutex, MutexGuard};

use super::{default_routines, Routine, RoutineStore, WorkSession};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    routines: Vec<Routine>,
    sessions: Vec<WorkSession>,
}

/// In-process routine store. Routines keep their insertion order.
#[derive(Debug, Default)]
pub struct MemoryRoutineStore {
    inner: Mutex<Inner>,
}

impl MemoryRoutineStore {
    pub fn new(routines: Vec<Routine>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                routines,
                sessions: Vec::new(),
            }),
        }
    }

    /// Store seeded with the built-in routines.
    pub fn with_defaults() -> Self {
        Self::new(default_routines())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert or replace a routine by name.
    pub fn upsert(&self, routine: Routine) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match inner.routines.iter_mut().find(|r| r.name == routine.name) {
            Some(existing) => *existing = routine,
            None => inner.routines.push(routine),
        }
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<Routine, StoreError> {
        let mut inner = self.lock()?;
        let index = inner
            .routines
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| StoreError::UnknownRoutine(name.to_string()))?;
        Ok(inner.routines.remove(index))
    }

    pub fn sessions(&self) -> Result<Vec<WorkSession>, StoreError> {
        Ok(self.lock()?.sessions.clone())
    }
}

impl RoutineStore for MemoryRoutineStore {
    fn routines(&self) -> Result<Vec<Routine>, StoreError> {
        Ok(self.lock()?.routines.clone())
    }

    fn routine(&self, name: &str) -> Result<Routine, StoreError> {
        self.lock()?
            .routines
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownRoutine(name.to_string()))
    }

    fn record_session(&self, session: WorkSession) -> Result<(), StoreError> {
        tracing::debug!(routine = %session.routine_name, logs = session.logs.len(), "work session recorded");
        self.lock()?.sessions.push(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ExerciseStep;
    use chrono::Utc;

    #[test]
    fn active_routines_skip_inactive_and_empty() {
        let store = MemoryRoutineStore::new(vec![
            Routine::new("A", 30, vec![ExerciseStep::timed("Neck", 10)]),
            Routine::new("B", 30, Vec::new()),
            Routine::new("C", 30, vec![ExerciseStep::timed("Neck", 10)]).inactive(),
        ]);
        let names: Vec<String> = store
            .active_routines()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn unknown_routine_is_an_error() {
        let store = MemoryRoutineStore::with_defaults();
        assert!(matches!(
            store.routine("Nope"),
            Err(StoreError::UnknownRoutine(name)) if name == "Nope"
        ));
        assert_eq!(store.routine("Micro Pausa").unwrap().interval_minutes, 30);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let store = MemoryRoutineStore::with_defaults();
        let mut micro = store.routine("Micro Pausa").unwrap();
        micro.interval_minutes = 20;
        store.upsert(micro).unwrap();
        let routines = store.routines().unwrap();
        assert_eq!(routines.len(), 2);
        assert_eq!(routines[0].interval_minutes, 20);
    }

    #[test]
    fn sessions_are_recorded() {
        let store = MemoryRoutineStore::with_defaults();
        let now = Utc::now();
        store
            .record_session(WorkSession::new("Micro Pausa", now, now, 30, true, Vec::new()))
            .unwrap();
        assert_eq!(store.sessions().unwrap().len(), 1);
    }
}
