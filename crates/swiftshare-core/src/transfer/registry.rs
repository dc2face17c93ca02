//! Caller-owned list of active sessions.
//!
//! A [`TransferRegistry`] is handed to sessions as their
//! [`SessionObserver`]: sessions add themselves when spawned and remove
//! themselves when they reach a terminal state. Nothing here is global; a
//! program may keep as many registries as it likes.

use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::session::{SessionController, SessionHandle, SessionObserver, TransferSession};
use super::{SessionProgress, TransferOutcome};
use crate::history::TransferLogSink;

/// A registry row.
#[derive(Debug, Clone)]
pub struct ActiveTransfer {
    /// Session identifier
    pub id: Uuid,
    /// Latest progress snapshot
    pub progress: SessionProgress,
}

/// Tracks running sessions in start order.
#[derive(Debug, Clone, Default)]
pub struct TransferRegistry {
    sessions: Arc<Mutex<Vec<SessionController>>>,
}

impl TransferRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `session` and track it until it ends.
    pub fn start(&self, session: TransferSession, log: Arc<dyn TransferLogSink>) -> SessionHandle {
        session.spawn_observed(log, Arc::new(self.clone()))
    }

    /// Snapshot of every active session.
    #[must_use]
    pub fn active(&self) -> Vec<ActiveTransfer> {
        self.lock()
            .iter()
            .map(|c| ActiveTransfer {
                id: c.id(),
                progress: c.snapshot(),
            })
            .collect()
    }

    /// Number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no session is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Controller of an active session.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<SessionController> {
        self.lock().iter().find(|c| c.id() == id).cloned()
    }

    /// Pause a session. Returns `false` if unknown or not transferring.
    pub fn pause(&self, id: Uuid) -> bool {
        self.get(id).is_some_and(|c| c.pause())
    }

    /// Resume a session. Returns `false` if unknown or not paused.
    pub fn resume(&self, id: Uuid) -> bool {
        self.get(id).is_some_and(|c| c.resume())
    }

    /// Toggle pause on a session. Returns `false` if unknown or not pausable.
    pub fn toggle_pause(&self, id: Uuid) -> bool {
        self.get(id).is_some_and(|c| c.toggle_pause())
    }

    /// Remove a session from the registry, then cancel it.
    ///
    /// Returns `false` if the session is not (or no longer) active.
    pub fn cancel(&self, id: Uuid) -> bool {
        let removed = self.remove(id);
        if let Some(controller) = &removed {
            controller.cancel();
        }
        removed.is_some()
    }

    /// Cancel every active session.
    pub fn cancel_all(&self) {
        let drained: Vec<SessionController> = self.lock().drain(..).collect();
        for controller in drained {
            controller.cancel();
        }
    }

    fn remove(&self, id: Uuid) -> Option<SessionController> {
        let mut sessions = self.lock();
        let index = sessions.iter().position(|c| c.id() == id)?;
        Some(sessions.remove(index))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SessionController>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionObserver for TransferRegistry {
    fn on_started(&self, controller: &SessionController) {
        self.lock().push(controller.clone());
    }

    fn on_terminal(&self, id: Uuid, outcome: &TransferOutcome) {
        if self.remove(id).is_some() {
            tracing::debug!(%id, state = ?outcome.state(), "Session left registry");
        }
    }
}
