use std::collections::HashMap;

use log::{info, warn};
use thiserror::Error;
use uuid::Uuid;

use super::model::{Alert, AlertState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("alert {0} already registered")]
    Duplicate(Uuid),
    #[error("no alert with id {0}")]
    NotFound(Uuid),
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: AlertState, to: AlertState },
}

/// Authoritative set of alerts for the process lifetime.
///
/// One owning vector preserves insertion order for enumeration; the id index
/// is derived from it and kept in sync only by `insert`. `transition` is the
/// sole mutator of alert state — both the ingestion loop and the HTTP
/// command path go through it, and the whole registry sits behind a mutex in
/// the server so the check-and-set is atomic.
#[derive(Default)]
pub struct AlertRegistry {
    alerts: Vec<Alert>,
    index: HashMap<Uuid, usize>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alert: Alert) -> Result<(), RegistryError> {
        if self.index.contains_key(&alert.id) {
            return Err(RegistryError::Duplicate(alert.id));
        }
        info!(
            "registered alert {} [{}] {:?} from {}",
            alert.sequence_code, alert.id, alert.state, alert.name
        );
        self.index.insert(alert.id, self.alerts.len());
        self.alerts.push(alert);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&Alert> {
        self.index.get(&id).map(|&pos| &self.alerts[pos])
    }

    /// Alerts whose state matches exactly, in insertion order.
    pub fn list_by_state(&self, state: AlertState) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| a.state == state).collect()
    }

    pub fn list_all(&self) -> Vec<&Alert> {
        self.alerts.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Check-and-set state transition.
    ///
    /// `Ok(false)` means the alert was not in `from` — an expected outcome
    /// for racing commands, not an error. An edge outside the state table is
    /// a programming or caller error and is reported as such. On success the
    /// caller gets a mutable borrow of the alert to apply any transition
    /// side effects (target assignment) within the same critical section.
    pub fn transition(
        &mut self,
        id: Uuid,
        from: AlertState,
        to: AlertState,
    ) -> Result<Option<&mut Alert>, RegistryError> {
        if !from.can_transition_to(to) {
            return Err(RegistryError::IllegalTransition { from, to });
        }
        let pos = *self.index.get(&id).ok_or(RegistryError::NotFound(id))?;
        let alert = &mut self.alerts[pos];
        if alert.state != from {
            warn!(
                "alert {} not in state {:?} (currently {:?})",
                id, from, alert.state
            );
            return Ok(None);
        }
        alert.state = to;
        info!("alert {} moved {:?} -> {:?}", id, from, to);
        Ok(Some(alert))
    }
}
