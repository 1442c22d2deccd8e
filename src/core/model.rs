use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Acknowledgment workflow state of an alert.
///
/// The only legal moves are the ones `can_transition_to` admits; everything
/// else is rejected by the registry as an illegal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Freshly parsed, no dispatch decision applied yet.
    PendingDispatch,
    /// Held for a human operator to release.
    ManualTriage,
    /// Notified, waiting for the recipient to acknowledge.
    PendingAcknowledgment,
    /// Acknowledged or auto-escalated; terminal for this engine.
    InProgress,
}

impl AlertState {
    pub fn can_transition_to(self, to: AlertState) -> bool {
        use AlertState::*;
        matches!(
            (self, to),
            (PendingDispatch, ManualTriage)
                | (PendingDispatch, PendingAcknowledgment)
                | (PendingDispatch, InProgress)
                | (ManualTriage, PendingAcknowledgment)
                | (PendingAcknowledgment, InProgress)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingDispatch => "pending_dispatch",
            Self::ManualTriage => "manual_triage",
            Self::PendingAcknowledgment => "pending_acknowledgment",
            Self::InProgress => "in_progress",
        }
    }

    /// Parse the wire form. Returns `None` for anything unknown, including
    /// the reserved empty string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_dispatch" => Some(Self::PendingDispatch),
            "manual_triage" => Some(Self::ManualTriage),
            "pending_acknowledgment" => Some(Self::PendingAcknowledgment),
            "in_progress" => Some(Self::InProgress),
            _ => None,
        }
    }
}

/// One detected field event, tracked through the acknowledgment workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub name: String,
    pub serial: String,
    pub timestamp: DateTime<Utc>,
    pub position: String,
    pub label: String,
    /// Short human-facing reference code, e.g. "A-0007".
    pub sequence_code: String,
    pub state: AlertState,
    /// Outbound address, set only when a transition triggers notification.
    pub target: Option<String>,
}

impl Alert {
    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            id: self.id,
            name: self.name.clone(),
            timestamp: self.timestamp,
            label: self.label.clone(),
            target: self.target.clone(),
            state: self.state,
        }
    }
}

/// Reduced projection returned by every query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSummary {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub target: Option<String>,
    pub state: AlertState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_edges() {
        use AlertState::*;
        assert!(PendingDispatch.can_transition_to(ManualTriage));
        assert!(PendingDispatch.can_transition_to(PendingAcknowledgment));
        assert!(PendingDispatch.can_transition_to(InProgress));
        assert!(ManualTriage.can_transition_to(PendingAcknowledgment));
        assert!(PendingAcknowledgment.can_transition_to(InProgress));
    }

    #[test]
    fn test_illegal_edges_rejected() {
        use AlertState::*;
        // Nothing leaves InProgress in this engine.
        for to in [PendingDispatch, ManualTriage, PendingAcknowledgment, InProgress] {
            assert!(!InProgress.can_transition_to(to));
        }
        assert!(!ManualTriage.can_transition_to(InProgress));
        assert!(!PendingAcknowledgment.can_transition_to(ManualTriage));
        assert!(!PendingAcknowledgment.can_transition_to(PendingDispatch));
    }

    #[test]
    fn test_state_wire_form_round_trips() {
        for state in [
            AlertState::PendingDispatch,
            AlertState::ManualTriage,
            AlertState::PendingAcknowledgment,
            AlertState::InProgress,
        ] {
            assert_eq!(AlertState::parse(state.as_str()), Some(state));
        }
        assert_eq!(AlertState::parse(""), None);
        assert_eq!(AlertState::parse("to_dispatch"), None);
    }
}
