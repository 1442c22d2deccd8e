use std::sync::Arc;

use log::info;
use uuid::Uuid;

use super::model::{Alert, AlertState};

/// Outbound delivery capability. The concrete transport (SMS gateway, voice
/// bridge) lives outside this engine; implementations must be
/// fire-and-forget and must never block the caller.
pub trait NotificationPort: Send + Sync {
    fn deliver(&self, destination: &str, message: &str, correlation_id: Uuid);
}

/// Decides the initial state and notification side effect for every admitted
/// alert, and performs the notification hand-off on manual release.
///
/// Carries the configuration the legacy service kept in process globals: the
/// default target number and the manual-mode toggle.
pub struct DispatchPolicy {
    port: Arc<dyn NotificationPort>,
    target_number: String,
    escalate_every: u32,
    manual_mode: bool,
    /// Admissions since the last auto-escalation.
    admissions: u32,
}

impl DispatchPolicy {
    pub fn new(
        port: Arc<dyn NotificationPort>,
        target_number: impl Into<String>,
        escalate_every: u32,
        manual_mode: bool,
    ) -> Self {
        Self {
            port,
            target_number: target_number.into(),
            escalate_every: escalate_every.max(1),
            manual_mode,
            admissions: 0,
        }
    }

    pub fn manual_mode(&self) -> bool {
        self.manual_mode
    }

    pub fn set_manual_mode(&mut self, enabled: bool) {
        if self.manual_mode != enabled {
            info!("manual mode {}", if enabled { "enabled" } else { "disabled" });
        }
        self.manual_mode = enabled;
    }

    /// Apply the dispatch decision to a newly admitted alert.
    ///
    /// Every `escalate_every`-th admission is promoted straight to
    /// `InProgress` with the target assigned but no notification; otherwise
    /// manual mode holds the alert for triage and normal mode notifies the
    /// default target for acknowledgment.
    pub fn on_admit(&mut self, alert: &mut Alert) {
        self.admissions += 1;
        if self.admissions >= self.escalate_every {
            self.admissions = 0;
            alert.state = AlertState::InProgress;
            alert.target = Some(self.target_number.clone());
            info!("alert {} auto-escalated to in_progress", alert.sequence_code);
        } else if self.manual_mode {
            alert.state = AlertState::ManualTriage;
            info!("alert {} held for manual triage", alert.sequence_code);
        } else {
            alert.state = AlertState::PendingAcknowledgment;
            self.notify(alert);
        }
    }

    /// An operator released a triaged alert for acknowledgment; mirror the
    /// automatic path's target assignment and notification.
    pub fn on_manual_release(&mut self, alert: &mut Alert) {
        self.notify(alert);
    }

    fn notify(&self, alert: &mut Alert) {
        alert.target = Some(self.target_number.clone());
        let message = render_message(alert);
        self.port.deliver(&self.target_number, &message, alert.id);
    }
}

fn render_message(alert: &Alert) -> String {
    format!(
        "ALERT {}: {} reported {} at {}\n\nTEXT 1 TO ACKNOWLEDGE",
        alert.sequence_code,
        alert.name,
        alert.label,
        alert.timestamp.format("%d/%m/%Y %H:%M")
    )
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingPort;
    use super::*;
    use chrono::{TimeZone, Utc};

    const TARGET: &str = "+441234567890";

    fn make_alert(n: u32) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            name: "Ranger1".to_string(),
            serial: "SN1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            position: "51.5,-0.1".to_string(),
            label: "INTRUDER".to_string(),
            sequence_code: format!("A-{n:04}"),
            state: AlertState::PendingDispatch,
            target: None,
        }
    }

    fn policy(port: Arc<RecordingPort>, manual: bool) -> DispatchPolicy {
        DispatchPolicy::new(port, TARGET, 3, manual)
    }

    #[test]
    fn test_every_third_admission_escalates() {
        let port = Arc::new(RecordingPort::default());
        let mut policy = policy(port.clone(), false);

        // Two full cycles: notify, notify, escalate.
        for cycle in 0..2 {
            for n in 1..=3 {
                let mut alert = make_alert(cycle * 3 + n);
                policy.on_admit(&mut alert);
                if n == 3 {
                    assert_eq!(alert.state, AlertState::InProgress);
                } else {
                    assert_eq!(alert.state, AlertState::PendingAcknowledgment);
                }
                // Escalated and notified alerts both carry the target.
                assert_eq!(alert.target.as_deref(), Some(TARGET));
            }
        }
        assert_eq!(port.deliveries.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_manual_mode_holds_without_notify() {
        let port = Arc::new(RecordingPort::default());
        let mut policy = policy(port.clone(), true);

        let mut alert = make_alert(1);
        policy.on_admit(&mut alert);
        assert_eq!(alert.state, AlertState::ManualTriage);
        assert!(alert.target.is_none());
        assert!(port.deliveries.lock().unwrap().is_empty());

        // Escalation still wins over manual mode on the threshold admission.
        let mut second = make_alert(2);
        let mut third = make_alert(3);
        policy.on_admit(&mut second);
        policy.on_admit(&mut third);
        assert_eq!(second.state, AlertState::ManualTriage);
        assert_eq!(third.state, AlertState::InProgress);
        assert!(port.deliveries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_manual_release_notifies_once() {
        let port = Arc::new(RecordingPort::default());
        let mut policy = policy(port.clone(), true);

        let mut alert = make_alert(1);
        policy.on_admit(&mut alert);
        assert!(port.deliveries.lock().unwrap().is_empty());

        alert.state = AlertState::PendingAcknowledgment;
        policy.on_manual_release(&mut alert);

        let deliveries = port.deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 1);
        let (destination, message, correlation_id) = &deliveries[0];
        assert_eq!(destination, TARGET);
        assert_eq!(*correlation_id, alert.id);
        assert!(message.contains("A-0001"));
        assert!(message.contains("INTRUDER"));
        assert!(message.contains("01/01/2024 12:00"));
        assert_eq!(alert.target.as_deref(), Some(TARGET));
    }
}
