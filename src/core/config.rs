use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Runtime settings, passed explicitly into the components that need them
/// rather than living in process globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Append-only CSV file the sensors write to.
    pub log_path: PathBuf,
    /// Default outbound number assigned when an alert is dispatched.
    pub target_number: String,
    /// Base URL of the SMS gateway collaborator.
    pub gateway_url: String,
    pub listen_port: u16,
    pub poll_interval_ms: u64,
    /// Start with new alerts held for manual triage.
    pub manual_mode: bool,
    /// Every Nth admission is auto-escalated instead of notified.
    pub escalate_every: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("alerts.csv"),
            target_number: "+441234567890".to_string(),
            gateway_url: "http://localhost:8080/sms".to_string(),
            listen_port: 8888,
            poll_interval_ms: 100,
            manual_mode: true,
            escalate_every: 3,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults for a
    /// missing file. A present-but-unparseable file is an error rather than
    /// a silent fallback, since it points at operator misconfiguration.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(io::Error::other)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }
}
