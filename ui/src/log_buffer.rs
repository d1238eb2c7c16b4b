use std::collections::VecDeque;
use std::sync::Mutex;

pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Bounded, timestamped activity log shown by the web UI.
///
/// Only the most recent `capacity` entries are kept.
pub struct RollingLog {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl RollingLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, message: impl AsRef<str>) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let line = format!("[{}] {}", timestamp, message.as_ref());
        tracing::info!("{}", message.as_ref());

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(line);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }
}

impl Default for RollingLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
