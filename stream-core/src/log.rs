//! Append-only event log.
//!
//! Each relay channel owns one `EventLog`. The writer appends encoded event
//! frames in arrival order; readers only ever look at slices of it.
//!
//! Once the terminal marker has been delivered the log is cleared and
//! sealed: later appends are rejected so a producer that keeps talking after
//! the reader left cannot grow a dead buffer.

use stream_types::is_terminal;

/// Error type for log operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// The log was cleared after completion and accepts no more entries.
    Sealed,
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::Sealed => write!(f, "event log is sealed"),
        }
    }
}

impl std::error::Error for LogError {}

/// Append-only sequence of encoded event frames.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<String>,
    /// Index of the first terminal marker, if one has been appended.
    terminal_at: Option<usize>,
    /// Total bytes appended (kept after `clear` for metrics).
    bytes: usize,
    sealed: bool,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry verbatim.
    pub fn append(&mut self, entry: String) -> Result<(), LogError> {
        if self.sealed {
            return Err(LogError::Sealed);
        }
        if self.terminal_at.is_none() && is_terminal(&entry) {
            self.terminal_at = Some(self.entries.len());
        }
        self.bytes += entry.len();
        self.entries.push(entry);
        Ok(())
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a terminal marker has been appended.
    pub fn has_terminal(&self) -> bool {
        self.terminal_at.is_some()
    }

    /// Total bytes appended over the log's lifetime.
    pub fn total_bytes(&self) -> usize {
        self.bytes
    }

    /// Whether the log has been cleared and sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Drop every entry and refuse further appends.
    pub fn clear(&mut self) {
        self.entries = Vec::new();
        self.terminal_at = None;
        self.sealed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_types::TERMINAL_EVENT;

    fn frame(n: u32) -> String {
        format!("id: {n}\ndata: {{\"n\":{n}}}\n\n")
    }

    #[test]
    fn log_appends_in_order() {
        let mut log = EventLog::new();
        log.append(frame(1)).unwrap();
        log.append(frame(2)).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries(), &[frame(1), frame(2)]);
    }

    #[test]
    fn entries_are_kept_verbatim() {
        let mut log = EventLog::new();
        log.append("data: a\n\n".into()).unwrap();
        log.append("data: a\n\n".into()).unwrap();

        // No dedup, no coalescing.
        assert_eq!(log.len(), 2);
        assert_eq!(log.total_bytes(), 18);
    }

    #[test]
    fn total_bytes_survive_clear() {
        let mut log = EventLog::new();
        log.append(frame(1)).unwrap();
        let bytes = log.total_bytes();
        log.clear();

        assert_eq!(log.total_bytes(), bytes);
    }

    #[test]
    fn terminal_is_tracked() {
        let mut log = EventLog::new();
        log.append(frame(1)).unwrap();
        assert!(!log.has_terminal());

        log.append(TERMINAL_EVENT.to_string()).unwrap();
        assert!(log.has_terminal());
    }

    #[test]
    fn clear_seals_the_log() {
        let mut log = EventLog::new();
        log.append(frame(1)).unwrap();
        log.clear();

        assert!(log.is_empty());
        assert!(log.is_sealed());
        assert_eq!(log.append(frame(2)), Err(LogError::Sealed));
        assert!(log.is_empty());
    }

    #[test]
    fn log_error_display() {
        assert_eq!(LogError::Sealed.to_string(), "event log is sealed");
    }
}
