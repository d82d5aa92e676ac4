//! Replay and tail scanning over an [`EventLog`](crate::EventLog).
//!
//! A reader attaches with an optional resume cursor (the `Last-Event-ID` the
//! client saw last). [`ReplayScan::resume`] picks the index to start from and
//! [`ReplayScan::advance`] hands out every entry the reader has not seen yet,
//! stopping after the terminal marker.
//!
//! The same `advance` call serves both phases: the first call after `resume`
//! is the replay of what is already buffered, later calls are the tail polls.
//!
//! Resume rules:
//! - no cursor: start at index 0
//! - cursor matches the `id` of an entry before the first terminal marker:
//!   start right after that entry
//! - otherwise: start at index 0 (never drop data)

use stream_types::{entry_ids, is_terminal};

/// Where a reader started, for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// No cursor was supplied.
    Start,
    /// The cursor matched; reading starts at this index.
    AfterCursor(usize),
    /// A cursor was supplied but no buffered entry carries it.
    CursorNotFound,
}

/// Per-reader scan position.
#[derive(Debug, Clone)]
pub struct ReplayScan {
    next: usize,
    finished: bool,
    resume_point: ResumePoint,
}

impl ReplayScan {
    /// Start a scan over `entries`, honouring an optional resume cursor.
    pub fn resume(entries: &[String], last_event_id: Option<&str>) -> Self {
        let resume_point = match last_event_id {
            None => ResumePoint::Start,
            Some(cursor) => match find_cursor(entries, cursor) {
                Some(index) => ResumePoint::AfterCursor(index + 1),
                None => ResumePoint::CursorNotFound,
            },
        };
        let next = match resume_point {
            ResumePoint::AfterCursor(index) => index,
            ResumePoint::Start | ResumePoint::CursorNotFound => 0,
        };

        Self {
            next,
            finished: false,
            resume_point,
        }
    }

    /// Entries the reader has not seen yet, up to and including the terminal
    /// marker.
    ///
    /// Returns an empty slice once finished, and whenever nothing new has been
    /// appended.
    pub fn advance<'a>(&mut self, entries: &'a [String]) -> &'a [String] {
        if self.finished {
            return &[];
        }
        let pending = entries.get(self.next..).unwrap_or(&[]);
        let take = match pending.iter().position(|entry| is_terminal(entry)) {
            Some(terminal) => {
                self.finished = true;
                terminal + 1
            }
            None => pending.len(),
        };
        self.next += take;
        &pending[..take]
    }

    /// Whether the terminal marker has been handed out.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// How the resume cursor was resolved.
    pub fn resume_point(&self) -> ResumePoint {
        self.resume_point
    }
}

/// Index of the entry carrying `cursor`, searching only before the first
/// terminal marker.
fn find_cursor(entries: &[String], cursor: &str) -> Option<usize> {
    for (index, entry) in entries.iter().enumerate() {
        if is_terminal(entry) {
            return None;
        }
        if entry_ids(entry).any(|id| id == cursor) {
            return Some(index);
        }
    }
    None
}
