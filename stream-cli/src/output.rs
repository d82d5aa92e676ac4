//! Rendering of received frames.

use std::io::Write;
use stream_types::SseEvent;

/// What to print for one frame, if anything.
pub fn render(event: &SseEvent, raw: bool) -> Option<String> {
    if raw {
        return Some(event.encode());
    }
    if event.is_terminal() {
        return Some("\n".to_string());
    }
    if event.event.as_deref() == Some("delta") {
        let value: serde_json::Value = event.decode_data().ok()?;
        return value["delta"].as_str().map(str::to_string);
    }
    None
}

/// Writes rendered frames to stdout as they arrive.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    raw: bool,
}

impl Printer {
    /// Create a printer; `raw` prints every frame in wire format.
    pub fn new(raw: bool) -> Self {
        Self { raw }
    }

    /// Print one frame.
    pub fn print(&self, event: &SseEvent) {
        if let Some(text) = render(event, self.raw) {
            let mut stdout = std::io::stdout().lock();
            // Write errors (closed pipe) are ignored.
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }
}
