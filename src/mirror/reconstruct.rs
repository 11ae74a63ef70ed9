//! Reassembling whole messages from an incremental archive diff.
//!
//! The archive adds one file per message, so the diff over any history range
//! contains each new message exactly once, as the added lines of one hunk.
//! A two-state machine over the diff's line stream collects those lines back
//! into raw message text without ever materializing a tree snapshot: seek a
//! hunk header, read its added-line count, collect that many lines with the
//! diff marker stripped, emit, repeat.

use std::sync::OnceLock;

use regex::Regex;

static HUNK_REGEX: OnceLock<Regex> = OnceLock::new();

fn hunk_regex() -> &'static Regex {
    HUNK_REGEX.get_or_init(|| {
        Regex::new(r"^@@ -\d+(?:,\d+)? \+\d+(?:,(\d+))? @@").expect("hunk header regex is valid")
    })
}

enum State {
    Seeking,
    Collecting { remaining: usize },
}

/// Streaming hunk state machine. Feed diff lines in order; a completed
/// message is returned as soon as its last line arrives, keeping peak memory
/// at one in-flight message body.
pub struct MessageReconstructor {
    state: State,
    buffer: String,
}

impl MessageReconstructor {
    pub fn new() -> Self {
        Self {
            state: State::Seeking,
            buffer: String::new(),
        }
    }

    /// Feed one diff line. Returns the raw text of a message when this line
    /// completes one.
    pub fn feed(&mut self, line: &str) -> Option<String> {
        match self.state {
            State::Seeking => {
                if let Some(captures) = hunk_regex().captures(line) {
                    // an omitted count means a single line
                    let added = captures
                        .get(1)
                        .map(|m| m.as_str().parse().unwrap_or(0))
                        .unwrap_or(1);
                    if added > 0 {
                        self.buffer.clear();
                        self.state = State::Collecting { remaining: added };
                    }
                }
                None
            }
            State::Collecting { remaining } => {
                // strip the one-column diff marker
                self.buffer.push_str(line.get(1..).unwrap_or(""));
                self.buffer.push('\n');
                if remaining > 1 {
                    self.state = State::Collecting {
                        remaining: remaining - 1,
                    };
                    None
                } else {
                    self.state = State::Seeking;
                    Some(std::mem::take(&mut self.buffer))
                }
            }
        }
    }
}

impl Default for MessageReconstructor {
    fn default() -> Self {
        Self::new()
    }
}
