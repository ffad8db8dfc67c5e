// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Append-only command history with a recall cursor.
// Author: Lukas Bower

//! Command history.
//!
//! Every non-blank submitted line is appended, whether or not it routed to a
//! command. The recall cursor walks the entries for previous/next navigation
//! and is parked one past the end after each append.

/// One recorded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Position in submission order, starting at 1.
    pub seq: usize,
    /// The line as submitted.
    pub line: String,
}

/// Recall direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards older entries.
    Back,
    /// Towards newer entries.
    Forward,
}

/// Result of a recall step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recall<'a> {
    /// Text to place in the input field. Empty after stepping past the newest entry.
    Line(&'a str),
    /// The cursor is already at the boundary; leave the input untouched.
    Boundary,
}

/// Ordered list of submitted lines plus the recall cursor.
#[derive(Debug, Default)]
pub struct HistoryBuffer {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `line` and park the cursor one past the newest entry.
    pub fn record(&mut self, line: &str) {
        let seq = self.entries.len() + 1;
        self.entries.push(HistoryEntry {
            seq,
            line: line.to_owned(),
        });
        self.cursor = self.entries.len();
    }

    /// Step the cursor and return the text to display.
    pub fn recall(&mut self, direction: Direction) -> Recall<'_> {
        let len = self.entries.len();
        match direction {
            Direction::Back => {
                if self.cursor == 0 {
                    return Recall::Boundary;
                }
                self.cursor -= 1;
            }
            Direction::Forward => {
                if self.cursor >= len {
                    return Recall::Boundary;
                }
                self.cursor += 1;
                if self.cursor == len {
                    return Recall::Line("");
                }
            }
        }
        Recall::Line(&self.entries[self.cursor].line)
    }

    /// Recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current cursor position; equal to [`len`](Self::len) when parked.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drop every entry and reset the cursor.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(lines: &[&str]) -> HistoryBuffer {
        let mut history = HistoryBuffer::new();
        for line in lines {
            history.record(line);
        }
        history
    }

    #[test]
    fn empty_history_is_boundary_both_ways() {
        let mut history = HistoryBuffer::new();
        assert_eq!(history.recall(Direction::Back), Recall::Boundary);
        assert_eq!(history.recall(Direction::Forward), Recall::Boundary);
    }

    #[test]
    fn back_walks_to_oldest_then_stops() {
        let mut history = buffer(&["a", "b", "c"]);
        assert_eq!(history.recall(Direction::Back), Recall::Line("c"));
        assert_eq!(history.recall(Direction::Back), Recall::Line("b"));
        assert_eq!(history.recall(Direction::Back), Recall::Line("a"));
        assert_eq!(history.recall(Direction::Back), Recall::Boundary);
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn forward_past_newest_clears_input_once() {
        let mut history = buffer(&["a", "b"]);
        history.recall(Direction::Back);
        history.recall(Direction::Back);
        assert_eq!(history.recall(Direction::Forward), Recall::Line("b"));
        assert_eq!(history.recall(Direction::Forward), Recall::Line(""));
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.recall(Direction::Forward), Recall::Boundary);
    }

    #[test]
    fn record_parks_cursor_and_numbers_entries() {
        let mut history = buffer(&["a"]);
        history.recall(Direction::Back);
        history.record("b");
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.entries()[1], HistoryEntry { seq: 2, line: "b".into() });
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.recall(Direction::Back), Recall::Boundary);
    }
}
