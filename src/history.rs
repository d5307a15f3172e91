//! Message history: one append-only general log and one append-only log
//! per private pair, keyed by a canonical id so either participant's query
//! finds the same log regardless of argument order.

const HISTORY_CAP: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub sender: String,
    pub body: String,
}

/// Canonical id for a private conversation between two usernames: the
/// lexicographically smaller name first, joined by `|`, so `(a, b)` and
/// `(b, a)` always resolve to the same key.
pub fn chat_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

#[derive(Default)]
pub struct History {
    general: Vec<Entry>,
    private: std::collections::HashMap<String, Vec<Entry>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_general(&mut self, sender: &str, body: &str) {
        self.general.push(Entry {
            sender: sender.to_string(),
            body: body.to_string(),
        });
    }

    pub fn append_private(&mut self, a: &str, b: &str, sender: &str, body: &str) {
        self.private
            .entry(chat_id(a, b))
            .or_default()
            .push(Entry {
                sender: sender.to_string(),
                body: body.to_string(),
            });
    }

    /// First `HISTORY_CAP` entries of the general log.
    pub fn general(&self) -> Vec<Entry> {
        self.general.iter().take(HISTORY_CAP).cloned().collect()
    }

    /// First `HISTORY_CAP` entries of the private log between `a` and `b`.
    pub fn private(&self, a: &str, b: &str) -> Vec<Entry> {
        self.private
            .get(&chat_id(a, b))
            .map(|v| v.iter().take(HISTORY_CAP).cloned().collect())
            .unwrap_or_default()
    }
}
