use std::collections::HashMap;
use crate::types::{EntryRow, Participant};

/// Roster aggregates entry rows into one participant per username:
/// - order is first appearance in the source
/// - `count` is the number of rows seen for that username
/// - `code` is taken from the first row and never overwritten
#[derive(Debug, Clone, Default)]
pub struct Roster {
    /// Participants in first-appearance order
    participants: Vec<Participant>,
    /// Index from trimmed username to position in `participants`
    username_index: HashMap<String, usize>,
    /// Rows whose code differed from the sticky code of their username
    code_conflicts: usize,
}

impl Roster {
    pub fn new() -> Self {
        Roster::default()
    }

    /// Build a roster from rows in a single pass.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = EntryRow>,
    {
        let mut roster = Roster::new();
        for row in rows {
            roster.add_row(row);
        }
        if roster.code_conflicts > 0 {
            tracing::warn!(
                conflicts = roster.code_conflicts,
                "entry rows disagreed on a participant code; first code kept"
            );
        }
        roster
    }

    fn add_row(&mut self, row: EntryRow) {
        let username = row.username.trim();
        let code = row.code.trim();
        if username.is_empty() || code.is_empty() {
            return;
        }

        if let Some(&idx) = self.username_index.get(username) {
            let existing = &mut self.participants[idx];
            existing.count += 1;
            if existing.code != code {
                self.code_conflicts += 1;
                tracing::debug!(
                    username,
                    kept = %existing.code,
                    ignored = code,
                    "conflicting code for participant"
                );
            }
            return;
        }

        self.username_index
            .insert(username.to_string(), self.participants.len());
        self.participants.push(Participant {
            username: username.to_string(),
            code: code.to_string(),
            count: 1,
        });
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, username: &str) -> Option<&Participant> {
        self.username_index
            .get(username.trim())
            .and_then(|&idx| self.participants.get(idx))
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Number of rows that contributed to the roster.
    pub fn total_entries(&self) -> u32 {
        self.participants.iter().map(|p| p.count).sum()
    }

    pub fn code_conflicts(&self) -> usize {
        self.code_conflicts
    }
}
