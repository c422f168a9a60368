use serde::{Deserialize, Serialize};

// ── Constants ──────────────────────────────────────────────────────────

pub const DEFAULT_WINNER_COUNT: usize = 4;
pub const DEFAULT_ALTERNATE_COUNT: usize = 12;
pub const DEFAULT_WINNER_STAGGER_MS: u64 = 500;
pub const DEFAULT_ALTERNATE_STAGGER_MS: u64 = 200;
pub const DEFAULT_LOADING_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_USERNAME_FIELD: &str = "Player Login";
pub const DEFAULT_CODE_FIELD: &str = "Player ID";
pub const DEFAULT_ENTRY_SOURCE: &str = "static/sorteo_users.csv";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:17880";
pub const DISPLAY_NAME_MAX_CHARS: usize = 8;
pub const ALTERNATES_PER_ROW: usize = 4;

// ── Entry / roster types ───────────────────────────────────────────────

/// One well-formed participation record, fields already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub username: String,
    pub code: String,
}

impl EntryRow {
    pub fn new(username: impl Into<String>, code: impl Into<String>) -> Self {
        EntryRow {
            username: username.into(),
            code: code.into(),
        }
    }
}

/// Header names of the two required columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub username: String,
    pub code: String,
}

impl Default for EntryFields {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME_FIELD.to_string(),
            code: DEFAULT_CODE_FIELD.to_string(),
        }
    }
}

/// Output of the row parser: rows in document order plus the number of
/// non-blank data lines that were missing a required field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEntries {
    pub rows: Vec<EntryRow>,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub username: String,
    pub code: String,
    pub count: u32,
}

// ── Draw types ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCounts {
    pub winners: usize,
    pub alternates: usize,
}

impl Default for DrawCounts {
    fn default() -> Self {
        Self {
            winners: DEFAULT_WINNER_COUNT,
            alternates: DEFAULT_ALTERNATE_COUNT,
        }
    }
}

/// Winners and alternates in ranked order (index 0 is rank 1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub winners: Vec<Participant>,
    pub alternates: Vec<Participant>,
}

impl DrawResult {
    pub fn is_disjoint(&self) -> bool {
        !self
            .winners
            .iter()
            .any(|w| self.alternates.iter().any(|a| a.username == w.username))
    }
}

// ── Config types ───────────────────────────────────────────────────────

/// What the loading view waits for before moving on to the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadingPolicy {
    /// Leave on the timeout alone, whatever the draw has produced by then.
    #[default]
    Race,
    /// Leave once the timeout has elapsed and the draw has finished.
    Join,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub entry_source: String,
    pub username_field: String,
    pub code_field: String,
    pub winner_count: usize,
    pub alternate_count: usize,
    pub winner_stagger_ms: u64,
    pub alternate_stagger_ms: u64,
    pub loading_timeout_ms: u64,
    pub loading_policy: LoadingPolicy,
    /// Per-attempt limit for fetching a URL entry source, body included.
    pub fetch_timeout_ms: u64,
    pub draw_seed: Option<u64>,
    pub bind_addr: String,
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            entry_source: DEFAULT_ENTRY_SOURCE.to_string(),
            username_field: DEFAULT_USERNAME_FIELD.to_string(),
            code_field: DEFAULT_CODE_FIELD.to_string(),
            winner_count: DEFAULT_WINNER_COUNT,
            alternate_count: DEFAULT_ALTERNATE_COUNT,
            winner_stagger_ms: DEFAULT_WINNER_STAGGER_MS,
            alternate_stagger_ms: DEFAULT_ALTERNATE_STAGGER_MS,
            loading_timeout_ms: DEFAULT_LOADING_TIMEOUT_MS,
            loading_policy: LoadingPolicy::Race,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            draw_seed: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

impl AppConfig {
    pub fn entry_fields(&self) -> EntryFields {
        EntryFields {
            username: self.username_field.clone(),
            code: self.code_field.clone(),
        }
    }

    pub fn draw_counts(&self) -> DrawCounts {
        DrawCounts {
            winners: self.winner_count,
            alternates: self.alternate_count,
        }
    }
}

// ── Snapshot types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealItem {
    pub rank: usize,
    pub username: String,
    pub display_name: String,
    pub code: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStats {
    pub participants: usize,
    pub total_entries: u32,
    pub dropped_rows: usize,
    pub code_conflicts: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSnapshot {
    pub view: String,
    pub winners: Vec<RevealItem>,
    pub alternate_rows: Vec<Vec<RevealItem>>,
    pub hovered_alternate: Option<usize>,
    pub table_open: bool,
    pub draw_ready: bool,
    pub drawn_at: Option<String>,
    pub roster: RosterStats,
    pub last_error: Option<String>,
}
