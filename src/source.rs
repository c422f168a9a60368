use std::{path::PathBuf, time::Duration};

use crate::config::resolve_repo_path;
use crate::entry_rows::parse_entry_rows;
use crate::roster::Roster;
use crate::types::EntryFields;

const FETCH_ATTEMPTS: u32 = 3;
const USER_AGENT: &str = "raffle-stage";

/// Where the raw entry export comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    Url(String),
    File(PathBuf),
    /// Text already in memory (rehearsals, tests).
    Inline(String),
    Unset,
}

impl EntrySource {
    pub fn parse(raw: &str) -> EntrySource {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return EntrySource::Unset;
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return EntrySource::Url(trimmed.to_string());
        }
        EntrySource::File(resolve_repo_path(trimmed))
    }

    pub fn describe(&self) -> String {
        match self {
            EntrySource::Url(url) => url.clone(),
            EntrySource::File(path) => path.display().to_string(),
            EntrySource::Inline(text) => format!("inline ({} bytes)", text.len()),
            EntrySource::Unset => "unset".to_string(),
        }
    }
}

/// Roster built from one load, plus how many rows were thrown away.
#[derive(Debug, Clone, Default)]
pub struct LoadedRoster {
    pub roster: Roster,
    pub dropped: usize,
}

pub fn build_roster(text: &str, fields: &EntryFields) -> LoadedRoster {
    let parsed = parse_entry_rows(text, fields);
    if parsed.dropped > 0 {
        tracing::info!(dropped = parsed.dropped, "skipped entry rows missing a required field");
    }
    LoadedRoster {
        roster: Roster::from_rows(parsed.rows),
        dropped: parsed.dropped,
    }
}

/// Fetch the raw export text. Every failure is reported as a string so the
/// caller can record it and carry on with an empty roster.
pub async fn fetch_entry_text(source: &EntrySource, timeout: Duration) -> Result<String, String> {
    match source {
        EntrySource::Url(url) => fetch_url(url, timeout).await,
        EntrySource::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("read entries {}: {e}", path.display())),
        EntrySource::Inline(text) => Ok(text.clone()),
        EntrySource::Unset => Err("no entry source configured".to_string()),
    }
}

/// Each attempt is bounded by `timeout` from connect until the body has been
/// read, so a source that accepts and never answers still ends in an error.
async fn fetch_url(url: &str, timeout: Duration) -> Result<String, String> {
    let client = reqwest::Client::new();
    let mut last_send_err = String::new();
    let mut resp = None;
    for attempt in 0..FETCH_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
        }
        match client.get(url).header("User-Agent", USER_AGENT).timeout(timeout).send().await {
            Ok(r) => {
                resp = Some(r);
                break;
            }
            Err(e) => {
                last_send_err = format!("entry fetch failed (attempt {}): {e}", attempt + 1);
                tracing::warn!("{}", last_send_err);
            }
        }
    }
    let resp = resp.ok_or_else(|| last_send_err.clone())?;
    let status = resp.status();
    if !status.is_success() {
        return Err(format!("entry fetch {url}: HTTP {status}"));
    }
    resp.text()
        .await
        .map_err(|e| format!("entry fetch {url}: read failed: {e}"))
}

pub async fn load_roster(
    source: &EntrySource,
    fields: &EntryFields,
    timeout: Duration,
) -> Result<LoadedRoster, String> {
    let text = fetch_entry_text(source, timeout).await?;
    let loaded = build_roster(&text, fields);
    tracing::info!(
        source = %source.describe(),
        participants = loaded.roster.len(),
        entries = loaded.roster.total_entries(),
        "entries loaded"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Participant;
    use tokio::net::TcpListener;

    const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_parse_source_kinds() {
        assert_eq!(EntrySource::parse("   "), EntrySource::Unset);
        assert_eq!(
            EntrySource::parse(" https://cdn.example.com/sorteo_users.csv "),
            EntrySource::Url("https://cdn.example.com/sorteo_users.csv".to_string())
        );
        assert_eq!(
            EntrySource::parse("HTTP://host/a.csv"),
            EntrySource::Url("HTTP://host/a.csv".to_string())
        );
        assert_eq!(
            EntrySource::parse("static/sorteo_users.csv"),
            EntrySource::File(resolve_repo_path("static/sorteo_users.csv"))
        );
    }

    #[tokio::test]
    async fn test_load_inline_source() {
        let source = EntrySource::Inline(
            "Player ID,Player Login\nC1,alice\nC2,bob\nC1,alice\n,nobody\nC3,carol\n".to_string(),
        );
        let loaded = load_roster(&source, &EntryFields::default(), FETCH_TIMEOUT).await.unwrap();
        assert_eq!(loaded.dropped, 1);
        assert_eq!(
            loaded.roster.participants(),
            &[
                Participant { username: "alice".into(), code: "C1".into(), count: 2 },
                Participant { username: "bob".into(), code: "C2".into(), count: 1 },
                Participant { username: "carol".into(), code: "C3".into(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_load_file_source() {
        let path = std::env::temp_dir().join(format!("raffle-stage-entries-{}.csv", std::process::id()));
        std::fs::write(&path, "Player Login,Player ID\ndana,D1\n").unwrap();
        let loaded = load_roster(&EntrySource::File(path.clone()), &EntryFields::default(), FETCH_TIMEOUT)
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.roster.len(), 1);
        assert_eq!(loaded.roster.get("dana").map(|p| p.code.as_str()), Some("D1"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("raffle-stage-does-not-exist.csv");
        let err = load_roster(&EntrySource::File(path), &EntryFields::default(), FETCH_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.starts_with("read entries"), "{err}");
    }

    #[tokio::test]
    async fn test_unset_source_is_an_error() {
        let err = fetch_entry_text(&EntrySource::Unset, FETCH_TIMEOUT).await.unwrap_err();
        assert_eq!(err, "no entry source configured");
    }

    #[tokio::test]
    async fn test_silent_url_source_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let source = EntrySource::Url(format!("http://{addr}/sorteo_users.csv"));
        let started = std::time::Instant::now();
        let err = fetch_entry_text(&source, Duration::from_millis(100)).await.unwrap_err();
        server.abort();

        assert!(err.contains("attempt 3"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
