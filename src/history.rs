use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const HISTORY_DIR: &str = ".massrename";
const HISTORY_FILE: &str = "history.jsonl";
const MAX_ENTRIES: usize = 500;

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub directory: String,
    pub from: String,
    pub to: String,
    pub outcome: String,
}

/// Appends one commit outcome to the JSONL history under `history_dir`,
/// keeping the most recent entries only.
pub fn record_rename(
    history_dir: &Path,
    directory: &Path,
    from: &str,
    to: &str,
    outcome: &str,
) -> Result<()> {
    let history_path = ensure_history_file(history_dir)?;
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let entry = HistoryEntry {
        timestamp,
        directory: directory.display().to_string(),
        from: from.to_string(),
        to: to.to_string(),
        outcome: outcome.to_string(),
    };
    let json = serde_json::to_string(&entry)?;
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&history_path)
        .with_context(|| format!("opening {history_path:?}"))?;
    writeln!(file, "{json}")?;
    truncate_history(&history_path)?;
    Ok(())
}

pub fn read_recent(history_dir: &Path, tail: usize) -> Result<Vec<HistoryEntry>> {
    let path = history_dir.join(HISTORY_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = OpenOptions::new()
        .read(true)
        .open(&path)
        .with_context(|| format!("reading {path:?}"))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Ok(entry) = serde_json::from_str::<HistoryEntry>(&line) {
            entries.push(entry);
        }
    }
    if entries.len() > tail {
        entries.drain(..entries.len() - tail);
    }
    Ok(entries)
}

fn ensure_history_file(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("creating {dir:?}"))?;
    }
    Ok(dir.join(HISTORY_FILE))
}

fn truncate_history(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("reading {path:?}"))?;
    let reader = BufReader::new(file);
    let lines: Vec<_> = reader.lines().collect::<Result<_, _>>()?;
    if lines.len() <= MAX_ENTRIES {
        return Ok(());
    }
    let keep = &lines[lines.len() - MAX_ENTRIES..];
    fs::write(path, keep.join("\n") + "\n")?;
    Ok(())
}
