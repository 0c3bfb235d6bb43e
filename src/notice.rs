//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `search_notice`.
//! Role: Shared contract helper for CLI diagnostics such as verbose search listings.
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is additive-only.
use std::path::PathBuf;

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub library: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("library".to_string(), json!(notice.library));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Notice listing every base directory probed by a failed library search.
pub fn search_notice(cmd: &str, library: &str, time: String, searched: &[PathBuf]) -> Notice {
    let bases = searched
        .iter()
        .map(|base| Value::String(base.display().to_string()))
        .collect::<Vec<_>>();
    let mut details = Map::new();
    details.insert("searched".to_string(), Value::Array(bases));

    Notice {
        kind: "not_found".to_string(),
        time,
        cmd: cmd.to_string(),
        library: library.to_string(),
        message: format!("library {library} not found in {} location(s)", searched.len()),
        details,
    }
}
