use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::log_record::parse_log;

const PREVIEW_MAX_CHARS: usize = 100;

/// Listing-level view of one session log. Recomputed on every listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    #[serde(rename = "file")]
    pub file_name: String,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub message_count: usize,
    #[serde(rename = "preview")]
    pub preview_text: String,
}

fn serialize_iso_millis<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Filesystem facts about a log file, taken from its metadata.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// Message count and first-user-message preview. Never fails; bad lines contribute nothing.
pub fn summarize(id: &str, file_name: &str, content: &str, stat: FileStat) -> SessionSummary {
    let mut message_count = 0;
    let mut preview: Option<String> = None;
    for record in parse_log(content) {
        let Some(msg) = record.as_message() else {
            continue;
        };
        message_count += 1;
        if preview.is_none() && msg.is_user() {
            preview = Some(preview_text(msg.first_text().unwrap_or_default()));
        }
    }

    SessionSummary {
        id: id.to_string(),
        file_name: file_name.to_string(),
        updated_at: stat.modified,
        size_bytes: stat.size,
        message_count,
        preview_text: preview.unwrap_or_default(),
    }
}

pub fn preview_text(text: &str) -> String {
    text.chars()
        .take(PREVIEW_MAX_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
