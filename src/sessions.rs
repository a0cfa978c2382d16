use std::{sync::Arc, time::UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    config::{path_string, ViewerPaths},
    error::{Result, ViewerError},
    log_record::{parse_log, LogRecord, MessageRecord},
    pointers::{pointer_key, PointerEntry, PointerMap, PointerStore, MAIN_ROLE},
    summary::{summarize, FileStat, SessionSummary},
};

pub const LOG_SUFFIX: &str = ".jsonl";
/// Filename segment marking a soft-deleted log, e.g. `abc.deleted.2026-01-01.jsonl`.
pub const SOFT_DELETE_MARKER: &str = ".deleted.";

#[derive(Debug, Serialize)]
pub struct SessionListing {
    pub sessions: Vec<SessionSummary>,
    pub meta: PointerMap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub session_id: String,
    pub session_info: Option<Value>,
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSwitch {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSession {
    pub current_session_id: Option<String>,
    pub session_key: String,
}

/// Session logs of one agent plus the pointer document naming the live one.
///
/// Nothing is cached: every call goes back to disk.
#[derive(Clone)]
pub struct SessionStore {
    paths: ViewerPaths,
    pointers: PointerStore,
    write_gate: Arc<Mutex<()>>,
}

fn is_listed_log(file_name: &str) -> bool {
    file_name.ends_with(LOG_SUFFIX) && !file_name.contains(SOFT_DELETE_MARKER)
}

fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty()
        || session_id.contains(['/', '\\', '\0'])
        || session_id.contains("..")
    {
        return Err(ViewerError::BadRequest(format!(
            "Invalid session id '{session_id}'"
        )));
    }
    Ok(())
}

fn session_not_found() -> ViewerError {
    ViewerError::NotFound("Session not found".to_string())
}

fn file_stat(meta: &std::fs::Metadata) -> FileStat {
    let modified = meta
        .modified()
        .ok()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|| DateTime::<Utc>::from(UNIX_EPOCH));
    FileStat {
        modified,
        size: meta.len(),
    }
}

impl SessionStore {
    pub fn new(paths: ViewerPaths, write_gate: Arc<Mutex<()>>) -> Self {
        let pointers = PointerStore::new(paths.pointer_path.clone());
        Self {
            paths,
            pointers,
            write_gate,
        }
    }

    pub fn main_key(&self) -> String {
        pointer_key(&self.paths.agent_name, MAIN_ROLE)
    }

    pub async fn list_sessions(&self) -> Result<SessionListing> {
        let meta = self.pointers.load().await?;

        let dir = &self.paths.sessions_dir;
        let mut rd = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionListing {
                    sessions: Vec::new(),
                    meta,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !is_listed_log(&file_name) {
                continue;
            }
            let stat = match tokio::fs::metadata(entry.path()).await {
                Ok(m) if m.is_file() => file_stat(&m),
                Ok(_) => continue,
                Err(e) => {
                    warn!("skipping {file_name}: {e}");
                    continue;
                }
            };
            let content = match tokio::fs::read(entry.path()).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("unable to read {file_name}: {e}");
                    String::new()
                }
            };
            let id = file_name.strip_suffix(LOG_SUFFIX).unwrap_or(&file_name);
            sessions.push(summarize(id, &file_name, &content, stat));
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(SessionListing { sessions, meta })
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionDetail> {
        validate_session_id(session_id)?;
        let path = self.paths.session_file(session_id);
        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Err(session_not_found());
        }
        let bytes = tokio::fs::read(&path).await?;
        let content = String::from_utf8_lossy(&bytes);

        let mut session_info = None;
        let mut messages = Vec::new();
        for record in parse_log(&content) {
            match record {
                LogRecord::Session(v) => session_info = Some(v),
                LogRecord::Message(m) => messages.push(m),
                LogRecord::Unparseable => {}
            }
        }

        Ok(SessionDetail {
            session_id: session_id.to_string(),
            session_info,
            messages,
        })
    }

    /// Point the agent's main role at `session_id`. Whole-document read-modify-write.
    pub async fn switch_session(&self, session_id: &str) -> Result<SessionSwitch> {
        validate_session_id(session_id)?;
        let path = self.paths.session_file(session_id);
        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Err(session_not_found());
        }

        let _guard = self.write_gate.lock().await;
        let mut map = self.pointers.load().await?;
        let key = self.main_key();
        let now_ms = Utc::now().timestamp_millis();
        let file = path_string(&path);
        match map.get_mut(&key) {
            Some(entry) => entry.retarget(session_id.to_string(), file, now_ms),
            None => {
                map.insert(key.clone(), PointerEntry::new(session_id.to_string(), file, now_ms));
            }
        }
        self.pointers.save(&map).await?;
        info!("{key} -> session {session_id}");

        Ok(SessionSwitch {
            success: true,
            session_id: session_id.to_string(),
        })
    }

    pub async fn get_current_session(&self) -> Result<CurrentSession> {
        let key = self.main_key();
        let map = self.pointers.load().await?;
        let current_session_id = map
            .get(&key)
            .and_then(|e| e.session_id())
            .map(str::to_string)
            .filter(|id| !id.is_empty());
        Ok(CurrentSession {
            current_session_id,
            session_key: key,
        })
    }
}
