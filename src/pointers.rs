//! The pointer document (`sessions.json`): which log file is live for each agent role.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    document::{read_document, write_document},
    error::Result,
};

pub const MAIN_ROLE: &str = "main";

/// Pointer map keyed by `agent:<agentName>:<role>`.
pub type PointerMap = BTreeMap<String, PointerEntry>;

pub fn pointer_key(agent_name: &str, role: &str) -> String {
    format!("agent:{agent_name}:{role}")
}

/// One entry of the pointer document, kept as the raw JSON the runtime wrote.
///
/// The runtime stores more per-session state here than the viewer cares about, and
/// not always in the types the viewer would pick. Reads go through lenient accessors;
/// writes touch only the keys being changed, so everything else survives verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerEntry(pub Value);

const SESSION_ID: &str = "sessionId";
const SESSION_FILE: &str = "sessionFile";
const UPDATED_AT: &str = "updatedAt";
const SYSTEM_SENT: &str = "systemSent";
const ABORTED_LAST_RUN: &str = "abortedLastRun";

impl PointerEntry {
    pub fn new(session_id: String, session_file_path: String, updated_at: i64) -> Self {
        let mut entry = Self(Value::Object(Map::new()));
        entry.retarget(session_id, session_file_path, updated_at);
        entry.set(SYSTEM_SENT, Value::Bool(false));
        entry.set(ABORTED_LAST_RUN, Value::Bool(false));
        entry
    }

    /// Redirect this pointer to another log file, keeping every other field.
    pub fn retarget(&mut self, session_id: String, session_file_path: String, updated_at: i64) {
        self.set(SESSION_ID, Value::from(session_id));
        self.set(SESSION_FILE, Value::from(session_file_path));
        self.set(UPDATED_AT, Value::from(updated_at));
    }

    fn set(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value);
            return;
        }
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        self.0 = Value::Object(map);
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.field(SESSION_ID)?.as_str()
    }

    pub fn session_file_path(&self) -> Option<&str> {
        self.field(SESSION_FILE)?.as_str()
    }

    /// Epoch milliseconds; fractional stamps are truncated.
    pub fn updated_at(&self) -> Option<i64> {
        let v = self.field(UPDATED_AT)?;
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    }

    pub fn system_prompt_sent(&self) -> bool {
        self.field(SYSTEM_SENT).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn last_run_aborted(&self) -> bool {
        self.field(ABORTED_LAST_RUN).and_then(Value::as_bool).unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct PointerStore {
    path: PathBuf,
}

impl PointerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empty map when the document does not exist yet.
    pub async fn load(&self) -> Result<PointerMap> {
        Ok(read_document(&self.path).await?.unwrap_or_default())
    }

    pub async fn save(&self, map: &PointerMap) -> Result<()> {
        write_document(&self.path, map).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use serde_json::json;

    #[test]
    fn key_shape() {
        assert_eq!(pointer_key("main", MAIN_ROLE), "agent:main:main");
        assert_eq!(pointer_key("ops", MAIN_ROLE), "agent:ops:main");
    }

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PointerStore::new(tmp.path().join("sessions.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sessions.json");
        tokio::fs::write(&path, "{\"agent:main:main\": ").await.unwrap();
        let err = PointerStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ViewerError::Parse { .. }));
    }

    #[tokio::test]
    async fn unknown_fields_survive_a_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sessions.json");
        let original = json!({
            "agent:main:main": {
                "sessionId": "s1",
                "sessionFile": "/x/s1.jsonl",
                "updatedAt": 1_700_000_000_000i64,
                "systemSent": true,
                "abortedLastRun": false,
                "chatType": "direct",
                "totalTokens": 1234,
                "deliveryContext": { "channel": "webchat" }
            },
            "agent:main:cron:nightly": { "sessionId": "s2" }
        });
        tokio::fs::write(&path, serde_json::to_vec(&original).unwrap()).await.unwrap();

        let store = PointerStore::new(&path);
        let map = store.load().await.unwrap();
        let main = &map["agent:main:main"];
        assert_eq!(main.session_id(), Some("s1"));
        assert!(main.system_prompt_sent());
        assert_eq!(main.0["chatType"], "direct");

        store.save(&map).await.unwrap();
        let reread: Value = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(reread, original);
        assert_eq!(store.load().await.unwrap(), map);
    }

    #[test]
    fn retarget_keeps_flags_and_extras() {
        let mut entry = PointerEntry::new("a".into(), "/a.jsonl".into(), 1);
        entry.set(SYSTEM_SENT, Value::Bool(true));
        entry.set("model", json!("acme/foo"));

        entry.retarget("b".into(), "/b.jsonl".into(), 2);
        assert_eq!(entry.session_id(), Some("b"));
        assert_eq!(entry.session_file_path(), Some("/b.jsonl"));
        assert_eq!(entry.updated_at(), Some(2));
        assert!(entry.system_prompt_sent());
        assert!(!entry.last_run_aborted());
        assert_eq!(entry.0["model"], "acme/foo");
    }

    #[tokio::test]
    async fn runtime_shaped_values_load_without_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sessions.json");
        tokio::fs::write(
            &path,
            r#"{"agent:main:main":{"sessionId":"a","updatedAt":1700000000000.5,"systemSent":null,"abortedLastRun":"no"},"agent:main:legacy":"a.jsonl"}"#,
        )
        .await
        .unwrap();

        let map = PointerStore::new(&path).load().await.unwrap();
        let main = &map["agent:main:main"];
        assert_eq!(main.session_id(), Some("a"));
        assert_eq!(main.updated_at(), Some(1_700_000_000_000));
        assert!(!main.system_prompt_sent());
        assert!(!main.last_run_aborted());
        assert_eq!(map["agent:main:legacy"].0, json!("a.jsonl"));
    }

    #[tokio::test]
    async fn retarget_leaves_null_and_foreign_fields_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sessions.json");
        tokio::fs::write(&path, r#"{"agent:main:main":{"sessionId":"a","systemSent":null,"x":1}}"#)
            .await
            .unwrap();

        let store = PointerStore::new(&path);
        let mut map = store.load().await.unwrap();
        if let Some(entry) = map.get_mut("agent:main:main") {
            entry.retarget("b".into(), "/b.jsonl".into(), 5);
        }
        store.save(&map).await.unwrap();

        let reread: Value = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(
            reread,
            json!({ "agent:main:main": {
                "sessionId": "b",
                "systemSent": null,
                "x": 1,
                "sessionFile": "/b.jsonl",
                "updatedAt": 5
            } })
        );
    }
}
