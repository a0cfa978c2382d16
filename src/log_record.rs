//! Line-level decoding of append-only session logs.
//!
//! Every line of a `<sessionId>.jsonl` file is an independent JSON object tagged by
//! `type`. Only `session` and `message` records matter to the viewer; anything else,
//! including lines that are not JSON at all, decodes to [`LogRecord::Unparseable`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// Session header, kept verbatim.
    Session(Value),
    Message(MessageRecord),
    Unparseable,
}

/// A conversation message flattened out of its log envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: Value,
    pub role: String,
    pub content: Value,
    pub timestamp: Value,
}

#[derive(Deserialize)]
struct MessageLine {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    timestamp: Value,
    message: Option<MessageBody>,
}

#[derive(Deserialize)]
struct MessageBody {
    role: Option<String>,
    #[serde(default)]
    content: Value,
}

impl MessageRecord {
    pub fn is_user(&self) -> bool {
        self.role == "user"
    }

    /// Text of the first content block, if the content is a block list.
    pub fn first_text(&self) -> Option<&str> {
        self.content.as_array()?.first()?.get("text")?.as_str()
    }
}

impl LogRecord {
    pub fn parse(line: &str) -> LogRecord {
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            return LogRecord::Unparseable;
        };
        match value.get("type").and_then(Value::as_str) {
            Some("session") => LogRecord::Session(value),
            Some("message") => parse_message(value).map_or(LogRecord::Unparseable, LogRecord::Message),
            _ => LogRecord::Unparseable,
        }
    }

    pub fn as_message(&self) -> Option<&MessageRecord> {
        match self {
            LogRecord::Message(m) => Some(m),
            _ => None,
        }
    }
}

fn parse_message(value: Value) -> Option<MessageRecord> {
    let line: MessageLine = serde_json::from_value(value).ok()?;
    let body = line.message?;
    let role = body.role.filter(|r| !r.is_empty())?;
    if !has_content(&body.content) {
        return None;
    }
    Some(MessageRecord {
        id: line.id,
        role,
        content: body.content,
        timestamp: line.timestamp,
    })
}

// Absent, null, false, zero and empty-string content all count as missing.
fn has_content(content: &Value) -> bool {
    match content {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Iterate the records of a whole log file. A trailing newline does not produce an extra record.
pub fn parse_log(content: &str) -> impl Iterator<Item = LogRecord> + '_ {
    content.trim().split('\n').map(LogRecord::parse)
}
