use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

pub const DEFAULT_PORT: u16 = 3456;
pub const DEFAULT_AGENT: &str = "main";

#[derive(Parser, Debug)]
#[command(name = "claw-history-viewer")]
pub struct Args {
    /// Bind host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Listen port (default: $PORT, then $OPENCLAW_VIEWER_PORT, then 3456)
    #[arg(long)]
    pub port: Option<u16>,

    /// OpenClaw home directory (default: $OPENCLAW_DIR or ~/.openclaw)
    #[arg(long)]
    pub openclaw_dir: Option<String>,

    /// Agent whose sessions are browsed (default: $OPENCLAW_AGENT or main)
    #[arg(long)]
    pub agent: Option<String>,

    /// Directory holding the built web UI
    #[arg(long, default_value = "public")]
    pub public_dir: String,
}

fn non_blank(raw: Option<String>) -> Option<String> {
    let t = raw?.trim().to_string();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

fn env_non_blank(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

fn default_openclaw_dir() -> Option<PathBuf> {
    if let Some(dir) = env_non_blank("OPENCLAW_DIR") {
        return Some(PathBuf::from(dir));
    }
    let home = env_non_blank("HOME")?;
    Some(PathBuf::from(home).join(".openclaw"))
}

impl Args {
    pub fn resolve_port(&self) -> anyhow::Result<u16> {
        if let Some(port) = self.port {
            return Ok(port);
        }
        for key in ["PORT", "OPENCLAW_VIEWER_PORT"] {
            if let Some(raw) = env_non_blank(key) {
                return raw
                    .parse()
                    .with_context(|| format!("invalid ${key} (expected a port number)"));
            }
        }
        Ok(DEFAULT_PORT)
    }

    pub fn resolve_paths(&self) -> anyhow::Result<ViewerPaths> {
        let openclaw_dir = match non_blank(self.openclaw_dir.clone()) {
            Some(dir) => PathBuf::from(dir),
            None => default_openclaw_dir().context("unable to determine OpenClaw dir (set --openclaw-dir)")?,
        };
        let agent = non_blank(self.agent.clone())
            .or_else(|| env_non_blank("OPENCLAW_AGENT"))
            .unwrap_or_else(|| DEFAULT_AGENT.to_string());
        Ok(ViewerPaths::new(openclaw_dir, agent))
    }
}

/// Where the viewer finds everything it reads and writes.
#[derive(Clone, Debug)]
pub struct ViewerPaths {
    pub openclaw_dir: PathBuf,
    pub agent_name: String,
    pub sessions_dir: PathBuf,
    pub pointer_path: PathBuf,
    pub config_path: PathBuf,
}

impl ViewerPaths {
    pub fn new(openclaw_dir: impl Into<PathBuf>, agent_name: impl Into<String>) -> Self {
        let openclaw_dir = openclaw_dir.into();
        let agent_name = agent_name.into();
        let sessions_dir = openclaw_dir.join("agents").join(&agent_name).join("sessions");
        Self {
            pointer_path: sessions_dir.join("sessions.json"),
            config_path: openclaw_dir.join("openclaw.json"),
            sessions_dir,
            openclaw_dir,
            agent_name,
        }
    }

    pub fn session_file(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{session_id}.jsonl"))
    }

    pub async fn describe(&self) -> ConfigInfo {
        ConfigInfo {
            openclaw_dir: path_string(&self.openclaw_dir),
            agent_name: self.agent_name.clone(),
            sessions_dir: path_string(&self.sessions_dir),
            config_path: path_string(&self.config_path),
            config_exists: tokio::fs::try_exists(&self.config_path).await.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInfo {
    pub openclaw_dir: String,
    pub agent_name: String,
    pub sessions_dir: String,
    pub config_path: String,
    pub config_exists: bool,
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
