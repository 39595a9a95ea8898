use std::path::PathBuf;
use std::time::Duration;

use crate::ai::SuggestionEngine;
use crate::db::SqliteBlobStore;
use crate::notify::NotificationQueue;
use crate::session::Session;
use crate::store::CurriculumStore;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct Workspace {
    pub path: PathBuf,
    pub store: CurriculumStore<SqliteBlobStore>,
}

impl Workspace {
    pub fn conn(&self) -> &Connection {
        self.store.backend().conn()
    }
}

pub struct AppState {
    pub workspace: Option<Workspace>,
    pub session: Session,
    pub notifications: NotificationQueue,
    /// Replaces the engine built from `setup.ai` when set.
    pub ai_engine: Option<Box<dyn SuggestionEngine>>,
    pub sleep: fn(Duration),
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            workspace: None,
            session: Session::default(),
            notifications: NotificationQueue::default(),
            ai_engine: None,
            sleep: std::thread::sleep,
        }
    }
}
