//! 按会话分发的进度事件
//!
//! 浏览器通过 `GET /api/aps/events/{session}` 订阅, 请求通过
//! `x-session-id` 头指定事件发往哪个会话。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use aps_core::{ProgressEvent, ProgressSink};
use axum::http::HeaderMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub const SESSION_HEADER: &str = "x-session-id";
pub const DEFAULT_SESSION: &str = "global";

const CHANNEL_CAPACITY: usize = 256;

/// Session id from the request headers, `global` when absent.
pub fn session_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

#[derive(Default)]
pub struct ProgressHub {
    sessions: RwLock<HashMap<String, broadcast::Sender<ProgressEvent>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, session: &str) -> broadcast::Sender<ProgressEvent> {
        if let Ok(sessions) = self.sessions.read() {
            if let Some(sender) = sessions.get(session) {
                return sender.clone();
            }
        }

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions
            .entry(session.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    pub fn subscribe(&self, session: &str) -> broadcast::Receiver<ProgressEvent> {
        debug!("会话 {} 新增订阅", session);
        self.sender(session).subscribe()
    }

    pub fn sink(&self, session: &str) -> Arc<dyn ProgressSink> {
        Arc::new(SessionSink {
            session: session.to_string(),
            sender: self.sender(session),
        })
    }

    /// Drops sessions nobody listens to any more.
    pub fn prune(&self) -> usize {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = sessions.len();
        sessions.retain(|_, sender| sender.receiver_count() > 0);
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

struct SessionSink {
    session: String,
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressSink for SessionSink {
    fn emit(&self, event: ProgressEvent) {
        info!(session = %self.session, step = %event.step, "{}", event.message);
        // 没有订阅者时丢弃
        let _ = self.sender.send(event);
    }
}
