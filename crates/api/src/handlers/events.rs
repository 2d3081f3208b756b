use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::routes::AppState;

/// 会话进度事件流 (Server-Sent Events)
///
/// 事件名为步骤名, 数据为 `{step, message, timestamp}`。
pub async fn progress_events(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("会话 {} 订阅进度事件", session);
    let receiver = state.progress.subscribe(&session);

    let stream = BroadcastStream::new(receiver).filter_map(move |event| match event {
        Ok(event) => Event::default()
            .event(event.step.clone())
            .json_data(&event)
            .ok()
            .map(Ok),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!("会话 {} 的订阅者落后, 丢弃 {} 条事件", session, skipped);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
