use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::constants::MAX_SSE_CONNECTIONS;
use crate::response::AppError;
use crate::state::AppState;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;
impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

fn initializing_event(initializing: bool) -> Event {
    Event::default()
        .event("words_initializing")
        .data(serde_json::json!({ "initializing": initializing }).to_string())
}

/// 推送单词列表初始化状态；连接建立时先发送当前状态
pub async fn initializing_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= MAX_SSE_CONNECTIONS {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many SSE connections"));
    }

    let mut shutdown_rx = state.shutdown_rx();
    let mut events = state.selector().subscribe();
    let initial = state.selector().is_initializing();

    let stream = async_stream::stream! {
        let _guard = SseGuard;
        yield Ok(initializing_event(initial));

        loop {
            tokio::select! {
                received = events.recv() => {
                    match received {
                        Ok(initializing) => yield Ok(initializing_event(initializing)),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "SSE subscriber lagged");
                            yield Ok(initializing_event(state.selector().is_initializing()));
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
