//! Server-Sent Events (SSE) utilities
//!
//! Turns an `EventBus` subscription into an axum SSE response.

use crate::events::{QfraudEvent, ScopedSubscription};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Keep-alive interval for idle SSE connections
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Serialize a bus event into an SSE frame named after its event type
///
/// Returns `None` (and logs) if the event cannot be serialized.
pub fn to_sse_event(event: &QfraudEvent) -> Option<Event> {
    let event_type = event.event_type();
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event_type).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

/// Create an SSE stream that forwards every event of `subscription`
///
/// The stream opens with a `ConnectionStatus: connected` frame. A listener
/// that falls behind the bus buffer gets an SSE comment naming the number
/// of dropped events and keeps streaming. The stream ends when `shutdown`
/// is cancelled or the bus is dropped.
pub fn create_event_sse_stream(
    service_name: &'static str,
    mut subscription: ScopedSubscription,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        project_name = subscription.project_name().unwrap_or("*"),
        "New SSE client connected to {} events", service_name
    );

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("SSE: {} shutting down, ending stream", service_name);
                    break;
                }
                received = subscription.recv() => received,
            };

            match received {
                Ok(event) => {
                    debug!("SSE: Broadcasting event: {}", event.event_type());
                    if let Some(frame) = to_sse_event(&event) {
                        yield Ok(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE: Listener lagged, oldest events dropped");
                    yield Ok(Event::default().comment(format!("lagged: {} events dropped", skipped)));
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed, ending stream", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use axum::response::IntoResponse;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_ends_when_shutdown_is_cancelled() {
        let bus = EventBus::new(8);
        let shutdown = CancellationToken::new();
        let response = create_event_sse_stream("test", bus.subscribe_scoped(None), shutdown.clone())
            .into_response();
        let mut body = response.into_body().into_data_stream();

        let first = body.next().await.unwrap().unwrap();
        assert!(String::from_utf8_lossy(&first).contains("event: ConnectionStatus"));

        shutdown.cancel();
        let rest = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(chunk) = body.next().await {
                chunk.unwrap();
            }
        })
        .await;
        assert!(rest.is_ok(), "stream kept running after shutdown");
        drop(body);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_forwards_events_until_shutdown() {
        let bus = EventBus::new(8);
        let shutdown = CancellationToken::new();
        let response = create_event_sse_stream(
            "test",
            bus.subscribe_scoped(Some("alpha".to_string())),
            shutdown.clone(),
        )
        .into_response();
        let mut body = response.into_body().into_data_stream();
        body.next().await.unwrap().unwrap();

        bus.emit(QfraudEvent::training_error("alpha", "No data found for project: alpha"))
            .unwrap();
        let frame = body.next().await.unwrap().unwrap();
        let text = String::from_utf8_lossy(&frame);
        assert!(text.contains("event: training_error"));
        assert!(text.contains("No data found for project: alpha"));

        shutdown.cancel();
        assert!(tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .is_none());
    }
}
