//! Server-Sent Events (SSE) utilities
//!
//! Converts an [`EventBus`](crate::events::EventBus) subscription into an
//! axum SSE response. Each event is sent with its type name in the SSE
//! `event:` field and its JSON body in `data:`.

use crate::events::MgvpEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// Keep-alive interval for all MGVP SSE streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Serialize one event into an SSE frame
///
/// Returns `None` if serialization fails (logged, frame dropped).
pub fn to_sse_event(event: &MgvpEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event {}: {}", event.event_type(), e);
            None
        }
    }
}

/// Build an SSE response from a broadcast subscription
///
/// The stream opens with a `ConnectionStatus: connected` frame. Lagged
/// receivers skip the dropped events and keep streaming.
pub fn create_event_sse_stream(
    service_name: &'static str,
    rx: broadcast::Receiver<MgvpEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        let mut events = BroadcastStream::new(rx);
        while let Some(result) = events.next().await {
            match result {
                Ok(event) => {
                    debug!("Broadcasting SSE event: {}", event.event_type());
                    if let Some(frame) = to_sse_event(&event) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    // Lagged: the receiver fell behind and lost events
                    warn!("SSE stream error: {:?}", e);
                }
            }
        }
        debug!("SSE: {} event stream closed", service_name);
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
