//! Server-Sent Events (SSE) utilities
//!
//! Adapts the receiving half of a [`ProgressEmitter`](crate::events::ProgressEmitter)
//! into an axum SSE response.

use crate::events::ImportEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Keep-alive comment interval
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream that forwards import events until the terminal one
///
/// Each event is sent as an unnamed `data:` line carrying the JSON object, so
/// clients read it through `EventSource.onmessage`. The stream ends after the
/// `complete`/`error` event or when the producer goes away.
pub fn import_event_sse(
    mut rx: mpsc::UnboundedReceiver<ImportEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to import stream");

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            let event_type = event.event_type();

            match serde_json::to_string(&event) {
                Ok(event_json) => {
                    debug!("SSE: Forwarding import event: {}", event_type);
                    yield Ok(Event::default().data(event_json));
                }
                Err(e) => {
                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                }
            }

            if terminal {
                break;
            }
        }
        debug!("SSE: Import stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
