//! Change feed over Server-Sent Events.
//!
//! Every committed stock mutation of the caller's tenant is forwarded as one
//! SSE event named after its event type, with the JSON envelope as data.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use axum::{
    extract::Extension,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use stockpool_auth::permissions::inventory;
use stockpool_infra::InventoryEngine;

use crate::app::routes::common::guard;
use crate::context::{PrincipalContext, TenantContext};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// GET /stream
pub async fn stream_events(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }

    let tenant_id = tenant.tenant_id();
    let subscription = engine.subscribe();
    let (tx, rx) = unbounded_channel::<Result<SseEvent, Infallible>>();

    // The bus hands out blocking receivers; bridge one into the async stream.
    tokio::task::spawn_blocking(move || {
        loop {
            match subscription.recv_timeout(POLL_INTERVAL) {
                Ok(envelope) => {
                    if envelope.tenant_id() != tenant_id {
                        continue;
                    }
                    let data = match serde_json::to_string(&envelope) {
                        Ok(s) => s,
                        Err(e) => {
                            warn!(error = %e, "failed to encode stock event");
                            continue;
                        }
                    };
                    let event = SseEvent::default()
                        .event(envelope.event_type())
                        .id(envelope.sequence_number().to_string())
                        .data(data);
                    if tx.send(Ok(event)).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if tx.is_closed() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(%tenant_id, "change feed subscriber closed");
    });

    Sse::new(UnboundedReceiverStream::new(rx))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
