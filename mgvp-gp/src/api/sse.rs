//! Server-Sent Events endpoint

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use mgvp_common::sse::create_event_sse_stream;
use std::convert::Infallible;

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    create_event_sse_stream("mgvp-gp", ctx.state.subscribe_events())
}
