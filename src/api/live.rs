//! Listing view endpoints: one-shot snapshot and server-sent live updates

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

use crate::{
    error::AppResult,
    models::Snapshot,
    services::live_view::load_snapshot,
    AppState,
};

/// Current contents of the store
#[utoipa::path(
    get,
    path = "/snapshot",
    tag = "live",
    responses(
        (status = 200, description = "All visitors and visits", body = Snapshot)
    )
)]
pub async fn snapshot(State(state): State<AppState>) -> AppResult<Json<Snapshot>> {
    let snapshot = load_snapshot(state.services.store.as_ref()).await?;
    Ok(Json(snapshot))
}

/// Stream of snapshots for an open listing screen.
///
/// The live view lives as long as the connection: when the client goes away the
/// stream is dropped and refreshing stops.
#[utoipa::path(
    get,
    path = "/live",
    tag = "live",
    responses(
        (status = 200, description = "`snapshot` events", content_type = "text/event-stream", body = Snapshot)
    )
)]
pub async fn live_updates(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let view = state.services.live_view();
    let updates = WatchStream::new(view.subscribe());

    let events = updates
        .filter(|snapshot| snapshot.refreshed_at.is_some())
        .map(move |snapshot| {
            let _open = &view;
            Event::default().event("snapshot").json_data(snapshot.as_ref())
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}
