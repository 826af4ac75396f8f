pub mod ingest;
pub mod submissions;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/postpipe/ingest", post(ingest::ingest))
        .route(
            "/api/postpipe/forms/{form_id}/submissions",
            get(submissions::list),
        )
}
