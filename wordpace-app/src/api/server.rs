use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::routes::{
    create_card, due_cards, list_cards, post_review, queue_summary, set_suspended, AppState,
};
use wordpace_core::Repository;

pub async fn run(repo: Arc<dyn Repository>, addr: SocketAddr) -> anyhow::Result<()> {
    let state = Arc::new(AppState { repo });

    let app = Router::new()
        .route("/cards", post(create_card).get(list_cards))
        .route("/cards/:id/suspended", post(set_suspended))
        .route("/due", get(due_cards))
        .route("/queue", get(queue_summary))
        .route("/review", post(post_review))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    info!("listening on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
