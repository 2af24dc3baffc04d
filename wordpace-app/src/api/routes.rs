use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use wordpace_core::{apply_review, queue, queue_counts, Algorithm, CoreError};

use crate::api::dto::{parse_quality, CardOut, CreateCardIn, QueueOut, ReviewIn, SuspendIn};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn wordpace_core::Repository>,
}

fn status(e: &CoreError) -> StatusCode {
    match e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Deserialize)]
pub struct CardsQuery {
    user: Option<Uuid>,
    bucket: Option<String>,
}

#[derive(Deserialize)]
pub struct DueQuery {
    user: Option<Uuid>,
    max: Option<usize>,
}

#[derive(Deserialize)]
pub struct QueueQuery {
    user: Option<Uuid>,
    new_limit: Option<usize>,
}

pub async fn create_card(
    State(st): State<Arc<AppState>>,
    Json(body): Json<CreateCardIn>,
) -> Result<(StatusCode, Json<CardOut>), StatusCode> {
    let card = st
        .repo
        .create_card(body.user_id, body.vocab_id, Algorithm::Sm2)
        .await
        .map_err(|e| status(&e))?;
    Ok((StatusCode::CREATED, Json(card.into())))
}

pub async fn list_cards(
    State(st): State<Arc<AppState>>,
    Query(q): Query<CardsQuery>,
) -> Result<Json<Vec<CardOut>>, StatusCode> {
    let cards = st
        .repo
        .list_cards(q.user)
        .await
        .map_err(|e| status(&e))?;
    let cards = match q.bucket.as_deref() {
        None => cards,
        Some("new") => queue::new_cards(&cards, wordpace_core::DEFAULT_NEW_LIMIT),
        Some("learning") => queue::learning_cards(&cards),
        Some("review") => queue::review_cards(&cards),
        Some("due") => queue::due_cards(&cards, chrono::Utc::now()),
        Some(_) => return Err(StatusCode::BAD_REQUEST),
    };
    Ok(Json(cards.into_iter().map(CardOut::from).collect()))
}

pub async fn due_cards(
    State(st): State<Arc<AppState>>,
    Query(q): Query<DueQuery>,
) -> Result<Json<Vec<CardOut>>, StatusCode> {
    let now = chrono::Utc::now();
    let cards = st
        .repo
        .list_cards(q.user)
        .await
        .map_err(|e| status(&e))?;
    let mut pool = queue::due_cards(&cards, now);
    pool.sort_by_key(|c| (c.due_at, c.created_at));
    if let Some(m) = q.max {
        pool.truncate(m);
    }
    Ok(Json(pool.into_iter().map(CardOut::from).collect()))
}

pub async fn queue_summary(
    State(st): State<Arc<AppState>>,
    Query(q): Query<QueueQuery>,
) -> Result<Json<QueueOut>, StatusCode> {
    let cards = st
        .repo
        .list_cards(q.user)
        .await
        .map_err(|e| status(&e))?;
    let counts = queue_counts(
        &cards,
        chrono::Utc::now(),
        q.new_limit.unwrap_or(wordpace_core::DEFAULT_NEW_LIMIT),
    );
    Ok(Json(counts.into()))
}

pub async fn post_review(
    State(st): State<Arc<AppState>>,
    Json(body): Json<ReviewIn>,
) -> Result<Json<CardOut>, StatusCode> {
    let card = st
        .repo
        .get_card(body.card_id)
        .await
        .map_err(|e| status(&e))?;
    let quality = parse_quality(&body.quality).ok_or(StatusCode::BAD_REQUEST)?;

    let expected = card.last_reviewed_at;
    let out = apply_review(card, quality);
    let updated = st
        .repo
        .update_card_reviewed(&out.updated_card, expected)
        .await
        .map_err(|e| status(&e))?;
    st.repo
        .insert_review(&out.review)
        .await
        .map_err(|e| status(&e))?;
    Ok(Json(updated.into()))
}

pub async fn set_suspended(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SuspendIn>,
) -> Result<StatusCode, StatusCode> {
    st.repo
        .set_suspended(id, body.suspended)
        .await
        .map_err(|e| status(&e))?;
    Ok(StatusCode::NO_CONTENT)
}
