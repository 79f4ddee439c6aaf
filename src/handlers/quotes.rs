use axum::{extract::State, Json};
use futures::TryStreamExt;
use mongodb::bson::doc;
use std::sync::Arc;

use crate::{
    errors::AppError,
    models::quote::{QuoteDoc, QuotePublic},
    state::AppState,
};

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<QuotePublic>>, AppError> {
    let quotes: Vec<QuoteDoc> = state.quotes.find(doc! {}).await?.try_collect().await?;
    Ok(Json(quotes.into_iter().map(QuotePublic::from).collect()))
}
