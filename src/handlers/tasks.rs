use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use serde_json::json;
use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    dto::tasks::TaskPayload,
    errors::AppError,
    models::task::{TaskDoc, TaskPublic},
    state::AppState,
};

pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<TaskPublic>>, AppError> {
    let user_id = owner_id(&identity.user_id)?;

    let tasks: Vec<TaskDoc> = state
        .tasks
        .find(doc! { "user_id": user_id })
        .await?
        .try_collect()
        .await?;

    Ok(Json(tasks.into_iter().map(TaskPublic::from).collect()))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Json(payload): Json<TaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = owner_id(&identity.user_id)?;
    validate(&payload)?;

    let task = TaskDoc {
        id: ObjectId::new(),
        user_id,
        title: payload.title,
        description: payload.description,
        due_date: payload.due_date,
        is_completed: payload.is_completed.unwrap_or(false),
    };
    state.tasks.insert_one(&task).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Task Created", "id": task.id.to_hex() })),
    ))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<TaskPublic>, AppError> {
    let task = find_owned(&state, &identity.user_id, &id).await?;
    Ok(Json(task.into()))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let task = find_owned(&state, &identity.user_id, &id).await?;
    validate(&payload)?;

    let mut update = doc! {
        "title": payload.title,
        "description": payload.description,
        "due_date": payload.due_date,
    };
    if let Some(is_completed) = payload.is_completed {
        update.insert("is_completed", is_completed);
    }

    let result = state
        .tasks
        .update_one(doc! { "_id": task.id }, doc! { "$set": update })
        .await?;

    Ok(Json(
        json!({ "message": "Task Updated", "rows": result.modified_count }),
    ))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let task = find_owned(&state, &identity.user_id, &id).await?;

    state.tasks.delete_one(doc! { "_id": task.id }).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_owned(state: &AppState, user_id: &str, task_id: &str) -> Result<TaskDoc, AppError> {
    let not_found = || AppError::NotFound(format!("Task with ID {task_id} not found"));

    let owner = owner_id(user_id)?;
    let id = ObjectId::parse_str(task_id).map_err(|_| not_found())?;

    state
        .tasks
        .find_one(doc! { "_id": id, "user_id": owner })
        .await?
        .ok_or_else(not_found)
}

fn owner_id(user_id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(user_id)
        .map_err(|_| AppError::Unauthorized("Invalid authentication.".into()))
}

fn validate(payload: &TaskPayload) -> Result<(), AppError> {
    let mut errors = serde_json::Map::new();

    if payload.title.trim().is_empty() {
        errors.insert("title".into(), json!("Title field is required"));
    }
    if payload.due_date.trim().is_empty() {
        errors.insert("due_date".into(), json!("Due date field is required"));
    }
    if payload.description.trim().is_empty() {
        errors.insert("description".into(), json!("Description field is required"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::FieldErrors(errors.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_validation_reports_each_missing_field() {
        let err = validate(&TaskPayload::default()).unwrap_err();
        let AppError::FieldErrors(errors) = err else {
            panic!("expected field errors");
        };
        let map = errors.as_object().unwrap();
        assert!(map.contains_key("title"));
        assert!(map.contains_key("due_date"));
        assert!(map.contains_key("description"));
    }

    #[test]
    fn payload_validation_passes_complete_payload() {
        let payload = TaskPayload {
            title: "write report".into(),
            description: "quarterly numbers".into(),
            due_date: "2026-09-01".into(),
            is_completed: None,
        };
        assert!(validate(&payload).is_ok());
    }
}
