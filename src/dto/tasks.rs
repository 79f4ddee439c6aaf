use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TaskPayload {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub is_completed: Option<bool>,
}
