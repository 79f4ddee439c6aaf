use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,

    pub title: String,
    pub description: String,
    pub due_date: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPublic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub is_completed: bool,
}

impl From<TaskDoc> for TaskPublic {
    fn from(t: TaskDoc) -> Self {
        Self {
            id: t.id.to_hex(),
            title: t.title,
            description: t.description,
            due_date: t.due_date,
            is_completed: t.is_completed,
        }
    }
}
