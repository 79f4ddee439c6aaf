use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub quote: String,
    pub author: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotePublic {
    pub id: String,
    pub quote: String,
    pub author: String,
}

impl From<QuoteDoc> for QuotePublic {
    fn from(q: QuoteDoc) -> Self {
        Self {
            id: q.id.to_hex(),
            quote: q.quote,
            author: q.author,
        }
    }
}
