use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trademark {
    pub id: ObjectId,
    pub denomination: String,
    pub certificate: String,
    /// Expiration timestamp in microseconds; registrations in prosecution
    /// have none yet.
    pub expiration: Option<i64>,
    pub products: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Nice classification numbers (1-45).
    #[serde(default)]
    pub classes: Vec<u32>,
    pub owner_id: ObjectId,
}

impl Entity for Trademark {
    fn id(&self) -> ObjectId {
        self.id
    }
}
