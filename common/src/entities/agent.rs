use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: ObjectId,
    pub name: String,
    pub country: String,
    pub area: Option<String>,
}

impl Entity for Agent {
    fn id(&self) -> ObjectId {
        self.id
    }
}
