use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: ObjectId,
    pub name: String,
    pub template_id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub created_at: i64,
}

impl Entity for Campaign {
    fn id(&self) -> ObjectId {
        self.id
    }
}
