use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: ObjectId,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub user_id: ObjectId,
    pub created_at: i64,
}

impl Entity for EmailTemplate {
    fn id(&self) -> ObjectId {
        self.id
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TemplateChange {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}
