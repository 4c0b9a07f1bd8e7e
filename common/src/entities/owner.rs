use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: ObjectId,
    pub name: String,
    pub country: String,
}

impl Entity for Owner {
    fn id(&self) -> ObjectId {
        self.id
    }
}

/// Many-to-many link between owners and the contacts acting for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerContact {
    pub id: ObjectId,
    pub owner_id: ObjectId,
    pub contact_id: ObjectId,
}

impl Entity for OwnerContact {
    fn id(&self) -> ObjectId {
        self.id
    }
}
