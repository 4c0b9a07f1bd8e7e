use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

/// One provider-accepted outbound message. Rows are only created after the
/// provider returned a message id; rejected sends leave no trace here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentEmail {
    pub id: ObjectId,
    /// Message id assigned by the email provider.
    pub resend_id: String,
    pub campaign_id: ObjectId,
    pub contact_id: ObjectId,
    pub template_id: Option<ObjectId>,
    pub sent_at: i64,
    pub delivered_at: Option<i64>,
    pub opened_at: Option<i64>,
}

impl Entity for SentEmail {
    fn id(&self) -> ObjectId {
        self.id
    }
}
