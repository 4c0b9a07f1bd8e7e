use chrono::Utc;
use common::{
    context::Context,
    entities::{campaign::Campaign, sent_email::SentEmail, template::EmailTemplate},
    error::{self, AddCode},
};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use mongodb::bson::{oid::ObjectId, Bson};
use serde::{Deserialize, Serialize};

use crate::resend::{MailProviderObject, OutboundEmail, Tag};

use super::merge::render;
use super::recipients::{Recipient, RecipientResolver};
use super::template::{classify, TemplateKind};

lazy_static! {
    static ref MAIL_FROM_ADDRESS: String = std::env::var("MAIL_FROM_ADDRESS").unwrap();
    static ref MAIL_FROM_NAME: String = std::env::var("MAIL_FROM_NAME").unwrap();
}

const MIN_CAMPAIGN_NAME: usize = 10;
const MAX_CAMPAIGN_NAME: usize = 100;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "send_mode", rename_all = "snake_case")]
pub enum SendCampaignRequest {
    Contact {
        template_id: String,
        campaign_name: String,
        contact_ids: Vec<String>,
        trademark_id: Option<String>,
        campaign_id: Option<String>,
    },
    Trademark {
        template_id: String,
        campaign_name: String,
        trademark_ids: Vec<String>,
        campaign_id: Option<String>,
    },
    Custom {
        subject: String,
        body: String,
        contact_ids: Vec<String>,
        campaign_name: Option<String>,
        campaign_id: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendSummary {
    pub message: String,
    /// Number of resolved recipients, not the number the provider accepted.
    pub recipients: usize,
}

#[derive(Debug, Serialize)]
pub struct CampaignOverview {
    pub campaign: Campaign,
    pub sent_emails: Vec<SentEmail>,
}

pub struct CampaignService {
    context: Context,
}

impl CampaignService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub async fn send(&self, request: SendCampaignRequest) -> error::Result<SendSummary> {
        let auth = self.context.auth();
        let user_id = *auth
            .id()
            .ok_or(anyhow::anyhow!("Authentication required").code(401))?;

        let resolver = RecipientResolver::new(&self.context);

        match request {
            SendCampaignRequest::Contact {
                template_id,
                campaign_name,
                contact_ids,
                trademark_id,
                campaign_id,
            } => {
                let template = self.find_template(template_id.parse()?).await?;
                let campaign_id = parse_optional(campaign_id)?;
                self.validate_campaign_name(&campaign_name, campaign_id)?;

                let kind = classify(&template.body);
                let trademark_id = parse_optional(trademark_id)?;
                if kind == TemplateKind::SingleTrademark && trademark_id.is_none() {
                    return Err(anyhow::anyhow!(
                        "This template requires a trademark to be selected"
                    )
                    .code(400));
                }

                let recipients = resolver
                    .resolve_contacts(&parse_ids(&contact_ids)?, trademark_id)
                    .await?;

                self.dispatch_template(template, campaign_name, campaign_id, user_id, recipients)
                    .await
            }
            SendCampaignRequest::Trademark {
                template_id,
                campaign_name,
                trademark_ids,
                campaign_id,
            } => {
                let template = self.find_template(template_id.parse()?).await?;
                let campaign_id = parse_optional(campaign_id)?;
                self.validate_campaign_name(&campaign_name, campaign_id)?;

                let kind = classify(&template.body);
                if matches!(kind, TemplateKind::Plain | TemplateKind::MultiOwner) {
                    return Err(anyhow::anyhow!(
                        "This template cannot be sent by trademark selection"
                    )
                    .code(400));
                }

                let recipients = resolver
                    .resolve_trademarks(&parse_ids(&trademark_ids)?, kind)
                    .await?;

                self.dispatch_template(template, campaign_name, campaign_id, user_id, recipients)
                    .await
            }
            SendCampaignRequest::Custom {
                subject,
                body,
                contact_ids,
                campaign_name,
                campaign_id,
            } => {
                if contact_ids.len() != 1 {
                    return Err(
                        anyhow::anyhow!("Custom sends target exactly one contact").code(400)
                    );
                }

                let recipients = resolver
                    .resolve_contacts(&parse_ids(&contact_ids)?, None)
                    .await?;

                let Some(recipient) = recipients.values().next() else {
                    return Err(anyhow::anyhow!("No valid recipients").code(400));
                };

                let name = campaign_name.unwrap_or_else(|| {
                    format!("{} - {}", recipient.contact.full_name(), subject)
                        .chars()
                        .take(MAX_CAMPAIGN_NAME)
                        .collect()
                });

                let campaign = self
                    .resolve_or_create_campaign(&name, None, parse_optional(campaign_id)?, user_id)
                    .await?;

                self.dispatch(&campaign, None, &subject, &body, recipients)
                    .await
            }
        }
    }

    async fn dispatch_template(
        &self,
        template: EmailTemplate,
        campaign_name: String,
        campaign_id: Option<ObjectId>,
        user_id: ObjectId,
        recipients: IndexMap<String, Recipient>,
    ) -> error::Result<SendSummary> {
        if recipients.is_empty() {
            return Err(anyhow::anyhow!("No valid recipients").code(400));
        }

        let campaign = self
            .resolve_or_create_campaign(&campaign_name, Some(template.id), campaign_id, user_id)
            .await?;

        self.dispatch(
            &campaign,
            Some(template.id),
            &template.subject,
            &template.body,
            recipients,
        )
        .await
    }

    /// The fan-out loop. Strictly sequential; a recipient that fails to
    /// render or that the provider rejects is logged and skipped, it never
    /// aborts the rest of the batch.
    async fn dispatch(
        &self,
        campaign: &Campaign,
        template_id: Option<ObjectId>,
        subject: &str,
        body: &str,
        recipients: IndexMap<String, Recipient>,
    ) -> error::Result<SendSummary> {
        let provider = self.context.try_get_manual::<MailProviderObject>()?;
        let sent_emails = self.context.try_get_repository::<SentEmail>()?;

        let mut tags = vec![Tag::new("campaign_id", campaign.id.to_hex())];
        match template_id {
            Some(id) => tags.push(Tag::new("template_id", id.to_hex())),
            None => tags.push(Tag::new("email_type", "custom")),
        }

        let total = recipients.len();

        for recipient in recipients.values() {
            let rendered = render(subject, &recipient.context)
                .and_then(|subject| Ok((subject, render(body, &recipient.context)?)));
            let (subject, html) = match rendered {
                Ok(rendered) => rendered,
                Err(err) => {
                    log::error!("Failed to render for {}: {}", recipient.contact.email, err);
                    continue;
                }
            };

            let email = OutboundEmail {
                from: format!("{} <{}>", *MAIL_FROM_NAME, *MAIL_FROM_ADDRESS),
                to: recipient.contact.email.clone(),
                subject,
                html,
                tags: tags.clone(),
            };

            let accept = match provider.send(&email).await {
                Ok(accept) => accept,
                Err(err) => {
                    log::error!("Failed to send to {}: {}", recipient.contact.email, err);
                    continue;
                }
            };

            let sent = SentEmail {
                id: ObjectId::new(),
                resend_id: accept.id,
                campaign_id: campaign.id,
                contact_id: recipient.contact.id,
                template_id,
                sent_at: Utc::now().timestamp_micros(),
                delivered_at: None,
                opened_at: None,
            };

            if let Err(err) = sent_emails.insert(&sent).await {
                log::error!(
                    "Failed to record sent email for {}: {}",
                    recipient.contact.email,
                    err
                );
            }
        }

        Ok(SendSummary {
            message: format!("Campaign sent to {} recipients", total),
            recipients: total,
        })
    }

    /// Pulls delivery and open events from the provider. Timestamps are
    /// sync-time approximations; already-set timestamps are never touched,
    /// so running this twice in a row writes nothing the second time.
    pub async fn sync(&self, campaign_id: ObjectId) -> error::Result<String> {
        let campaigns = self.context.try_get_repository::<Campaign>()?;
        let sent_emails = self.context.try_get_repository::<SentEmail>()?;
        let provider = self.context.try_get_manual::<MailProviderObject>()?;

        campaigns
            .find("id", &Bson::ObjectId(campaign_id))
            .await?
            .ok_or(anyhow::anyhow!("Campaign not found").code(404))?;

        for mut email in sent_emails
            .find_many("campaign_id", &Bson::ObjectId(campaign_id))
            .await?
        {
            let status = match provider.status(&email.resend_id).await {
                Ok(status) => status,
                Err(err) => {
                    log::error!("Failed to fetch status of {}: {}", email.resend_id, err);
                    continue;
                }
            };

            let Some(event) = status.last_event else {
                continue;
            };

            let now = Utc::now().timestamp_micros();
            let mut changed = false;

            match event.as_str() {
                "delivered" => {
                    if email.delivered_at.is_none() {
                        email.delivered_at = Some(now);
                        changed = true;
                    }
                }
                "opened" => {
                    if email.opened_at.is_none() {
                        email.opened_at = Some(now);
                        changed = true;
                    }
                    // Opening implies delivery.
                    if email.delivered_at.is_none() {
                        email.delivered_at = Some(now);
                        changed = true;
                    }
                }
                _ => {}
            }

            if changed {
                sent_emails.delete("id", &email.id).await?;
                sent_emails.insert(&email).await?;
            }
        }

        Ok("Delivery status synchronized".to_string())
    }

    pub async fn find(&self, id: ObjectId) -> error::Result<CampaignOverview> {
        let campaigns = self.context.try_get_repository::<Campaign>()?;
        let sent_emails = self.context.try_get_repository::<SentEmail>()?;

        let campaign = campaigns
            .find("id", &Bson::ObjectId(id))
            .await?
            .ok_or(anyhow::anyhow!("Campaign not found").code(404))?;

        let sent_emails = sent_emails
            .find_many("campaign_id", &Bson::ObjectId(id))
            .await?;

        Ok(CampaignOverview {
            campaign,
            sent_emails,
        })
    }

    pub async fn list(&self) -> error::Result<Vec<Campaign>> {
        let campaigns = self.context.try_get_repository::<Campaign>()?;
        campaigns.find_all(0, u32::MAX).await
    }

    /// Deletes a campaign together with all its sent-email rows.
    pub async fn delete(&self, id: ObjectId) -> error::Result<Campaign> {
        let campaigns = self.context.try_get_repository::<Campaign>()?;
        let sent_emails = self.context.try_get_repository::<SentEmail>()?;

        let campaign = campaigns
            .delete("id", &id)
            .await?
            .ok_or(anyhow::anyhow!("Campaign not found").code(404))?;

        for email in sent_emails
            .find_many("campaign_id", &Bson::ObjectId(id))
            .await?
        {
            sent_emails.delete("id", &email.id).await?;
        }

        Ok(campaign)
    }

    async fn find_template(&self, id: ObjectId) -> error::Result<EmailTemplate> {
        let templates = self.context.try_get_repository::<EmailTemplate>()?;
        templates
            .find("id", &Bson::ObjectId(id))
            .await?
            .ok_or(anyhow::anyhow!("Template not found").code(404))
    }

    fn validate_campaign_name(
        &self,
        name: &str,
        campaign_id: Option<ObjectId>,
    ) -> error::Result<()> {
        // Reusing an existing campaign keeps its stored name.
        if campaign_id.is_none() && name.chars().count() < MIN_CAMPAIGN_NAME {
            return Err(anyhow::anyhow!(
                "Campaign name must be at least {} characters",
                MIN_CAMPAIGN_NAME
            )
            .code(400));
        }
        Ok(())
    }

    /// Campaign rows are only created once recipients have resolved, so a
    /// zero-recipient send leaves nothing behind.
    async fn resolve_or_create_campaign(
        &self,
        name: &str,
        template_id: Option<ObjectId>,
        campaign_id: Option<ObjectId>,
        user_id: ObjectId,
    ) -> error::Result<Campaign> {
        let campaigns = self.context.try_get_repository::<Campaign>()?;

        if let Some(id) = campaign_id {
            return campaigns
                .find("id", &Bson::ObjectId(id))
                .await?
                .ok_or(anyhow::anyhow!("Campaign not found").code(404));
        }

        let campaign = Campaign {
            id: ObjectId::new(),
            name: name.to_string(),
            template_id,
            user_id,
            created_at: Utc::now().timestamp_micros(),
        };

        campaigns.insert(&campaign).await?;

        Ok(campaign)
    }
}

fn parse_ids(ids: &[String]) -> error::Result<Vec<ObjectId>> {
    ids.iter().map(|id| Ok(id.parse()?)).collect()
}

fn parse_optional(id: Option<String>) -> error::Result<Option<ObjectId>> {
    Ok(match id {
        Some(id) => Some(id.parse()?),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixture::Fixture;

    #[actix_web::test]
    async fn contact_send_with_narrowing_renders_fully() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let owner = fixture.add_owner("Laboratorios Sur", &[&contact]).await;
        fixture.add_trademark(&owner, "ALPHA", None).await;
        let narrow = fixture.add_trademark(&owner, "NORVELIN", None).await;
        let template = fixture
            .add_template("Renewal of {{denomination}}", "{{owner.name}} {{denomination}}")
            .await;

        let service = CampaignService::new(fixture.context());
        let summary = service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                trademark_id: Some(narrow.id.to_hex()),
                campaign_id: None,
            })
            .await
            .unwrap();

        assert_eq!(summary.recipients, 1);

        let sent = fixture.provider.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Renewal of NORVELIN");
        assert_eq!(sent[0].html, "Laboratorios Sur NORVELIN");
        assert!(!sent[0].html.contains("{{"));
        drop(sent);

        assert_eq!(fixture.sent_emails().await.len(), 1);
    }

    #[actix_web::test]
    async fn single_trademark_template_requires_trademark_for_contact_send() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let template = fixture
            .add_template("Subject", "Your mark {{denomination}}")
            .await;

        let service = CampaignService::new(fixture.context());
        let result = service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                trademark_id: None,
                campaign_id: None,
            })
            .await;

        assert!(result.is_err());
        assert!(fixture.sent_emails().await.is_empty());
    }

    #[actix_web::test]
    async fn trademark_send_of_plain_template_fails_validation() {
        let fixture = Fixture::new().await;
        let template = fixture
            .add_template("Subject", "Dear {{contact.name}}")
            .await;

        let service = CampaignService::new(fixture.context());
        let result = service
            .send(SendCampaignRequest::Trademark {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                trademark_ids: vec![],
                campaign_id: None,
            })
            .await;

        assert!(result.is_err());
        assert!(fixture.campaigns().await.is_empty());
    }

    #[actix_web::test]
    async fn trademarks_loop_send_aggregates_into_one_email() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("shared@example.com").await;
        let owner = fixture.add_owner("Owner A", &[&contact]).await;
        let a = fixture.add_trademark(&owner, "ALPHA", None).await;
        let b = fixture.add_trademark(&owner, "BETA", None).await;
        let c = fixture.add_trademark(&owner, "GAMMA", None).await;
        let template = fixture
            .add_template("Portfolio", "{{#each trademarks}}{{denomination}};{{/each}}")
            .await;

        let service = CampaignService::new(fixture.context());
        let summary = service
            .send(SendCampaignRequest::Trademark {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                trademark_ids: vec![a.id.to_hex(), b.id.to_hex(), c.id.to_hex()],
                campaign_id: None,
            })
            .await
            .unwrap();

        assert_eq!(summary.recipients, 1);
        assert_eq!(fixture.sent_emails().await.len(), 1);

        let sent = fixture.provider.sent.lock().unwrap();
        assert_eq!(sent[0].html, "ALPHA;BETA;GAMMA;");
    }

    #[actix_web::test]
    async fn single_trademark_send_creates_one_row_per_pair() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("shared@example.com").await;
        let owner = fixture.add_owner("Owner A", &[&contact]).await;
        let a = fixture.add_trademark(&owner, "ALPHA", None).await;
        let b = fixture.add_trademark(&owner, "BETA", None).await;
        let template = fixture
            .add_template("Renewal", "Your mark {{denomination}}")
            .await;

        let service = CampaignService::new(fixture.context());
        let summary = service
            .send(SendCampaignRequest::Trademark {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                trademark_ids: vec![a.id.to_hex(), b.id.to_hex()],
                campaign_id: None,
            })
            .await
            .unwrap();

        // Same contact twice, once per trademark.
        assert_eq!(summary.recipients, 2);
        assert_eq!(fixture.sent_emails().await.len(), 2);
    }

    #[actix_web::test]
    async fn provider_failure_skips_recipient_and_continues() {
        let fixture = Fixture::new().await;
        let first = fixture.add_contact("first@example.com").await;
        let second = fixture.add_contact("second@example.com").await;
        let third = fixture.add_contact("third@example.com").await;
        let template = fixture
            .add_template("Hello", "Dear {{contact.name}}")
            .await;

        fixture.provider.fail_for("second@example.com");

        let service = CampaignService::new(fixture.context());
        let summary = service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![first.id.to_hex(), second.id.to_hex(), third.id.to_hex()],
                trademark_id: None,
                campaign_id: None,
            })
            .await
            .unwrap();

        // Aggregate message still reports the full batch size.
        assert_eq!(summary.recipients, 3);

        let rows = fixture.sent_emails().await;
        assert_eq!(rows.len(), 2);
        let recipients: Vec<ObjectId> = rows.iter().map(|r| r.contact_id).collect();
        assert!(recipients.contains(&first.id));
        assert!(!recipients.contains(&second.id));
        assert!(recipients.contains(&third.id));
    }

    #[actix_web::test]
    async fn short_campaign_name_is_rejected_before_any_send() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let template = fixture.add_template("Hello", "Dear {{contact.name}}").await;

        let service = CampaignService::new(fixture.context());
        let result = service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "short".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                trademark_id: None,
                campaign_id: None,
            })
            .await;

        assert!(result.is_err());
        assert!(fixture.campaigns().await.is_empty());
        assert!(fixture.provider.sent.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn zero_recipients_creates_no_campaign_row() {
        let fixture = Fixture::new().await;
        let template = fixture.add_template("Hello", "Dear {{contact.name}}").await;

        let service = CampaignService::new(fixture.context());
        let result = service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![ObjectId::new().to_hex()],
                trademark_id: None,
                campaign_id: None,
            })
            .await;

        assert!(result.is_err());
        assert!(fixture.campaigns().await.is_empty());
    }

    #[actix_web::test]
    async fn custom_send_synthesizes_truncated_campaign_name() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;

        let service = CampaignService::new(fixture.context());
        let long_subject = "About your trademark portfolio renewal options ".repeat(4);
        let summary = service
            .send(SendCampaignRequest::Custom {
                subject: long_subject,
                body: "<p>Hello {{contact.first_name}}</p>".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                campaign_name: None,
                campaign_id: None,
            })
            .await
            .unwrap();

        assert_eq!(summary.recipients, 1);

        let campaigns = fixture.campaigns().await;
        assert_eq!(campaigns.len(), 1);
        assert!(campaigns[0].name.starts_with("Ana Gomez - "));
        assert_eq!(campaigns[0].name.chars().count(), 100);
        assert!(campaigns[0].template_id.is_none());

        let rows = fixture.sent_emails().await;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].template_id.is_none());

        let sent = fixture.provider.sent.lock().unwrap();
        assert_eq!(sent[0].html, "<p>Hello Ana</p>");
    }

    #[actix_web::test]
    async fn reusing_a_campaign_id_appends_to_it() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let template = fixture.add_template("Hello", "Dear {{contact.name}}").await;

        let service = CampaignService::new(fixture.context());
        let request = |campaign_id: Option<String>| SendCampaignRequest::Contact {
            template_id: template.id.to_hex(),
            campaign_name: "Renewals March".to_string(),
            contact_ids: vec![contact.id.to_hex()],
            trademark_id: None,
            campaign_id,
        };

        service.send(request(None)).await.unwrap();
        let campaign_id = fixture.campaigns().await[0].id;

        service
            .send(request(Some(campaign_id.to_hex())))
            .await
            .unwrap();

        assert_eq!(fixture.campaigns().await.len(), 1);
        assert_eq!(fixture.sent_emails().await.len(), 2);
    }

    #[actix_web::test]
    async fn unknown_campaign_id_aborts_with_not_found() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let template = fixture.add_template("Hello", "Dear {{contact.name}}").await;

        let service = CampaignService::new(fixture.context());
        let result = service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                trademark_id: None,
                campaign_id: Some(ObjectId::new().to_hex()),
            })
            .await;

        assert!(result.is_err());
        assert!(fixture.sent_emails().await.is_empty());
    }

    #[actix_web::test]
    async fn sync_marks_delivered_then_opened_backfills() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let template = fixture.add_template("Hello", "Dear {{contact.name}}").await;

        let service = CampaignService::new(fixture.context());
        service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                trademark_id: None,
                campaign_id: None,
            })
            .await
            .unwrap();

        let campaign_id = fixture.campaigns().await[0].id;
        let resend_id = fixture.sent_emails().await[0].resend_id.clone();

        fixture.provider.set_event(&resend_id, "delivered");
        service.sync(campaign_id).await.unwrap();

        let row = fixture.sent_emails().await.remove(0);
        assert!(row.delivered_at.is_some());
        assert!(row.opened_at.is_none());
        let delivered_at = row.delivered_at;

        fixture.provider.set_event(&resend_id, "opened");
        service.sync(campaign_id).await.unwrap();

        let row = fixture.sent_emails().await.remove(0);
        // Delivery timestamp is kept, open timestamp is added.
        assert_eq!(row.delivered_at, delivered_at);
        assert!(row.opened_at.is_some());
    }

    #[actix_web::test]
    async fn sync_is_idempotent() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let template = fixture.add_template("Hello", "Dear {{contact.name}}").await;

        let service = CampaignService::new(fixture.context());
        service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                trademark_id: None,
                campaign_id: None,
            })
            .await
            .unwrap();

        let campaign_id = fixture.campaigns().await[0].id;
        let resend_id = fixture.sent_emails().await[0].resend_id.clone();
        fixture.provider.set_event(&resend_id, "opened");

        service.sync(campaign_id).await.unwrap();
        let first = fixture.sent_emails().await.remove(0);
        // Opening an undelivered row backfills both timestamps together.
        assert!(first.delivered_at.is_some());
        assert!(first.opened_at.is_some());

        service.sync(campaign_id).await.unwrap();
        let second = fixture.sent_emails().await.remove(0);
        assert_eq!(second.delivered_at, first.delivered_at);
        assert_eq!(second.opened_at, first.opened_at);
    }

    #[actix_web::test]
    async fn delete_cascades_to_sent_emails() {
        let fixture = Fixture::new().await;
        let contact = fixture.add_contact("one@example.com").await;
        let template = fixture.add_template("Hello", "Dear {{contact.name}}").await;

        let service = CampaignService::new(fixture.context());
        service
            .send(SendCampaignRequest::Contact {
                template_id: template.id.to_hex(),
                campaign_name: "Renewals March".to_string(),
                contact_ids: vec![contact.id.to_hex()],
                trademark_id: None,
                campaign_id: None,
            })
            .await
            .unwrap();

        let campaign_id = fixture.campaigns().await[0].id;
        service.delete(campaign_id).await.unwrap();

        assert!(fixture.campaigns().await.is_empty());
        assert!(fixture.sent_emails().await.is_empty());
    }
}
