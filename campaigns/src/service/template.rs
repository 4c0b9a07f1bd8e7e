use chrono::Utc;
use common::{
    context::Context,
    entities::template::{CreateTemplate, EmailTemplate, TemplateChange},
    error::{self, AddCode},
};
use lazy_static::lazy_static;
use mongodb::bson::{oid::ObjectId, Bson};
use regex::Regex;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref OWNERS_LOOP: Regex = Regex::new(r"\{\{#each\s+owners\s*\}\}").unwrap();
    static ref TRADEMARKS_LOOP: Regex = Regex::new(r"\{\{#each\s+trademarks\s*\}\}").unwrap();
    static ref TRADEMARK_FIELD: Regex = Regex::new(
        r"\{\{\{?\s*(?:owner\.)?(?:denomination|class|certificate|expiration|products|type)\s*\}?\}\}"
    )
    .unwrap();
    static ref OWNER_FIELD: Regex =
        Regex::new(r"\{\{\{?\s*owner\.(?:name|country)\s*\}?\}\}").unwrap();
    static ref OWNERS_BLOCK: Regex =
        Regex::new(r"(?s)\{\{#each\s+owners\s*\}\}.*?\{\{/each\}\}").unwrap();
}

/// Structural shape of a template body, inferred from its merge markers.
/// Decides how recipients are expanded and which context flattenings apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Plain,
    SingleTrademark,
    MultiTrademarkNoOwner,
    MultiOwner,
}

fn strip_html(body: &str) -> String {
    HTML_TAG.replace_all(body, "").to_string()
}

/// Classifies a template body. Pure function of the body text; markers are
/// detected after stripping HTML tags so editor markup cannot hide them.
///
/// Precedence: an owners loop wins over everything, then a trademarks loop,
/// then bare single-trademark fields. Anything else is plain.
pub fn classify(body: &str) -> TemplateKind {
    let text = strip_html(body);

    if OWNERS_LOOP.is_match(&text) {
        TemplateKind::MultiOwner
    } else if TRADEMARKS_LOOP.is_match(&text) {
        TemplateKind::MultiTrademarkNoOwner
    } else if TRADEMARK_FIELD.is_match(&text) {
        TemplateKind::SingleTrademark
    } else {
        TemplateKind::Plain
    }
}

/// Save-time check: a trademarks loop combined with bare owner fields outside
/// any owners loop has no well-defined recipient expansion and is rejected.
///
/// The classifier itself does not reject this combination at send time: it
/// classifies as `MultiTrademarkNoOwner` and the bare owner fields render
/// empty. Kept asymmetric pending product-owner resolution.
pub fn validate_body(body: &str) -> error::Result<()> {
    let text = strip_html(body);

    if TRADEMARKS_LOOP.is_match(&text) {
        let outside_owners = OWNERS_BLOCK.replace_all(&text, "");
        if OWNER_FIELD.is_match(&outside_owners) {
            return Err(anyhow::anyhow!(
                "Template cannot combine a trademarks loop with single-owner fields"
            )
            .code(400));
        }
    }

    Ok(())
}

pub struct TemplateService {
    context: Context,
}

impl TemplateService {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub async fn create(&self, template: CreateTemplate) -> error::Result<EmailTemplate> {
        let auth = self.context.auth();
        let id = *auth
            .id()
            .ok_or(anyhow::anyhow!("Authentication required").code(401))?;

        validate_body(&template.body)?;

        let templates = self.context.try_get_repository::<EmailTemplate>()?;

        let template = EmailTemplate {
            id: ObjectId::new(),
            name: template.name,
            subject: template.subject,
            body: template.body,
            user_id: id,
            created_at: Utc::now().timestamp_micros(),
        };

        templates.insert(&template).await?;

        Ok(template)
    }

    pub async fn find(&self, id: ObjectId) -> error::Result<EmailTemplate> {
        let templates = self.context.try_get_repository::<EmailTemplate>()?;

        templates
            .find("id", &Bson::ObjectId(id))
            .await?
            .ok_or(anyhow::anyhow!("Template not found").code(404))
    }

    pub async fn list(&self) -> error::Result<Vec<EmailTemplate>> {
        let templates = self.context.try_get_repository::<EmailTemplate>()?;
        templates.find_all(0, u32::MAX).await
    }

    pub async fn change(&self, id: ObjectId, change: TemplateChange) -> error::Result<EmailTemplate> {
        let templates = self.context.try_get_repository::<EmailTemplate>()?;

        let Some(mut template) = templates.find("id", &Bson::ObjectId(id)).await? else {
            return Err(anyhow::anyhow!("Template not found").code(404));
        };

        if let Some(name) = change.name {
            template.name = name;
        }

        if let Some(subject) = change.subject {
            template.subject = subject;
        }

        if let Some(body) = change.body {
            validate_body(&body)?;
            template.body = body;
        }

        templates.delete("id", &id).await?;
        templates.insert(&template).await?;

        Ok(template)
    }

    pub async fn delete(&self, id: ObjectId) -> error::Result<EmailTemplate> {
        let templates = self.context.try_get_repository::<EmailTemplate>()?;

        templates
            .delete("id", &id)
            .await?
            .ok_or(anyhow::anyhow!("Template not found").code(404))
    }
}
