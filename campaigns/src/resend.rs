use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const RESEND_API: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAccept {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageStatus {
    pub last_event: Option<String>,
}

#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> anyhow::Result<ProviderAccept>;
    async fn status(&self, message_id: &str) -> anyhow::Result<MessageStatus>;
}

pub type MailProviderObject = Arc<dyn MailProvider>;

pub struct ResendClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    tags: &'a [Tag],
}

impl ResendClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("RESEND_API_KEY").expect("RESEND_API_KEY must be set"))
    }
}

#[async_trait]
impl MailProvider for ResendClient {
    async fn send(&self, email: &OutboundEmail) -> anyhow::Result<ProviderAccept> {
        let request = SendRequest {
            from: &email.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            tags: &email.tags,
        };

        let response = self
            .client
            .post(RESEND_API)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Resend API error {}: {}", status, body);
        }

        Ok(response.json().await?)
    }

    async fn status(&self, message_id: &str) -> anyhow::Result<MessageStatus> {
        let response = self
            .client
            .get(format!("{}/{}", RESEND_API, message_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Resend API error {}: {}", status, body);
        }

        Ok(response.json().await?)
    }
}

/// In-memory provider double. Accepts everything except addresses marked as
/// failing, hands out sequential message ids and serves scripted events.
#[derive(Default)]
pub struct MockProvider {
    pub sent: Mutex<Vec<OutboundEmail>>,
    pub failing: Mutex<HashSet<String>>,
    pub events: Mutex<HashMap<String, String>>,
    counter: AtomicUsize,
}

impl MockProvider {
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn set_event(&self, message_id: &str, event: &str) {
        self.events
            .lock()
            .unwrap()
            .insert(message_id.to_string(), event.to_string());
    }
}

#[async_trait]
impl MailProvider for MockProvider {
    async fn send(&self, email: &OutboundEmail) -> anyhow::Result<ProviderAccept> {
        if self.failing.lock().unwrap().contains(&email.to) {
            bail!("Provider rejected recipient {}", email.to);
        }

        self.sent.lock().unwrap().push(email.clone());
        let id = format!("mock-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        Ok(ProviderAccept { id })
    }

    async fn status(&self, message_id: &str) -> anyhow::Result<MessageStatus> {
        Ok(MessageStatus {
            last_event: self.events.lock().unwrap().get(message_id).cloned(),
        })
    }
}
