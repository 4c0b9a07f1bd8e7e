use chrono::DateTime;
use common::{
    entities::{agent::Agent, contact::Contact, owner::Owner, trademark::Trademark},
    error,
};
use handlebars::Handlebars;
use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HANDLEBARS: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut hb = Handlebars::new();
    // Missing keys render as empty string; templates are already HTML so
    // escaping would corrupt them.
    hb.set_strict_mode(false);
    hb.register_escape_fn(handlebars::no_escape);
    hb
});

lazy_static! {
    // Rich-text editors wrap merge markers in non-editable spans.
    static ref WRAPPED_MARKER: Regex =
        Regex::new(r"<span[^>]*>\s*(\{\{\{?[^{}]*\}\}\}?)\s*</span>").unwrap();
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergeAgent {
    pub name: String,
    pub country: String,
    pub area: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergeContact {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergeTrademark {
    pub denomination: String,
    /// Comma-joined ascending Nice class numbers.
    pub class: String,
    pub certificate: String,
    /// `yyyy-MM-dd`, or empty when the trademark has no expiration yet.
    pub expiration: String,
    pub products: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergeOwner {
    pub name: String,
    pub country: String,
    pub trademarks: Vec<MergeTrademark>,
}

/// One owner together with the trademarks selected for the send.
#[derive(Debug, Clone)]
pub struct OwnerGroup {
    pub owner: Owner,
    pub trademarks: Vec<Trademark>,
}

/// The typed per-recipient data handed to the renderer.
///
/// Built as an ordered pipeline: the `owners` array first, then the
/// single-owner flatten, then the flat `trademarks` array, then the
/// single-trademark top-level spread. The spread is serialized last so it
/// would win over any colliding key (none collide by construction).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergeContext {
    pub agent: MergeAgent,
    pub contact: MergeContact,
    pub owners: Vec<MergeOwner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<MergeOwner>,
    pub trademarks: Vec<MergeTrademark>,
    #[serde(flatten)]
    pub single: Option<MergeTrademark>,
}

impl MergeContext {
    pub fn build(agent: &Agent, contact: &Contact, groups: &[OwnerGroup]) -> Self {
        let mut context = MergeContext {
            agent: MergeAgent {
                name: agent.name.clone(),
                country: agent.country.clone(),
                area: agent.area.clone(),
            },
            contact: MergeContact {
                name: contact.full_name(),
                first_name: contact.first_name.clone(),
                last_name: contact.last_name.clone(),
                email: contact.email.clone(),
            },
            owners: Vec::new(),
            owner: None,
            trademarks: Vec::new(),
            single: None,
        };

        context.set_owners(groups);
        context.flatten_single_owner();
        context.set_trademarks(groups);
        context.spread_single_trademark();

        context
    }

    fn set_owners(&mut self, groups: &[OwnerGroup]) {
        self.owners = groups
            .iter()
            .map(|group| MergeOwner {
                name: group.owner.name.clone(),
                country: title_case(&group.owner.country),
                trademarks: normalize_trademarks(&group.trademarks),
            })
            .collect();
    }

    fn flatten_single_owner(&mut self) {
        if self.owners.len() == 1 {
            self.owner = Some(self.owners[0].clone());
        }
    }

    fn set_trademarks(&mut self, groups: &[OwnerGroup]) {
        let all: Vec<Trademark> = groups
            .iter()
            .flat_map(|group| group.trademarks.iter().cloned())
            .collect();
        self.trademarks = normalize_trademarks(&all);
    }

    fn spread_single_trademark(&mut self) {
        if self.trademarks.len() == 1 {
            self.single = Some(self.trademarks[0].clone());
        }
    }
}

fn normalize_trademarks(trademarks: &[Trademark]) -> Vec<MergeTrademark> {
    let mut sorted: Vec<&Trademark> = trademarks.iter().collect();
    sorted.sort_by_key(|t| t.expiration.unwrap_or(i64::MAX));

    sorted
        .into_iter()
        .map(|t| {
            let mut classes = t.classes.clone();
            classes.sort_unstable();
            MergeTrademark {
                denomination: t.denomination.clone(),
                class: classes
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                certificate: t.certificate.clone(),
                expiration: format_expiration(t.expiration),
                products: t.products.clone(),
                kind: t.kind.clone(),
            }
        })
        .collect()
}

fn format_expiration(expiration: Option<i64>) -> String {
    expiration
        .and_then(DateTime::from_timestamp_micros)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn title_case(country: &str) -> String {
    country
        .replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders one template string against a merge context. Editor-inserted span
/// wrappers around markers are unwrapped first so the markers survive
/// rich-text editing.
pub fn render(template: &str, context: &MergeContext) -> error::Result<String> {
    let unwrapped = WRAPPED_MARKER.replace_all(template, "$1");
    Ok(HANDLEBARS.render_template(&unwrapped, context)?)
}
