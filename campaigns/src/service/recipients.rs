use common::{
    context::Context,
    entities::{
        agent::Agent,
        contact::Contact,
        owner::{Owner, OwnerContact},
        trademark::Trademark,
    },
    error::{self, AddCode},
};
use indexmap::IndexMap;
use mongodb::bson::{oid::ObjectId, Bson};

use super::merge::{MergeContext, OwnerGroup};
use super::template::TemplateKind;

/// One outbound email: the contact it goes to and the merge data it renders
/// with. The map key it is stored under is the deduplication identity.
pub struct Recipient {
    pub contact: Contact,
    pub context: MergeContext,
}

pub struct RecipientResolver<'a> {
    context: &'a Context,
}

impl<'a> RecipientResolver<'a> {
    pub fn new(context: &'a Context) -> Self {
        Self { context }
    }

    /// Contact mode: one email per contact, carrying everything reachable
    /// from it. A supplied trademark id narrows the context to that one
    /// trademark and its owner (the send-from-detail-view case).
    pub async fn resolve_contacts(
        &self,
        contact_ids: &[ObjectId],
        trademark_id: Option<ObjectId>,
    ) -> error::Result<IndexMap<String, Recipient>> {
        let contacts = self.context.try_get_repository::<Contact>()?;

        let narrowed = match trademark_id {
            Some(id) => {
                let trademarks = self.context.try_get_repository::<Trademark>()?;
                let trademark = trademarks
                    .find("id", &Bson::ObjectId(id))
                    .await?
                    .ok_or(anyhow::anyhow!("Trademark not found").code(404))?;
                let owner = self
                    .owner_of(&trademark)
                    .await?
                    .ok_or(anyhow::anyhow!("Trademark owner not found").code(404))?;
                Some((owner, trademark))
            }
            None => None,
        };

        let mut recipients = IndexMap::new();

        for contact_id in contact_ids {
            let Some(contact) = contacts.find("id", &Bson::ObjectId(*contact_id)).await? else {
                log::warn!("Skipping unknown contact {}", contact_id);
                continue;
            };

            let Some(agent) = self.agent_of(&contact).await? else {
                log::warn!("Skipping contact {} without agent", contact.email);
                continue;
            };

            let groups = match &narrowed {
                Some((owner, trademark)) => vec![OwnerGroup {
                    owner: owner.clone(),
                    trademarks: vec![trademark.clone()],
                }],
                None => self.groups_of_contact(&contact).await?,
            };

            let context = MergeContext::build(&agent, &contact, &groups);
            recipients.insert(contact.email.clone(), Recipient { contact, context });
        }

        Ok(recipients)
    }

    /// Trademark mode. For `MultiTrademarkNoOwner` templates the selection is
    /// grouped per reachable contact (one email each, whole group in context,
    /// last owner wins as the representative). For `SingleTrademark`
    /// templates every (contact, trademark) pair gets its own email.
    pub async fn resolve_trademarks(
        &self,
        trademark_ids: &[ObjectId],
        kind: TemplateKind,
    ) -> error::Result<IndexMap<String, Recipient>> {
        match kind {
            TemplateKind::MultiTrademarkNoOwner => self.resolve_grouped(trademark_ids).await,
            TemplateKind::SingleTrademark => self.resolve_per_trademark(trademark_ids).await,
            _ => Err(anyhow::anyhow!(
                "This template cannot be sent by trademark selection"
            )
            .code(400)),
        }
    }

    async fn resolve_grouped(
        &self,
        trademark_ids: &[ObjectId],
    ) -> error::Result<IndexMap<String, Recipient>> {
        let trademarks = self.context.try_get_repository::<Trademark>()?;

        let mut grouped: IndexMap<String, (Contact, Agent, Owner, Vec<Trademark>)> =
            IndexMap::new();

        for trademark_id in trademark_ids {
            let Some(trademark) = trademarks
                .find("id", &Bson::ObjectId(*trademark_id))
                .await?
            else {
                log::warn!("Skipping unknown trademark {}", trademark_id);
                continue;
            };

            let Some(owner) = self.owner_of(&trademark).await? else {
                log::warn!("Skipping trademark {} without owner", trademark.denomination);
                continue;
            };

            for contact in self.contacts_of_owner(owner.id).await? {
                if grouped.contains_key(&contact.email) {
                    let (_, _, group_owner, group) = grouped.get_mut(&contact.email).unwrap();
                    // Last owner with matching trademarks wins as representative.
                    *group_owner = owner.clone();
                    group.push(trademark.clone());
                    continue;
                }

                let Some(agent) = self.agent_of(&contact).await? else {
                    log::warn!("Skipping contact {} without agent", contact.email);
                    continue;
                };
                grouped.insert(
                    contact.email.clone(),
                    (contact, agent, owner.clone(), vec![trademark.clone()]),
                );
            }
        }

        let recipients = grouped
            .into_iter()
            .map(|(key, (contact, agent, owner, group))| {
                let context = MergeContext::build(
                    &agent,
                    &contact,
                    &[OwnerGroup {
                        owner,
                        trademarks: group,
                    }],
                );
                (key, Recipient { contact, context })
            })
            .collect();

        Ok(recipients)
    }

    async fn resolve_per_trademark(
        &self,
        trademark_ids: &[ObjectId],
    ) -> error::Result<IndexMap<String, Recipient>> {
        let trademarks = self.context.try_get_repository::<Trademark>()?;

        let mut recipients = IndexMap::new();

        for trademark_id in trademark_ids {
            let Some(trademark) = trademarks
                .find("id", &Bson::ObjectId(*trademark_id))
                .await?
            else {
                log::warn!("Skipping unknown trademark {}", trademark_id);
                continue;
            };

            let Some(owner) = self.owner_of(&trademark).await? else {
                log::warn!("Skipping trademark {} without owner", trademark.denomination);
                continue;
            };

            for contact in self.contacts_of_owner(owner.id).await? {
                let Some(agent) = self.agent_of(&contact).await? else {
                    log::warn!("Skipping contact {} without agent", contact.email);
                    continue;
                };

                let context = MergeContext::build(
                    &agent,
                    &contact,
                    &[OwnerGroup {
                        owner: owner.clone(),
                        trademarks: vec![trademark.clone()],
                    }],
                );

                let key = format!("{}{}", contact.email, trademark.id.to_hex());
                recipients.insert(key, Recipient { contact, context });
            }
        }

        Ok(recipients)
    }

    async fn agent_of(&self, contact: &Contact) -> error::Result<Option<Agent>> {
        let agents = self.context.try_get_repository::<Agent>()?;
        agents.find("id", &Bson::ObjectId(contact.agent_id)).await
    }

    async fn owner_of(&self, trademark: &Trademark) -> error::Result<Option<Owner>> {
        let owners = self.context.try_get_repository::<Owner>()?;
        owners.find("id", &Bson::ObjectId(trademark.owner_id)).await
    }

    async fn contacts_of_owner(&self, owner_id: ObjectId) -> error::Result<Vec<Contact>> {
        let links = self.context.try_get_repository::<OwnerContact>()?;
        let contacts = self.context.try_get_repository::<Contact>()?;

        let mut result = Vec::new();
        for link in links
            .find_many("owner_id", &Bson::ObjectId(owner_id))
            .await?
        {
            if let Some(contact) = contacts
                .find("id", &Bson::ObjectId(link.contact_id))
                .await?
            {
                result.push(contact);
            }
        }
        Ok(result)
    }

    async fn groups_of_contact(&self, contact: &Contact) -> error::Result<Vec<OwnerGroup>> {
        let links = self.context.try_get_repository::<OwnerContact>()?;
        let owners = self.context.try_get_repository::<Owner>()?;
        let trademarks = self.context.try_get_repository::<Trademark>()?;

        let mut groups = Vec::new();
        for link in links
            .find_many("contact_id", &Bson::ObjectId(contact.id))
            .await?
        {
            let Some(owner) = owners.find("id", &Bson::ObjectId(link.owner_id)).await? else {
                continue;
            };

            let mut marks = trademarks
                .find_many("owner_id", &Bson::ObjectId(owner.id))
                .await?;
            marks.sort_by_key(|t| t.expiration.unwrap_or(i64::MAX));

            groups.push(OwnerGroup {
                owner,
                trademarks: marks,
            });
        }
        Ok(groups)
    }
}
