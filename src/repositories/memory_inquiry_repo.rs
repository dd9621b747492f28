//! In-memory inquiry storage
//!
//! Backs the engine in unit and HTTP tests, and local runs without Postgres.
//! A single `RwLock` guards all state so every trait method is atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::InquiryRepository;
use crate::middleware::error_handling::{AppError, Result};
use crate::models::{
    Inquiry, InquiryFilter, InquiryMessage, InquiryStatus, NewInquiry, NewInquiryMessage,
    OrganizationSummary, ProductSummary, RequirementSummary, StatusChange, UserSummary,
};

#[derive(Debug, Default)]
struct MemoryState {
    organizations: HashMap<Uuid, OrganizationSummary>,
    users: HashMap<Uuid, UserSummary>,
    products: HashMap<Uuid, ProductSummary>,
    requirements: HashMap<Uuid, RequirementSummary>,
    match_results: HashSet<Uuid>,
    counters: HashMap<i32, i64>,
    // insertion order = creation order
    inquiries: Vec<Inquiry>,
    messages: Vec<InquiryMessage>,
}

impl MemoryState {
    fn inquiry_mut(&mut self, id: Uuid) -> Result<&mut Inquiry> {
        self.inquiries
            .iter_mut()
            .find(|inquiry| inquiry.id == id)
            .ok_or_else(|| AppError::NotFound("Inquiry not found".to_string()))
    }
}

fn apply_change(inquiry: &mut Inquiry, change: &StatusChange, at: DateTime<Utc>) {
    inquiry.status = change.status;
    inquiry.responded_at = change.responded_at;
    inquiry.closed_at = change.closed_at;
    inquiry.close_reason = change.close_reason.clone();
    inquiry.updated_at = at;
}

#[derive(Debug, Default)]
pub struct MemoryInquiryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryInquiryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_organization(&self, name: &str) -> OrganizationSummary {
        let organization = OrganizationSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.state
            .write()
            .await
            .organizations
            .insert(organization.id, organization.clone());
        organization
    }

    pub async fn insert_user(&self, display_name: &str, organization_id: Uuid) -> UserSummary {
        let user = UserSummary {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            organization_id: Some(organization_id),
        };
        self.state.write().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn insert_product(&self, name: &str, organization_id: Uuid) -> ProductSummary {
        let product = ProductSummary {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            inquiry_count: 0,
        };
        self.state
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        product
    }

    pub async fn insert_requirement(&self, title: &str, organization_id: Uuid) -> RequirementSummary {
        let requirement = RequirementSummary {
            id: Uuid::new_v4(),
            organization_id,
            title: title.to_string(),
            quote_count: 0,
        };
        self.state
            .write()
            .await
            .requirements
            .insert(requirement.id, requirement.clone());
        requirement
    }

    pub async fn insert_match_result(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.write().await.match_results.insert(id);
        id
    }

    /// Set the last allocated code sequence for `year`
    pub async fn set_sequence(&self, year: i32, last: i64) {
        self.state.write().await.counters.insert(year, last);
    }

    /// Backdate an inquiry's last activity; used to exercise the expiry sweep.
    pub async fn set_updated_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.state.write().await.inquiry_mut(id)?.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl InquiryRepository for MemoryInquiryRepository {
    async fn find_organization(&self, id: Uuid) -> Result<Option<OrganizationSummary>> {
        Ok(self.state.read().await.organizations.get(&id).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductSummary>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn find_requirement(&self, id: Uuid) -> Result<Option<RequirementSummary>> {
        Ok(self.state.read().await.requirements.get(&id).cloned())
    }

    async fn match_result_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.match_results.contains(&id))
    }

    async fn next_inquiry_sequence(&self, year: i32) -> Result<i64> {
        let mut state = self.state.write().await;
        let last = state.counters.entry(year).or_insert(0);
        *last += 1;
        Ok(*last)
    }

    async fn create_inquiry(
        &self,
        inquiry: NewInquiry,
        initial_message: Option<NewInquiryMessage>,
    ) -> Result<Inquiry> {
        let mut state = self.state.write().await;

        if state.inquiries.iter().any(|existing| existing.code == inquiry.code) {
            return Err(AppError::Conflict(format!(
                "Inquiry code {} already exists",
                inquiry.code
            )));
        }

        let created = Inquiry {
            id: inquiry.id,
            code: inquiry.code,
            buyer_org_id: inquiry.buyer_org_id,
            supplier_org_id: inquiry.supplier_org_id,
            initiated_by_user_id: inquiry.initiated_by_user_id,
            marketplace_product_id: inquiry.marketplace_product_id,
            buyer_requirement_id: inquiry.buyer_requirement_id,
            match_result_id: inquiry.match_result_id,
            subject: inquiry.subject,
            quantity: inquiry.quantity,
            target_price: inquiry.target_price,
            target_currency: inquiry.target_currency,
            required_delivery_date: inquiry.required_delivery_date,
            status: InquiryStatus::Pending,
            responded_at: None,
            closed_at: None,
            close_reason: None,
            created_at: inquiry.created_at,
            updated_at: inquiry.created_at,
        };

        if let Some(product_id) = created.marketplace_product_id {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.inquiry_count += 1;
            }
        }
        if let Some(requirement_id) = created.buyer_requirement_id {
            if let Some(requirement) = state.requirements.get_mut(&requirement_id) {
                requirement.quote_count += 1;
            }
        }

        if let Some(message) = initial_message {
            state.messages.push(message.into_message());
        }
        state.inquiries.push(created.clone());

        Ok(created)
    }

    async fn find_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>> {
        let state = self.state.read().await;
        Ok(state.inquiries.iter().find(|inquiry| inquiry.id == id).cloned())
    }

    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>> {
        let state = self.state.read().await;
        let mut inquiries: Vec<Inquiry> = state
            .inquiries
            .iter()
            .rev()
            .filter(|inquiry| filter.matches(inquiry))
            .cloned()
            .collect();
        // stable sort keeps later-inserted first on equal timestamps
        inquiries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(inquiries)
    }

    async fn update_status(
        &self,
        id: Uuid,
        change: &StatusChange,
        at: DateTime<Utc>,
    ) -> Result<Option<Inquiry>> {
        let mut state = self.state.write().await;
        let inquiry = state.inquiry_mut(id)?;

        if inquiry.status != change.from {
            return Ok(None);
        }

        apply_change(inquiry, change, at);
        Ok(Some(inquiry.clone()))
    }

    async fn create_message(
        &self,
        message: NewInquiryMessage,
        change: Option<StatusChange>,
    ) -> Result<InquiryMessage> {
        let mut state = self.state.write().await;
        let at = message.created_at;
        let inquiry = state.inquiry_mut(message.inquiry_id)?;

        if inquiry.status.is_terminal() {
            return Err(AppError::BadRequest(
                "Cannot send messages to a closed inquiry".to_string(),
            ));
        }

        if change.as_ref().is_some_and(|change| change.from != inquiry.status) {
            return Err(AppError::Conflict(
                "Inquiry status changed, reload and retry".to_string(),
            ));
        }

        match change {
            Some(ref change) => apply_change(inquiry, change, at),
            None => inquiry.updated_at = at,
        }

        let stored = message.into_message();
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, inquiry_id: Uuid) -> Result<Vec<InquiryMessage>> {
        let state = self.state.read().await;
        let mut messages: Vec<InquiryMessage> = state
            .messages
            .iter()
            .filter(|message| message.inquiry_id == inquiry_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn mark_messages_read(
        &self,
        inquiry_id: Uuid,
        reader_org_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;

        for message in state.messages.iter_mut().filter(|message| {
            message.inquiry_id == inquiry_id
                && message.sender_org_id != reader_org_id
                && !message.is_read
        }) {
            message.is_read = true;
            message.read_at = Some(at);
            updated += 1;
        }

        Ok(updated)
    }

    async fn inquiry_ids_for_organization(&self, organization_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .inquiries
            .iter()
            .filter(|inquiry| inquiry.is_participant(organization_id))
            .map(|inquiry| inquiry.id)
            .collect())
    }

    async fn count_unread_messages(&self, inquiry_ids: &[Uuid], reader_org_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        let count = state
            .messages
            .iter()
            .filter(|message| {
                inquiry_ids.contains(&message.inquiry_id)
                    && message.sender_org_id != reader_org_id
                    && !message.is_read
            })
            .count();
        Ok(count as i64)
    }

    async fn find_stale_inquiries(
        &self,
        statuses: &[InquiryStatus],
        idle_since: DateTime<Utc>,
    ) -> Result<Vec<Inquiry>> {
        let state = self.state.read().await;
        let mut stale: Vec<Inquiry> = state
            .inquiries
            .iter()
            .filter(|inquiry| statuses.contains(&inquiry.status) && inquiry.updated_at < idle_since)
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(stale)
    }
}
