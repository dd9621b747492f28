/// Inquiry Negotiation Engine
///
/// Owns the lifecycle of a buyer-supplier inquiry and its message thread:
/// - Creating inquiries with year-scoped codes (INQ-2025-000001)
/// - Access control (only the buyer and supplier organizations)
/// - Explicit status updates validated against the transition table
/// - Message posting with automatic status side effects
/// - Read-state bookkeeping and unread counts
/// - Expiry of idle inquiries

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::error_handling::{AppError, Result};
use crate::middleware::metrics::{record_inquiry_created, record_message_sent, record_status_transition};
use crate::models::{
    format_inquiry_code, CreateInquiryRequest, Inquiry, InquiryDetails, InquiryFilter,
    InquiryMessage, InquiryMessageResponse, InquiryRole, InquiryStatus, NewInquiry,
    NewInquiryMessage, SendMessageRequest, UpdateInquiryStatusRequest, UserSummary,
    DEFAULT_CURRENCY, MAX_INQUIRY_SEQUENCE,
};
use crate::repositories::InquiryRepository;

#[derive(Clone)]
pub struct InquiryService {
    repo: Arc<dyn InquiryRepository>,
}

impl InquiryService {
    pub fn new(repo: Arc<dyn InquiryRepository>) -> Self {
        Self { repo }
    }

    // ========================================================================
    // CREATION
    // ========================================================================

    pub async fn create_inquiry(
        &self,
        buyer_org_id: Uuid,
        user_id: Uuid,
        request: CreateInquiryRequest,
    ) -> Result<InquiryDetails> {
        request.validate()?;

        if request.supplier_org_id == buyer_org_id {
            return Err(AppError::BadRequest(
                "Cannot send an inquiry to your own organization".to_string(),
            ));
        }

        if let Some(price) = request.target_price {
            ensure_price(price, "Target price")?;
        }

        let subject = request.subject.trim().to_string();
        if subject.is_empty() {
            return Err(AppError::BadRequest("Subject cannot be empty".to_string()));
        }

        self.repo
            .find_organization(request.supplier_org_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier organization not found".to_string()))?;

        if let Some(product_id) = request.marketplace_product_id {
            self.repo
                .find_product(product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Marketplace product not found".to_string()))?;
        }

        if let Some(requirement_id) = request.buyer_requirement_id {
            self.repo
                .find_requirement(requirement_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Buyer requirement not found".to_string()))?;
        }

        if let Some(match_result_id) = request.match_result_id {
            if !self.repo.match_result_exists(match_result_id).await? {
                return Err(AppError::NotFound("Match result not found".to_string()));
            }
        }

        let now = Utc::now();
        let sequence = self.repo.next_inquiry_sequence(now.year()).await?;
        if sequence > MAX_INQUIRY_SEQUENCE {
            tracing::error!(year = now.year(), sequence, "Inquiry code sequence exhausted");
            return Err(AppError::Conflict(format!(
                "Inquiry code sequence for {} is exhausted",
                now.year()
            )));
        }
        let code = format_inquiry_code(now.year(), sequence);

        let new_inquiry = NewInquiry {
            id: Uuid::new_v4(),
            code,
            buyer_org_id,
            supplier_org_id: request.supplier_org_id,
            initiated_by_user_id: user_id,
            marketplace_product_id: request.marketplace_product_id,
            buyer_requirement_id: request.buyer_requirement_id,
            match_result_id: request.match_result_id,
            subject,
            quantity: request.quantity,
            target_price: request.target_price,
            target_currency: normalize_currency(request.target_currency.as_deref())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            required_delivery_date: request.required_delivery_date,
            created_at: now,
        };

        let initial_message = request
            .message
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| {
                NewInquiryMessage::initial(new_inquiry.id, user_id, buyer_org_id, text.to_string(), now)
            });

        let inquiry = self.repo.create_inquiry(new_inquiry, initial_message).await?;

        record_inquiry_created();
        tracing::info!(
            inquiry_id = %inquiry.id,
            code = %inquiry.code,
            buyer_org_id = %inquiry.buyer_org_id,
            supplier_org_id = %inquiry.supplier_org_id,
            "Inquiry created"
        );

        self.hydrate(inquiry).await
    }

    // ========================================================================
    // ACCESS
    // ========================================================================

    /// Load an inquiry and check that `organization_id` is one of its parties
    async fn authorize(&self, id: Uuid, organization_id: Uuid) -> Result<Inquiry> {
        let inquiry = self
            .repo
            .find_inquiry(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inquiry not found".to_string()))?;

        if !inquiry.is_participant(organization_id) {
            tracing::warn!(
                inquiry_id = %id,
                organization_id = %organization_id,
                "Inquiry access denied"
            );
            return Err(AppError::Forbidden(
                "You do not have access to this inquiry".to_string(),
            ));
        }

        Ok(inquiry)
    }

    pub async fn get_inquiry_with_access(&self, id: Uuid, organization_id: Uuid) -> Result<InquiryDetails> {
        let inquiry = self.authorize(id, organization_id).await?;
        self.hydrate(inquiry).await
    }

    /// Viewing an inquiry clears the counterpart's unread backlog for the viewer
    pub async fn view_inquiry(&self, id: Uuid, organization_id: Uuid) -> Result<InquiryDetails> {
        let inquiry = self.authorize(id, organization_id).await?;
        self.repo
            .mark_messages_read(id, organization_id, Utc::now())
            .await?;
        self.hydrate(inquiry).await
    }

    // ========================================================================
    // LISTING
    // ========================================================================

    pub async fn get_all_inquiries(
        &self,
        organization_id: Uuid,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryDetails>> {
        self.list(organization_id, InquiryRole::Any, status).await
    }

    pub async fn get_sent_inquiries(
        &self,
        organization_id: Uuid,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryDetails>> {
        self.list(organization_id, InquiryRole::Buyer, status).await
    }

    pub async fn get_received_inquiries(
        &self,
        organization_id: Uuid,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryDetails>> {
        self.list(organization_id, InquiryRole::Supplier, status).await
    }

    async fn list(
        &self,
        organization_id: Uuid,
        role: InquiryRole,
        status: Option<InquiryStatus>,
    ) -> Result<Vec<InquiryDetails>> {
        let filter = InquiryFilter {
            organization_id,
            role,
            status,
        };
        let inquiries = self.repo.list_inquiries(&filter).await?;

        let mut hydrated = Vec::with_capacity(inquiries.len());
        for inquiry in inquiries {
            hydrated.push(self.hydrate(inquiry).await?);
        }
        Ok(hydrated)
    }

    // ========================================================================
    // STATUS
    // ========================================================================

    pub async fn update_status(
        &self,
        id: Uuid,
        organization_id: Uuid,
        request: UpdateInquiryStatusRequest,
    ) -> Result<InquiryDetails> {
        request.validate()?;

        let inquiry = self.authorize(id, organization_id).await?;
        let from = inquiry.status;
        let to = request.status;

        if !from.can_transition_to(to) {
            return Err(AppError::BadRequest(format!(
                "Cannot transition from {} to {}",
                from, to
            )));
        }

        let now = Utc::now();
        let change = inquiry.transition(to, now, request.close_reason);
        let updated = self
            .repo
            .update_status(id, &change, now)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Inquiry status changed, reload and retry".to_string())
            })?;

        record_status_transition(from, to, "explicit");
        tracing::info!(
            inquiry_id = %id,
            code = %updated.code,
            from = %from,
            to = %to,
            organization_id = %organization_id,
            "Inquiry status updated"
        );

        self.hydrate(updated).await
    }

    /// Expire PENDING/NEGOTIATING inquiries idle for longer than `max_idle`.
    ///
    /// Returns the number of inquiries expired. A failed update is logged and
    /// the rest of the batch still runs.
    pub async fn expire_stale_inquiries(&self, now: DateTime<Utc>, max_idle: Duration) -> Result<usize> {
        if max_idle <= Duration::zero() {
            return Err(AppError::BadRequest(
                "Expiry window must be positive".to_string(),
            ));
        }
        let idle_since = now.checked_sub_signed(max_idle).ok_or_else(|| {
            AppError::BadRequest("Expiry window is out of range".to_string())
        })?;

        let expirable: Vec<InquiryStatus> = InquiryStatus::ALL
            .into_iter()
            .filter(|status| status.can_transition_to(InquiryStatus::Expired))
            .collect();

        let stale = self
            .repo
            .find_stale_inquiries(&expirable, idle_since)
            .await?;

        let reason = format!("Expired after {} days without activity", max_idle.num_days());
        let mut expired = 0;

        for inquiry in stale {
            let change = inquiry.transition(InquiryStatus::Expired, now, Some(reason.clone()));
            match self.repo.update_status(inquiry.id, &change, now).await {
                Ok(Some(updated)) => {
                    record_status_transition(inquiry.status, InquiryStatus::Expired, "expiry");
                    tracing::info!(
                        inquiry_id = %updated.id,
                        code = %updated.code,
                        from = %inquiry.status,
                        "Inquiry expired"
                    );
                    expired += 1;
                }
                Ok(None) => {
                    tracing::debug!(inquiry_id = %inquiry.id, "Inquiry changed before expiry, skipped");
                }
                Err(e) => {
                    tracing::error!(inquiry_id = %inquiry.id, "Failed to expire inquiry: {}", e);
                }
            }
        }

        Ok(expired)
    }

    // ========================================================================
    // MESSAGES
    // ========================================================================

    pub async fn send_message(
        &self,
        inquiry_id: Uuid,
        user_id: Uuid,
        organization_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<InquiryMessageResponse> {
        request.validate()?;

        let inquiry = self.authorize(inquiry_id, organization_id).await?;

        if inquiry.status.is_terminal() {
            return Err(AppError::BadRequest(
                "Cannot send messages to a closed inquiry".to_string(),
            ));
        }

        let content = request.content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::BadRequest("Message cannot be empty".to_string()));
        }

        if let Some(price) = request.quote_price {
            ensure_price(price, "Quote price")?;
        }

        let now = Utc::now();
        let change = request
            .message_type
            .status_effect(inquiry.status)
            .filter(|next| *next != inquiry.status)
            .map(|next| inquiry.transition(next, now, None));

        let new_message = NewInquiryMessage {
            id: Uuid::new_v4(),
            inquiry_id,
            sender_user_id: user_id,
            sender_org_id: organization_id,
            message_type: request.message_type,
            content,
            quote_price: request.quote_price,
            quote_currency: normalize_currency(request.quote_currency.as_deref()),
            quote_valid_until: request.quote_valid_until,
            quoted_lead_time_days: request.quoted_lead_time_days,
            created_at: now,
        };

        let message = self.repo.create_message(new_message, change.clone()).await?;

        record_message_sent(message.message_type);
        tracing::info!(
            inquiry_id = %inquiry_id,
            message_id = %message.id,
            message_type = %message.message_type,
            organization_id = %organization_id,
            "Inquiry message sent"
        );

        if let Some(change) = change {
            record_status_transition(change.from, change.status, "message");
            tracing::info!(
                inquiry_id = %inquiry_id,
                from = %change.from,
                to = %change.status,
                "Inquiry status changed by message"
            );
        }

        let sender = self.repo.find_user(user_id).await?;
        Ok(InquiryMessageResponse { message, sender })
    }

    pub async fn get_messages(&self, inquiry_id: Uuid, organization_id: Uuid) -> Result<Vec<InquiryMessageResponse>> {
        self.authorize(inquiry_id, organization_id).await?;
        let messages = self.repo.list_messages(inquiry_id).await?;
        self.with_senders(messages).await
    }

    /// Returns the number of messages newly marked as read
    pub async fn mark_messages_as_read(&self, inquiry_id: Uuid, organization_id: Uuid) -> Result<u64> {
        self.authorize(inquiry_id, organization_id).await?;
        let updated = self
            .repo
            .mark_messages_read(inquiry_id, organization_id, Utc::now())
            .await?;

        tracing::debug!(
            inquiry_id = %inquiry_id,
            organization_id = %organization_id,
            updated,
            "Messages marked as read"
        );

        Ok(updated)
    }

    pub async fn get_unread_count(&self, organization_id: Uuid) -> Result<i64> {
        let inquiry_ids = self.repo.inquiry_ids_for_organization(organization_id).await?;
        if inquiry_ids.is_empty() {
            return Ok(0);
        }

        self.repo
            .count_unread_messages(&inquiry_ids, organization_id)
            .await
    }

    // ========================================================================
    // HYDRATION
    // ========================================================================

    async fn hydrate(&self, inquiry: Inquiry) -> Result<InquiryDetails> {
        let buyer_org = self.repo.find_organization(inquiry.buyer_org_id).await?;
        let supplier_org = self.repo.find_organization(inquiry.supplier_org_id).await?;
        let initiated_by = self.repo.find_user(inquiry.initiated_by_user_id).await?;

        let marketplace_product = match inquiry.marketplace_product_id {
            Some(id) => self.repo.find_product(id).await?,
            None => None,
        };
        let buyer_requirement = match inquiry.buyer_requirement_id {
            Some(id) => self.repo.find_requirement(id).await?,
            None => None,
        };

        let messages = self.repo.list_messages(inquiry.id).await?;
        let messages = self.with_senders(messages).await?;

        Ok(InquiryDetails {
            inquiry,
            buyer_org,
            supplier_org,
            initiated_by,
            marketplace_product,
            buyer_requirement,
            messages,
        })
    }

    async fn with_senders(&self, messages: Vec<InquiryMessage>) -> Result<Vec<InquiryMessageResponse>> {
        let mut senders: HashMap<Uuid, Option<UserSummary>> = HashMap::new();
        let mut responses = Vec::with_capacity(messages.len());

        for message in messages {
            let sender = match senders.get(&message.sender_user_id) {
                Some(sender) => sender.clone(),
                None => {
                    let sender = self.repo.find_user(message.sender_user_id).await?;
                    senders.insert(message.sender_user_id, sender.clone());
                    sender
                }
            };
            responses.push(InquiryMessageResponse { message, sender });
        }

        Ok(responses)
    }
}

/// Prices are stored as NUMERIC(14, 2)
const PRICE_SCALE: u32 = 2;
const PRICE_LIMIT: i64 = 1_000_000_000_000;

fn ensure_price(price: Decimal, label: &str) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::BadRequest(format!("{} must be greater than zero", label)));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(AppError::BadRequest(format!(
            "{} cannot have more than {} decimal places",
            label, PRICE_SCALE
        )));
    }
    if price >= Decimal::from(PRICE_LIMIT) {
        return Err(AppError::BadRequest(format!("{} is too large", label)));
    }
    Ok(())
}

fn normalize_currency(currency: Option<&str>) -> Option<String> {
    currency
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_uppercase)
}
