use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::inquiry_message::InquiryMessageResponse;
use crate::models::party::{OrganizationSummary, ProductSummary, RequirementSummary, UserSummary};

pub const INQUIRY_CODE_PREFIX: &str = "INQ";
pub const DEFAULT_CURRENCY: &str = "USD";
/// Largest sequence that fits the 6-digit code suffix
pub const MAX_INQUIRY_SEQUENCE: i64 = 999_999;

// ============================================================================
// STATUS STATE MACHINE
// ============================================================================

/// Inquiry status - matches PostgreSQL enum inquiry_status exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "inquiry_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryStatus {
    Pending,
    Responded,
    Negotiating,
    Accepted,
    Rejected,
    Expired,
}

impl InquiryStatus {
    pub const ALL: [InquiryStatus; 6] = [
        InquiryStatus::Pending,
        InquiryStatus::Responded,
        InquiryStatus::Negotiating,
        InquiryStatus::Accepted,
        InquiryStatus::Rejected,
        InquiryStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "PENDING",
            InquiryStatus::Responded => "RESPONDED",
            InquiryStatus::Negotiating => "NEGOTIATING",
            InquiryStatus::Accepted => "ACCEPTED",
            InquiryStatus::Rejected => "REJECTED",
            InquiryStatus::Expired => "EXPIRED",
        }
    }

    /// No transition of any kind leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InquiryStatus::Accepted | InquiryStatus::Rejected | InquiryStatus::Expired
        )
    }

    /// Targets reachable through an explicit status update.
    pub fn allowed_transitions(&self) -> &'static [InquiryStatus] {
        match self {
            InquiryStatus::Pending => &[
                InquiryStatus::Responded,
                InquiryStatus::Rejected,
                InquiryStatus::Expired,
            ],
            InquiryStatus::Responded => &[
                InquiryStatus::Negotiating,
                InquiryStatus::Accepted,
                InquiryStatus::Rejected,
            ],
            InquiryStatus::Negotiating => &[
                InquiryStatus::Accepted,
                InquiryStatus::Rejected,
                InquiryStatus::Expired,
            ],
            InquiryStatus::Accepted | InquiryStatus::Rejected | InquiryStatus::Expired => &[],
        }
    }

    pub fn can_transition_to(&self, next: InquiryStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl std::fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `INQ-<year>-<6-digit sequence>`
pub fn format_inquiry_code(year: i32, sequence: i64) -> String {
    format!("{}-{}-{:06}", INQUIRY_CODE_PREFIX, year, sequence)
}

// ============================================================================
// DATABASE MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: Uuid,
    pub code: String,
    pub buyer_org_id: Uuid,
    pub supplier_org_id: Uuid,
    pub initiated_by_user_id: Uuid,
    pub marketplace_product_id: Option<Uuid>,
    pub buyer_requirement_id: Option<Uuid>,
    pub match_result_id: Option<Uuid>,
    pub subject: String,
    pub quantity: Option<i32>,
    pub target_price: Option<Decimal>,
    pub target_currency: String,
    pub required_delivery_date: Option<NaiveDate>,
    pub status: InquiryStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub close_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inquiry {
    pub fn is_participant(&self, organization_id: Uuid) -> bool {
        self.buyer_org_id == organization_id || self.supplier_org_id == organization_id
    }

    /// Compute the persisted fields for a move to `next`.
    ///
    /// `responded_at` is stamped only on the first entry into RESPONDED;
    /// `closed_at` and `close_reason` are written on every terminal move.
    /// Does not consult the transition table.
    pub fn transition(
        &self,
        next: InquiryStatus,
        at: DateTime<Utc>,
        close_reason: Option<String>,
    ) -> StatusChange {
        let responded_at = match (next, self.responded_at) {
            (InquiryStatus::Responded, None) => Some(at),
            (_, existing) => existing,
        };

        let (closed_at, close_reason) = if next.is_terminal() {
            (Some(at), close_reason)
        } else {
            (self.closed_at, self.close_reason.clone())
        };

        StatusChange {
            from: self.status,
            status: next,
            responded_at,
            closed_at,
            close_reason,
        }
    }
}

/// Full set of status-related columns to write for one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub from: InquiryStatus,
    pub status: InquiryStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub close_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInquiry {
    pub id: Uuid,
    pub code: String,
    pub buyer_org_id: Uuid,
    pub supplier_org_id: Uuid,
    pub initiated_by_user_id: Uuid,
    pub marketplace_product_id: Option<Uuid>,
    pub buyer_requirement_id: Option<Uuid>,
    pub match_result_id: Option<Uuid>,
    pub subject: String,
    pub quantity: Option<i32>,
    pub target_price: Option<Decimal>,
    pub target_currency: String,
    pub required_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// LISTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryRole {
    /// Buyer or supplier
    Any,
    Buyer,
    Supplier,
}

#[derive(Debug, Clone)]
pub struct InquiryFilter {
    pub organization_id: Uuid,
    pub role: InquiryRole,
    pub status: Option<InquiryStatus>,
}

impl InquiryFilter {
    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        let role_ok = match self.role {
            InquiryRole::Any => inquiry.is_participant(self.organization_id),
            InquiryRole::Buyer => inquiry.buyer_org_id == self.organization_id,
            InquiryRole::Supplier => inquiry.supplier_org_id == self.organization_id,
        };
        role_ok && self.status.map_or(true, |status| inquiry.status == status)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InquiryListQuery {
    pub status: Option<InquiryStatus>,
}

// ============================================================================
// REQUEST / RESPONSE
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryRequest {
    pub supplier_org_id: Uuid,
    pub marketplace_product_id: Option<Uuid>,
    pub buyer_requirement_id: Option<Uuid>,
    pub match_result_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Subject must be 1-200 characters"))]
    pub subject: String,
    #[validate(length(max = 5000, message = "Message too long"))]
    pub message: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub target_price: Option<Decimal>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub target_currency: Option<String>,
    pub required_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInquiryStatusRequest {
    pub status: InquiryStatus,
    #[validate(length(max = 1000, message = "Close reason too long"))]
    pub close_reason: Option<String>,
}

/// Inquiry with its parties, linked records and message thread
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryDetails {
    #[serde(flatten)]
    pub inquiry: Inquiry,
    pub buyer_org: Option<OrganizationSummary>,
    pub supplier_org: Option<OrganizationSummary>,
    pub initiated_by: Option<UserSummary>,
    pub marketplace_product: Option<ProductSummary>,
    pub buyer_requirement: Option<RequirementSummary>,
    pub messages: Vec<InquiryMessageResponse>,
}
