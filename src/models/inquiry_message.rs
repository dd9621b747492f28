use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::inquiry::InquiryStatus;
use crate::models::party::UserSummary;

/// Semantic role of a message - matches PostgreSQL enum inquiry_message_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "inquiry_message_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Message,
    Quote,
    CounterOffer,
    Acceptance,
    Rejection,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::Message,
        MessageType::Quote,
        MessageType::CounterOffer,
        MessageType::Acceptance,
        MessageType::Rejection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Message => "MESSAGE",
            MessageType::Quote => "QUOTE",
            MessageType::CounterOffer => "COUNTER_OFFER",
            MessageType::Acceptance => "ACCEPTANCE",
            MessageType::Rejection => "REJECTION",
        }
    }

    /// Status an inquiry moves to when a message of this type is posted.
    ///
    /// This path is independent of the explicit transition table: an
    /// ACCEPTANCE closes a PENDING inquiry even though PENDING -> ACCEPTED
    /// is not an allowed explicit update.
    pub fn status_effect(&self, current: InquiryStatus) -> Option<InquiryStatus> {
        match self {
            MessageType::Quote => {
                (current == InquiryStatus::Pending).then_some(InquiryStatus::Responded)
            }
            MessageType::CounterOffer => Some(InquiryStatus::Negotiating),
            MessageType::Acceptance => Some(InquiryStatus::Accepted),
            MessageType::Rejection => Some(InquiryStatus::Rejected),
            MessageType::Message => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InquiryMessage {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub sender_user_id: Uuid,
    pub sender_org_id: Uuid,
    pub message_type: MessageType,
    pub content: String,
    pub quote_price: Option<Decimal>,
    pub quote_currency: Option<String>,
    pub quote_valid_until: Option<NaiveDate>,
    pub quoted_lead_time_days: Option<i32>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInquiryMessage {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub sender_user_id: Uuid,
    pub sender_org_id: Uuid,
    pub message_type: MessageType,
    pub content: String,
    pub quote_price: Option<Decimal>,
    pub quote_currency: Option<String>,
    pub quote_valid_until: Option<NaiveDate>,
    pub quoted_lead_time_days: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl NewInquiryMessage {
    /// Plain MESSAGE carrying the free text supplied at inquiry creation
    pub fn initial(
        inquiry_id: Uuid,
        sender_user_id: Uuid,
        sender_org_id: Uuid,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            inquiry_id,
            sender_user_id,
            sender_org_id,
            message_type: MessageType::Message,
            content,
            quote_price: None,
            quote_currency: None,
            quote_valid_until: None,
            quoted_lead_time_days: None,
            created_at,
        }
    }

    pub fn into_message(self) -> InquiryMessage {
        InquiryMessage {
            id: self.id,
            inquiry_id: self.inquiry_id,
            sender_user_id: self.sender_user_id,
            sender_org_id: self.sender_org_id,
            message_type: self.message_type,
            content: self.content,
            quote_price: self.quote_price,
            quote_currency: self.quote_currency,
            quote_valid_until: self.quote_valid_until,
            quoted_lead_time_days: self.quoted_lead_time_days,
            is_read: false,
            read_at: None,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message_type: MessageType,
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub content: String,
    pub quote_price: Option<Decimal>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub quote_currency: Option<String>,
    pub quote_valid_until: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Lead time cannot be negative"))]
    pub quoted_lead_time_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryMessageResponse {
    #[serde(flatten)]
    pub message: InquiryMessage,
    pub sender: Option<UserSummary>,
}
