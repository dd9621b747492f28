pub mod inquiry_repo;
pub mod memory_inquiry_repo;

pub use inquiry_repo::*;
pub use memory_inquiry_repo::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::middleware::error_handling::Result;
use crate::models::{
    Inquiry, InquiryFilter, InquiryMessage, InquiryStatus, NewInquiry, NewInquiryMessage,
    OrganizationSummary, ProductSummary, RequirementSummary, StatusChange, UserSummary,
};

/// Storage for inquiries, their message threads and the platform records
/// they reference.
///
/// Multi-step writes (`create_inquiry`, `create_message`) must be atomic:
/// either every row lands or none does.
#[async_trait]
pub trait InquiryRepository: Send + Sync {
    async fn find_organization(&self, id: Uuid) -> Result<Option<OrganizationSummary>>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>>;

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductSummary>>;

    async fn find_requirement(&self, id: Uuid) -> Result<Option<RequirementSummary>>;

    async fn match_result_exists(&self, id: Uuid) -> Result<bool>;

    /// Atomically allocate the next code sequence for `year`, starting at 1.
    ///
    /// Allocation commits on its own, so a create that fails afterwards
    /// leaves a gap in the numbering. Codes stay unique and increasing.
    async fn next_inquiry_sequence(&self, year: i32) -> Result<i64>;

    /// Insert the inquiry and optional opening message, and bump
    /// `inquiry_count` / `quote_count` on the linked product / requirement.
    async fn create_inquiry(
        &self,
        inquiry: NewInquiry,
        initial_message: Option<NewInquiryMessage>,
    ) -> Result<Inquiry>;

    async fn find_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>>;

    /// Newest first
    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>>;

    /// Apply `change` only if the inquiry is still in `change.from`.
    /// Returns `None` when the status moved underneath the caller.
    async fn update_status(
        &self,
        id: Uuid,
        change: &StatusChange,
        at: DateTime<Utc>,
    ) -> Result<Option<Inquiry>>;

    /// Insert a message, touch the inquiry's `updated_at` and apply the
    /// message's status side effect, if any. Fails with BadRequest if the
    /// inquiry reached a terminal status before the write, and with Conflict
    /// if `change.from` no longer matches the stored status.
    async fn create_message(
        &self,
        message: NewInquiryMessage,
        change: Option<StatusChange>,
    ) -> Result<InquiryMessage>;

    /// Oldest first
    async fn list_messages(&self, inquiry_id: Uuid) -> Result<Vec<InquiryMessage>>;

    /// Mark unread messages not sent by `reader_org_id` as read.
    /// Returns the number of messages updated.
    async fn mark_messages_read(
        &self,
        inquiry_id: Uuid,
        reader_org_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64>;

    async fn inquiry_ids_for_organization(&self, organization_id: Uuid) -> Result<Vec<Uuid>>;

    async fn count_unread_messages(&self, inquiry_ids: &[Uuid], reader_org_id: Uuid) -> Result<i64>;

    /// Inquiries in one of `statuses` with no activity since `idle_since`
    async fn find_stale_inquiries(
        &self,
        statuses: &[InquiryStatus],
        idle_since: DateTime<Utc>,
    ) -> Result<Vec<Inquiry>>;
}
