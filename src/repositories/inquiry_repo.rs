use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::InquiryRepository;
use crate::middleware::error_handling::{AppError, Result};
use crate::models::{
    Inquiry, InquiryFilter, InquiryMessage, InquiryRole, InquiryStatus, NewInquiry,
    NewInquiryMessage, OrganizationSummary, ProductSummary, RequirementSummary, StatusChange,
    UserSummary,
};

const INQUIRY_COLUMNS: &str = r#"
    id, code, buyer_org_id, supplier_org_id, initiated_by_user_id,
    marketplace_product_id, buyer_requirement_id, match_result_id,
    subject, quantity, target_price, target_currency, required_delivery_date,
    status, responded_at, closed_at, close_reason, created_at, updated_at
"#;

const MESSAGE_COLUMNS: &str = r#"
    id, inquiry_id, sender_user_id, sender_org_id, message_type, content,
    quote_price, quote_currency, quote_valid_until, quoted_lead_time_days,
    is_read, read_at, created_at
"#;

pub struct PgInquiryRepository {
    pool: PgPool,
}

impl PgInquiryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_message(
        tx: &mut Transaction<'_, Postgres>,
        message: &NewInquiryMessage,
    ) -> Result<InquiryMessage> {
        let sql = format!(
            r#"
            INSERT INTO inquiry_messages (
                id, inquiry_id, sender_user_id, sender_org_id, message_type, content,
                quote_price, quote_currency, quote_valid_until, quoted_lead_time_days, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        );

        let inserted = sqlx::query_as::<_, InquiryMessage>(&sql)
            .bind(message.id)
            .bind(message.inquiry_id)
            .bind(message.sender_user_id)
            .bind(message.sender_org_id)
            .bind(message.message_type)
            .bind(&message.content)
            .bind(message.quote_price)
            .bind(&message.quote_currency)
            .bind(message.quote_valid_until)
            .bind(message.quoted_lead_time_days)
            .bind(message.created_at)
            .fetch_one(&mut **tx)
            .await?;

        Ok(inserted)
    }
}

#[async_trait]
impl InquiryRepository for PgInquiryRepository {
    async fn find_organization(&self, id: Uuid) -> Result<Option<OrganizationSummary>> {
        let organization = sqlx::query_as::<_, OrganizationSummary>(
            "SELECT id, name FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>(
            "SELECT id, display_name, organization_id FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductSummary>> {
        let product = sqlx::query_as::<_, ProductSummary>(
            "SELECT id, organization_id, name, inquiry_count FROM marketplace_products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn find_requirement(&self, id: Uuid) -> Result<Option<RequirementSummary>> {
        let requirement = sqlx::query_as::<_, RequirementSummary>(
            "SELECT id, organization_id, title, quote_count FROM buyer_requirements WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(requirement)
    }

    async fn match_result_exists(&self, id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM match_results WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn next_inquiry_sequence(&self, year: i32) -> Result<i64> {
        // Single statement: concurrent callers serialize on the counter row
        let sequence = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO inquiry_counters (year, last_seq)
            VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_seq = inquiry_counters.last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(sequence)
    }

    async fn create_inquiry(
        &self,
        inquiry: NewInquiry,
        initial_message: Option<NewInquiryMessage>,
    ) -> Result<Inquiry> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO inquiries (
                id, code, buyer_org_id, supplier_org_id, initiated_by_user_id,
                marketplace_product_id, buyer_requirement_id, match_result_id,
                subject, quantity, target_price, target_currency, required_delivery_date,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        );

        let created = sqlx::query_as::<_, Inquiry>(&sql)
            .bind(inquiry.id)
            .bind(&inquiry.code)
            .bind(inquiry.buyer_org_id)
            .bind(inquiry.supplier_org_id)
            .bind(inquiry.initiated_by_user_id)
            .bind(inquiry.marketplace_product_id)
            .bind(inquiry.buyer_requirement_id)
            .bind(inquiry.match_result_id)
            .bind(&inquiry.subject)
            .bind(inquiry.quantity)
            .bind(inquiry.target_price)
            .bind(&inquiry.target_currency)
            .bind(inquiry.required_delivery_date)
            .bind(InquiryStatus::Pending)
            .bind(inquiry.created_at)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(message) = initial_message {
            Self::insert_message(&mut tx, &message).await?;
        }

        if let Some(product_id) = inquiry.marketplace_product_id {
            sqlx::query("UPDATE marketplace_products SET inquiry_count = inquiry_count + 1 WHERE id = $1")
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(requirement_id) = inquiry.buyer_requirement_id {
            sqlx::query("UPDATE buyer_requirements SET quote_count = quote_count + 1 WHERE id = $1")
                .bind(requirement_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn find_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>> {
        let sql = format!("SELECT {} FROM inquiries WHERE id = $1", INQUIRY_COLUMNS);

        let inquiry = sqlx::query_as::<_, Inquiry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(inquiry)
    }

    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>> {
        let party_clause = match filter.role {
            InquiryRole::Any => "(buyer_org_id = $1 OR supplier_org_id = $1)",
            InquiryRole::Buyer => "buyer_org_id = $1",
            InquiryRole::Supplier => "supplier_org_id = $1",
        };

        let sql = format!(
            r#"
            SELECT {}
            FROM inquiries
            WHERE {} AND ($2::inquiry_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            INQUIRY_COLUMNS, party_clause
        );

        let inquiries = sqlx::query_as::<_, Inquiry>(&sql)
            .bind(filter.organization_id)
            .bind(filter.status)
            .fetch_all(&self.pool)
            .await?;

        Ok(inquiries)
    }

    async fn update_status(
        &self,
        id: Uuid,
        change: &StatusChange,
        at: DateTime<Utc>,
    ) -> Result<Option<Inquiry>> {
        let sql = format!(
            r#"
            UPDATE inquiries
            SET status = $3, responded_at = $4, closed_at = $5, close_reason = $6, updated_at = $7
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        );

        let updated = sqlx::query_as::<_, Inquiry>(&sql)
            .bind(id)
            .bind(change.from)
            .bind(change.status)
            .bind(change.responded_at)
            .bind(change.closed_at)
            .bind(&change.close_reason)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn create_message(
        &self,
        message: NewInquiryMessage,
        change: Option<StatusChange>,
    ) -> Result<InquiryMessage> {
        let mut tx = self.pool.begin().await?;

        // Lock the inquiry row so a concurrent close cannot slip in between
        // the status check and the insert.
        let current = sqlx::query_scalar::<_, InquiryStatus>(
            "SELECT status FROM inquiries WHERE id = $1 FOR UPDATE",
        )
        .bind(message.inquiry_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inquiry not found".to_string()))?;

        if current.is_terminal() {
            return Err(AppError::BadRequest(
                "Cannot send messages to a closed inquiry".to_string(),
            ));
        }

        if change.as_ref().is_some_and(|change| change.from != current) {
            return Err(AppError::Conflict(
                "Inquiry status changed, reload and retry".to_string(),
            ));
        }

        let inserted = Self::insert_message(&mut tx, &message).await?;

        match change {
            Some(change) => {
                sqlx::query(
                    r#"
                    UPDATE inquiries
                    SET status = $2, responded_at = $3, closed_at = $4, close_reason = $5, updated_at = $6
                    WHERE id = $1
                    "#,
                )
                .bind(message.inquiry_id)
                .bind(change.status)
                .bind(change.responded_at)
                .bind(change.closed_at)
                .bind(&change.close_reason)
                .bind(message.created_at)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("UPDATE inquiries SET updated_at = $2 WHERE id = $1")
                    .bind(message.inquiry_id)
                    .bind(message.created_at)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn list_messages(&self, inquiry_id: Uuid) -> Result<Vec<InquiryMessage>> {
        let sql = format!(
            "SELECT {} FROM inquiry_messages WHERE inquiry_id = $1 ORDER BY created_at ASC, id ASC",
            MESSAGE_COLUMNS
        );

        let messages = sqlx::query_as::<_, InquiryMessage>(&sql)
            .bind(inquiry_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(messages)
    }

    async fn mark_messages_read(
        &self,
        inquiry_id: Uuid,
        reader_org_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE inquiry_messages
            SET is_read = TRUE, read_at = $3
            WHERE inquiry_id = $1 AND sender_org_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(inquiry_id)
        .bind(reader_org_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn inquiry_ids_for_organization(&self, organization_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM inquiries WHERE buyer_org_id = $1 OR supplier_org_id = $1",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn count_unread_messages(&self, inquiry_ids: &[Uuid], reader_org_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM inquiry_messages
            WHERE inquiry_id = ANY($1) AND sender_org_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(inquiry_ids)
        .bind(reader_org_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_stale_inquiries(
        &self,
        statuses: &[InquiryStatus],
        idle_since: DateTime<Utc>,
    ) -> Result<Vec<Inquiry>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let sql = format!(
            r#"
            SELECT {}
            FROM inquiries
            WHERE status::text = ANY($1) AND updated_at < $2
            ORDER BY updated_at ASC
            "#,
            INQUIRY_COLUMNS
        );

        let inquiries = sqlx::query_as::<_, Inquiry>(&sql)
            .bind(&statuses)
            .bind(idle_since)
            .fetch_all(&self.pool)
            .await?;

        Ok(inquiries)
    }
}
