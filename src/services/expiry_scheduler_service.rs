/// Inquiry Expiry Scheduler
///
/// Background service that periodically closes inquiries left idle in
/// PENDING or NEGOTIATING for longer than the configured window.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::config::ExpiryConfig;
use crate::middleware::error_handling::{AppError, Result};
use crate::repositories::InquiryRepository;
use crate::services::InquiryService;

pub struct ExpirySchedulerService {
    inquiry_service: InquiryService,
    config: ExpiryConfig,
}

impl ExpirySchedulerService {
    pub fn new(repo: Arc<dyn InquiryRepository>, config: ExpiryConfig) -> Self {
        Self {
            inquiry_service: InquiryService::new(repo),
            config,
        }
    }

    fn max_idle(&self) -> Result<Duration> {
        Duration::try_days(self.config.max_idle_days).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Expiry window of {} days is out of range",
                self.config.max_idle_days
            ))
        })
    }

    /// Run a single sweep as of `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        self.inquiry_service
            .expire_stale_inquiries(now, self.max_idle()?)
            .await
    }

    /// Sweep forever on the configured interval. The first sweep runs immediately.
    pub async fn run(self) {
        // tokio panics on a zero period
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            self.config.sweep_interval_secs.max(1),
        ));

        tracing::info!(
            max_idle_days = self.config.max_idle_days,
            sweep_interval_secs = self.config.sweep_interval_secs,
            "Inquiry expiry scheduler started"
        );

        loop {
            interval.tick().await;

            match self.run_once(Utc::now()).await {
                Ok(0) => tracing::debug!("Expiry sweep found no stale inquiries"),
                Ok(expired) => tracing::info!(expired, "Expiry sweep completed"),
                Err(e) => tracing::error!("Expiry sweep failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateInquiryRequest, InquiryStatus};
    use crate::repositories::MemoryInquiryRepository;

    #[tokio::test]
    async fn test_run_once_expires_idle_inquiry() {
        let repo = Arc::new(MemoryInquiryRepository::new());
        let buyer = repo.insert_organization("Buyer Co").await;
        let supplier = repo.insert_organization("Supplier Co").await;
        let user = repo.insert_user("Buyer User", buyer.id).await;

        let service = InquiryService::new(repo.clone());
        let inquiry = service
            .create_inquiry(
                buyer.id,
                user.id,
                CreateInquiryRequest {
                    supplier_org_id: supplier.id,
                    marketplace_product_id: None,
                    buyer_requirement_id: None,
                    match_result_id: None,
                    subject: "Spare parts for dialysis units".to_string(),
                    message: None,
                    quantity: None,
                    target_price: None,
                    target_currency: None,
                    required_delivery_date: None,
                },
            )
            .await
            .unwrap()
            .inquiry;

        let scheduler = ExpirySchedulerService::new(
            repo.clone(),
            ExpiryConfig {
                max_idle_days: 7,
                sweep_interval_secs: 60,
            },
        );

        let now = Utc::now();
        assert_eq!(scheduler.run_once(now).await.unwrap(), 0);

        repo.set_updated_at(inquiry.id, now - Duration::days(8)).await.unwrap();
        assert_eq!(scheduler.run_once(now).await.unwrap(), 1);
        // already expired, nothing left to do
        assert_eq!(scheduler.run_once(now).await.unwrap(), 0);

        let expired = service.get_inquiry_with_access(inquiry.id, supplier.id).await.unwrap();
        assert_eq!(expired.inquiry.status, InquiryStatus::Expired);
        assert_eq!(
            expired.inquiry.close_reason.as_deref(),
            Some("Expired after 7 days without activity")
        );
    }

    #[tokio::test]
    async fn test_out_of_range_window_is_an_error() {
        let repo = Arc::new(MemoryInquiryRepository::new());

        for max_idle_days in [i64::MAX / 1000, 0, -3] {
            let scheduler = ExpirySchedulerService::new(
                repo.clone(),
                ExpiryConfig {
                    max_idle_days,
                    sweep_interval_secs: 60,
                },
            );
            let err = scheduler.run_once(Utc::now()).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{}", max_idle_days);
        }
    }
}
