pub mod expiry_scheduler_service;
pub mod inquiry_service;

pub use expiry_scheduler_service::ExpirySchedulerService;
pub use inquiry_service::InquiryService;
