//! Read-only views of platform records an inquiry points at.
//!
//! Organizations, users, marketplace products and buyer requirements are
//! managed elsewhere on the platform; the inquiry engine only checks that
//! they exist and hydrates these summaries onto responses.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub display_name: String,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub inquiry_count: i32,
}

/// Buyer-posted sourcing request (RFQ)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSummary {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub quote_count: i32,
}
