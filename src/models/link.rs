use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: i64,
    pub original_link: String,
    /// Public redirect key
    pub short_link: String,
    /// Private key granting access to the link's statistics
    pub access_key: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub original_link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLinkResponse {
    pub short_link: String,
    pub access_key: String,
}

impl From<Link> for CreateLinkResponse {
    fn from(link: Link) -> Self {
        Self {
            short_link: link.short_link,
            access_key: link.access_key,
        }
    }
}

/// Generate a 128-bit random token rendered as 32 lowercase hex characters
pub fn generate_token() -> String {
    format!("{:032x}", rand::random::<u128>())
}
