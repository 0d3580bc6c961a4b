use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recorded visit of a link
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transition {
    pub id: i64,
    pub link_id: i64,
    pub from_ip: Option<String>,
    pub from_country: Option<String>,
    pub from_city: Option<String>,
    pub to_ip: Option<String>,
    pub to_country: Option<String>,
    pub to_city: Option<String>,
    /// Referer header of the redirect request
    pub forwarded_from: Option<String>,
    pub created_at: i64,
}

/// Fields of a transition gathered by the recorder before insert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTransition {
    pub from_ip: Option<String>,
    pub from_country: Option<String>,
    pub from_city: Option<String>,
    pub to_ip: Option<String>,
    pub to_country: Option<String>,
    pub to_city: Option<String>,
    pub forwarded_from: Option<String>,
}
