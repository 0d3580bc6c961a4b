pub mod link;
pub mod stats;
pub mod transition;

pub use link::{generate_token, CreateLinkRequest, CreateLinkResponse, Link};
pub use stats::{LinkStatistics, LinkStats, UNDEFINED_COUNTRY};
pub use transition::{NewTransition, Transition};
