pub mod account;
pub mod link;

pub use account::{Account, AccountProfile, AccountSummary};
pub use link::{ClickRecord, ShortLink, Visit};
