pub mod card_cache;
pub mod identity_filter;
