pub mod daily_log;
pub mod export;
pub mod identity;
pub mod slots;
