pub mod admin;
pub mod daily_log;
pub mod export;
