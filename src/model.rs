pub mod daily_log;
pub mod employee_profile;
pub mod role;
pub mod user;
