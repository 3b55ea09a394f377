use serde::Serialize;

/// Links a user to the badge number they log in with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct EmployeeProfile {
    pub id: u64,
    pub user_id: u64,
    pub id_card_number: String,
}
