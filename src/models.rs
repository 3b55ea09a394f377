use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Login form. `login_type` selects the admin bootstrap path or the card path.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "login_type", rename_all = "lowercase")]
pub enum LoginReqDto {
    Admin {
        #[schema(example = "admin")]
        admin_id: String,
        password: String,
    },
    Employee {
        #[schema(example = "C-1001")]
        id_card: String,
        password: String,
    },
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "admin")]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
