use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::claims::Role;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,                 // opaque user ID, also used as list owner id
    pub email: String,              // normalized (trimmed, lowercase)
    pub pseudo: String,             // display name
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    pub is_superuser: bool,
    pub created_at: OffsetDateTime, // creation timestamp
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_flag(self.is_superuser)
    }
}
