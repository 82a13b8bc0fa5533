use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog ingredient. Dishes and lists reference it by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub aisle: Option<String>,
}
