use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;

/// Materialized line of a shopping list.
///
/// `ingredient_name` and `aisle` are snapshots of the catalog taken when the
/// list was last materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub aisle: Option<String>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub items: Vec<ListItem>,
    pub dish_ids: Vec<String>,
    pub owner_id: String,
    /// Bumped by the store on every write.
    #[serde(default)]
    pub revision: i64,
}

impl ShoppingList {
    pub fn has_dish(&self, dish_id: &str) -> bool {
        self.dish_ids.iter().any(|d| d == dish_id)
    }

    pub fn has_ingredient(&self, ingredient_id: &str) -> bool {
        self.items.iter().any(|i| i.ingredient_id == ingredient_id)
    }
}

#[derive(Debug, FromRow)]
pub struct ShoppingListRow {
    pub id: String,
    pub name: String,
    pub date: OffsetDateTime,
    pub items: Json<Vec<ListItem>>,
    pub dish_ids: Json<Vec<String>>,
    pub owner_id: String,
    pub revision: i64,
}

impl From<ShoppingListRow> for ShoppingList {
    fn from(r: ShoppingListRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            date: r.date,
            items: r.items.0,
            dish_ids: r.dish_ids.0,
            owner_id: r.owner_id,
            revision: r.revision,
        }
    }
}
