use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

/// One ingredient reference inside a dish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishIngredient {
    pub ingredient_id: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<DishIngredient>,
}

impl Dish {
    pub fn references(&self, ingredient_id: &str) -> bool {
        self.ingredients.iter().any(|i| i.ingredient_id == ingredient_id)
    }
}

#[derive(Debug, FromRow)]
pub struct DishRow {
    pub id: String,
    pub name: String,
    pub ingredients: Json<Vec<DishIngredient>>,
}

impl From<DishRow> for Dish {
    fn from(r: DishRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            ingredients: r.ingredients.0,
        }
    }
}
