use serde::Deserialize;

use super::repo_types::DishIngredient;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDishRequest {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<DishIngredient>,
}

/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDishRequest {
    pub name: Option<String>,
    pub ingredients: Option<Vec<DishIngredient>>,
}
