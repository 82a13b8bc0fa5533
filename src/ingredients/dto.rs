use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub aisle: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIngredientRequest {
    pub name: Option<String>,
    pub aisle: Option<String>,
}
