//! Computes the concrete `items` of a shopping list from its dish references,
//! manual entries and previous state.
//!
//! The merge rules live in [`merge_dish`] and [`merge_manual`], which are pure
//! and carry no storage dependency. [`materialize`] only resolves ids and feeds
//! contributions through them in a deterministic order: dishes in input order,
//! ingredient references in dish order, then manual entries.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::dto::ListItemInput;
use super::repo_types::ListItem;
use crate::dishes::repo_types::DishIngredient;
use crate::ingredients::repo_types::Ingredient;
use crate::store::{normalize_id, DishRepo, IngredientRepo};

/// Running total for one ingredient.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub ingredient_id: String,
    pub name: String,
    pub aisle: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl Aggregate {
    /// Quantity and unit were cleared by incompatible contributions.
    pub fn is_ambiguous(&self) -> bool {
        self.quantity.is_none() && self.unit.is_none()
    }
}

/// Quantity/unit pair brought by one dish reference or manual entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution<'a> {
    pub quantity: Option<f64>,
    pub unit: Option<&'a str>,
}

/// Trimmed unit, blank meaning none.
pub fn clean_unit(unit: Option<&str>) -> Option<String> {
    unit.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

fn same_unit(current: Option<&str>, incoming: Option<&str>) -> bool {
    match (clean_unit(current), clean_unit(incoming)) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => false,
    }
}

/// A sum that overflows `f64` cannot be represented in JSON, so it turns the
/// aggregate ambiguous instead.
fn sum_into(agg: &mut Aggregate, c: Contribution<'_>) {
    let total = agg.quantity.unwrap_or(0.0) + c.quantity.unwrap_or(0.0);
    if total.is_finite() {
        agg.quantity = Some(total);
        agg.unit = clean_unit(agg.unit.as_deref());
    } else {
        agg.quantity = None;
        agg.unit = None;
    }
}

/// Folds a later dish reference into an existing aggregate.
///
/// Matching units sum; anything else leaves the aggregate ambiguous. Name and
/// aisle keep their first-occurrence values.
pub fn merge_dish(mut existing: Aggregate, c: Contribution<'_>) -> Aggregate {
    if same_unit(existing.unit.as_deref(), c.unit) {
        sum_into(&mut existing, c);
    } else {
        existing.quantity = None;
        existing.unit = None;
    }
    existing
}

/// Folds a manual entry into an existing aggregate.
///
/// Same quantity rule as [`merge_dish`], except an ambiguous aggregate stays
/// ambiguous. Name and aisle are always replaced by the entry's resolved values.
pub fn merge_manual(
    mut existing: Aggregate,
    name: String,
    aisle: Option<String>,
    c: Contribution<'_>,
) -> Aggregate {
    if same_unit(existing.unit.as_deref(), c.unit) {
        sum_into(&mut existing, c);
    } else if !existing.is_ambiguous() {
        existing.quantity = None;
        existing.unit = None;
    }
    existing.name = name;
    existing.aisle = aisle;
    existing
}

/// ingredientId -> aggregate, filled in contribution order.
#[derive(Debug, Default)]
pub struct Accumulator {
    entries: HashMap<String, Aggregate>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn add_dish_ref(&mut self, ingredient: &Ingredient, r: &DishIngredient) {
        let id = normalize_id(&r.ingredient_id);
        let c = Contribution {
            quantity: r.quantity,
            unit: r.unit.as_deref(),
        };
        let next = match self.entries.remove(&id) {
            Some(existing) => merge_dish(existing, c),
            None => Aggregate {
                ingredient_id: id.clone(),
                name: ingredient.name.clone(),
                aisle: ingredient.aisle.clone(),
                quantity: r.quantity,
                unit: clean_unit(r.unit.as_deref()),
            },
        };
        self.entries.insert(id, next);
    }

    /// `catalog` is the ingredient as currently stored, `None` when it no
    /// longer resolves; the entry's own name and aisle fill the gaps.
    pub fn add_manual(&mut self, catalog: Option<&Ingredient>, m: &ListItemInput) {
        let id = normalize_id(&m.ingredient_id);
        let name = catalog
            .map(|i| i.name.clone())
            .unwrap_or_else(|| m.ingredient_name.clone());
        let aisle = catalog
            .and_then(|i| i.aisle.clone())
            .or_else(|| m.aisle.clone());
        let c = Contribution {
            quantity: m.quantity,
            unit: m.unit.as_deref(),
        };
        let next = match self.entries.remove(&id) {
            Some(existing) => merge_manual(existing, name, aisle, c),
            None => Aggregate {
                ingredient_id: id.clone(),
                name,
                aisle,
                quantity: m.quantity,
                unit: clean_unit(m.unit.as_deref()),
            },
        };
        self.entries.insert(id, next);
    }

    /// Emits one item per ingredient, sorted for display.
    pub fn into_items(self, checked: &HashMap<String, bool>) -> Vec<ListItem> {
        let mut items: Vec<ListItem> = self
            .entries
            .into_values()
            .map(|a| ListItem {
                checked: checked.get(&a.ingredient_id).copied().unwrap_or(false),
                ingredient_id: a.ingredient_id,
                ingredient_name: a.name,
                quantity: a.quantity,
                unit: a.unit,
                aisle: a.aisle,
            })
            .collect();
        sort_items(&mut items);
        items
    }
}

/// Case-insensitive sort key where accented letters collate with their base
/// letter and ligatures expand, as French dictionaries order words.
pub fn collation_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for ch in name.nfd().filter(|c| !is_combining_mark(*c)) {
        match ch {
            'œ' | 'Œ' => key.push_str("oe"),
            'æ' | 'Æ' => key.push_str("ae"),
            'ß' => key.push_str("ss"),
            other => key.extend(other.to_lowercase()),
        }
    }
    key
}

pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
}

pub fn sort_items(items: &mut [ListItem]) {
    items.sort_by(|a, b| {
        compare_names(&a.ingredient_name, &b.ingredient_name)
            .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
    });
}

/// Inputs of one materialization run.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeInput<'a> {
    pub dish_ids: &'a [String],
    /// `None` when the caller sent no manual items.
    pub manual: Option<&'a [ListItemInput]>,
    /// The list's items before this edit; empty on create.
    pub prior: &'a [ListItem],
}

/// Checked flags carried over from `prior`, overridden by explicit manual values.
pub fn checked_map(prior: &[ListItem], manual: Option<&[ListItemInput]>) -> HashMap<String, bool> {
    let mut map: HashMap<String, bool> = prior
        .iter()
        .map(|i| (normalize_id(&i.ingredient_id), i.checked))
        .collect();
    for m in manual.unwrap_or_default() {
        if let Some(c) = m.checked {
            map.insert(normalize_id(&m.ingredient_id), c);
        }
    }
    map
}

/// Resolves dishes and ingredients and returns the list's new items.
///
/// Dangling dish or ingredient ids are skipped; only store failures error.
pub async fn materialize(
    ingredients: &dyn IngredientRepo,
    dishes: &dyn DishRepo,
    input: MaterializeInput<'_>,
) -> anyhow::Result<Vec<ListItem>> {
    let checked = checked_map(input.prior, input.manual);
    let mut catalog = CatalogMemo::new(ingredients);
    let mut acc = Accumulator::new();

    let mut seen = HashSet::new();
    for dish_id in input.dish_ids {
        let dish_id = normalize_id(dish_id);
        if !seen.insert(dish_id.clone()) {
            continue;
        }
        let Some(dish) = dishes.get_dish(&dish_id).await? else {
            debug!(%dish_id, "dish no longer exists; skipped");
            continue;
        };
        for r in &dish.ingredients {
            match catalog.resolve(&r.ingredient_id).await? {
                Some(ingredient) => acc.add_dish_ref(&ingredient, r),
                None => debug!(ingredient_id = %r.ingredient_id, %dish_id, "ingredient no longer exists; skipped"),
            }
        }
    }

    if let Some(manual) = input.manual {
        for m in manual {
            let ingredient = catalog.resolve(&m.ingredient_id).await?;
            acc.add_manual(ingredient.as_ref(), m);
        }
    }

    debug!(items = acc.len(), dishes = seen.len(), "list materialized");
    Ok(acc.into_items(&checked))
}

/// Per-run ingredient cache so repeated references hit the store once.
struct CatalogMemo<'a> {
    repo: &'a dyn IngredientRepo,
    cache: HashMap<String, Option<Ingredient>>,
}

impl<'a> CatalogMemo<'a> {
    fn new(repo: &'a dyn IngredientRepo) -> Self {
        Self {
            repo,
            cache: HashMap::new(),
        }
    }

    async fn resolve(&mut self, id: &str) -> anyhow::Result<Option<Ingredient>> {
        let id = normalize_id(id);
        if let Some(hit) = self.cache.get(&id) {
            return Ok(hit.clone());
        }
        let found = self.repo.get_ingredient(&id).await?;
        self.cache.insert(id, found.clone());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dishes::repo_types::Dish;
    use crate::store::memory::MemoryStore;

    fn agg(quantity: Option<f64>, unit: Option<&str>) -> Aggregate {
        Aggregate {
            ingredient_id: "flour".into(),
            name: "Farine".into(),
            aisle: Some("Épicerie".into()),
            quantity,
            unit: unit.map(str::to_string),
        }
    }

    fn c(quantity: Option<f64>, unit: Option<&str>) -> Contribution<'_> {
        Contribution { quantity, unit }
    }

    #[test]
    fn dish_merge_sums_matching_units() {
        let merged = merge_dish(agg(Some(200.0), Some("g")), c(Some(300.0), Some(" G ")));
        assert_eq!(merged.quantity, Some(500.0));
        assert_eq!(merged.unit.as_deref(), Some("g"));
        assert_eq!(merged.name, "Farine");
    }

    #[test]
    fn overflowing_sum_becomes_ambiguous() {
        let merged = merge_dish(agg(Some(1e308), Some("g")), c(Some(1e308), Some("g")));
        assert!(merged.is_ambiguous());

        let manual = merge_manual(
            agg(Some(f64::MAX), Some("kg")),
            "Farine".into(),
            None,
            c(Some(f64::MAX), Some("kg")),
        );
        assert!(manual.is_ambiguous());
        let json = serde_json::to_string(&manual.quantity).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn dish_merge_treats_missing_quantity_as_zero() {
        let merged = merge_dish(agg(None, Some("kg")), c(Some(1.5), Some("kg")));
        assert_eq!(merged.quantity, Some(1.5));
    }

    #[test]
    fn dish_merge_nulls_out_on_unit_mismatch_and_stays_null() {
        let merged = merge_dish(agg(Some(200.0), Some("g")), c(Some(1.0), Some("kg")));
        assert!(merged.is_ambiguous());
        assert_eq!(merged.aisle.as_deref(), Some("Épicerie"));

        let again = merge_dish(merged, c(Some(1.0), Some("kg")));
        assert!(again.is_ambiguous());
    }

    #[test]
    fn dish_merge_nulls_out_when_either_unit_is_missing() {
        assert!(merge_dish(agg(Some(2.0), None), c(Some(2.0), None)).is_ambiguous());
        assert!(merge_dish(agg(Some(2.0), Some("g")), c(Some(2.0), Some("  "))).is_ambiguous());
    }

    #[test]
    fn manual_merge_keeps_ambiguous_but_refreshes_identity() {
        let merged = merge_manual(
            agg(None, None),
            "Farine T55".into(),
            Some("Boulangerie".into()),
            c(Some(100.0), Some("g")),
        );
        assert!(merged.is_ambiguous());
        assert_eq!(merged.name, "Farine T55");
        assert_eq!(merged.aisle.as_deref(), Some("Boulangerie"));
    }

    #[test]
    fn manual_merge_sums_or_nulls_like_dishes() {
        let summed = merge_manual(agg(Some(1.0), Some("paquet")), "Farine".into(), None, c(Some(2.0), Some("Paquet")));
        assert_eq!(summed.quantity, Some(3.0));
        assert_eq!(summed.unit.as_deref(), Some("paquet"));
        assert_eq!(summed.aisle, None);

        let nulled = merge_manual(agg(Some(1.0), Some("g")), "Farine".into(), None, c(Some(2.0), Some("kg")));
        assert!(nulled.is_ambiguous());
    }

    #[test]
    fn collation_ignores_case_and_accents() {
        assert_eq!(collation_key("Échalote"), "echalote");
        assert_eq!(collation_key("Œuf"), "oeuf");

        let mut names = vec!["fraise", "Échalote", "banane", "Épinard", "citron", "éclair"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["banane", "citron", "Échalote", "éclair", "Épinard", "fraise"]);
    }

    fn ingredient(id: &str, name: &str, aisle: Option<&str>) -> Ingredient {
        Ingredient {
            id: id.into(),
            name: name.into(),
            aisle: aisle.map(str::to_string),
        }
    }

    fn dish_ref(id: &str, quantity: Option<f64>, unit: Option<&str>) -> DishIngredient {
        DishIngredient {
            ingredient_id: id.into(),
            quantity,
            unit: unit.map(str::to_string),
        }
    }

    fn manual(id: &str, name: &str, quantity: Option<f64>, unit: Option<&str>, checked: Option<bool>) -> ListItemInput {
        ListItemInput {
            ingredient_id: id.into(),
            ingredient_name: name.into(),
            quantity,
            unit: unit.map(str::to_string),
            aisle: None,
            checked,
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for i in [
            ingredient("flour", "Farine", Some("Épicerie")),
            ingredient("egg", "Œufs", Some("Frais")),
            ingredient("shallot", "échalote", None),
            ingredient("butter", "Beurre", Some("Frais")),
        ] {
            store.create_ingredient(&i).await.unwrap();
        }
        let crepes = Dish {
            id: "crepes".into(),
            name: "Crêpes".into(),
            ingredients: vec![
                dish_ref("flour", Some(200.0), Some("g")),
                dish_ref("egg", Some(3.0), None),
                dish_ref("butter", Some(50.0), Some("g")),
            ],
        };
        let cake = Dish {
            id: "cake".into(),
            name: "Gâteau".into(),
            ingredients: vec![
                dish_ref("flour", Some(300.0), Some("g")),
                dish_ref("butter", Some(1.0), Some("paquet")),
                dish_ref("ghost", Some(1.0), Some("g")),
            ],
        };
        store.create_dish(&crepes).await.unwrap();
        store.create_dish(&cake).await.unwrap();
        store
    }

    async fn run(
        store: &MemoryStore,
        dish_ids: &[&str],
        manual: Option<&[ListItemInput]>,
        prior: &[ListItem],
    ) -> Vec<ListItem> {
        let dish_ids: Vec<String> = dish_ids.iter().map(|s| s.to_string()).collect();
        materialize(
            store,
            store,
            MaterializeInput {
                dish_ids: &dish_ids,
                manual,
                prior,
            },
        )
        .await
        .expect("materialize")
    }

    fn find<'a>(items: &'a [ListItem], id: &str) -> &'a ListItem {
        items.iter().find(|i| i.ingredient_id == id).expect("item present")
    }

    #[tokio::test]
    async fn aggregates_dishes_and_sorts_by_name() {
        let store = seeded().await;
        let items = run(&store, &["crepes", "cake"], None, &[]).await;

        let names: Vec<_> = items.iter().map(|i| i.ingredient_name.as_str()).collect();
        assert_eq!(names, vec!["Beurre", "Farine", "Œufs"]);

        let flour = find(&items, "flour");
        assert_eq!(flour.quantity, Some(500.0));
        assert_eq!(flour.unit.as_deref(), Some("g"));
        assert_eq!(flour.aisle.as_deref(), Some("Épicerie"));

        let butter = find(&items, "butter");
        assert_eq!(butter.quantity, None);
        assert_eq!(butter.unit, None);
        assert!(items.iter().all(|i| !i.checked));
    }

    #[tokio::test]
    async fn dangling_dishes_and_ingredients_are_skipped() {
        let store = seeded().await;
        let items = run(&store, &["deleted-dish", "cake"], None, &[]).await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.ingredient_id != "ghost"));
    }

    #[tokio::test]
    async fn duplicate_dish_ids_resolve_once() {
        let store = seeded().await;
        let items = run(&store, &["crepes", "crepes"], None, &[]).await;
        assert_eq!(find(&items, "flour").quantity, Some(200.0));
    }

    #[tokio::test]
    async fn never_emits_two_items_for_one_ingredient() {
        let store = seeded().await;
        let extra = [
            manual("flour", "Farine", Some(100.0), Some("g"), None),
            manual("flour", "Farine", Some(1.0), Some("g"), None),
            manual("salt", "Sel", None, None, None),
        ];
        let items = run(&store, &["crepes", "cake", "crepes"], Some(&extra), &[]).await;
        let mut ids: Vec<_> = items.iter().map(|i| i.ingredient_id.clone()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(find(&items, "flour").quantity, Some(601.0));
    }

    #[tokio::test]
    async fn orphaned_manual_items_fall_back_to_their_own_snapshot() {
        let store = seeded().await;
        let extra = [ListItemInput {
            aisle: Some("Épices".into()),
            ..manual("saffron", "Safran", Some(1.0), Some(" paquet "), None)
        }];
        let items = run(&store, &[], Some(&extra), &[]).await;
        let saffron = find(&items, "saffron");
        assert_eq!(saffron.ingredient_name, "Safran");
        assert_eq!(saffron.aisle.as_deref(), Some("Épices"));
        assert_eq!(saffron.unit.as_deref(), Some("paquet"));
    }

    #[tokio::test]
    async fn manual_entries_use_catalog_identity_when_resolvable() {
        let store = seeded().await;
        let extra = [ListItemInput {
            aisle: Some("Rayon X".into()),
            ..manual("shallot", "old name", Some(2.0), None, None)
        }];
        let items = run(&store, &[], Some(&extra), &[]).await;
        let shallot = find(&items, "shallot");
        assert_eq!(shallot.ingredient_name, "échalote");
        // catalog has no aisle for it
        assert_eq!(shallot.aisle.as_deref(), Some("Rayon X"));
    }

    #[tokio::test]
    async fn checked_flags_survive_and_explicit_values_win() {
        let store = seeded().await;
        let first = run(&store, &["crepes"], None, &[]).await;
        let prior: Vec<ListItem> = first
            .into_iter()
            .map(|mut i| {
                i.checked = i.ingredient_id == "flour" || i.ingredient_id == "egg";
                i
            })
            .collect();

        let extra = [manual("egg", "Œufs", None, None, Some(false))];
        let items = run(&store, &["crepes", "cake"], Some(&extra), &prior).await;
        assert!(find(&items, "flour").checked);
        assert!(!find(&items, "egg").checked);
        assert!(!find(&items, "butter").checked);
    }

    #[tokio::test]
    async fn rerunning_on_its_own_output_is_stable() {
        let store = seeded().await;
        let extra = [manual("salt", "Sel", Some(1.0), Some("paquet"), Some(true))];
        let first = run(&store, &["cake", "crepes"], Some(&extra), &[]).await;
        let second = run(&store, &["cake", "crepes"], None, &first).await;
        let third = run(&store, &["cake", "crepes"], None, &second).await;
        assert_eq!(second, third);
        assert_eq!(
            serde_json::to_string(&second).unwrap(),
            serde_json::to_string(&third).unwrap()
        );
    }

    #[tokio::test]
    async fn ingredient_ids_are_normalized_before_merging() {
        let store = MemoryStore::new();
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        store.create_ingredient(&ingredient(id, "Sucre", None)).await.unwrap();
        let extra = [
            manual(id, "Sucre", Some(1.0), Some("kg"), None),
            manual(&id.to_uppercase(), "Sucre", Some(1.0), Some("kg"), None),
        ];
        let items = run(&store, &[], Some(&extra), &[]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Some(2.0));
    }
}
