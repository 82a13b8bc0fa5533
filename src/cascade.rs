//! Keeps dishes and lists consistent after catalog deletions.
//!
//! Cascades never fail the deletion that triggered them. Each affected record
//! is persisted on its own; a record that cannot be saved, or a collection that
//! cannot be read, is logged and reported while the rest is still processed.

use tracing::{debug, info, warn};

use crate::lists::materialize::{materialize, MaterializeInput};
use crate::lists::repo_types::ShoppingList;
use crate::store::{normalize_id, ListWrite, Repos};

/// Attempts per list when concurrent edits keep invalidating our read.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub updated: usize,
    pub failed: Vec<String>,
    /// Collections whose scan failed; none of their records were touched.
    pub unscanned: Vec<&'static str>,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.unscanned.is_empty()
    }

    fn record(&mut self, kind: &'static str, id: &str, outcome: anyhow::Result<bool>) {
        match outcome {
            Ok(true) => self.updated += 1,
            Ok(false) => debug!(kind, %id, "nothing left to update"),
            Err(e) => {
                warn!(kind, %id, error = ?e, "cascade update failed");
                self.failed.push(id.to_string());
            }
        }
    }

    fn scan_failed(&mut self, collection: &'static str, e: anyhow::Error) {
        warn!(collection, error = ?e, "cascade scan failed");
        self.unscanned.push(collection);
    }
}

/// Drops the ingredient from every dish and every list line that names it.
///
/// Lists are not re-materialized: only the offending line goes, other
/// quantities stay as they were.
pub async fn on_ingredient_deleted(repos: &Repos, ingredient_id: &str) -> CascadeReport {
    let ingredient_id = normalize_id(ingredient_id);
    let mut report = CascadeReport::default();

    match repos.dishes.list_dishes().await {
        Ok(dishes) => {
            for mut dish in dishes {
                if !dish.references(&ingredient_id) {
                    continue;
                }
                dish.ingredients
                    .retain(|i| normalize_id(&i.ingredient_id) != ingredient_id);
                let outcome = repos.dishes.replace_dish(&dish).await;
                report.record("dish", &dish.id, outcome);
            }
        }
        Err(e) => report.scan_failed("dishes", e),
    }

    match repos.lists.list_lists().await {
        Ok(lists) => {
            for list in lists {
                if !list.has_ingredient(&ingredient_id) {
                    continue;
                }
                let id = list.id.clone();
                let outcome = purge_line(repos, list, &ingredient_id).await;
                report.record("list", &id, outcome);
            }
        }
        Err(e) => report.scan_failed("lists", e),
    }

    info!(
        %ingredient_id,
        updated = report.updated,
        failed = report.failed.len(),
        unscanned = ?report.unscanned,
        "ingredient cascade done"
    );
    report
}

/// Removes the dish from every list referencing it and rebuilds those lists,
/// keeping their checked flags.
pub async fn on_dish_deleted(repos: &Repos, dish_id: &str) -> CascadeReport {
    let dish_id = normalize_id(dish_id);
    let mut report = CascadeReport::default();

    match repos.lists.list_lists().await {
        Ok(lists) => {
            for list in lists {
                if !list.has_dish(&dish_id) {
                    continue;
                }
                let id = list.id.clone();
                let outcome = drop_dish(repos, list, &dish_id).await;
                report.record("list", &id, outcome);
            }
        }
        Err(e) => report.scan_failed("lists", e),
    }

    info!(
        %dish_id,
        updated = report.updated,
        failed = report.failed.len(),
        unscanned = ?report.unscanned,
        "dish cascade done"
    );
    report
}

/// Re-reads the list after a stale write. `None` when it is gone.
async fn reload(repos: &Repos, list: &ShoppingList) -> anyhow::Result<Option<ShoppingList>> {
    debug!(list_id = %list.id, "list changed under cascade; retrying");
    repos.lists.get_list(&list.id).await
}

async fn purge_line(
    repos: &Repos,
    mut list: ShoppingList,
    ingredient_id: &str,
) -> anyhow::Result<bool> {
    for _ in 0..MAX_ATTEMPTS {
        if !list.has_ingredient(ingredient_id) {
            return Ok(false);
        }
        list.items.retain(|i| i.ingredient_id != ingredient_id);
        match repos.lists.replace_list(&list).await? {
            ListWrite::Replaced => return Ok(true),
            ListWrite::Missing => return Ok(false),
            ListWrite::Stale => match reload(repos, &list).await? {
                Some(fresh) => list = fresh,
                None => return Ok(false),
            },
        }
    }
    anyhow::bail!("list kept changing, gave up after {MAX_ATTEMPTS} attempts")
}

async fn drop_dish(repos: &Repos, mut list: ShoppingList, dish_id: &str) -> anyhow::Result<bool> {
    for _ in 0..MAX_ATTEMPTS {
        if !list.has_dish(dish_id) {
            return Ok(false);
        }
        list.dish_ids.retain(|d| d != dish_id);
        let items = materialize(
            repos.ingredients.as_ref(),
            repos.dishes.as_ref(),
            MaterializeInput {
                dish_ids: &list.dish_ids,
                manual: None,
                prior: &list.items,
            },
        )
        .await?;
        list.items = items;
        match repos.lists.replace_list(&list).await? {
            ListWrite::Replaced => return Ok(true),
            ListWrite::Missing => return Ok(false),
            ListWrite::Stale => match reload(repos, &list).await? {
                Some(fresh) => list = fresh,
                None => return Ok(false),
            },
        }
    }
    anyhow::bail!("list kept changing, gave up after {MAX_ATTEMPTS} attempts")
}
