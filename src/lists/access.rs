//! Ownership rules for shopping lists.

use tracing::warn;

use super::repo_types::ShoppingList;
use crate::auth::claims::Caller;
use crate::error::AppError;

/// Superusers reach every list; everyone else only the lists they own.
pub fn can_access(caller: &Caller, list: &ShoppingList) -> bool {
    caller.is_superuser() || caller.user_id == list.owner_id
}

pub fn ensure_access(caller: Option<&Caller>, list: &ShoppingList) -> Result<(), AppError> {
    match caller {
        Some(c) if can_access(c, list) => Ok(()),
        Some(c) => {
            warn!(user_id = %c.user_id, list_id = %list.id, "list access denied");
            Err(AppError::Forbidden)
        }
        None => {
            warn!(list_id = %list.id, "anonymous list access denied");
            Err(AppError::Forbidden)
        }
    }
}

/// Owner id for a list about to be created.
pub fn owner_for_new_list(caller: Option<&Caller>) -> Result<String, AppError> {
    caller
        .map(|c| c.user_id.clone())
        .ok_or(AppError::Unauthenticated)
}

/// Which lists a listing request may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    All,
    OwnedBy(String),
}

/// Superusers list everything, users their own lists, anonymous callers nothing.
pub fn visible_lists(caller: Option<&Caller>) -> Result<ListScope, AppError> {
    let caller = caller.ok_or(AppError::Unauthenticated)?;
    if caller.is_superuser() {
        return Ok(ListScope::All);
    }
    Ok(ListScope::OwnedBy(caller.user_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Role;
    use time::OffsetDateTime;

    fn list(id: &str, owner: &str) -> ShoppingList {
        ShoppingList {
            id: id.into(),
            name: id.into(),
            date: OffsetDateTime::UNIX_EPOCH,
            items: vec![],
            dish_ids: vec![],
            owner_id: owner.into(),
            revision: 0,
        }
    }

    #[test]
    fn owner_and_superuser_pass_others_are_forbidden() {
        let l = list("l1", "alice");
        let alice = Caller::new("alice", Role::User);
        let bob = Caller::new("bob", Role::User);
        let admin = Caller::new("root", Role::Superuser);

        assert!(ensure_access(Some(&alice), &l).is_ok());
        assert!(ensure_access(Some(&admin), &l).is_ok());
        assert!(matches!(ensure_access(Some(&bob), &l), Err(AppError::Forbidden)));
        assert!(matches!(ensure_access(None, &l), Err(AppError::Forbidden)));
    }

    #[test]
    fn listing_scope_follows_role() {
        let alice = Caller::new("alice", Role::User);
        assert_eq!(
            visible_lists(Some(&alice)).unwrap(),
            ListScope::OwnedBy("alice".into())
        );

        let admin = Caller::new("root", Role::Superuser);
        assert_eq!(visible_lists(Some(&admin)).unwrap(), ListScope::All);

        assert!(matches!(visible_lists(None), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn creation_requires_an_identity() {
        let bob = Caller::new("bob", Role::User);
        assert_eq!(owner_for_new_list(Some(&bob)).unwrap(), "bob");
        assert!(matches!(owner_for_new_list(None), Err(AppError::Unauthenticated)));
    }
}
