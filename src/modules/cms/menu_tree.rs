//! Flat menu items to nested tree, and validation of submitted item lists.

use std::collections::{HashMap, HashSet};

use abroadly_models::MenuItemId;

use crate::modules::cms::model::{MenuItem, MenuItemInput, MenuNode};

/// Every `parent_id` must name another item of the same list, ids must be
/// unique, and following parents must never loop.
pub fn validate_items(items: &[MenuItemInput]) -> Result<(), String> {
    let mut parents: HashMap<MenuItemId, Option<MenuItemId>> = HashMap::with_capacity(items.len());
    for item in items {
        if parents.insert(item.id, item.parent_id).is_some() {
            return Err(format!("Duplicate menu item id {}", item.id));
        }
    }

    for item in items {
        if let Some(parent) = item.parent_id
            && !parents.contains_key(&parent)
        {
            return Err(format!(
                "Parent {parent} of menu item '{}' is not in the submitted list",
                item.label
            ));
        }
    }

    for item in items {
        let mut seen = HashSet::new();
        let mut current = Some(item.id);
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(format!("Menu item '{}' is part of a cycle", item.label));
            }
            current = parents.get(&id).copied().flatten();
        }
    }

    Ok(())
}

/// Nests items under their parents, siblings ordered by position then label.
/// Items whose parent is missing are treated as roots.
pub fn build_tree(items: Vec<MenuItem>) -> Vec<MenuNode> {
    let ids: HashSet<MenuItemId> = items.iter().map(|i| i.id).collect();
    let mut children: HashMap<Option<MenuItemId>, Vec<MenuItem>> = HashMap::new();
    for item in items {
        let parent = item.parent_id.filter(|p| ids.contains(p) && *p != item.id);
        children.entry(parent).or_default().push(item);
    }

    fn attach(
        parent: Option<MenuItemId>,
        children: &mut HashMap<Option<MenuItemId>, Vec<MenuItem>>,
        depth: usize,
    ) -> Vec<MenuNode> {
        let Some(mut level) = children.remove(&parent) else {
            return Vec::new();
        };
        level.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.label.cmp(&b.label)));
        level
            .into_iter()
            .map(|item| MenuNode {
                children: if depth > 0 {
                    attach(Some(item.id), children, depth - 1)
                } else {
                    Vec::new()
                },
                id: item.id,
                label: item.label,
                url: item.url,
                position: item.position,
            })
            .collect()
    }

    let depth = ids.len();
    attach(None, &mut children, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abroadly_models::MenuId;

    fn id(n: u128) -> MenuItemId {
        MenuItemId::from_u128(n)
    }

    fn input(n: u128, parent: Option<u128>) -> MenuItemInput {
        MenuItemInput {
            id: id(n),
            parent_id: parent.map(id),
            label: format!("item {n}"),
            url: format!("/{n}"),
            position: 0,
        }
    }

    fn item(n: u128, parent: Option<u128>, position: i32) -> MenuItem {
        MenuItem {
            id: id(n),
            menu_id: MenuId::from_u128(1),
            parent_id: parent.map(id),
            label: format!("item {n}"),
            url: format!("/{n}"),
            position,
        }
    }

    #[test]
    fn test_valid_nested_list() {
        let items = [input(1, None), input(2, Some(1)), input(3, Some(2))];
        assert!(validate_items(&items).is_ok());
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let err = validate_items(&[input(1, None), input(2, Some(9))]).unwrap_err();
        assert!(err.contains("not in the submitted list"));
    }

    #[test]
    fn test_cycles_rejected() {
        assert!(validate_items(&[input(1, Some(1))]).is_err());
        assert!(validate_items(&[input(1, Some(2)), input(2, Some(1))]).is_err());
        assert!(validate_items(&[input(1, None), input(2, Some(3)), input(3, Some(2))]).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        assert!(validate_items(&[input(1, None), input(1, None)]).is_err());
    }

    #[test]
    fn test_build_tree_orders_by_position() {
        let tree = build_tree(vec![
            item(1, None, 2),
            item(2, None, 1),
            item(3, Some(1), 5),
            item(4, Some(1), 0),
            item(5, Some(4), 0),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, id(2));
        assert_eq!(tree[1].id, id(1));
        let kids: Vec<_> = tree[1].children.iter().map(|c| c.id).collect();
        assert_eq!(kids, vec![id(4), id(3)]);
        assert_eq!(tree[1].children[0].children[0].id, id(5));
    }

    #[test]
    fn test_orphans_become_roots() {
        let tree = build_tree(vec![item(1, Some(42), 0)]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_empty_menu() {
        assert!(build_tree(Vec::new()).is_empty());
    }
}
