/// Whole-board consistency checks.
///
/// Run on every board entering the system (store load, command result) so a
/// board that breaks referential integrity is rejected instead of persisted.
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::types::Board;

/// A single broken invariant, with the offending id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// `container_order` names a container missing from `containers`.
    OrderedContainerMissing(String),
    /// `containers` holds an id that is not in `container_order`.
    UnorderedContainer(String),
    /// `container_order` lists the same container twice.
    DuplicateContainerInOrder(String),
    /// A container in `container_order` has no item sequence.
    MissingSequence(String),
    /// The mapping has a sequence for a container not in `container_order`.
    StraySequence(String),
    /// A sequence references an item missing from `items`.
    UnknownItem { container_id: String, item_id: String },
    /// An item id appears more than once across all sequences.
    DuplicateItem(String),
    /// An item in `items` is referenced by no sequence.
    OrphanItem(String),
    /// A record's `id` field disagrees with its key.
    MismatchedId(String),
    /// An id uses the counter namespace at or above `next_id`.
    IdAheadOfCounter(String),
    /// The id counter is at (or would have to be seeded past) `u64::MAX`.
    CounterExhausted(u64),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OrderedContainerMissing(id) => {
                write!(f, "container {} is ordered but has no record", id)
            }
            Violation::UnorderedContainer(id) => {
                write!(f, "container {} has a record but is not ordered", id)
            }
            Violation::DuplicateContainerInOrder(id) => {
                write!(f, "container {} appears twice in the order", id)
            }
            Violation::MissingSequence(id) => write!(f, "container {} has no item sequence", id),
            Violation::StraySequence(id) => {
                write!(f, "item sequence for unknown container {}", id)
            }
            Violation::UnknownItem {
                container_id,
                item_id,
            } => write!(
                f,
                "container {} references unknown item {}",
                container_id, item_id
            ),
            Violation::DuplicateItem(id) => write!(f, "item {} is referenced more than once", id),
            Violation::OrphanItem(id) => write!(f, "item {} belongs to no container", id),
            Violation::MismatchedId(id) => write!(f, "record keyed {} carries a different id", id),
            Violation::IdAheadOfCounter(id) => {
                write!(f, "id {} is not below the board's id counter", id)
            }
            Violation::CounterExhausted(n) => write!(f, "id counter cannot advance past {}", n),
        }
    }
}

impl std::error::Error for Violation {}

/// Parse the numeric suffix of a counter-generated id (`item-12` -> 12).
/// Plain numeric ids (`"7"`) are accepted too.
pub fn numeric_suffix(id: &str) -> Option<u64> {
    let digits = id.rsplit(|c: char| !c.is_ascii_digit()).next()?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Check every board invariant, returning the first violation found.
pub fn check(board: &Board) -> Result<(), Violation> {
    let mut seen_containers = HashSet::new();
    for id in board.container_order.iter() {
        if !seen_containers.insert(id) {
            return Err(Violation::DuplicateContainerInOrder(id.to_string()));
        }
        if !board.containers.contains(id) {
            return Err(Violation::OrderedContainerMissing(id.to_string()));
        }
        if !board.container_item_mapping.contains(id) {
            return Err(Violation::MissingSequence(id.to_string()));
        }
    }

    for id in board.containers.ids() {
        if !seen_containers.contains(id) {
            return Err(Violation::UnorderedContainer(id.to_string()));
        }
    }
    for (key, container) in board.containers.iter() {
        if key != container.id {
            return Err(Violation::MismatchedId(key.to_string()));
        }
    }

    let mut owner: HashMap<&str, &str> = HashMap::new();
    for (container_id, item_ids) in board.container_item_mapping.iter() {
        if !seen_containers.contains(container_id) {
            return Err(Violation::StraySequence(container_id.to_string()));
        }
        for item_id in item_ids {
            if !board.items.contains(item_id) {
                return Err(Violation::UnknownItem {
                    container_id: container_id.to_string(),
                    item_id: item_id.clone(),
                });
            }
            if owner.insert(item_id.as_str(), container_id).is_some() {
                return Err(Violation::DuplicateItem(item_id.clone()));
            }
        }
    }

    for (key, item) in board.items.iter() {
        if key != item.id {
            return Err(Violation::MismatchedId(key.to_string()));
        }
        if !owner.contains_key(item.id.as_str()) {
            return Err(Violation::OrphanItem(item.id.clone()));
        }
    }

    if board.next_id == u64::MAX {
        return Err(Violation::CounterExhausted(board.next_id));
    }
    if board.next_id == 0 {
        // seeding takes the largest numeric suffix plus one
        let ids = board.items.ids().chain(board.containers.ids());
        if let Some(n) = ids.filter_map(numeric_suffix).find(|n| *n == u64::MAX) {
            return Err(Violation::CounterExhausted(n));
        }
    } else {
        let ids = board.items.ids().chain(board.containers.ids());
        for id in ids {
            if is_counter_id(id) && numeric_suffix(id).is_some_and(|n| n >= board.next_id) {
                return Err(Violation::IdAheadOfCounter(id.to_string()));
            }
        }
    }

    Ok(())
}

/// Ids minted by the board counter use an `item-` or `container-` prefix.
pub fn is_counter_id(id: &str) -> bool {
    id.starts_with("item-") || id.starts_with("container-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::sample_board;

    #[test]
    fn test_sample_board_is_valid() {
        let board = sample_board(&[("A", &["A1", "A2"]), ("B", &["B1"])]);
        assert_eq!(check(&board), Ok(()));
    }

    #[test]
    fn test_detects_orphan_item() {
        let mut board = sample_board(&[("A", &["A1", "A2"])]);
        board.container_item_mapping.get_mut("A").unwrap().pop();
        assert_eq!(check(&board), Err(Violation::OrphanItem("A2".to_string())));
    }

    #[test]
    fn test_detects_duplicate_item() {
        let mut board = sample_board(&[("A", &["A1"]), ("B", &["B1"])]);
        board
            .container_item_mapping
            .get_mut("B")
            .unwrap()
            .push("A1".to_string());
        assert_eq!(check(&board), Err(Violation::DuplicateItem("A1".to_string())));
    }

    #[test]
    fn test_detects_unknown_item() {
        let mut board = sample_board(&[("A", &["A1"])]);
        board
            .container_item_mapping
            .get_mut("A")
            .unwrap()
            .push("ghost".to_string());
        assert!(matches!(check(&board), Err(Violation::UnknownItem { .. })));
    }

    #[test]
    fn test_detects_missing_container_record() {
        let mut board = sample_board(&[("A", &[]), ("B", &[])]);
        board.containers.remove("B");
        assert_eq!(
            check(&board),
            Err(Violation::OrderedContainerMissing("B".to_string()))
        );
    }

    #[test]
    fn test_detects_stray_sequence() {
        let mut board = sample_board(&[("A", &[])]);
        board
            .container_item_mapping
            .insert("Z".to_string(), Vec::new());
        assert_eq!(check(&board), Err(Violation::StraySequence("Z".to_string())));
    }

    #[test]
    fn test_detects_id_ahead_of_counter() {
        let mut board = sample_board(&[("A", &["item-9"])]);
        board.next_id = 5;
        assert_eq!(
            check(&board),
            Err(Violation::IdAheadOfCounter("item-9".to_string()))
        );
    }

    #[test]
    fn test_numeric_suffix() {
        assert_eq!(numeric_suffix("item-12"), Some(12));
        assert_eq!(numeric_suffix("7"), Some(7));
        assert_eq!(numeric_suffix("A"), None);
        assert_eq!(numeric_suffix("item-"), None);
    }
}
