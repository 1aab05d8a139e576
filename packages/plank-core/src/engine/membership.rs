/// Reverse index item id -> owning container id.
///
/// Rebuilt from the mapping whenever an engine is created and kept in step by
/// every engine operation, so callers never have to track membership.
use std::collections::HashMap;

use crate::types::Board;

#[derive(Debug, Clone, Default)]
pub struct Membership {
    owner: HashMap<String, String>,
}

impl Membership {
    pub fn build(board: &Board) -> Self {
        let mut owner = HashMap::with_capacity(board.items.len());
        for (container_id, item_ids) in board.container_item_mapping.iter() {
            for item_id in item_ids {
                owner.insert(item_id.clone(), container_id.to_string());
            }
        }
        Self { owner }
    }

    pub fn container_of(&self, item_id: &str) -> Option<&str> {
        self.owner.get(item_id).map(String::as_str)
    }

    pub fn assign(&mut self, item_id: &str, container_id: &str) {
        self.owner
            .insert(item_id.to_string(), container_id.to_string());
    }

    pub fn forget(&mut self, item_id: &str) {
        self.owner.remove(item_id);
    }

    pub fn len(&self) -> usize {
        self.owner.len()
    }
}
