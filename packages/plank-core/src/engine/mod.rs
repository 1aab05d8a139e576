//! Ordering engine: structural edits on a board's nested collections.
//!
//! Every operation validates its inputs before touching anything, so a
//! failed call leaves the board exactly as it was. Indices are clamped, ids
//! are checked against the board and the internal membership index.
pub mod completion;
pub mod membership;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::invariants::Violation;
use crate::types::*;
use membership::Membership;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Item {item_id} is not in container {container_id}")]
    NotInContainer {
        item_id: String,
        container_id: String,
    },

    #[error("Board invariant violated: {0}")]
    InvariantViolation(Violation),

    #[error("Container {0} does not track completion")]
    CompletionUnsupported(String),

    #[error(transparent)]
    InvalidColor(#[from] InvalidColor),
}

impl EngineError {
    /// Whether the error means a referenced id does not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::ContainerNotFound(_)
                | EngineError::ItemNotFound(_)
                | EngineError::NotInContainer { .. }
        )
    }
}

/// What a completion toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Toggle {
    Completed,
    Reopened,
    Removed,
}

/// A board edit as data, for dispatching from views and replaying in tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    MoveItem {
        item_id: String,
        from_container_id: String,
        to_container_id: String,
        to_index: usize,
    },
    MoveContainer {
        container_id: String,
        to_index: usize,
    },
    AddContainer {
        container: ContainerDraft,
    },
    RemoveContainer {
        container_id: String,
    },
    AddItem {
        container_id: String,
        item: ItemDraft,
    },
    /// Without `container_id` the owner is looked up from the membership index.
    RemoveItem {
        item_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        container_id: Option<String>,
    },
    ToggleCompletion {
        item_id: String,
        container_id: String,
    },
    UpdateItem {
        item_id: String,
        patch: ItemPatch,
    },
    UpdateContainer {
        container_id: String,
        patch: ContainerPatch,
    },
    RenameBoard {
        title: String,
    },
    SetTags {
        tags: Vec<BoardTag>,
    },
}

/// Result of applying a command, beyond the new board itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outcome {
    Moved { index: usize },
    Created { id: String },
    Removed { item_count: usize },
    Toggled { toggle: Toggle },
    Updated,
}

/// Owns a board while edits are applied to it.
#[derive(Debug, Clone)]
pub struct OrderingEngine {
    board: Board,
    membership: Membership,
}

impl OrderingEngine {
    /// Take ownership of a board. Rejects boards that already break an invariant.
    pub fn new(mut board: Board) -> Result<Self, EngineError> {
        board
            .check_invariants()
            .map_err(EngineError::InvariantViolation)?;
        board.seed_id_counter();
        let membership = Membership::build(&board);
        Ok(Self { board, membership })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    /// The container currently holding `item_id`.
    pub fn container_of(&self, item_id: &str) -> Option<&str> {
        self.membership.container_of(item_id)
    }

    /// Position of `item_id` inside its container's sequence.
    pub fn index_of(&self, item_id: &str) -> Option<usize> {
        let container_id = self.membership.container_of(item_id)?;
        self.board
            .container_items(container_id)?
            .iter()
            .position(|id| id == item_id)
    }

    fn require_container(&self, container_id: &str) -> Result<&Container, EngineError> {
        self.board
            .containers
            .get(container_id)
            .ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))
    }

    fn require_member(&self, item_id: &str, container_id: &str) -> Result<(), EngineError> {
        self.require_container(container_id)?;
        match self.membership.container_of(item_id) {
            None => Err(EngineError::ItemNotFound(item_id.to_string())),
            Some(owner) if owner != container_id => Err(EngineError::NotInContainer {
                item_id: item_id.to_string(),
                container_id: container_id.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn sequence_mut(&mut self, container_id: &str) -> Result<&mut Vec<String>, EngineError> {
        self.board
            .container_item_mapping
            .get_mut(container_id)
            .ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))
    }

    /// Move an item within or between containers. `to_index` is clamped to the
    /// destination length after the item has been taken out of its source.
    /// Returns the index the item ended up at.
    pub fn move_item(
        &mut self,
        item_id: &str,
        from_container_id: &str,
        to_container_id: &str,
        to_index: usize,
    ) -> Result<usize, EngineError> {
        self.require_member(item_id, from_container_id)?;
        self.require_container(to_container_id)?;

        let source = self.sequence_mut(from_container_id)?;
        let from_index = source
            .iter()
            .position(|id| id == item_id)
            .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))?;
        let moved = source.remove(from_index);

        let dest = self.sequence_mut(to_container_id)?;
        let index = to_index.min(dest.len());
        dest.insert(index, moved);

        if from_container_id != to_container_id {
            // a recorded slot only means something in the container it came from
            if let Some(item) = self.board.items.get_mut(item_id) {
                item.return_slot = None;
            }
        }
        self.membership.assign(item_id, to_container_id);
        self.board.touch();
        log::debug!(
            "[plank.engine] Moved item {} from {}[{}] to {}[{}]",
            item_id,
            from_container_id,
            from_index,
            to_container_id,
            index
        );
        Ok(index)
    }

    /// Reorder a container. Only `container_order` changes.
    pub fn move_container(&mut self, container_id: &str, to_index: usize) -> Result<usize, EngineError> {
        let index = self
            .board
            .container_order
            .move_to(container_id, to_index)
            .ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))?;
        self.board.touch();
        log::debug!("[plank.engine] Moved container {} to {}", container_id, index);
        Ok(index)
    }

    /// Append a new, empty container. Returns its id.
    pub fn add_container(&mut self, draft: ContainerDraft) -> String {
        let id = self.board.allocate_id("container");
        self.board.containers.insert(Container {
            id: id.clone(),
            title: draft.title,
            kind: draft.kind,
            completed_item_order: draft.completed_item_order,
            badge_color: draft.badge_color,
        });
        self.board.container_order.push(id.clone());
        self.board
            .container_item_mapping
            .insert(id.clone(), Vec::new());
        self.board.touch();
        log::debug!("[plank.engine] Added container {}", id);
        id
    }

    /// Remove a container together with every item it holds.
    /// Returns the removed items in their former order.
    pub fn remove_container(&mut self, container_id: &str) -> Result<Vec<Item>, EngineError> {
        self.require_container(container_id)?;

        let item_ids = self
            .board
            .container_item_mapping
            .remove(container_id)
            .unwrap_or_default();
        self.board.container_order.remove(container_id);
        self.board.containers.remove(container_id);

        let mut removed = Vec::with_capacity(item_ids.len());
        for item_id in &item_ids {
            self.membership.forget(item_id);
            if let Some(item) = self.board.items.remove(item_id) {
                removed.push(item);
            }
        }
        self.board.touch();
        log::debug!(
            "[plank.engine] Removed container {} with {} items",
            container_id,
            removed.len()
        );
        Ok(removed)
    }

    /// Append a new item to a container. Returns its id.
    pub fn add_item(&mut self, container_id: &str, draft: ItemDraft) -> Result<String, EngineError> {
        self.require_container(container_id)?;

        let id = self.board.allocate_id("item");
        let now = Utc::now();
        self.board.items.insert(Item {
            id: id.clone(),
            content: draft.content,
            badge_color: draft.badge_color,
            completed: draft.completed,
            return_slot: None,
            created_at: now,
            updated_at: now,
        });
        self.sequence_mut(container_id)?.push(id.clone());
        self.membership.assign(&id, container_id);

        let policy = self.require_container(container_id)?.completed_item_order;
        if draft.completed && matches!(policy, CompletedItemOrder::Start | CompletedItemOrder::End) {
            let items = &self.board.items;
            if let Some(seq) = self.board.container_item_mapping.get_mut(container_id) {
                completion::regroup(seq, items, policy);
            }
        }

        self.board.touch();
        log::debug!("[plank.engine] Added item {} to {}", id, container_id);
        Ok(id)
    }

    /// Remove an item from the named container. The container must be the
    /// item's actual owner.
    pub fn remove_item(&mut self, item_id: &str, container_id: &str) -> Result<Item, EngineError> {
        self.require_member(item_id, container_id)?;

        self.sequence_mut(container_id)?.retain(|id| id != item_id);
        self.membership.forget(item_id);
        let item = self
            .board
            .items
            .remove(item_id)
            .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))?;
        self.board.touch();
        log::debug!("[plank.engine] Removed item {} from {}", item_id, container_id);
        Ok(item)
    }

    /// Remove an item wherever it lives.
    pub fn remove_item_anywhere(&mut self, item_id: &str) -> Result<Item, EngineError> {
        let container_id = self
            .membership
            .container_of(item_id)
            .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))?
            .to_string();
        self.remove_item(item_id, &container_id)
    }

    /// Flip an item's completed flag, repositioning it by the container's policy.
    pub fn toggle_completion(&mut self, item_id: &str, container_id: &str) -> Result<Toggle, EngineError> {
        self.require_member(item_id, container_id)?;
        let container = self.require_container(container_id)?;
        if !container.supports_completion() {
            return Err(EngineError::CompletionUnsupported(container_id.to_string()));
        }
        let policy = container.completed_item_order;

        if policy == CompletedItemOrder::Remove {
            self.remove_item(item_id, container_id)?;
            return Ok(Toggle::Removed);
        }

        let (was_completed, return_slot) = self
            .board
            .items
            .get(item_id)
            .map(|item| (item.completed, item.return_slot))
            .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))?;

        let mut new_slot = None;
        if matches!(policy, CompletedItemOrder::Start | CompletedItemOrder::End) {
            let items = &self.board.items;
            let seq = self
                .board
                .container_item_mapping
                .get_mut(container_id)
                .ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))?;
            completion::regroup(seq, items, policy);
            if was_completed {
                completion::reopen(seq, items, item_id, return_slot, policy);
            } else {
                new_slot = completion::complete(seq, items, item_id, policy);
            }
        }

        if let Some(item) = self.board.items.get_mut(item_id) {
            item.completed = !was_completed;
            item.return_slot = new_slot;
            item.updated_at = Utc::now();
        }
        self.board.touch();

        let toggle = if was_completed {
            Toggle::Reopened
        } else {
            Toggle::Completed
        };
        log::debug!(
            "[plank.engine] Toggled item {} in {} ({:?}, {:?})",
            item_id,
            container_id,
            policy,
            toggle
        );
        Ok(toggle)
    }

    pub fn update_item(&mut self, item_id: &str, patch: ItemPatch) -> Result<(), EngineError> {
        let item = self
            .board
            .items
            .get_mut(item_id)
            .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))?;
        if let Some(content) = patch.content {
            item.content = content;
        }
        if let Some(color) = patch.badge_color {
            item.badge_color = color;
        }
        item.updated_at = Utc::now();
        self.board.touch();
        Ok(())
    }

    /// Change container metadata. Switching to a `Start`/`End` policy regroups
    /// the container so its completed items form the expected run.
    pub fn update_container(&mut self, container_id: &str, patch: ContainerPatch) -> Result<(), EngineError> {
        let container = self
            .board
            .containers
            .get_mut(container_id)
            .ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))?;
        if let Some(title) = patch.title {
            container.title = title;
        }
        if let Some(kind) = patch.kind {
            container.kind = kind;
        }
        if let Some(color) = patch.badge_color {
            container.badge_color = color;
        }
        let policy_changed = match patch.completed_item_order {
            Some(order) if order != container.completed_item_order => {
                container.completed_item_order = order;
                true
            }
            _ => false,
        };
        let policy = container.completed_item_order;

        if policy_changed {
            let items = &self.board.items;
            if let Some(seq) = self.board.container_item_mapping.get_mut(container_id) {
                completion::regroup(seq, items, policy);
            }
            log::debug!(
                "[plank.engine] Container {} now orders completed items {:?}",
                container_id,
                policy
            );
        }
        self.board.touch();
        Ok(())
    }

    pub fn rename_board(&mut self, title: impl Into<String>) {
        self.board.title = title.into();
        self.board.touch();
    }

    pub fn set_tags(&mut self, tags: Vec<BoardTag>) {
        self.board.tags = tags;
        self.board.touch();
    }

    /// Dispatch a command to the matching operation.
    pub fn apply(&mut self, command: Command) -> Result<Outcome, EngineError> {
        match command {
            Command::MoveItem {
                item_id,
                from_container_id,
                to_container_id,
                to_index,
            } => self
                .move_item(&item_id, &from_container_id, &to_container_id, to_index)
                .map(|index| Outcome::Moved { index }),
            Command::MoveContainer {
                container_id,
                to_index,
            } => self
                .move_container(&container_id, to_index)
                .map(|index| Outcome::Moved { index }),
            Command::AddContainer { container } => Ok(Outcome::Created {
                id: self.add_container(container),
            }),
            Command::RemoveContainer { container_id } => self
                .remove_container(&container_id)
                .map(|items| Outcome::Removed {
                    item_count: items.len(),
                }),
            Command::AddItem { container_id, item } => self
                .add_item(&container_id, item)
                .map(|id| Outcome::Created { id }),
            Command::RemoveItem {
                item_id,
                container_id: Some(container_id),
            } => self
                .remove_item(&item_id, &container_id)
                .map(|_| Outcome::Removed { item_count: 1 }),
            Command::RemoveItem {
                item_id,
                container_id: None,
            } => self
                .remove_item_anywhere(&item_id)
                .map(|_| Outcome::Removed { item_count: 1 }),
            Command::ToggleCompletion {
                item_id,
                container_id,
            } => self
                .toggle_completion(&item_id, &container_id)
                .map(|toggle| Outcome::Toggled { toggle }),
            Command::UpdateItem { item_id, patch } => {
                self.update_item(&item_id, patch).map(|_| Outcome::Updated)
            }
            Command::UpdateContainer {
                container_id,
                patch,
            } => self
                .update_container(&container_id, patch)
                .map(|_| Outcome::Updated),
            Command::RenameBoard { title } => {
                self.rename_board(title);
                Ok(Outcome::Updated)
            }
            Command::SetTags { tags } => {
                self.set_tags(tags);
                Ok(Outcome::Updated)
            }
        }
    }
}

/// Pure transition: apply `command` to a copy of `board`.
/// The input is never modified; the result is checked against every invariant.
pub fn apply(board: &Board, command: Command) -> Result<(Board, Outcome), EngineError> {
    let mut engine = OrderingEngine::new(board.clone())?;
    let outcome = engine.apply(command)?;
    let next = engine.into_board();
    next.check_invariants()
        .map_err(EngineError::InvariantViolation)?;
    Ok((next, outcome))
}
