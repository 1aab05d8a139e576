/// Drag staging: speculative moves while a gesture is in flight.
///
/// A `DragSession` keeps the last committed board and a staged engine. Hover
/// updates move the dragged thing around in the staged copy only; nothing is
/// persisted until the drop is confirmed, and then only as one net command.
use serde::{Deserialize, Serialize};

use crate::engine::{Command, EngineError, OrderingEngine};
use crate::types::Board;

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum DragSubject {
    Item(String),
    Container(String),
}

/// Where the pointer currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DropTarget {
    /// Over an item: land before it, or after it when `after` is set
    Item { id: String, after: bool },
    /// Over a container's body or header
    Container { id: String },
}

/// Translate a drop target into the move it implies for `subject`.
///
/// Items dropped on an item land next to it; dropped on a container they are
/// appended. Containers take the slot of the container under the pointer (or
/// of the container owning the item under the pointer).
pub fn resolve_drop_target(
    engine: &OrderingEngine,
    subject: &DragSubject,
    target: &DropTarget,
) -> Result<Command, EngineError> {
    match subject {
        DragSubject::Item(item_id) => {
            let from = engine
                .container_of(item_id)
                .ok_or_else(|| EngineError::ItemNotFound(item_id.clone()))?
                .to_string();
            let (to, to_index) = match target {
                DropTarget::Item { id, after } => {
                    let to = engine
                        .container_of(id)
                        .ok_or_else(|| EngineError::ItemNotFound(id.clone()))?
                        .to_string();
                    let mut index = engine
                        .index_of(id)
                        .ok_or_else(|| EngineError::ItemNotFound(id.clone()))?;
                    if *after {
                        index += 1;
                    }
                    // the dragged item leaves its slot before it is reinserted
                    if to == from {
                        if let Some(current) = engine.index_of(item_id) {
                            if current < index {
                                index -= 1;
                            }
                        }
                    }
                    (to, index)
                }
                DropTarget::Container { id } => {
                    let len = engine
                        .board()
                        .container_items(id)
                        .ok_or_else(|| EngineError::ContainerNotFound(id.clone()))?
                        .len();
                    (id.clone(), len)
                }
            };
            Ok(Command::MoveItem {
                item_id: item_id.clone(),
                from_container_id: from,
                to_container_id: to,
                to_index,
            })
        }
        DragSubject::Container(container_id) => {
            let over = match target {
                DropTarget::Container { id } => id.clone(),
                DropTarget::Item { id, .. } => engine
                    .container_of(id)
                    .ok_or_else(|| EngineError::ItemNotFound(id.clone()))?
                    .to_string(),
            };
            let to_index = engine
                .board()
                .container_order
                .position(&over)
                .ok_or_else(|| EngineError::ContainerNotFound(over.clone()))?;
            Ok(Command::MoveContainer {
                container_id: container_id.clone(),
                to_index,
            })
        }
    }
}

/// An in-flight drag gesture on one board.
#[derive(Debug, Clone)]
pub struct DragSession {
    committed: Board,
    staged: OrderingEngine,
    subject: DragSubject,
    target: Option<DropTarget>,
}

impl DragSession {
    /// Start dragging `subject` on the committed snapshot `board`.
    pub fn begin(board: Board, subject: DragSubject) -> Result<Self, EngineError> {
        let staged = OrderingEngine::new(board.clone())?;
        match &subject {
            DragSubject::Item(id) if staged.container_of(id).is_none() => {
                return Err(EngineError::ItemNotFound(id.clone()));
            }
            DragSubject::Container(id) if !staged.board().containers.contains(id) => {
                return Err(EngineError::ContainerNotFound(id.clone()));
            }
            _ => {}
        }
        log::debug!("[plank.drag] Begin drag of {:?} on {}", subject, board.slug);
        Ok(Self {
            committed: board,
            staged,
            subject,
            target: None,
        })
    }

    pub fn subject(&self) -> &DragSubject {
        &self.subject
    }

    pub fn slug(&self) -> &str {
        &self.committed.slug
    }

    /// The board as the user currently sees it, speculative moves included.
    pub fn staged(&self) -> &Board {
        self.staged.board()
    }

    pub fn committed(&self) -> &Board {
        &self.committed
    }

    pub fn target(&self) -> Option<&DropTarget> {
        self.target.as_ref()
    }

    /// Pointer moved over `target`: stage the implied move.
    /// Hovering over the dragged thing itself changes nothing.
    pub fn over(&mut self, target: DropTarget) -> Result<(), EngineError> {
        if self.targets_itself(&target) {
            return Ok(());
        }
        if self.target.as_ref() == Some(&target) {
            return Ok(());
        }
        let command = resolve_drop_target(&self.staged, &self.subject, &target)?;
        self.staged.apply(command)?;
        self.target = Some(target);
        Ok(())
    }

    /// Abort the gesture. Returns the committed snapshot, untouched.
    pub fn cancel(self) -> Board {
        log::debug!("[plank.drag] Cancelled drag of {:?}", self.subject);
        self.committed
    }

    /// Confirm the drop, optionally on a final target. Returns the single
    /// command that turns the committed snapshot into the staged one, or
    /// `None` when the subject ended where it started.
    pub fn finish(mut self, target: Option<DropTarget>) -> Result<Option<Command>, EngineError> {
        if let Some(target) = target {
            self.over(target)?;
        }
        let command = match &self.subject {
            DragSubject::Item(item_id) => {
                let from = self.committed_position_of_item(item_id)?;
                let to_container = self
                    .staged
                    .container_of(item_id)
                    .ok_or_else(|| EngineError::ItemNotFound(item_id.clone()))?
                    .to_string();
                let to_index = self
                    .staged
                    .index_of(item_id)
                    .ok_or_else(|| EngineError::ItemNotFound(item_id.clone()))?;
                if from == (to_container.clone(), to_index) {
                    None
                } else {
                    Some(Command::MoveItem {
                        item_id: item_id.clone(),
                        from_container_id: from.0,
                        to_container_id: to_container,
                        to_index,
                    })
                }
            }
            DragSubject::Container(container_id) => {
                let before = self.committed.container_order.position(container_id);
                let after = self.staged.board().container_order.position(container_id);
                match after {
                    None => return Err(EngineError::ContainerNotFound(container_id.clone())),
                    Some(to_index) if Some(to_index) == before => None,
                    Some(to_index) => Some(Command::MoveContainer {
                        container_id: container_id.clone(),
                        to_index,
                    }),
                }
            }
        };
        log::debug!("[plank.drag] Dropped {:?}: {:?}", self.subject, command);
        Ok(command)
    }

    fn committed_position_of_item(&self, item_id: &str) -> Result<(String, usize), EngineError> {
        self.committed
            .container_item_mapping
            .iter()
            .find_map(|(container_id, seq)| {
                seq.iter()
                    .position(|id| id == item_id)
                    .map(|index| (container_id.to_string(), index))
            })
            .ok_or_else(|| EngineError::ItemNotFound(item_id.to_string()))
    }

    fn targets_itself(&self, target: &DropTarget) -> bool {
        match (&self.subject, target) {
            (DragSubject::Item(a), DropTarget::Item { id, .. }) => a == id,
            (DragSubject::Container(a), DropTarget::Container { id }) => a == id,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::sample_board;
    use crate::engine;

    fn seq(board: &Board, container_id: &str) -> Vec<String> {
        board.container_items(container_id).unwrap().to_vec()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn item(id: &str, after: bool) -> DropTarget {
        DropTarget::Item {
            id: id.to_string(),
            after,
        }
    }

    fn container(id: &str) -> DropTarget {
        DropTarget::Container { id: id.to_string() }
    }

    #[test]
    fn test_resolve_item_onto_item_in_other_container() {
        let board = sample_board(&[("A", &["A1", "A2"]), ("B", &["B1", "B2"])]);
        let engine = OrderingEngine::new(board).unwrap();
        let subject = DragSubject::Item("A1".to_string());
        let before = resolve_drop_target(&engine, &subject, &item("B2", false)).unwrap();
        assert_eq!(
            before,
            Command::MoveItem {
                item_id: "A1".to_string(),
                from_container_id: "A".to_string(),
                to_container_id: "B".to_string(),
                to_index: 1,
            }
        );
        let after = resolve_drop_target(&engine, &subject, &item("B2", true)).unwrap();
        assert!(matches!(after, Command::MoveItem { to_index: 2, .. }));
    }

    #[test]
    fn test_resolve_item_downwards_in_same_container() {
        let board = sample_board(&[("A", &["A1", "A2", "A3"])]);
        let engine = OrderingEngine::new(board.clone()).unwrap();
        let command =
            resolve_drop_target(&engine, &DragSubject::Item("A1".to_string()), &item("A3", true))
                .unwrap();
        let (next, _) = engine::apply(&board, command).unwrap();
        assert_eq!(seq(&next, "A"), ids(&["A2", "A3", "A1"]));
    }

    #[test]
    fn test_resolve_item_onto_container_appends() {
        let board = sample_board(&[("A", &["A1"]), ("B", &["B1"])]);
        let engine = OrderingEngine::new(board).unwrap();
        let command =
            resolve_drop_target(&engine, &DragSubject::Item("A1".to_string()), &container("B"))
                .unwrap();
        assert!(matches!(command, Command::MoveItem { to_index: 1, .. }));
    }

    #[test]
    fn test_resolve_container_onto_item_uses_owner() {
        let board = sample_board(&[("A", &[]), ("B", &[]), ("C", &["C1"])]);
        let engine = OrderingEngine::new(board).unwrap();
        let command = resolve_drop_target(
            &engine,
            &DragSubject::Container("A".to_string()),
            &item("C1", false),
        )
        .unwrap();
        assert_eq!(
            command,
            Command::MoveContainer {
                container_id: "A".to_string(),
                to_index: 2,
            }
        );
    }

    #[test]
    fn test_resolve_unknown_target() {
        let board = sample_board(&[("A", &["A1"])]);
        let engine = OrderingEngine::new(board).unwrap();
        let err = resolve_drop_target(&engine, &DragSubject::Item("A1".to_string()), &container("Z"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_hover_stages_without_touching_committed() {
        let board = sample_board(&[("A", &["A1", "A2"]), ("B", &["B1"])]);
        let mut session = DragSession::begin(board.clone(), DragSubject::Item("A1".to_string())).unwrap();
        session.over(item("B1", false)).unwrap();
        assert_eq!(seq(session.staged(), "B"), ids(&["A1", "B1"]));
        assert_eq!(session.committed(), &board);

        session.over(container("A")).unwrap();
        assert_eq!(seq(session.staged(), "A"), ids(&["A2", "A1"]));
        assert_eq!(seq(session.staged(), "B"), ids(&["B1"]));
    }

    #[test]
    fn test_cancel_returns_committed_snapshot() {
        let board = sample_board(&[("A", &["A1", "A2"]), ("B", &[])]);
        let mut session = DragSession::begin(board.clone(), DragSubject::Item("A2".to_string())).unwrap();
        session.over(container("B")).unwrap();
        assert_eq!(session.cancel(), board);
    }

    #[test]
    fn test_finish_yields_net_move() {
        let board = sample_board(&[("A", &["A1", "A2", "A3"]), ("B", &["B1"])]);
        let mut session = DragSession::begin(board.clone(), DragSubject::Item("A2".to_string())).unwrap();
        session.over(item("A3", true)).unwrap();
        session.over(container("B")).unwrap();
        let command = session.finish(Some(item("B1", false))).unwrap().unwrap();
        assert_eq!(
            command,
            Command::MoveItem {
                item_id: "A2".to_string(),
                from_container_id: "A".to_string(),
                to_container_id: "B".to_string(),
                to_index: 0,
            }
        );
        let (next, _) = engine::apply(&board, command).unwrap();
        assert_eq!(seq(&next, "A"), ids(&["A1", "A3"]));
        assert_eq!(seq(&next, "B"), ids(&["A2", "B1"]));
    }

    #[test]
    fn test_finish_back_at_start_is_none() {
        let board = sample_board(&[("A", &["A1", "A2"]), ("B", &[])]);
        let mut session = DragSession::begin(board, DragSubject::Item("A1".to_string())).unwrap();
        session.over(container("B")).unwrap();
        let command = session.finish(Some(item("A2", false))).unwrap();
        assert_eq!(command, None);
    }

    #[test]
    fn test_container_drag() {
        let board = sample_board(&[("A", &[]), ("B", &[]), ("C", &[])]);
        let mut session = DragSession::begin(board, DragSubject::Container("C".to_string())).unwrap();
        session.over(container("C")).unwrap();
        assert!(session.target().is_none());
        let command = session.finish(Some(container("A"))).unwrap();
        assert_eq!(
            command,
            Some(Command::MoveContainer {
                container_id: "C".to_string(),
                to_index: 0,
            })
        );
    }

    #[test]
    fn test_begin_with_unknown_subject() {
        let board = sample_board(&[("A", &["A1"])]);
        assert!(DragSession::begin(board.clone(), DragSubject::Item("X".to_string())).is_err());
        assert!(DragSession::begin(board, DragSubject::Container("X".to_string())).is_err());
    }
}
