/// The single writer for boards: commands go through the engine and the
/// store's commit step, then every change is broadcast to subscribers so
/// views can re-render from the committed snapshot.
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::calendar::{group_by_updated_local, BucketGroup};
use crate::config::PlankConfig;
use crate::drag::{DragSession, DragSubject, DropTarget};
use crate::engine::{self, Command, Outcome};
use crate::slug::try_unique_slug;
use crate::storage::local::LocalStore;
use crate::storage::{BoardStore, StorageError};
use crate::types::{Board, BoardSummary, BoardTag};

const EVENT_CAPACITY: usize = 256;

/// Change notifications emitted after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BoardEvent {
    Created { slug: String },
    Updated { slug: String, outcome: Outcome },
    Deleted { slug: String },
}

pub struct BoardService<S: BoardStore> {
    store: S,
    config: PlankConfig,
    event_tx: broadcast::Sender<BoardEvent>,
}

impl BoardService<LocalStore> {
    /// Service over the JSON documents in `config.data_dir`.
    pub fn open_local(config: PlankConfig) -> Result<Self, StorageError> {
        let store = LocalStore::open(&config.data_dir)?;
        Ok(Self::new(store, config))
    }
}

impl<S: BoardStore> BoardService<S> {
    pub fn new(store: S, config: PlankConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            config,
            event_tx,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PlankConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: BoardEvent) {
        // no receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Create a board laid out from the configured template, under a slug
    /// derived from its title.
    pub fn create_board(&self, title: &str, tags: Vec<BoardTag>) -> Result<Board, StorageError> {
        let slug = try_unique_slug(title, |candidate| self.store.contains(candidate))?;
        let board = Board::new(title, slug.clone(), tags, &self.config.new_board);
        self.store.insert(board.clone())?;
        log::info!("[plank.service] Created board {} ({})", slug, title);
        self.emit(BoardEvent::Created { slug });
        Ok(board)
    }

    pub fn get(&self, slug: &str) -> Result<Board, StorageError> {
        self.store
            .get(slug)?
            .ok_or_else(|| StorageError::BoardNotFound(slug.to_string()))
    }

    pub fn list(&self) -> Result<Vec<BoardSummary>, StorageError> {
        self.store.list()
    }

    pub fn list_tagged(&self, tag: &str) -> Result<Vec<BoardSummary>, StorageError> {
        self.store.list_tagged(tag)
    }

    /// Board summaries grouped by last update, relative to the local clock.
    pub fn list_by_updated(&self) -> Result<Vec<BucketGroup>, StorageError> {
        Ok(group_by_updated_local(self.store.list()?))
    }

    /// Apply one command to a board and commit the result.
    pub fn dispatch(&self, slug: &str, command: Command) -> Result<(Board, Outcome), StorageError> {
        log::debug!("[plank.service] Dispatch on {}: {:?}", slug, command);
        let mut outcome = None;
        let board = self.store.commit(slug, &mut |current| {
            let (next, out) = engine::apply(current, command.clone())?;
            outcome = Some(out);
            Ok(next)
        })?;
        let outcome = outcome.ok_or_else(|| StorageError::NotApplied(slug.to_string()))?;
        self.emit(BoardEvent::Updated {
            slug: slug.to_string(),
            outcome: outcome.clone(),
        });
        Ok((board, outcome))
    }

    /// Delete a board and everything in it. Returns how many boards were removed.
    pub fn delete_board(&self, slug: &str) -> Result<usize, StorageError> {
        let removed = self.store.delete_board(slug)?;
        if removed > 0 {
            self.emit(BoardEvent::Deleted {
                slug: slug.to_string(),
            });
        } else {
            log::debug!("[plank.service] Delete of unknown board {}", slug);
        }
        Ok(removed)
    }

    /// Start a drag gesture on the current committed snapshot.
    pub fn begin_drag(&self, slug: &str, subject: DragSubject) -> Result<DragSession, StorageError> {
        Ok(DragSession::begin(self.get(slug)?, subject)?)
    }

    /// Confirm a drag. The net move is re-applied to the latest committed
    /// board, so edits that landed during the gesture are kept. Returns
    /// `None` when nothing moved.
    pub fn commit_drag(
        &self,
        session: DragSession,
        target: Option<DropTarget>,
    ) -> Result<Option<(Board, Outcome)>, StorageError> {
        let slug = session.slug().to_string();
        match session.finish(target)? {
            Some(command) => self.dispatch(&slug, command).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DateBucket;
    use crate::config::BoardTemplate;
    use crate::engine::Toggle;
    use crate::slug::MAX_SLUG_LEN;
    use crate::storage::memory::MemoryStore;
    use crate::types::{CompletedItemOrder, ContainerDraft, ContainerKind, ItemDraft};
    use tempfile::TempDir;

    fn service() -> BoardService<MemoryStore> {
        let mut config = PlankConfig::default();
        config.new_board = BoardTemplate {
            container_title: "Inbox".to_string(),
            item_content: "First".to_string(),
            ..BoardTemplate::default()
        };
        BoardService::new(MemoryStore::new(), config)
    }

    fn first_container(board: &Board) -> String {
        board.container_order.as_slice()[0].clone()
    }

    #[test]
    fn test_create_board_uses_template_and_unique_slug() {
        let svc = service();
        let first = svc.create_board("Groceries", Vec::new()).unwrap();
        let second = svc.create_board("Groceries", Vec::new()).unwrap();
        assert_eq!(first.slug, "groceries");
        assert_eq!(second.slug, "groceries-2");

        let container = first.ordered_containers().next().unwrap();
        assert_eq!(container.title, "Inbox");
        let items: Vec<_> = first.ordered_items(&container.id).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "First");
    }

    #[test]
    fn test_dispatch_commits_and_broadcasts() {
        let svc = service();
        let mut rx = svc.subscribe();
        let board = svc.create_board("Chores", Vec::new()).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            BoardEvent::Created {
                slug: "chores".to_string()
            }
        );

        let (next, outcome) = svc
            .dispatch(
                "chores",
                Command::AddItem {
                    container_id: first_container(&board),
                    item: ItemDraft::new("Dishes"),
                },
            )
            .unwrap();
        assert!(matches!(outcome, Outcome::Created { .. }));
        assert_eq!(next.items.len(), 2);
        assert_eq!(svc.get("chores").unwrap(), next);
        assert!(matches!(
            rx.try_recv().unwrap(),
            BoardEvent::Updated { ref slug, .. } if slug == "chores"
        ));
    }

    #[test]
    fn test_failed_dispatch_keeps_board_and_stays_quiet() {
        let svc = service();
        let board = svc.create_board("Chores", Vec::new()).unwrap();
        let mut rx = svc.subscribe();
        let err = svc
            .dispatch(
                "chores",
                Command::RemoveContainer {
                    container_id: "container-404".to_string(),
                },
            )
            .unwrap_err();
        assert!(err.engine().is_some_and(|e| e.is_not_found()));
        assert_eq!(svc.get("chores").unwrap(), board);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_toggle_through_service() {
        let svc = service();
        let board = svc.create_board("Todo", Vec::new()).unwrap();
        let (board, outcome) = svc
            .dispatch(
                &board.slug,
                Command::AddContainer {
                    container: ContainerDraft::checklist("Today", CompletedItemOrder::End),
                },
            )
            .unwrap();
        let Outcome::Created { id: container_id } = outcome else {
            panic!("expected a created container");
        };
        assert_eq!(
            board.containers.get(&container_id).unwrap().kind,
            ContainerKind::Checklist
        );
        let mut item_ids = Vec::new();
        for content in ["a", "b"] {
            let (_, outcome) = svc
                .dispatch(
                    "todo",
                    Command::AddItem {
                        container_id: container_id.clone(),
                        item: ItemDraft::new(content),
                    },
                )
                .unwrap();
            if let Outcome::Created { id } = outcome {
                item_ids.push(id);
            }
        }
        let (board, outcome) = svc
            .dispatch(
                "todo",
                Command::ToggleCompletion {
                    item_id: item_ids[0].clone(),
                    container_id: container_id.clone(),
                },
            )
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Toggled {
                toggle: Toggle::Completed
            }
        );
        assert_eq!(
            board.container_items(&container_id).unwrap(),
            &[item_ids[1].clone(), item_ids[0].clone()]
        );
    }

    #[test]
    fn test_delete_board_emits_once() {
        let svc = service();
        svc.create_board("Old", Vec::new()).unwrap();
        let mut rx = svc.subscribe();
        assert_eq!(svc.delete_board("old").unwrap(), 1);
        assert_eq!(svc.delete_board("old").unwrap(), 0);
        assert_eq!(
            rx.try_recv().unwrap(),
            BoardEvent::Deleted {
                slug: "old".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
        assert!(matches!(svc.get("old"), Err(StorageError::BoardNotFound(_))));
    }

    #[test]
    fn test_drag_commit_keeps_concurrent_edits() {
        let svc = service();
        let board = svc.create_board("Drag", Vec::new()).unwrap();
        let inbox = first_container(&board);
        let (_, outcome) = svc
            .dispatch(
                "drag",
                Command::AddContainer {
                    container: ContainerDraft::new("Done"),
                },
            )
            .unwrap();
        let Outcome::Created { id: done } = outcome else {
            panic!("expected a created container");
        };
        let dragged = svc.get("drag").unwrap().container_items(&inbox).unwrap()[0].clone();

        let mut session = svc
            .begin_drag("drag", DragSubject::Item(dragged.clone()))
            .unwrap();
        session
            .over(DropTarget::Container { id: done.clone() })
            .unwrap();

        // lands while the gesture is still in flight
        svc.dispatch(
            "drag",
            Command::RenameBoard {
                title: "Renamed".to_string(),
            },
        )
        .unwrap();

        let (committed, _) = svc.commit_drag(session, None).unwrap().unwrap();
        assert_eq!(committed.title, "Renamed");
        assert_eq!(committed.container_items(&done).unwrap(), &[dragged]);
        assert!(committed.container_items(&inbox).unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_drag_writes_nothing() {
        let svc = service();
        let board = svc.create_board("Drag", Vec::new()).unwrap();
        let inbox = first_container(&board);
        let dragged = board.container_items(&inbox).unwrap()[0].clone();
        let mut rx = svc.subscribe();

        let mut session = svc.begin_drag("drag", DragSubject::Item(dragged)).unwrap();
        session
            .over(DropTarget::Container { id: inbox })
            .unwrap();
        assert_eq!(session.cancel(), board);
        assert_eq!(svc.get("drag").unwrap(), board);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fresh_boards_group_under_today() {
        let svc = service();
        svc.create_board("Groceries", Vec::new()).unwrap();
        svc.create_board("Chores", Vec::new()).unwrap();

        let groups = svc.list_by_updated().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].bucket, DateBucket::Today);
        assert_eq!(groups[0].boards.len(), 2);
    }

    #[test]
    fn test_long_title_creates_local_board() {
        let dir = TempDir::new().unwrap();
        let mut config = PlankConfig::default();
        config.data_dir = dir.path().to_path_buf();
        let svc = BoardService::open_local(config).unwrap();

        let title = "a".repeat(300);
        let first = svc.create_board(&title, Vec::new()).unwrap();
        let second = svc.create_board(&title, Vec::new()).unwrap();
        assert_eq!(first.slug.len(), MAX_SLUG_LEN);
        assert_eq!(second.slug.len(), MAX_SLUG_LEN);
        assert!(second.slug.ends_with("-2"));
        assert_eq!(first.title, title);
        assert!(svc.store().get_board_path(&second.slug).unwrap().exists());
    }

    #[test]
    fn test_open_local_uses_data_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = PlankConfig::default();
        config.data_dir = dir.path().join("boards");
        {
            let svc = BoardService::open_local(config.clone()).unwrap();
            svc.create_board("Persisted", Vec::new()).unwrap();
        }
        let svc = BoardService::open_local(config).unwrap();
        let slugs: Vec<_> = svc.list().unwrap().into_iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["persisted".to_string()]);
    }
}
