use chrono::Utc;

use crate::config::BoardTemplate;
use crate::invariants::{self, numeric_suffix, Violation};
use crate::stores::{ContainerItemMapping, ContainerOrder, ContainerStore, ItemStore};
use crate::types::{Board, BoardSummary, BoardTag, Container, Item};

impl Board {
    /// A board with no containers. Mostly useful as a starting point for tests
    /// and for callers that build the layout themselves.
    pub fn empty(title: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            slug: slug.into(),
            tags: Vec::new(),
            items: ItemStore::default(),
            containers: ContainerStore::default(),
            container_order: ContainerOrder::default(),
            container_item_mapping: ContainerItemMapping::default(),
            next_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// A freshly created board: one placeholder container holding one
    /// placeholder item, both shaped by `template`.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        tags: Vec<BoardTag>,
        template: &BoardTemplate,
    ) -> Self {
        let mut board = Self::empty(title, slug);
        board.tags = tags;

        let container_id = board.allocate_id("container");
        let item_id = board.allocate_id("item");
        let now = board.created_at;

        board.containers.insert(Container {
            id: container_id.clone(),
            title: template.container_title.clone(),
            kind: template.container_kind,
            completed_item_order: template.completed_item_order,
            badge_color: template.badge_color.clone(),
        });
        board.items.insert(Item {
            id: item_id.clone(),
            content: template.item_content.clone(),
            badge_color: template.badge_color.clone(),
            completed: false,
            return_slot: None,
            created_at: now,
            updated_at: now,
        });
        board.container_order.push(container_id.clone());
        board
            .container_item_mapping
            .insert(container_id, vec![item_id]);
        board
    }

    /// Mint the next id from the board's counter (`item-7`, `container-8`).
    pub fn allocate_id(&mut self, prefix: &str) -> String {
        self.seed_id_counter();
        let id = format!("{}-{}", prefix, self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Boards persisted before the counter existed carry `next_id == 0`.
    /// Seed it once from the largest numeric suffix among existing ids.
    pub fn seed_id_counter(&mut self) {
        if self.next_id > 0 {
            return;
        }
        let max = self
            .items
            .ids()
            .chain(self.containers.ids())
            .filter_map(numeric_suffix)
            .max()
            .unwrap_or(0);
        self.next_id = max.saturating_add(1);
        log::debug!(
            "[plank.board] Seeded id counter for {} at {}",
            self.slug,
            self.next_id
        );
    }

    pub fn check_invariants(&self) -> Result<(), Violation> {
        invariants::check(self)
    }

    /// Item ids of a container, in display order.
    pub fn container_items(&self, container_id: &str) -> Option<&[String]> {
        self.container_item_mapping.get(container_id)
    }

    /// Containers in left-to-right order.
    pub fn ordered_containers(&self) -> impl Iterator<Item = &Container> {
        self.container_order
            .iter()
            .filter_map(|id| self.containers.get(id))
    }

    /// Items of a container, in display order.
    pub fn ordered_items<'a>(&'a self, container_id: &str) -> impl Iterator<Item = &'a Item> {
        self.container_items(container_id)
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| self.items.get(id))
    }

    /// Case-insensitive tag lookup by title.
    pub fn has_tag(&self, title: &str) -> bool {
        let wanted = title.trim().to_lowercase();
        self.tags.iter().any(|t| t.title.to_lowercase() == wanted)
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            tags: self.tags.clone(),
            container_count: self.container_order.len(),
            item_count: self.items.len(),
            completed_count: self.items.completed_count(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::{EngineError, OrderingEngine};
    use crate::types::{Color, CompletedItemOrder, ContainerKind};

    /// Build a board from `(container_id, [item_id, ...])` pairs. Items get
    /// their id as content; containers are checklists with `NoChange` order.
    pub(crate) fn sample_board(layout: &[(&str, &[&str])]) -> Board {
        let mut board = Board::empty("Sample", "sample");
        board.next_id = 0;
        let now = board.created_at;
        for (container_id, item_ids) in layout {
            board.containers.insert(Container {
                id: container_id.to_string(),
                title: container_id.to_string(),
                kind: ContainerKind::Checklist,
                completed_item_order: CompletedItemOrder::NoChange,
                badge_color: Color::default(),
            });
            board.container_order.push(container_id.to_string());
            for item_id in item_ids.iter() {
                board.items.insert(Item {
                    id: item_id.to_string(),
                    content: item_id.to_string(),
                    badge_color: Color::default(),
                    completed: false,
                    return_slot: None,
                    created_at: now,
                    updated_at: now,
                });
            }
            board.container_item_mapping.insert(
                container_id.to_string(),
                item_ids.iter().map(|s| s.to_string()).collect(),
            );
        }
        board
    }

    #[test]
    fn test_new_board_has_placeholder_container_and_item() {
        let board = Board::new("Groceries", "groceries", Vec::new(), &BoardTemplate::default());
        assert_eq!(board.container_order.len(), 1);
        assert_eq!(board.items.len(), 1);
        let container_id = &board.container_order.as_slice()[0];
        assert_eq!(board.container_items(container_id).unwrap().len(), 1);
        assert_eq!(board.check_invariants(), Ok(()));
    }

    #[test]
    fn test_allocate_id_is_monotonic() {
        let mut board = Board::empty("B", "b");
        assert_eq!(board.allocate_id("item"), "item-1");
        assert_eq!(board.allocate_id("container"), "container-2");
        assert_eq!(board.allocate_id("item"), "item-3");
    }

    #[test]
    fn test_seed_counter_from_legacy_ids() {
        let mut board = sample_board(&[("1", &["4", "9"]), ("2", &["7"])]);
        assert_eq!(board.next_id, 0);
        assert_eq!(board.allocate_id("item"), "item-10");
    }

    #[test]
    fn test_legacy_id_at_counter_limit_is_rejected() {
        let mut board = sample_board(&[("A", &["18446744073709551615"])]);
        assert_eq!(
            board.check_invariants(),
            Err(Violation::CounterExhausted(u64::MAX))
        );
        assert!(matches!(
            OrderingEngine::new(board.clone()),
            Err(EngineError::InvariantViolation(Violation::CounterExhausted(_)))
        ));

        board.seed_id_counter();
        assert_eq!(board.next_id, u64::MAX);
        assert!(board.check_invariants().is_err());
    }

    #[test]
    fn test_counter_just_below_limit_is_usable() {
        let mut board = sample_board(&[("A", &["18446744073709551613"])]);
        assert_eq!(board.check_invariants(), Ok(()));
        assert_eq!(board.allocate_id("item"), "item-18446744073709551614");
        assert_eq!(
            board.check_invariants(),
            Err(Violation::CounterExhausted(u64::MAX))
        );
    }

    #[test]
    fn test_seed_counter_without_numeric_ids() {
        let mut board = sample_board(&[("A", &[])]);
        assert_eq!(board.allocate_id("item"), "item-1");
    }

    #[test]
    fn test_summary_counts() {
        let mut board = sample_board(&[("A", &["A1", "A2"]), ("B", &["B1"])]);
        board.items.get_mut("A2").unwrap().completed = true;
        let summary = board.summary();
        assert_eq!(summary.container_count, 2);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.completed_count, 1);
    }

    #[test]
    fn test_has_tag_ignores_case() {
        let mut board = Board::empty("B", "b");
        board.tags.push(BoardTag {
            title: "Work".to_string(),
            color: Color::default(),
        });
        assert!(board.has_tag("work"));
        assert!(board.has_tag(" WORK "));
        assert!(!board.has_tag("home"));
    }

    #[test]
    fn test_ordered_items_follow_sequence() {
        let board = sample_board(&[("A", &["A3", "A1", "A2"])]);
        let ids: Vec<_> = board.ordered_items("A").map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A3", "A1", "A2"]);
        assert_eq!(board.ordered_items("missing").count(), 0);
    }
}
