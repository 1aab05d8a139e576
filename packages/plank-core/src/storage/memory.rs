/// In-memory board storage. Nothing survives the process; used for tests and
/// for sessions that keep their own persistence.
use std::collections::HashMap;
use std::sync::RwLock;

use super::{run_mutator, BoardStore, Mutator, StorageError};
use crate::engine::EngineError;
use crate::types::Board;

#[derive(Debug, Default)]
pub struct MemoryStore {
    boards: RwLock<HashMap<String, Board>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BoardStore for MemoryStore {
    fn get(&self, slug: &str) -> Result<Option<Board>, StorageError> {
        Ok(self.boards.read()?.get(slug).cloned())
    }

    fn contains(&self, slug: &str) -> Result<bool, StorageError> {
        Ok(self.boards.read()?.contains_key(slug))
    }

    fn insert(&self, board: Board) -> Result<(), StorageError> {
        board
            .check_invariants()
            .map_err(EngineError::InvariantViolation)?;
        let mut boards = self.boards.write()?;
        if boards.contains_key(&board.slug) {
            return Err(StorageError::SlugTaken(board.slug));
        }
        boards.insert(board.slug.clone(), board);
        Ok(())
    }

    fn commit(&self, slug: &str, mutate: &mut Mutator<'_>) -> Result<Board, StorageError> {
        let mut boards = self.boards.write()?;
        let current = boards
            .get(slug)
            .ok_or_else(|| StorageError::BoardNotFound(slug.to_string()))?;
        let next = run_mutator(slug, current, mutate)?;
        boards.insert(slug.to_string(), next.clone());
        Ok(next)
    }

    fn delete_board(&self, slug: &str) -> Result<usize, StorageError> {
        Ok(usize::from(self.boards.write()?.remove(slug).is_some()))
    }

    fn all(&self) -> Result<Vec<Board>, StorageError> {
        Ok(self.boards.read()?.values().cloned().collect())
    }
}
