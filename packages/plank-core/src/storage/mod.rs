pub mod local;
pub mod memory;

use crate::engine::EngineError;
use crate::types::{Board, BoardSummary};

/// Commit step for a board: receives the current snapshot, returns the next one.
pub type Mutator<'a> = dyn FnMut(&Board) -> Result<Board, EngineError> + 'a;

/// Abstract storage trait for board backends.
/// Implementations: MemoryStore (tests, ephemeral sessions), LocalStore (filesystem).
///
/// Every write is a single logical transaction per board. Boards are checked
/// against their invariants before they are accepted.
pub trait BoardStore: Send + Sync {
    /// Read a board by its slug.
    fn get(&self, slug: &str) -> Result<Option<Board>, StorageError>;

    /// Store a new board. Fails if the slug is already in use.
    fn insert(&self, board: Board) -> Result<(), StorageError>;

    /// Atomic read-modify-write of one board. The mutator sees the last
    /// committed snapshot; if it fails, or its result breaks an invariant or
    /// changes the slug, nothing is written.
    fn commit(&self, slug: &str, mutate: &mut Mutator<'_>) -> Result<Board, StorageError>;

    /// Delete a board with all its nested collections. Returns how many
    /// boards were removed (0 or 1).
    fn delete_board(&self, slug: &str) -> Result<usize, StorageError>;

    /// Every stored board.
    fn all(&self) -> Result<Vec<Board>, StorageError>;

    fn contains(&self, slug: &str) -> Result<bool, StorageError> {
        Ok(self.get(slug)?.is_some())
    }

    /// Summaries of all boards, most recently updated first.
    fn list(&self) -> Result<Vec<BoardSummary>, StorageError> {
        let mut summaries: Vec<BoardSummary> = self.all()?.iter().map(Board::summary).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.slug.cmp(&b.slug)));
        Ok(summaries)
    }

    /// Summaries of boards carrying `tag` (case-insensitive).
    fn list_tagged(&self, tag: &str) -> Result<Vec<BoardSummary>, StorageError> {
        let mut boards: Vec<Board> = self.all()?.into_iter().filter(|b| b.has_tag(tag)).collect();
        boards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.slug.cmp(&b.slug)));
        Ok(boards.iter().map(Board::summary).collect())
    }
}

/// Run a mutator and check what it produced before a store accepts it.
pub(crate) fn run_mutator(
    slug: &str,
    current: &Board,
    mutate: &mut Mutator<'_>,
) -> Result<Board, StorageError> {
    let next = mutate(current)?;
    if next.slug != slug {
        return Err(StorageError::SlugChanged {
            from: slug.to_string(),
            to: next.slug,
        });
    }
    next.check_invariants()
        .map_err(EngineError::InvariantViolation)?;
    Ok(next)
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("Board slug already in use: {0}")]
    SlugTaken(String),

    #[error("Board slug cannot change during a commit ({from} -> {to})")]
    SlugChanged { from: String, to: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid board document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Commit to {0} finished without applying the change")]
    NotApplied(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// The engine error behind this failure, if any.
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            StorageError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::LockPoisoned
    }
}
