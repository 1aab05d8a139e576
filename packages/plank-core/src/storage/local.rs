/// Local filesystem storage backend.
///
/// Keeps one JSON document per board in a data directory, with:
/// - file names derived from the slug (percent-encoded)
/// - atomic writes (write to .tmp, fsync, rename)
/// - SHA-256 content hashes: a commit whose serialized document matches the
///   last read/written one is not rewritten
/// - per-board write mutexes so a commit is one read-modify-write
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

use super::{run_mutator, BoardStore, Mutator, StorageError};
use crate::engine::EngineError;
use crate::types::Board;

/// Characters kept verbatim in board file names.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

const BOARD_EXTENSION: &str = "json";

/// State for a single tracked board.
#[derive(Debug, Clone)]
pub struct BoardState {
    pub file_path: PathBuf,
    pub board: Board,
    /// SHA-256 of the last read/written document
    pub content_hash: String,
    /// Monotonic version counter, incremented on every change
    pub version: u64,
}

/// Board storage backed by a directory of JSON documents.
pub struct LocalStore {
    dir: PathBuf,
    /// slug -> BoardState
    boards: RwLock<HashMap<String, BoardState>>,
    /// Per-board write mutex to prevent concurrent modification
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Global version counter (monotonic, shared across all boards)
    next_version: AtomicU64,
}

impl LocalStore {
    /// Open (and create if needed) a data directory, loading every board in it.
    /// Documents that fail to parse or break an invariant are skipped with a warning.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let store = Self {
            dir,
            boards: RwLock::new(HashMap::new()),
            write_locks: Mutex::new(HashMap::new()),
            next_version: AtomicU64::new(1),
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&store.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(BOARD_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut boards: HashMap<String, BoardState> = HashMap::new();
        for path in paths {
            let state = match store.load_file(&path) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!(
                        "[plank.storage.local] Skipping board file {:?}: {}",
                        path,
                        e
                    );
                    continue;
                }
            };
            let slug = state.board.slug.clone();
            let canonical = store.path_for(&slug);
            let loaded_from = boards.get(&slug).map(|s| s.file_path.clone());
            match loaded_from {
                None => {
                    boards.insert(slug, state);
                }
                // the file named after the slug wins; otherwise the first in name order
                Some(existing) if existing == canonical || path != canonical => {
                    log::warn!(
                        "[plank.storage.local] Skipping {:?}: board {} is already loaded from {:?}",
                        path,
                        slug,
                        existing
                    );
                }
                Some(existing) => {
                    log::warn!(
                        "[plank.storage.local] Skipping {:?}: board {} is loaded from {:?}",
                        existing,
                        slug,
                        path
                    );
                    boards.insert(slug, state);
                }
            }
        }

        let loaded = boards.len();
        *store.boards.write()? = boards;
        log::info!(
            "[plank.storage.local] Loaded {} boards from {:?}",
            loaded,
            store.dir
        );
        Ok(store)
    }

    /// Get the next version number.
    fn next_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::Relaxed)
    }

    /// Compute SHA-256 hash of a document (for change detection).
    fn content_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// File name for a slug: percent-encoded so any slug maps to one safe name.
    pub fn file_name_for(slug: &str) -> String {
        format!(
            "{}.{}",
            utf8_percent_encode(slug, FILE_NAME_SET),
            BOARD_EXTENSION
        )
    }

    /// Inverse of `file_name_for`, used to double-check documents on load.
    fn slug_from_path(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        percent_decode_str(stem)
            .decode_utf8()
            .ok()
            .map(|s| s.into_owned())
    }

    fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(Self::file_name_for(slug))
    }

    fn load_file(&self, path: &Path) -> Result<BoardState, StorageError> {
        let content = fs::read_to_string(path)?;
        let board: Board = serde_json::from_str(&content)?;
        board
            .check_invariants()
            .map_err(EngineError::InvariantViolation)?;
        if Self::slug_from_path(path).as_deref() != Some(board.slug.as_str()) {
            log::warn!(
                "[plank.storage.local] Board {} is stored under unexpected name {:?}",
                board.slug,
                path
            );
        }
        Ok(BoardState {
            file_path: path.to_path_buf(),
            board,
            content_hash: Self::content_hash(&content),
            version: self.next_version(),
        })
    }

    /// Reload a board from disk (e.g. after the file was replaced externally).
    pub fn reload_board(&self, slug: &str) -> Result<Board, StorageError> {
        let path = self
            .boards
            .read()?
            .get(slug)
            .map(|s| s.file_path.clone())
            .ok_or_else(|| StorageError::BoardNotFound(slug.to_string()))?;
        let state = self.load_file(&path)?;
        let board = state.board.clone();
        self.boards.write()?.insert(slug.to_string(), state);
        Ok(board)
    }

    /// Get the version number for a board.
    pub fn get_board_version(&self, slug: &str) -> Option<u64> {
        self.boards.read().ok()?.get(slug).map(|s| s.version)
    }

    /// Get the file path for a board.
    pub fn get_board_path(&self, slug: &str) -> Option<PathBuf> {
        self.boards
            .read()
            .ok()?
            .get(slug)
            .map(|s| s.file_path.clone())
    }

    /// Get a write lock for a specific board.
    fn get_write_lock(&self, slug: &str) -> Result<Arc<Mutex<()>>, StorageError> {
        let mut locks = self.write_locks.lock()?;
        Ok(locks
            .entry(slug.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Serialize and write a board, returning its new tracked state.
    fn persist(&self, path: PathBuf, board: Board) -> Result<BoardState, StorageError> {
        let document = serde_json::to_string_pretty(&board)?;
        Self::atomic_write(&path, &document)?;
        Ok(BoardState {
            file_path: path,
            board,
            content_hash: Self::content_hash(&document),
            version: self.next_version(),
        })
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    /// Refuses to write empty content over a non-empty file (data safety).
    fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        if content.trim().is_empty() {
            if let Ok(existing) = fs::read_to_string(path) {
                if !existing.trim().is_empty() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "Refusing to overwrite non-empty file with empty content",
                    ));
                }
            }
        }

        let tmp_path = path.with_extension("plank.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

impl BoardStore for LocalStore {
    fn get(&self, slug: &str) -> Result<Option<Board>, StorageError> {
        Ok(self.boards.read()?.get(slug).map(|s| s.board.clone()))
    }

    fn contains(&self, slug: &str) -> Result<bool, StorageError> {
        Ok(self.boards.read()?.contains_key(slug))
    }

    fn insert(&self, board: Board) -> Result<(), StorageError> {
        board
            .check_invariants()
            .map_err(EngineError::InvariantViolation)?;
        let lock = self.get_write_lock(&board.slug)?;
        let _guard = lock.lock()?;

        let path = self.path_for(&board.slug);
        if self.boards.read()?.contains_key(&board.slug) || path.exists() {
            return Err(StorageError::SlugTaken(board.slug));
        }
        let slug = board.slug.clone();
        let state = self.persist(path, board)?;
        self.boards.write()?.insert(slug.clone(), state);
        log::info!("[plank.storage.local] Created board {}", slug);
        Ok(())
    }

    fn commit(&self, slug: &str, mutate: &mut Mutator<'_>) -> Result<Board, StorageError> {
        let lock = self.get_write_lock(slug)?;
        let _guard = lock.lock()?;

        let current = self
            .boards
            .read()?
            .get(slug)
            .cloned()
            .ok_or_else(|| StorageError::BoardNotFound(slug.to_string()))?;

        let next = run_mutator(slug, &current.board, mutate)?;
        let document = serde_json::to_string_pretty(&next)?;
        let content_hash = Self::content_hash(&document);
        if content_hash == current.content_hash {
            log::debug!("[plank.storage.local] Board {} unchanged, skipping write", slug);
            return Ok(next);
        }

        Self::atomic_write(&current.file_path, &document)?;
        let state = BoardState {
            file_path: current.file_path,
            board: next.clone(),
            content_hash,
            version: self.next_version(),
        };
        self.boards.write()?.insert(slug.to_string(), state);
        Ok(next)
    }

    fn delete_board(&self, slug: &str) -> Result<usize, StorageError> {
        let lock = self.get_write_lock(slug)?;
        let _guard = lock.lock()?;

        let removed = self.boards.write()?.remove(slug);
        let Some(state) = removed else {
            return Ok(0);
        };
        match fs::remove_file(&state.file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                // keep the in-memory copy consistent with what is still on disk
                self.boards.write()?.insert(slug.to_string(), state);
                return Err(e.into());
            }
        }
        self.write_locks.lock()?.remove(slug);
        log::info!("[plank.storage.local] Deleted board {}", slug);
        Ok(1)
    }

    fn all(&self) -> Result<Vec<Board>, StorageError> {
        Ok(self
            .boards
            .read()?
            .values()
            .map(|s| s.board.clone())
            .collect())
    }
}
