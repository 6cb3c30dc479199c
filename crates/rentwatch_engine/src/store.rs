use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rentwatch_core::{SearchConfig, SearchId};
use rentwatch_logging::watch_debug;

use crate::persist::{ensure_state_dir, AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("search {0} not found")]
    NotFound(SearchId),
    #[error("search {search_id} was modified concurrently (read revision {expected}, stored revision {found})")]
    Conflict {
        search_id: SearchId,
        expected: u64,
        found: u64,
    },
    #[error("search {0} already exists")]
    AlreadyExists(SearchId),
    #[error("failed to parse search record {path}: {message}")]
    Format { path: String, message: String },
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[async_trait::async_trait]
pub trait SearchStore: Send + Sync {
    async fn get(&self, search_id: SearchId) -> Result<Option<SearchConfig>, StoreError>;

    /// Conditional full replace. Succeeds only while the stored revision still
    /// equals `config.revision`; returns the record as stored, revision bumped.
    async fn replace(&self, config: &SearchConfig) -> Result<SearchConfig, StoreError>;
}

/// One RON document per search under a directory, written atomically.
///
/// The read-check-write of `replace` is serialized within the process; across
/// processes the revision check narrows but does not close the race window.
pub struct FileSearchStore {
    writer: AtomicFileWriter,
    write_lock: Mutex<()>,
}

impl FileSearchStore {
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        ensure_state_dir(&dir)?;
        Ok(Self {
            writer: AtomicFileWriter::new(dir),
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    /// Adds a new search. Searches are normally created by an administrator.
    pub fn insert(&self, config: &SearchConfig) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.path_for(config.id).exists() {
            return Err(StoreError::AlreadyExists(config.id));
        }
        self.write_record(config)
    }

    /// Ids of every stored search, ascending.
    pub fn ids(&self) -> Result<Vec<SearchId>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.dir())? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix("search-"))
                .and_then(|n| n.strip_suffix(".ron"))
                .and_then(|n| n.parse::<SearchId>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn filename(search_id: SearchId) -> String {
        format!("search-{search_id}.ron")
    }

    fn path_for(&self, search_id: SearchId) -> PathBuf {
        self.dir().join(Self::filename(search_id))
    }

    fn read_record(&self, search_id: SearchId) -> Result<Option<SearchConfig>, StoreError> {
        let path = self.path_for(search_id);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        ron::from_str(&content)
            .map(Some)
            .map_err(|err| StoreError::Format {
                path: path.display().to_string(),
                message: err.to_string(),
            })
    }

    fn write_record(&self, config: &SearchConfig) -> Result<(), StoreError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content =
            ron::ser::to_string_pretty(config, pretty).map_err(|err| StoreError::Format {
                path: Self::filename(config.id),
                message: err.to_string(),
            })?;
        self.writer
            .write(&Self::filename(config.id), content.as_bytes())?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SearchStore for FileSearchStore {
    async fn get(&self, search_id: SearchId) -> Result<Option<SearchConfig>, StoreError> {
        self.read_record(search_id)
    }

    async fn replace(&self, config: &SearchConfig) -> Result<SearchConfig, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let stored = self
            .read_record(config.id)?
            .ok_or(StoreError::NotFound(config.id))?;
        if stored.revision != config.revision {
            return Err(StoreError::Conflict {
                search_id: config.id,
                expected: config.revision,
                found: stored.revision,
            });
        }

        let mut next = config.clone();
        next.revision = stored.revision + 1;
        self.write_record(&next)?;
        watch_debug!("Stored search {} at revision {}", next.id, next.revision);
        Ok(next)
    }
}
