use std::path::Path;

use tracing::debug;

use crate::archive::Archive;
use crate::error::{Result, SeedbankError};

/// Registry of every archive known to a repository.
///
/// Populated once per session from `meta/`; later additions stay in memory
/// until the caller persists them.
#[derive(Debug, Default)]
pub struct ArchiveManager {
    archives: Vec<Archive>,
}

impl ArchiveManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` record directly inside `meta_dir`, in file-name order.
    ///
    /// A missing directory yields an empty registry. Any record that fails to
    /// parse fails the whole load.
    pub fn load(meta_dir: &Path) -> Result<Self> {
        let entries = match std::fs::read_dir(meta_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some("json")
            {
                paths.push(path);
            }
        }
        paths.sort();

        let mut manager = Self::new();
        for path in paths {
            manager.add(Archive::load(&path)?)?;
        }
        debug!(
            "loaded {} archive record(s) from {}",
            manager.archives.len(),
            meta_dir.display()
        );
        Ok(manager)
    }

    /// Archives in load/insertion order.
    pub fn list(&self) -> &[Archive] {
        &self.archives
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Register an archive in memory. Does not persist anything.
    pub fn add(&mut self, archive: Archive) -> Result<()> {
        if self.archives.iter().any(|a| a.uid == archive.uid) {
            return Err(SeedbankError::DuplicateArchive(archive.uid.to_string()));
        }
        self.archives.push(archive);
        Ok(())
    }

    /// Find the single archive whose uid starts with `prefix`.
    ///
    /// No match is `Ok(None)`; more than one is [`SeedbankError::AmbiguousUidPrefix`].
    pub fn resolve_by_prefix(&self, prefix: &str) -> Result<Option<&Archive>> {
        let mut matches = self.archives.iter().filter(|a| a.uid.starts_with(prefix));
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        let rest: Vec<&Archive> = matches.collect();
        if rest.is_empty() {
            return Ok(Some(first));
        }
        let mut candidates = vec![first.uid.to_string()];
        candidates.extend(rest.iter().map(|a| a.uid.to_string()));
        Err(SeedbankError::AmbiguousUidPrefix {
            prefix: prefix.to_string(),
            candidates,
        })
    }

    /// Like [`resolve_by_prefix`](Self::resolve_by_prefix), but no match is an error.
    pub fn require(&self, prefix: &str) -> Result<&Archive> {
        self.resolve_by_prefix(prefix)?
            .ok_or_else(|| SeedbankError::ArchiveNotFound(prefix.to_string()))
    }

    pub fn get(&self, uid: &str) -> Option<&Archive> {
        self.archives.iter().find(|a| a.uid.as_str() == uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Archive> {
        self.archives.iter_mut().find(|a| a.uid.as_str() == uid)
    }

    /// Archives ordered from oldest to newest creation time.
    pub fn sorted_by_time(&self) -> Vec<&Archive> {
        let mut sorted: Vec<&Archive> = self.archives.iter().collect();
        sorted.sort_by(|a, b| a.create_time.cmp(&b.create_time).then(a.uid.cmp(&b.uid)));
        sorted
    }
}
