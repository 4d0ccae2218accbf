use std::path::Path;

use git2::{ErrorCode, Repository, Signature};
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::error::{Result, SeedbankError};

/// Append-only log of repository changes.
pub trait History {
    /// Stage `paths` (relative to the repository root) and commit them.
    /// Returns the new commit id.
    fn commit(&self, paths: &[&Path], message: &str) -> Result<String>;

    /// Commit messages, newest first.
    fn messages(&self) -> Result<Vec<String>>;

    /// Contents of `path` as of the latest commit, if it is tracked there.
    fn recorded_contents(&self, path: &Path) -> Result<Option<Vec<u8>>>;
}

fn history_err(err: git2::Error) -> SeedbankError {
    SeedbankError::History(err.message().to_string())
}

/// [`History`] backed by the git repository at the seedbank root.
pub struct GitHistory {
    repo: Repository,
    author: HistoryConfig,
}

impl GitHistory {
    /// Create a git repository at `root` and turn off commit signing.
    pub fn init(root: &Path, author: &HistoryConfig) -> Result<Self> {
        let repo = Repository::init(root).map_err(history_err)?;
        {
            let mut config = repo.config().map_err(history_err)?;
            config
                .set_bool("commit.gpgsign", false)
                .map_err(history_err)?;
        }
        Ok(Self {
            repo,
            author: author.clone(),
        })
    }

    pub fn open(root: &Path, author: &HistoryConfig) -> Result<Self> {
        let repo = Repository::open(root).map_err(history_err)?;
        Ok(Self {
            repo,
            author: author.clone(),
        })
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit().map_err(history_err)?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(history_err(e)),
        }
    }

    /// Stage `paths` in the in-memory index and commit the result onto HEAD.
    fn commit_staged(
        &self,
        index: &mut git2::Index,
        paths: &[&Path],
        message: &str,
    ) -> Result<git2::Oid> {
        for path in paths {
            index.add_path(path).map_err(history_err)?;
        }
        let tree_id = index.write_tree().map_err(history_err)?;
        let tree = self.repo.find_tree(tree_id).map_err(history_err)?;

        let sig = Signature::now(&self.author.author_name, &self.author.author_email)
            .map_err(history_err)?;
        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(history_err)
    }
}

impl History for GitHistory {
    fn commit(&self, paths: &[&Path], message: &str) -> Result<String> {
        let mut index = self.repo.index().map_err(history_err)?;
        match self.commit_staged(&mut index, paths, message) {
            Ok(oid) => {
                index.write().map_err(history_err)?;
                debug!("committed {oid}: {}", message.lines().next().unwrap_or_default());
                Ok(oid.to_string())
            }
            Err(e) => {
                // Drop the staged paths so a later commit cannot pick them up.
                if let Err(reload) = index.read(true) {
                    warn!("could not reset index after failed commit: {}", reload.message());
                }
                Err(e)
            }
        }
    }

    fn messages(&self) -> Result<Vec<String>> {
        if self.head_commit()?.is_none() {
            return Ok(Vec::new());
        }
        let mut revwalk = self.repo.revwalk().map_err(history_err)?;
        revwalk.push_head().map_err(history_err)?;
        let mut out = Vec::new();
        for oid in revwalk {
            let commit = self
                .repo
                .find_commit(oid.map_err(history_err)?)
                .map_err(history_err)?;
            out.push(commit.message().unwrap_or_default().to_string());
        }
        Ok(out)
    }

    fn recorded_contents(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        let Some(head) = self.head_commit()? else {
            return Ok(None);
        };
        let tree = head.tree().map_err(history_err)?;
        let entry = match tree.get_path(path) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(history_err(e)),
        };
        let blob = entry
            .to_object(&self.repo)
            .and_then(|obj| obj.peel_to_blob())
            .map_err(history_err)?;
        Ok(Some(blob.content().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_chain_onto_head() {
        let tmp = tempfile::tempdir().unwrap();
        let history = GitHistory::init(tmp.path(), &HistoryConfig::default()).unwrap();
        assert!(history.messages().unwrap().is_empty());

        std::fs::write(tmp.path().join("a.json"), "{}").unwrap();
        history.commit(&[Path::new("a.json")], "first").unwrap();
        std::fs::write(tmp.path().join("b.json"), "{}").unwrap();
        history.commit(&[Path::new("b.json")], "second\n\nbody").unwrap();

        assert_eq!(history.messages().unwrap(), vec!["second\n\nbody", "first"]);

        let reopened = GitHistory::open(tmp.path(), &HistoryConfig::default()).unwrap();
        let head = reopened.head_commit().unwrap().unwrap();
        assert_eq!(head.parent_count(), 1);
        assert!(head.tree().unwrap().get_name("a.json").is_some());
        assert_eq!(head.author().name(), Some("seedbank"));

        assert_eq!(
            reopened.recorded_contents(Path::new("b.json")).unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(reopened.recorded_contents(Path::new("c.json")).unwrap(), None);
    }

    #[test]
    fn missing_path_is_history_error() {
        let tmp = tempfile::tempdir().unwrap();
        let history = GitHistory::init(tmp.path(), &HistoryConfig::default()).unwrap();
        assert!(matches!(
            history.commit(&[Path::new("absent.json")], "x"),
            Err(SeedbankError::History(_))
        ));
    }

    #[test]
    fn failed_commit_leaves_nothing_staged() {
        let tmp = tempfile::tempdir().unwrap();
        let history = GitHistory::init(tmp.path(), &HistoryConfig::default()).unwrap();
        std::fs::write(tmp.path().join("a.json"), "{}").unwrap();
        assert!(history
            .commit(&[Path::new("a.json"), Path::new("absent.json")], "broken")
            .is_err());

        std::fs::write(tmp.path().join("b.json"), "{}").unwrap();
        history.commit(&[Path::new("b.json")], "next").unwrap();
        assert_eq!(history.recorded_contents(Path::new("a.json")).unwrap(), None);
        assert!(history.recorded_contents(Path::new("b.json")).unwrap().is_some());
    }
}
