use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use seedbank_vault::tree_hash::tree_hash_hex;
use seedbank_vault::{ByteRange, PartAck, TransferReceipt, VaultClient, VaultError};

use crate::commands;
use crate::config::RepoConfig;
use crate::error::{Result, SeedbankError};
use crate::history::{GitHistory, History};
use crate::session::Session;

/// One call made against a [`ScriptedVault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultCall {
    Initiate { description: String, part_size: u64 },
    Part { range: ByteRange, len: usize },
    Complete { total_size: u64 },
    Abort { session_id: String },
    Put { description: String, len: usize },
}

#[derive(Default)]
struct VaultState {
    calls: Vec<VaultCall>,
    sessions: HashMap<String, BTreeMap<u64, Vec<u8>>>,
    archives: HashMap<String, Vec<u8>>,
    next_id: u64,
    part_calls: u64,
}

/// In-memory vault that records every call and can be told to fail.
#[derive(Default)]
pub struct ScriptedVault {
    state: Mutex<VaultState>,
    /// Zero-based index of the `upload_part` call that fails.
    fail_part: Option<u64>,
    /// Report a wrong checksum from `put_archive`.
    corrupt_put_checksum: bool,
}

impl ScriptedVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_part(index: u64) -> Self {
        Self {
            fail_part: Some(index),
            ..Self::default()
        }
    }

    pub fn corrupt_put_checksum() -> Self {
        Self {
            corrupt_put_checksum: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<VaultCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn stored(&self, remote_id: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().archives.get(remote_id).cloned()
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    fn receipt(state: &mut VaultState, vault: &str, body: Vec<u8>) -> TransferReceipt {
        state.next_id += 1;
        let remote_id = format!("archive-{}", state.next_id);
        let checksum = tree_hash_hex(&body);
        state.archives.insert(remote_id.clone(), body);
        TransferReceipt {
            location: format!("/-/vaults/{vault}/archives/{remote_id}"),
            remote_id,
            checksum,
        }
    }
}

impl VaultClient for ScriptedVault {
    fn initiate_multipart(
        &self,
        _vault: &str,
        description: &str,
        part_size: u64,
    ) -> seedbank_vault::Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(VaultCall::Initiate {
            description: description.to_string(),
            part_size,
        });
        state.next_id += 1;
        let id = format!("session-{}", state.next_id);
        state.sessions.insert(id.clone(), BTreeMap::new());
        Ok(id)
    }

    fn upload_part(
        &self,
        _vault: &str,
        session_id: &str,
        range: &ByteRange,
        body: &[u8],
    ) -> seedbank_vault::Result<PartAck> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(VaultCall::Part {
            range: *range,
            len: body.len(),
        });
        let index = state.part_calls;
        state.part_calls += 1;
        if self.fail_part == Some(index) {
            return Err(VaultError::Transport {
                op: format!("PUT part {range}"),
                message: "connection reset".into(),
            });
        }
        let parts = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| VaultError::UnknownSession(session_id.to_string()))?;
        parts.insert(range.start, body.to_vec());
        Ok(PartAck {
            range: *range,
            checksum: tree_hash_hex(body),
        })
    }

    fn complete_multipart(
        &self,
        vault: &str,
        session_id: &str,
        total_size: u64,
        checksum: &str,
    ) -> seedbank_vault::Result<TransferReceipt> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(VaultCall::Complete { total_size });
        let parts = state
            .sessions
            .remove(session_id)
            .ok_or_else(|| VaultError::UnknownSession(session_id.to_string()))?;
        let body: Vec<u8> = parts.into_values().flatten().collect();
        if body.len() as u64 != total_size || tree_hash_hex(&body) != checksum {
            return Err(VaultError::ChecksumMismatch {
                op: "complete".into(),
                sent: checksum.to_string(),
                reported: tree_hash_hex(&body),
            });
        }
        Ok(Self::receipt(&mut state, vault, body))
    }

    fn abort_multipart(&self, _vault: &str, session_id: &str) -> seedbank_vault::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(VaultCall::Abort {
            session_id: session_id.to_string(),
        });
        state
            .sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| VaultError::UnknownSession(session_id.to_string()))
    }

    fn put_archive(
        &self,
        vault: &str,
        description: &str,
        body: &[u8],
    ) -> seedbank_vault::Result<TransferReceipt> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(VaultCall::Put {
            description: description.to_string(),
            len: body.len(),
        });
        let mut receipt = Self::receipt(&mut state, vault, body.to_vec());
        if self.corrupt_put_checksum {
            receipt.checksum = tree_hash_hex(b"something else");
        }
        Ok(receipt)
    }
}

/// Git history whose next `n` commits fail.
pub struct FlakyHistory {
    inner: GitHistory,
    failures_left: AtomicUsize,
}

impl FlakyHistory {
    pub fn new(inner: GitHistory, failures: usize) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(failures),
        }
    }
}

impl History for FlakyHistory {
    fn commit(&self, paths: &[&Path], message: &str) -> Result<String> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(SeedbankError::History("simulated commit failure".into()));
        }
        self.inner.commit(paths, message)
    }

    fn messages(&self) -> Result<Vec<String>> {
        self.inner.messages()
    }

    fn recorded_contents(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        self.inner.recorded_contents(path)
    }
}

/// Initialize a repository in `dir` wired to a fresh [`ScriptedVault`].
pub fn init_repo(dir: &Path) -> (Session, Arc<ScriptedVault>) {
    init_repo_with_vault(dir, ScriptedVault::new())
}

pub fn init_repo_with_vault(dir: &Path, vault: ScriptedVault) -> (Session, Arc<ScriptedVault>) {
    let vault = Arc::new(vault);
    let session = commands::init::run(dir, &RepoConfig::default())
        .unwrap()
        .with_vault(vault.clone());
    (session, vault)
}

/// Write `files` (relative path, contents) under `dir`.
pub fn write_files(dir: &Path, files: &[(&str, &[u8])]) {
    for (rel, contents) in files {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

/// Every entry of a payload as (name, contents), in stream order.
pub fn payload_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let file = std::fs::File::open(path).unwrap();
    let decoder = zstd::Decoder::new(file).unwrap();
    let mut archive = tar::Archive::new(decoder);
    let mut out = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().to_string();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        out.push((name, data));
    }
    out
}
