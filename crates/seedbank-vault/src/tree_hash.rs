//! SHA-256 tree hash, the integrity checksum Glacier requires on part
//! uploads and on multipart completion.
//!
//! The payload is split into 1 MiB leaves; each leaf is hashed, then
//! adjacent digests are concatenated and hashed pairwise until one digest
//! remains. An odd digest at the end of a level is promoted unchanged.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

pub const TREE_HASH_LEAF_SIZE: usize = 1024 * 1024;

pub type Hash = [u8; 32];

/// Fold leaf digests into the root digest.
pub fn combine(mut level: Vec<Hash>) -> Hash {
    if level.is_empty() {
        return Sha256::digest(b"").into();
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut hasher = Sha256::new();
                    hasher.update(left);
                    hasher.update(right);
                    hasher.finalize().into()
                }
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }
    level[0]
}

/// Leaf digests of an in-memory buffer.
pub fn leaf_hashes(data: &[u8]) -> Vec<Hash> {
    data.chunks(TREE_HASH_LEAF_SIZE)
        .map(|leaf| Sha256::digest(leaf).into())
        .collect()
}

pub fn tree_hash(data: &[u8]) -> Hash {
    combine(leaf_hashes(data))
}

pub fn tree_hash_hex(data: &[u8]) -> String {
    hex::encode(tree_hash(data))
}

/// Tree hash of everything `reader` yields, one leaf in memory at a time.
pub fn tree_hash_reader<R: Read>(reader: &mut R) -> io::Result<Hash> {
    let mut leaves = Vec::new();
    let mut buf = vec![0u8; TREE_HASH_LEAF_SIZE];
    loop {
        let filled = read_full(reader, &mut buf)?;
        if filled == 0 {
            break;
        }
        leaves.push(Sha256::digest(&buf[..filled]).into());
        if filled < buf.len() {
            break;
        }
    }
    Ok(combine(leaves))
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
