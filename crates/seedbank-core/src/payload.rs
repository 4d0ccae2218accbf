//! Compressed payload writer: a tar stream inside zstd, at `local/<uid>.tar.zst`.
//!
//! The archived files go into the first zstd frame. That frame is closed
//! before the metadata record is embedded, so the on-disk size at that
//! point is exactly the payload size recorded in the metadata. `info.json`
//! and the tar trailer follow in a second frame; zstd decoders read
//! concatenated frames as one stream.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SeedbankError};

/// Name of the embedded metadata record.
pub const MANIFEST_ENTRY: &str = "info.json";

/// A zstd writer that can close its current frame and start a fresh one.
struct FramedZstd {
    encoder: Option<zstd::Encoder<'static, NamedTempFile>>,
    level: i32,
}

impl FramedZstd {
    fn new(file: NamedTempFile, level: i32) -> io::Result<Self> {
        Ok(Self {
            encoder: Some(zstd::Encoder::new(file, level)?),
            level,
        })
    }

    fn encoder(&mut self) -> io::Result<&mut zstd::Encoder<'static, NamedTempFile>> {
        self.encoder
            .as_mut()
            .ok_or_else(|| io::Error::other("payload stream already finished"))
    }

    /// Finish the current frame and open the next; returns bytes on disk so far.
    fn roll(&mut self) -> io::Result<u64> {
        let file = self.finish_frame()?;
        let len = file.as_file().metadata()?.len();
        self.encoder = Some(zstd::Encoder::new(file, self.level)?);
        Ok(len)
    }

    fn finish_frame(&mut self) -> io::Result<NamedTempFile> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| io::Error::other("payload stream already finished"))?;
        let mut file = encoder.finish()?;
        file.flush()?;
        Ok(file)
    }
}

impl Write for FramedZstd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder()?.flush()
    }
}

/// Builds one payload file. Nothing appears at the final path until
/// [`finish`](Self::finish) succeeds.
pub struct PayloadWriter {
    builder: tar::Builder<FramedZstd>,
    path: PathBuf,
    file_list: Vec<String>,
    contents_size: Option<u64>,
}

impl PayloadWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let dir = path
            .parent()
            .ok_or_else(|| SeedbankError::Other(format!("invalid payload path {}", path.display())))?;
        std::fs::create_dir_all(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        let stream = FramedZstd::new(tmp, zstd::DEFAULT_COMPRESSION_LEVEL)?;
        Ok(Self {
            builder: tar::Builder::new(stream),
            path: path.to_path_buf(),
            file_list: Vec::new(),
            contents_size: None,
        })
    }

    /// Add every regular file under `source`, named relative to it with `/`
    /// separators. Directories are walked in file-name order; anything at or
    /// below a path in `skip` is left out.
    pub fn add_tree(&mut self, source: &Path, skip: &[PathBuf]) -> Result<()> {
        if self.contents_size.is_some() {
            return Err(SeedbankError::Other("payload contents already closed".into()));
        }
        let walker = WalkDir::new(source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !skip.iter().any(|dir| e.path() == dir.as_path()));
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| SeedbankError::Other(e.to_string()))?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            self.builder.append_path_with_name(entry.path(), &name)?;
            debug!("added {name}");
            self.file_list.push(name);
        }
        Ok(())
    }

    /// Relative paths added so far, in the order they were written.
    pub fn file_list(&self) -> &[String] {
        &self.file_list
    }

    /// Close the file contents and return the payload size on disk.
    pub fn close_contents(&mut self) -> Result<u64> {
        if let Some(size) = self.contents_size {
            return Ok(size);
        }
        let size = self.builder.get_mut().roll()?;
        self.contents_size = Some(size);
        Ok(size)
    }

    /// Embed `manifest` as `info.json`, finish the stream and move the file
    /// into place.
    pub fn finish(mut self, manifest: &[u8], mtime: DateTime<Utc>) -> Result<PathBuf> {
        self.close_contents()?;

        let mut header = tar::Header::new_gnu();
        header.set_size(manifest.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime.timestamp().max(0) as u64);
        self.builder.append_data(&mut header, MANIFEST_ENTRY, manifest)?;

        let mut stream = self.builder.into_inner()?;
        let file = stream.finish_frame()?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(self.path)
    }
}
