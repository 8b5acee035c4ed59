//! Managed file copies with checksums.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use super::{CacheError, ChecksumType};

const BUFFER_SIZE: usize = 64 * 1024;

enum Hasher {
    Sha256(Sha256),
    Md5(md5::Context),
}

impl Hasher {
    fn new(checksum_type: ChecksumType) -> Self {
        match checksum_type {
            ChecksumType::Sha256 => Hasher::Sha256(Sha256::new()),
            ChecksumType::Md5 => Hasher::Md5(md5::Context::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Md5(c) => c.consume(data),
        }
    }

    fn finish(self) -> String {
        match self {
            Hasher::Sha256(h) => format!("{:x}", h.finalize()),
            Hasher::Md5(c) => format!("{:x}", c.compute()),
        }
    }
}

/// Copy `source` to `destination`, returning the byte count and checksum.
pub(crate) async fn copy_with_checksum(
    source: &Path,
    destination: &Path,
    checksum_type: ChecksumType,
) -> Result<(u64, String), CacheError> {
    let source_file = File::open(source)
        .await
        .map_err(|e| CacheError::io(source, e))?;
    let dest_file = File::create(destination)
        .await
        .map_err(|e| CacheError::io(destination, e))?;

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, source_file);
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest_file);
    let mut hasher = Hasher::new(checksum_type);

    let mut total_bytes = 0u64;
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .await
            .map_err(|e| CacheError::io(source, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        writer
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(|e| CacheError::io(destination, e))?;

        total_bytes += bytes_read as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| CacheError::io(destination, e))?;

    Ok((total_bytes, hasher.finish()))
}

/// Removes the file at `path` when dropped, unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// A finished managed copy.
#[derive(Debug)]
pub(crate) struct StoredCopy {
    pub path: PathBuf,
    pub size: u64,
    pub checksum: String,
}

/// Copy `source` into `dir` through a temporary file, then rename it to the
/// name `file_name` derives from the checksum.
///
/// The rename is atomic on the same filesystem, so a reader sees either no
/// file or a complete one. The temporary file is removed on failure and when
/// the future is dropped before the rename.
pub(crate) async fn store_copy(
    source: &Path,
    dir: &Path,
    checksum_type: ChecksumType,
    file_name: impl FnOnce(&str) -> String,
) -> Result<StoredCopy, CacheError> {
    let temp = TempFileGuard::new(dir.join(format!(".{}.tmp", uuid::Uuid::new_v4())));

    let (size, checksum) = copy_with_checksum(source, &temp.path, checksum_type).await?;

    let path = dir.join(file_name(&checksum));
    fs::rename(&temp.path, &path)
        .await
        .map_err(|e| CacheError::io(&path, e))?;
    temp.disarm();

    Ok(StoredCopy {
        path,
        size,
        checksum,
    })
}
