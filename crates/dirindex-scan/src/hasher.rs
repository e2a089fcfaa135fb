//! Streaming SHA-256 content hashing.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use dirindex_core::{ContentHash, HashError};

const MEBIBYTE: f64 = 1024.0 * 1024.0;

/// Result of hashing one file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashOutput {
    pub hash: ContentHash,
    /// Bytes streamed through the digest.
    pub bytes: u64,
    /// Plain read throughput in MB/s, instrumented mode only.
    pub read_speed: Option<f64>,
    /// Hashing throughput in MB/s, instrumented mode only.
    pub hash_speed: Option<f64>,
}

/// Streams file contents through SHA-256 without buffering whole files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher {
    instrument: bool,
}

impl Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// In instrumented mode every file is read twice: once to measure raw
    /// read speed, once through the digest. Both speeds are logged.
    pub fn instrumented(instrument: bool) -> Self {
        Self { instrument }
    }

    /// Digest everything a reader yields.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> Result<(ContentHash, u64), HashError> {
        let mut digest = Sha256::new();
        let bytes = io::copy(reader, &mut digest).map_err(HashError::Digest)?;
        Ok((ContentHash::new(digest.finalize().into()), bytes))
    }

    pub fn hash_file(&self, path: &Path) -> Result<HashOutput, HashError> {
        let mut file = File::open(path).map_err(HashError::Open)?;

        let read_speed = if self.instrument {
            let start = Instant::now();
            let bytes = io::copy(&mut file, &mut io::sink()).map_err(HashError::Read)?;
            let speed = megabytes_per_second(bytes, start.elapsed());
            tracing::info!(
                path = %path.display(),
                size_mb = bytes as f64 / MEBIBYTE,
                "read speed {speed:.2} MB/s"
            );
            file.seek(SeekFrom::Start(0)).map_err(HashError::Seek)?;
            Some(speed)
        } else {
            None
        };

        let start = Instant::now();
        let (hash, bytes) = self.hash_reader(&mut file)?;

        let hash_speed = self.instrument.then(|| {
            let speed = megabytes_per_second(bytes, start.elapsed());
            tracing::info!(
                path = %path.display(),
                size_mb = bytes as f64 / MEBIBYTE,
                "hash speed {speed:.2} MB/s"
            );
            speed
        });

        Ok(HashOutput {
            hash,
            bytes,
            read_speed,
            hash_speed,
        })
    }
}

fn megabytes_per_second(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / MEBIBYTE / secs
    } else {
        0.0
    }
}
