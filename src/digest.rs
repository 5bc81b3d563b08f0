//! Content fingerprinting.
//!
//! Streams a file in fixed-size chunks through a 64-bit xxHash (seed
//! 0) and returns the lower-case hex digest. Chosen for speed over
//! cryptographic strength: we only need "changed with high
//! probability", not collision resistance against an adversary.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use xxhash_rust::xxh64::Xxh64;

use crate::error::{BackupError, Result};

const CHUNK_SIZE: usize = 8 * 1024;
const SEED: u64 = 0;

/// Hashes the full contents of `path`, returning the digest as
/// lower-case hex with no leading zeros.
pub fn digest(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|source| BackupError::Digest {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Xxh64::new(SEED);
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).map_err(|source| BackupError::Digest {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.digest()))
}
