//! Tarball integrity verification.
//!
//! Registry manifests carry a legacy SHA-1 `shasum` and, for most packages,
//! a subresource-integrity string. The SHA-512 SRI hash is preferred when
//! present.

use base64::{engine::general_purpose, Engine as _};
use sha1::Sha1;
use sha2::{Digest, Sha512};
use std::io::{self, Read};
use std::path::Path;

use crate::error::{UntypedError, UntypedResult};
use crate::types::DistInfo;

const SHA512_PREFIX: &str = "sha512-";

/// Compute the hex SHA-1 of data
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Compute the `sha512-<base64>` SRI string of data
pub fn sha512_integrity(data: &[u8]) -> String {
    format!("{}{}", SHA512_PREFIX, general_purpose::STANDARD.encode(Sha512::digest(data)))
}

/// Verify streamed data against the checksums in `dist`.
///
/// Passes trivially when the manifest carries no checksum at all.
pub fn verify_integrity<R: Read>(mut reader: R, dist: &DistInfo, package: &str) -> UntypedResult<()> {
    let read_err = |e: io::Error| UntypedError::corrupt(package, format!("failed to read archive: {}", e));

    if let Some(expected) = preferred_sri(dist) {
        let mut hasher = Sha512::new();
        io::copy(&mut reader, &mut hasher).map_err(read_err)?;
        let actual = general_purpose::STANDARD.encode(hasher.finalize());
        return check(package, expected, &actual);
    }

    if !dist.shasum.is_empty() {
        let mut hasher = Sha1::new();
        io::copy(&mut reader, &mut hasher).map_err(read_err)?;
        let actual = hex::encode(hasher.finalize());
        return check(package, &dist.shasum.to_ascii_lowercase(), &actual);
    }

    Ok(())
}

/// Verify a file on disk against the checksums in `dist`
pub fn verify_file_integrity(path: &Path, dist: &DistInfo, package: &str) -> UntypedResult<()> {
    let file = std::fs::File::open(path)
        .map_err(|e| UntypedError::io(format!("Failed to open {}", path.display()), e))?;
    verify_integrity(io::BufReader::new(file), dist, package)
}

/// Base64 SHA-512 digest from the SRI string, if it has one
fn preferred_sri(dist: &DistInfo) -> Option<&str> {
    dist.integrity
        .as_deref()?
        .split_whitespace()
        .find_map(|token| token.strip_prefix(SHA512_PREFIX))
}

fn check(package: &str, expected: &str, actual: &str) -> UntypedResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(UntypedError::IntegrityFailure {
            package: package.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
