// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SHA-256 fingerprints over task arguments and file contents.

use kiln_core::Filesystem;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// JSON with object keys sorted, so field order never changes a checksum.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = sort_keys(serde_json::to_value(value)?);
    serde_json::to_string(&value)
}

/// Rebuild every map in key order. `serde_json::Map` keeps insertion order
/// when its `preserve_order` feature is on anywhere in the build.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(key, value)| (key, sort_keys(value))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Checksum of the canonical JSON form of `value`.
pub fn of_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(value)?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

/// Checksum of the concatenated contents of `files`, in order.
pub fn of_files<P: AsRef<Path>>(fs: &dyn Filesystem, files: &[P]) -> io::Result<String> {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(fs.read(file.as_ref())?);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Expand `patterns` in order; matches within one pattern are sorted.
pub fn resolve_inputs(fs: &dyn Filesystem, patterns: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        files.extend(fs.glob(pattern)?);
    }
    Ok(files)
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod tests;
