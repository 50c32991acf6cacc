// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem capability handed to executors through a session.
//!
//! Paths are relative to the filesystem root. [`LocalFs`] is backed by a
//! directory on disk; [`MemoryFs`] keeps everything in memory for tests and
//! `Test` workspaces.

use glob::{MatchOptions, Pattern};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait Filesystem: Send + Sync + fmt::Debug {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a file, creating parent directories as needed.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Files matching `pattern`, relative to the root, sorted.
    fn glob(&self, pattern: &str) -> io::Result<Vec<PathBuf>>;

    /// On-disk root, when there is one.
    fn root(&self) -> Option<&Path> {
        None
    }
}

fn invalid_pattern(pattern: &str, e: impl fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("invalid pattern {pattern:?}: {e}"))
}

/// Drop `.` components and any leading root so paths stay relative.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
        .collect()
}

/// Filesystem rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
    /// Subtrees, relative to the root, that `glob` never matches.
    excluded: Vec<PathBuf>,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), excluded: Vec::new() }
    }

    /// Hide the subtree at `path` from `glob`. Direct reads still work.
    pub fn excluding(mut self, path: impl AsRef<Path>) -> Self {
        self.excluded.push(normalize(path.as_ref()));
        self
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.excluded.iter().any(|dir| relative.starts_with(dir))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(normalize(path))
    }
}

impl Filesystem for LocalFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, data)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(self.resolve(path))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(self.resolve(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn glob(&self, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let escaped_root = Pattern::escape(&self.root.to_string_lossy());
        let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
        let entries = glob::glob(&full).map_err(|e| invalid_pattern(pattern, e))?;
        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(io::Error::other)?;
            if !path.is_file() {
                continue;
            }
            match path.strip_prefix(&self.root) {
                Ok(relative) if !self.is_excluded(relative) => {
                    matches.push(relative.to_path_buf())
                }
                _ => {}
            }
        }
        matches.sort();
        Ok(matches)
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// In-memory filesystem.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
    }
}

impl Filesystem for MemoryFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = normalize(path);
        self.files.read().get(&path).cloned().ok_or_else(|| Self::not_found(&path))
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let path = normalize(path);
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        self.files.write().insert(path, data.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut dirs = self.dirs.write();
        let mut current = PathBuf::new();
        for component in normalize(path).components() {
            current.push(component);
            dirs.insert(current.clone());
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        self.files.write().remove(&path).map(|_| ()).ok_or_else(|| Self::not_found(&path))
    }

    fn exists(&self, path: &Path) -> bool {
        let path = normalize(path);
        path.as_os_str().is_empty()
            || self.files.read().contains_key(&path)
            || self.dirs.read().contains(&path)
    }

    fn glob(&self, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let compiled = Pattern::new(pattern).map_err(|e| invalid_pattern(pattern, e))?;
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        // BTreeMap iteration is already sorted
        Ok(self
            .files
            .read()
            .keys()
            .filter(|path| compiled.matches_path_with(path, options))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
