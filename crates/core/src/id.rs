// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types: random session ids and hierarchical dotted names.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::path::PathBuf;

/// Separator between segments of task ids and executor names.
pub const SEPARATOR: char = '.';

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Split a dotted name at the first separator.
///
/// `"a.b.c"` → `("a", Some("b.c"))`, `"a"` → `("a", None)`.
pub fn split_first(name: &str) -> (&str, Option<&str>) {
    match name.split_once(SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (name, None),
    }
}

/// Join two dotted names, skipping empty sides.
pub fn join(prefix: &str, suffix: &str) -> String {
    match (prefix.is_empty(), suffix.is_empty()) {
        (true, _) => suffix.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}{SEPARATOR}{suffix}"),
    }
}

/// Random session identifier, `ses-` followed by a 19 character nanoid.
///
/// Parsed ids are taken as-is so hosts and plugins can agree on ids the
/// other side generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(SmolStr);

impl SessionId {
    pub const PREFIX: &'static str = "ses-";

    pub fn new() -> Self {
        Self(SmolStr::new(format!("{}{}", Self::PREFIX, nanoid::nanoid!(19))))
    }

    pub fn from_string(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The random part, without the prefix.
    pub fn suffix(&self) -> &str {
        self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::borrow::Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for SessionId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Fully qualified, dot-separated task identifier.
///
/// Follow-up tasks are qualified under the id of the task that produced
/// them, so `build` spawning `compile` yields `build.compile`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the dotted segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Qualify `child` under this id.
    pub fn child(&self, child: &TaskId) -> TaskId {
        TaskId(join(&self.0, &child.0))
    }

    /// The id with its last segment removed, if it has more than one.
    pub fn parent(&self) -> Option<TaskId> {
        self.0.rsplit_once(SEPARATOR).map(|(parent, _)| TaskId(parent.to_string()))
    }

    /// The last segment.
    pub fn leaf(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Relative directory holding this task's outputs: one path component
    /// per segment, so `a.b.c` maps to `a/b/c`.
    pub fn output_dir(&self) -> PathBuf {
        self.segments()
            .filter(|s| !s.is_empty())
            .map(|s| s.replace(['/', '\\'], "_"))
            .collect()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for TaskId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
