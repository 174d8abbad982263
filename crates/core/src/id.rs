// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier generation: UUIDv7 run/event ids and string newtypes.

#[cfg(any(test, feature = "test-support"))]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;

use uuid::Uuid;

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Task identifier (e.g. `DOCS-1`), assigned by the PM.
    pub struct TaskId;
}

define_id! {
    /// Run identifier, `r-<uuidv7>`. One task has at most one open run.
    pub struct RunId;
}

/// RFC 9562 UUIDv7 as a hyphenated string.
///
/// Lexicographic order agrees with creation time to millisecond resolution.
pub fn uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Prefixed run identifier, `"<prefix>-<uuid_v7>"`.
pub fn run_id(prefix: &str) -> RunId {
    RunId(format!("{prefix}-{}", uuid_v7()))
}

/// Event identifier, `"e-<uuid_v7 hex>"` (no hyphens in the UUID part).
pub fn event_id() -> String {
    format!("e-{}", Uuid::now_v7().simple())
}

/// Generates unique identifiers
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUIDv7-based generator for production use.
#[derive(Clone)]
pub struct UuidV7Gen {
    prefix: String,
}

impl UuidV7Gen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl IdGen for UuidV7Gen {
    fn next(&self) -> String {
        format!("{}-{}", self.prefix, uuid_v7())
    }
}

/// Sequential generator for deterministic tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

#[cfg(any(test, feature = "test-support"))]
impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
