// SPDX-License-Identifier: MIT

//! ID generation and the newtype-ID macro shared by task, agent, and
//! workflow identifiers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Truncates an identifier to a short prefix for log lines and CLI tables.
pub trait ShortId {
    fn short(&self, n: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, n: usize) -> &str {
        if self.len() <= n {
            self
        } else {
            &self[..n]
        }
    }
}

/// Defines a newtype ID wrapper around `String` with the usual set of
/// conversions and a `short()` helper for display.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn short(&self, n: usize) -> &str {
                $crate::id::ShortId::short(self.0.as_str(), n)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
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

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
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

/// Generates unique identifiers. Implementors must be cheap to clone and
/// safe to share across the async worker pool.
pub trait IdGen: Clone + Send + Sync {
    /// Returns a new, globally-unique identifier, monotonic-prefixed by
    /// wall-clock milliseconds per the task ID shape in the data model.
    fn next(&self, clock_ms: u64) -> String;
}

/// Production ID generator: `{epoch_ms}-{8 hex chars}`, matching the
/// "wall-clock + random suffix" shape required for task IDs.
#[derive(Clone, Default)]
pub struct RandomIdGen;

impl IdGen for RandomIdGen {
    fn next(&self, clock_ms: u64) -> String {
        use rand::Rng;
        let mut rng = rand::rng();
        let suffix: String = (0..8)
            .map(|_| format!("{:x}", rng.random_range(0..16u8)))
            .collect();
        format!("{clock_ms:013}-{suffix}")
    }
}

/// Deterministic, sequential ID generator for tests.
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self, _clock_ms: u64) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
