//! Named string format checks.
//!
//! A [`FormatRegistry`] maps format names to predicates. It is assembled with
//! [`FormatRegistryBuilder`] and is read-only once built; validators share it
//! through an `Arc`.
//!
//! ```rust
//! use schemaforge_schema::FormatRegistry;
//!
//! let registry = FormatRegistry::builder()
//!     .with_builtins()
//!     .register("even-length", |s| s.len() % 2 == 0)
//!     .build();
//!
//! assert_eq!(registry.check("email", "a@example.com"), Some(true));
//! assert_eq!(registry.check("even-length", "abc"), Some(false));
//! assert_eq!(registry.check("unknown", "abc"), None);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// A format predicate.
pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid hostname regex")
});

static DEFAULT_REGISTRY: Lazy<Arc<FormatRegistry>> =
    Lazy::new(|| Arc::new(FormatRegistry::builder().with_builtins().build()));

/// Frozen map of format names to predicates.
#[derive(Clone)]
pub struct FormatRegistry {
    formats: HashMap<String, FormatPredicate>,
}

impl FormatRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> FormatRegistryBuilder {
        FormatRegistryBuilder::default()
    }

    /// A registry with no formats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// The shared registry holding the built-in formats.
    #[must_use]
    pub fn shared() -> Arc<FormatRegistry> {
        Arc::clone(&DEFAULT_REGISTRY)
    }

    /// Check a value. `None` when the format is not registered.
    #[must_use]
    pub fn check(&self, format: &str, value: &str) -> Option<bool> {
        self.formats.get(format).map(|predicate| predicate(value))
    }

    #[must_use]
    pub fn contains(&self, format: &str) -> bool {
        self.formats.contains_key(format)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.formats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::builder().with_builtins().build()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

/// Builder for [`FormatRegistry`].
#[derive(Default)]
pub struct FormatRegistryBuilder {
    formats: HashMap<String, FormatPredicate>,
}

impl FormatRegistryBuilder {
    /// Add the built-in formats.
    #[must_use]
    pub fn with_builtins(self) -> Self {
        self.register("email", |s| EMAIL.is_match(s))
            .register("hostname", |s| s.len() <= 253 && HOSTNAME.is_match(s))
            .register("uri", is_uri)
            .register("uuid", is_uuid)
            .register("date-time", is_date_time)
            .register("date", |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
            .register("time", is_time)
            .register("ipv4", |s| s.parse::<Ipv4Addr>().is_ok())
            .register("ipv6", |s| s.parse::<Ipv6Addr>().is_ok())
    }

    /// Register (or replace) a format.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> FormatRegistry {
        FormatRegistry {
            formats: self.formats,
        }
    }
}

fn is_uri(s: &str) -> bool {
    s.contains("://") && url::Url::parse(s).is_ok()
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::parse_str(s).is_ok()
}

fn is_date_time(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

fn is_time(s: &str) -> bool {
    let local = if let Some(stripped) = s.strip_suffix('Z') {
        stripped
    } else if s.len() > 6 && matches!(s.as_bytes()[s.len() - 6], b'+' | b'-') {
        let (time, offset) = s.split_at(s.len() - 6);
        if NaiveTime::parse_from_str(&offset[1..], "%H:%M").is_err() {
            return false;
        }
        time
    } else {
        s
    };
    NaiveTime::parse_from_str(local, "%H:%M:%S%.f").is_ok()
}
