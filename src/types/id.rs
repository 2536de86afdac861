//! Entity identifiers and the locally-created id convention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use super::entity::EntityType;

/// Unique identifier for an entity in the graph.
///
/// Wraps an opaque string. Identifiers minted by the editor for entities that
/// have no counterpart in persisted storage yet carry a negative-number-like
/// suffix (`pt-1`, `pa-2`, `gr-3`); identifiers that originated from persisted
/// storage never do. The graph's classification queries rely on this lexical
/// distinction alone, never on graph state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

/// Counter for locally-minted ids. Process-wide so ids stay unique across
/// graphs within one editing session.
static NEXT_LOCAL: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    /// Create an id from an existing string (typically from persisted storage).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh locally-created id for the given entity type.
    pub fn local(entity_type: EntityType) -> Self {
        let n = NEXT_LOCAL.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", entity_type.prefix(), n))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id has the locally-created lexical form, per the default
    /// [`LocalIdRule`].
    pub fn is_local(&self) -> bool {
        LocalIdRule::default_rule().is_local(self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Error when constructing a [`LocalIdRule`] from an invalid pattern.
#[derive(Debug, thiserror::Error)]
pub enum IdRuleError {
    /// The supplied pattern is not a valid regular expression.
    #[error("Invalid local-id pattern: {0}")]
    InvalidPattern(#[from] regex_lite::Error),
}

/// Default lexical pattern for locally-created ids: a negative-number-like
/// suffix.
pub const DEFAULT_LOCAL_ID_PATTERN: &str = r"-[0-9]+$";

/// Lexical rule deciding whether an id is locally created.
///
/// The grammar is an external convention, so the rule is pluggable: callers
/// with a different id scheme construct their own rule and pass it to the
/// `_with` classification queries on the graph. The rule is a pure predicate
/// over the id text, with no dependence on graph state.
#[derive(Debug, Clone)]
pub struct LocalIdRule {
    pattern: regex_lite::Regex,
}

impl LocalIdRule {
    /// Build a rule from a regular-expression pattern.
    pub fn new(pattern: &str) -> Result<Self, IdRuleError> {
        Ok(Self {
            pattern: regex_lite::Regex::new(pattern)?,
        })
    }

    /// Whether the given id matches this rule's locally-created form.
    pub fn is_local(&self, id: &EntityId) -> bool {
        self.pattern.is_match(id.as_str())
    }

    /// The shared default rule (negative-number-like suffix).
    pub fn default_rule() -> &'static LocalIdRule {
        static DEFAULT: OnceLock<LocalIdRule> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            LocalIdRule::new(DEFAULT_LOCAL_ID_PATTERN)
                .expect("default local-id pattern is valid")
        })
    }
}

impl Default for LocalIdRule {
    fn default() -> Self {
        Self::default_rule().clone()
    }
}
