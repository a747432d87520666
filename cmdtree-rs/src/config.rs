//! Dispatcher configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for a [`CommandDispatcher`](crate::CommandDispatcher).
///
/// Deserializes from partial documents; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Deadline for each suggestion provider. A provider that misses it
    /// contributes no suggestions.
    pub suggestion_timeout_ms: Option<u64>,

    /// Turn panics inside argument parsers into parse errors.
    pub catch_parser_panics: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            suggestion_timeout_ms: None,
            catch_parser_panics: true,
        }
    }
}

impl DispatcherConfig {
    pub fn suggestion_timeout(&self) -> Option<Duration> {
        self.suggestion_timeout_ms.map(Duration::from_millis)
    }
}
