//! Who is running a command.
//!
//! The dispatcher never creates or validates senders. It threads them through
//! contexts and hands them to redirect modifiers, which may swap one sender for
//! several.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Capability object for the party executing a command.
pub trait CommandSender: Send + Sync {
    /// Display name, used in logs.
    fn name(&self) -> &str;

    /// Whether the sender holds `permission`.
    fn has_permission(&self, permission: &str) -> bool;

    /// Deliver feedback to the sender.
    fn send_message(&self, message: &str);
}

/// Shared handle to a sender.
pub type SenderRef = Arc<dyn CommandSender>;

impl fmt::Debug for dyn CommandSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("name", &self.name())
            .finish()
    }
}

/// Registration boundary: commands registered on behalf of a plugin can be
/// listed and removed together.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

// ============================================================================
// Recording sender
// ============================================================================

/// A sender that remembers every message it receives.
///
/// Grants every permission unless built with [`RecordingSender::with_permissions`].
#[derive(Debug, Default)]
pub struct RecordingSender {
    name: String,
    permissions: Option<BTreeSet<String>>,
    messages: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A sender holding exactly `permissions`.
    pub fn with_permissions<I, S>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            permissions: Some(permissions.into_iter().map(Into::into).collect()),
            messages: Mutex::default(),
        }
    }

    /// Wrap in a [`SenderRef`].
    pub fn shared(self) -> SenderRef {
        Arc::new(self)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .map_or(true, |granted| granted.contains(permission))
    }

    fn send_message(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_owned());
    }
}
