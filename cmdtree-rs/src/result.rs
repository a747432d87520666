//! Execution results and the completion hook.

use crate::context::CommandContext;
use serde::Serialize;
use std::iter::Sum;
use std::ops::Add;

/// How many command actions fired. Merging adds counts; zero is the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CommandResult {
    count: i32,
}

impl CommandResult {
    pub const fn empty() -> Self {
        Self { count: 0 }
    }

    pub const fn succeed() -> Self {
        Self { count: 1 }
    }

    pub const fn of(count: i32) -> Self {
        Self { count }
    }

    pub const fn count(&self) -> i32 {
        self.count
    }

    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            count: self.count.saturating_add(other.count),
        }
    }
}

impl Add for CommandResult {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.merge(rhs)
    }
}

impl Sum for CommandResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::empty(), Self::merge)
    }
}

/// Observes every action attempt and every top-level failure.
pub trait ResultConsumer: Send + Sync {
    fn on_command_complete(&self, context: &CommandContext, success: bool, result: CommandResult);
}

impl<F> ResultConsumer for F
where
    F: Fn(&CommandContext, bool, CommandResult) + Send + Sync,
{
    fn on_command_complete(&self, context: &CommandContext, success: bool, result: CommandResult) {
        self(context, success, result)
    }
}

/// Default consumer: logs outcomes at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingConsumer;

impl ResultConsumer for LoggingConsumer {
    fn on_command_complete(&self, context: &CommandContext, success: bool, result: CommandResult) {
        tracing::debug!(
            sender = %context.sender().name(),
            input = %context.input(),
            success,
            count = result.count(),
            "Command completed"
        );
    }
}
