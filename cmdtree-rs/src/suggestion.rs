//! Completion candidates.
//!
//! A [`Suggestion`] replaces a range of the input with new text. A
//! [`Suggestions`] set holds candidates normalised to a single range, so
//! sets produced by different nodes can be merged and compared.

use crate::context::CommandContext;
use crate::error::CommandSyntaxError;
use crate::range::TextRange;
use async_trait::async_trait;
use serde::Serialize;
use std::cmp::Ordering;

// ============================================================================
// Suggestion
// ============================================================================

/// Replace `range` of the input with `text`.
///
/// Integer suggestions also keep their numeric value and sort by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Suggestion {
    range: TextRange,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tooltip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<i32>,
}

impl Suggestion {
    pub fn new(range: TextRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
            tooltip: None,
            value: None,
        }
    }

    pub fn with_tooltip(range: TextRange, text: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
            tooltip: Some(tooltip.into()),
            value: None,
        }
    }

    pub fn integer(range: TextRange, value: i32) -> Self {
        Self {
            range,
            text: value.to_string(),
            tooltip: None,
            value: Some(value),
        }
    }

    pub fn integer_with_tooltip(range: TextRange, value: i32, tooltip: impl Into<String>) -> Self {
        Self {
            tooltip: Some(tooltip.into()),
            ..Self::integer(range, value)
        }
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// The number behind an integer suggestion.
    pub fn value(&self) -> Option<i32> {
        self.value
    }

    /// The input with this suggestion applied.
    pub fn apply(&self, input: &str) -> String {
        if self.range.start == 0 && self.range.end == input.len() {
            return self.text.clone();
        }
        let mut result = String::with_capacity(input.len() + self.text.len());
        result.push_str(input.get(..self.range.start).unwrap_or(input));
        result.push_str(&self.text);
        if let Some(tail) = input.get(self.range.end..) {
            result.push_str(tail);
        }
        result
    }

    /// Widen to `range`, pulling the surrounding text of `command` into the replacement.
    pub fn expand(&self, command: &str, range: TextRange) -> Suggestion {
        if range == self.range {
            return self.clone();
        }
        let mut text = String::new();
        if range.start < self.range.start {
            text.push_str(TextRange::between(range.start, self.range.start).get(command));
        }
        text.push_str(&self.text);
        if range.end > self.range.end {
            text.push_str(TextRange::between(self.range.end, range.end).get(command));
        }
        Suggestion {
            range,
            text,
            tooltip: self.tooltip.clone(),
            value: None,
        }
    }

    /// Integers first, by value; then text, case-insensitively.
    fn display_order(&self, other: &Self) -> Ordering {
        let by_text = || {
            self.text
                .to_lowercase()
                .cmp(&other.text.to_lowercase())
                .then_with(|| self.text.cmp(&other.text))
        };
        match (self.value, other.value) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => by_text(),
        }
        .then_with(|| self.tooltip.cmp(&other.tooltip))
    }
}

// ============================================================================
// Suggestions
// ============================================================================

/// A sorted, deduplicated set of suggestions sharing one range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestions {
    range: TextRange,
    list: Vec<Suggestion>,
}

impl Suggestions {
    pub fn empty() -> Self {
        Self {
            range: TextRange::at(0),
            list: Vec::new(),
        }
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn list(&self) -> &[Suggestion] {
        &self.list
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Texts in display order.
    pub fn texts(&self) -> Vec<&str> {
        self.list.iter().map(Suggestion::text).collect()
    }

    /// Union of several sets over the same `command`.
    pub fn merge(command: &str, input: Vec<Suggestions>) -> Suggestions {
        match input.len() {
            0 => Suggestions::empty(),
            1 => input.into_iter().next().unwrap_or_else(Suggestions::empty),
            _ => Suggestions::create(command, input.into_iter().flat_map(|s| s.list)),
        }
    }

    /// Normalise `suggestions` to their encompassing range, drop duplicate
    /// (range, text) pairs and sort them for display.
    pub fn create(command: &str, suggestions: impl IntoIterator<Item = Suggestion>) -> Suggestions {
        let suggestions: Vec<Suggestion> = suggestions.into_iter().collect();
        let Some(range) = suggestions
            .iter()
            .map(Suggestion::range)
            .reduce(TextRange::encompassing)
        else {
            return Suggestions::empty();
        };

        let mut list: Vec<Suggestion> = suggestions
            .iter()
            .map(|suggestion| suggestion.expand(command, range))
            .collect();
        list.sort_by(Suggestion::display_order);
        list.dedup_by(|a, b| a.range == b.range && a.text == b.text && a.value == b.value);
        Suggestions { range, list }
    }
}

impl Default for Suggestions {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects suggestions for the text from `start` to the end of `input`.
#[derive(Debug, Clone)]
pub struct SuggestionsBuilder {
    input: String,
    start: usize,
    result: Vec<Suggestion>,
}

impl SuggestionsBuilder {
    pub fn new(input: impl Into<String>, start: usize) -> Self {
        let input = input.into();
        let start = start.min(input.len());
        Self {
            input,
            start,
            result: Vec::new(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// What the user has typed for the current token.
    pub fn remaining(&self) -> &str {
        self.input.get(self.start..).unwrap_or("")
    }

    pub fn remaining_lowercase(&self) -> String {
        self.remaining().to_lowercase()
    }

    /// Offer `text`. Ignored when it equals what is already typed.
    pub fn suggest(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if text != self.remaining() {
            let range = TextRange::between(self.start, self.input.len());
            self.result.push(Suggestion::new(range, text));
        }
        self
    }

    pub fn suggest_with_tooltip(&mut self, text: impl Into<String>, tooltip: impl Into<String>) -> &mut Self {
        let text = text.into();
        if text != self.remaining() {
            let range = TextRange::between(self.start, self.input.len());
            self.result.push(Suggestion::with_tooltip(range, text, tooltip));
        }
        self
    }

    /// Offer a number. Sorts numerically against other numbers.
    pub fn suggest_int(&mut self, value: i32) -> &mut Self {
        let range = TextRange::between(self.start, self.input.len());
        self.result.push(Suggestion::integer(range, value));
        self
    }

    pub fn suggest_int_with_tooltip(&mut self, value: i32, tooltip: impl Into<String>) -> &mut Self {
        let range = TextRange::between(self.start, self.input.len());
        self.result.push(Suggestion::integer_with_tooltip(range, value, tooltip));
        self
    }

    /// A fresh builder over the same input and start.
    pub fn restart(&self) -> SuggestionsBuilder {
        SuggestionsBuilder::new(self.input.clone(), self.start)
    }

    pub fn build(self) -> Suggestions {
        Suggestions::create(&self.input, self.result)
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Custom completion source attached to an argument node.
///
/// Providers run as independent tasks and should be cheap and side-effect free.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn suggestions(
        &self,
        context: &CommandContext,
        builder: SuggestionsBuilder,
    ) -> Result<Suggestions, CommandSyntaxError>;
}

#[async_trait]
impl<F> SuggestionProvider for F
where
    F: Fn(&CommandContext, SuggestionsBuilder) -> Result<Suggestions, CommandSyntaxError> + Send + Sync,
{
    async fn suggestions(
        &self,
        context: &CommandContext,
        builder: SuggestionsBuilder,
    ) -> Result<Suggestions, CommandSyntaxError> {
        self(context, builder)
    }
}
