//! Parse state: context builders, frozen contexts and parse results.

use crate::arguments::ParsedArgument;
use crate::error::{CommandSyntaxError, ErrorKind};
use crate::node::{Command, CommandNode, NodeId, RedirectModifier};
use crate::range::TextRange;
use crate::reader::TextReader;
use crate::sender::SenderRef;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A matched node and the input it consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommandNode {
    pub node: NodeId,
    pub range: TextRange,
}

/// The tree level a completion request should query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionContext {
    /// Node whose children are asked for suggestions.
    pub parent: NodeId,
    /// Start of the token being completed.
    pub start: usize,
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates matched nodes and arguments during one descent.
///
/// Cloning yields an independent copy; sibling attempts each work on their own
/// clone so a failed attempt leaves nothing behind.
#[derive(Clone)]
pub struct CommandContextBuilder {
    sender: SenderRef,
    root: NodeId,
    range: TextRange,
    nodes: Vec<ParsedCommandNode>,
    arguments: BTreeMap<String, ParsedArgument>,
    command: Option<Command>,
    child: Option<Box<CommandContextBuilder>>,
    modifier: Option<RedirectModifier>,
    fork: bool,
}

impl CommandContextBuilder {
    pub fn new(sender: SenderRef, root: NodeId, start: usize) -> Self {
        Self {
            sender,
            root,
            range: TextRange::at(start),
            nodes: Vec::new(),
            arguments: BTreeMap::new(),
            command: None,
            child: None,
            modifier: None,
            fork: false,
        }
    }

    pub fn sender(&self) -> &SenderRef {
        &self.sender
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Span of everything matched so far.
    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn nodes(&self) -> &[ParsedCommandNode] {
        &self.nodes
    }

    pub fn arguments(&self) -> &BTreeMap<String, ParsedArgument> {
        &self.arguments
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn child(&self) -> Option<&CommandContextBuilder> {
        self.child.as_deref()
    }

    /// Deepest builder of the redirect chain.
    pub fn last_child(&self) -> &CommandContextBuilder {
        let mut current = self;
        while let Some(child) = current.child() {
            current = child;
        }
        current
    }

    pub fn is_fork(&self) -> bool {
        self.fork
    }

    pub fn with_sender(&mut self, sender: SenderRef) -> &mut Self {
        self.sender = sender;
        self
    }

    pub fn with_argument(&mut self, name: impl Into<String>, argument: ParsedArgument) -> &mut Self {
        self.arguments.insert(name.into(), argument);
        self
    }

    pub fn with_command(&mut self, command: Option<Command>) -> &mut Self {
        self.command = command;
        self
    }

    /// Record a matched node, taking over its redirect modifier and fork flag.
    pub fn with_node(&mut self, id: NodeId, node: &CommandNode, range: TextRange) -> &mut Self {
        self.nodes.push(ParsedCommandNode { node: id, range });
        self.range = TextRange::encompassing(self.range, range);
        self.modifier = node.modifier.clone();
        self.fork = node.fork;
        self
    }

    pub fn with_child(&mut self, child: CommandContextBuilder) -> &mut Self {
        self.child = Some(Box::new(child));
        self
    }

    /// Locate the node frame whose children should be asked to complete the
    /// token at `cursor`. `None` when `cursor` lies before this builder.
    pub fn find_suggestion_context(&self, cursor: usize) -> Option<SuggestionContext> {
        let mut builder = self;
        loop {
            if builder.range.start > cursor {
                return None;
            }
            if builder.range.end >= cursor {
                break;
            }
            match builder.child() {
                Some(child) => builder = child,
                None => {
                    return Some(match builder.nodes.last() {
                        Some(last) => SuggestionContext {
                            parent: last.node,
                            start: last.range.end + 1,
                        },
                        None => SuggestionContext {
                            parent: builder.root,
                            start: builder.range.start,
                        },
                    });
                }
            }
        }

        let mut previous = builder.root;
        for parsed in &builder.nodes {
            if parsed.range.contains(cursor) {
                return Some(SuggestionContext {
                    parent: previous,
                    start: parsed.range.start,
                });
            }
            previous = parsed.node;
        }
        Some(SuggestionContext {
            parent: previous,
            start: builder.range.start,
        })
    }

    /// Freeze the builder chain into an immutable context over `input`.
    pub fn build(&self, input: impl Into<Arc<str>>) -> CommandContext {
        let input = input.into();
        let mut chain = Vec::new();
        let mut current = self.child();
        while let Some(builder) = current {
            chain.push(builder);
            current = builder.child();
        }
        let mut child = None;
        for builder in chain.into_iter().rev() {
            child = Some(Arc::new(builder.freeze(&input, child)));
        }
        self.freeze(&input, child)
    }

    fn freeze(&self, input: &Arc<str>, child: Option<Arc<CommandContext>>) -> CommandContext {
        CommandContext {
            sender: Arc::clone(&self.sender),
            input: Arc::clone(input),
            arguments: Arc::new(self.arguments.clone()),
            command: self.command.clone(),
            root: self.root,
            nodes: self.nodes.clone().into(),
            range: self.range,
            child,
            modifier: self.modifier.clone(),
            fork: self.fork,
        }
    }
}

impl fmt::Debug for CommandContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContextBuilder")
            .field("sender", &self.sender.name())
            .field("root", &self.root)
            .field("range", &self.range)
            .field("nodes", &self.nodes)
            .field("arguments", &self.arguments)
            .field("executable", &self.command.is_some())
            .field("child", &self.child)
            .field("fork", &self.fork)
            .finish()
    }
}

// ============================================================================
// Context
// ============================================================================

/// Immutable result of a descent, handed to actions and modifiers.
///
/// Cloning is cheap: node lists and argument maps are shared.
#[derive(Clone)]
pub struct CommandContext {
    sender: SenderRef,
    input: Arc<str>,
    arguments: Arc<BTreeMap<String, ParsedArgument>>,
    command: Option<Command>,
    root: NodeId,
    nodes: Arc<[ParsedCommandNode]>,
    range: TextRange,
    child: Option<Arc<CommandContext>>,
    modifier: Option<RedirectModifier>,
    fork: bool,
}

impl CommandContext {
    /// Typed value of argument `name`.
    pub fn argument<V: Clone + 'static>(&self, name: &str) -> Result<V, CommandSyntaxError> {
        let parsed = self
            .arguments
            .get(name)
            .ok_or_else(|| ErrorKind::NoSuchArgument(name.to_owned()).into_error())?;
        parsed.value().downcast_ref::<V>().cloned().ok_or_else(|| {
            ErrorKind::ArgumentTypeMismatch {
                name: name.to_owned(),
                expected: std::any::type_name::<V>(),
                found: parsed.value().type_name(),
            }
            .into_error()
        })
    }

    pub fn parsed_argument(&self, name: &str) -> Option<&ParsedArgument> {
        self.arguments.get(name)
    }

    pub fn arguments(&self) -> &BTreeMap<String, ParsedArgument> {
        &self.arguments
    }

    /// The same context running as `sender`.
    pub fn copy_for(&self, sender: &SenderRef) -> CommandContext {
        if Arc::ptr_eq(&self.sender, sender) {
            return self.clone();
        }
        CommandContext {
            sender: Arc::clone(sender),
            ..self.clone()
        }
    }

    pub fn sender(&self) -> &SenderRef {
        &self.sender
    }

    /// The full command line.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn nodes(&self) -> &[ParsedCommandNode] {
        &self.nodes
    }

    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn child(&self) -> Option<&CommandContext> {
        self.child.as_deref()
    }

    /// Deepest context of the redirect chain.
    pub fn last_child(&self) -> &CommandContext {
        let mut current = self;
        while let Some(child) = current.child() {
            current = child;
        }
        current
    }

    pub fn redirect_modifier(&self) -> Option<&RedirectModifier> {
        self.modifier.as_ref()
    }

    pub fn is_fork(&self) -> bool {
        self.fork
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("sender", &self.sender.name())
            .field("input", &self.input)
            .field("range", &self.range)
            .field("nodes", &self.nodes)
            .field("arguments", &self.arguments)
            .field("executable", &self.command.is_some())
            .field("child", &self.child)
            .field("fork", &self.fork)
            .finish()
    }
}

// ============================================================================
// Parse results
// ============================================================================

/// Outcome of parsing one command line.
#[derive(Debug, Clone)]
pub struct ParseResults {
    context: CommandContextBuilder,
    reader: TextReader,
    errors: BTreeMap<NodeId, CommandSyntaxError>,
}

impl ParseResults {
    pub(crate) fn new(
        context: CommandContextBuilder,
        reader: TextReader,
        errors: BTreeMap<NodeId, CommandSyntaxError>,
    ) -> Self {
        Self {
            context,
            reader,
            errors,
        }
    }

    pub fn context(&self) -> &CommandContextBuilder {
        &self.context
    }

    /// Reader positioned after the last matched node.
    pub fn reader(&self) -> &TextReader {
        &self.reader
    }

    /// Errors of rejected candidates, keyed by the node that rejected.
    pub fn errors(&self) -> &BTreeMap<NodeId, CommandSyntaxError> {
        &self.errors
    }

    /// Whether the whole input was consumed.
    pub fn is_complete(&self) -> bool {
        !self.reader.can_read()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (CommandContextBuilder, TextReader, BTreeMap<NodeId, CommandSyntaxError>) {
        (self.context, self.reader, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::ParsedValue;
    use crate::node::NodeSpec;
    use crate::sender::RecordingSender;

    fn builder() -> CommandContextBuilder {
        CommandContextBuilder::new(RecordingSender::new("test").shared(), NodeId::ROOT, 0)
    }

    fn literal(name: &str) -> CommandNode {
        NodeSpec::literal(name).into_node().0
    }

    #[test]
    fn test_with_node_extends_range() {
        let mut builder = builder();
        builder.with_node(NodeId(1), &literal("foo"), TextRange::between(0, 3));
        builder.with_node(NodeId(2), &literal("bar"), TextRange::between(4, 7));
        assert_eq!(builder.range(), TextRange::between(0, 7));
        assert_eq!(builder.nodes().len(), 2);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = builder();
        let mut copy = original.clone();
        copy.with_argument("x", ParsedArgument::new(TextRange::between(0, 1), ParsedValue::new(1)));
        copy.with_node(NodeId(1), &literal("x"), TextRange::between(0, 1));
        assert!(original.arguments().is_empty());
        assert!(original.nodes().is_empty());
        original.with_command(None);
        assert_eq!(copy.arguments().len(), 1);
    }

    #[test]
    fn test_find_suggestion_context() {
        let mut builder = builder();
        builder.with_node(NodeId(1), &literal("parent"), TextRange::between(0, 6));
        builder.with_node(NodeId(2), &literal("child"), TextRange::between(7, 12));

        assert_eq!(
            builder.find_suggestion_context(3),
            Some(SuggestionContext { parent: NodeId::ROOT, start: 0 })
        );
        assert_eq!(
            builder.find_suggestion_context(9),
            Some(SuggestionContext { parent: NodeId(1), start: 7 })
        );
        assert_eq!(
            builder.find_suggestion_context(13),
            Some(SuggestionContext { parent: NodeId(2), start: 13 })
        );
    }

    #[test]
    fn test_find_suggestion_context_follows_child() {
        let mut child = CommandContextBuilder::new(builder().sender().clone(), NodeId(5), 9);
        child.with_node(NodeId(6), &literal("sub"), TextRange::between(9, 12));
        let mut parent = builder();
        parent.with_node(NodeId(1), &literal("redirect"), TextRange::between(0, 8));
        parent.with_child(child);

        assert_eq!(
            parent.find_suggestion_context(10),
            Some(SuggestionContext { parent: NodeId(5), start: 9 })
        );
        assert_eq!(parent.last_child().root(), NodeId(5));
    }

    #[test]
    fn test_build_and_typed_arguments() {
        let mut builder = builder();
        builder.with_argument(
            "count",
            ParsedArgument::new(TextRange::between(4, 6), ParsedValue::new(12_i32)),
        );
        let context = builder.build("give 12");
        assert_eq!(context.argument::<i32>("count"), Ok(12));
        let error = context.argument::<String>("count").unwrap_err();
        assert!(matches!(
            error.kind(),
            ErrorKind::ArgumentTypeMismatch { name, found: "i32", .. } if name == "count"
        ));
        assert_eq!(
            context.argument::<i32>("missing").unwrap_err().kind(),
            &ErrorKind::NoSuchArgument("missing".into())
        );
        assert_eq!(context.input(), "give 12");
    }

    #[test]
    fn test_copy_for() {
        let context = builder().build("x");
        let other = RecordingSender::new("other").shared();
        assert_eq!(context.copy_for(&other).sender().name(), "other");
        let same = Arc::clone(context.sender());
        assert_eq!(context.copy_for(&same).sender().name(), "test");
    }
}
