//! Command nodes and the specs used to register them.
//!
//! A [`NodeSpec`] is an owned description of a subtree. Registering it copies
//! it into the dispatcher's [`CommandTree`](crate::CommandTree), where each
//! node becomes a [`CommandNode`] addressed by a [`NodeId`].

use crate::arguments::{ArgumentType, ErasedArgumentType, ParsedValue};
use crate::context::CommandContext;
use crate::error::CommandSyntaxError;
use crate::result::CommandResult;
use crate::sender::{CommandSender, SenderRef};
use crate::suggestion::SuggestionProvider;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Terminal action of a node.
pub type Command =
    Arc<dyn Fn(&CommandContext) -> Result<CommandResult, CommandSyntaxError> + Send + Sync>;

/// Maps the context of a redirecting node to the senders the redirect runs as.
pub type RedirectModifier =
    Arc<dyn Fn(&CommandContext) -> Result<Vec<SenderRef>, CommandSyntaxError> + Send + Sync>;

/// Access predicate.
pub type Requirement = Arc<dyn Fn(&dyn CommandSender) -> bool + Send + Sync>;

/// Handle to a node in a [`CommandTree`](crate::CommandTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of token a node matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Literal,
    Argument,
}

#[derive(Clone)]
pub(crate) enum Matcher {
    Root,
    Literal(String),
    Argument {
        name: String,
        parser: Arc<dyn ErasedArgumentType>,
        default_value: Option<ParsedValue>,
    },
}

impl Matcher {
    fn name(&self) -> &str {
        match self {
            Matcher::Root => "",
            Matcher::Literal(literal) => literal,
            Matcher::Argument { name, .. } => name,
        }
    }
}

// ============================================================================
// Registered node
// ============================================================================

/// A node of the command tree.
pub struct CommandNode {
    pub(crate) matcher: Matcher,
    pub(crate) children: BTreeMap<String, NodeId>,
    /// Argument children in registration order.
    pub(crate) arguments: Vec<NodeId>,
    pub(crate) command: Option<Command>,
    pub(crate) requirements: Vec<Requirement>,
    pub(crate) redirect: Option<NodeId>,
    pub(crate) modifier: Option<RedirectModifier>,
    pub(crate) fork: bool,
    pub(crate) default_child: Option<NodeId>,
    pub(crate) is_default: bool,
    pub(crate) description: Option<String>,
    pub(crate) suggestions: Option<Arc<dyn SuggestionProvider>>,
}

impl CommandNode {
    pub(crate) fn root() -> Self {
        Self {
            matcher: Matcher::Root,
            children: BTreeMap::new(),
            arguments: Vec::new(),
            command: None,
            requirements: Vec::new(),
            redirect: None,
            modifier: None,
            fork: false,
            default_child: None,
            is_default: false,
            description: None,
            suggestions: None,
        }
    }

    /// Literal text, argument name, or `""` for the root.
    pub fn name(&self) -> &str {
        self.matcher.name()
    }

    pub fn kind(&self) -> NodeKind {
        match self.matcher {
            Matcher::Root => NodeKind::Root,
            Matcher::Literal(_) => NodeKind::Literal,
            Matcher::Argument { .. } => NodeKind::Argument,
        }
    }

    /// Token shown in usage strings: `name` for literals, `<name>` for arguments.
    pub fn usage_text(&self) -> String {
        match &self.matcher {
            Matcher::Root => String::new(),
            Matcher::Literal(literal) => literal.clone(),
            Matcher::Argument { name, .. } => format!("<{name}>"),
        }
    }

    pub fn examples(&self) -> Vec<String> {
        match &self.matcher {
            Matcher::Root => Vec::new(),
            Matcher::Literal(literal) => vec![literal.clone()],
            Matcher::Argument { parser, .. } => parser.examples(),
        }
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    /// Children ordered by name.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub(crate) fn has_literals(&self) -> bool {
        self.children.len() > self.arguments.len()
    }

    pub fn redirect(&self) -> Option<NodeId> {
        self.redirect
    }

    pub fn redirect_modifier(&self) -> Option<&RedirectModifier> {
        self.modifier.as_ref()
    }

    pub fn is_fork(&self) -> bool {
        self.fork
    }

    pub fn default_child(&self) -> Option<NodeId> {
        self.default_child
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn has_custom_suggestions(&self) -> bool {
        self.suggestions.is_some()
    }

    /// Whether every requirement accepts `sender`.
    pub fn can_use(&self, sender: &dyn CommandSender) -> bool {
        self.requirements.iter().all(|requirement| requirement(sender))
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("children", &self.children)
            .field("executable", &self.command.is_some())
            .field("redirect", &self.redirect)
            .field("fork", &self.fork)
            .field("default_child", &self.default_child)
            .finish()
    }
}

// ============================================================================
// Spec
// ============================================================================

/// Owned description of a subtree, ready to be registered.
///
/// ```rust
/// use cmdtree::{arguments, CommandResult, NodeSpec};
///
/// let spec = NodeSpec::literal("give").then(
///     NodeSpec::argument("amount", arguments::integer_between(1, 64))
///         .executes(|ctx| Ok(CommandResult::of(ctx.argument::<i32>("amount")?))),
/// );
/// assert_eq!(spec.name(), "give");
/// ```
#[derive(Clone)]
pub struct NodeSpec {
    pub(crate) matcher: Matcher,
    pub(crate) is_default: bool,
    pub(crate) children: Vec<NodeSpec>,
    pub(crate) command: Option<Command>,
    pub(crate) requirements: Vec<Requirement>,
    pub(crate) redirect: Option<NodeId>,
    pub(crate) modifier: Option<RedirectModifier>,
    pub(crate) fork: bool,
    pub(crate) description: Option<String>,
    pub(crate) suggestions: Option<Arc<dyn SuggestionProvider>>,
}

impl NodeSpec {
    fn with_matcher(matcher: Matcher) -> Self {
        Self {
            matcher,
            is_default: false,
            children: Vec::new(),
            command: None,
            requirements: Vec::new(),
            redirect: None,
            modifier: None,
            fork: false,
            description: None,
            suggestions: None,
        }
    }

    pub fn literal(literal: impl Into<String>) -> Self {
        Self::with_matcher(Matcher::Literal(literal.into()))
    }

    pub fn argument<T: ArgumentType>(name: impl Into<String>, argument: T) -> Self {
        Self::with_matcher(Matcher::Argument {
            name: name.into(),
            parser: Arc::new(argument),
            default_value: None,
        })
    }

    /// A literal matched even when its keyword is omitted at the end of input.
    pub fn default_literal(literal: impl Into<String>) -> Self {
        Self {
            is_default: true,
            ..Self::literal(literal)
        }
    }

    /// An argument that takes `default_value` when the input ends before it.
    pub fn default_argument<T: ArgumentType>(
        name: impl Into<String>,
        argument: T,
        default_value: T::Value,
    ) -> Self {
        Self {
            is_default: true,
            ..Self::with_matcher(Matcher::Argument {
                name: name.into(),
                parser: Arc::new(argument),
                default_value: Some(ParsedValue::new(default_value)),
            })
        }
    }

    pub fn name(&self) -> &str {
        self.matcher.name()
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn then(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn executes<F>(mut self, command: F) -> Self
    where
        F: Fn(&CommandContext) -> Result<CommandResult, CommandSyntaxError> + Send + Sync + 'static,
    {
        self.command = Some(Arc::new(command));
        self
    }

    /// Add an access predicate. All predicates must pass.
    pub fn requires<F>(mut self, requirement: F) -> Self
    where
        F: Fn(&dyn CommandSender) -> bool + Send + Sync + 'static,
    {
        self.requirements.push(Arc::new(requirement));
        self
    }

    /// Require `permission` of the sender.
    pub fn permission(self, permission: impl Into<String>) -> Self {
        let permission = permission.into();
        self.requires(move |sender| sender.has_permission(&permission))
    }

    /// Continue parsing at `target`.
    pub fn redirect(mut self, target: NodeId) -> Self {
        self.redirect = Some(target);
        self.modifier = None;
        self.fork = false;
        self
    }

    /// Continue at `target`, running as the sender chosen by `modifier`.
    pub fn redirect_with<F>(mut self, target: NodeId, modifier: F) -> Self
    where
        F: Fn(&CommandContext) -> Result<SenderRef, CommandSyntaxError> + Send + Sync + 'static,
    {
        self.redirect = Some(target);
        self.modifier = Some(Arc::new(move |context: &CommandContext| {
            modifier(context).map(|sender| vec![sender])
        }));
        self.fork = false;
        self
    }

    /// Continue at `target` once per sender returned by `modifier`.
    ///
    /// Failures in forked branches are reported to the result consumer and do
    /// not stop the sibling branches.
    pub fn fork<F>(mut self, target: NodeId, modifier: F) -> Self
    where
        F: Fn(&CommandContext) -> Result<Vec<SenderRef>, CommandSyntaxError> + Send + Sync + 'static,
    {
        self.redirect = Some(target);
        self.modifier = Some(Arc::new(modifier));
        self.fork = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the argument type's own completions.
    pub fn suggests<P: SuggestionProvider + 'static>(mut self, provider: P) -> Self {
        self.suggestions = Some(Arc::new(provider));
        self
    }

    pub(crate) fn into_node(self) -> (CommandNode, Vec<NodeSpec>) {
        let node = CommandNode {
            matcher: self.matcher,
            children: BTreeMap::new(),
            arguments: Vec::new(),
            command: self.command,
            requirements: self.requirements,
            redirect: self.redirect,
            modifier: self.modifier,
            fork: self.fork,
            default_child: None,
            is_default: self.is_default,
            description: self.description,
            suggestions: self.suggestions,
        };
        (node, self.children)
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name())
            .field("default", &self.is_default)
            .field("children", &self.children)
            .field("executable", &self.command.is_some())
            .field("redirect", &self.redirect)
            .finish()
    }
}
