//! The command dispatcher.
//!
//! [`CommandDispatcher`] owns the command tree behind a reader/writer lock.
//! Parsing and suggestion lookups take the read lock; registration takes the
//! write lock. Execution works purely on parse results and never touches the
//! tree, so command actions may register or unregister commands themselves.

use crate::arguments::ErasedArgumentType;
use crate::config::DispatcherConfig;
use crate::context::{CommandContext, CommandContextBuilder, ParseResults, SuggestionContext};
use crate::error::{CommandSyntaxError, ErrorKind, TreeError};
use crate::node::{CommandNode, Matcher, NodeId, NodeSpec};
use crate::reader::{TextReader, ARGUMENT_SEPARATOR};
use crate::result::{CommandResult, LoggingConsumer, ResultConsumer};
use crate::sender::{CommandSender, Plugin, SenderRef};
use crate::suggestion::{SuggestionProvider, Suggestions, SuggestionsBuilder};
use crate::tree::CommandTree;
use futures::future::join_all;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Registry {
    tree: CommandTree,
    /// Root-level command names registered by each plugin.
    owners: BTreeMap<String, BTreeSet<String>>,
}

/// Parses, executes and completes commands against a shared command tree.
///
/// # Example
///
/// ```rust
/// use cmdtree::{arguments, CommandDispatcher, CommandResult, NodeSpec, RecordingSender};
///
/// let dispatcher = CommandDispatcher::new();
/// dispatcher
///     .register(NodeSpec::literal("add").then(
///         NodeSpec::argument("a", arguments::integer()).then(
///             NodeSpec::argument("b", arguments::integer()).executes(|ctx| {
///                 let sum = ctx.argument::<i32>("a")? + ctx.argument::<i32>("b")?;
///                 Ok(CommandResult::of(sum))
///             }),
///         ),
///     ))
///     .unwrap();
///
/// let sender = RecordingSender::new("console").shared();
/// let result = dispatcher.execute("add 2 3", &sender).unwrap();
/// assert_eq!(result.count(), 5);
/// ```
pub struct CommandDispatcher {
    registry: RwLock<Registry>,
    consumer: Arc<dyn ResultConsumer>,
    config: DispatcherConfig,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("registry", &*self.read())
            .field("config", &self.config)
            .finish()
    }
}

impl CommandDispatcher {
    /// An empty dispatcher with default settings.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// An empty dispatcher using `config`.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            consumer: Arc::new(LoggingConsumer),
            config,
        }
    }

    /// Replace the hook told about every action attempt.
    pub fn with_result_consumer<C: ResultConsumer + 'static>(mut self, consumer: C) -> Self {
        self.consumer = Arc::new(consumer);
        self
    }

    /// Settings this dispatcher was built with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// The root node every command hangs off.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Add a root-level command, merging into an existing one of the same name.
    pub fn register(&self, spec: NodeSpec) -> Result<NodeId, TreeError> {
        let name = spec.name().to_owned();
        let id = self.write().tree.insert(NodeId::ROOT, spec)?;
        tracing::info!(command = %name, node = %id, "Command registered");
        Ok(id)
    }

    /// Add a child under an already registered node.
    pub fn register_under(&self, parent: NodeId, spec: NodeSpec) -> Result<NodeId, TreeError> {
        let name = spec.name().to_owned();
        let id = self.write().tree.insert(parent, spec)?;
        tracing::info!(command = %name, parent = %parent, node = %id, "Command registered");
        Ok(id)
    }

    /// Register a root-level command owned by `plugin`.
    pub fn register_for(&self, plugin: &dyn Plugin, spec: NodeSpec) -> Result<NodeId, TreeError> {
        let name = spec.name().to_owned();
        let id = {
            let mut registry = self.write();
            let id = registry.tree.insert(NodeId::ROOT, spec)?;
            registry
                .owners
                .entry(plugin.name().to_owned())
                .or_default()
                .insert(name.clone());
            id
        };
        tracing::info!(plugin = %plugin.name(), command = %name, node = %id, "Plugin command registered");
        Ok(id)
    }

    /// Root-level commands currently registered by `plugin`.
    pub fn registered(&self, plugin: &dyn Plugin) -> BTreeMap<String, NodeId> {
        let registry = self.read();
        let root = registry.tree.node(NodeId::ROOT);
        registry
            .owners
            .get(plugin.name())
            .into_iter()
            .flatten()
            .filter_map(|name| root.child(name).map(|id| (name.clone(), id)))
            .collect()
    }

    /// Remove root-level commands by name. Returns the detached nodes.
    pub fn unregister<S: AsRef<str>>(&self, names: &[S]) -> Vec<NodeId> {
        let mut registry = self.write();
        let mut removed = Vec::new();
        for name in names {
            let name = name.as_ref();
            if let Some(id) = registry.tree.detach(NodeId::ROOT, name) {
                tracing::info!(command = %name, node = %id, "Command unregistered");
                removed.push(id);
            }
            for owned in registry.owners.values_mut() {
                owned.remove(name);
            }
        }
        registry.owners.retain(|_, owned| !owned.is_empty());
        removed
    }

    /// Remove every command registered by `plugin`.
    pub fn unregister_plugin(&self, plugin: &dyn Plugin) -> Vec<NodeId> {
        let mut registry = self.write();
        let Some(names) = registry.owners.remove(plugin.name()) else {
            return Vec::new();
        };
        let removed: Vec<NodeId> = names
            .iter()
            .filter_map(|name| registry.tree.detach(NodeId::ROOT, name))
            .collect();
        tracing::info!(plugin = %plugin.name(), count = removed.len(), "Plugin commands unregistered");
        removed
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Node reached by following `path` of child names from the root.
    pub fn find_node<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        self.read().tree.find(path)
    }

    /// Names leading from the root to `node`; empty when unreachable.
    pub fn get_path(&self, node: NodeId) -> Vec<String> {
        self.read().tree.path_of(node)
    }

    /// Run `f` against the tree under the read lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&CommandTree) -> R) -> R {
        f(&self.read().tree)
    }

    /// Every usage line below `node`; `restricted` hides nodes `sender` cannot use.
    pub fn all_usage(&self, node: NodeId, sender: &dyn CommandSender, restricted: bool) -> Vec<String> {
        self.read().tree.all_usage(node, sender, restricted)
    }

    /// One condensed usage line per child of `node` that `sender` can use.
    pub fn smart_usage(&self, node: NodeId, sender: &dyn CommandSender) -> Vec<(NodeId, String)> {
        self.read().tree.smart_usage(node, sender)
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Parse `input` as `sender` without running anything.
    pub fn parse(&self, input: &str, sender: &SenderRef) -> ParseResults {
        self.parse_reader(TextReader::new(input), sender)
    }

    /// Parse from the reader's current cursor.
    pub fn parse_reader(&self, reader: TextReader, sender: &SenderRef) -> ParseResults {
        let builder = CommandContextBuilder::new(Arc::clone(sender), NodeId::ROOT, reader.cursor());
        let registry = self.read();
        let parse = self.parse_nodes(&registry.tree, NodeId::ROOT, &reader, &builder);
        tracing::debug!(
            input = %reader.text(),
            sender = %sender.name(),
            cursor = parse.reader().cursor(),
            errors = parse.errors().len(),
            "Parsed command"
        );
        parse
    }

    fn parse_nodes(
        &self,
        tree: &CommandTree,
        node: NodeId,
        original: &TextReader,
        builder: &CommandContextBuilder,
    ) -> ParseResults {
        let sender = builder.sender();
        let mut errors = BTreeMap::new();
        let mut potentials: Vec<ParseResults> = Vec::new();

        for child_id in tree.relevant_nodes(node, original) {
            let child = tree.node(child_id);
            if !child.can_use(sender.as_ref()) {
                continue;
            }
            let mut context = builder.clone();
            let mut reader = original.clone();
            if let Err(error) = self.attempt(tree, child_id, &mut reader, &mut context) {
                tracing::trace!(node = %child.name(), error = %error, "Candidate rejected");
                errors.insert(child_id, error);
                continue;
            }

            context.with_command(child.command.clone());
            let needed = if child.redirect.is_some() { 1 } else { 2 };
            if reader.can_read_n(needed) || child.default_child.is_some() {
                reader.skip();
                if let Some(target) = child.redirect {
                    let redirected =
                        CommandContextBuilder::new(Arc::clone(sender), target, reader.cursor());
                    let (child_builder, reader, errors) =
                        self.parse_nodes(tree, target, &reader, &redirected).into_parts();
                    context.with_child(child_builder);
                    return ParseResults::new(context, reader, errors);
                }
                potentials.push(self.parse_nodes(tree, child_id, &reader, &context));
            } else {
                potentials.push(ParseResults::new(context, reader, BTreeMap::new()));
            }
        }

        // Complete parses first, then error-free ones; ties keep registration order.
        potentials.sort_by_key(|parse| (parse.reader().can_read(), !parse.errors().is_empty()));
        match potentials.into_iter().next() {
            Some(best) => best,
            None => ParseResults::new(builder.clone(), original.clone(), errors),
        }
    }

    /// Match one candidate on scratch copies of the reader and builder.
    fn attempt(
        &self,
        tree: &CommandTree,
        id: NodeId,
        reader: &mut TextReader,
        context: &mut CommandContextBuilder,
    ) -> Result<(), CommandSyntaxError> {
        if self.config.catch_parser_panics {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| tree.parse_node(id, reader, context)));
            match outcome {
                Ok(result) => result?,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(node = %tree.node(id).name(), %message, "Argument parser panicked");
                    return Err(ErrorKind::DispatcherParse(message).with_context(reader));
                }
            }
        } else {
            tree.parse_node(id, reader, context)?;
        }
        if reader.can_read() && reader.peek() != Ok(ARGUMENT_SEPARATOR) {
            return Err(ErrorKind::ExpectedArgumentSeparator.with_context(reader));
        }
        Ok(())
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Parse and execute `input` as `sender`.
    pub fn execute(&self, input: &str, sender: &SenderRef) -> Result<CommandResult, CommandSyntaxError> {
        let parse = self.parse(input, sender);
        self.execute_parsed(&parse)
    }

    /// Execute a parse result.
    ///
    /// Redirect chains are walked breadth-first with an explicit work list.
    /// Once any redirect in the chain forks, failing branches are reported to
    /// the result consumer and skipped, and the result counts successful
    /// actions instead of summing their results.
    pub fn execute_parsed(&self, parse: &ParseResults) -> Result<CommandResult, CommandSyntaxError> {
        let reader = parse.reader();
        if reader.can_read() {
            if parse.errors().len() == 1 {
                if let Some(error) = parse.errors().values().next() {
                    return Err(error.clone());
                }
            }
            let kind = if parse.context().range().is_empty() {
                ErrorKind::UnknownCommand
            } else {
                ErrorKind::UnknownArgument
            };
            return Err(kind.with_context(reader));
        }

        let original = parse.context().build(reader.shared_text());
        let mut result = CommandResult::empty();
        let mut successful_forks = CommandResult::empty();
        let mut forked = false;
        let mut found_command = false;
        let mut contexts = vec![original.clone()];

        while !contexts.is_empty() {
            let mut next = Vec::new();
            for context in &contexts {
                if let Some(child) = context.child() {
                    forked |= context.is_fork();
                    if !child.has_nodes() {
                        continue;
                    }
                    found_command = true;
                    let Some(modifier) = context.redirect_modifier() else {
                        next.push(child.copy_for(context.sender()));
                        continue;
                    };
                    match modifier(context) {
                        Ok(senders) => {
                            next.extend(senders.iter().map(|sender| child.copy_for(sender)));
                        }
                        Err(error) => {
                            self.consumer
                                .on_command_complete(context, false, CommandResult::empty());
                            if !forked {
                                return Err(error);
                            }
                            tracing::warn!(sender = %context.sender().name(), %error, "Redirect modifier failed in forked branch");
                        }
                    }
                } else if let Some(command) = context.command() {
                    found_command = true;
                    match command(context) {
                        Ok(value) => {
                            result = result.merge(value);
                            self.consumer.on_command_complete(context, true, value);
                            successful_forks = successful_forks.merge(CommandResult::succeed());
                        }
                        Err(error) => {
                            self.consumer
                                .on_command_complete(context, false, CommandResult::empty());
                            if !forked {
                                return Err(error);
                            }
                            tracing::warn!(sender = %context.sender().name(), %error, "Command failed in forked branch");
                        }
                    }
                }
            }
            contexts = next;
        }

        if !found_command {
            self.consumer
                .on_command_complete(&original, false, CommandResult::empty());
            return Err(ErrorKind::UnknownCommand.with_context(reader));
        }
        let total = if forked { successful_forks } else { result };
        tracing::debug!(input = %reader.text(), forked, count = total.count(), "Executed command");
        Ok(total)
    }

    // ========================================================================
    // Suggestions
    // ========================================================================

    /// Completions at the end of the parsed input.
    ///
    /// Must be awaited inside a Tokio runtime: each candidate node is queried
    /// on its own task.
    pub async fn completion_suggestions(&self, parse: &ParseResults) -> Suggestions {
        self.completion_suggestions_at(parse, parse.reader().total_length())
            .await
    }

    /// Completions for the token at `cursor`.
    ///
    /// Every child of the node frame containing `cursor` is queried
    /// concurrently. Providers that fail, panic or time out contribute nothing.
    pub async fn completion_suggestions_at(&self, parse: &ParseResults, cursor: usize) -> Suggestions {
        let full_input = parse.reader().text();
        let mut cursor = cursor.min(full_input.len());
        while !full_input.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let Some(SuggestionContext { parent, start }) = parse.context().find_suggestion_context(cursor)
        else {
            return Suggestions::empty();
        };
        let start = start.min(cursor);
        let truncated = &full_input[..cursor];

        let tasks: Vec<SuggestionTask> = {
            let registry = self.read();
            let sender = parse.context().sender();
            match registry.tree.get(parent) {
                Some(node) => node
                    .children()
                    .map(|(_, id)| registry.tree.node(id))
                    .filter(|child| child.can_use(sender.as_ref()))
                    .map(SuggestionTask::of)
                    .collect(),
                None => Vec::new(),
            }
        };
        if tasks.is_empty() {
            return Suggestions::empty();
        }

        let context = Arc::new(parse.context().build(truncated));
        let timeout = self.config.suggestion_timeout();
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let context = Arc::clone(&context);
                let builder = SuggestionsBuilder::new(truncated, start);
                tokio::spawn(task.run(context, builder, timeout))
            })
            .collect();

        let results: Vec<Suggestions> = join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(found) => found,
                Err(error) => {
                    tracing::warn!(%error, "Suggestion task aborted");
                    None
                }
            })
            .collect();
        Suggestions::merge(full_input, results)
    }
}

// ============================================================================
// Suggestion tasks
// ============================================================================

enum SuggestionSource {
    Literal(String),
    Argument(Arc<dyn ErasedArgumentType>),
    Provider(Arc<dyn SuggestionProvider>),
    Nothing,
}

struct SuggestionTask {
    node: String,
    source: SuggestionSource,
}

impl SuggestionTask {
    fn of(node: &CommandNode) -> Self {
        let source = match (&node.matcher, &node.suggestions) {
            (Matcher::Argument { .. }, Some(provider)) => SuggestionSource::Provider(Arc::clone(provider)),
            (Matcher::Argument { parser, .. }, None) => SuggestionSource::Argument(Arc::clone(parser)),
            (Matcher::Literal(literal), _) => SuggestionSource::Literal(literal.clone()),
            (Matcher::Root, _) => SuggestionSource::Nothing,
        };
        Self {
            node: node.name().to_owned(),
            source,
        }
    }

    async fn run(
        self,
        context: Arc<CommandContext>,
        builder: SuggestionsBuilder,
        timeout: Option<std::time::Duration>,
    ) -> Option<Suggestions> {
        let lookup = self.source.suggest(&context, builder);
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, lookup).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(node = %self.node, timeout = ?limit, "Suggestion provider timed out");
                    return None;
                }
            },
            None => lookup.await,
        };
        match result {
            Ok(suggestions) => Some(suggestions),
            Err(error) => {
                tracing::warn!(node = %self.node, %error, "Suggestion provider failed");
                None
            }
        }
    }
}

impl SuggestionSource {
    async fn suggest(
        &self,
        context: &CommandContext,
        mut builder: SuggestionsBuilder,
    ) -> Result<Suggestions, CommandSyntaxError> {
        match self {
            SuggestionSource::Literal(literal) => {
                if literal.to_lowercase().starts_with(&builder.remaining_lowercase()) {
                    builder.suggest(literal.as_str());
                }
                Ok(builder.build())
            }
            SuggestionSource::Argument(parser) => Ok(parser.list_suggestions(context, builder)),
            SuggestionSource::Provider(provider) => provider.suggestions(context, builder).await,
            SuggestionSource::Nothing => Ok(Suggestions::empty()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "parser panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments;
    use crate::sender::RecordingSender;

    fn sender() -> SenderRef {
        RecordingSender::new("test").shared()
    }

    #[test]
    fn test_failed_candidate_leaves_reader_and_builder_untouched() {
        let dispatcher = CommandDispatcher::new();
        dispatcher
            .register(NodeSpec::argument("small", arguments::integer_between(0, 5)).then(
                NodeSpec::literal("never").executes(|_| Ok(CommandResult::succeed())),
            ))
            .unwrap();

        let reader = TextReader::new("42");
        let builder = CommandContextBuilder::new(sender(), NodeId::ROOT, 0);
        let before_cursor = reader.cursor();
        let before_arguments: Vec<String> = builder.arguments().keys().cloned().collect();

        let parse = dispatcher.inspect(|tree| dispatcher.parse_nodes(tree, NodeId::ROOT, &reader, &builder));

        assert_eq!(reader.cursor(), before_cursor);
        assert_eq!(builder.arguments().keys().cloned().collect::<Vec<_>>(), before_arguments);
        assert!(builder.nodes().is_empty());
        assert_eq!(parse.reader().cursor(), 0);
        assert!(parse.context().arguments().is_empty());
        assert_eq!(parse.errors().len(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "parser panicked");
    }
}
