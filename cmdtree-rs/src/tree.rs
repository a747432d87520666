//! Arena-backed command tree.
//!
//! Nodes live in a vector and refer to each other by [`NodeId`]. Ids stay
//! valid for the life of the tree: unregistering a command detaches it from
//! its parent but never reuses its slot, so redirects that point into a
//! removed subtree keep resolving.

use crate::arguments::ParsedArgument;
use crate::context::CommandContextBuilder;
use crate::error::{CommandSyntaxError, ErrorKind, TreeError};
use crate::node::{CommandNode, Matcher, NodeId, NodeSpec};
use crate::range::TextRange;
use crate::reader::{TextReader, ARGUMENT_SEPARATOR};

/// All registered nodes. Index 0 is the root.
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTree {
    /// A tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![CommandNode::root()],
        }
    }

    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Look up a node; `None` for ids from another tree.
    pub fn get(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Ids handed out by this tree always resolve.
    pub(crate) fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    /// Number of slots, including detached nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no commands are attached to the root.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Add `spec` under `parent`, merging with a same-named child if present.
    ///
    /// The whole subtree is validated first; on error the tree is untouched.
    pub fn insert(&mut self, parent: NodeId, spec: NodeSpec) -> Result<NodeId, TreeError> {
        let parent_node = self.get(parent).ok_or(TreeError::UnknownNode(parent.0))?;
        if parent == NodeId::ROOT && spec.is_default {
            return Err(TreeError::DefaultNodeAtRoot(spec.name().to_owned()));
        }
        let existing = parent_node.child(spec.name());
        if existing.is_none() && spec.is_default {
            if let Some(current) = parent_node.default_child {
                return Err(TreeError::MultipleDefaultNodes {
                    parent: parent_node.name().to_owned(),
                    existing: self.node(current).name().to_owned(),
                    added: spec.name().to_owned(),
                });
            }
        }
        self.validate(existing, &spec)?;
        Ok(self.attach(parent, spec))
    }

    fn validate(&self, existing: Option<NodeId>, spec: &NodeSpec) -> Result<(), TreeError> {
        if let Some(target) = spec.redirect {
            if self.get(target).is_none() {
                return Err(TreeError::UnknownNode(target.0));
            }
        }
        let redirects = spec.redirect.is_some()
            || existing.is_some_and(|id| self.node(id).redirect.is_some());
        if redirects && !spec.children.is_empty() {
            return Err(TreeError::RedirectWithChildren(spec.name().to_owned()));
        }

        let mut default_name = existing
            .and_then(|id| self.node(id).default_child)
            .map(|id| self.node(id).name());
        for child in &spec.children {
            let existing_child = existing.and_then(|id| self.node(id).child(child.name()));
            if child.is_default && existing_child.is_none() {
                match default_name {
                    Some(current) if current != child.name() => {
                        return Err(TreeError::MultipleDefaultNodes {
                            parent: spec.name().to_owned(),
                            existing: current.to_owned(),
                            added: child.name().to_owned(),
                        });
                    }
                    _ => default_name = Some(child.name()),
                }
            }
            self.validate(existing_child, child)?;
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, spec: NodeSpec) -> NodeId {
        if let Some(existing) = self.node(parent).child(spec.name()) {
            let (node, children) = spec.into_node();
            if node.command.is_some() {
                self.nodes[existing.0].command = node.command;
            }
            for child in children {
                self.attach(existing, child);
            }
            return existing;
        }

        let name = spec.name().to_owned();
        let (node, children) = spec.into_node();
        let is_argument = matches!(node.matcher, Matcher::Argument { .. });
        let is_default = node.is_default;
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);

        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.insert(name, id);
        if is_argument {
            parent_node.arguments.push(id);
        }
        if is_default {
            parent_node.default_child = Some(id);
        }
        for child in children {
            self.attach(id, child);
        }
        id
    }

    /// Detach the child called `name` from `parent`.
    pub fn detach(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let parent_node = self.nodes.get_mut(parent.0)?;
        let removed = parent_node.children.remove(name)?;
        parent_node.arguments.retain(|id| *id != removed);
        if parent_node.default_child == Some(removed) {
            parent_node.default_child = None;
        }
        Some(removed)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Follow `path` of child names from the root.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        path.iter()
            .try_fold(NodeId::ROOT, |id, name| self.node(id).child(name.as_ref()))
    }

    /// Names from the root down to `target`, or an empty path when `target`
    /// is unreachable. The first path in child order wins.
    pub fn path_of(&self, target: NodeId) -> Vec<String> {
        let mut stack = vec![(NodeId::ROOT, 0_usize)];
        let mut path: Vec<NodeId> = Vec::new();
        while let Some((id, depth)) = stack.pop() {
            path.truncate(depth);
            if id != NodeId::ROOT {
                path.push(id);
            }
            if id == target {
                return path
                    .iter()
                    .map(|id| self.node(*id).name().to_owned())
                    .collect();
            }
            let next_depth = if id == NodeId::ROOT { 0 } else { depth + 1 };
            // Reversed so the first child is popped first.
            stack.extend(
                self.node(id)
                    .children
                    .values()
                    .rev()
                    .map(|child| (*child, next_depth)),
            );
        }
        Vec::new()
    }

    /// Whether `id` runs a command, directly or through its default children.
    pub fn is_executable(&self, id: NodeId) -> bool {
        let mut current = self.get(id);
        while let Some(node) = current {
            if node.command.is_some() {
                return true;
            }
            current = node.default_child.map(|next| self.node(next));
        }
        false
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Children of `id` worth attempting at the reader's position.
    ///
    /// A literal child is included only when it equals the next token;
    /// argument children are always included, in registration order.
    pub(crate) fn relevant_nodes(&self, id: NodeId, reader: &TextReader) -> Vec<NodeId> {
        let node = self.node(id);
        if !reader.can_read() {
            if let Some(default) = node.default_child {
                return vec![default];
            }
        }
        if !node.has_literals() {
            return node.arguments.clone();
        }
        let token = reader
            .remaining()
            .split(ARGUMENT_SEPARATOR)
            .next()
            .unwrap_or_default();
        match node.child(token) {
            Some(literal) if matches!(self.node(literal).matcher, Matcher::Literal(_)) => {
                let mut relevant = Vec::with_capacity(node.arguments.len() + 1);
                relevant.push(literal);
                relevant.extend_from_slice(&node.arguments);
                relevant
            }
            _ => node.arguments.clone(),
        }
    }

    /// Match node `id` at the reader's cursor, recording it in `builder`.
    pub(crate) fn parse_node(
        &self,
        id: NodeId,
        reader: &mut TextReader,
        builder: &mut CommandContextBuilder,
    ) -> Result<(), CommandSyntaxError> {
        let node = self.node(id);
        let start = reader.cursor();
        match &node.matcher {
            Matcher::Root => Err(ErrorKind::DispatcherParse(
                "the root node cannot be matched".to_owned(),
            )
            .with_context(reader)),
            Matcher::Literal(literal) => match match_literal(literal, node.is_default, reader) {
                Some(end) => {
                    builder.with_node(id, node, TextRange::between(start, end));
                    Ok(())
                }
                None => Err(ErrorKind::LiteralIncorrect(literal.clone()).with_context(reader)),
            },
            Matcher::Argument {
                name,
                parser,
                default_value,
            } => {
                let value = match default_value {
                    Some(value) if node.is_default && !reader.can_read() => value.clone(),
                    _ => parser.parse_erased(reader)?,
                };
                let range = TextRange::between(start, reader.cursor());
                builder.with_argument(name.clone(), ParsedArgument::new(range, value));
                builder.with_node(id, node, range);
                Ok(())
            }
        }
    }
}

/// End of `literal` if it sits at the cursor followed by a separator or the
/// end of input. A default literal also matches an exhausted reader.
fn match_literal(literal: &str, is_default: bool, reader: &mut TextReader) -> Option<usize> {
    let start = reader.cursor();
    if reader.remaining().starts_with(literal) {
        let end = start + literal.len();
        reader.set_cursor(end);
        if !reader.can_read() || reader.peek() == Ok(ARGUMENT_SEPARATOR) {
            return Some(end);
        }
        reader.set_cursor(start);
        None
    } else if !reader.can_read() && is_default {
        Some(start)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments;
    use crate::result::CommandResult;
    use crate::sender::RecordingSender;

    fn ok() -> Result<CommandResult, CommandSyntaxError> {
        Ok(CommandResult::succeed())
    }

    fn builder() -> CommandContextBuilder {
        CommandContextBuilder::new(RecordingSender::new("test").shared(), NodeId::ROOT, 0)
    }

    #[test]
    fn test_insert_and_find() {
        let mut tree = CommandTree::new();
        let foo = tree
            .insert(
                NodeId::ROOT,
                NodeSpec::literal("foo").then(NodeSpec::literal("bar").executes(|_| ok())),
            )
            .unwrap();
        assert_eq!(tree.find(&["foo"]), Some(foo));
        let bar = tree.find(&["foo", "bar"]).unwrap();
        assert!(tree.is_executable(bar));
        assert!(!tree.is_executable(foo));
        assert_eq!(tree.find(&["foo", "baz"]), None);
        assert_eq!(tree.find::<&str>(&[]), Some(NodeId::ROOT));
    }

    #[test]
    fn test_merge_keeps_node_and_adds_children() {
        let mut tree = CommandTree::new();
        let first = tree
            .insert(NodeId::ROOT, NodeSpec::literal("base").then(NodeSpec::literal("foo")))
            .unwrap();
        let second = tree
            .insert(
                NodeId::ROOT,
                NodeSpec::literal("base")
                    .executes(|_| ok())
                    .then(NodeSpec::literal("bar")),
            )
            .unwrap();
        assert_eq!(first, second);
        let base = tree.node(first);
        assert!(base.command().is_some());
        assert_eq!(
            base.children().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["bar", "foo"]
        );
    }

    #[test]
    fn test_merge_without_command_keeps_existing_command() {
        let mut tree = CommandTree::new();
        let id = tree
            .insert(NodeId::ROOT, NodeSpec::literal("foo").executes(|_| ok()))
            .unwrap();
        tree.insert(NodeId::ROOT, NodeSpec::literal("foo")).unwrap();
        assert!(tree.node(id).command().is_some());
    }

    #[test]
    fn test_default_at_root_rejected() {
        let mut tree = CommandTree::new();
        let result = tree.insert(NodeId::ROOT, NodeSpec::default_literal("all"));
        assert_eq!(result, Err(TreeError::DefaultNodeAtRoot("all".into())));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_multiple_defaults_rejected_without_partial_insert() {
        let mut tree = CommandTree::new();
        let result = tree.insert(
            NodeId::ROOT,
            NodeSpec::literal("foo")
                .then(NodeSpec::default_literal("a"))
                .then(NodeSpec::default_literal("b")),
        );
        assert!(matches!(result, Err(TreeError::MultipleDefaultNodes { .. })));
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_multiple_defaults_rejected_across_registrations() {
        let mut tree = CommandTree::new();
        tree.insert(NodeId::ROOT, NodeSpec::literal("foo").then(NodeSpec::default_literal("a")))
            .unwrap();
        let result =
            tree.insert(NodeId::ROOT, NodeSpec::literal("foo").then(NodeSpec::default_literal("b")));
        assert_eq!(
            result,
            Err(TreeError::MultipleDefaultNodes {
                parent: "foo".into(),
                existing: "a".into(),
                added: "b".into(),
            })
        );
    }

    #[test]
    fn test_redirect_with_children_rejected() {
        let mut tree = CommandTree::new();
        let result = tree.insert(
            NodeId::ROOT,
            NodeSpec::literal("alias")
                .redirect(NodeId::ROOT)
                .then(NodeSpec::literal("x")),
        );
        assert_eq!(result, Err(TreeError::RedirectWithChildren("alias".into())));
        assert_eq!(
            tree.insert(NodeId::ROOT, NodeSpec::literal("bad").redirect(NodeId(42))),
            Err(TreeError::UnknownNode(42))
        );
    }

    #[test]
    fn test_detach() {
        let mut tree = CommandTree::new();
        let foo = tree.insert(NodeId::ROOT, NodeSpec::literal("foo")).unwrap();
        tree.insert(NodeId::ROOT, NodeSpec::argument("n", arguments::integer()))
            .unwrap();
        assert_eq!(tree.detach(NodeId::ROOT, "foo"), Some(foo));
        assert_eq!(tree.detach(NodeId::ROOT, "n").map(|id| id.index()), Some(2));
        assert_eq!(tree.detach(NodeId::ROOT, "foo"), None);
        assert!(tree.is_empty());
        assert!(tree.get(foo).is_some());
        assert!(tree.path_of(foo).is_empty());
    }

    #[test]
    fn test_path_of() {
        let mut tree = CommandTree::new();
        tree.insert(
            NodeId::ROOT,
            NodeSpec::literal("a")
                .then(NodeSpec::literal("b").then(NodeSpec::literal("c")))
                .then(NodeSpec::literal("d")),
        )
        .unwrap();
        let c = tree.find(&["a", "b", "c"]).unwrap();
        assert_eq!(tree.path_of(c), vec!["a", "b", "c"]);
        let d = tree.find(&["a", "d"]).unwrap();
        assert_eq!(tree.path_of(d), vec!["a", "d"]);
        assert!(tree.path_of(NodeId::ROOT).is_empty());
    }

    #[test]
    fn test_relevant_nodes_literal_then_arguments() {
        let mut tree = CommandTree::new();
        let foo = tree.insert(NodeId::ROOT, NodeSpec::literal("foo")).unwrap();
        let bar = tree.insert(NodeId::ROOT, NodeSpec::literal("bar")).unwrap();
        let number = tree
            .insert(NodeId::ROOT, NodeSpec::argument("number", arguments::integer()))
            .unwrap();

        assert_eq!(tree.relevant_nodes(NodeId::ROOT, &TextReader::new("foo 1")), vec![foo, number]);
        assert_eq!(tree.relevant_nodes(NodeId::ROOT, &TextReader::new("bar")), vec![bar, number]);
        assert_eq!(tree.relevant_nodes(NodeId::ROOT, &TextReader::new("fo")), vec![number]);
    }

    #[test]
    fn test_relevant_nodes_default_at_end() {
        let mut tree = CommandTree::new();
        let foo = tree
            .insert(NodeId::ROOT, NodeSpec::literal("foo").then(NodeSpec::default_literal("all")))
            .unwrap();
        let all = tree.find(&["foo", "all"]).unwrap();
        assert_eq!(tree.relevant_nodes(foo, &TextReader::new("")), vec![all]);
    }

    #[test]
    fn test_parse_literal_requires_boundary() {
        let mut tree = CommandTree::new();
        let foo = tree.insert(NodeId::ROOT, NodeSpec::literal("foo")).unwrap();

        let mut reader = TextReader::new("foo bar");
        let mut context = builder();
        tree.parse_node(foo, &mut reader, &mut context).unwrap();
        assert_eq!(reader.cursor(), 3);
        assert_eq!(context.range(), TextRange::between(0, 3));

        let mut reader = TextReader::new("foobar");
        let error = tree.parse_node(foo, &mut reader, &mut builder()).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::LiteralIncorrect("foo".into()));
        assert_eq!(reader.cursor(), 0);
    }

    #[test]
    fn test_parse_argument_stores_value() {
        let mut tree = CommandTree::new();
        let count = tree
            .insert(NodeId::ROOT, NodeSpec::argument("count", arguments::integer()))
            .unwrap();
        let mut reader = TextReader::new("42 rest");
        let mut context = builder();
        tree.parse_node(count, &mut reader, &mut context).unwrap();
        let parsed = &context.arguments()["count"];
        assert_eq!(parsed.range(), TextRange::between(0, 2));
        assert_eq!(parsed.value().downcast_ref::<i32>(), Some(&42));
    }

    #[test]
    fn test_parse_default_argument_uses_default_value() {
        let mut tree = CommandTree::new();
        tree.insert(
            NodeId::ROOT,
            NodeSpec::literal("page").then(NodeSpec::default_argument(
                "number",
                arguments::integer(),
                1,
            )),
        )
        .unwrap();
        let number = tree.find(&["page", "number"]).unwrap();
        let mut reader = TextReader::new("page");
        reader.set_cursor(4);
        let mut context = builder();
        tree.parse_node(number, &mut reader, &mut context).unwrap();
        let parsed = &context.arguments()["number"];
        assert_eq!(parsed.value().downcast_ref::<i32>(), Some(&1));
        assert!(parsed.range().is_empty());
    }
}
