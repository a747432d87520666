//! The grammar served by the shell.

use async_trait::async_trait;
use cmdtree::arguments;
use cmdtree::{
    CommandContext, CommandDispatcher, CommandResult, CommandSender, CommandSyntaxError, NodeId,
    NodeSpec, Plugin, SenderRef, SuggestionProvider, Suggestions, SuggestionsBuilder, TreeError,
};
use std::sync::{Arc, Weak};

/// Names `execute as` and `execute everyone` switch to.
const KNOWN_NAMES: [&str; 3] = ["alice", "bob", "carol"];

// ============================================================================
// Senders
// ============================================================================

/// The interactive user. Prints to stdout and holds every permission.
#[derive(Debug)]
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        "console"
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, message: &str) {
        println!("{message}");
    }
}

/// Runs as `name` on behalf of `origin`, forwarding feedback to it.
#[derive(Debug)]
struct AliasSender {
    name: String,
    origin: SenderRef,
}

impl AliasSender {
    fn shared(name: impl Into<String>, origin: &SenderRef) -> SenderRef {
        Arc::new(Self {
            name: name.into(),
            origin: Arc::clone(origin),
        })
    }
}

impl CommandSender for AliasSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.origin.has_permission(permission)
    }

    fn send_message(&self, message: &str) {
        self.origin.send_message(&format!("[{}] {message}", self.name));
    }
}

struct KnownNames;

#[async_trait]
impl SuggestionProvider for KnownNames {
    async fn suggestions(
        &self,
        _context: &CommandContext,
        mut builder: SuggestionsBuilder,
    ) -> Result<Suggestions, CommandSyntaxError> {
        let typed = builder.remaining_lowercase();
        for name in KNOWN_NAMES.iter().filter(|name| name.starts_with(&typed)) {
            builder.suggest_with_tooltip(*name, "known user");
        }
        Ok(builder.build())
    }
}

/// Optional commands, loadable and unloadable as a group.
pub struct Extras;

impl Plugin for Extras {
    fn name(&self) -> &str {
        "extras"
    }
}

// ============================================================================
// Registration
// ============================================================================

fn count(n: usize) -> CommandResult {
    CommandResult::of(i32::try_from(n).unwrap_or(i32::MAX))
}

/// Register the core grammar plus the extras.
pub fn register(dispatcher: &Arc<CommandDispatcher>) -> Result<(), TreeError> {
    dispatcher.register(
        NodeSpec::literal("say")
            .describe("Print a message")
            .then(
                NodeSpec::argument("message", arguments::greedy_string()).executes(|ctx| {
                    let message: String = ctx.argument("message")?;
                    ctx.sender().send_message(&message);
                    Ok(CommandResult::succeed())
                }),
            ),
    )?;

    dispatcher.register(
        NodeSpec::literal("add").describe("Add two integers").then(
            NodeSpec::argument("a", arguments::integer()).then(
                NodeSpec::argument("b", arguments::integer()).executes(|ctx| {
                    let a: i32 = ctx.argument("a")?;
                    let b: i32 = ctx.argument("b")?;
                    let sum = a.saturating_add(b);
                    ctx.sender().send_message(&sum.to_string());
                    Ok(CommandResult::of(sum))
                }),
            ),
        ),
    )?;

    dispatcher.register(
        NodeSpec::literal("whoami")
            .describe("Print the current sender")
            .executes(|ctx| {
                ctx.sender().send_message(ctx.sender().name());
                Ok(CommandResult::succeed())
            }),
    )?;

    dispatcher.register(
        NodeSpec::literal("execute")
            .describe("Run a command as someone else")
            .then(NodeSpec::literal("as").then(
                NodeSpec::argument("name", arguments::word())
                    .suggests(KnownNames)
                    .redirect_with(NodeId::ROOT, |ctx| {
                        let name: String = ctx.argument("name")?;
                        Ok(AliasSender::shared(name, ctx.sender()))
                    }),
            ))
            .then(NodeSpec::literal("everyone").fork(NodeId::ROOT, |ctx| {
                Ok(KNOWN_NAMES
                    .iter()
                    .map(|name| AliasSender::shared(*name, ctx.sender()))
                    .collect())
            }))
            .then(NodeSpec::literal("run").redirect(NodeId::ROOT)),
    )?;

    register_help(dispatcher)?;
    register_extras(dispatcher)?;

    let weak = Arc::downgrade(dispatcher);
    dispatcher.register(
        NodeSpec::literal("extras")
            .describe("Load or unload the extra commands")
            .then(NodeSpec::literal("on").executes({
                let weak = weak.clone();
                move |ctx| {
                    let dispatcher = upgrade(&weak)?;
                    register_extras(&dispatcher)
                        .map_err(|error| CommandSyntaxError::custom(error.to_string()))?;
                    ctx.sender().send_message("extras loaded");
                    Ok(CommandResult::succeed())
                }
            }))
            .then(NodeSpec::literal("off").executes(move |ctx| {
                let removed = upgrade(&weak)?.unregister_plugin(&Extras);
                ctx.sender()
                    .send_message(&format!("extras unloaded ({} commands)", removed.len()));
                Ok(count(removed.len()))
            })),
    )?;
    Ok(())
}

fn register_extras(dispatcher: &CommandDispatcher) -> Result<(), TreeError> {
    dispatcher.register_for(
        &Extras,
        NodeSpec::literal("color").describe("Pick a color").then(
            NodeSpec::argument("name", arguments::term(["red", "green", "blue"])).executes(|ctx| {
                let name: String = ctx.argument("name")?;
                ctx.sender().send_message(&format!("you picked {name}"));
                Ok(CommandResult::succeed())
            }),
        ),
    )?;

    dispatcher.register_for(
        &Extras,
        NodeSpec::literal("repeat").describe("Print a word several times").then(
            NodeSpec::argument("text", arguments::string()).then(
                NodeSpec::default_argument("times", arguments::integer_between(1, 10), 1).executes(
                    |ctx| {
                        let text: String = ctx.argument("text")?;
                        let times: i32 = ctx.argument("times")?;
                        for _ in 0..times {
                            ctx.sender().send_message(&text);
                        }
                        Ok(CommandResult::of(times))
                    },
                ),
            ),
        ),
    )?;
    Ok(())
}

fn register_help(dispatcher: &Arc<CommandDispatcher>) -> Result<(), TreeError> {
    let weak = Arc::downgrade(dispatcher);
    dispatcher.register(
        NodeSpec::literal("help")
            .describe("Show command usage")
            .executes({
                let weak = weak.clone();
                move |ctx| {
                    let dispatcher = upgrade(&weak)?;
                    let lines = dispatcher.smart_usage(NodeId::ROOT, ctx.sender().as_ref());
                    for (_, line) in &lines {
                        ctx.sender().send_message(line);
                    }
                    Ok(count(lines.len()))
                }
            })
            .then(
                NodeSpec::argument("command", arguments::word()).executes(move |ctx| {
                    let dispatcher = upgrade(&weak)?;
                    let name: String = ctx.argument("command")?;
                    let node = dispatcher.find_node(&[name.as_str()]).ok_or_else(|| {
                        CommandSyntaxError::custom(format!("No help for '{name}'"))
                    })?;
                    let description = dispatcher.inspect(|tree| {
                        tree.get(node)
                            .and_then(|node| node.description().map(str::to_owned))
                    });
                    if let Some(description) = description {
                        ctx.sender().send_message(&description);
                    }
                    let lines = dispatcher.all_usage(node, ctx.sender().as_ref(), true);
                    for line in &lines {
                        if line.is_empty() {
                            ctx.sender().send_message(&name);
                        } else {
                            ctx.sender().send_message(&format!("{name} {line}"));
                        }
                    }
                    Ok(count(lines.len()))
                }),
            ),
    )?;
    Ok(())
}

fn upgrade(weak: &Weak<CommandDispatcher>) -> Result<Arc<CommandDispatcher>, CommandSyntaxError> {
    weak.upgrade()
        .ok_or_else(|| CommandSyntaxError::custom("dispatcher is shutting down"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdtree::{ErrorKind, RecordingSender};

    fn setup() -> (Arc<CommandDispatcher>, Arc<RecordingSender>, SenderRef) {
        let dispatcher = Arc::new(CommandDispatcher::new());
        register(&dispatcher).unwrap();
        let recorder = Arc::new(RecordingSender::new("tester"));
        let sender: SenderRef = recorder.clone();
        (dispatcher, recorder, sender)
    }

    #[test]
    fn test_add() {
        let (dispatcher, recorder, sender) = setup();
        assert_eq!(dispatcher.execute("add 2 3", &sender).unwrap().count(), 5);
        assert_eq!(recorder.messages(), vec!["5"]);
    }

    #[test]
    fn test_execute_as() {
        let (dispatcher, recorder, sender) = setup();
        dispatcher.execute("execute as bob whoami", &sender).unwrap();
        assert_eq!(recorder.messages(), vec!["[bob] bob"]);
    }

    #[test]
    fn test_execute_everyone() {
        let (dispatcher, recorder, sender) = setup();
        let result = dispatcher.execute("execute everyone say hi", &sender).unwrap();
        assert_eq!(result.count(), 3);
        assert_eq!(recorder.messages(), vec!["[alice] hi", "[bob] hi", "[carol] hi"]);
    }

    #[test]
    fn test_nested_aliases() {
        let (dispatcher, recorder, sender) = setup();
        dispatcher
            .execute("execute as bob execute as carol whoami", &sender)
            .unwrap();
        assert_eq!(recorder.messages(), vec!["[bob] [carol] carol"]);
    }

    #[test]
    fn test_repeat_default_times() {
        let (dispatcher, recorder, sender) = setup();
        assert_eq!(dispatcher.execute("repeat hey", &sender).unwrap().count(), 1);
        assert_eq!(dispatcher.execute("repeat \"a b\" 2", &sender).unwrap().count(), 2);
        assert_eq!(recorder.messages(), vec!["hey", "a b", "a b"]);
    }

    #[test]
    fn test_help_lists_commands() {
        let (dispatcher, recorder, sender) = setup();
        dispatcher.execute("help", &sender).unwrap();
        let messages = recorder.messages();
        assert!(messages.contains(&"add <a> <b>".to_owned()));
        assert!(messages.contains(&"execute (as|everyone|run)".to_owned()));
        assert!(messages.contains(&"repeat <text> [<times>]".to_owned()));
    }

    #[test]
    fn test_help_for_command() {
        let (dispatcher, recorder, sender) = setup();
        dispatcher.execute("help add", &sender).unwrap();
        assert_eq!(recorder.messages(), vec!["Add two integers", "add <a> <b>"]);
    }

    #[test]
    fn test_help_for_unknown_command() {
        let (dispatcher, _, sender) = setup();
        let error = dispatcher.execute("help nope", &sender).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::Custom("No help for 'nope'".to_owned()));
    }

    #[test]
    fn test_extras_toggle() {
        let (dispatcher, _, sender) = setup();
        assert_eq!(dispatcher.execute("extras off", &sender).unwrap().count(), 2);
        assert!(dispatcher.execute("color red", &sender).is_err());
        dispatcher.execute("extras on", &sender).unwrap();
        dispatcher.execute("color red", &sender).unwrap();
    }

    #[tokio::test]
    async fn test_name_suggestions() {
        let (dispatcher, _, sender) = setup();
        let parse = dispatcher.parse("execute as b", &sender);
        let suggestions = dispatcher.completion_suggestions(&parse).await;
        assert_eq!(suggestions.texts(), vec!["bob"]);
        assert_eq!(suggestions.list()[0].tooltip(), Some("known user"));
    }
}
