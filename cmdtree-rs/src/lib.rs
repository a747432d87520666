//! # cmdtree: tree-structured command dispatch
//!
//! Commands are described as a tree of nodes. Literal nodes match fixed
//! keywords, argument nodes parse typed values. A [`CommandDispatcher`] walks
//! the tree over an input line, backtracking across alternatives, then runs
//! the matched action. Redirects let one subtree continue at another node,
//! optionally switching or fanning out the sender.
//!
//! ## Quick Start
//!
//! ```rust
//! use cmdtree::{arguments, CommandDispatcher, CommandResult, NodeSpec, RecordingSender};
//!
//! let dispatcher = CommandDispatcher::new();
//! dispatcher
//!     .register(
//!         NodeSpec::literal("say").then(
//!             NodeSpec::argument("message", arguments::greedy_string()).executes(|ctx| {
//!                 let message: String = ctx.argument("message")?;
//!                 ctx.sender().send_message(&message);
//!                 Ok(CommandResult::succeed())
//!             }),
//!         ),
//!     )
//!     .unwrap();
//!
//! let console = RecordingSender::new("console");
//! let sender = console.shared();
//! dispatcher.execute("say hello world", &sender).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`reader`]: cursor over the input with typed token readers
//! - [`arguments`]: built-in argument parsers
//! - [`node`]: node specs and the nodes they become
//! - [`context`]: parse state and the context actions receive
//! - [`dispatcher`]: parse, execute, suggest
//! - [`suggestion`]: completion values and providers

pub mod arguments;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod node;
pub mod range;
pub mod reader;
pub mod result;
pub mod sender;
pub mod suggestion;
pub mod tracing_support;
pub mod tree;
mod usage;

pub use arguments::{ArgumentType, ParsedArgument, ParsedValue};
pub use config::DispatcherConfig;
pub use context::{
    CommandContext, CommandContextBuilder, ParseResults, ParsedCommandNode, SuggestionContext,
};
pub use dispatcher::CommandDispatcher;
pub use error::{CommandSyntaxError, ErrorKind, TreeError};
pub use node::{Command, CommandNode, NodeId, NodeKind, NodeSpec, RedirectModifier, Requirement};
pub use range::TextRange;
pub use reader::TextReader;
pub use result::{CommandResult, LoggingConsumer, ResultConsumer};
pub use sender::{CommandSender, Plugin, RecordingSender, SenderRef};
pub use suggestion::{Suggestion, SuggestionProvider, Suggestions, SuggestionsBuilder};
pub use tree::CommandTree;
pub use uuid::Uuid;

pub use tracing_support::init_subscriber;
#[cfg(feature = "tracing")]
pub use tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
