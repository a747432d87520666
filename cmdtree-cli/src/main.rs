//! Interactive shell over the demo command grammar.
//!
//! # Usage
//!
//! ```bash
//! # Interactive: one command per line, "?<partial>" lists completions
//! cmdtree
//!
//! # One-shot
//! cmdtree -c "add 2 3" -c "execute everyone say hi"
//! cmdtree --complete "execute as "
//! cmdtree --usage
//! ```

mod config;
mod demo;

use anyhow::Context;
use clap::Parser;
use cmdtree::{
    CommandDispatcher, CommandSyntaxError, NodeId, SenderRef, Suggestions, TracingFormat,
};
use config::CliConfig;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "cmdtree", version, about = "Shell for a tree-structured command grammar")]
struct Cli {
    /// JSON config file with `dispatcher` and `log` sections
    #[arg(long, env = "CMDTREE_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "cmdtree=trace"
    #[arg(long, env = "CMDTREE_LOG")]
    log_level: Option<String>,

    #[arg(long, value_enum, env = "CMDTREE_LOG_FORMAT")]
    log_format: Option<TracingFormat>,

    /// Deadline for each suggestion provider, in milliseconds
    #[arg(long, env = "CMDTREE_SUGGESTION_TIMEOUT_MS")]
    suggestion_timeout_ms: Option<u64>,

    /// Execute a command and exit (repeatable)
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    commands: Vec<String>,

    /// Print completions for a partial line and exit
    #[arg(long, value_name = "LINE")]
    complete: Option<String>,

    /// Print completions as JSON
    #[arg(long)]
    json: bool,

    /// Print usage of every command and exit
    #[arg(long)]
    usage: bool,
}

impl Cli {
    fn apply(&self, config: &mut CliConfig) {
        if let Some(level) = &self.log_level {
            config.log.level = Some(level.clone());
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
        if let Some(timeout) = self.suggestion_timeout_ms {
            config.dispatcher.suggestion_timeout_ms = Some(timeout);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    cmdtree::init_subscriber_with_config(config.log.clone())
        .context("failed to install tracing subscriber")?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let dispatcher = Arc::new(CommandDispatcher::with_config(config.dispatcher));
    demo::register(&dispatcher).context("failed to register demo commands")?;
    let console: SenderRef = Arc::new(demo::ConsoleSender);

    if cli.usage {
        for (_, line) in dispatcher.smart_usage(NodeId::ROOT, console.as_ref()) {
            println!("{line}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(partial) = &cli.complete {
        let suggestions = complete(&dispatcher, partial, &console).await;
        print_suggestions(&suggestions, cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.commands.is_empty() {
        let mut code = ExitCode::SUCCESS;
        for line in &cli.commands {
            if !execute(&dispatcher, line, &console) {
                code = ExitCode::FAILURE;
            }
        }
        return Ok(code);
    }

    repl(&dispatcher, &console, cli.json).await?;
    Ok(ExitCode::SUCCESS)
}

async fn repl(dispatcher: &CommandDispatcher, console: &SenderRef, json: bool) -> anyhow::Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if interactive {
        println!("Type 'help' for commands, '?<partial>' for completions, Ctrl-D to quit.");
    }
    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush().context("failed to write prompt")?;
        }
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim_end();
        if let Some(partial) = line.strip_prefix('?') {
            let suggestions = complete(dispatcher, partial, console).await;
            print_suggestions(&suggestions, json)?;
        } else if !line.trim().is_empty() {
            execute(dispatcher, line, console);
        }
    }
    Ok(())
}

/// Run one line, reporting failures on stderr. Returns whether it succeeded.
fn execute(dispatcher: &CommandDispatcher, line: &str, console: &SenderRef) -> bool {
    match dispatcher.execute(line, console) {
        Ok(result) => {
            tracing::debug!(line, count = result.count(), "Command finished");
            true
        }
        Err(error) => {
            report(&error);
            false
        }
    }
}

async fn complete(dispatcher: &CommandDispatcher, partial: &str, console: &SenderRef) -> Suggestions {
    let parse = dispatcher.parse(partial, console);
    dispatcher.completion_suggestions(&parse).await
}

fn print_suggestions(suggestions: &Suggestions, json: bool) -> anyhow::Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(suggestions).context("failed to serialize suggestions")?;
        println!("{rendered}");
        return Ok(());
    }
    for suggestion in suggestions.list() {
        match suggestion.tooltip() {
            Some(tooltip) => println!("{}\t{tooltip}", suggestion.text()),
            None => println!("{}", suggestion.text()),
        }
    }
    Ok(())
}

fn report(error: &CommandSyntaxError) {
    if let Some(caret) = error.caret() {
        eprintln!("{caret}");
    }
    eprintln!("{error}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "cmdtree",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--suggestion-timeout-ms",
            "75",
        ]);
        let mut config = CliConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.log.level.as_deref(), Some("debug"));
        assert_eq!(config.log.format, TracingFormat::Json);
        assert_eq!(config.dispatcher.suggestion_timeout_ms, Some(75));
    }

    #[test]
    fn test_repeated_commands() {
        let cli = Cli::parse_from(["cmdtree", "-c", "add 1 2", "--command", "whoami"]);
        assert_eq!(cli.commands, vec!["add 1 2", "whoami"]);
        assert!(cli.complete.is_none());
    }

    #[test]
    fn test_execute_reports_failure() {
        let dispatcher = Arc::new(CommandDispatcher::new());
        demo::register(&dispatcher).unwrap();
        let console: SenderRef = Arc::new(demo::ConsoleSender);
        assert!(execute(&dispatcher, "add 1 2", &console));
        assert!(!execute(&dispatcher, "add 1 x", &console));
    }
}
