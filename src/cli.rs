use crate::agents::AgentRole;
use crate::constants::DEFAULT_API_PORT;
use crate::core::TaskStatus;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface for the application
#[derive(Parser)]
#[command(name = "agentdeck", version, about = "Configure AI agents and stream tasks through them")]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Sets the logging verbosity level for the application
    /// Possible values: "error", "warn", "info", "debug", "trace"
    #[arg(long, global = true, default_value_t = String::from("warn"))]
    pub logging_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage agents
    Agent {
        #[command(subcommand)]
        action: AgentCommand,
    },
    /// Manage and run tasks
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// List the models known to the client
    Models,
    /// Start the HTTP API
    Serve {
        #[arg(short, long, default_value_t = DEFAULT_API_PORT)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Create an agent
    Create(AgentArgs),
    /// List agents, newest first
    List {
        /// Oldest first instead
        #[arg(long)]
        oldest: bool,
    },
    /// Show one agent with its full system message
    Show { id: String },
    /// Delete an agent that has no tasks
    Delete { id: String },
}

#[derive(Args)]
pub struct AgentArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, value_enum, default_value_t = AgentRole::Custom)]
    pub role: AgentRole,

    /// Provider model id; defaults to the configured model
    #[arg(long)]
    pub model: Option<String>,

    /// Asked interactively when omitted
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Capability listed in the system message (repeatable)
    #[arg(long = "capability")]
    pub capabilities: Vec<String>,

    /// Function name listed in the system message (repeatable)
    #[arg(long = "function")]
    pub functions: Vec<String>,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Create(TaskArgs),
    /// List tasks, newest first
    List {
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,

        /// Oldest first instead
        #[arg(long)]
        oldest: bool,
    },
    /// Show one task with its result
    Show { id: String },
    /// Delete a task
    Delete { id: String },
    /// Execute a task, streaming its output
    Run { id: String },
}

#[derive(Args)]
pub struct TaskArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Id of the agent running the task
    #[arg(long)]
    pub agent: String,

    /// Task whose result is given as context; it must be done before this one runs
    #[arg(long)]
    pub parent: Option<String>,

    /// Ask for a single JSON object instead of free text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_agent_creation() {
        let cli = Cli::try_parse_from([
            "agentdeck",
            "agent",
            "create",
            "--name",
            "Ada",
            "--role",
            "engineer",
            "--capability",
            "rust",
            "--capability",
            "sql",
        ])
        .unwrap();
        match cli.command {
            Command::Agent {
                action: AgentCommand::Create(args),
            } => {
                assert_eq!(args.name, "Ada");
                assert_eq!(args.role, AgentRole::Engineer);
                assert_eq!(args.capabilities, vec!["rust", "sql"]);
                assert!(args.system_prompt.is_none());
            }
            _ => panic!("expected agent create"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "agentdeck",
            "task",
            "list",
            "--status",
            "in_progress",
            "--oldest",
            "--config",
            "deck.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("deck.yaml")));
        assert_eq!(cli.logging_level, "warn");
        assert!(matches!(
            cli.command,
            Command::Task {
                action: TaskCommand::List {
                    status: Some(TaskStatus::InProgress),
                    oldest: true
                }
            }
        ));
    }

    #[test]
    fn serve_uses_default_port() {
        let cli = Cli::try_parse_from(["agentdeck", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { port: 3000 }));
    }
}
