use super::{render, CommandResult};
use crate::agents::AgentDraft;
use crate::cli::{AgentArgs, AgentCommand};
use crate::config::AppConfig;
use crate::core::Dashboard;
use crate::llm::models::model_spec;
use colored::Colorize;
use dialoguer::Input;

pub fn run(action: AgentCommand, dashboard: &Dashboard, config: &AppConfig) -> CommandResult {
    match action {
        AgentCommand::Create(args) => create(args, dashboard, config),
        AgentCommand::List { oldest } => {
            let agents = dashboard.list_agents(super::sort_order(oldest))?;
            if agents.is_empty() {
                println!("No agents yet. Create one with `agentdeck agent create`.");
            }
            for agent in &agents {
                println!("{}", render::agent_line(agent));
            }
            Ok(())
        }
        AgentCommand::Show { id } => {
            println!("{}", render::agent_details(&dashboard.get_agent(&id)?));
            Ok(())
        }
        AgentCommand::Delete { id } => {
            dashboard.delete_agent(&id)?;
            println!("{} agent {}", "Deleted".red(), id);
            Ok(())
        }
    }
}

fn create(args: AgentArgs, dashboard: &Dashboard, config: &AppConfig) -> CommandResult {
    let system_prompt = match args.system_prompt {
        Some(prompt) => prompt,
        None => Input::<String>::new()
            .with_prompt(format!("System prompt for {}", args.name))
            .interact_text()?,
    };
    let model = args.model.unwrap_or_else(|| config.default_model.clone());
    if model_spec(&model).is_none() {
        eprintln!(
            "{} {} is not a known model, default limits will be used",
            "warning:".yellow().bold(),
            model
        );
    }

    let agent = dashboard.create_agent(AgentDraft {
        name: args.name,
        role: args.role,
        system_prompt,
        model,
        capabilities: args.capabilities,
        functions: args.functions,
    })?;
    println!("{} {}", "Created".green(), render::agent_line(&agent));
    Ok(())
}
