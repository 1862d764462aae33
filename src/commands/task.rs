use super::{build_dashboard, render, CommandResult};
use crate::cli::{TaskArgs, TaskCommand};
use crate::config::AppConfig;
use crate::core::{Dashboard, OutputFormat, TaskDraft};
use crate::db::SortOrder;
use crate::event::{EventKind, StreamEvent};
use colored::Colorize;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{Stdout, Write};
use std::time::Duration;

pub async fn run(action: TaskCommand, config: &AppConfig) -> CommandResult {
    let credential = match &action {
        TaskCommand::Run { .. } => resolve_credential(config)?,
        _ => String::new(),
    };
    let dashboard = build_dashboard(config, &credential)?;

    match action {
        TaskCommand::Create(args) => create(args, &dashboard),
        TaskCommand::List { status, oldest } => {
            let names: HashMap<String, String> = dashboard
                .list_agents(SortOrder::default())?
                .into_iter()
                .map(|agent| (agent.id, agent.name))
                .collect();
            let tasks = dashboard.list_tasks(status, super::sort_order(oldest))?;
            if tasks.is_empty() {
                println!("No tasks found.");
            }
            for task in &tasks {
                let agent = names.get(&task.agent_id).map(String::as_str);
                println!("{}", render::task_line(task, agent));
            }
            Ok(())
        }
        TaskCommand::Show { id } => {
            println!("{}", render::task_details(&dashboard.get_task(&id)?));
            Ok(())
        }
        TaskCommand::Delete { id } => {
            dashboard.delete_task(&id)?;
            println!("{} task {}", "Deleted".red(), id);
            Ok(())
        }
        TaskCommand::Run { id } => execute(&dashboard, &id).await,
    }
}

fn create(args: TaskArgs, dashboard: &Dashboard) -> CommandResult {
    let task = dashboard.create_task(TaskDraft {
        title: args.title,
        description: args.description,
        agent_id: args.agent,
        parent_task_id: args.parent,
        output_format: if args.json {
            OutputFormat::JsonObject
        } else {
            OutputFormat::Text
        },
    })?;
    println!("{} {}", "Created".green(), render::task_line(&task, None));
    Ok(())
}

/// API key from the configuration, or asked on the terminal
fn resolve_credential(config: &AppConfig) -> Result<String, dialoguer::Error> {
    match &config.api_key {
        Some(key) => Ok(key.clone()),
        None => Password::new().with_prompt("Groq API key").interact(),
    }
}

/// Runs a task while streaming its output to stdout and the live feed to stderr
///
/// Everything shown comes from the event bus. Ctrl-C abandons the run, which
/// leaves the task failed as interrupted.
async fn execute(dashboard: &Dashboard, task_id: &str) -> CommandResult {
    let task = dashboard.get_task(task_id)?;
    eprintln!("{} {}", "Running".bold(), task.title);

    let (subscription, mut events) = dashboard.events().subscribe_channel(true);
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Queued");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut feed = Feed {
        task_id,
        spinner: &spinner,
        stdout: std::io::stdout(),
        printed: 0,
    };
    let execution = dashboard.execute_task(task_id);
    tokio::pin!(execution);

    let outcome = loop {
        tokio::select! {
            outcome = &mut execution => break Some(outcome),
            _ = tokio::signal::ctrl_c() => break None,
            Some(event) = events.recv() => feed.show(&event)?,
        }
    };
    while let Ok(event) = events.try_recv() {
        feed.show(&event)?;
    }
    subscription.unsubscribe();
    spinner.finish_and_clear();

    let Some(outcome) = outcome else {
        // The abandoned run is dropped on return and recorded as interrupted.
        if feed.printed > 0 {
            writeln!(feed.stdout)?;
        }
        eprintln!("{} {}", "Interrupted:".red().bold(), task.title);
        return Err("task run interrupted".into());
    };

    match outcome {
        Ok(task) => {
            if let Some(rest) = task.result.as_deref().and_then(|r| r.get(feed.printed..)) {
                write!(feed.stdout, "{}", rest)?;
            }
            writeln!(feed.stdout)?;
            eprintln!("{} {}", "Task".bold(), render::status_badge(task.status));
            Ok(())
        }
        Err(err) => {
            if feed.printed > 0 {
                writeln!(feed.stdout)?;
            }
            eprintln!("{} {}", "Task failed:".red().bold(), err);
            Err(err.into())
        }
    }
}

/// Terminal side of a running task's live feed
struct Feed<'a> {
    task_id: &'a str,
    spinner: &'a ProgressBar,
    stdout: Stdout,
    printed: usize,
}

impl Feed<'_> {
    fn show(&mut self, event: &StreamEvent) -> std::io::Result<()> {
        let own = event.task_id.as_deref() == Some(self.task_id);
        match event.kind {
            EventKind::Output if event.is_partial() && own => {
                self.spinner.finish_and_clear();
                write!(self.stdout, "{}", event.content)?;
                self.stdout.flush()?;
                self.printed += event.content.len();
            }
            // The complete text is printed from the returned task.
            EventKind::Output => {}
            EventKind::Thinking if own && !self.spinner.is_finished() => {
                self.spinner.set_message(event.content.clone())
            }
            _ if self.spinner.is_finished() => eprintln!("{}", render::event_line(event)),
            _ => self.spinner.println(render::event_line(event)),
        }
        Ok(())
    }
}
