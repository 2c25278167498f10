use anyhow::{Context, Result};
use clap::Subcommand;

use taskhub::config::Config;
use taskhub::models::{Task, TaskStatus};
use taskhub::storage::{SqliteTaskStore, TaskStore};

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add {
        /// Task ID
        id: u64,

        /// Task name
        #[arg(short, long)]
        name: String,

        /// Cron expression (empty for a one-shot task)
        #[arg(short, long, default_value = "")]
        cron: String,

        /// Initial status
        #[arg(short, long, default_value = "stopped", value_parser = parse_status)]
        status: TaskStatus,
    },

    /// List all tasks
    List,

    /// Show a single task
    Show {
        /// Task ID
        id: u64,
    },
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::from_known(s).ok_or_else(|| {
        format!(
            "unknown task status '{s}' (expected unknown, running, stopped, \
             unexpected_exit, completed or running_timeout)"
        )
    })
}

/// Run a task management command against the configured database
pub async fn task(config: &Config, command: TaskCommand) -> Result<()> {
    let store = SqliteTaskStore::new(&config.database.sqlite_path).with_context(|| {
        format!(
            "Failed to open task database: {}",
            config.database.sqlite_path.display()
        )
    })?;

    match command {
        TaskCommand::Add {
            id,
            name,
            cron,
            status,
        } => {
            let task = Task::new(id, name, cron, status);
            store.insert(&task)?;
            tracing::info!(task_id = %id, "Task added");
            println!("Added task {} ({})", task.id, task.status);
        }

        TaskCommand::List => {
            let tasks = store.list()?;
            if tasks.is_empty() {
                println!("No tasks.");
                return Ok(());
            }
            println!("{:<8} {:<24} {:<16} {}", "ID", "NAME", "STATUS", "CRON");
            println!("{:-<64}", "");
            for task in tasks {
                println!(
                    "{:<8} {:<24} {:<16} {}",
                    task.id,
                    task.name,
                    task.status,
                    if task.is_recurring() { task.cron_spec.as_str() } else { "-" }
                );
            }
        }

        TaskCommand::Show { id } => {
            let task = store.load_by_id(id).await?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
    }

    Ok(())
}
