use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use taskboard::board::backup_file_name;
use taskboard::models::parse_tags;
use taskboard::{
    Board, Config, DocumentFormat, Group, LocalStore, Priority, StorageFactory, StorageKind, Task, TaskStatus,
    TaskUpdate,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Taskboard CLI - Task board with local or shared remote-document storage")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory holding the local database (default: platform data directory)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change storage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Manage groups
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },

    /// Print the board, seeding default groups on first use
    Board,

    /// Write groups and tasks to a JSON or YAML file
    Export {
        /// Output file (default: tasks_backup_<date>.json)
        path: Option<PathBuf>,
    },

    /// Replace groups and tasks from a JSON or YAML file
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the saved configuration
    Show,

    /// Update the saved configuration
    Set {
        #[arg(long, value_enum)]
        storage: Option<StorageKind>,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        document_id: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        /// Remote request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Create a task
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,

        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,

        /// Comma separated tags
        #[arg(short, long)]
        tags: Option<String>,

        #[arg(short, long)]
        group: Option<String>,
    },

    /// List tasks
    List {
        #[arg(short, long, value_enum)]
        status: Option<TaskStatus>,

        #[arg(short, long)]
        group: Option<String>,

        /// Only tasks past their due date
        #[arg(long)]
        overdue: bool,
    },

    /// Change fields of a task; an empty --due or --group clears it
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long, value_enum)]
        status: Option<TaskStatus>,

        #[arg(short, long, value_enum)]
        priority: Option<Priority>,

        #[arg(long)]
        due: Option<String>,

        #[arg(short, long)]
        tags: Option<String>,

        #[arg(short, long)]
        group: Option<String>,
    },

    /// Move a task to another column
    Move {
        id: String,

        #[arg(value_enum)]
        status: TaskStatus,
    },

    /// Delete a task
    Delete { id: String },
}

#[derive(Subcommand)]
enum GroupCommand {
    /// Create a group at the end of the order
    Add { name: String },

    /// List groups in order
    List,

    /// Rename a group
    Rename { id: String, name: String },

    /// Delete a group together with its tasks
    Delete { id: String },

    /// Set group order; unlisted groups follow the listed ones
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Create the default groups if there are none
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .map(|dir| dir.join("taskboard"))
            .ok_or_else(|| eyre!("No data directory on this platform, pass --data-dir"))?,
    };
    let store = LocalStore::open(&data_dir)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Config { command } => run_config(command, &store),
        Commands::Task { command } => run_task(command, &open_board(&store), today).await,
        Commands::Group { command } => run_group(command, &open_board(&store)).await,
        Commands::Board => print_board(&open_board(&store), today).await,
        Commands::Export { path } => {
            let board = open_board(&store);
            let path = path.unwrap_or_else(|| PathBuf::from(backup_file_name(today)));
            let text = DocumentFormat::from_path(&path).render(&board.export().await)?;
            fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
            Ok(())
        }
        Commands::Import { path } => {
            let board = open_board(&store);
            let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let document = DocumentFormat::from_path(&path).parse(&text)?;
            let summary = board.import(&document).await?;
            println!(
                "Imported {} groups and {} tasks",
                summary.groups.map_or("no".to_string(), |n| n.to_string()),
                summary.tasks.map_or("no".to_string(), |n| n.to_string())
            );
            Ok(())
        }
    }
}

fn open_board(store: &LocalStore) -> Board {
    let factory = StorageFactory::new(Config::load(store), store.clone());
    Board::open(&factory)
}

fn run_config(command: ConfigCommand, store: &LocalStore) -> Result<()> {
    let mut config = Config::load(store);

    match command {
        ConfigCommand::Show => {}
        ConfigCommand::Set {
            storage,
            api_key,
            document_id,
            base_url,
            timeout,
        } => {
            if api_key.is_some() || document_id.is_some() {
                let api_key = api_key.unwrap_or_else(|| config.remote.api_key.clone());
                let document_id = document_id.unwrap_or_else(|| config.remote.document_id.clone());
                config.set_remote(api_key, document_id);
            }
            if let Some(base_url) = base_url {
                config.remote.base_url = base_url.trim().to_string();
            }
            if let Some(timeout) = timeout {
                config.remote.timeout_secs = timeout;
            }
            if let Some(kind) = storage {
                config.set_storage(kind)?;
            }
            config.save(store)?;
            println!("{}", "Configuration saved".green());
        }
    }

    let storage = match config.storage_type {
        StorageKind::Local => "local",
        StorageKind::Cloud => "cloud",
    };
    let api_key = if config.remote.api_key.is_empty() { "(not set)" } else { "********" };
    let document_id = if config.remote.document_id.is_empty() {
        "(not set)"
    } else {
        config.remote.document_id.as_str()
    };

    let active = if StorageFactory::new(config.clone(), store.clone()).is_remote() {
        "remote document"
    } else {
        "local database"
    };

    println!("storage:     {} (using {})", storage.bold(), active);
    println!("api key:     {}", api_key);
    println!("document id: {}", document_id);
    println!("base url:    {}", config.remote.base_url);
    println!("timeout:     {}s", config.remote.timeout_secs);
    if let Some(dir) = store.base_path() {
        println!("data dir:    {}", dir.display());
    }
    if config.storage_type == StorageKind::Cloud && !config.is_cloud_enabled() {
        println!("{}", "Cloud storage is missing credentials, local storage will be used".yellow());
    }
    Ok(())
}

async fn run_task(command: TaskCommand, board: &Board, today: NaiveDate) -> Result<()> {
    match command {
        TaskCommand::Add {
            title,
            description,
            priority,
            due,
            tags,
            group,
        } => {
            let mut task = Task::new(title.trim());
            task.description = description;
            task.priority = priority;
            task.due_date = due.filter(|d| !d.is_empty());
            task.tags = tags.as_deref().map(parse_tags).unwrap_or_default();
            task.group_id = group.filter(|g| !g.is_empty());

            let task = board.tasks.add(task).await?;
            println!("Added {}", task.id.cyan());
        }
        TaskCommand::List { status, group, overdue } => {
            let mut tasks = match (status, group.as_deref()) {
                (Some(status), _) => board.tasks.by_status(status).await,
                (None, Some(group)) => board.tasks.by_group(group).await,
                (None, None) => board.tasks.all().await,
            };
            if let (Some(_), Some(group)) = (status, group.as_deref()) {
                tasks.retain(|t| t.group_id.as_deref() == Some(group));
            }
            if overdue {
                tasks.retain(|t| t.is_overdue(today));
            }

            let names = group_names(&board.groups.all().await);
            for task in &tasks {
                print_task(task, &names, today);
            }
            if tasks.is_empty() {
                println!("No tasks");
            }
        }
        TaskCommand::Update {
            id,
            title,
            description,
            status,
            priority,
            due,
            tags,
            group,
        } => {
            let update = TaskUpdate {
                title,
                description,
                status,
                priority,
                due_date: due,
                tags: tags.as_deref().map(parse_tags),
                group_id: group,
            };
            if update.is_empty() {
                return Err(eyre!("Nothing to update"));
            }

            match board.tasks.update(&id, &update).await? {
                Some(task) => println!("Updated {}", task.id.cyan()),
                None => return Err(eyre!("Task not found: {}", id)),
            }
        }
        TaskCommand::Move { id, status } => match board.tasks.move_to(&id, status).await? {
            Some(task) => println!("Moved {} to {}", task.id.cyan(), status),
            None => return Err(eyre!("Task not found: {}", id)),
        },
        TaskCommand::Delete { id } => {
            board.tasks.delete(&id).await?;
            println!("Deleted {}", id.cyan());
        }
    }

    Ok(())
}

async fn run_group(command: GroupCommand, board: &Board) -> Result<()> {
    match command {
        GroupCommand::Add { name } => {
            let group = board.groups.add(&name).await?;
            println!("Added {} {}", group.id.cyan(), group.name);
        }
        GroupCommand::List => {
            let groups = board.groups.ordered().await;
            for group in &groups {
                println!("{:>3}  {}  {} {}", group.order, group.id.dimmed(), group.name.bold(), group.color.dimmed());
            }
            if groups.is_empty() {
                println!("No groups");
            }
        }
        GroupCommand::Rename { id, name } => match board.groups.rename(&id, &name).await? {
            Some(group) => println!("Renamed {} to {}", group.id.cyan(), group.name),
            None => return Err(eyre!("Group not found: {}", id)),
        },
        GroupCommand::Delete { id } => match board.delete_group_cascade(&id).await? {
            Some(removed) => println!("Deleted {} and {} tasks", id.cyan(), removed),
            None => return Err(eyre!("Group not found: {}", id)),
        },
        GroupCommand::Reorder { ids } => {
            for group in board.groups.reorder(&ids).await? {
                println!("{:>3}  {}", group.order, group.name);
            }
        }
        GroupCommand::Seed => {
            if board.groups.init_default().await? {
                println!("Created default groups");
            } else {
                println!("Groups already exist");
            }
        }
    }

    Ok(())
}

async fn print_board(board: &Board, today: NaiveDate) -> Result<()> {
    board.groups.init_default().await?;
    let names = group_names(&board.groups.all().await);

    let backend = match board.tasks.collection().adapter().kind() {
        StorageKind::Local => "local",
        StorageKind::Cloud => "cloud",
    };
    println!("{}", format!("Board ({} storage)", backend).dimmed());
    println!();

    for (status, tasks) in board.tasks.columns().await {
        let header = format!("{} ({})", status.as_str().to_uppercase(), tasks.len());
        println!("{}", header.bold().underline());
        for task in &tasks {
            print_task(task, &names, today);
        }
        println!();
    }
    Ok(())
}

fn group_names(groups: &[Group]) -> HashMap<String, String> {
    groups.iter().map(|g| (g.id.clone(), g.name.clone())).collect()
}

fn print_task(task: &Task, groups: &HashMap<String, String>, today: NaiveDate) {
    let priority = match task.priority {
        Priority::High => "high".red(),
        Priority::Medium => "medium".yellow(),
        Priority::Low => "low".green(),
    };
    let title = if task.status == TaskStatus::Done {
        task.title.dimmed()
    } else {
        task.title.normal()
    };

    let mut line = format!("  {} [{}] {}", task.id.dimmed(), priority, title);
    if let Some(group) = task.group_id.as_ref().and_then(|id| groups.get(id)) {
        line.push_str(&format!(" @{}", group));
    }
    if !task.tags.is_empty() {
        line.push_str(&format!(" #{}", task.tags.join(" #")));
    }
    if let Some(due) = &task.due_date {
        if task.is_overdue(today) {
            line.push_str(&format!(" {}", format!("due {}", due).red()));
        } else {
            line.push_str(&format!(" due {}", due));
        }
    }
    println!("{}", line);
}
