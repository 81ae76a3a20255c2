mod analysis;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod pivot;
mod recent;
mod settings;
mod store;
mod tasks;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{CategoriesCommands, Cli, Commands, FilesCommands, TasksCommands};

fn init_logging() {
    let filter = EnvFilter::try_from_env("INTAKE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            business,
            owner,
        } => cli::init::run(data_dir, business, owner),
        Commands::Import { file, task, strict } => cli::import::run(&file, task, strict),
        Commands::Files { command } => match command {
            FilesCommands::List { status, mine } => cli::files::list(status, mine),
            FilesCommands::Delete { id } => cli::files::delete(id),
        },
        Commands::Analyze { file } => cli::analyze::run(file),
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Add {
                name,
                category_type,
            } => cli::categories::add(&name, &category_type),
        },
        Commands::Tasks { command } => match command {
            TasksCommands::List => cli::tasks::list(),
            TasksCommands::Add {
                name,
                category,
                task_type,
                description,
            } => cli::tasks::add(&name, category.as_deref(), &task_type, description.as_deref()),
            TasksCommands::Respond { task, value } => cli::tasks::respond(task, &value),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
