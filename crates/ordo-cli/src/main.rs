//! ordo - journal sequence allocator CLI
//!
//! Operator tool over `ordo-core`: initialize a database, register
//! owners, exercise create/move/delete, and audit group density.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ordo_core::allocator::SequenceAllocator;
use ordo_core::category::Category;
use ordo_core::config::OrdoConfig;
use ordo_core::store::SqliteStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

mod commands;

/// ordo - journal sequence allocator
#[derive(Parser, Debug)]
#[command(name = "ordo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database and apply the schema
    Init,

    /// Register an owner
    AddOwner {
        /// Display name
        name: String,

        /// Owner id; generated if omitted
        #[arg(long, value_parser = parse_uuid)]
        id: Option<Uuid>,
    },

    /// Create an article at the end of its category group
    Create {
        /// Owner id
        #[arg(value_parser = parse_uuid)]
        owner: Uuid,

        /// Target category (identifier or display name)
        #[arg(value_parser = parse_category)]
        category: Category,

        /// Article title
        title: String,

        /// Article body
        #[arg(long, default_value = "")]
        body: String,
    },

    /// Move an article to another category
    #[command(name = "move")]
    MoveArticle {
        /// Owner id
        #[arg(value_parser = parse_uuid)]
        owner: Uuid,

        /// Article id
        #[arg(value_parser = parse_uuid)]
        article: Uuid,

        /// Destination category
        #[arg(value_parser = parse_category)]
        category: Category,
    },

    /// Delete an article and densify its group
    Delete {
        /// Owner id
        #[arg(value_parser = parse_uuid)]
        owner: Uuid,

        /// Article id
        #[arg(value_parser = parse_uuid)]
        article: Uuid,
    },

    /// List a group's articles in seq order
    #[command(alias = "ls")]
    List {
        /// Owner id
        #[arg(value_parser = parse_uuid)]
        owner: Uuid,

        /// Category to list
        #[arg(value_parser = parse_category)]
        category: Category,
    },

    /// Show per-category group sizes for an owner
    Sizes {
        /// Owner id
        #[arg(value_parser = parse_uuid)]
        owner: Uuid,
    },

    /// Verify the density invariant
    Audit {
        /// Owner id
        #[arg(value_parser = parse_uuid)]
        owner: Uuid,

        /// Restrict the audit to one category
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },
}

fn parse_uuid(s: &str) -> Result<Uuid, String> {
    Uuid::parse_str(s).map_err(|e| format!("invalid id '{s}': {e}"))
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse::<Category>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = match &cli.config {
        Some(path) => OrdoConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => OrdoConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;
    store.set_busy_timeout(config.busy_timeout())?;
    let allocator = SequenceAllocator::new(store, &config);

    match cli.command {
        Commands::Init => commands::admin::init(&allocator, &config.db_path),
        Commands::AddOwner { name, id } => commands::admin::add_owner(&allocator, id, &name),
        Commands::Create {
            owner,
            category,
            title,
            body,
        } => commands::articles::create(&allocator, owner, category, title, body),
        Commands::MoveArticle {
            owner,
            article,
            category,
        } => commands::articles::move_article(&allocator, owner, article, category),
        Commands::Delete { owner, article } => {
            commands::articles::delete(&allocator, owner, article)
        }
        Commands::List { owner, category } => commands::articles::list(&allocator, owner, category),
        Commands::Sizes { owner } => commands::articles::sizes(&allocator, owner),
        Commands::Audit { owner, category } => commands::audit::run(&allocator, owner, category),
    }
}
