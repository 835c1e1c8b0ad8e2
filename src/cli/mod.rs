//! Command-line interface for cotask
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand group is defined in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::store::TaskStore;

mod demo;
mod init;
mod task;

/// cotask - shared task registry for concurrent sessions
///
/// A CLI over a concurrency-safe task/user store with best-effort
/// JSON snapshot persistence.
#[derive(Parser, Debug)]
#[command(name = "cotask")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Working root holding cotask.toml and the data directory
    #[arg(long, global = true, env = "COTASK_DIR")]
    pub dir: Option<PathBuf>,

    /// Acting username for mutations
    #[arg(long, global = true, env = "COTASK_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a cotask working root
    Init,

    /// Add a task
    Add {
        /// Task description
        description: String,

        /// Task category (defaults to the configured default)
        #[arg(long)]
        category: Option<String>,

        /// Assignee (defaults to --user)
        #[arg(long)]
        assignee: Option<String>,
    },

    /// List tasks
    List {
        /// Only tasks assigned to this user
        #[arg(long)]
        assignee: Option<String>,

        /// Only tasks in this category
        #[arg(long)]
        category: Option<String>,

        /// Only pending tasks
        #[arg(long)]
        pending: bool,
    },

    /// Complete one of your tasks
    Complete {
        /// Task id
        id: u64,
    },

    /// Remove a task
    Remove {
        /// Task id
        id: u64,
    },

    /// Reassign a task to another user
    Reassign {
        /// Task id
        id: u64,

        /// New assignee
        #[arg(long)]
        to: String,

        /// Expected current assignee (omit to override ownership)
        #[arg(long)]
        from: Option<String>,
    },

    /// List registered users
    Users,

    /// List known categories
    Categories,

    /// Run the concurrent-sessions demo workload
    Demo {
        /// Number of concurrent sessions
        #[arg(long)]
        sessions: Option<usize>,

        /// Tasks each session creates
        #[arg(long)]
        tasks_per_session: Option<usize>,
    },
}

/// Shared command context: resolved config and an open store.
pub(crate) struct Context {
    pub config: Config,
    pub store: Arc<TaskStore>,
    pub json: bool,
    pub quiet: bool,
    pub user: Option<String>,
}

impl Context {
    fn build(dir: Option<PathBuf>, json: bool, quiet: bool, user: Option<String>) -> Result<Self> {
        let root = match dir {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let config = Config::load_or_default(&root)?;
        let store = Arc::new(TaskStore::open(
            config.tasks_file(&root),
            config.users_file(&root),
        ));
        Ok(Self {
            config,
            store,
            json,
            quiet,
            user,
        })
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => init::run(self.dir, self.json, self.quiet),
            Commands::Add {
                description,
                category,
                assignee,
            } => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                task::run_add(&ctx, &description, category.as_deref(), assignee.as_deref())
            }
            Commands::List {
                assignee,
                category,
                pending,
            } => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                task::run_list(&ctx, assignee.as_deref(), category.as_deref(), pending)
            }
            Commands::Complete { id } => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                task::run_complete(&ctx, id)
            }
            Commands::Remove { id } => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                task::run_remove(&ctx, id)
            }
            Commands::Reassign { id, to, from } => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                task::run_reassign(&ctx, id, from.as_deref(), &to)
            }
            Commands::Users => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                task::run_users(&ctx)
            }
            Commands::Categories => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                task::run_categories(&ctx)
            }
            Commands::Demo {
                sessions,
                tasks_per_session,
            } => {
                let ctx = Context::build(self.dir, self.json, self.quiet, self.user)?;
                demo::run(&ctx, sessions, tasks_per_session)
            }
        }
    }
}
