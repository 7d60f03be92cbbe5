//! # Context Relay CLI (`ctxr`)
//!
//! The `ctxr` binary is the command-line frontend for a shared team
//! context backend. It handles authentication (with transparent bearer
//! token refresh), project management, context search, and analytics.
//!
//! ## Usage
//!
//! ```bash
//! ctxr --config ./config/ctxr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ctxr register <name> <email>` | Create an account; prints the one-time API key |
//! | `ctxr login <email>` | Log in and cache the session credentials |
//! | `ctxr logout` | Log out and clear cached credentials |
//! | `ctxr whoami` | Show the current user |
//! | `ctxr key rotate` | Rotate the account API key |
//! | `ctxr project <list\|create\|get\|update\|delete\|contributor>` | Project CRUD |
//! | `ctxr context <save\|search\|get\|retrieve>` | Save and search context |
//! | `ctxr graphs <overview\|tags>` | Analytics charts and tag graph |
//! | `ctxr health` | Backend health check |
//!
//! Passwords are taken from `--password` or the `CTXR_PASSWORD`
//! environment variable.
//!
//! ## Examples
//!
//! ```bash
//! # Log in (password via environment)
//! CTXR_PASSWORD=... ctxr login ada@example.com
//!
//! # Create a project and save context into it
//! ctxr project create "platform" "Team platform docs"
//! ctxr context save "Deploys go through the staging gate." --project <id> --tag deploys
//!
//! # Search across accessible projects
//! ctxr context search "how do deploys work" --limit 5
//!
//! # Pipe a file in
//! cat runbook.md | ctxr context save - --project <id> --source runbook
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use context_relay::client::ApiClient;
use context_relay::credentials::CredentialStore;
use context_relay::session::Session;
use context_relay::{account, config, context, graphs, projects};

/// Context Relay CLI: a command-line client for a shared team context
/// backend.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file holding the backend base URL and retrieval defaults.
#[derive(Parser)]
#[command(
    name = "ctxr",
    about = "Context Relay, a command-line client for a shared team context backend",
    version,
    long_about = "Context Relay talks to a shared context backend: authentication with \
    transparent bearer-token refresh, project CRUD with contributor management, semantic \
    context search and retrieval, and analytics chart overviews."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ctxr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Register a new account.
    ///
    /// Prints the one-time API key issued at registration; it is never
    /// shown again. Registration logs in automatically when possible.
    Register {
        /// Display name.
        name: String,
        /// Email address (used to log in).
        email: String,
        /// Password (min 8 characters).
        #[arg(long, env = "CTXR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in and cache session credentials.
    Login {
        /// Email address.
        email: String,
        /// Password.
        #[arg(long, env = "CTXR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out. Clears cached credentials even if the backend call fails.
    Logout,

    /// Show the currently logged-in user.
    Whoami,

    /// Manage the account API key.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Manage projects and their contributors.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Save and search shared context.
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Analytics charts and the tag knowledge graph.
    Graphs {
        #[command(subcommand)]
        action: GraphsAction,
    },

    /// Check backend health.
    Health,
}

/// API key subcommands.
#[derive(Subcommand)]
enum KeyAction {
    /// Rotate the API key. The new key is shown exactly once.
    Rotate,
}

/// Project subcommands.
#[derive(Subcommand)]
enum ProjectAction {
    /// List projects you own or contribute to.
    List,
    /// Create a project.
    Create {
        name: String,
        description: String,
    },
    /// Show a project with its contributors.
    Get {
        /// Project id.
        id: String,
    },
    /// Update a project's name and/or description (owner only).
    Update {
        /// Project id.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project and its context (owner only).
    Delete {
        /// Project id.
        id: String,
    },
    /// Manage project contributors (owner only).
    Contributor {
        #[command(subcommand)]
        action: ContributorAction,
    },
}

/// Contributor subcommands.
#[derive(Subcommand)]
enum ContributorAction {
    /// Add a contributor by email.
    Add {
        /// Project id.
        project_id: String,
        /// Email of the user to add.
        email: String,
    },
    /// Remove a contributor by user id.
    Remove {
        /// Project id.
        project_id: String,
        /// User id of the contributor to remove.
        user_id: String,
    },
}

/// Context subcommands.
#[derive(Subcommand)]
enum ContextAction {
    /// Save a piece of context. Use `-` to read content from stdin.
    Save {
        /// The content to save, or `-` for stdin.
        content: String,
        /// Project to save into (omit for a personal note).
        #[arg(long)]
        project: Option<String>,
        /// Tags; repeat the flag for multiple.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Source label stored with the chunk.
        #[arg(long, default_value = "cli")]
        source: String,
    },
    /// Semantic search across accessible projects.
    Search {
        /// The search query.
        query: String,
        /// Restrict to one project.
        #[arg(long)]
        project: Option<String>,
        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,
        /// Minimum similarity score in [0.0, 1.0].
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Fetch a chunk's raw content by id.
    Get {
        /// Context chunk id.
        id: String,
    },
    /// Project-scoped vector retrieval.
    Retrieve {
        /// The search query.
        query: String,
        /// Project to search within.
        #[arg(long)]
        project: String,
        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,
        /// Minimum similarity score in [0.0, 1.0].
        #[arg(long)]
        threshold: Option<f64>,
    },
}

/// Graph subcommands.
#[derive(Subcommand)]
enum GraphsAction {
    /// Fetch the backend's analytics charts.
    Overview {
        /// Restrict to one project.
        #[arg(long)]
        project: Option<String>,
        /// Dump raw figures as JSON for external plotting.
        #[arg(long)]
        json: bool,
    },
    /// Build a tag co-occurrence graph from stored chunks.
    Tags {
        /// Optional query to scope the chunks.
        #[arg(long)]
        query: Option<String>,
        /// Restrict to one project.
        #[arg(long)]
        project: Option<String>,
        /// Maximum number of chunks to pull.
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    // Ctrl-C aborts every in-flight request through the shared token.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let credentials = Arc::new(CredentialStore::open(cfg.credentials.resolved_path()?));
    let client = Arc::new(ApiClient::new(&cfg, credentials, cancel)?);
    let session = Arc::new(Session::new(client.clone()));

    // Hydrate in the background; commands gate on the settled state.
    {
        let session = session.clone();
        tokio::spawn(async move {
            session.hydrate().await;
        });
    }

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            let registration = session.register(&name, &email, &password).await?;
            println!("Account created for {}.", email);
            println!();
            println!("Your API key (shown exactly once, store it now):");
            println!();
            println!("  {}", registration.api_key);
            println!();
            match registration.user {
                Some(user) => println!("Logged in as {}.", user.email),
                None => println!(
                    "Automatic login failed. Run `ctxr login {}` to start a session.",
                    email
                ),
            }
        }
        Commands::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            if user.name.is_empty() {
                println!("Logged in as {} (profile fetch failed; partial session).", user.email);
            } else {
                println!("Logged in as {} <{}>.", user.name, user.email);
            }
        }
        Commands::Logout => {
            session.logout().await;
            println!("Logged out.");
        }
        Commands::Whoami => {
            account::run_whoami(&session).await?;
        }
        Commands::Key { action } => match action {
            KeyAction::Rotate => {
                account::run_rotate_key(&session).await?;
            }
        },
        Commands::Project { action } => match action {
            ProjectAction::List => projects::run_list(&session).await?,
            ProjectAction::Create { name, description } => {
                projects::run_create(&session, &name, &description).await?
            }
            ProjectAction::Get { id } => projects::run_get(&session, &id).await?,
            ProjectAction::Update {
                id,
                name,
                description,
            } => projects::run_update(&session, &id, name, description).await?,
            ProjectAction::Delete { id } => projects::run_delete(&session, &id).await?,
            ProjectAction::Contributor { action } => match action {
                ContributorAction::Add { project_id, email } => {
                    projects::run_add_contributor(&session, &project_id, &email).await?
                }
                ContributorAction::Remove {
                    project_id,
                    user_id,
                } => projects::run_remove_contributor(&session, &project_id, &user_id).await?,
            },
        },
        Commands::Context { action } => match action {
            ContextAction::Save {
                content,
                project,
                tags,
                source,
            } => context::run_save(&session, &content, project, tags, &source).await?,
            ContextAction::Search {
                query,
                project,
                limit,
                threshold,
            } => context::run_search(&session, &cfg, &query, project, limit, threshold).await?,
            ContextAction::Get { id } => context::run_get(&session, &id).await?,
            ContextAction::Retrieve {
                query,
                project,
                limit,
                threshold,
            } => context::run_retrieve(&session, &cfg, &query, &project, limit, threshold).await?,
        },
        Commands::Graphs { action } => match action {
            GraphsAction::Overview { project, json } => {
                graphs::run_overview(&session, project, json).await?
            }
            GraphsAction::Tags {
                query,
                project,
                limit,
            } => graphs::run_tags(&session, &cfg, query, project, limit).await?,
        },
        Commands::Health => {
            let health = session.client().health().await?;
            match health.service {
                Some(service) => println!("{} ({})", health.status, service),
                None => println!("{}", health.status),
            }
        }
    }

    Ok(())
}
