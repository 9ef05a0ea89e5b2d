//! Emporium CLI - migrations and back-office maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! emporium-cli migrate
//!
//! # Rebuild the order mirror of one user, or of every user
//! emporium-cli mirror rebuild --user 42
//! emporium-cli mirror rebuild
//!
//! # Push the whole catalog to the search index
//! emporium-cli search reindex
//!
//! # Print dashboard metrics as JSON
//! emporium-cli dashboard
//!
//! # Store an order whose delivery took the stock but failed to save it
//! emporium-cli order complete-delivery 1234
//!
//! # Create an account that can use the admin console
//! emporium-cli user create -e admin@example.com -n "Admin Name" --admin
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use emporium_core::{OrderId, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "emporium-cli")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Repair the per-user order mirrors
    Mirror {
        #[command(subcommand)]
        action: MirrorAction,
    },
    /// Manage the product search index
    Search {
        #[command(subcommand)]
        action: SearchAction,
    },
    /// Print dashboard metrics
    Dashboard,
    /// Repair orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum MirrorAction {
    /// Regenerate mirrors from the order collection
    Rebuild {
        /// Only this user (default: every user)
        #[arg(short, long)]
        user: Option<UserId>,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Finish an interrupted delivery without touching stock again
    CompleteDelivery {
        /// Order named in the partial-failure log
        id: OrderId,
    },
}

#[derive(Subcommand)]
enum SearchAction {
    /// Upsert every product into the search index
    Reindex,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Allow the account into the admin console
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Mirror { action } => match action {
            MirrorAction::Rebuild { user } => commands::mirror::rebuild(user).await?,
        },
        Commands::Search { action } => match action {
            SearchAction::Reindex => commands::search::reindex().await?,
        },
        Commands::Dashboard => commands::dashboard::show().await?,
        Commands::Order { action } => match action {
            OrderAction::CompleteDelivery { id } => commands::order::complete_delivery(id).await?,
        },
        Commands::User { action } => match action {
            UserAction::Create { email, name, admin } => {
                commands::user::create(&email, &name, admin).await?;
            }
        },
    }
    Ok(())
}
