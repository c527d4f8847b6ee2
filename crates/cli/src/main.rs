//! Farmerspot CLI - drive a storefront session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Check credentials
//! fs-cli -e ada@example.com login
//!
//! # Cart
//! fs-cli cart show
//! fs-cli cart add 65a1f0 --quantity 2
//! fs-cli cart set 65a1f0 5
//! fs-cli cart remove 65a1f0
//!
//! # Catalog (no login needed)
//! fs-cli items list
//! fs-cli items show 65a1f0
//! fs-cli items search yam
//!
//! # Orders
//! fs-cli orders list --status pending
//! fs-cli orders stats
//! ```
//!
//! # Environment Variables
//!
//! - `API_URL` - Remote storefront API origin (required)
//! - `FARMERSPOT_EMAIL` / `FARMERSPOT_PASSWORD` - Credentials for commands
//!   that need a session
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Optional error tracking
//! - `RUST_LOG` - Log filter (default: `farmerspot_storefront=info,farmerspot_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farmerspot_storefront::config::StorefrontConfig;
use farmerspot_storefront::notice::Notice;

mod commands;

use commands::{CommandError, Credentials};

#[derive(Parser)]
#[command(name = "fs-cli")]
#[command(author, version, about = "Farmerspot storefront CLI")]
struct Cli {
    /// Account email
    #[arg(short, long, env = "FARMERSPOT_EMAIL", global = true)]
    email: Option<String>,

    /// Account password
    #[arg(long, env = "FARMERSPOT_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the session identity
    Login,
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the catalog
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
    /// Order dashboards
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print cart lines and the total count
    Show,
    /// Add units of an item
    Add {
        /// Item ID
        item_id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set an item's count (0 removes it)
    Set {
        /// Item ID
        item_id: String,

        /// New count
        count: u32,
    },
    /// Remove an item
    Remove {
        /// Item ID
        item_id: String,
    },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// List every item
    List,
    /// Show one item
    Show {
        /// Item ID
        item_id: String,
    },
    /// Search items
    Search {
        /// Search text
        query: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List your orders (customer) or received orders (farmer)
    List {
        /// Only orders with this status
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Order counts by status
    Stats,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "farmerspot_storefront=info,farmerspot_cli=info".into());

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        match &e {
            CommandError::Storefront(err) => {
                let notice = Notice::from_error(err);
                tracing::error!(redirect_to = ?notice.redirect_to, "{}", notice.message);
            }
            _ => tracing::error!("Command failed: {e}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CommandError> {
    let credentials = Credentials {
        email: cli.email,
        password: cli.password.map(SecretString::from),
    };
    let storefront = commands::connect(config)?;

    match cli.command {
        Commands::Login => commands::session::login(&storefront, &credentials).await?,
        Commands::Cart { action } => {
            commands::session::login(&storefront, &credentials).await?;
            match action {
                CartAction::Show => commands::cart::show(&storefront).await?,
                CartAction::Add { item_id, quantity } => {
                    commands::cart::add(&storefront, &item_id, quantity).await?;
                }
                CartAction::Set { item_id, count } => {
                    commands::cart::set(&storefront, &item_id, count).await?;
                }
                CartAction::Remove { item_id } => {
                    commands::cart::remove(&storefront, &item_id).await?;
                }
            }
        }
        Commands::Items { action } => match action {
            ItemsAction::List => commands::catalog::list(&storefront).await?,
            ItemsAction::Show { item_id } => commands::catalog::show(&storefront, &item_id).await?,
            ItemsAction::Search { query } => commands::catalog::search(&storefront, &query).await?,
        },
        Commands::Orders { action } => {
            commands::session::login(&storefront, &credentials).await?;
            match action {
                OrdersAction::List { status } => {
                    commands::orders::list(&storefront, status.as_deref()).await?;
                }
                OrdersAction::Stats => commands::orders::stats(&storefront).await?,
            }
        }
    }
    Ok(())
}
