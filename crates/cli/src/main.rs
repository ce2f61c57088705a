//! Paperback CLI - Drive the bookstore cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add a book to the cart
//! pb-cli add --id b1 --title "Dune" --price 9.99 --image /img/dune.jpg
//!
//! # Change a quantity (0 removes the line)
//! pb-cli update b1 3
//!
//! # Show the cart as HTML
//! pb-cli --format html show
//!
//! # Place the order
//! pb-cli checkout
//!
//! # Interactive session
//! pb-cli shell
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart
//! - `add` / `remove` / `update` / `clear` - Change the cart
//! - `checkout` - Place an order for the cart
//! - `last-order` - Print the most recent order
//! - `shell` - Read actions from stdin against one session
//!
//! One-shot commands only see each other's changes with
//! `CART_STORAGE=durable`; with session storage the cart lives as long as
//! the process, which is what `shell` is for.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use paperback_cart::{CartStore, Persistence, SimulatedGateway, StorageScope};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "pb-cli")]
#[command(version, about = "Paperback bookstore cart")]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Html,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show,
    /// Add a book to the cart
    Add {
        /// Product id (numeric or slug)
        #[arg(long)]
        id: String,

        /// Book title
        #[arg(long)]
        title: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Cover image URL
        #[arg(long)]
        image: String,

        /// Units to add
        #[arg(short, long, allow_negative_numbers = true)]
        quantity: Option<i64>,
    },
    /// Remove a book from the cart
    Remove {
        /// Product id
        id: String,
    },
    /// Set the quantity of a book (0 removes it)
    Update {
        /// Product id
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Place an order for the cart
    Checkout,
    /// Print the most recent order
    LastOrder,
    /// Read cart actions from stdin
    Shell,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CliConfig) -> Option<sentry::ClientInitGuard> {
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
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(json_logs: bool) {
    // Logs go to stderr so command output on stdout stays parseable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "paperback_cart=info,paperback_cli=info".into());

    let json_layer = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = CliConfig::from_env();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing(config.as_ref().is_ok_and(|c| c.json_logs));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, config).await {
        if is_refusal(e.as_ref()) {
            tracing::debug!("Command rejected: {e}");
        } else {
            tracing::error!("Command failed: {e}");
        }
        std::process::exit(1);
    }
}

/// Whether a failed command was the cart refusing an operation.
///
/// The refusal has already been printed, so it is logged below the level
/// that reaches Sentry.
fn is_refusal(error: &(dyn std::error::Error + 'static)) -> bool {
    error.downcast_ref::<commands::Rejected>().is_some()
}

async fn run(cli: Cli, config: CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cart = &config.cart;
    if cart.storage == StorageScope::Session && !matches!(cli.command, Commands::Shell) {
        tracing::warn!(
            "CART_STORAGE=session: changes last only for this command; use `shell` or CART_STORAGE=durable"
        );
    }

    let store = CartStore::load(
        Persistence::new(cart.open_storage()),
        SimulatedGateway::new(cart.checkout_delay),
        cart.policy.clone(),
    );
    let format = cli.format;

    match cli.command {
        Commands::Show => commands::cart::show(&store, format)?,
        Commands::Add {
            id,
            title,
            price,
            image,
            quantity,
        } => commands::cart::add(&store, format, &id, title, price, image, quantity)?,
        Commands::Remove { id } => commands::cart::remove(&store, format, &id)?,
        Commands::Update { id, quantity } => {
            commands::cart::update(&store, format, &id, quantity)?;
        }
        Commands::Clear => commands::cart::clear(&store, format)?,
        Commands::Checkout => commands::cart::checkout(&store, format).await?,
        Commands::LastOrder => commands::cart::last_order(&store, format)?,
        Commands::Shell => commands::shell::run(&store, format).await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use paperback_cart::ErrorKind;

    use super::*;

    #[test]
    fn test_refusals_are_not_failures() {
        let rejected: Box<dyn std::error::Error> = Box::new(commands::Rejected {
            kind: ErrorKind::EmptyCart,
            message: "Cart is empty".to_string(),
        });
        assert!(is_refusal(rejected.as_ref()));

        let broken: Box<dyn std::error::Error> = "template failed".into();
        assert!(!is_refusal(broken.as_ref()));
    }
}
