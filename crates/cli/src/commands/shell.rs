//! Interactive cart session over stdin.
//!
//! One command per line:
//!
//! ```text
//! show
//! add <id> <price> <image> <title...>
//! update <id> <quantity>
//! increment <id> | decrement <id> | remove <id>
//! clear
//! checkout
//! last-order
//! quit
//! ```
//!
//! A refused operation is printed and the session continues.

#![allow(clippy::print_stdout)]

use paperback_cart::{ActionResult, CartAction, CartStore};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{Rejected, cart};
use crate::Format;
use crate::output;

const HELP: &str = "\
commands:
  show
  add <id> <price> <image> <title...>
  update <id> <quantity>
  increment <id> | decrement <id> | remove <id>
  clear
  checkout
  last-order
  help
  quit";

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// A parsed shell line.
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Blank,
    Help,
    Quit,
    Show,
    LastOrder,
    Add {
        id: &'a str,
        price: f64,
        image: &'a str,
        title: String,
    },
    Update {
        id: &'a str,
        quantity: i64,
    },
    Action(CartAction),
}

fn parse_line(line: &str) -> Result<Line<'_>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Line::Blank);
    };
    match command {
        "help" | "?" => Ok(Line::Help),
        "quit" | "exit" => Ok(Line::Quit),
        "show" => Ok(Line::Show),
        "last-order" => Ok(Line::LastOrder),
        "add" => {
            let (Some(id), Some(price), Some(image)) = (words.next(), words.next(), words.next())
            else {
                return Err("usage: add <id> <price> <image> <title...>".to_string());
            };
            let price = price
                .trim_start_matches('$')
                .parse()
                .map_err(|_| format!("not a price: {price}"))?;
            let title = words.collect::<Vec<_>>().join(" ");
            Ok(Line::Add {
                id,
                price,
                image,
                title,
            })
        }
        "update" => {
            let (Some(id), Some(quantity)) = (words.next(), words.next()) else {
                return Err("usage: update <id> <quantity>".to_string());
            };
            let quantity = quantity
                .parse()
                .map_err(|_| format!("not a quantity: {quantity}"))?;
            Ok(Line::Update { id, quantity })
        }
        name => CartAction::parse(name, words.next())
            .map(Line::Action)
            .map_err(|e| e.to_string()),
    }
}

/// Run the session until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin can't be read.
pub async fn run(store: &CartStore, format: Format) -> CommandResult {
    let mut events = store.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!("Cart shell started");
    if format == Format::Text {
        println!("Type `help` for commands.");
    }

    while let Some(line) = lines.next_line().await? {
        let result = match parse_line(&line) {
            Ok(Line::Quit) => break,
            Ok(Line::Blank) => Ok(()),
            Ok(Line::Help) => {
                println!("{HELP}");
                Ok(())
            }
            Ok(parsed) => execute(store, format, parsed).await,
            Err(usage) => {
                println!("{usage}");
                Ok(())
            }
        };

        if let Err(e) = result
            && e.downcast_ref::<Rejected>().is_none()
        {
            tracing::warn!("{e}");
        }

        while let Ok(event) = events.try_recv() {
            tracing::debug!(?event, "Cart event");
        }
    }

    tracing::info!("Cart shell finished");
    Ok(())
}

async fn execute(store: &CartStore, format: Format, line: Line<'_>) -> CommandResult {
    match line {
        Line::Show => cart::show(store, format),
        Line::LastOrder => cart::last_order(store, format),
        Line::Add {
            id,
            price,
            image,
            title,
        } => cart::add(store, format, id, title, price, image.to_string(), None),
        Line::Update { id, quantity } => cart::update(store, format, id, quantity),
        Line::Action(action) => match store.apply(action).await {
            Ok(ActionResult::Cart(summary)) => cart::print_summary(store, format, &summary),
            Ok(ActionResult::Order(receipt)) => output::print_order(format, &receipt),
            Err(e) => cart::reject(format, &e),
        },
        Line::Blank | Line::Help | Line::Quit => Ok(()),
    }
}
