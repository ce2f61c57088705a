//! CLI command implementations.

pub mod cart;
pub mod shell;

use paperback_cart::ErrorKind;

/// A cart operation the store refused.
///
/// The outcome has already been printed; this only carries the exit status.
#[derive(Debug, thiserror::Error)]
#[error("{message} ({kind:?})")]
pub struct Rejected {
    pub kind: ErrorKind,
    pub message: String,
}
