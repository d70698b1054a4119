//! Error types for the ferrocoin core crate.
//!
//! Validation failures are values, never panics: a peer can trigger any of
//! these and the node must shrug them off. High-level operations return
//! [`crate::Result`], an alias for `core::result::Result<T, Error>`.

use thiserror::Error;

/// Core crate error type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// Input references a transaction hash absent from the ledger index.
    #[error("unknown previous transaction hash")]
    UnknownPreviousHash,

    /// Input references an output index the previous transaction lacks.
    #[error("referenced output does not exist")]
    MissingOutput,

    /// Signature could not be verified against the recipient public key.
    #[error("signature verification failed")]
    BadSignature,

    /// Sum of outputs exceeds the value available to the transaction.
    #[error("tried to transfer more than the available balance")]
    Overspend,

    /// A coinbase appeared outside the first leaf, or the first leaf was
    /// not a coinbase.
    #[error("coinbase in wrong position")]
    CoinbasePlacement,
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
