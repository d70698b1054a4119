//! Balance ledger and transaction validation.
//!
//! The ledger pairs a balance map with the index of every transaction whose
//! outputs may still be referenced. Operations never mutate in place:
//! `update_ledger` clones and returns a new snapshot, so each chain node
//! keeps the ledger exactly as it stood after its block.

use crate::block::SealedBlock;
use crate::error::{Error, Result};
use crate::transaction::Transaction;
use crate::Hash;
use ed25519_dalek::{PublicKey, Signature};
use std::collections::HashMap;

/// Units minted by each block's coinbase.
pub const BLOCK_REWARD: u64 = 25;

/// Balances keyed by raw public key, plus the spent-transaction index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub balances: HashMap<Vec<u8>, u64>,
    pub previous_transactions: HashMap<Hash, Transaction>,
}

/// Applies `transaction` to `starting_ledger`, returning the new snapshot.
///
/// A coinbase may transfer up to [`BLOCK_REWARD`] and skips every input
/// check. Any other transaction must reference known previous transactions,
/// carry a valid signature over its signature hash for every input, and
/// transfer no more than the drained keys' balances make available.
///
/// Each input contributes the referenced recipient's *entire current
/// balance* to the available total, but draining stops once the transfer is
/// covered; a drained key is not re-credited with change unless the
/// transaction pays it an explicit change output. This mirrors the network
/// rule exactly, surprising as it is.
pub fn update_ledger(starting_ledger: &Ledger, transaction: &Transaction) -> Result<Ledger> {
    let mut total_available: u64 = 0;
    let mut keys_to_drain: Vec<Vec<u8>> = Vec::new();

    if transaction.is_coinbase() {
        total_available = BLOCK_REWARD;
    } else {
        let signature_hash = transaction.hash_for_signature();
        for input in &transaction.inputs {
            let outpoint = &input.previous_transaction_outpoint;
            let previous = starting_ledger
                .previous_transactions
                .get(&outpoint.previous_transaction_hash)
                .ok_or(Error::UnknownPreviousHash)?;
            let output = previous
                .outputs
                .get(outpoint.index as usize)
                .ok_or(Error::MissingOutput)?;
            let pubkey = &output.recipient_public_key;
            total_available = total_available
                .saturating_add(starting_ledger.balances.get(pubkey).copied().unwrap_or(0));
            if !keys_to_drain.contains(pubkey) {
                keys_to_drain.push(pubkey.clone());
            }
            let key = PublicKey::from_bytes(pubkey).map_err(|_| Error::BadSignature)?;
            let signature =
                Signature::from_bytes(&input.signature).map_err(|_| Error::BadSignature)?;
            key.verify_strict(signature_hash.as_bytes(), &signature)
                .map_err(|_| Error::BadSignature)?;
        }
    }

    let total_transferred = transaction
        .outputs
        .iter()
        .fold(0u64, |sum, output| sum.saturating_add(output.value));

    if total_available < total_transferred {
        return Err(Error::Overspend);
    }

    let mut new_ledger = starting_ledger.clone();

    let mut transfer_needed = total_transferred;
    for key in &keys_to_drain {
        if transfer_needed == 0 {
            break;
        }
        let balance = new_ledger.balances.entry(key.clone()).or_insert(0);
        let drain = transfer_needed.min(*balance);
        *balance -= drain;
        transfer_needed -= drain;
    }
    if !transaction.is_coinbase() {
        debug_assert_eq!(transfer_needed, 0, "drained less than the transfer");
    }

    for output in &transaction.outputs {
        *new_ledger
            .balances
            .entry(output.recipient_public_key.clone())
            .or_insert(0) += output.value;
    }

    new_ledger
        .previous_transactions
        .insert(transaction.hash(), transaction.clone());

    Ok(new_ledger)
}

/// Validates a block's transactions against `start_ledger` in DFS leaf
/// order: the first leaf must be the coinbase and no later leaf may be one.
/// Returns the ledger after the whole block, or the first failure.
pub fn validate_transactions(start_ledger: &Ledger, block: &SealedBlock) -> Result<Ledger> {
    let mut ledger = start_ledger.clone();
    for (i, transaction) in block.transaction_tree.transactions().enumerate() {
        if transaction.is_coinbase() != (i == 0) {
            return Err(Error::CoinbasePlacement);
        }
        ledger = update_ledger(&ledger, transaction)?;
    }
    Ok(ledger)
}
