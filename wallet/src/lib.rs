//! Key management and transaction signing.
//!
//! Balances are keyed by raw Ed25519 public key bytes; a node's coinbase
//! pays the key its context carries. Signing covers the transaction's
//! signature hash, which commits to the outputs alone.

use ed25519_dalek::Signer;
pub use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature};
use ferrocoin_core::transaction::Transaction;
use rand::rngs::OsRng;

/// Generates a fresh keypair from OS randomness.
pub fn generate_keypair() -> Keypair {
    let mut csprng = OsRng {};
    Keypair::generate(&mut csprng)
}

/// Deterministic keypair from a 32-byte seed, for tests and reproducible
/// simulations. Do not hold real funds with one.
pub fn keypair_from_seed(seed: &[u8; 32]) -> Keypair {
    let secret = SecretKey::from_bytes(seed).expect("seed is 32 bytes");
    let public = PublicKey::from(&secret);
    Keypair { secret, public }
}

/// Parses a 64-character hex seed into a keypair. Returns `None` when the
/// string is not exactly 32 bytes of hex.
pub fn keypair_from_hex_seed(seed: &str) -> Option<Keypair> {
    let bytes = hex::decode(seed).ok()?;
    let seed: [u8; 32] = bytes.try_into().ok()?;
    Some(keypair_from_seed(&seed))
}

/// The raw public key bytes balances are keyed by.
pub fn public_key_bytes(keypair: &Keypair) -> Vec<u8> {
    keypair.public.as_bytes().to_vec()
}

/// Signs every input of `transaction` with `keypair`.
pub fn sign_inputs(keypair: &Keypair, transaction: &mut Transaction) {
    let signature = keypair.sign(transaction.hash_for_signature().as_bytes());
    for input in &mut transaction.inputs {
        input.signature = signature.to_bytes().to_vec();
    }
}

/// Hex rendering of a public key for display.
pub fn display_key(public_key: &[u8]) -> String {
    hex::encode(public_key)
}
