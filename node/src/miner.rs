//! The mining coordinator's worker side.
//!
//! Proof-of-work is CPU-bound, so the search runs on its own OS thread.
//! The worker owns a copy of the candidate header, a stop flag and the
//! sending half of a one-shot result channel — nothing else — so cancelling
//! it at any moment is safe. The flag is re-checked between bounded nonce
//! batches, which caps cancellation latency.

use crossbeam_channel::{bounded, Receiver, Sender};
use ferrocoin_core::block::{OpenBlock, OpenBlockHeader, SealedBlockHeader};
use ferrocoin_core::pow::find_block;
use ferrocoin_core::Address;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Nonces scanned per batch before the stop flag is re-checked.
const NONCE_BATCH: u64 = 1 << 16;

/// Supervises one proof-of-work worker.
pub struct MinerHandle {
    candidate: OpenBlock,
    stop: Arc<AtomicBool>,
    results: Receiver<SealedBlockHeader>,
}

impl MinerHandle {
    /// Spawns a worker mining `candidate` at `difficulty`.
    pub fn spawn(node_id: Address, candidate: OpenBlock, difficulty: usize) -> MinerHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let (sender, results) = bounded(1);
        let header = candidate.header.clone();
        let flag = Arc::clone(&stop);
        thread::spawn(move || run_mining(node_id, header, difficulty, flag, sender));
        MinerHandle {
            candidate,
            stop,
            results,
        }
    }

    /// The open block this worker is searching on.
    pub fn candidate(&self) -> &OpenBlock {
        &self.candidate
    }

    /// Non-blocking poll for a sealed header.
    pub fn try_result(&self) -> Option<SealedBlockHeader> {
        self.results.try_recv().ok()
    }

    /// Stops the worker and surrenders the candidate so a sealed header can
    /// be rejoined with its transaction tree.
    pub fn finish(self) -> OpenBlock {
        self.stop.store(true, Ordering::Relaxed);
        self.candidate
    }

    /// Cancels the worker. Any result it races in is dropped along with the
    /// channel.
    pub fn terminate(self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn run_mining(
    node_id: Address,
    header: OpenBlockHeader,
    difficulty: usize,
    stop: Arc<AtomicBool>,
    results: Sender<SealedBlockHeader>,
) {
    let span = tracing::info_span!("miner", node = %node_id);
    let _enter = span.enter();
    debug!(difficulty, "mining worker starting");
    let mut starting_nonce = 0u64;
    while !stop.load(Ordering::Relaxed) {
        match find_block(&header, difficulty, starting_nonce, NONCE_BATCH) {
            Some(sealed) => {
                // The node may have terminated first; a dropped receiver is
                // not the worker's problem.
                let _ = results.send(sealed);
                return;
            }
            None => starting_nonce = starting_nonce.saturating_add(NONCE_BATCH),
        }
    }
    debug!("mining worker cancelled");
}
