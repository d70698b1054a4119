use ferrocoin_core::chain::State;
use ferrocoin_core::config::ConfigBuilder;
use ferrocoin_core::genesis;
use ferrocoin_core::ledger::BLOCK_REWARD;
use ferrocoin_core::pow::hash_meets_difficulty;
use ferrocoin_core::Address;
use ferrocoin_node::sim::simulate;

fn total_balance(state: &State) -> u64 {
    state.best_head.ledger.balances.values().sum()
}

/// Walks parents from the best head, checking hashes and linkage, and
/// returns the number of nodes down to genesis.
fn chain_length(state: &State) -> u64 {
    let mut length = 0;
    let mut node = Some(state.best_head.clone());
    while let Some(current) = node {
        assert!(current.block.validate_hashes());
        if let Some(parent) = &current.parent {
            assert_eq!(
                current.block.header.previous_block_hash,
                parent.block.header.block_hash
            );
        } else {
            assert_eq!(
                current.block.header.block_hash,
                genesis::genesis_block().header.block_hash
            );
        }
        length += 1;
        node = current.parent.clone();
    }
    length
}

#[test]
fn a_node_already_at_its_target_does_not_mine() {
    let config = ConfigBuilder::new().difficulty(1).target_height(1).finish();
    let finals = simulate(&[Address::new("a")], &config);

    let state = &finals[&Address::new("a")];
    assert_eq!(state.best_head.height, 1);
    assert_eq!(
        state.best_head.block.header.block_hash,
        genesis::genesis_block().header.block_hash
    );
    assert!(state.best_head.ledger.balances.is_empty());
}

#[test]
fn a_single_node_mines_to_its_target_height() {
    let config = ConfigBuilder::new().difficulty(1).target_height(3).finish();
    let finals = simulate(&[Address::new("a")], &config);

    let state = &finals[&Address::new("a")];
    assert_eq!(state.best_head.height, 3);
    assert_eq!(chain_length(state), 3);

    // Two mined blocks, each rewarding this node's key.
    assert_eq!(total_balance(state), 2 * BLOCK_REWARD);
    assert_eq!(state.best_head.ledger.balances.len(), 1);

    // Every mined block meets the difficulty target; genesis is exempt.
    let mut node = Some(state.best_head.clone());
    while let Some(current) = node {
        if current.parent.is_some() {
            assert!(hash_meets_difficulty(&current.block.header.block_hash, 1));
        }
        node = current.parent.clone();
    }
}

#[test]
fn two_nodes_converge_on_one_chain() {
    let config = ConfigBuilder::new().difficulty(2).target_height(4).finish();
    let ids = [Address::new("a"), Address::new("b")];
    let finals = simulate(&ids, &config);
    assert_eq!(finals.len(), 2);

    let a = &finals[&ids[0]];
    let b = &finals[&ids[1]];
    assert_eq!(a.best_head.height, 4);
    assert_eq!(b.best_head.height, 4);
    assert_eq!(
        a.best_head.block.header.block_hash,
        b.best_head.block.header.block_hash
    );
    assert_eq!(chain_length(a), 4);

    // Three mined blocks worth of rewards, split between the miners.
    assert_eq!(total_balance(a), (4 - 1) * BLOCK_REWARD);
    assert_eq!(total_balance(b), (4 - 1) * BLOCK_REWARD);
}
