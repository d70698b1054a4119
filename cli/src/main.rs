use clap::{Parser, Subcommand};
use ferrocoin_core::chain::State;
use ferrocoin_core::config::ConfigBuilder;
use ferrocoin_core::Address;
use ferrocoin_node::sim::{simulate, simulate_with_keys};
use ferrocoin_wallet::display_key;
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ferrocoin")]
#[command(about = "Ferrocoin peer-to-peer proof-of-work node", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single already-synced node that mines to the target height
    Node {
        #[arg(long, default_value = "a")]
        node_id: String,
        #[arg(long, default_value_t = 3)]
        target_height: u64,
        #[arg(long, default_value_t = 1)]
        difficulty: usize,
        /// 32-byte hex seed for the node key; generated when absent
        #[arg(long)]
        key_seed: Option<String>,
    },
    /// Run an in-process simulation of several peering nodes
    Simulate {
        #[arg(long, default_value_t = 2)]
        nodes: usize,
        #[arg(long, default_value_t = 4)]
        target_height: u64,
        #[arg(long, default_value_t = 2)]
        difficulty: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Node {
            node_id,
            target_height,
            difficulty,
            key_seed,
        } => {
            let config = ConfigBuilder::new()
                .difficulty(difficulty)
                .target_height(target_height)
                .finish();
            let keypair = match key_seed {
                Some(seed) => match ferrocoin_wallet::keypair_from_hex_seed(&seed) {
                    Some(keypair) => keypair,
                    None => {
                        eprintln!("--key-seed must be 32 bytes of hex");
                        std::process::exit(2);
                    }
                },
                None => ferrocoin_wallet::generate_keypair(),
            };
            let finals = simulate_with_keys(vec![(Address::new(node_id), keypair)], &config);
            report(&finals);
        }
        Commands::Simulate {
            nodes,
            target_height,
            difficulty,
        } => {
            let node_ids: Vec<Address> = (0..nodes)
                .map(|i| Address::new(format!("n{i}")))
                .collect();
            let config = ConfigBuilder::new()
                .difficulty(difficulty)
                .target_height(target_height)
                .finish();
            let finals = simulate(&node_ids, &config);
            report(&finals);
        }
    }
}

fn report(finals: &HashMap<Address, State>) {
    let mut node_ids: Vec<&Address> = finals.keys().collect();
    node_ids.sort();
    for node_id in node_ids {
        let state = &finals[node_id];
        println!(
            "{node_id}: height {} head {}",
            state.best_head.height, state.best_head.block.header.block_hash
        );
        let mut balances: Vec<_> = state.best_head.ledger.balances.iter().collect();
        balances.sort();
        for (public_key, balance) in balances {
            println!("  {} {balance}", display_key(public_key));
        }
    }
}
