//! Merkle tree over an ordered transaction sequence, plus the binomial
//! forest giving O(log n) incremental append with the same canonical root.

use crate::transaction::Transaction;
use crate::{sha256_parts, Hash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// One node of a transaction tree.
///
/// `Null` is the empty tree (its hash is the empty sentinel), `Leaf` wraps
/// one transaction, `Child` joins two subtrees. Nodes are immutable and
/// their hashes are computed once at construction; subtrees are shared
/// behind `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleNode {
    Null,
    Leaf {
        payload: Transaction,
        height: u32,
        hash: Hash,
    },
    Child {
        left: Arc<MerkleNode>,
        right: Arc<MerkleNode>,
        height: u32,
        hash: Hash,
    },
}

impl MerkleNode {
    /// A leaf over `payload`, raised to `height` for forest bookkeeping.
    pub fn leaf(payload: Transaction, height: u32) -> Arc<MerkleNode> {
        let hash = payload.hash();
        Arc::new(MerkleNode::Leaf { payload, height, hash })
    }

    /// Joins two subtrees; the hash covers left then right.
    pub fn child(left: Arc<MerkleNode>, right: Arc<MerkleNode>) -> Arc<MerkleNode> {
        let hash = sha256_parts(&[left.hash().as_bytes(), right.hash().as_bytes()]);
        let height = 1 + left.height().max(right.height());
        Arc::new(MerkleNode::Child { left, right, height, hash })
    }

    pub fn hash(&self) -> Hash {
        match self {
            MerkleNode::Null => Hash::empty(),
            MerkleNode::Leaf { hash, .. } | MerkleNode::Child { hash, .. } => hash.clone(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            MerkleNode::Null => 0,
            MerkleNode::Leaf { height, .. } | MerkleNode::Child { height, .. } => *height,
        }
    }

    /// Pre-order traversal: node, left subtree, right subtree. Leaves come
    /// out left to right, which is the transaction order the ledger
    /// validates in.
    pub fn dfs(&self) -> Dfs<'_> {
        Dfs { stack: vec![self] }
    }

    /// The transactions at the leaves, in DFS order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.dfs().filter_map(|node| match node {
            MerkleNode::Leaf { payload, .. } => Some(payload),
            _ => None,
        })
    }
}

/// Pre-order iterator over a tree's nodes.
pub struct Dfs<'a> {
    stack: Vec<&'a MerkleNode>,
}

impl<'a> Iterator for Dfs<'a> {
    type Item = &'a MerkleNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let MerkleNode::Child { left, right, .. } = node {
            self.stack.push(right);
            self.stack.push(left);
        }
        Some(node)
    }
}

/// An ordered sequence of trees of strictly decreasing height.
///
/// `add` appends a height-0 leaf and folds trailing equal-height trees into
/// one, so repeated appends cost O(log n) while `merge` still produces the
/// same root as building a tree over the whole sequence at once.
#[derive(Debug, Clone, Default)]
pub struct MerkleForest {
    trees: Vec<Arc<MerkleNode>>,
}

impl MerkleForest {
    pub fn new() -> Self {
        MerkleForest { trees: Vec::new() }
    }

    /// A forest seeded with a single tree.
    pub fn from_tree(tree: Arc<MerkleNode>) -> Self {
        MerkleForest { trees: vec![tree] }
    }

    /// Appends a leaf, folding while the last two trees share a height.
    /// The older tree always ends up on the left.
    pub fn add(&self, payload: Transaction) -> MerkleForest {
        let mut trees = self.trees.clone();
        let mut rhs = MerkleNode::leaf(payload, 0);
        while let Some(lhs) = trees.pop() {
            if lhs.height() == rhs.height() {
                rhs = MerkleNode::child(lhs, rhs);
            } else {
                trees.push(lhs);
                break;
            }
        }
        trees.push(rhs);
        MerkleForest { trees }
    }

    /// Collapses the forest into its canonical root, `Null` when empty.
    /// The accumulator starts at the last tree and each earlier tree wraps
    /// it on the left, keeping older transactions leftmost.
    pub fn merge(&self) -> MerkleNode {
        let mut iter = self.trees.iter().rev();
        let mut acc = match iter.next() {
            Some(tree) => Arc::clone(tree),
            None => return MerkleNode::Null,
        };
        for tree in iter {
            acc = MerkleNode::child(Arc::clone(tree), acc);
        }
        (*acc).clone()
    }
}

/// Builds the canonical tree over `transactions` in one pass.
pub fn build_merkle_tree<I>(transactions: I) -> MerkleNode
where
    I: IntoIterator<Item = Transaction>,
{
    let mut forest = MerkleForest::new();
    for transaction in transactions {
        forest = forest.add(transaction);
    }
    forest.merge()
}

/// Structural wire form: payloads and leaf heights travel, hashes are
/// recomputed on arrival rather than trusted from the peer.
#[derive(Serialize, Deserialize)]
enum WireNode {
    Null,
    Leaf { payload: Transaction, height: u32 },
    Child { left: Box<WireNode>, right: Box<WireNode> },
}

impl From<&MerkleNode> for WireNode {
    fn from(node: &MerkleNode) -> WireNode {
        match node {
            MerkleNode::Null => WireNode::Null,
            MerkleNode::Leaf { payload, height, .. } => WireNode::Leaf {
                payload: payload.clone(),
                height: *height,
            },
            MerkleNode::Child { left, right, .. } => WireNode::Child {
                left: Box::new(WireNode::from(left.as_ref())),
                right: Box::new(WireNode::from(right.as_ref())),
            },
        }
    }
}

impl WireNode {
    fn build(self) -> Arc<MerkleNode> {
        match self {
            WireNode::Null => Arc::new(MerkleNode::Null),
            WireNode::Leaf { payload, height } => MerkleNode::leaf(payload, height),
            WireNode::Child { left, right } => MerkleNode::child(left.build(), right.build()),
        }
    }
}

impl Serialize for MerkleNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireNode::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MerkleNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = WireNode::deserialize(deserializer)?.build();
        Ok(Arc::try_unwrap(node).unwrap_or_else(|arc| (*arc).clone()))
    }
}
