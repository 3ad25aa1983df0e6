//! Data schemas for graph construction.
//!
//! This module is the canonical definition of the records flowing through the
//! pipeline: raw transfers in, interned edges in the middle, node map and edge
//! list out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::aggregate_graph::EdgeMode;
use crate::filter::FilterPolicy;

/// Schema version for tracking changes
pub const SCHEMA_VERSION: &str = "1.0.0";

/// External participant identifier. `0` is the mint/burn pseudo-address.
pub type Address = u64;

/// Dense node identifier in `[0, node_count)`.
pub type NodeId = u64;

/// The address used as sender of mints and recipient of burns.
pub const ZERO_ADDRESS: Address = 0;

// ============================================================================
// Input
// ============================================================================

/// One token transfer as read from the input list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawTransfer {
    /// Block in which the transfer occurred
    pub block_id: u64,

    /// Contract that emitted the transfer event
    pub contract_id: u64,

    /// Sender address
    pub from: Address,

    /// Recipient address
    pub to: Address,

    /// Amount transferred, already scaled by the token decimals
    pub amount: f64,
}

// ============================================================================
// Edges
// ============================================================================

/// A single transfer between two interned nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub value: f64,
}

impl Edge {
    pub fn key(&self) -> (NodeId, NodeId) {
        (self.from, self.to)
    }
}

/// All transfers sharing one `(from, to)` pair, merged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEdge {
    pub from: NodeId,
    pub to: NodeId,

    /// Number of contributing transfers
    pub count: u64,

    /// Sum of the contributing values, in sorted order
    pub total_value: f64,
}

impl AggregatedEdge {
    pub fn key(&self) -> (NodeId, NodeId) {
        (self.from, self.to)
    }
}

/// Sorted edge list produced by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeList {
    Raw(Vec<Edge>),
    Aggregated(Vec<AggregatedEdge>),
}

impl EdgeList {
    pub fn len(&self) -> usize {
        match self {
            EdgeList::Raw(edges) => edges.len(),
            EdgeList::Aggregated(edges) => edges.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> EdgeMode {
        match self {
            EdgeList::Raw(_) => EdgeMode::Raw,
            EdgeList::Aggregated(_) => EdgeMode::Aggregated,
        }
    }

    /// Iterate as `(from, to, transfers, value)` regardless of mode.
    pub fn iter_weighted(&self) -> Box<dyn Iterator<Item = (NodeId, NodeId, u64, f64)> + '_> {
        match self {
            EdgeList::Raw(edges) => Box::new(edges.iter().map(|e| (e.from, e.to, 1, e.value))),
            EdgeList::Aggregated(edges) => Box::new(
                edges
                    .iter()
                    .map(|e| (e.from, e.to, e.count, e.total_value)),
            ),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Addresses indexed by node id, in assignment order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMap {
    addresses: Vec<Address>,
}

impl NodeMap {
    pub(crate) fn new(addresses: Vec<Address>) -> Self {
        Self { addresses }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn address(&self, id: NodeId) -> Option<Address> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.addresses.get(idx).copied())
    }

    /// `(address, node_id)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, NodeId)> + '_ {
        self.addresses
            .iter()
            .enumerate()
            .map(|(id, &address)| (address, id as NodeId))
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }
}

// ============================================================================
// Run statistics and metadata
// ============================================================================

/// Counters collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Nodes in the output graph
    pub node_count: usize,

    /// Rows in the output edge list
    pub edge_count: usize,

    /// Records read from the source
    pub records_read: u64,

    /// Transfers that produced an edge
    pub accepted_transfers: u64,

    /// Rejected because the contract is not the target one
    pub rejected_other_contract: u64,

    /// Rejected mints and burns
    pub rejected_zero_address: u64,

    /// Rejected because sender and recipient coincide
    pub rejected_self_transfers: u64,

    /// Construction time, excluding output
    #[serde(with = "duration_nanos")]
    pub elapsed: Duration,
}

mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(d)?;
        Ok(Duration::from_nanos(nanos))
    }
}

/// Run metadata for reproducibility and auditing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Schema version used
    pub schema_version: String,

    /// Run timestamp
    pub run_timestamp: DateTime<Utc>,

    /// Input transfer list
    pub input_path: String,

    /// Edge list form
    pub mode: EdgeMode,

    /// Filtering policy applied
    pub policy: FilterPolicy,

    /// Counters from the run
    pub stats: BuildStats,

    /// Wall time including output, in nanoseconds
    pub total_elapsed_nanos: u64,

    /// Git commit hash (if available)
    pub git_commit: Option<String>,

    /// Builder version
    pub builder_version: String,
}

impl RunMetadata {
    pub fn new(input_path: &Path, mode: EdgeMode, policy: FilterPolicy, stats: BuildStats) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_timestamp: Utc::now(),
            input_path: input_path.display().to_string(),
            mode,
            policy,
            total_elapsed_nanos: u64::try_from(stats.elapsed.as_nanos()).unwrap_or(u64::MAX),
            stats,
            git_commit: get_git_commit(),
            builder_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn write_json<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}

fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
}
