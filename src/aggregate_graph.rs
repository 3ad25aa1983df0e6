//! Graph aggregation module.
//!
//! Sorts the buffered edges of a run by `(from, to)` and either emits them
//! as-is or merges parallel edges into one weighted edge per node pair.
//!
//! The sort is stable, so parallel edges keep their insertion order. Merged
//! values are summed as `f64` in that order, which makes totals reproducible
//! bit for bit across runs.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::schemas::{AggregatedEdge, Edge, EdgeList};

/// Output form of the edge list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// One row per node pair with transfer count and total value
    #[default]
    Aggregated,
    /// One row per accepted transfer
    Raw,
}

impl std::fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeMode::Aggregated => write!(f, "aggregated"),
            EdgeMode::Raw => write!(f, "raw"),
        }
    }
}

impl FromStr for EdgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregated" | "collapsed" => Ok(EdgeMode::Aggregated),
            "raw" | "multigraph" => Ok(EdgeMode::Raw),
            other => Err(format!(
                "unknown edge mode {other:?} (expected \"aggregated\" or \"raw\")"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeAggregator {
    mode: EdgeMode,
}

impl EdgeAggregator {
    pub fn new(mode: EdgeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> EdgeMode {
        self.mode
    }

    /// Consume the edge buffer of a run and produce the sorted output list.
    pub fn finish(&self, mut edges: Vec<Edge>) -> EdgeList {
        sort_edges(&mut edges);
        match self.mode {
            EdgeMode::Raw => EdgeList::Raw(edges),
            EdgeMode::Aggregated => {
                let merged = merge_sorted(&edges);
                debug!(
                    "Merged {} parallel edges into {} edges",
                    edges.len(),
                    merged.len()
                );
                EdgeList::Aggregated(merged)
            }
        }
    }
}

/// Stable sort by `(from, to)`.
pub fn sort_edges(edges: &mut [Edge]) {
    edges.sort_by_key(Edge::key);
}

/// Merge runs of equal keys in an already sorted slice.
pub fn merge_sorted(edges: &[Edge]) -> Vec<AggregatedEdge> {
    let mut merged: Vec<AggregatedEdge> = Vec::new();

    for edge in edges {
        match merged.last_mut() {
            Some(last) if last.key() == edge.key() => {
                last.count += 1;
                last.total_value += edge.value;
            }
            _ => merged.push(AggregatedEdge {
                from: edge.from,
                to: edge.to,
                count: 1,
                total_value: edge.value,
            }),
        }
    }

    merged
}
