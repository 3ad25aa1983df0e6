//! Token Transfer Graph Builder Library
//!
//! Turns a list of ERC-20 token transfers into a deterministic directed
//! weighted graph, ready to be loaded by external graph-analytics tools.
//!
//! # Pipeline Stages
//!
//! 1. **Reading** ([`read_transfers`]): Parses the headerless CSV transfer list
//! 2. **Filtering** ([`filter`]): Drops mints, burns and (optionally) self-transfers
//! 3. **Interning** ([`interner`]): Assigns dense node ids in first-seen order
//! 4. **Aggregation** ([`aggregate_graph`]): Sorts edges and merges parallel ones
//! 5. **Output** ([`write_graph`], [`build_nodes`]): Edge list, node map and degree summary
//!
//! # Output Files
//!
//! - edge list: `from\tto\tcount\ttotal_value` (aggregated) or `from\tto\tvalue` (raw)
//! - node map: `address\tnode_id`
//! - degree summary (optional): per-node degree, transfer count and strength
//!
//! # Example
//!
//! ```
//! use token_graph_builder::aggregate_graph::EdgeMode;
//! use token_graph_builder::filter::FilterPolicy;
//! use token_graph_builder::pipeline;
//! use token_graph_builder::read_transfers::TransferReader;
//!
//! let input = "100,5,0,10,50.0\n101,5,10,20,30.0\n103,5,10,20,70.0\n";
//! let graph = pipeline::run(
//!     TransferReader::new(input.as_bytes()),
//!     FilterPolicy::default(),
//!     EdgeMode::Aggregated,
//! )
//! .unwrap();
//! assert_eq!(graph.stats.node_count, 2);
//! assert_eq!(graph.stats.edge_count, 1);
//! ```

pub mod aggregate_graph;
pub mod build_nodes;
pub mod config;
pub mod error;
pub mod filter;
pub mod interner;
pub mod pipeline;
pub mod read_transfers;
pub mod schemas;
pub mod write_graph;

// Re-export commonly used types
pub use aggregate_graph::{EdgeAggregator, EdgeMode};
pub use config::BuildConfig;
pub use error::GraphError;
pub use filter::{FilterPolicy, TransferFilter};
pub use interner::AddressInterner;
pub use pipeline::{BuiltGraph, GraphBuilder};
pub use schemas::{AggregatedEdge, BuildStats, Edge, EdgeList, NodeMap, RawTransfer, RunMetadata};
