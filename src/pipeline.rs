//! Graph construction pipeline.
//!
//! A [`GraphBuilder`] holds all the state of one run: the address interner,
//! the filter, the edge buffer and the counters. Transfers are pushed in
//! arrival order and [`GraphBuilder::finish`] sorts and aggregates the buffer.
//! Nothing is shared between runs.

use std::time::Instant;
use tracing::{debug, info};

use crate::aggregate_graph::{EdgeAggregator, EdgeMode};
use crate::error::Result;
use crate::filter::{FilterPolicy, TransferFilter, Verdict};
use crate::interner::AddressInterner;
use crate::schemas::{BuildStats, Edge, EdgeList, NodeMap, RawTransfer};

const PROGRESS_INTERVAL: u64 = 1_000_000;

/// The node map, edge list and counters of a finished run.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub node_map: NodeMap,
    pub edges: EdgeList,
    pub stats: BuildStats,
}

/// Per-run construction context.
pub struct GraphBuilder {
    interner: AddressInterner,
    filter: TransferFilter,
    aggregator: EdgeAggregator,
    edges: Vec<Edge>,
    stats: BuildStats,
    started: Instant,
}

impl GraphBuilder {
    pub fn new(policy: FilterPolicy, mode: EdgeMode) -> Self {
        Self {
            interner: AddressInterner::new(),
            filter: TransferFilter::new(policy),
            aggregator: EdgeAggregator::new(mode),
            edges: Vec::new(),
            stats: BuildStats::default(),
            started: Instant::now(),
        }
    }

    /// Filter one transfer and buffer its edge. Returns whether it was accepted.
    pub fn push(&mut self, transfer: &RawTransfer) -> bool {
        self.stats.records_read += 1;
        if self.stats.records_read % PROGRESS_INTERVAL == 0 {
            debug!(
                "Read {} records, {} nodes, {} edges buffered",
                self.stats.records_read,
                self.interner.len(),
                self.edges.len()
            );
        }

        match self.filter.classify(transfer) {
            Verdict::Accepted => {}
            Verdict::OtherContract => {
                self.stats.rejected_other_contract += 1;
                return false;
            }
            Verdict::ZeroAddress => {
                self.stats.rejected_zero_address += 1;
                return false;
            }
            Verdict::SelfTransfer => {
                self.stats.rejected_self_transfers += 1;
                return false;
            }
        }

        // sender first, so a transfer between two new addresses numbers `from` lower
        let from = self.interner.get_or_create_id(transfer.from);
        let to = self.interner.get_or_create_id(transfer.to);
        self.edges.push(Edge {
            from,
            to,
            value: transfer.amount,
        });
        self.stats.accepted_transfers += 1;
        true
    }

    pub fn node_count(&self) -> usize {
        self.interner.len()
    }

    pub fn buffered_edges(&self) -> usize {
        self.edges.len()
    }

    /// Sort and aggregate the buffered edges, consuming the run state.
    pub fn finish(self) -> BuiltGraph {
        let GraphBuilder {
            interner,
            aggregator,
            edges,
            mut stats,
            started,
            ..
        } = self;

        let edges = aggregator.finish(edges);
        let node_map = interner.into_node_map();

        stats.node_count = node_map.len();
        stats.edge_count = edges.len();
        stats.elapsed = started.elapsed();

        info!(
            "Built {} graph: {} nodes, {} edges from {} accepted transfers ({} records read)",
            aggregator.mode(),
            stats.node_count,
            stats.edge_count,
            stats.accepted_transfers,
            stats.records_read
        );
        debug!(
            "Rejected: {} other contract, {} mint/burn, {} self-transfers",
            stats.rejected_other_contract,
            stats.rejected_zero_address,
            stats.rejected_self_transfers
        );

        BuiltGraph {
            node_map,
            edges,
            stats,
        }
    }
}

/// Run the whole pipeline over a transfer source.
///
/// The first error from the source aborts the run and nothing is returned.
pub fn run<I>(source: I, policy: FilterPolicy, mode: EdgeMode) -> Result<BuiltGraph>
where
    I: IntoIterator<Item = Result<RawTransfer>>,
{
    let mut builder = GraphBuilder::new(policy, mode);
    for transfer in source {
        builder.push(&transfer?);
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::read_transfers::TransferReader;
    use crate::schemas::AggregatedEdge;

    const EXAMPLE: &str = "100,5,0,10,50.0\n\
                           101,5,10,20,30.0\n\
                           102,5,20,10,5.0\n\
                           103,5,10,20,70.0\n\
                           104,5,10,10,1.0\n";

    fn build(input: &str, policy: FilterPolicy, mode: EdgeMode) -> Result<BuiltGraph> {
        run(TransferReader::new(input.as_bytes()), policy, mode)
    }

    fn keep_self() -> FilterPolicy {
        FilterPolicy {
            exclude_self_transfers: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_example_aggregated() {
        let graph = build(EXAMPLE, FilterPolicy::default(), EdgeMode::Aggregated).unwrap();

        assert_eq!(graph.node_map.addresses(), &[10, 20]);
        assert_eq!(
            graph.edges,
            EdgeList::Aggregated(vec![
                AggregatedEdge { from: 0, to: 1, count: 2, total_value: 100.0 },
                AggregatedEdge { from: 1, to: 0, count: 1, total_value: 5.0 },
            ])
        );
        assert_eq!(graph.stats.records_read, 5);
        assert_eq!(graph.stats.accepted_transfers, 3);
        assert_eq!(graph.stats.rejected_zero_address, 1);
        assert_eq!(graph.stats.rejected_self_transfers, 1);
        assert_eq!(graph.stats.edge_count, 2);
        assert_eq!(graph.stats.node_count, 2);
    }

    #[test]
    fn test_example_raw_keeping_self_transfers() {
        let graph = build(EXAMPLE, keep_self(), EdgeMode::Raw).unwrap();

        assert_eq!(graph.node_map.addresses(), &[10, 20]);
        assert_eq!(
            graph.edges,
            EdgeList::Raw(vec![
                Edge { from: 0, to: 0, value: 1.0 },
                Edge { from: 0, to: 1, value: 30.0 },
                Edge { from: 0, to: 1, value: 70.0 },
                Edge { from: 1, to: 0, value: 5.0 },
            ])
        );
        assert_eq!(graph.stats.rejected_self_transfers, 0);
    }

    #[test]
    fn test_example_aggregated_keeping_self_transfers() {
        let graph = build(EXAMPLE, keep_self(), EdgeMode::Aggregated).unwrap();
        let EdgeList::Aggregated(edges) = graph.edges else {
            panic!("expected aggregated edges");
        };
        assert_eq!(
            edges[0],
            AggregatedEdge { from: 0, to: 0, count: 1, total_value: 1.0 }
        );
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn test_rejected_endpoints_are_not_interned() {
        // 30 only appears in a burn and 40 only in a self-transfer
        let input = "1,1,30,0,1.0\n2,1,40,40,1.0\n3,1,50,60,1.0\n";
        let graph = build(input, FilterPolicy::default(), EdgeMode::Aggregated).unwrap();
        assert_eq!(graph.node_map.addresses(), &[50, 60]);
    }

    #[test]
    fn test_contract_restriction() {
        let input = "1,7,1,2,1.0\n2,8,3,4,1.0\n3,7,2,1,2.0\n";
        let policy = FilterPolicy {
            contract_id: Some(7),
            ..Default::default()
        };
        let graph = build(input, policy, EdgeMode::Raw).unwrap();
        assert_eq!(graph.node_map.addresses(), &[1, 2]);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.stats.rejected_other_contract, 1);
    }

    #[test]
    fn test_malformed_record_aborts_run() {
        let input = "1,1,1,2,1.0\n2,1,2,x,1.0\n3,1,2,3,1.0\n";
        let err = build(input, FilterPolicy::default(), EdgeMode::Aggregated).unwrap_err();
        assert!(matches!(
            err,
            GraphError::NumericParse { line: 2, field: "to_address", .. }
        ));
    }

    #[test]
    fn test_empty_source() {
        let graph = build("", FilterPolicy::default(), EdgeMode::Aggregated).unwrap();
        assert!(graph.node_map.is_empty());
        assert!(graph.edges.is_empty());
        assert_eq!(graph.stats.records_read, 0);
    }

    #[test]
    fn test_push_reports_acceptance() {
        let mut builder = GraphBuilder::new(FilterPolicy::default(), EdgeMode::Raw);
        let mint = RawTransfer { block_id: 1, contract_id: 1, from: 0, to: 5, amount: 1.0 };
        let transfer = RawTransfer { from: 5, to: 6, ..mint };
        assert!(!builder.push(&mint));
        assert!(builder.push(&transfer));
        assert_eq!(builder.node_count(), 2);
        assert_eq!(builder.buffered_edges(), 1);
    }
}
