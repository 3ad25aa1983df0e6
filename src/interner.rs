//! Dense node identifiers for sparse addresses.

use std::collections::HashMap;

use crate::schemas::{Address, NodeId, NodeMap};

/// Assigns sequential node ids to addresses in first-seen order.
///
/// Ids start at 0 and are never reused or skipped, so after `n` distinct
/// addresses the assigned ids are exactly `0..n`.
#[derive(Debug, Default)]
pub struct AddressInterner {
    ids: HashMap<Address, NodeId>,
    /// Addresses in assignment order; the index is the node id.
    addresses: Vec<Address>,
}

impl AddressInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `address`, allocating the next one on first sight.
    pub fn get_or_create_id(&mut self, address: Address) -> NodeId {
        let next_id = self.addresses.len() as NodeId;
        let id = *self.ids.entry(address).or_insert(next_id);
        if id == next_id {
            self.addresses.push(address);
        }
        id
    }

    pub fn get(&self, address: Address) -> Option<NodeId> {
        self.ids.get(&address).copied()
    }

    /// Number of nodes assigned so far.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn into_node_map(self) -> NodeMap {
        NodeMap::new(self.addresses)
    }
}
