//! Transfer filtering policy.
//!
//! Decides which raw transfers contribute an edge. Mints (sender is the zero
//! address) and burns (recipient is the zero address) are always dropped in
//! this domain; self-transfers are dropped depending on the policy.

use serde::{Deserialize, Serialize};

use crate::schemas::{Address, RawTransfer, ZERO_ADDRESS};

/// Filtering switches applied to every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Drop mints and burns
    #[serde(default = "default_true")]
    pub exclude_zero_address: bool,

    /// Drop transfers whose sender is also the recipient
    #[serde(default = "default_true")]
    pub exclude_self_transfers: bool,

    /// Keep only transfers emitted by this contract
    #[serde(default)]
    pub contract_id: Option<u64>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            exclude_zero_address: true,
            exclude_self_transfers: true,
            contract_id: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Outcome of filtering one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Emitted by a contract other than the target one
    OtherContract,
    /// Mint or burn
    ZeroAddress,
    SelfTransfer,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferFilter {
    policy: FilterPolicy,
}

impl TransferFilter {
    pub fn new(policy: FilterPolicy) -> Self {
        Self { policy }
    }

    /// Address checks only.
    pub fn accept(&self, from: Address, to: Address) -> bool {
        self.check_addresses(from, to) == Verdict::Accepted
    }

    /// Full check, reporting the first rule that rejected the transfer.
    pub fn classify(&self, transfer: &RawTransfer) -> Verdict {
        if let Some(target) = self.policy.contract_id {
            if transfer.contract_id != target {
                return Verdict::OtherContract;
            }
        }
        self.check_addresses(transfer.from, transfer.to)
    }

    fn check_addresses(&self, from: Address, to: Address) -> Verdict {
        if self.policy.exclude_zero_address && (from == ZERO_ADDRESS || to == ZERO_ADDRESS) {
            Verdict::ZeroAddress
        } else if self.policy.exclude_self_transfers && from == to {
            Verdict::SelfTransfer
        } else {
            Verdict::Accepted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(contract_id: u64, from: Address, to: Address) -> RawTransfer {
        RawTransfer {
            block_id: 1,
            contract_id,
            from,
            to,
            amount: 1.0,
        }
    }

    #[test]
    fn test_default_policy_rejects_mint_burn_and_self() {
        let filter = TransferFilter::default();
        assert!(filter.accept(10, 20));
        assert!(!filter.accept(0, 20));
        assert!(!filter.accept(10, 0));
        assert!(!filter.accept(0, 0));
        assert!(!filter.accept(10, 10));
    }

    #[test]
    fn test_self_transfers_kept_when_allowed() {
        let filter = TransferFilter::new(FilterPolicy {
            exclude_self_transfers: false,
            ..Default::default()
        });
        assert!(filter.accept(10, 10));
        // zero-address check still wins over the self-transfer switch
        assert!(!filter.accept(0, 0));
    }

    #[test]
    fn test_classify_reports_reason() {
        let filter = TransferFilter::new(FilterPolicy {
            contract_id: Some(5),
            ..Default::default()
        });
        assert_eq!(filter.classify(&transfer(5, 1, 2)), Verdict::Accepted);
        assert_eq!(filter.classify(&transfer(6, 1, 2)), Verdict::OtherContract);
        assert_eq!(filter.classify(&transfer(6, 0, 2)), Verdict::OtherContract);
        assert_eq!(filter.classify(&transfer(5, 0, 2)), Verdict::ZeroAddress);
        assert_eq!(filter.classify(&transfer(5, 2, 2)), Verdict::SelfTransfer);
    }

    #[test]
    fn test_policy_defaults_from_empty_toml() {
        let policy: FilterPolicy = toml::from_str("").unwrap();
        assert_eq!(policy, FilterPolicy::default());

        let policy: FilterPolicy = toml::from_str("exclude_self_transfers = false").unwrap();
        assert!(policy.exclude_zero_address);
        assert!(!policy.exclude_self_transfers);
    }
}
