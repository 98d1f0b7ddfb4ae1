//! LP share transfer classification: mint, burn, dev dump

use alloy::primitives::{Address, U256, U512};

use crate::utils::alerts::AlertCategory;
use crate::utils::chain::LiquidityShareTransfer;

/// Percent scaled by 10^6, so thresholds compare at micro-percent resolution
const MICRO_PERCENT_SCALE: u64 = 100_000_000;

/// A rule that fired for one transfer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Finding {
    LpMint,
    LpBurn,
    DevDump { percent: f64 },
}

impl Finding {
    pub fn category(&self) -> AlertCategory {
        match self {
            Finding::LpMint => AlertCategory::LpMint,
            Finding::LpBurn => AlertCategory::LpBurn,
            Finding::DevDump { .. } => AlertCategory::DevDump,
        }
    }
}

/// Dump detection rules for one dev wallet
#[derive(Debug, Clone)]
pub struct DumpRules {
    pub dev_wallet: Address,
    pub threshold_percent: f64,
}

impl DumpRules {
    pub fn new(dev_wallet: Address, threshold_percent: f64) -> Self {
        Self {
            dev_wallet,
            threshold_percent,
        }
    }

    /// Classify a transfer. Rules are independent and may all fire at once;
    /// findings come back in mint, burn, dump order.
    pub fn evaluate(&self, transfer: &LiquidityShareTransfer, total_supply: U256) -> Vec<Finding> {
        let mut findings = Vec::new();

        if transfer.from == Address::ZERO {
            findings.push(Finding::LpMint);
        }

        if transfer.to == Address::ZERO {
            findings.push(Finding::LpBurn);
        }

        if transfer.from == self.dev_wallet {
            let percent = share_percent(transfer.amount, total_supply);
            if percent >= self.threshold_percent {
                findings.push(Finding::DevDump { percent });
            }
        }

        findings
    }
}

/// `amount / total_supply * 100`, or 0 for an empty supply
pub fn share_percent(amount: U256, total_supply: U256) -> f64 {
    if total_supply.is_zero() {
        return 0.0;
    }

    // 512 bits hold amount * scale for any 256-bit amount
    let micro = U512::from(amount) * U512::from(MICRO_PERCENT_SCALE) / U512::from(total_supply);
    let micro = u128::try_from(micro).unwrap_or(u128::MAX);
    micro as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dev() -> Address {
        Address::repeat_byte(0xde)
    }

    fn random() -> Address {
        Address::repeat_byte(0x42)
    }

    fn rules() -> DumpRules {
        DumpRules::new(dev(), 30.0)
    }

    fn transfer(from: Address, to: Address, amount: u64) -> LiquidityShareTransfer {
        LiquidityShareTransfer {
            from,
            to,
            amount: U256::from(amount),
            tx_hash: None,
            log_index: None,
        }
    }

    #[test]
    fn mint_fires_regardless_of_recipient_or_amount() {
        for (to, amount) in [(random(), 0), (dev(), 5), (random(), u64::MAX)] {
            let findings = rules().evaluate(&transfer(Address::ZERO, to, amount), U256::from(100u64));
            assert!(findings.contains(&Finding::LpMint));
        }
    }

    #[test]
    fn burn_fires_for_any_sender() {
        let findings = rules().evaluate(&transfer(random(), Address::ZERO, 5), U256::from(100u64));
        assert_eq!(findings, vec![Finding::LpBurn]);
    }

    #[test]
    fn zero_supply_never_dumps() {
        let findings = rules().evaluate(&transfer(dev(), random(), 1_000), U256::ZERO);
        assert!(findings.is_empty());
        assert_eq!(share_percent(U256::from(1_000u64), U256::ZERO), 0.0);
    }

    #[test]
    fn full_supply_dev_burn_fires_burn_and_dump() {
        let findings = rules().evaluate(&transfer(dev(), Address::ZERO, 100), U256::from(100u64));
        assert_eq!(findings, vec![Finding::LpBurn, Finding::DevDump { percent: 100.0 }]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let supply = U256::from(100_000u64);

        let at = rules().evaluate(&transfer(dev(), random(), 30_000), supply);
        assert_eq!(at, vec![Finding::DevDump { percent: 30.0 }]);

        let below = rules().evaluate(&transfer(dev(), random(), 29_999), supply);
        assert!(below.is_empty());
        assert_eq!(share_percent(U256::from(29_999u64), supply), 29.999);
    }

    #[test]
    fn forty_percent_dev_transfer() {
        let findings = rules().evaluate(&transfer(dev(), random(), 40), U256::from(100u64));
        assert_eq!(findings, vec![Finding::DevDump { percent: 40.0 }]);
        assert_eq!(findings[0].category(), AlertCategory::DevDump);
    }

    #[test]
    fn non_dev_large_transfer_is_ignored() {
        let findings = rules().evaluate(&transfer(random(), dev(), 90), U256::from(100u64));
        assert!(findings.is_empty());
    }

    #[test]
    fn large_supply_keeps_precision() {
        let supply = U256::from(1u64) << 250;
        let half = U256::from(1u64) << 249;

        assert_eq!(share_percent(half, supply), 50.0);

        let findings = rules().evaluate(
            &LiquidityShareTransfer {
                amount: half,
                ..transfer(dev(), random(), 0)
            },
            supply,
        );
        assert_eq!(findings, vec![Finding::DevDump { percent: 50.0 }]);
    }

    #[test]
    fn max_amount_with_max_supply_is_full_share() {
        assert_eq!(share_percent(U256::MAX, U256::MAX), 100.0);
    }

    #[test]
    fn huge_amounts_saturate_instead_of_overflowing() {
        let percent = share_percent(U256::MAX, U256::from(1u64));
        assert!(percent > 100.0);
    }
}
