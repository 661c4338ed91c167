//! Configuration for a clearing node.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunable policy for one clearing orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearingConfig {
    /// Network label stamped into settlement outcomes.
    pub network: String,
    /// Intent mandate time-to-live, hours.
    pub intent_ttl_hours: i64,
    /// Cart mandate time-to-live, minutes.
    pub cart_ttl_minutes: i64,
    /// How long created auctions accept sealed submissions, seconds.
    pub auction_duration_secs: u64,
    /// Auction price band as percentages of the matched ask.
    pub priceband_min_pct: u64,
    pub priceband_max_pct: u64,
    /// Unlock-condition polling.
    pub unlock_poll_interval_ms: u64,
    pub unlock_max_polls: u32,
    /// Flat network fee in token units.
    pub settlement_fee: u64,
}

impl Default for ClearingConfig {
    fn default() -> Self {
        Self {
            network: constants::DEFAULT_NETWORK.to_string(),
            intent_ttl_hours: constants::DEFAULT_INTENT_TTL_HOURS,
            cart_ttl_minutes: constants::DEFAULT_CART_TTL_MINUTES,
            auction_duration_secs: constants::DEFAULT_AUCTION_DURATION_SECS,
            priceband_min_pct: constants::DEFAULT_PRICEBAND_MIN_PCT,
            priceband_max_pct: constants::DEFAULT_PRICEBAND_MAX_PCT,
            unlock_poll_interval_ms: constants::DEFAULT_UNLOCK_POLL_INTERVAL_MS,
            unlock_max_polls: constants::DEFAULT_UNLOCK_MAX_POLLS,
            settlement_fee: constants::DEFAULT_SETTLEMENT_FEE,
        }
    }
}

impl ClearingConfig {
    #[must_use]
    pub fn intent_ttl(&self) -> Duration {
        Duration::hours(self.intent_ttl_hours)
    }

    #[must_use]
    pub fn cart_ttl(&self) -> Duration {
        Duration::minutes(self.cart_ttl_minutes)
    }

    /// The auction price band derived from a provider's asking price.
    /// Computed through `u128` and saturated, so a percentage above 100
    /// cannot overflow near the amount ceiling.
    #[must_use]
    pub fn priceband(&self, unit_price: u64) -> (u64, u64) {
        let scale = |pct: u64| {
            let wide = u128::from(unit_price) * u128::from(pct) / 100;
            u64::try_from(wide).unwrap_or(u64::MAX)
        };
        (
            scale(self.priceband_min_pct),
            scale(self.priceband_max_pct),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = ClearingConfig::default();
        assert_eq!(cfg.intent_ttl(), Duration::hours(24));
        assert_eq!(cfg.cart_ttl(), Duration::minutes(30));
        assert_eq!(cfg.settlement_fee, 0);
    }

    #[test]
    fn priceband_scales_with_unit_price() {
        let cfg = ClearingConfig::default();
        let (min, max) = cfg.priceband(1_000);
        assert_eq!(min, 500);
        assert_eq!(max, 1_500);
    }

    #[test]
    fn priceband_saturates_near_the_amount_ceiling() {
        let cfg = ClearingConfig::default();
        let (min, max) = cfg.priceband(u64::MAX);
        assert_eq!(min, u64::MAX / 2);
        assert_eq!(max, u64::MAX);
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = ClearingConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ClearingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.network, back.network);
        assert_eq!(cfg.unlock_max_polls, back.unlock_max_polls);
    }
}
