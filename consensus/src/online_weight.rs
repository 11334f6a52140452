//! Online representative weight tracking and the quorum it implies.
//!
//! The quorum denominator is the greatest of instantaneous online weight,
//! its slow-moving trend and a configured floor, so quorum never collapses
//! when representatives briefly drop offline.

use lattice_ledger::WeightSnapshot;
use lattice_types::{Account, Amount, ProtocolParams, Timestamp};
use std::collections::HashMap;
use tracing::trace;

pub struct OnlineWeightSampler {
    params: ProtocolParams,
    voters: HashMap<Account, Timestamp>,
    online: Amount,
    trended: Amount,
}

impl OnlineWeightSampler {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            voters: HashMap::new(),
            online: Amount::ZERO,
            trended: Amount::ZERO,
        }
    }

    /// A representative proved liveness (sent a valid vote).
    pub fn observe(&mut self, rep: Account, now: Timestamp) {
        self.voters.insert(rep, now);
    }

    /// Recompute online weight from recent voters and fold it into the trend.
    pub fn sample(&mut self, snapshot: &WeightSnapshot, now: Timestamp) {
        let window = self.params.online_weight_window_secs;
        self.voters.retain(|_, seen| !seen.has_expired(window, now));
        self.online = self
            .voters
            .keys()
            .map(|rep| snapshot.weight(rep))
            .sum();
        let decay = self.params.online_trend_decay_pct as u128;
        if self.trended.is_zero() {
            self.trended = self.online;
        } else {
            // Divide before multiplying: values run close to the supply cap.
            self.trended = Amount::raw(
                self.trended.value() / 100 * decay + self.online.value() / 100 * (100 - decay),
            );
        }
        trace!(online = %self.online, trended = %self.trended, voters = self.voters.len(), "online weight sampled");
    }

    pub fn online(&self) -> Amount {
        self.online
    }

    pub fn trended(&self) -> Amount {
        self.trended
    }

    /// Weight a candidate tally must reach for confirmation.
    pub fn quorum_delta(&self) -> Amount {
        let denominator = self
            .online
            .max(self.trended)
            .max(self.params.online_weight_minimum);
        denominator.multiply_bps(self.params.quorum_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(byte: u8) -> Account {
        Account::from_bytes([byte; 32])
    }

    fn snapshot(weights: &[(Account, u128)]) -> WeightSnapshot {
        WeightSnapshot::from_map(
            weights
                .iter()
                .map(|(rep, weight)| (*rep, Amount::raw(*weight)))
                .collect(),
        )
    }

    #[test]
    fn quorum_never_drops_below_the_floor() {
        let params = ProtocolParams::dev_defaults();
        let floor_quorum = params.online_weight_minimum.multiply_bps(params.quorum_bps);
        let sampler = OnlineWeightSampler::new(params);
        assert_eq!(sampler.quorum_delta(), floor_quorum);
    }

    #[test]
    fn quorum_grows_monotonically_with_online_weight() {
        let params = ProtocolParams::dev_defaults();
        let mut sampler = OnlineWeightSampler::new(params.clone());
        let heavy = params.online_weight_minimum.saturating_add(Amount::raw(1_000_000));
        let snapshot = snapshot(&[(rep(1), heavy.value()), (rep(2), heavy.value())]);

        let mut previous = sampler.quorum_delta();
        sampler.observe(rep(1), Timestamp::new(1));
        sampler.sample(&snapshot, Timestamp::new(1));
        assert!(sampler.quorum_delta() >= previous);
        previous = sampler.quorum_delta();

        sampler.observe(rep(2), Timestamp::new(2));
        sampler.sample(&snapshot, Timestamp::new(2));
        assert!(sampler.quorum_delta() >= previous);
        assert_eq!(sampler.online(), heavy.saturating_add(heavy));
    }

    #[test]
    fn stale_voters_age_out_but_the_trend_holds_quorum_up() {
        let params = ProtocolParams::dev_defaults();
        let window = params.online_weight_window_secs;
        let mut sampler = OnlineWeightSampler::new(params.clone());
        let weight = params.online_weight_minimum.value() * 10;
        let snapshot = snapshot(&[(rep(1), weight)]);

        sampler.observe(rep(1), Timestamp::new(1));
        sampler.sample(&snapshot, Timestamp::new(1));
        let online_quorum = sampler.quorum_delta();
        assert!(online_quorum > params.online_weight_minimum.multiply_bps(params.quorum_bps));

        sampler.sample(&snapshot, Timestamp::new(2 + window));
        assert_eq!(sampler.online(), Amount::ZERO);
        // The trend decays slowly; quorum stays well above the floor.
        assert!(sampler.quorum_delta() > params.online_weight_minimum.multiply_bps(params.quorum_bps));
        assert!(sampler.quorum_delta() < online_quorum);
    }
}
