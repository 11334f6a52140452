//! Representative weight cache.
//!
//! Weights change on every processed or rolled-back block but are read by
//! every tally computation across many concurrent elections. The cache is
//! therefore read-mostly: writers update under a short lock, and the
//! consensus layer takes an immutable [`WeightSnapshot`] per tally rather
//! than locking the live map.

use lattice_types::{Account, Amount};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Process-wide cumulative voting weight per representative.
#[derive(Default)]
pub struct RepWeights {
    weights: RwLock<HashMap<Account, Amount>>,
}

impl RepWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn representation_add(&self, rep: Account, amount: Amount) {
        if rep.is_zero() || amount.is_zero() {
            return;
        }
        let mut weights = self.weights.write().expect("rep weights poisoned");
        let entry = weights.entry(rep).or_insert(Amount::ZERO);
        *entry = entry.saturating_add(amount);
    }

    pub fn representation_sub(&self, rep: Account, amount: Amount) {
        if rep.is_zero() || amount.is_zero() {
            return;
        }
        let mut weights = self.weights.write().expect("rep weights poisoned");
        if let Some(entry) = weights.get_mut(&rep) {
            *entry = entry.saturating_sub(amount);
            if entry.is_zero() {
                weights.remove(&rep);
            }
        }
    }

    pub fn weight(&self, rep: &Account) -> Amount {
        self.weights
            .read()
            .expect("rep weights poisoned")
            .get(rep)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Immutable copy of the current weights for tally computation.
    pub fn snapshot(&self) -> WeightSnapshot {
        let weights = self.weights.read().expect("rep weights poisoned");
        WeightSnapshot {
            weights: Arc::new(weights.clone()),
        }
    }
}

/// A point-in-time view of representative weights.
///
/// Cheap to clone and safe to read from any thread; reflects ledger weight
/// at snapshot time, not vote time.
#[derive(Clone)]
pub struct WeightSnapshot {
    weights: Arc<HashMap<Account, Amount>>,
}

impl WeightSnapshot {
    pub fn weight(&self, rep: &Account) -> Amount {
        self.weights.get(rep).copied().unwrap_or(Amount::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Account, &Amount)> {
        self.weights.iter()
    }

    /// Build a snapshot from an explicit map (bootstrap weights, tests).
    pub fn from_map(weights: HashMap<Account, Amount>) -> Self {
        Self {
            weights: Arc::new(weights),
        }
    }
}
