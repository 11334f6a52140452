//! Election tallies: cumulative representative weight per candidate hash,
//! computed against a weight snapshot taken at tally time.

use crate::vote_info::VoteInfo;
use lattice_ledger::WeightSnapshot;
use lattice_types::{Account, Amount, BlockHash};
use std::collections::HashMap;

/// Candidates ordered by weight, heaviest first. Equal weights order by
/// hash ascending, so every node resolves a dead heat the same way.
#[derive(Clone, Debug, Default)]
pub struct Tally {
    entries: Vec<(BlockHash, Amount)>,
    /// Weight behind final votes, per candidate.
    final_entries: HashMap<BlockHash, Amount>,
}

impl Tally {
    pub fn from_votes(votes: &HashMap<Account, VoteInfo>, snapshot: &WeightSnapshot) -> Self {
        let mut weights: HashMap<BlockHash, Amount> = HashMap::new();
        let mut final_entries: HashMap<BlockHash, Amount> = HashMap::new();
        for (rep, info) in votes {
            let weight = snapshot.weight(rep);
            if weight.is_zero() {
                continue;
            }
            let entry = weights.entry(info.hash).or_insert(Amount::ZERO);
            *entry = entry.saturating_add(weight);
            if info.is_final() {
                let entry = final_entries.entry(info.hash).or_insert(Amount::ZERO);
                *entry = entry.saturating_add(weight);
            }
        }
        let mut entries: Vec<_> = weights.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Self {
            entries,
            final_entries,
        }
    }

    pub fn leader(&self) -> Option<(BlockHash, Amount)> {
        self.entries.first().copied()
    }

    pub fn weight_of(&self, hash: &BlockHash) -> Amount {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == hash)
            .map(|(_, weight)| *weight)
            .unwrap_or(Amount::ZERO)
    }

    pub fn final_weight_of(&self, hash: &BlockHash) -> Amount {
        self.final_entries
            .get(hash)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(BlockHash, Amount)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
