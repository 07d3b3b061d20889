use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;
use verisum_core::{Condition, Error, Factor, FactorLevel, Result, TrialRecord};

use crate::table::TrialTable;

/// Row fields of [`TrialRecord`]; factor names may not shadow them because
/// conditions flatten into the persisted row.
const RESERVED_COLUMNS: [&str; 5] = [
    "trial_number",
    "block_number",
    "response",
    "reaction_time_ns",
    "completed",
];

/// Strategy for turning design parameters into a full trial table. Each
/// experiment variant implements this; callers pick the variant they want
/// instead of subclassing anything.
pub trait DesignGenerator {
    fn generate<R: Rng>(&self, rng: &mut R) -> Result<TrialTable>;
}

/// Fully crossed factorial design with block-wise counterbalancing: every
/// combination of factor levels appears exactly `repetitions` times per
/// block, in an order shuffled independently per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorialDesign {
    pub factors: Vec<Factor>,
    pub repetitions: usize,
    pub blocks: usize,
}

impl FactorialDesign {
    pub fn new(factors: Vec<Factor>, repetitions: usize, blocks: usize) -> Self {
        Self {
            factors,
            repetitions,
            blocks,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.factors.is_empty() {
            return Err(Error::InvalidDesign("design has no factors".into()));
        }
        if self.repetitions < 1 {
            return Err(Error::InvalidDesign("repetitions must be at least 1".into()));
        }
        if self.blocks < 1 {
            return Err(Error::InvalidDesign("blocks must be at least 1".into()));
        }
        for (i, factor) in self.factors.iter().enumerate() {
            if factor.levels.is_empty() {
                return Err(Error::InvalidDesign(format!(
                    "factor {:?} has no levels",
                    factor.name
                )));
            }
            if RESERVED_COLUMNS.contains(&factor.name.as_str()) {
                return Err(Error::InvalidDesign(format!(
                    "factor name {:?} shadows a trial record column",
                    factor.name
                )));
            }
            if self.factors[..i].iter().any(|f| f.name == factor.name) {
                return Err(Error::InvalidDesign(format!(
                    "duplicate factor name {:?}",
                    factor.name
                )));
            }
        }
        Ok(())
    }

    /// Cartesian product of all factor levels, preserving the declared
    /// factor order; later factors vary fastest.
    pub fn combinations(&self) -> Vec<Condition> {
        let mut combos: Vec<Vec<(String, FactorLevel)>> = vec![Vec::new()];
        for factor in &self.factors {
            let mut next = Vec::with_capacity(combos.len() * factor.levels.len());
            for partial in &combos {
                for level in &factor.levels {
                    let mut combo = partial.clone();
                    combo.push((factor.name.clone(), level.clone()));
                    next.push(combo);
                }
            }
            combos = next;
        }
        combos.into_iter().map(Condition::new).collect()
    }

    pub fn trials_per_block(&self) -> usize {
        let n_combinations: usize = self.factors.iter().map(|f| f.levels.len()).product();
        n_combinations * self.repetitions
    }

    pub fn total_trials(&self) -> usize {
        self.blocks * self.trials_per_block()
    }

    pub fn factor_names(&self) -> Vec<String> {
        self.factors.iter().map(|f| f.name.clone()).collect()
    }
}

impl DesignGenerator for FactorialDesign {
    fn generate<R: Rng>(&self, rng: &mut R) -> Result<TrialTable> {
        self.validate()?;

        let combinations = self.combinations();
        // Each combination index `repetitions` times; one block's multiset.
        let block_multiset: Vec<usize> = (0..self.repetitions)
            .flat_map(|_| 0..combinations.len())
            .collect();

        let mut records = Vec::with_capacity(self.blocks * block_multiset.len());
        for block_number in 0..self.blocks {
            let mut order = block_multiset.clone();
            // Fisher-Yates: a uniform permutation drawn without replacement,
            // independent of every other block.
            order.shuffle(rng);
            for combination_index in order {
                let trial_number = records.len();
                records.push(TrialRecord::fresh(
                    trial_number,
                    block_number,
                    combinations[combination_index].clone(),
                ));
            }
        }

        info!(
            trials = records.len(),
            blocks = self.blocks,
            combinations = combinations.len(),
            repetitions = self.repetitions,
            "trial table generated"
        );
        Ok(TrialTable::new(self.factor_names(), records))
    }
}
