use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use verisum_core::{Error, Response, Result, TrialRecord};

/// The session's trial record: one row per trial, keyed by `trial_number`,
/// mutated one row at a time as trials complete. Persisted as a whole-table
/// JSON snapshot after every mutation so a crash loses at most the in-flight
/// trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialTable {
    factors: Vec<String>,
    trials: Vec<TrialRecord>,
}

impl TrialTable {
    pub fn new(factors: Vec<String>, trials: Vec<TrialRecord>) -> Self {
        Self { factors, trials }
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Ordered factor names; every row carries one column per entry
    pub fn factor_names(&self) -> &[String] {
        &self.factors
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn get(&self, trial_number: usize) -> Result<&TrialRecord> {
        self.trials.get(trial_number).ok_or(Error::OutOfRange {
            trial_number,
            len: self.trials.len(),
        })
    }

    /// Record a trial's outcome: writes the response and reaction time, then
    /// marks the trial completed. Refuses rows that already hold a response;
    /// corrections must go through [`TrialTable::amend_response`].
    pub fn set_response(
        &mut self,
        trial_number: usize,
        response: Response,
        reaction_time_ns: u64,
    ) -> Result<()> {
        let record = self.get_mut(trial_number)?;
        if record.completed {
            return Err(Error::ResponseAlreadyRecorded { trial_number });
        }
        record.response = Some(response);
        record.reaction_time_ns = Some(reaction_time_ns);
        record.completed = true;
        Ok(())
    }

    /// Explicit correction path: overwrite a trial's recorded outcome. The
    /// only way to change a completed row.
    pub fn amend_response(
        &mut self,
        trial_number: usize,
        response: Response,
        reaction_time_ns: u64,
    ) -> Result<()> {
        let record = self.get_mut(trial_number)?;
        record.response = Some(response);
        record.reaction_time_ns = Some(reaction_time_ns);
        record.completed = true;
        Ok(())
    }

    /// Lowest-numbered trial that has not completed, or `None` when the
    /// session is done. Linear scan; called once per trial.
    pub fn first_incomplete(&self) -> Option<usize> {
        self.trials.iter().position(|record| !record.completed)
    }

    /// Number of completed trials. Derived from the rows on every call so it
    /// can never drift from the `completed` flags.
    pub fn progress_count(&self) -> usize {
        self.trials.iter().filter(|record| record.completed).count()
    }

    /// Serialize the whole table to `path`, replacing any prior snapshot.
    /// Writes to a temp file and renames so an interrupted persist never
    /// truncates the previous snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(self)?;
        buf.push('\n');
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &buf)?;
        fs::rename(&tmp_path, path)?;
        debug!(path = %path.display(), completed = self.progress_count(), "trial table persisted");
        Ok(())
    }

    /// Load a previously persisted snapshot and verify its invariants
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::Corrupt(format!("unreadable snapshot {}: {e}", path.display())))?;
        table.verify()?;
        debug!(path = %path.display(), trials = table.len(), completed = table.progress_count(), "trial table loaded");
        Ok(table)
    }

    fn get_mut(&mut self, trial_number: usize) -> Result<&mut TrialRecord> {
        let len = self.trials.len();
        self.trials
            .get_mut(trial_number)
            .ok_or(Error::OutOfRange { trial_number, len })
    }

    /// Invariant checks applied to loaded snapshots: contiguous primary key,
    /// block-contiguous rows, completion flag consistent with its fields,
    /// every row carrying exactly the declared factor columns.
    fn verify(&self) -> Result<()> {
        let mut previous_block = 0;
        for (i, record) in self.trials.iter().enumerate() {
            if record.trial_number != i {
                return Err(Error::Corrupt(format!(
                    "row {i} has trial_number {}",
                    record.trial_number
                )));
            }
            if record.block_number < previous_block {
                return Err(Error::Corrupt(format!(
                    "trial {i} jumps back to block {}",
                    record.block_number
                )));
            }
            previous_block = record.block_number;

            let consistent = record.completed
                == (record.response.is_some() && record.reaction_time_ns.is_some());
            if !consistent {
                return Err(Error::Corrupt(format!(
                    "trial {i} has completed = {} but response {:?} and reaction time {:?}",
                    record.completed, record.response, record.reaction_time_ns
                )));
            }

            let columns: Vec<&str> = record.condition.factor_names().collect();
            if columns != self.factors.iter().map(String::as_str).collect::<Vec<_>>() {
                return Err(Error::Corrupt(format!(
                    "trial {i} columns {columns:?} do not match declared factors {:?}",
                    self.factors
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verisum_core::{Condition, Key};

    fn small_table() -> TrialTable {
        let factors = vec!["stimulus".to_string(), "sum_correct".to_string()];
        let trials = (0..4)
            .map(|i| {
                TrialRecord::fresh(
                    i,
                    i / 2,
                    Condition::new(vec![
                        ("stimulus".into(), (if i % 2 == 0 { "A" } else { "B" }).into()),
                        ("sum_correct".into(), (i % 2 == 0).into()),
                    ]),
                )
            })
            .collect();
        TrialTable::new(factors, trials)
    }

    #[test]
    fn get_rejects_out_of_range_indices() {
        let table = small_table();
        assert!(table.get(3).is_ok());
        assert!(matches!(
            table.get(4),
            Err(Error::OutOfRange {
                trial_number: 4,
                len: 4
            })
        ));
    }

    #[test]
    fn set_response_completes_exactly_one_row() {
        let mut table = small_table();
        table
            .set_response(1, Response::Key(Key::Char('j')), 321_000_000)
            .unwrap();

        let record = table.get(1).unwrap();
        assert_eq!(record.response, Some(Response::Key(Key::Char('j'))));
        assert_eq!(record.reaction_time_ns, Some(321_000_000));
        assert!(record.completed);
        assert_eq!(table.progress_count(), 1);
        assert!(!table.get(0).unwrap().completed);
    }

    #[test]
    fn set_response_refuses_completed_rows() {
        let mut table = small_table();
        table.set_response(0, Response::NoResponse, 2_000_000_000).unwrap();
        assert!(matches!(
            table.set_response(0, Response::Key(Key::Char('f')), 100),
            Err(Error::ResponseAlreadyRecorded { trial_number: 0 })
        ));
        // The refused write must not have touched the row.
        assert_eq!(table.get(0).unwrap().response, Some(Response::NoResponse));
    }

    #[test]
    fn amend_response_overwrites_completed_rows() {
        let mut table = small_table();
        table.set_response(0, Response::NoResponse, 2_000_000_000).unwrap();
        table
            .amend_response(0, Response::Key(Key::Char('f')), 450_000_000)
            .unwrap();
        let record = table.get(0).unwrap();
        assert_eq!(record.response, Some(Response::Key(Key::Char('f'))));
        assert_eq!(record.reaction_time_ns, Some(450_000_000));
    }

    #[test]
    fn first_incomplete_walks_forward_in_order() {
        let mut table = small_table();
        assert_eq!(table.first_incomplete(), Some(0));
        for i in 0..4 {
            table.set_response(i, Response::NoResponse, 1).unwrap();
            let expected = if i == 3 { None } else { Some(i + 1) };
            assert_eq!(table.first_incomplete(), expected);
        }
        assert_eq!(table.progress_count(), 4);
    }

    #[test]
    fn snapshot_round_trips_and_preserves_resume_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut table = small_table();
        table
            .set_response(0, Response::Key(Key::Char('j')), 512_000_000)
            .unwrap();
        table.save(&path).unwrap();

        let loaded = TrialTable::load(&path).unwrap();
        assert_eq!(loaded, table);
        assert_eq!(loaded.first_incomplete(), table.first_incomplete());
        assert_eq!(loaded.progress_count(), 1);
    }

    #[test]
    fn save_overwrites_the_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut table = small_table();
        table.save(&path).unwrap();
        table.set_response(0, Response::NoResponse, 7).unwrap();
        table.save(&path).unwrap();

        let loaded = TrialTable::load(&path).unwrap();
        assert_eq!(loaded.progress_count(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_rejects_a_gap_in_trial_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut table = small_table();
        table.trials[2].trial_number = 9;
        table.save(&path).unwrap();
        assert!(matches!(TrialTable::load(&path), Err(Error::Corrupt(_))));
    }

    #[test]
    fn load_rejects_a_completed_row_missing_its_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut table = small_table();
        table.trials[1].completed = true;
        table.save(&path).unwrap();
        assert!(matches!(TrialTable::load(&path), Err(Error::Corrupt(_))));
    }

    #[test]
    fn load_rejects_unparseable_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not a table").unwrap();
        assert!(matches!(TrialTable::load(&path), Err(Error::Corrupt(_))));
    }
}
