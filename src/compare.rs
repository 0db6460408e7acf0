use crate::benchmark::{list_recent_files, load_results, ResultSet, TestRecord};
use crate::config::{Config, EnvironmentConfig};
use crate::error::{Error, Result};
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The current run plus at most one earlier run.
const FILES_PER_ENVIRONMENT: usize = 2;

/// Results for one environment: the newest file and, if one was usable, the
/// file before it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentRun {
	pub label: String,
	pub current: ResultSet,
	pub previous: Option<ResultSet>,
}

impl EnvironmentRun {
	pub fn new<S: Into<String>>(label: S, current: ResultSet, previous: Option<ResultSet>) -> Self {
		EnvironmentRun {
			label: label.into(),
			current,
			previous,
		}
	}

	/// Loads the newest result file in the environment's directory, which
	/// must exist and parse. The second newest is used as history when it
	/// parses and ignored otherwise.
	pub fn load(env: &EnvironmentConfig) -> Result<Self> {
		let pattern = env.file_pattern()?;
		let files = list_recent_files(&env.dir, &pattern, FILES_PER_ENVIRONMENT)?;
		let current = match files.first() {
			Some(path) => load_results(path, env.format)?,
			None => {
				return Err(Error::NoFilesFound {
					label: env.label.clone(),
					dir: env.dir.clone(),
				})
			}
		};
		let previous = match files.get(1) {
			Some(path) => match load_results(path, env.format) {
				Ok(set) => Some(set),
				Err(err) => {
					warn!(label = %env.label, error = %err, "ignoring previous results");
					None
				}
			},
			None => {
				debug!(label = %env.label, "no previous results");
				None
			}
		};
		Ok(EnvironmentRun::new(env.label.clone(), current, previous))
	}
}

/// Sorted, distinct test numbers present in either set.
pub fn align_test_numbers(lhs: &[TestRecord], rhs: &[TestRecord]) -> Vec<i64> {
	lhs.iter()
		.chain(rhs)
		.map(|r| r.test_number)
		.sorted()
		.dedup()
		.collect()
}

/// Lookup by test number. A repeated number keeps the last record.
pub fn index_by_test_number(records: &[TestRecord]) -> BTreeMap<i64, &TestRecord> {
	records.iter().map(|r| (r.test_number, r)).collect()
}

/// Change of one test's duration against the previous run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
	/// `percent` is absent when the previous duration is too small to divide by.
	Change { absolute: f64, percent: Option<f64> },
	/// The previous run exists but did not contain this test.
	New,
}

pub fn compute_delta(current: f64, previous: f64) -> Delta {
	let absolute = current - previous;
	let percent = if previous != 0. {
		Some(absolute / previous * 100.).filter(|percent| percent.is_finite())
	} else {
		None
	};
	Delta::Change { absolute, percent }
}

/// How many times longer the baseline took than the contender. Undefined
/// when the contender took no time.
pub fn compute_speedup(baseline: f64, contender: f64) -> Option<f64> {
	if contender == 0. {
		return None;
	}
	Some(baseline / contender).filter(|ratio| ratio.is_finite())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
	pub test_number: i64,
	pub description: String,
	pub contender: Option<f64>,
	pub contender_delta: Option<Delta>,
	pub baseline: Option<f64>,
	pub baseline_delta: Option<Delta>,
	pub speedup: Option<f64>,
}

/// Totals over the tests present in both current runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
	pub contender_total: f64,
	pub baseline_total: f64,
	pub tests_compared: usize,
}

impl Summary {
	pub fn speedup(&self) -> Option<f64> {
		compute_speedup(self.baseline_total, self.contender_total)
	}

	/// How much less time the contender took, as a share of the baseline.
	pub fn percent_faster(&self) -> Option<f64> {
		if self.baseline_total == 0. {
			return None;
		}
		Some((self.baseline_total - self.contender_total) / self.baseline_total * 100.)
			.filter(|percent| percent.is_finite())
	}
}

fn delta_for(
	current: Option<&TestRecord>,
	previous: Option<&BTreeMap<i64, &TestRecord>>,
	test_number: i64,
) -> Option<Delta> {
	let current = current?;
	let previous = previous?;
	Some(match previous.get(&test_number) {
		Some(prev) => compute_delta(current.duration_seconds, prev.duration_seconds),
		None => Delta::New,
	})
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
	contender: EnvironmentRun,
	baseline: EnvironmentRun,
}

impl Comparison {
	pub fn new(contender: EnvironmentRun, baseline: EnvironmentRun) -> Self {
		Comparison { contender, baseline }
	}

	pub fn load(config: &Config) -> Result<Self> {
		let contender = EnvironmentRun::load(config.contender())?;
		let baseline = EnvironmentRun::load(config.baseline())?;
		Ok(Comparison::new(contender, baseline))
	}

	pub fn contender(&self) -> &EnvironmentRun {
		&self.contender
	}

	pub fn baseline(&self) -> &EnvironmentRun {
		&self.baseline
	}

	/// Whether either environment has a previous run. Decides the delta
	/// columns for the whole table.
	pub fn has_history(&self) -> bool {
		self.contender.previous.is_some() || self.baseline.previous.is_some()
	}

	pub fn rows(&self) -> Vec<ComparisonRow> {
		let contender = index_by_test_number(&self.contender.current.records);
		let baseline = index_by_test_number(&self.baseline.current.records);
		let prev_contender = self.contender.previous.as_ref().map(|s| index_by_test_number(&s.records));
		let prev_baseline = self.baseline.previous.as_ref().map(|s| index_by_test_number(&s.records));

		align_test_numbers(&self.contender.current.records, &self.baseline.current.records)
			.into_iter()
			.filter_map(|test_number| {
				let c = contender.get(&test_number).copied();
				let b = baseline.get(&test_number).copied();
				let description = c.or(b)?.description.clone();
				let speedup = match (c, b) {
					(Some(c), Some(b)) => compute_speedup(b.duration_seconds, c.duration_seconds),
					_ => None,
				};
				Some(ComparisonRow {
					test_number,
					description,
					contender: c.map(|r| r.duration_seconds),
					contender_delta: delta_for(c, prev_contender.as_ref(), test_number),
					baseline: b.map(|r| r.duration_seconds),
					baseline_delta: delta_for(b, prev_baseline.as_ref(), test_number),
					speedup,
				})
			})
			.collect()
	}

	/// `None` when the two current runs share no tests.
	pub fn summary(&self) -> Option<Summary> {
		let contender = index_by_test_number(&self.contender.current.records);
		let baseline = index_by_test_number(&self.baseline.current.records);
		let mut summary = Summary {
			contender_total: 0.,
			baseline_total: 0.,
			tests_compared: 0,
		};
		for (test_number, c) in &contender {
			if let Some(b) = baseline.get(test_number) {
				summary.contender_total += c.duration_seconds;
				summary.baseline_total += b.duration_seconds;
				summary.tests_compared += 1;
			}
		}
		if summary.tests_compared == 0 {
			None
		} else {
			Some(summary)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::benchmark::Metadata;

	fn set(records: Vec<TestRecord>) -> ResultSet {
		ResultSet::new(records, Metadata::default())
	}

	fn comparison(
		contender: Vec<TestRecord>,
		prev_contender: Option<Vec<TestRecord>>,
		baseline: Vec<TestRecord>,
		prev_baseline: Option<Vec<TestRecord>>,
	) -> Comparison {
		Comparison::new(
			EnvironmentRun::new("Node", set(contender), prev_contender.map(set)),
			EnvironmentRun::new("Web", set(baseline), prev_baseline.map(set)),
		)
	}

	#[test]
	fn align_is_sorted_union() {
		let lhs = vec![TestRecord::new(3, "c", 1.), TestRecord::new(1, "a", 1.), TestRecord::new(3, "c", 2.)];
		let rhs = vec![TestRecord::new(2, "b", 1.), TestRecord::new(1, "a", 1.), TestRecord::new(10, "j", 1.)];
		assert_eq!(align_test_numbers(&lhs, &rhs), vec![1, 2, 3, 10]);
		assert!(align_test_numbers(&[], &[]).is_empty());
	}

	#[test]
	fn index_keeps_last_duplicate() {
		let records = vec![TestRecord::new(1, "first", 1.), TestRecord::new(1, "second", 2.)];
		let index = index_by_test_number(&records);
		assert_eq!(index.len(), 1);
		assert_eq!(index[&1].description, "second");
	}

	#[test]
	fn delta_sign_and_percent() {
		assert_eq!(compute_delta(0.8, 1.0), Delta::Change {
			absolute: 0.8 - 1.0,
			percent: Some((0.8 - 1.0) / 1.0 * 100.),
		});
		match compute_delta(1.5, 1.0) {
			Delta::Change { absolute, percent } => {
				assert!(absolute > 0.);
				assert!((percent.unwrap() - 50.).abs() < 1e-9);
			}
			Delta::New => panic!("expected change"),
		}
		assert_eq!(compute_delta(0.1, 0.), Delta::Change { absolute: 0.1, percent: None });
	}

	#[test]
	fn subnormal_previous_has_no_percent() {
		assert_eq!(compute_delta(1.0, 1e-310), Delta::Change {
			absolute: 1.0 - 1e-310,
			percent: None,
		});
		let summary = Summary {
			contender_total: 1.0,
			baseline_total: 1e-310,
			tests_compared: 1,
		};
		assert_eq!(summary.percent_faster(), None);
		assert_eq!(summary.speedup(), Some(1e-310));
	}

	#[test]
	fn speedup_guards_zero() {
		assert_eq!(compute_speedup(1.0, 0.5), Some(2.0));
		assert_eq!(compute_speedup(0.3, 0.7), Some(0.3 / 0.7));
		assert_eq!(compute_speedup(1.0, 0.), None);
		assert_eq!(compute_speedup(0., 0.), None);
		assert_eq!(compute_speedup(0., 1.0), Some(0.));
	}

	#[test]
	fn single_common_test() {
		let cmp = comparison(
			vec![TestRecord::new(1, "Test 1: add", 0.5)],
			None,
			vec![TestRecord::new(1, "Test 1: add", 1.0)],
			None,
		);
		assert!(!cmp.has_history());
		assert_eq!(cmp.rows(), vec![ComparisonRow {
			test_number: 1,
			description: "Test 1: add".to_string(),
			contender: Some(0.5),
			contender_delta: None,
			baseline: Some(1.0),
			baseline_delta: None,
			speedup: Some(2.0),
		}]);
		let summary = cmp.summary().unwrap();
		assert_eq!(summary.tests_compared, 1);
		assert_eq!(summary.speedup(), Some(2.0));
		assert_eq!(summary.percent_faster(), Some(50.));
	}

	#[test]
	fn baseline_only_test_is_a_row_but_not_summarised() {
		let cmp = comparison(
			vec![TestRecord::new(1, "Test 1: add", 0.5)],
			None,
			vec![TestRecord::new(1, "Test 1: add", 1.0), TestRecord::new(2, "Test 2: web only", 3.0)],
			None,
		);
		let rows = cmp.rows();
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[1].test_number, 2);
		assert_eq!(rows[1].description, "Test 2: web only");
		assert_eq!(rows[1].contender, None);
		assert_eq!(rows[1].baseline, Some(3.0));
		assert_eq!(rows[1].speedup, None);
		let summary = cmp.summary().unwrap();
		assert_eq!(summary.tests_compared, 1);
		assert_eq!(summary.baseline_total, 1.0);
	}

	#[test]
	fn deltas_against_history() {
		let cmp = comparison(
			vec![TestRecord::new(1, "a", 0.8), TestRecord::new(5, "e", 2.0)],
			Some(vec![TestRecord::new(1, "a", 1.0)]),
			vec![TestRecord::new(1, "a", 1.0)],
			None,
		);
		assert!(cmp.has_history());
		let rows = cmp.rows();
		assert_eq!(rows[0].contender_delta, Some(compute_delta(0.8, 1.0)));
		assert_eq!(rows[1].contender_delta, Some(Delta::New));
		assert_eq!(rows[0].baseline_delta, None);
		assert_eq!(rows[1].baseline_delta, None);
	}

	#[test]
	fn disjoint_runs_have_no_summary() {
		let cmp = comparison(
			vec![TestRecord::new(1, "a", 1.0)],
			None,
			vec![TestRecord::new(2, "b", 1.0)],
			None,
		);
		assert_eq!(cmp.rows().len(), 2);
		assert_eq!(cmp.summary(), None);
	}

	#[test]
	fn zero_totals_are_undefined() {
		let summary = Summary {
			contender_total: 0.,
			baseline_total: 0.,
			tests_compared: 1,
		};
		assert_eq!(summary.speedup(), None);
		assert_eq!(summary.percent_faster(), None);
	}

	#[test]
	fn duplicates_counted_once() {
		let cmp = comparison(
			vec![TestRecord::new(1, "a", 1.0), TestRecord::new(1, "a", 2.0)],
			None,
			vec![TestRecord::new(1, "a", 4.0)],
			None,
		);
		assert_eq!(cmp.rows().len(), 1);
		assert_eq!(cmp.rows()[0].contender, Some(2.0));
		let summary = cmp.summary().unwrap();
		assert_eq!(summary.contender_total, 2.0);
		assert_eq!(summary.tests_compared, 1);
	}
}
