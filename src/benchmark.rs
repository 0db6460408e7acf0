extern crate glob;
extern crate serde;
extern crate serde_json;
use crate::error::{Error, Result};
use glob::Pattern;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// One test's timing as written by the benchmark runners.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TestRecord {
	#[serde(rename = "testNumber")]
	pub test_number: i64,
	#[serde(rename = "testDescription")]
	pub description: String,
	#[serde(rename = "duration")]
	pub duration_seconds: f64,
	#[serde(rename = "statementsExecuted", default)]
	pub statements_executed: u64,
}

impl TestRecord {
	pub fn new<S: Into<String>>(test_number: i64, description: S, duration_seconds: f64) -> Self {
		TestRecord {
			test_number,
			description: description.into(),
			duration_seconds,
			statements_executed: 0,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
	pub source_file: PathBuf,
	pub timestamp: Option<String>,
	pub engine: Option<String>,
	pub sdk_version: Option<String>,
}

impl Metadata {
	fn for_file(path: &Path) -> Self {
		Metadata {
			source_file: path.to_owned(),
			..Metadata::default()
		}
	}

	/// Base name of the file the results were loaded from.
	pub fn file_name(&self) -> String {
		match self.source_file.file_name() {
			Some(name) => name.to_string_lossy().into_owned(),
			None => self.source_file.display().to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
	pub records: Vec<TestRecord>,
	pub metadata: Metadata,
}

impl ResultSet {
	pub fn new(records: Vec<TestRecord>, metadata: Metadata) -> Self {
		ResultSet { records, metadata }
	}
}

/// Top-level shape of a result file.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
	/// An object carrying run metadata and a `results` array.
	Envelope,
	/// A bare array of records.
	Array,
	/// Decide from the top-level JSON value.
	Auto,
}

impl Default for ResultFormat {
	fn default() -> Self {
		ResultFormat::Auto
	}
}

#[derive(Deserialize)]
struct Envelope {
	timestamp: Option<String>,
	engine: Option<String>,
	#[serde(rename = "sdkVersion")]
	sdk_version: Option<String>,
	results: Vec<TestRecord>,
}

fn parse_error(path: &Path) -> impl FnOnce(serde_json::Error) -> Error + '_ {
	move |source| Error::Parse {
		path: path.to_owned(),
		source,
	}
}

fn read_json(path: &Path) -> Result<Value> {
	let bytes = fs::read(path).map_err(|source| match source.kind() {
		ErrorKind::NotFound => Error::NotFound {
			path: path.to_owned(),
		},
		_ => Error::Read {
			path: path.to_owned(),
			source,
		},
	})?;
	serde_json::from_slice(&bytes).map_err(parse_error(path))
}

fn validate(path: &Path, records: &[TestRecord]) -> Result<()> {
	match records.iter().find(|r| r.duration_seconds < 0.) {
		Some(r) => Err(Error::InvalidRecord {
			path: path.to_owned(),
			test_number: r.test_number,
			reason: format!("negative duration {}", r.duration_seconds),
		}),
		None => Ok(()),
	}
}

fn decode(path: &Path, value: Value, format: ResultFormat) -> Result<ResultSet> {
	let format = match (format, &value) {
		(ResultFormat::Auto, Value::Object(_)) => ResultFormat::Envelope,
		(ResultFormat::Auto, Value::Array(_)) => ResultFormat::Array,
		(ResultFormat::Auto, _) => {
			return Err(Error::UnexpectedShape {
				path: path.to_owned(),
				expected: "an object or an array",
			})
		}
		(format, _) => format,
	};
	let set = match format {
		ResultFormat::Envelope => {
			if !value.is_object() {
				return Err(Error::UnexpectedShape {
					path: path.to_owned(),
					expected: "an object",
				});
			}
			let envelope: Envelope = serde_json::from_value(value).map_err(parse_error(path))?;
			let metadata = Metadata {
				source_file: path.to_owned(),
				timestamp: envelope.timestamp,
				engine: envelope.engine,
				sdk_version: envelope.sdk_version,
			};
			ResultSet::new(envelope.results, metadata)
		}
		ResultFormat::Array | ResultFormat::Auto => {
			if !value.is_array() {
				return Err(Error::UnexpectedShape {
					path: path.to_owned(),
					expected: "an array",
				});
			}
			let records = serde_json::from_value(value).map_err(parse_error(path))?;
			ResultSet::new(records, Metadata::for_file(path))
		}
	};
	validate(path, &set.records)?;
	Ok(set)
}

/// Reads and decodes one result file.
pub fn load_results<P: AsRef<Path>>(path: P, format: ResultFormat) -> Result<ResultSet> {
	let path = path.as_ref();
	let value = read_json(path)?;
	let set = decode(path, value, format)?;
	debug!(path = %path.display(), records = set.records.len(), "loaded results");
	Ok(set)
}

pub fn load_envelope_format<P: AsRef<Path>>(path: P) -> Result<ResultSet> {
	load_results(path, ResultFormat::Envelope)
}

pub fn load_array_format<P: AsRef<Path>>(path: P) -> Result<ResultSet> {
	load_results(path, ResultFormat::Array)
}

/// Returns at most `count` files in `dir` whose names match `pattern`,
/// most recently modified first. Ties are ordered by path.
pub fn list_recent_files<P: AsRef<Path>>(dir: P, pattern: &Pattern, count: usize) -> Result<Vec<PathBuf>> {
	let dir = dir.as_ref();
	let dir_error = |source: std::io::Error| Error::DirectoryRead {
		dir: dir.to_owned(),
		source,
	};
	let mut files = Vec::new();
	for entry in fs::read_dir(dir).map_err(dir_error)? {
		let entry = entry.map_err(dir_error)?;
		let name = entry.file_name();
		if !pattern.matches(&name.to_string_lossy()) {
			continue;
		}
		let path = entry.path();
		let modified = match fs::metadata(&path).and_then(|m| {
			if m.is_file() {
				m.modified().map(Some)
			} else {
				Ok(None)
			}
		}) {
			Ok(Some(modified)) => modified,
			Ok(None) => continue,
			Err(err) => {
				debug!(path = %path.display(), error = %err, "skipping unreadable entry");
				continue;
			}
		};
		files.push((modified, path));
	}
	let recent: Vec<PathBuf> = files
		.into_iter()
		.sorted_by(|(lhs_time, lhs), (rhs_time, rhs)| rhs_time.cmp(lhs_time).then_with(|| lhs.cmp(rhs)))
		.take(count)
		.map(|(_, path): (SystemTime, PathBuf)| path)
		.collect();
	debug!(dir = %dir.display(), files = ?recent, "selected recent result files");
	Ok(recent)
}
