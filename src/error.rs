use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("cannot read results directory {}: {source}", .dir.display())]
	DirectoryRead {
		dir: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("no {label} benchmark results found in {}", .dir.display())]
	NoFilesFound { label: String, dir: PathBuf },
	#[error("result file {} does not exist", .path.display())]
	NotFound { path: PathBuf },
	#[error("cannot read {}: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("cannot parse {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("cannot parse {}: expected {expected} at top level", .path.display())]
	UnexpectedShape { path: PathBuf, expected: &'static str },
	#[error("invalid record for test {test_number} in {}: {reason}", .path.display())]
	InvalidRecord {
		path: PathBuf,
		test_number: i64,
		reason: String,
	},
	#[error("cannot read config {}: {source}", .path.display())]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("invalid config {}: {source}", .path.display())]
	Config {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
	#[error("invalid file pattern {pattern:?}: {source}")]
	Pattern {
		pattern: String,
		#[source]
		source: glob::PatternError,
	},
	#[error("cannot write {}: {source}", .path.display())]
	OutputWrite {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl Error {
	/// True for malformed or mis-shaped result files.
	pub fn is_parse(&self) -> bool {
		matches!(
			self,
			Error::Parse { .. } | Error::UnexpectedShape { .. } | Error::InvalidRecord { .. }
		)
	}
}
