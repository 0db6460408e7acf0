extern crate toml;
use crate::benchmark::ResultFormat;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BENCH_COMPARE_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "bench-compare.toml";

/// Where one environment's result files live and how they are shaped.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
	pub label: String,
	pub dir: PathBuf,
	pub format: ResultFormat,
	/// Glob matched against file names in `dir`.
	pub pattern: String,
}

fn default_pattern() -> String {
	"*.json".to_string()
}

impl EnvironmentConfig {
	pub fn new<S: Into<String>, P: Into<PathBuf>>(label: S, dir: P, format: ResultFormat) -> Self {
		EnvironmentConfig {
			label: label.into(),
			dir: dir.into(),
			format,
			pattern: default_pattern(),
		}
	}

	pub fn file_pattern(&self) -> Result<glob::Pattern> {
		glob::Pattern::new(&self.pattern).map_err(|source| Error::Pattern {
			pattern: self.pattern.clone(),
			source,
		})
	}

	fn default_contender() -> Self {
		EnvironmentConfig::new("Node", "apps/benchmark-node/results", ResultFormat::Envelope)
	}

	fn default_baseline() -> Self {
		EnvironmentConfig::new("Web", "apps/benchmark-web/results", ResultFormat::Array)
	}
}

// Partial tables so that a config file may override a single key.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvironmentOverrides {
	label: Option<String>,
	dir: Option<PathBuf>,
	format: Option<ResultFormat>,
	pattern: Option<String>,
}

impl EnvironmentOverrides {
	fn apply(self, mut env: EnvironmentConfig) -> EnvironmentConfig {
		if let Some(label) = self.label {
			env.label = label;
		}
		if let Some(dir) = self.dir {
			env.dir = dir;
		}
		if let Some(format) = self.format {
			env.format = format;
		}
		if let Some(pattern) = self.pattern {
			env.pattern = pattern;
		}
		env
	}
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
	title: Option<String>,
	#[serde(default)]
	contender: EnvironmentOverrides,
	#[serde(default)]
	baseline: EnvironmentOverrides,
}

/// The two environments being compared. The contender is the one whose
/// speedup is reported; the baseline is the one it is measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	title: Option<String>,
	contender: EnvironmentConfig,
	baseline: EnvironmentConfig,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			title: None,
			contender: EnvironmentConfig::default_contender(),
			baseline: EnvironmentConfig::default_baseline(),
		}
	}
}

impl Config {
	pub fn new(contender: EnvironmentConfig, baseline: EnvironmentConfig) -> Self {
		Config {
			title: None,
			contender,
			baseline,
		}
	}

	pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
		self.title = Some(title.into());
		self
	}

	pub fn from_toml(text: &str, path: &Path) -> Result<Self> {
		let file: ConfigFile = toml::from_str(text).map_err(|source| Error::Config {
			path: path.to_owned(),
			source,
		})?;
		let config = Config {
			title: file.title,
			contender: file.contender.apply(EnvironmentConfig::default_contender()),
			baseline: file.baseline.apply(EnvironmentConfig::default_baseline()),
		};
		config.contender.file_pattern()?;
		config.baseline.file_pattern()?;
		Ok(config)
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let text = read_to_string(path).map_err(|source| Error::ConfigRead {
			path: path.to_owned(),
			source,
		})?;
		Config::from_toml(&text, path)
	}

	/// Loads the config named by `BENCH_COMPARE_CONFIG`, else
	/// `bench-compare.toml` in the working directory, else the defaults.
	pub fn discover() -> Result<Self> {
		if let Some(path) = std::env::var_os(CONFIG_ENV) {
			debug!(path = ?path, "loading config from {}", CONFIG_ENV);
			return Config::load(path);
		}
		let local = Path::new(DEFAULT_CONFIG_FILE);
		if local.is_file() {
			debug!(path = %local.display(), "loading config");
			return Config::load(local);
		}
		debug!("no config file, using default result directories");
		Ok(Config::default())
	}

	pub fn title(&self) -> String {
		match &self.title {
			Some(title) => title.clone(),
			None => format!(
				"Benchmark Comparison: {} vs {}",
				self.contender.label, self.baseline.label
			),
		}
	}

	pub fn contender(&self) -> &EnvironmentConfig {
		&self.contender
	}

	pub fn baseline(&self) -> &EnvironmentConfig {
		&self.baseline
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_node_and_web_layout() {
		let config = Config::default();
		assert_eq!(config.title(), "Benchmark Comparison: Node vs Web");
		assert_eq!(config.contender().dir, PathBuf::from("apps/benchmark-node/results"));
		assert_eq!(config.contender().format, ResultFormat::Envelope);
		assert_eq!(config.baseline().dir, PathBuf::from("apps/benchmark-web/results"));
		assert_eq!(config.baseline().format, ResultFormat::Array);
		assert_eq!(config.baseline().pattern, "*.json");
	}

	#[test]
	fn partial_file_overrides_single_keys() {
		let text = r#"
			[baseline]
			dir = "out/web"
			format = "auto"
		"#;
		let config = Config::from_toml(text, Path::new("bench-compare.toml")).unwrap();
		assert_eq!(config.contender(), &EnvironmentConfig::default_contender());
		assert_eq!(config.baseline().label, "Web");
		assert_eq!(config.baseline().dir, PathBuf::from("out/web"));
		assert_eq!(config.baseline().format, ResultFormat::Auto);
	}

	#[test]
	fn title_override() {
		let config = Config::from_toml("title = \"Nightly\"", Path::new("c.toml")).unwrap();
		assert_eq!(config.title(), "Nightly");
	}

	#[test]
	fn rejects_unknown_keys_and_bad_patterns() {
		let err = Config::from_toml("[contender]\ndirectory = \"x\"", Path::new("c.toml")).unwrap_err();
		assert!(matches!(err, Error::Config { .. }));

		let err = Config::from_toml("[contender]\npattern = \"[\"", Path::new("c.toml")).unwrap_err();
		assert!(matches!(err, Error::Pattern { .. }));
	}

	#[test]
	fn missing_config_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
		assert!(matches!(err, Error::ConfigRead { .. }));
	}
}
