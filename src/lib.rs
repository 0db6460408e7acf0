pub mod benchmark;
pub mod compare;
pub mod config;
pub mod error;
pub mod print;

pub use error::{Error, Result};

use compare::Comparison;
use config::Config;
use std::fs::{self, Permissions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Loads both environments' results and renders the comparison report.
pub fn generate_report(config: &Config) -> Result<String> {
	let comparison = Comparison::load(config)?;
	Ok(print::render_markdown(&config.title(), &comparison))
}

// Temp files are created owner-only; reports keep the target's mode, or 0644.
#[cfg(unix)]
fn report_permissions(path: &Path) -> io::Result<Option<Permissions>> {
	use std::os::unix::fs::PermissionsExt;
	match fs::metadata(path) {
		Ok(meta) => Ok(Some(meta.permissions())),
		Err(err) if err.kind() == ErrorKind::NotFound => Ok(Some(Permissions::from_mode(0o644))),
		Err(err) => Err(err),
	}
}

#[cfg(not(unix))]
fn report_permissions(path: &Path) -> io::Result<Option<Permissions>> {
	match fs::metadata(path) {
		Ok(meta) => Ok(Some(meta.permissions())),
		Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
		Err(err) => Err(err),
	}
}

/// Replaces `path` with `report` in one rename, so a failed write never
/// leaves a truncated file behind.
pub fn write_report<P: AsRef<Path>>(path: P, report: &str) -> Result<()> {
	let path = path.as_ref();
	let write_error = |source: io::Error| Error::OutputWrite {
		path: path.to_owned(),
		source,
	};
	let dir = match path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir,
		_ => Path::new("."),
	};
	let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
	file.write_all(report.as_bytes()).map_err(write_error)?;
	if let Some(permissions) = report_permissions(path).map_err(write_error)? {
		file.as_file().set_permissions(permissions).map_err(write_error)?;
	}
	file.as_file().sync_all().map_err(write_error)?;
	file.persist(path).map_err(|err| write_error(err.error))?;
	Ok(())
}
