use crate::benchmark::Metadata;
use crate::compare::{Comparison, ComparisonRow, Delta, EnvironmentRun, Summary};

/// Placeholder for a value one side does not have.
pub const MISSING: &str = "-";

pub fn format_duration(seconds: f64) -> String {
	format!("{:.3}", seconds)
}

pub fn format_percent(percent: f64) -> String {
	format!("{:.1}%", percent)
}

// Equal durations subtract to +0.0, but keep -0.0 from printing as "+-0.000".
fn format_signed(value: f64, precision: usize) -> String {
	let value = if value == 0. { 0. } else { value };
	if value >= 0. {
		format!("+{:.*}", precision, value)
	} else {
		format!("{:.*}", precision, value)
	}
}

/// `+0.123 (+12.3%)`, `-0.200 (-20.0%)`, `NEW`, or empty when there is
/// nothing to compare against.
pub fn format_delta(delta: Option<Delta>) -> String {
	match delta {
		None => String::new(),
		Some(Delta::New) => "NEW".to_string(),
		Some(Delta::Change { absolute, percent: None }) => format_signed(absolute, 3),
		Some(Delta::Change {
			absolute,
			percent: Some(percent),
		}) => format!("{} ({}%)", format_signed(absolute, 3), format_signed(percent, 1)),
	}
}

pub fn format_speedup(ratio: Option<f64>) -> String {
	match ratio {
		Some(ratio) => format!("{:.2}x", ratio),
		None => MISSING.to_string(),
	}
}

fn format_optional_duration(seconds: Option<f64>) -> String {
	seconds.map(format_duration).unwrap_or_else(|| MISSING.to_string())
}

/// Removes every leading `Test <n>: ` from a description.
pub fn strip_test_prefix(description: &str, test_number: i64) -> &str {
	let prefix = format!("Test {}: ", test_number);
	let mut description = description;
	while let Some(rest) = description.strip_prefix(prefix.as_str()) {
		description = rest;
	}
	description
}

// A cell must stay on one line and must not open a new column.
fn escape_cell(value: &str) -> String {
	value
		.replace("\r\n", " ")
		.replace(|c: char| c == '\r' || c == '\n', " ")
		.replace('|', "\\|")
}

pub(crate) struct Column {
	title: String,
	left_pad: bool,
}

impl Column {
	pub fn text<S: Into<String>>(title: S) -> Self {
		Column {
			title: title.into(),
			left_pad: false,
		}
	}

	pub fn numeric<S: Into<String>>(title: S) -> Self {
		Column {
			title: title.into(),
			left_pad: true,
		}
	}
}

/// A markdown table whose columns are padded to a common width.
pub(crate) struct Table {
	columns: Vec<Column>,
	rows: Vec<Vec<String>>,
}

fn width(value: &str) -> usize {
	value.chars().count()
}

fn add_value(last: bool, left_pad: bool, max_len: usize, value: &str, line: &mut String) {
	let padding = max_len.saturating_sub(width(value));
	if left_pad {
		line.extend(std::iter::repeat(' ').take(padding));
	}
	line.push_str(value);
	if !left_pad {
		line.extend(std::iter::repeat(' ').take(padding));
	}
	if !last {
		line.push_str(" | ");
	}
}

fn add_sub_header_value(last: bool, len: usize, line: &mut String) {
	line.extend(std::iter::repeat('-').take(len));
	if !last {
		line.push_str("-|-");
	}
}

impl Table {
	pub fn new(columns: Vec<Column>) -> Self {
		Table {
			columns,
			rows: Vec::new(),
		}
	}

	pub fn push_row(&mut self, row: Vec<String>) {
		debug_assert_eq!(row.len(), self.columns.len());
		self.rows.push(row);
	}

	pub fn render(&self, out: &mut String) {
		let mut lines = vec![String::new(); self.rows.len() + 2];
		for (i, line) in lines.iter_mut().enumerate() {
			line.push_str(if i == 1 { "|-" } else { "| " });
		}
		for (i, column) in self.columns.iter().enumerate() {
			let last = i == self.columns.len() - 1;
			let max_len = self
				.rows
				.iter()
				.map(|row| width(&row[i]))
				.chain(std::iter::once(width(&column.title)))
				.max()
				.unwrap_or(0);
			add_value(last, column.left_pad, max_len, &column.title, &mut lines[0]);
			add_sub_header_value(last, max_len, &mut lines[1]);
			for (row, line) in self.rows.iter().zip(lines.iter_mut().skip(2)) {
				add_value(last, column.left_pad, max_len, &row[i], line);
			}
		}
		for (i, line) in lines.iter_mut().enumerate() {
			line.push_str(if i == 1 { "-|" } else { " |" });
			out.push_str(line);
			out.push('\n');
		}
	}
}

fn render_metadata(run: &EnvironmentRun, out: &mut String) {
	let Metadata {
		timestamp,
		engine,
		sdk_version,
		..
	} = &run.current.metadata;
	out.push_str(&format!("**{} Benchmark:**\n", run.label));
	out.push_str(&format!("- File: `{}`\n", run.current.metadata.file_name()));
	if let Some(timestamp) = timestamp {
		out.push_str(&format!("- Timestamp: {}\n", timestamp));
	}
	if let Some(engine) = engine {
		out.push_str(&format!("- Engine: {}\n", engine));
	}
	if let Some(sdk_version) = sdk_version {
		out.push_str(&format!("- SDK Version: {}\n", sdk_version));
	}
	if let Some(previous) = &run.previous {
		out.push_str(&format!("- Previous File: `{}`\n", previous.metadata.file_name()));
	}
	out.push('\n');
}

fn results_table(comparison: &Comparison, rows: &[ComparisonRow]) -> Table {
	let history = comparison.has_history();
	let contender = &comparison.contender().label;
	let baseline = &comparison.baseline().label;

	let mut columns = vec![
		Column::numeric("Test"),
		Column::text("Description"),
		Column::numeric(format!("{} (sec)", contender)),
	];
	if history {
		columns.push(Column::numeric(format!("{} Δ", contender)));
	}
	columns.push(Column::numeric(format!("{} (sec)", baseline)));
	if history {
		columns.push(Column::numeric(format!("{} Δ", baseline)));
	}
	columns.push(Column::numeric("Speedup"));

	let mut table = Table::new(columns);
	for row in rows {
		let mut cells = vec![
			row.test_number.to_string(),
			escape_cell(strip_test_prefix(&row.description, row.test_number)),
			format_optional_duration(row.contender),
		];
		if history {
			cells.push(format_delta(row.contender_delta));
		}
		cells.push(format_optional_duration(row.baseline));
		if history {
			cells.push(format_delta(row.baseline_delta));
		}
		cells.push(format_speedup(row.speedup));
		table.push_row(cells);
	}
	table
}

fn render_summary(comparison: &Comparison, summary: Option<Summary>, out: &mut String) {
	let contender = &comparison.contender().label;
	let baseline = &comparison.baseline().label;
	out.push_str("## Summary\n\n");
	let summary = match summary {
		Some(summary) => summary,
		None => {
			out.push_str("No tests in common.\n");
			return;
		}
	};
	out.push_str(&format!(
		"- **Total {} Time**: {} seconds\n",
		contender,
		format_duration(summary.contender_total)
	));
	out.push_str(&format!(
		"- **Total {} Time**: {} seconds\n",
		baseline,
		format_duration(summary.baseline_total)
	));
	let speedup = format_speedup(summary.speedup());
	match (summary.speedup(), summary.percent_faster()) {
		(Some(_), Some(percent)) => out.push_str(&format!(
			"- **Overall Speedup**: {} ({} is {} faster)\n",
			speedup,
			contender,
			format_percent(percent)
		)),
		_ => out.push_str(&format!("- **Overall Speedup**: {}\n", speedup)),
	}
	out.push_str(&format!("- **Tests Compared**: {}\n", summary.tests_compared));
}

/// Renders the full report: run metadata, the per-test table and totals.
pub fn render_markdown(title: &str, comparison: &Comparison) -> String {
	let mut out = String::new();
	out.push_str(&format!("# {}\n\n", title));

	out.push_str("## Benchmark Information\n\n");
	render_metadata(comparison.contender(), &mut out);
	render_metadata(comparison.baseline(), &mut out);

	out.push_str("## Results\n\n");
	let rows = comparison.rows();
	results_table(comparison, &rows).render(&mut out);
	out.push('\n');

	render_summary(comparison, comparison.summary(), &mut out);
	out
}
