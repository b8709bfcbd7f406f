//! Seeding settings.
//!
//! ```toml
//! module_patterns = ["my_app::fixtures::*"]
//! mock_dynamic_fixtures = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SeedingError, SeedingResult};

/// Settings of a [`FixtureRoot`](crate::root::FixtureRoot).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingSettings {
	/// Glob patterns over `module_path!()` selecting registered declarations.
	pub module_patterns: Vec<String>,

	/// Install dynamic fixtures into an in-memory store instead of the
	/// root's store.
	pub mock_dynamic_fixtures: bool,
}

impl SeedingSettings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_toml_str(content: &str) -> SeedingResult<Self> {
		toml::from_str(content).map_err(|e| SeedingError::Settings(e.to_string()))
	}

	pub fn from_file(path: impl AsRef<Path>) -> SeedingResult<Self> {
		let content = std::fs::read_to_string(path.as_ref())?;
		Self::from_toml_str(&content)
	}

	pub fn with_module_patterns<I, S>(mut self, patterns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.module_patterns = patterns.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_mock_dynamic_fixtures(mut self, mock: bool) -> Self {
		self.mock_dynamic_fixtures = mock;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_defaults() {
		let settings = SeedingSettings::from_toml_str("").unwrap();

		assert!(settings.module_patterns.is_empty());
		assert!(!settings.mock_dynamic_fixtures);
	}

	#[rstest]
	fn test_parses_all_fields() {
		let settings = SeedingSettings::from_toml_str(
			r#"
module_patterns = ["shop::fixtures::*", "shop::factories"]
mock_dynamic_fixtures = true
"#,
		)
		.unwrap();

		assert_eq!(
			settings,
			SeedingSettings::new()
				.with_module_patterns(["shop::fixtures::*", "shop::factories"])
				.with_mock_dynamic_fixtures(true)
		);
	}

	#[rstest]
	fn test_invalid_toml() {
		let result = SeedingSettings::from_toml_str("module_patterns = 3");

		assert!(matches!(result, Err(SeedingError::Settings(_))));
	}

	#[rstest]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "module_patterns = [\"app::*\"]").unwrap();

		let settings = SeedingSettings::from_file(file.path()).unwrap();

		assert_eq!(settings.module_patterns, vec!["app::*"]);
	}

	#[rstest]
	fn test_missing_file() {
		let result = SeedingSettings::from_file("/nonexistent/seedbed.toml");

		assert!(matches!(result, Err(SeedingError::IoError(_))));
	}
}
