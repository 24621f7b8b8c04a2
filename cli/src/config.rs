use std::path::Path;

use figment::{
	providers::{Env, Format, Toml},
	Figment,
};
use miette::{IntoDiagnostic, Result};
use multiwatch::config::Config;

/// Layered configuration: the TOML file, then `MULTIWATCH_*` environment
/// overrides (double underscores separate nesting levels).
///
/// A missing file is not an error by itself; a configuration without any
/// watchers is rejected downstream when the run starts.
pub fn load(path: &Path) -> Result<Config> {
	Figment::new()
		.merge(Toml::file(path))
		.merge(Env::prefixed("MULTIWATCH_").split("__"))
		.extract()
		.into_diagnostic()
}
