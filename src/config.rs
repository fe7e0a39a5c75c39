//! Build configuration.
//!
//! [`BuildOptions`] is the resolved form every build operation consumes.
//! [`load_build_config`] produces it from a TOML file:
//!
//! ```toml
//! build_dir = "build_keycloak"
//! group_id = "com.example"
//! artifact_id = "my-theme"
//! theme_version = "1.2.3"
//! theme_names = ["my-theme"]
//! implements_account_theme = true
//! keycloak_version_targets = ["21-and-below", "25-and-above"]
//!
//! [packager]
//! timeout_secs = 900
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::jar::KeycloakVersionRange;
use crate::packager::PackagerConfig;

/// Directory name under the platform cache directory.
pub const CACHE_DIR_NAME: &str = "keycloak-theme-builder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Canonical build directory: the Maven project root holding every
    /// theme, and where finished jars are placed.
    pub build_dir: PathBuf,
    /// Parent of the per-variant staging directories.
    pub cache_dir: PathBuf,
    pub group_id: String,
    pub artifact_id: String,
    pub theme_version: String,
    pub theme_names: Vec<String>,
    pub implements_account_theme: bool,
    /// Only build these ranges when set.
    pub keycloak_version_targets: Option<Vec<KeycloakVersionRange>>,
    pub packager: PackagerConfig,
    pub keep_staging_on_failure: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildConfigToml {
    build_dir: PathBuf,
    cache_dir: Option<PathBuf>,
    group_id: String,
    artifact_id: String,
    theme_version: String,
    theme_names: Vec<String>,
    #[serde(default)]
    implements_account_theme: bool,
    keycloak_version_targets: Option<Vec<KeycloakVersionRange>>,
    #[serde(default)]
    packager: PackagerConfig,
    #[serde(default)]
    keep_staging_on_failure: bool,
}

/// Read and validate a build config.
///
/// Relative `build_dir`/`cache_dir` are resolved against the directory that
/// holds the config file.
pub fn load_build_config(config_path: &Path) -> Result<BuildOptions> {
    let raw = fs::read_to_string(config_path)
        .with_context(|| format!("reading build config '{}'", config_path.display()))?;
    let parsed: BuildConfigToml = toml::from_str(&raw)
        .with_context(|| format!("parsing build config '{}'", config_path.display()))?;

    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let cache_dir = match parsed.cache_dir {
        Some(dir) => base.join(dir),
        None => default_cache_dir()?,
    };

    let options = BuildOptions {
        build_dir: base.join(parsed.build_dir),
        cache_dir,
        group_id: parsed.group_id,
        artifact_id: parsed.artifact_id,
        theme_version: parsed.theme_version,
        theme_names: parsed.theme_names,
        implements_account_theme: parsed.implements_account_theme,
        keycloak_version_targets: parsed.keycloak_version_targets,
        packager: parsed.packager,
        keep_staging_on_failure: parsed.keep_staging_on_failure,
    };

    validate(&options)
        .with_context(|| format!("invalid build config '{}'", config_path.display()))?;
    Ok(options)
}

/// `<platform cache dir>/keycloak-theme-builder`
pub fn default_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_DIR_NAME))
        .context("no platform cache directory; set cache_dir explicitly")
}

pub fn validate(options: &BuildOptions) -> Result<()> {
    for (field, value) in [
        ("group_id", &options.group_id),
        ("artifact_id", &options.artifact_id),
        ("theme_version", &options.theme_version),
        ("packager.program", &options.packager.program),
    ] {
        if value.trim().is_empty() {
            bail!("{field} must not be empty");
        }
    }

    if options.theme_names.is_empty() {
        bail!("theme_names must list at least one theme");
    }
    for name in &options.theme_names {
        validate_theme_name(name)?;
    }

    if options.packager.timeout_secs == Some(0) {
        bail!("packager.timeout_secs must be greater than zero");
    }
    Ok(())
}

fn validate_theme_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("theme name '{name}' must be a single path component"),
    }
}
