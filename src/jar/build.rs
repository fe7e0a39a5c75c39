//! Per-variant jar builds.
//!
//! Each variant runs through a fixed sequence:
//!
//! 1. lock `<cache_dir>/<staging name>.lock`
//! 2. remove any stale staging directory
//! 3. stage the build directory through the variant's [`RuleChain`]
//! 4. write route-alias pages (account-v1 absent or 0.3 only)
//! 5. write `pom.xml`
//! 6. run the packager in the staging directory
//! 7. move the artifact to `<build_dir>/<jar basename>`
//! 8. remove the staging directory
//!
//! The staging directory is removed on failure too, unless
//! `keep_staging_on_failure` is set.

use anyhow::{anyhow, Context, Result};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, error, info, warn};

use crate::config::BuildOptions;
use crate::error::BuildError;
use crate::filesystem::{move_file, remove_dir_if_exists};
use crate::jar::pom::generate_pom;
use crate::jar::variant::{plan_variants, JarVariant};
use crate::packager::{ensure_available, run_packager};
use crate::theme::routes::write_legacy_route_aliases;
use crate::theme::rules::{LegacyAccountCompatRule, MembershipRule};
use crate::transform::{transform_tree, RuleChain};

/// A finished jar in the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltJar {
    pub variant: JarVariant,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Rules that stage the build directory for `variant`.
pub fn staging_rules(theme_names: &[String], variant: &JarVariant) -> RuleChain {
    let mut chain = RuleChain::new().with(MembershipRule::new(theme_names));
    if variant.uses_builtin_account_v1() {
        chain.push(LegacyAccountCompatRule::new(theme_names));
    }
    chain
}

/// Build every planned variant concurrently.
///
/// All builds run to completion. Each failure is logged with its variant;
/// the first one (in plan order) is returned.
pub fn build_jars(options: &BuildOptions) -> Result<Vec<BuiltJar>> {
    let variants = plan_variants(
        options.implements_account_theme,
        options.keycloak_version_targets.as_deref(),
    );
    if variants.is_empty() {
        warn!("no jar variant matches keycloak_version_targets, nothing to build");
        return Ok(Vec::new());
    }

    let packager = ensure_available(&options.packager.program)?;
    info!(
        packager = %packager.display(),
        jars = variants.len(),
        "building theme jars"
    );

    let results: Vec<(JarVariant, Result<BuiltJar>)> = thread::scope(|scope| {
        let handles: Vec<_> = variants
            .iter()
            .map(|variant| (*variant, scope.spawn(move || build_jar(options, variant))))
            .collect();

        handles
            .into_iter()
            .map(|(variant, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("build of {variant} panicked")));
                (variant, result)
            })
            .collect()
    });

    let mut built = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (variant, result) in results {
        match result {
            Ok(jar) => built.push(jar),
            Err(err) => {
                error!(jar = %variant, error = %format!("{err:#}"), "jar build failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(built),
    }
}

/// Build one variant into `<build_dir>/<jar basename>`.
pub fn build_jar(options: &BuildOptions, variant: &JarVariant) -> Result<BuiltJar> {
    let staging_name = variant.staging_dir_name();
    fs::create_dir_all(&options.cache_dir).with_context(|| {
        format!(
            "creating cache directory '{}'",
            options.cache_dir.display()
        )
    })?;
    let _lock = StagingLock::acquire(&options.cache_dir, &staging_name)?;

    let staging = StagingDir::fresh(
        options.cache_dir.join(&staging_name),
        options.keep_staging_on_failure,
    )?;
    info!(jar = %variant, staging = %staging.path().display(), "staging jar");

    let chain = staging_rules(&options.theme_names, variant);
    let stats = transform_tree(&options.build_dir, staging.path(), &chain)
        .with_context(|| format!("staging {variant}"))?;
    debug!(
        jar = %variant,
        written = stats.written,
        excluded = stats.excluded,
        "staged"
    );

    if variant.needs_legacy_route_aliases() {
        write_legacy_route_aliases(staging.path(), &options.theme_names)
            .with_context(|| format!("writing route aliases for {variant}"))?;
    }

    let pom_path = staging.path().join("pom.xml");
    fs::write(&pom_path, generate_pom(options, variant))
        .with_context(|| format!("writing '{}'", pom_path.display()))?;

    run_packager(&options.packager, staging.path(), &variant.identity())?;

    let produced = options.packager.artifact_path(
        staging.path(),
        &options.artifact_id,
        &options.theme_version,
    );
    if !produced.is_file() {
        return Err(BuildError::MissingArtifact { path: produced }.into());
    }

    let jar_path = options.build_dir.join(variant.jar_basename());
    move_file(&produced, &jar_path)?;
    staging.finish()?;

    let (sha256, size_bytes) = sha256_file(&jar_path)?;
    info!(jar = %jar_path.display(), sha256 = %sha256, size_bytes, "jar built");

    Ok(BuiltJar {
        variant: *variant,
        path: jar_path,
        sha256,
        size_bytes,
    })
}

/// Exclusive advisory lock on `<cache_dir>/<name>.lock`, held until drop.
///
/// The lock file is left in place: unlinking a file another process still
/// has locked lets a third process lock a fresh file at the same path.
struct StagingLock {
    _file: File,
}

impl StagingLock {
    fn acquire(cache_dir: &Path, name: &str) -> Result<Self> {
        let lock_path = cache_dir.join(format!("{name}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("creating lock file '{}'", lock_path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Err(anyhow!(
                "staging directory is locked by another build: {}",
                lock_path.display()
            ));
        }
        Ok(Self { _file: file })
    }
}

/// Owns a variant's staging directory for the duration of its build.
struct StagingDir {
    path: PathBuf,
    keep_on_failure: bool,
    finished: bool,
}

impl StagingDir {
    /// Remove whatever a previous run left at `path` and take ownership.
    fn fresh(path: PathBuf, keep_on_failure: bool) -> Result<Self> {
        remove_dir_if_exists(&path)?;
        Ok(Self {
            path,
            keep_on_failure,
            finished: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn finish(mut self) -> Result<()> {
        self.finished = true;
        remove_dir_if_exists(&self.path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.keep_on_failure {
            warn!(staging = %self.path.display(), "build failed, staging directory kept");
            return;
        }
        if let Err(err) = remove_dir_if_exists(&self.path) {
            warn!(
                staging = %self.path.display(),
                error = %format!("{err:#}"),
                "failed to remove staging directory"
            );
        }
    }
}

fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let file = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("reading '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), size))
}
