//! External packager invocation.
//!
//! The packager (Maven by default) runs as an opaque subprocess rooted at a
//! variant's staging directory, with a local repository cache inside that
//! directory so concurrent variants never share one.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};
use wait_timeout::ChildExt;

use crate::error::BuildError;

/// Lines of packager output kept in failure reports.
const OUTPUT_TAIL_LINES: usize = 40;

/// How the packager is invoked and where it leaves its artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// System property naming the local repository, passed as
    /// `-D<property>=<staging>/<cache_subdir>`.
    pub local_repository_property: String,
    pub cache_subdir: String,
    /// Directory under the staging root that receives the artifact.
    pub output_subdir: String,
    pub artifact_extension: String,
    pub timeout_secs: Option<u64>,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            program: "mvn".to_owned(),
            args: vec!["clean".to_owned(), "install".to_owned()],
            local_repository_property: "maven.repo.local".to_owned(),
            cache_subdir: ".m2".to_owned(),
            output_subdir: "target".to_owned(),
            artifact_extension: "jar".to_owned(),
            timeout_secs: None,
        }
    }
}

impl PackagerConfig {
    /// `<staging>/<output_subdir>/<artifact_id>-<version>.<ext>`
    pub fn artifact_path(&self, staging_dir: &Path, artifact_id: &str, version: &str) -> PathBuf {
        staging_dir.join(&self.output_subdir).join(format!(
            "{artifact_id}-{version}.{}",
            self.artifact_extension
        ))
    }

    fn local_repository_arg(&self, staging_dir: &Path) -> String {
        format!(
            "-D{}={}",
            self.local_repository_property,
            staging_dir.join(&self.cache_subdir).display()
        )
    }
}

/// Resolve `program` on `PATH`.
pub fn ensure_available(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| {
        BuildError::PackagerNotFound {
            program: program.to_owned(),
        }
        .into()
    })
}

/// Run the packager in `staging_dir` and wait for it.
///
/// `variant` is the identity reported when the run fails, whether the
/// packager exits non-zero, times out or cannot be started at all.
pub fn run_packager(config: &PackagerConfig, staging_dir: &Path, variant: &str) -> Result<()> {
    match spawn_and_wait(config, staging_dir, variant) {
        Ok(()) => Ok(()),
        // Exit and timeout failures carry the identity and are already logged.
        Err(err) if err.downcast_ref::<BuildError>().is_some() => Err(err),
        Err(err) => {
            error!(
                variant = %variant,
                program = %config.program,
                error = %format!("{err:#}"),
                "packager could not be run"
            );
            Err(err.context(format!("running packager for {variant}")))
        }
    }
}

fn spawn_and_wait(config: &PackagerConfig, staging_dir: &Path, variant: &str) -> Result<()> {
    let mut child = Command::new(&config.program)
        .args(&config.args)
        .arg(config.local_repository_arg(staging_dir))
        .current_dir(staging_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| {
            format!(
                "spawning packager '{}' in '{}'",
                config.program,
                staging_dir.display()
            )
        })?;

    debug!(
        program = %config.program,
        staging = %staging_dir.display(),
        "packager started"
    );

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match config.timeout_secs {
        Some(timeout_secs) => {
            let waited = child
                .wait_timeout(Duration::from_secs(timeout_secs))
                .context("waiting for packager")?;
            match waited {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    error!(variant = %variant, timeout_secs, "packager timed out");
                    return Err(BuildError::PackagerTimedOut {
                        variant: variant.to_owned(),
                        timeout_secs,
                    }
                    .into());
                }
            }
        }
        None => child.wait().context("waiting for packager")?,
    };

    let stdout = join_output(stdout);
    let stderr = join_output(stderr);

    if status.success() {
        return Ok(());
    }

    let output = tail_lines(&format!("{stdout}{stderr}"), OUTPUT_TAIL_LINES);
    error!(variant = %variant, status = ?status.code(), "packager failed");
    Err(BuildError::PackagerFailed {
        variant: variant.to_owned(),
        status: status.code().unwrap_or(-1),
        stderr: output,
    }
    .into())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_output(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
