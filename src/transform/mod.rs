//! Tree transform engine.
//!
//! Mirrors every file of a source directory into a destination directory,
//! letting an ordered [`RuleChain`] decide per file whether it is kept,
//! rewritten or left out.
//!
//! # Chain semantics
//!
//! Rules run left to right. Each rule sees the bytes produced by the rules
//! before it.
//!
//! - [`Decision::Drop`] excludes the file; later rules are not consulted.
//! - [`Decision::Keep`] claims the file with its current bytes.
//! - [`Decision::Replace`] claims the file and threads new bytes onward.
//! - [`Decision::NoOpinion`] on a file nobody has claimed yet excludes it.
//!   After a claim it withdraws the claim; the file is excluded unless a
//!   later rule claims it again.
//!
//! A file survives only when it is claimed at the end of the chain, so an
//! empty chain, or one ending in NoOpinion, produces an empty destination.
//!
//! # Example
//!
//! ```rust,ignore
//! use keycloak_theme_builder::transform::{transform_tree, Decision, RuleChain};
//!
//! let chain = RuleChain::new().with(|path: &Path, _: &[u8]| -> Result<Decision> {
//!     Ok(if path.starts_with("src") { Decision::Keep } else { Decision::NoOpinion })
//! });
//! transform_tree(Path::new("build"), Path::new("staging"), &chain)?;
//! ```

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::filesystem::write_file_creating_parents;

/// What a single rule says about one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Replace(Vec<u8>),
    Drop,
    NoOpinion,
}

/// A pure per-file decision function.
///
/// `relative_path` is relative to the root being transformed and uses the
/// platform separator.
pub trait TransformRule {
    fn decide(&self, relative_path: &Path, content: &[u8]) -> Result<Decision>;
}

impl<F> TransformRule for F
where
    F: Fn(&Path, &[u8]) -> Result<Decision>,
{
    fn decide(&self, relative_path: &Path, content: &[u8]) -> Result<Decision> {
        self(relative_path, content)
    }
}

/// Ordered list of rules folded into a single per-file outcome.
#[derive(Default)]
pub struct RuleChain {
    rules: Vec<Box<dyn TransformRule + Send + Sync>>,
}

impl RuleChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule to the end of the chain.
    pub fn with(mut self, rule: impl TransformRule + Send + Sync + 'static) -> Self {
        self.push(rule);
        self
    }

    pub fn push(&mut self, rule: impl TransformRule + Send + Sync + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fold the chain over one file.
    ///
    /// Returns `None` when the file is excluded, otherwise the bytes to write.
    pub fn apply<'a>(
        &self,
        relative_path: &Path,
        content: &'a [u8],
    ) -> Result<Option<Cow<'a, [u8]>>> {
        let mut current = Cow::Borrowed(content);
        let mut claimed = false;

        for rule in &self.rules {
            match rule.decide(relative_path, &current)? {
                Decision::Drop => return Ok(None),
                Decision::NoOpinion if !claimed => return Ok(None),
                Decision::NoOpinion => claimed = false,
                Decision::Keep => claimed = true,
                Decision::Replace(bytes) => {
                    current = Cow::Owned(bytes);
                    claimed = true;
                }
            }
        }

        Ok(claimed.then_some(current))
    }
}

/// Counters reported by [`transform_tree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub written: usize,
    pub excluded: usize,
}

/// Mirror `src_dir` into `dest_dir` through `chain`.
///
/// Only regular files are visited; directories appear in the destination
/// when a file beneath them is written. The destination is expected to be
/// empty. Files are processed in sorted path order.
pub fn transform_tree(
    src_dir: &Path,
    dest_dir: &Path,
    chain: &RuleChain,
) -> Result<TransformStats> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating destination directory '{}'", dest_dir.display()))?;

    // Collect first: the destination may live below the source.
    let files = list_files(src_dir)?;
    let mut stats = TransformStats::default();

    for relative in files {
        let src_path = src_dir.join(&relative);
        let content =
            fs::read(&src_path).with_context(|| format!("reading '{}'", src_path.display()))?;

        let outcome = chain
            .apply(&relative, &content)
            .with_context(|| format!("applying transform rules to '{}'", relative.display()))?;

        match outcome {
            Some(bytes) => {
                write_file_creating_parents(&dest_dir.join(&relative), &bytes)?;
                stats.written += 1;
            }
            None => stats.excluded += 1,
        }
    }

    debug!(
        src = %src_dir.display(),
        dest = %dest_dir.display(),
        written = stats.written,
        excluded = stats.excluded,
        "tree transformed"
    );

    Ok(stats)
}

fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking '{}'", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("relativizing '{}'", entry.path().display()))?;
        files.push(relative.to_path_buf());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_tree() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::create_dir_all(src.join("empty-dir")).unwrap();
        fs::write(src.join("root.txt"), "root").unwrap();
        fs::write(src.join("a/one.txt"), "one").unwrap();
        fs::write(src.join("a/b/two.txt"), "two").unwrap();
        (temp, src, dest)
    }

    fn keep_all(_: &Path, _: &[u8]) -> Result<Decision> {
        Ok(Decision::Keep)
    }

    fn no_opinion(_: &Path, _: &[u8]) -> Result<Decision> {
        Ok(Decision::NoOpinion)
    }

    #[test]
    fn test_no_opinion_chain_produces_empty_destination() {
        let (_temp, src, dest) = source_tree();
        let chain = RuleChain::new().with(no_opinion);

        let stats = transform_tree(&src, &dest, &chain).unwrap();

        assert_eq!(stats.written, 0);
        assert_eq!(stats.excluded, 3);
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_chain_excludes_everything() {
        let (_temp, src, dest) = source_tree();
        let stats = transform_tree(&src, &dest, &RuleChain::new()).unwrap();
        assert_eq!(stats.written, 0);
    }

    #[test]
    fn test_keep_copies_bytes_exactly() {
        let (_temp, src, dest) = source_tree();
        let chain = RuleChain::new().with(keep_all);

        transform_tree(&src, &dest, &chain).unwrap();

        assert_eq!(fs::read(dest.join("root.txt")).unwrap(), b"root");
        assert_eq!(fs::read(dest.join("a/b/two.txt")).unwrap(), b"two");
        // Directories without files are not mirrored.
        assert!(!dest.join("empty-dir").exists());
    }

    #[test]
    fn test_drop_short_circuits_later_rules() {
        let chain = RuleChain::new()
            .with(|_: &Path, _: &[u8]| -> Result<Decision> { Ok(Decision::Drop) })
            .with(|_: &Path, _: &[u8]| -> Result<Decision> {
                anyhow::bail!("must not be consulted")
            });

        let outcome = chain.apply(Path::new("x"), b"data").unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_unclaimed_no_opinion_short_circuits() {
        let chain = RuleChain::new().with(no_opinion).with(keep_all);
        assert!(chain.apply(Path::new("x"), b"data").unwrap().is_none());
    }

    #[test]
    fn test_replace_threads_bytes_into_next_rule() {
        let chain = RuleChain::new()
            .with(|_: &Path, content: &[u8]| -> Result<Decision> {
                let mut next = content.to_vec();
                next.extend_from_slice(b"-first");
                Ok(Decision::Replace(next))
            })
            .with(|_: &Path, content: &[u8]| -> Result<Decision> {
                assert_eq!(content, b"data-first");
                let mut next = content.to_vec();
                next.extend_from_slice(b"-second");
                Ok(Decision::Replace(next))
            });

        let outcome = chain.apply(Path::new("x"), b"data").unwrap().unwrap();
        assert_eq!(&outcome[..], b"data-first-second");
    }

    #[test]
    fn test_no_opinion_after_claim_excludes() {
        let chain = RuleChain::new()
            .with(|_: &Path, _: &[u8]| -> Result<Decision> {
                Ok(Decision::Replace(b"patched".to_vec()))
            })
            .with(no_opinion);

        assert!(chain.apply(Path::new("x"), b"data").unwrap().is_none());
    }

    #[test]
    fn test_reclaim_after_no_opinion_keeps_patched_bytes() {
        let chain = RuleChain::new()
            .with(|_: &Path, _: &[u8]| -> Result<Decision> {
                Ok(Decision::Replace(b"patched".to_vec()))
            })
            .with(no_opinion)
            .with(keep_all);

        let outcome = chain.apply(Path::new("x"), b"data").unwrap().unwrap();
        assert_eq!(&outcome[..], b"patched");
    }

    #[test]
    fn test_chain_ending_in_no_opinion_produces_empty_destination() {
        let (_temp, src, dest) = source_tree();
        let chain = RuleChain::new().with(keep_all).with(no_opinion);

        let stats = transform_tree(&src, &dest, &chain).unwrap();

        assert_eq!(stats.written, 0);
        assert_eq!(stats.excluded, 3);
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_rule_sees_relative_paths() {
        let (_temp, src, dest) = source_tree();
        let chain = RuleChain::new().with(|path: &Path, _: &[u8]| -> Result<Decision> {
            assert!(path.is_relative());
            Ok(if path.starts_with("a") {
                Decision::Keep
            } else {
                Decision::NoOpinion
            })
        });

        let stats = transform_tree(&src, &dest, &chain).unwrap();

        assert_eq!(stats.written, 2);
        assert!(dest.join("a/one.txt").exists());
        assert!(!dest.join("root.txt").exists());
    }

    #[test]
    fn test_rule_error_aborts_with_path_context() {
        let (_temp, src, dest) = source_tree();
        let chain = RuleChain::new().with(|_: &Path, _: &[u8]| -> Result<Decision> {
            anyhow::bail!("boom")
        });

        let err = transform_tree(&src, &dest, &chain).unwrap_err();
        assert!(format!("{err:#}").contains("boom"));
    }
}
