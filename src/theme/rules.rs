//! Staging rules applied while copying the build tree into a variant's
//! staging directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::theme::{
    manifest_path, theme_dir, ThemeManifest, ACCOUNT_V1_THEME_NAME, BUILTIN_PARENT_THEME,
};
use crate::transform::{Decision, TransformRule};

/// Claims the manifest and every file under a selected theme directory.
///
/// The account-v1 theme directory is always a member; jars that rely on the
/// server's built-in account-v1 strip it again with
/// [`LegacyAccountCompatRule`].
#[derive(Debug, Clone)]
pub struct MembershipRule {
    theme_dirs: Vec<PathBuf>,
    manifest: PathBuf,
}

impl MembershipRule {
    pub fn new(theme_names: &[String]) -> Self {
        let theme_dirs = theme_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(ACCOUNT_V1_THEME_NAME))
            .map(theme_dir)
            .collect();
        Self {
            theme_dirs,
            manifest: manifest_path(),
        }
    }
}

impl TransformRule for MembershipRule {
    fn decide(&self, relative_path: &Path, _content: &[u8]) -> Result<Decision> {
        if relative_path == self.manifest {
            return Ok(Decision::Keep);
        }
        if self
            .theme_dirs
            .iter()
            .any(|dir| relative_path.starts_with(dir))
        {
            return Ok(Decision::Keep);
        }
        Ok(Decision::NoOpinion)
    }
}

/// Rewrites the tree for servers that ship account-v1 themselves.
///
/// - drops the bundled account-v1 theme
/// - removes account-v1 from the manifest
/// - re-parents each selected theme's account theme onto `keycloak`
///
/// A selected theme whose `account/theme.properties` does not name
/// account-v1 as parent is a fatal inconsistency.
#[derive(Debug, Clone)]
pub struct LegacyAccountCompatRule {
    account_v1_dir: PathBuf,
    manifest: PathBuf,
    account_properties: Vec<PathBuf>,
}

impl LegacyAccountCompatRule {
    pub fn new(theme_names: &[String]) -> Self {
        Self {
            account_v1_dir: theme_dir(ACCOUNT_V1_THEME_NAME),
            manifest: manifest_path(),
            account_properties: theme_names
                .iter()
                .map(|name| theme_dir(name).join("account").join("theme.properties"))
                .collect(),
        }
    }
}

impl TransformRule for LegacyAccountCompatRule {
    fn decide(&self, relative_path: &Path, content: &[u8]) -> Result<Decision> {
        if relative_path.starts_with(&self.account_v1_dir) {
            return Ok(Decision::Drop);
        }

        if relative_path == self.manifest {
            let mut manifest = ThemeManifest::parse(content)?;
            manifest.remove_theme(ACCOUNT_V1_THEME_NAME);
            return Ok(Decision::Replace(manifest.to_pretty_json()?));
        }

        if self.account_properties.iter().any(|p| p == relative_path) {
            let text = std::str::from_utf8(content)
                .with_context(|| format!("'{}' is not UTF-8", relative_path.display()))?;
            let patched =
                reparent_account_theme(text).ok_or_else(|| BuildError::MarkerNotFound {
                    file: relative_path.to_path_buf(),
                    marker: account_v1_parent_line(),
                })?;
            return Ok(Decision::Replace(patched.into_bytes()));
        }

        Ok(Decision::Keep)
    }
}

fn account_v1_parent_line() -> String {
    format!("parent={ACCOUNT_V1_THEME_NAME}")
}

/// Replace the first `parent=account-v1` with `parent=keycloak`.
///
/// Returns `None` when the content has no such line.
pub fn reparent_account_theme(properties: &str) -> Option<String> {
    let needle = account_v1_parent_line();
    if !properties.contains(&needle) {
        return None;
    }
    Some(properties.replacen(&needle, &format!("parent={BUILTIN_PARENT_THEME}"), 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RuleChain;

    fn names() -> Vec<String> {
        vec!["a".to_owned(), "b".to_owned()]
    }

    fn manifest_json(names: &[&str]) -> Vec<u8> {
        let themes: Vec<_> = names
            .iter()
            .map(|n| serde_json::json!({ "name": n, "types": ["login", "account"] }))
            .collect();
        serde_json::to_vec(&serde_json::json!({ "themes": themes })).unwrap()
    }

    #[test]
    fn test_membership_keeps_selected_themes_and_manifest() {
        let rule = MembershipRule::new(&names());

        for path in [
            "src/main/resources/theme/a/login/login.ftl",
            "src/main/resources/theme/b/account/theme.properties",
            "src/main/resources/theme/account-v1/account/account.ftl",
            "src/main/resources/META-INF/keycloak-themes.json",
        ] {
            assert_eq!(
                rule.decide(Path::new(path), b"").unwrap(),
                Decision::Keep,
                "{path}"
            );
        }
    }

    #[test]
    fn test_membership_has_no_opinion_on_other_files() {
        let rule = MembershipRule::new(&names());

        for path in [
            "src/main/resources/theme/c/login/login.ftl",
            "src/main/resources/theme/ab/login/login.ftl",
            "pom.xml",
            "src/main/resources/META-INF/other.json",
        ] {
            assert_eq!(
                rule.decide(Path::new(path), b"").unwrap(),
                Decision::NoOpinion,
                "{path}"
            );
        }
    }

    #[test]
    fn test_membership_leaves_bytes_untouched() {
        let chain = RuleChain::new().with(MembershipRule::new(&names()));
        let out = chain
            .apply(Path::new("src/main/resources/theme/a/x.bin"), &[0, 159, 146, 150])
            .unwrap()
            .unwrap();
        assert_eq!(&out[..], &[0, 159, 146, 150]);
    }

    #[test]
    fn test_compat_drops_account_v1_files() {
        let rule = LegacyAccountCompatRule::new(&names());
        let decision = rule
            .decide(
                Path::new("src/main/resources/theme/account-v1/account/resources/css/account.css"),
                b"body {}",
            )
            .unwrap();
        assert_eq!(decision, Decision::Drop);
    }

    #[test]
    fn test_compat_removes_account_v1_from_manifest() {
        let rule = LegacyAccountCompatRule::new(&names());
        let input = manifest_json(&["a", "account-v1", "b"]);

        let Decision::Replace(out) = rule.decide(&manifest_path(), &input).unwrap() else {
            panic!("manifest must be rewritten");
        };

        let parsed = ThemeManifest::parse(&out).unwrap();
        assert_eq!(parsed.theme_names().collect::<Vec<_>>(), vec!["a", "b"]);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\n  \"themes\""));
    }

    #[test]
    fn test_compat_reparents_account_theme() {
        let rule = LegacyAccountCompatRule::new(&names());
        let input = b"parent=account-v1\nimport=common/keycloak\n";

        let Decision::Replace(out) = rule
            .decide(
                Path::new("src/main/resources/theme/a/account/theme.properties"),
                input,
            )
            .unwrap()
        else {
            panic!("theme.properties must be rewritten");
        };

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("parent=keycloak"));
        assert_ne!(out.as_slice(), input.as_slice());
    }

    #[test]
    fn test_compat_fails_when_parent_line_missing() {
        let rule = LegacyAccountCompatRule::new(&names());

        let err = rule
            .decide(
                Path::new("src/main/resources/theme/b/account/theme.properties"),
                b"parent=base\n",
            )
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MarkerNotFound { .. })
        ));
    }

    #[test]
    fn test_compat_keeps_everything_else() {
        let rule = LegacyAccountCompatRule::new(&names());
        assert_eq!(
            rule.decide(
                Path::new("src/main/resources/theme/a/login/theme.properties"),
                b"parent=account-v1\n"
            )
            .unwrap(),
            Decision::Keep
        );
    }

    #[test]
    fn test_reparent_replaces_first_occurrence_only() {
        let out = reparent_account_theme("parent=account-v1\n# parent=account-v1\n").unwrap();
        assert_eq!(out, "parent=keycloak\n# parent=account-v1\n");
        assert!(reparent_account_theme("parent=base\n").is_none());
    }
}
