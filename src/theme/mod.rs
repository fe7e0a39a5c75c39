//! Theme tree layout and the patches applied to it per jar variant.
//!
//! - [`rules`] - per-file staging rules (membership, built-in account-v1 compatibility)
//! - [`routes`] - route-alias pages written into an already staged tree
//!
//! All paths here are relative to the canonical build directory (the Maven
//! project root that gets packaged).

pub mod routes;
pub mod rules;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Directory holding one subdirectory per theme.
pub const THEMES_DIR: &str = "src/main/resources/theme";

/// Manifest Keycloak reads to discover the themes a jar provides.
pub const MANIFEST_PATH: &str = "src/main/resources/META-INF/keycloak-themes.json";

/// Legacy account theme bundled alongside the user's themes.
pub const ACCOUNT_V1_THEME_NAME: &str = "account-v1";

/// Keycloak's own theme, which provides account-v1 on older servers.
pub const BUILTIN_PARENT_THEME: &str = "keycloak";

/// `src/main/resources/theme/<theme_name>`
pub fn theme_dir(theme_name: &str) -> PathBuf {
    Path::new(THEMES_DIR).join(theme_name)
}

pub fn manifest_path() -> PathBuf {
    PathBuf::from(MANIFEST_PATH)
}

/// Content of `META-INF/keycloak-themes.json`.
///
/// Only `name` is interpreted. Every other field is carried through a
/// rewrite untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeManifest {
    pub themes: Vec<ThemeEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThemeManifest {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("parsing theme manifest")
    }

    /// Serialize as JSON indented with two spaces.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).context("serializing theme manifest")
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|theme| theme.name.as_str())
    }

    pub fn remove_theme(&mut self, name: &str) {
        self.themes.retain(|theme| theme.name != name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_dir() {
        assert_eq!(
            theme_dir("mytheme"),
            PathBuf::from("src/main/resources/theme/mytheme")
        );
    }

    #[test]
    fn test_manifest_roundtrip_keeps_types() {
        let raw = br#"{"themes":[{"name":"a","types":["login","account"]},{"name":"account-v1","types":["account"]}]}"#;
        let mut manifest = ThemeManifest::parse(raw).unwrap();
        manifest.remove_theme(ACCOUNT_V1_THEME_NAME);

        assert_eq!(manifest.theme_names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(
            manifest.themes[0].types,
            Some(vec!["login".to_owned(), "account".to_owned()])
        );
    }

    #[test]
    fn test_rewrite_preserves_unknown_fields() {
        let raw = br#"{"themes":[{"name":"a","types":["login"],"extra":1},{"name":"account-v1","types":["account"]}],"schema":"x"}"#;
        let mut manifest = ThemeManifest::parse(raw).unwrap();
        manifest.remove_theme(ACCOUNT_V1_THEME_NAME);

        let rewritten: Value = serde_json::from_slice(&manifest.to_pretty_json().unwrap()).unwrap();
        assert_eq!(
            rewritten,
            serde_json::json!({
                "themes": [{ "name": "a", "types": ["login"], "extra": 1 }],
                "schema": "x"
            })
        );
    }

    #[test]
    fn test_entry_without_types() {
        let raw = br#"{"themes":[{"name":"a"},{"name":"account-v1"}]}"#;
        let mut manifest = ThemeManifest::parse(raw).unwrap();
        manifest.remove_theme(ACCOUNT_V1_THEME_NAME);

        let rewritten: Value = serde_json::from_slice(&manifest.to_pretty_json().unwrap()).unwrap();
        assert_eq!(rewritten, serde_json::json!({ "themes": [{ "name": "a" }] }));
    }

    #[test]
    fn test_pretty_json_uses_two_space_indent() {
        let manifest = ThemeManifest {
            themes: vec![ThemeEntry {
                name: "a".to_owned(),
                types: Some(vec!["login".to_owned()]),
                extra: Map::new(),
            }],
            extra: Map::new(),
        };
        let text = String::from_utf8(manifest.to_pretty_json().unwrap()).unwrap();
        assert!(text.starts_with("{\n  \"themes\": [\n    {\n      \"name\": \"a\""));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ThemeManifest::parse(b"not json").is_err());
    }
}
