//! Route-alias pages for Keycloak versions that still route the
//! user-profile flavours of registration and profile update to their own
//! templates.
//!
//! For each selected theme, `login/register.ftl` and
//! `login/login-update-profile.ftl` are copied to a sibling file named after
//! the page Keycloak actually requests. The copy additionally exports
//! `realPageId` so the page can tell which route it was served under. The
//! original templates are left untouched.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::BuildError;
use crate::theme::theme_dir;

/// (page the theme implements, page id Keycloak requests for it)
pub const LEGACY_ROUTED_PAGES: [(&str, &str); 2] = [
    ("register.ftl", "register-user-profile.ftl"),
    ("login-update-profile.ftl", "update-user-profile.ftl"),
];

fn page_id_markers(page_id: &str) -> [String; 2] {
    [
        format!(r#"out["pageId"] = "{page_id}";"#),
        r#"out["pageId"] = "${pageId}";"#.to_owned(),
    ]
}

/// Rewrite the first page-id assignment so it also sets `realPageId`.
///
/// The literal form `out["pageId"] = "<page>";` is tried first, then the
/// FreeMarker interpolation `out["pageId"] = "${pageId}";`. Returns `None`
/// when neither marker is present.
pub fn alias_template(template: &str, page_id: &str, real_page_id: &str) -> Option<String> {
    let replacement =
        format!(r#"out["pageId"] = "{page_id}"; out["realPageId"] = "{real_page_id}";"#);

    page_id_markers(page_id)
        .iter()
        .find(|marker| template.contains(marker.as_str()))
        .map(|marker| template.replacen(marker.as_str(), &replacement, 1))
}

/// Write the alias pages for every selected theme under `staging_root`.
///
/// Returns the paths written. A template without a page-id marker is a
/// fatal error.
pub fn write_legacy_route_aliases(
    staging_root: &Path,
    theme_names: &[String],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (page_id, real_page_id) in LEGACY_ROUTED_PAGES {
        for theme_name in theme_names {
            let login_dir = staging_root.join(theme_dir(theme_name)).join("login");
            let template_path = login_dir.join(page_id);

            let template = fs::read_to_string(&template_path)
                .with_context(|| format!("reading template '{}'", template_path.display()))?;

            let aliased = alias_template(&template, page_id, real_page_id).ok_or_else(|| {
                BuildError::MarkerNotFound {
                    file: template_path.clone(),
                    marker: page_id_markers(page_id)[0].clone(),
                }
            })?;

            let alias_path = login_dir.join(real_page_id);
            fs::write(&alias_path, aliased)
                .with_context(|| format!("writing route alias '{}'", alias_path.display()))?;
            debug!(
                theme = %theme_name,
                page = page_id,
                alias = real_page_id,
                "route alias written"
            );
            written.push(alias_path);
        }
    }

    Ok(written)
}
