//! Jar variants: which extension versions a jar bundles and which Keycloak
//! servers it targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the `keycloak-account-v1` dependency bundled in a jar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountV1Version {
    #[serde(rename = "0.3")]
    V0_3,
    #[serde(rename = "0.4")]
    V0_4,
    #[serde(rename = "0.6")]
    V0_6,
}

impl AccountV1Version {
    pub const ALL: [AccountV1Version; 3] = [Self::V0_3, Self::V0_4, Self::V0_6];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V0_3 => "0.3",
            Self::V0_4 => "0.4",
            Self::V0_6 => "0.6",
        }
    }
}

/// Version of the `keycloak-theme-additional-info-extension` dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdditionalInfoExtensionVersion {
    #[serde(rename = "1.1.5")]
    V1_1_5,
}

impl AdditionalInfoExtensionVersion {
    pub const ALL: [AdditionalInfoExtensionVersion; 1] = [Self::V1_1_5];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_1_5 => "1.1.5",
        }
    }
}

/// Range of Keycloak releases a jar is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeycloakVersionRange {
    #[serde(rename = "21-and-below")]
    Kc21AndBelow,
    #[serde(rename = "22-and-above")]
    Kc22AndAbove,
    #[serde(rename = "23")]
    Kc23,
    #[serde(rename = "24")]
    Kc24,
    #[serde(rename = "25-and-above")]
    Kc25AndAbove,
}

impl KeycloakVersionRange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kc21AndBelow => "21-and-below",
            Self::Kc22AndAbove => "22-and-above",
            Self::Kc23 => "23",
            Self::Kc24 => "24",
            Self::Kc25AndAbove => "25-and-above",
        }
    }

    /// Range targeted by a combination of bundled extensions.
    ///
    /// `None` means the combination is never built. Themes without an
    /// account theme never bundle account-v1.
    pub fn for_jar(
        implements_account_theme: bool,
        account_v1: Option<AccountV1Version>,
        additional_info: Option<AdditionalInfoExtensionVersion>,
    ) -> Option<Self> {
        use AccountV1Version as A;
        use AdditionalInfoExtensionVersion as X;

        if implements_account_theme {
            match (account_v1, additional_info) {
                (None, None) => Some(Self::Kc21AndBelow),
                (Some(A::V0_3), Some(X::V1_1_5)) => Some(Self::Kc23),
                (Some(A::V0_4), Some(X::V1_1_5)) => Some(Self::Kc24),
                (Some(A::V0_6), Some(X::V1_1_5)) => Some(Self::Kc25AndAbove),
                _ => None,
            }
        } else {
            match (account_v1, additional_info) {
                (None, None) => Some(Self::Kc21AndBelow),
                (None, Some(X::V1_1_5)) => Some(Self::Kc22AndAbove),
                (Some(_), _) => None,
            }
        }
    }
}

impl fmt::Display for KeycloakVersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One jar to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JarVariant {
    pub keycloak_version_range: KeycloakVersionRange,
    pub account_v1: Option<AccountV1Version>,
    pub additional_info: Option<AdditionalInfoExtensionVersion>,
}

impl JarVariant {
    /// `keycloak-theme-for-kc-<range>.jar`
    pub fn jar_basename(&self) -> String {
        format!("keycloak-theme-for-kc-{}.jar", self.keycloak_version_range)
    }

    /// Jar basename without the `.jar` extension.
    pub fn staging_dir_name(&self) -> String {
        format!("keycloak-theme-for-kc-{}", self.keycloak_version_range)
    }

    /// Servers before the account-v1 0.4 line still request the
    /// user-profile pages under their own names.
    pub fn needs_legacy_route_aliases(&self) -> bool {
        matches!(self.account_v1, None | Some(AccountV1Version::V0_3))
    }

    /// No account-v1 dependency: the server's own account-v1 is used.
    pub fn uses_builtin_account_v1(&self) -> bool {
        self.account_v1.is_none()
    }

    /// JSON identity used in failure reports.
    pub fn identity(&self) -> String {
        let identity = serde_json::json!({
            "jarFileBasename": self.jar_basename(),
            "keycloakVersionRange": self.keycloak_version_range,
            "keycloakAccountV1Version": self.account_v1,
            "keycloakThemeAdditionalInfoExtensionVersion": self.additional_info,
        });
        serde_json::to_string_pretty(&identity).unwrap_or_else(|_| self.jar_basename())
    }
}

impl fmt::Display for JarVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.jar_basename())
    }
}

/// Every variant to build, optionally restricted to `targets`.
///
/// Order is deterministic: no account-v1 first, then ascending account-v1
/// versions, each without and then with the additional-info extension.
pub fn plan_variants(
    implements_account_theme: bool,
    targets: Option<&[KeycloakVersionRange]>,
) -> Vec<JarVariant> {
    let account_v1_choices =
        std::iter::once(None).chain(AccountV1Version::ALL.into_iter().map(Some));

    let mut variants = Vec::new();
    for account_v1 in account_v1_choices {
        let additional_info_choices =
            std::iter::once(None).chain(AdditionalInfoExtensionVersion::ALL.into_iter().map(Some));
        for additional_info in additional_info_choices {
            let Some(range) =
                KeycloakVersionRange::for_jar(implements_account_theme, account_v1, additional_info)
            else {
                continue;
            };
            if targets.is_some_and(|targets| !targets.contains(&range)) {
                continue;
            }
            variants.push(JarVariant {
                keycloak_version_range: range,
                account_v1,
                additional_info,
            });
        }
    }
    variants
}
