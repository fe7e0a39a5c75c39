//! Theme jars: one per Keycloak version range.
//!
//! - [`variant`] - extension versions, version ranges and variant planning
//! - [`pom`] - Maven descriptor for a staged variant
//! - [`build`] - stage, patch, package and relocate each variant

pub mod build;
pub mod pom;
pub mod variant;

pub use build::{build_jar, build_jars, staging_rules, BuiltJar};
pub use pom::generate_pom;
pub use variant::{
    plan_variants, AccountV1Version, AdditionalInfoExtensionVersion, JarVariant,
    KeycloakVersionRange,
};
