//! Build pipeline for Keycloak theme jars.
//!
//! A single theme build directory is packaged into one jar per Keycloak
//! version range. Each range gets its own staged copy of the tree, patched
//! for what that range of servers expects, and is handed to Maven.
//!
//! - **Archive reader** - sequential zip/jar extraction with per-entry policy
//! - **Tree transform** - rule chains deciding which files are staged and how
//! - **Theme patches** - membership, built-in account-v1 compatibility, route aliases
//! - **Jar builds** - variant planning, POM synthesis, packaging, relocation
//!
//! # Architecture
//!
//! ```text
//! build_dir ──transform_tree(staging_rules)──> <cache_dir>/keycloak-theme-for-kc-<range>/
//!                                                  │
//!                                                  ├── route aliases (account-v1 absent or 0.3)
//!                                                  ├── pom.xml
//!                                                  └── mvn clean install -Dmaven.repo.local=.m2
//!                                                          │
//! build_dir/keycloak-theme-for-kc-<range>.jar <───────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use keycloak_theme_builder::{build_jars, load_build_config};
//!
//! let options = load_build_config(Path::new("theme-build.toml"))?;
//! for jar in build_jars(&options)? {
//!     println!("{} {}", jar.sha256, jar.path.display());
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod jar;
pub mod packager;
pub mod theme;
pub mod transform;

pub use archive::{extract_all, extract_archive, extract_with_rules, ArchiveEntry, ArchiveReader};
pub use config::{load_build_config, BuildOptions};
pub use error::BuildError;
pub use jar::{build_jar, build_jars, plan_variants, BuiltJar, JarVariant, KeycloakVersionRange};
pub use packager::PackagerConfig;
pub use transform::{transform_tree, Decision, RuleChain, TransformRule, TransformStats};
