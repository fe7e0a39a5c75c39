use std::path::Path;

use anyhow::{bail, Context, Result};
use keycloak_theme_builder::{build_jars, extract_all, load_build_config};
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "Usage:\n  keycloak-theme-builder build-jars <config.toml>\n  keycloak-theme-builder extract <archive> <dest_dir>"
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd, config] if cmd == "build-jars" => build(Path::new(config)),
        [cmd, archive, dest] if cmd == "extract" => extract(Path::new(archive), Path::new(dest)),
        _ => bail!(usage()),
    }
}

fn build(config_path: &Path) -> Result<()> {
    let options = load_build_config(config_path)?;
    let jars = build_jars(&options).with_context(|| {
        format!(
            "building theme jars from '{}'",
            options.build_dir.display()
        )
    })?;

    for jar in jars {
        println!("{}  {}  ({} bytes)", jar.sha256, jar.path.display(), jar.size_bytes);
    }
    Ok(())
}

fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let count = extract_all(archive, dest)?;
    println!("Extracted {count} files to {}", dest.display());
    Ok(())
}
