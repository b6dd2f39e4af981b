use std::path::{Path, PathBuf};

use anyhow::Context;
use regex_lite::Regex;
use serde::Deserialize;

/// Crates the domain must never depend on
const DOMAIN_FORBIDDEN_DEPS: &[&str] = &["enemy-engine", "tracing-subscriber", "dotenvy"];

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  arch-check"),
    }
}

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<Package>,
    workspace_root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct Dependency {
    name: String,
}

fn arch_check() -> anyhow::Result<()> {
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }

    let metadata: Metadata =
        serde_json::from_slice(&output.stdout).context("parsing cargo metadata")?;

    let mut violations = check_domain_deps(&metadata.packages);
    violations.extend(check_engine_imports(
        &metadata.workspace_root.join("crates/engine/src"),
    )?);

    if violations.is_empty() {
        println!("arch-check: OK");
        return Ok(());
    }

    for violation in &violations {
        eprintln!("arch-check: {violation}");
    }
    anyhow::bail!("{} architecture violation(s)", violations.len())
}

fn check_domain_deps(packages: &[Package]) -> Vec<String> {
    let Some(domain) = packages.iter().find(|p| p.name == "enemy-domain") else {
        return vec!["enemy-domain package not found".into()];
    };
    domain
        .dependencies
        .iter()
        .filter(|d| DOMAIN_FORBIDDEN_DEPS.contains(&d.name.as_str()))
        .map(|d| format!("enemy-domain depends on forbidden crate `{}`", d.name))
        .collect()
}

/// Engine code goes through the domain's root re-exports only.
fn check_engine_imports(src: &Path) -> anyhow::Result<Vec<String>> {
    let internal = Regex::new(
        r"enemy_domain::(aggregates|error|events|ids|ports|value_objects)::",
    )
    .context("compiling import pattern")?;

    let mut files = Vec::new();
    collect_rust_files(src, &mut files)?;

    let mut violations = Vec::new();
    for file in files {
        let contents = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        for (index, line) in contents.lines().enumerate() {
            if internal.is_match(line) {
                violations.push(format!(
                    "{}:{}: reaches into enemy_domain internals: {}",
                    file.display(),
                    index + 1,
                    line.trim()
                ));
            }
        }
    }
    Ok(violations)
}

fn collect_rust_files(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rust_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}
