//! Install orchestrator.
//!
//! Resolves a component/subcomponent pair against a static capability
//! catalog and drives the external installer: an optional shallow git
//! clone followed by shell commands run sequentially in a target
//! directory. Thin glue: the catalog knows recipes, not semantics.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// One installable subcomponent.
pub struct InstallRecipe {
    pub subcomponent: &'static str,
    pub description: &'static str,
    /// Repository to shallow-clone into the target directory, if any.
    pub clone_url: Option<&'static str>,
    /// Commands run sequentially in the (cloned) target directory.
    pub commands: &'static [&'static str],
}

/// A component with its installable subcomponents.
pub struct CatalogEntry {
    pub component: &'static str,
    pub recipes: &'static [InstallRecipe],
}

/// The static capability catalog. Populated at compile time; never
/// mutated.
pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        component: "vectordb",
        recipes: &[
            InstallRecipe {
                subcomponent: "chromadb",
                description: "Run a local ChromaDB server via Docker",
                clone_url: None,
                commands: &[
                    "docker pull chromadb/chroma",
                    "docker run -d -p 8000:8000 --name genai-stack-chroma chromadb/chroma",
                ],
            },
            InstallRecipe {
                subcomponent: "weaviate",
                description: "Run a local Weaviate server via Docker",
                clone_url: None,
                commands: &[
                    "docker pull semitechnologies/weaviate",
                    "docker run -d -p 8080:8080 --name genai-stack-weaviate semitechnologies/weaviate",
                ],
            },
        ],
    },
    CatalogEntry {
        component: "etl",
        recipes: &[InstallRecipe {
            subcomponent: "airbyte",
            description: "Download and run the Airbyte platform",
            clone_url: Some("https://github.com/airbytehq/airbyte.git"),
            commands: &["./run-ab-platform.sh"],
        }],
    },
];

/// Options for a single install run, optionally loaded from a JSON file.
#[derive(Debug, Default, Deserialize)]
pub struct InstallOptions {
    /// Directory the installer works in. Defaults to the current directory.
    #[serde(default)]
    pub target_dir: Option<PathBuf>,
    /// Extra environment passed to every command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl InstallOptions {
    /// Load options from a JSON file (`install --config-file`).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read install options: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse install options: {}", path.display()))
    }
}

/// Look up a recipe, failing with the available choices on a miss.
pub fn find_recipe(component: &str, subcomponent: &str) -> Result<&'static InstallRecipe> {
    let entry = CATALOG
        .iter()
        .find(|e| e.component == component)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown install component '{}'. Run `genai-stack install --list-components`",
                component
            )
        })?;
    entry
        .recipes
        .iter()
        .find(|r| r.subcomponent == subcomponent)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown subcomponent '{}' for component '{}'. Run `genai-stack install --list-components`",
                subcomponent,
                component
            )
        })
}

/// Print the catalog for `install --list-components`.
pub fn print_components() {
    println!("Available components for installation\n");
    for entry in CATALOG {
        println!("{}", entry.component);
        for recipe in entry.recipes {
            println!("  * {:<12} {}", recipe.subcomponent, recipe.description);
        }
    }
}

/// Resolve and run an install recipe.
pub fn run_install(component: &str, subcomponent: &str, options: &InstallOptions) -> Result<()> {
    let recipe = find_recipe(component, subcomponent)?;

    let target_dir = match &options.target_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&target_dir)?;

    let work_dir = match recipe.clone_url {
        Some(url) => {
            let checkout = target_dir.join(subcomponent);
            if checkout.exists() {
                info!(path = %checkout.display(), "checkout already exists, skipping clone");
            } else {
                clone_repository(url, &checkout)?;
            }
            checkout
        }
        None => target_dir,
    };

    execute_commands_in_directory(&work_dir, recipe.commands, &options.env)?;

    println!("Installed {}/{}", component, subcomponent);
    Ok(())
}

fn clone_repository(url: &str, target_dir: &Path) -> Result<()> {
    info!(url, "cloning installer repository");
    let output = Command::new("git")
        .args(["clone", "--depth", "1", url, &target_dir.to_string_lossy()])
        .output()
        .context("Failed to run git clone")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(())
}

/// Run shell commands sequentially in `dir`, aborting on the first
/// failure.
fn execute_commands_in_directory(
    dir: &Path,
    commands: &[&str],
    env: &BTreeMap<String, String>,
) -> Result<()> {
    for command in commands {
        info!(command, dir = %dir.display(), "running installer command");
        let status = Command::new("sh")
            .args(["-c", command])
            .current_dir(dir)
            .envs(env)
            .status()
            .with_context(|| format!("Failed to run installer command: {}", command))?;

        if !status.success() {
            bail!("Installer command failed ({}): {}", status, command);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_resolves_known_pairs() {
        let recipe = find_recipe("vectordb", "chromadb").unwrap();
        assert!(recipe.commands.iter().any(|c| c.contains("chromadb")));

        let airbyte = find_recipe("etl", "airbyte").unwrap();
        assert_eq!(
            airbyte.clone_url,
            Some("https://github.com/airbytehq/airbyte.git")
        );
    }

    #[test]
    fn unknown_pairs_fail_with_guidance() {
        let err = find_recipe("vectordb", "pinecone").err().unwrap();
        assert!(err.to_string().contains("list-components"));
        assert!(find_recipe("gpu", "cuda").is_err());
    }

    #[test]
    fn options_parse_from_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("options.json");
        std::fs::write(
            &path,
            r#"{ "target_dir": "/tmp/genai", "env": { "PORT": "9000" } }"#,
        )
        .unwrap();
        let options = InstallOptions::from_json_file(&path).unwrap();
        assert_eq!(options.target_dir.as_deref(), Some(Path::new("/tmp/genai")));
        assert_eq!(options.env.get("PORT").map(String::as_str), Some("9000"));
    }

    #[test]
    fn commands_run_in_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        execute_commands_in_directory(tmp.path(), &["touch marker"], &BTreeMap::new()).unwrap();
        assert!(tmp.path().join("marker").exists());

        assert!(
            execute_commands_in_directory(tmp.path(), &["false"], &BTreeMap::new()).is_err()
        );
    }
}
