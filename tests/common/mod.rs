//! Shared fixtures for kitpm integration tests.
//!
//! Every test gets a [`TestProject`]: a temporary project directory, an
//! isolated global config path and a local registry laid out per ref
//! (`<registry>/<ref>/registry/index.toml`), so no test touches the network or
//! the user's home directory.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One file of a registry item: logical path and upstream content.
pub struct FixtureFile {
    pub path: String,
    pub content: String,
}

/// A registry item written into a fixture index.
pub struct FixtureItem {
    pub name: String,
    pub dependencies: Vec<String>,
    pub files: Vec<FixtureFile>,
}

impl FixtureItem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.dependencies.extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.push(FixtureFile {
            path: path.to_string(),
            content: content.to_string(),
        });
        self
    }
}

/// A temporary project wired to a local registry.
pub struct TestProject {
    _temp_dir: TempDir,
    project_dir: PathBuf,
    registry_dir: PathBuf,
    config_path: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        let registry_dir = temp_dir.path().join("registry");
        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&registry_dir)?;

        Ok(Self {
            config_path: temp_dir.path().join("config.toml"),
            _temp_dir: temp_dir,
            project_dir,
            registry_dir,
        })
    }

    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    /// The `source` value pointing at the per-ref registry directories.
    pub fn source_setting(&self) -> String {
        self.registry_dir.join("{ref}").to_string_lossy().into_owned()
    }

    /// Write the registry index and item files for `git_ref`.
    pub fn publish(&self, git_ref: &str, items: &[FixtureItem]) -> Result<()> {
        let root = self.registry_dir.join(git_ref).join("registry");
        fs::create_dir_all(&root)?;

        let mut index = String::new();
        for item in items {
            index.push_str("[[items]]\n");
            index.push_str(&format!("name = {:?}\n", item.name));
            let deps: Vec<String> = item.dependencies.iter().map(|d| format!("{d:?}")).collect();
            index.push_str(&format!("dependencies = [{}]\n", deps.join(", ")));
            for file in &item.files {
                index.push_str(&format!("\n[[items.files]]\npath = {:?}\n", file.path));
                let target = root.join(&file.path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, &file.content)
                    .with_context(|| format!("writing fixture {}", target.display()))?;
            }
            index.push('\n');
        }
        fs::write(root.join("index.toml"), index)?;
        Ok(())
    }

    /// A `kitpm` invocation scoped to this project.
    pub fn kitpm(&self) -> Command {
        let mut cmd = Command::cargo_bin("kitpm").expect("kitpm binary is built");
        cmd.arg("--project-dir")
            .arg(&self.project_dir)
            .arg("--config")
            .arg(&self.config_path)
            .arg("--no-progress")
            .env("NO_COLOR", "1")
            .env("CLICOLOR", "0")
            .env_remove("CLICOLOR_FORCE")
            .env_remove("RUST_LOG")
            .env_remove("KITPM_CONFIG");
        cmd
    }

    /// Run `kitpm init` against the local registry at `git_ref`.
    pub fn init(&self, git_ref: &str) -> Result<()> {
        self.kitpm()
            .args(["init", "--ref", git_ref, "--source"])
            .arg(self.source_setting())
            .assert()
            .success();
        Ok(())
    }

    pub fn read_file(&self, relative: &str) -> Result<String> {
        let path = self.project_dir.join(relative);
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }

    pub fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.project_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn file_exists(&self, relative: &str) -> bool {
        self.project_dir.join(relative).exists()
    }

    /// The ledger parsed as plain TOML.
    pub fn ledger(&self) -> Result<toml::Table> {
        let content = self.read_file("kitpm.toml")?;
        Ok(toml::from_str(&content)?)
    }

    /// The ledger entry for `name`, if installed.
    pub fn ledger_entry(&self, name: &str) -> Result<Option<toml::Table>> {
        let ledger = self.ledger()?;
        let installed = ledger.get("installed").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        Ok(installed.into_iter().filter_map(|v| v.as_table().cloned()).find(|entry| {
            entry.get("name").and_then(|n| n.as_str()) == Some(name)
        }))
    }
}

/// A small UI kit: a shared helper, two primitives and a pattern using both.
pub fn starter_kit() -> Vec<FixtureItem> {
    vec![
        FixtureItem::new("shared/utils").file(
            "shared/utils.ts",
            "export function cn(...classes: string[]) {\n  return classes.filter(Boolean).join(\" \");\n}\n",
        ),
        FixtureItem::new("button").depends_on(&["shared/utils"]).file(
            "primitives/button.tsx",
            "import { cn } from \"@registry/shared/utils\";\n\nexport function Button() {\n  return <button className={cn(\"btn\")} />;\n}\n",
        ),
        FixtureItem::new("input").depends_on(&["shared/utils"]).file(
            "primitives/input.tsx",
            "import { cn } from \"@registry/shared/utils\";\n\nexport function Input() {\n  return <input className={cn(\"input\")} />;\n}\n",
        ),
        FixtureItem::new("patterns/login-form").depends_on(&["button", "input"]).file(
            "patterns/login-form.tsx",
            "import { Button } from \"@registry/primitives/button\";\nimport { Input } from \"@registry/primitives/input\";\n\nexport function LoginForm() {\n  return <form><Input /><Button /></form>;\n}\n",
        ),
    ]
}
