//! Integration tests for `kitpm add`.

use crate::common::{FixtureItem, TestProject, starter_kit};
use anyhow::Result;
use predicates::prelude::*;

#[test]
fn test_add_installs_dependencies_first() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["add", "patterns/login-form"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed patterns/login-form"))
        .stdout(predicate::str::contains("Installed shared/utils"));

    assert!(project.file_exists("lib/utils.ts"));
    assert!(project.file_exists("components/ui/button.tsx"));
    assert!(project.file_exists("components/ui/input.tsx"));
    assert!(project.file_exists("components/patterns/login-form.tsx"));

    let ledger = project.ledger()?;
    let names: Vec<&str> = ledger["installed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert_eq!(names.len(), 4);
    assert!(position("shared/utils") < position("button"));
    assert!(position("button") < position("patterns/login-form"));
    assert!(position("input") < position("patterns/login-form"));
    Ok(())
}

#[test]
fn test_add_rewrites_registry_imports() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project.kitpm().args(["add", "button"]).assert().success();

    let button = project.read_file("components/ui/button.tsx")?;
    assert!(button.contains(r#"import { cn } from "@/lib/utils";"#), "got:\n{button}");
    assert!(!button.contains("@registry/"));
    Ok(())
}

#[test]
fn test_add_relative_import_style() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project
        .kitpm()
        .args(["init", "--ref", "v1", "--import-style", "relative", "--source"])
        .arg(project.source_setting())
        .assert()
        .success();

    project.kitpm().args(["add", "button"]).assert().success();

    let button = project.read_file("components/ui/button.tsx")?;
    assert!(button.contains(r#"import { cn } from "../../lib/utils";"#), "got:\n{button}");
    Ok(())
}

#[test]
fn test_add_records_checksums() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project.kitpm().args(["add", "button"]).assert().success();

    let entry = project.ledger_entry("button")?.expect("button entry");
    assert_eq!(entry["version"].as_str(), Some("v1"));
    assert_eq!(entry["modified"].as_bool(), Some(false));
    let checksums = entry["checksums"].as_array().unwrap();
    assert_eq!(checksums.len(), 1);
    assert_eq!(checksums[0]["path"].as_str(), Some("components/ui/button.tsx"));
    assert!(checksums[0]["checksum"].as_str().unwrap().starts_with("sha256:"));
    Ok(())
}

#[test]
fn test_add_unknown_item_suggests_similar() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["add", "buton"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Item 'buton' not found"))
        .stderr(predicate::str::contains("Did you mean: button"));

    assert!(project.ledger_entry("buton")?.is_none());
    Ok(())
}

#[test]
fn test_add_circular_dependency_fails() -> Result<()> {
    let project = TestProject::new()?;
    project.publish(
        "v1",
        &[
            FixtureItem::new("tabs").depends_on(&["tab-panel"]).file("primitives/tabs.tsx", "tabs\n"),
            FixtureItem::new("tab-panel").depends_on(&["tabs"]).file("primitives/tab-panel.tsx", "panel\n"),
        ],
    )?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["add", "tabs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency detected"));

    assert!(!project.file_exists("components/ui/tabs.tsx"));
    Ok(())
}

#[test]
fn test_add_missing_dependency_fails() -> Result<()> {
    let project = TestProject::new()?;
    project.publish(
        "v1",
        &[FixtureItem::new("card").depends_on(&["shared/ghost"]).file("primitives/card.tsx", "card\n")],
    )?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["add", "card"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency 'shared/ghost' required by 'card'"));
    Ok(())
}

#[test]
fn test_add_fetch_failure_writes_nothing() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;
    std::fs::remove_file(
        project.project_path().join("../registry/v1/registry/primitives/button.tsx"),
    )?;

    project.kitpm().args(["add", "button"]).assert().failure();

    assert!(!project.file_exists("lib/utils.ts"));
    assert!(project.ledger_entry("shared/utils")?.is_none());
    assert!(project.ledger_entry("button")?.is_none());
    Ok(())
}

#[test]
fn test_add_skips_installed_items() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project.kitpm().args(["add", "button"]).assert().success();
    project
        .kitpm()
        .args(["add", "button"])
        .assert()
        .success()
        .stdout(predicate::str::contains("button is already installed"))
        .stdout(predicate::str::contains("Nothing to install"));
    Ok(())
}

#[test]
fn test_add_dry_run_leaves_project_untouched() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["add", "button", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would install button"));

    assert!(!project.file_exists("components/ui/button.tsx"));
    assert!(project.ledger_entry("button")?.is_none());
    Ok(())
}

#[test]
fn test_add_invalid_name() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["add", "shared/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid item name"));
    Ok(())
}
