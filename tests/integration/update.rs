//! Integration tests for `kitpm update`.
//!
//! Tests run without a terminal on stdin, so every conflict resolves to
//! keeping the local file unless `--force` is given.

use crate::common::{FixtureItem, TestProject, starter_kit};
use anyhow::Result;
use predicates::prelude::*;

const BUTTON_V2: &str = "import { cn } from \"@registry/shared/utils\";\n\nexport function Button({ variant }: { variant?: string }) {\n  return <button className={cn(\"btn\", variant)} />;\n}\n";

/// The starter kit with a reworked button.
fn kit_v2() -> Vec<FixtureItem> {
    starter_kit()
        .into_iter()
        .map(|item| {
            if item.name == "button" {
                FixtureItem::new("button").depends_on(&["shared/utils"]).file("primitives/button.tsx", BUTTON_V2)
            } else {
                item
            }
        })
        .collect()
}

/// A project at v1 with `button` installed and v2 published.
fn project_with_button() -> Result<TestProject> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.publish("v2", &kit_v2())?;
    project.init("v1")?;
    project.kitpm().args(["add", "button"]).assert().success();
    Ok(project)
}

#[test]
fn test_update_without_upstream_changes() -> Result<()> {
    let project = project_with_button()?;

    project
        .kitpm()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 updated, 0 created, 2 unchanged or kept"));
    Ok(())
}

#[test]
fn test_update_applies_upstream_changes() -> Result<()> {
    let project = project_with_button()?;

    project
        .kitpm()
        .args(["update", "--ref", "v2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated"));

    let button = project.read_file("components/ui/button.tsx")?;
    assert!(button.contains("variant"));
    assert!(button.contains("@/lib/utils"));

    let ledger = project.ledger()?;
    assert_eq!(ledger["ref"].as_str(), Some("v2"));
    let entry = project.ledger_entry("button")?.expect("button entry");
    assert_eq!(entry["version"].as_str(), Some("v2"));
    assert_eq!(entry["modified"].as_bool(), Some(false));
    Ok(())
}

#[test]
fn test_update_keeps_local_edits_without_terminal() -> Result<()> {
    let project = project_with_button()?;
    let edited = "export function Button() {\n  return <button className=\"mine\" />;\n}\n";
    project.write_file("components/ui/button.tsx", edited)?;

    project
        .kitpm()
        .args(["update", "--ref", "v2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kept local"));

    assert_eq!(project.read_file("components/ui/button.tsx")?, edited);
    let entry = project.ledger_entry("button")?.expect("button entry");
    assert_eq!(entry["modified"].as_bool(), Some(true));
    Ok(())
}

#[test]
fn test_update_force_overwrites_local_edits() -> Result<()> {
    let project = project_with_button()?;
    project.write_file("components/ui/button.tsx", "// local rewrite\n")?;

    project.kitpm().args(["update", "--ref", "v2", "--force"]).assert().success();

    let button = project.read_file("components/ui/button.tsx")?;
    assert!(button.contains("variant"));
    assert!(!button.contains("local rewrite"));
    let entry = project.ledger_entry("button")?.expect("button entry");
    assert_eq!(entry["modified"].as_bool(), Some(false));
    Ok(())
}

#[test]
fn test_update_json_report() -> Result<()> {
    let project = project_with_button()?;
    project.write_file("components/ui/button.tsx", "// local rewrite\n")?;

    let output = project
        .kitpm()
        .args(["update", "--ref", "v2", "--force", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["target_ref"], "v2");
    assert_eq!(report["dry_run"], false);
    assert_eq!(report["exit_code"], 0);
    assert_eq!(report["totals"]["updated"], 1);
    assert_eq!(report["totals"]["conflicts"], 0);
    assert_eq!(report["totals"]["errors"], 0);

    let components = report["components"].as_array().unwrap();
    let button = components.iter().find(|c| c["component_name"] == "button").expect("button status");
    assert_eq!(button["current_version"], "v1");
    assert_eq!(button["target_version"], "v2");
    assert_eq!(button["files"][0]["status"], "updated");
    assert_eq!(button["files"][0]["has_local_modifications"], true);
    assert_eq!(button["files"][0]["conflicted"], true);
    assert_eq!(button["has_conflicts"], false);
    Ok(())
}

#[test]
fn test_update_json_keeps_conflicts() -> Result<()> {
    let project = project_with_button()?;
    project.write_file("components/ui/button.tsx", "// local rewrite\n")?;

    let output = project.kitpm().args(["update", "--ref", "v2", "--format", "json"]).output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let components = report["components"].as_array().unwrap();
    let button = components.iter().find(|c| c["component_name"] == "button").expect("button status");
    assert_eq!(button["files"][0]["status"], "skipped");
    assert_eq!(button["files"][0]["skip_reason"], "kept-local");
    assert_eq!(project.read_file("components/ui/button.tsx")?, "// local rewrite\n");
    Ok(())
}

#[test]
fn test_update_creates_new_upstream_files() -> Result<()> {
    let project = project_with_button()?;
    let mut kit = kit_v2();
    for item in &mut kit {
        if item.name == "button" {
            item.files.push(crate::common::FixtureFile {
                path: "primitives/button-group.tsx".to_string(),
                content: "export const ButtonGroup = () => null;\n".to_string(),
            });
        }
    }
    project.publish("v3", &kit)?;

    project
        .kitpm()
        .args(["update", "button", "--ref", "v3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));

    assert!(project.file_exists("components/ui/button-group.tsx"));
    let entry = project.ledger_entry("button")?.expect("button entry");
    assert_eq!(entry["checksums"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn test_update_dry_run_changes_nothing() -> Result<()> {
    let project = project_with_button()?;
    let before = project.read_file("components/ui/button.tsx")?;

    project
        .kitpm()
        .args(["update", "--ref", "v2", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"));

    assert_eq!(project.read_file("components/ui/button.tsx")?, before);
    assert_eq!(project.ledger()?["ref"].as_str(), Some("v1"));
    Ok(())
}

#[test]
fn test_update_not_installed_item() -> Result<()> {
    let project = project_with_button()?;

    project
        .kitpm()
        .args(["update", "input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Item 'input' is not installed"));
    Ok(())
}

#[test]
fn test_update_requires_ledger() -> Result<()> {
    let project = TestProject::new()?;

    project
        .kitpm()
        .arg("update")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No kitpm ledger found"))
        .stderr(predicate::str::contains("kitpm init"));
    Ok(())
}
