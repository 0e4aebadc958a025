//! Integration tests for `init`, `list`, `remove`, `tree`, `diff` and `migrate`.

use crate::common::{FixtureItem, TestProject, starter_kit};
use anyhow::Result;
use predicates::prelude::*;

// ============================================================================
// init
// ============================================================================

#[test]
fn test_init_writes_current_schema() -> Result<()> {
    let project = TestProject::new()?;
    project.init("v1")?;

    let ledger = project.ledger()?;
    assert_eq!(ledger["schema_version"].as_integer(), Some(2));
    assert_eq!(ledger["ref"].as_str(), Some("v1"));
    assert_eq!(ledger["import_style"].as_str(), Some("alias"));
    assert_eq!(ledger["aliases"]["primitives"].as_str(), Some("components/ui"));
    Ok(())
}

#[test]
fn test_init_refuses_to_overwrite() -> Result<()> {
    let project = TestProject::new()?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["init", "--ref", "v2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    project.kitpm().args(["init", "--ref", "v2", "--force"]).assert().success();
    assert_eq!(project.ledger()?["ref"].as_str(), Some("v2"));
    Ok(())
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_json() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;
    project.kitpm().args(["add", "button"]).assert().success();

    let output = project.kitpm().args(["list", "--format", "json"]).output()?;
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(listing["ref"], "v1");
    let installed = listing["installed"].as_array().unwrap();
    assert_eq!(installed.len(), 2);
    let button = installed.iter().find(|i| i["name"] == "button").expect("button listed");
    assert_eq!(button["version"], "v1");
    assert_eq!(button["modified"], false);
    assert_eq!(button["files"][0], "components/ui/button.tsx");
    Ok(())
}

#[test]
fn test_list_text_and_empty() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project.kitpm().arg("list").assert().success().stdout(predicate::str::contains("No items installed"));

    project.kitpm().args(["add", "input"]).assert().success();
    project
        .kitpm()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("input"))
        .stdout(predicate::str::contains("shared/utils"));

    project
        .kitpm()
        .args(["list", "--modified"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No items installed"));
    Ok(())
}

// ============================================================================
// remove
// ============================================================================

#[test]
fn test_remove_deletes_files_and_entry() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;
    project.kitpm().args(["add", "button"]).assert().success();

    project
        .kitpm()
        .args(["remove", "button"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed button"));

    assert!(!project.file_exists("components/ui/button.tsx"));
    assert!(project.ledger_entry("button")?.is_none());
    assert!(project.ledger_entry("shared/utils")?.is_some());
    Ok(())
}

#[test]
fn test_remove_keeps_edited_files() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;
    project.kitpm().args(["add", "input"]).assert().success();
    project.write_file("components/ui/input.tsx", "// mine now\n")?;

    project
        .kitpm()
        .args(["remove", "input"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edited locally"));

    assert_eq!(project.read_file("components/ui/input.tsx")?, "// mine now\n");
    assert!(project.ledger_entry("input")?.is_none());
    Ok(())
}

#[test]
fn test_remove_force_deletes_edited_files() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;
    project.kitpm().args(["add", "input"]).assert().success();
    project.write_file("components/ui/input.tsx", "// mine now\n")?;

    project.kitpm().args(["remove", "input", "--force"]).assert().success();

    assert!(!project.file_exists("components/ui/input.tsx"));
    Ok(())
}

#[test]
fn test_remove_warns_about_dependents() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;
    project.kitpm().args(["add", "patterns/login-form"]).assert().success();

    project
        .kitpm()
        .args(["remove", "button"])
        .assert()
        .success()
        .stdout(predicate::str::contains("button is still used by patterns/login-form"));
    Ok(())
}

#[test]
fn test_remove_not_installed() -> Result<()> {
    let project = TestProject::new()?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["remove", "button"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Item 'button' is not installed"));
    Ok(())
}

// ============================================================================
// tree
// ============================================================================

#[test]
fn test_tree_shows_transitive_dependencies() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["tree", "patterns/login-form"])
        .assert()
        .success()
        .stdout(predicate::str::contains("patterns/login-form"))
        .stdout(predicate::str::contains("button"))
        .stdout(predicate::str::contains("input"))
        .stdout(predicate::str::contains("shared/utils"))
        .stdout(predicate::str::contains("3 dependencies in total"));
    Ok(())
}

#[test]
fn test_tree_marks_missing_and_cycles() -> Result<()> {
    let project = TestProject::new()?;
    project.publish(
        "v1",
        &[
            FixtureItem::new("tabs").depends_on(&["tab-panel", "shared/ghost"]),
            FixtureItem::new("tab-panel").depends_on(&["tabs"]),
        ],
    )?;
    project.init("v1")?;

    project
        .kitpm()
        .args(["tree", "tabs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shared/ghost (missing)"))
        .stdout(predicate::str::contains("(circular reference)"));
    Ok(())
}

// ============================================================================
// diff
// ============================================================================

#[test]
fn test_diff_shows_local_edits() -> Result<()> {
    let project = TestProject::new()?;
    project.publish("v1", &starter_kit())?;
    project.init("v1")?;
    project.kitpm().args(["add", "input"]).assert().success();

    project
        .kitpm()
        .args(["diff", "input"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No differences from v1"));

    let original = project.read_file("components/ui/input.tsx")?;
    project.write_file("components/ui/input.tsx", &original.replace("\"input\"", "\"field\""))?;

    project
        .kitpm()
        .args(["diff", "input"])
        .assert()
        .success()
        .stdout(predicate::str::contains("locally modified"))
        .stdout(predicate::str::contains("-  return <input className={cn(\"field\")} />;"))
        .stdout(predicate::str::contains("+  return <input className={cn(\"input\")} />;"));

    // Nothing was written
    assert!(project.read_file("components/ui/input.tsx")?.contains("\"field\""));
    Ok(())
}

// ============================================================================
// migrate
// ============================================================================

#[test]
fn test_migrate_legacy_ledger() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file(
        "kitpm.toml",
        r#"ref = "v1"
team = "design-systems"

[[installed]]
name = "button"
version = "v1"
installed_at = "2025-01-10T08:00:00Z"
"#,
    )?;

    project
        .kitpm()
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Migrated"))
        .stdout(predicate::str::contains("schema_version"));

    let ledger = project.ledger()?;
    assert_eq!(ledger["schema_version"].as_integer(), Some(2));
    assert_eq!(ledger["ref"].as_str(), Some("v1"));
    assert_eq!(ledger["team"].as_str(), Some("design-systems"));
    assert!(ledger.contains_key("aliases"));
    let entry = project.ledger_entry("button")?.expect("button entry");
    assert_eq!(entry["modified"].as_bool(), Some(false));

    project
        .kitpm()
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("already at schema version 2"));
    Ok(())
}

#[test]
fn test_newer_ledger_is_rejected() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("kitpm.toml", "schema_version = 99\nref = \"v1\"\n")?;

    project
        .kitpm()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("newer than supported"));
    Ok(())
}
