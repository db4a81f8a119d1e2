//! CLI subprocess integration tests.
//!
//! These tests invoke the `pkgmanager` binary as a subprocess. Every test
//! restricts itself to `custom` packages backed by marker files in a temp
//! directory, so no real package manager is ever touched.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new(manifest: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().display();
        std::fs::write(dir.path().join("packages.yaml"), manifest).unwrap();
        std::fs::write(
            dir.path().join("specs.yaml"),
            format!(
                "hello:\n  description: Says hello\n  shell: sh\n  check: test -f {d}/hello\n  install: touch {d}/hello\n  remove: rm {d}/hello\n\
                 stray:\n  shell: sh\n  check: test -f {d}/stray\n  install: touch {d}/stray\n  remove: rm {d}/stray\n\
                 broken:\n  shell: sh\n  check: 'false'\n  install: 'echo cannot build >&2; exit 3'\n"
            ),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pkgmanager"));
        cmd.env("PACKAGE_CONFIG", self.path("packages.yaml"))
            .env("PKGMANAGER_SPECS", self.path("specs.yaml"))
            .env("PKGMANAGER_PLATFORM", "linux")
            .env_remove("PACKAGE_LOCK")
            .env_remove("PKGMANAGER_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().unwrap()
    }

    fn touch(&self, marker: &str) {
        std::fs::write(self.path(marker), "").unwrap();
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("invalid JSON ({e}): {}", stdout(output)))
}

fn exists(path: &Path) -> bool {
    path.exists()
}

#[test]
fn cli_version_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_pkgmanager"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("pkgmanager"));
}

#[test]
fn cli_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_pkgmanager"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["sync", "install", "remove", "lock", "diff", "clean", "export"] {
        assert!(text.contains(command), "help must list '{command}': {text}");
    }
}

#[test]
fn cli_rejects_unknown_type() {
    let ws = Workspace::new("custom:\n  - hello\n");
    let output = ws.run(&["diff", "--type", "apt"]);
    assert!(!output.status.success());
}

#[test]
fn status_json_reports_paths_and_platform() {
    let ws = Workspace::new("custom:\n  - hello\n");
    let output = ws.run(&["--json", "status"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let v = json(&output);
    assert_eq!(v["platform"], "linux");
    assert_eq!(v["manifest_exists"], true);
    assert_eq!(v["lock_exists"], false);
    let custom = v["managers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["manager"] == "custom")
        .unwrap();
    assert_eq!(custom["available"], true);
    assert_eq!(custom["entries"], 1);
}

#[test]
fn sync_installs_then_is_a_no_op() {
    let ws = Workspace::new("custom:\n  - hello\n");

    let first = ws.run(&["--json", "sync", "--type", "custom"]);
    assert!(first.status.success(), "{}", stderr(&first));
    let v = json(&first);
    let results = v["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "hello");
    assert_eq!(results[0]["status"], "succeeded");
    assert!(exists(&ws.path("hello")));

    let second = ws.run(&["sync", "--type", "custom"]);
    assert!(second.status.success());
    assert!(stdout(&second).contains("nothing to do"));
}

#[test]
fn sync_dry_run_touches_nothing() {
    let ws = Workspace::new("custom:\n  - hello\n");
    let output = ws.run(&["--json", "sync", "--type", "custom", "--dry-run"]);
    assert!(output.status.success());
    let v = json(&output);
    assert_eq!(v["dry_run"], true);
    assert_eq!(v["results"][0]["status"], "planned");
    assert!(!exists(&ws.path("hello")));
}

#[test]
fn failing_install_exits_one() {
    let ws = Workspace::new("custom:\n  - broken\n  - hello\n");
    let output = ws.run(&["sync", "--type", "custom", "--continue-on-error"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("cannot build"), "{}", stdout(&output));
    assert!(exists(&ws.path("hello")));
}

#[test]
fn broken_manifest_exits_two() {
    let ws = Workspace::new("- just\n- a list\n");
    let output = ws.run(&["sync", "--type", "custom"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("manifest"));
}

#[test]
fn bad_timeout_exits_two() {
    let ws = Workspace::new("custom:\n  - hello\n");
    let output = ws
        .cmd()
        .env("PKGMANAGER_TIMEOUT", "soon")
        .args(["status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn locked_sync_without_lock_file_exits_two() {
    let ws = Workspace::new("custom:\n  - hello\n");
    let output = ws.run(&["sync", "--type", "custom", "--locked"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!exists(&ws.path("hello")));
}

#[test]
fn diff_reports_missing_and_untracked() {
    let ws = Workspace::new("custom:\n  - hello\n");
    ws.touch("stray");

    let output = ws.run(&["--json", "diff", "--type", "custom"]);
    assert_eq!(output.status.code(), Some(1));
    let v = json(&output);
    let custom = &v["managers"][0];
    assert_eq!(custom["manager"], "custom");
    assert_eq!(custom["missing"][0], "hello");
    assert_eq!(custom["untracked"][0]["name"], "stray");

    ws.touch("hello");
    std::fs::remove_file(ws.path("stray")).unwrap();
    let clean = ws.run(&["diff", "--type", "custom"]);
    assert!(clean.status.success());
    assert!(stdout(&clean).contains("no differences"));
}

#[test]
fn lock_then_locked_sync() {
    let ws = Workspace::new("custom:\n  - hello\n");
    ws.touch("hello");

    let output = ws.run(&["lock", "--type", "custom"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let lock = std::fs::read_to_string(ws.path("packages.lock.yaml")).unwrap();
    assert!(lock.contains("hello"), "{lock}");

    std::fs::remove_file(ws.path("hello")).unwrap();
    let output = ws.run(&["sync", "--type", "custom", "--locked"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(exists(&ws.path("hello")));
}

#[test]
fn install_and_remove_edit_the_manifest() {
    let ws = Workspace::new("general:\n  conda:\n    - python\n");

    let output = ws.run(&["install", "custom", "hello"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(exists(&ws.path("hello")));
    let manifest = std::fs::read_to_string(ws.path("packages.yaml")).unwrap();
    assert!(manifest.contains("hello"), "{manifest}");
    assert!(manifest.contains("python"), "{manifest}");

    let output = ws.run(&["remove", "hello", "--type", "custom"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(!exists(&ws.path("hello")));
    let manifest = std::fs::read_to_string(ws.path("packages.yaml")).unwrap();
    assert!(!manifest.contains("hello"), "{manifest}");
    assert!(manifest.contains("python"), "{manifest}");
}

#[test]
fn failed_install_leaves_manifest_alone() {
    let ws = Workspace::new("custom:\n  - hello\n");
    let before = std::fs::read_to_string(ws.path("packages.yaml")).unwrap();
    let output = ws.run(&["install", "custom", "broken"]);
    assert_eq!(output.status.code(), Some(1));
    let after = std::fs::read_to_string(ws.path("packages.yaml")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn clean_dry_run_then_yes() {
    let ws = Workspace::new("custom:\n  - hello\n");
    ws.touch("hello");
    ws.touch("stray");

    let output = ws.run(&["clean", "--type", "custom", "--dry-run"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("stray"));
    assert!(exists(&ws.path("stray")));

    let refused = ws.run(&["clean", "--type", "custom"]);
    assert_eq!(refused.status.code(), Some(1));
    assert!(exists(&ws.path("stray")));

    let output = ws.run(&["clean", "--type", "custom", "--yes"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(!exists(&ws.path("stray")));
    assert!(exists(&ws.path("hello")));
}

#[test]
fn export_writes_installed_custom_packages() {
    let ws = Workspace::new("custom:\n  - hello\n");
    ws.touch("hello");
    ws.touch("stray");

    let output = ws.run(&["export", "--type", "custom"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let yaml = stdout(&output);
    assert!(yaml.contains("custom:"), "{yaml}");
    assert!(yaml.contains("hello") && yaml.contains("stray"), "{yaml}");

    let target = ws.path("exported.yaml");
    let output = ws.run(&["export", "--type", "custom", "-o", target.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(std::fs::read_to_string(&target).unwrap().contains("stray"));
}

#[test]
fn search_and_show_custom_packages() {
    let ws = Workspace::new("custom:\n  - hello\n");
    let output = ws.run(&["--json", "search", "hello", "--type", "custom"]);
    assert!(output.status.success());
    let v = json(&output);
    assert_eq!(v["results"][0]["items"][0]["name"], "hello");

    let missing = ws.run(&["show", "hello", "--type", "custom"]);
    assert_eq!(missing.status.code(), Some(1));

    ws.touch("hello");
    let output = ws.run(&["--json", "show", "hello"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let v = json(&output);
    assert_eq!(v["manager"], "custom");
    assert_eq!(v["tracked"], true);
    assert_eq!(v["details"]["summary"], "Says hello");
}

#[test]
fn list_marks_tracked_packages() {
    let ws = Workspace::new("custom:\n  - hello\n");
    ws.touch("hello");
    ws.touch("stray");
    let output = ws.run(&["--json", "list", "--type", "custom"]);
    assert!(output.status.success());
    let v = json(&output);
    let items = v["results"][0]["items"].as_array().unwrap();
    let tracked: Vec<_> = items
        .iter()
        .map(|p| (p["name"].as_str().unwrap(), p["tracked"].as_bool().unwrap()))
        .collect();
    assert_eq!(tracked, vec![("hello", true), ("stray", false)]);
}
