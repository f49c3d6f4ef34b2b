use std::path::Path;
use std::process::{Command, Output};

use serde_json::json;

/// A configuration tree on disk, laid out the way the host serves it
struct TestTree {
    dir: tempfile::TempDir,
}

impl TestTree {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(
            dir.path().join("settings.toml"),
            "[logging]\nlevel = \"debug\"\nformat = \"compact\"\n",
        )
        .unwrap();
        Self { dir }
    }

    fn write(&self, path: &str, value: serde_json::Value) -> &Self {
        std::fs::write(self.dir.path().join(path), value.to_string()).unwrap();
        self
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn modhost(&self, args: &[&str]) -> Output {
        let bin_path = env!("CARGO_BIN_EXE_modhost");
        let settings = self.root().join("settings.toml");

        Command::new(bin_path)
            .arg("--settings")
            .arg(&settings)
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run modhost")
    }

    fn run(&self) -> Output {
        let root = self.root().to_str().unwrap().to_string();
        self.modhost(&["run", "--source", &root])
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn with_builtin_remotes(tree: &TestTree) -> &TestTree {
    tree.write(
        "remotes.json",
        json!({
            "heartbeat": "builtin://heartbeat",
            "gatekeeper": "builtin://gatekeeper"
        }),
    )
}

#[test]
fn test_failed_ready_does_not_stop_post_init() {
    let tree = TestTree::new();
    with_builtin_remotes(&tree)
        .write("config/modules.json", json!({ "modules": ["heartbeat", "gatekeeper"] }))
        .write("config/module-heartbeat.json", json!({ "id": "heartbeat", "remoteName": "heartbeat", "enabled": true, "interval": 5 }))
        .write("config/module-gatekeeper.json", json!({ "id": "gatekeeper", "remoteName": "gatekeeper", "enabled": true, "deny": true }));

    let output = tree.run();
    let out = stdout(&output);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(out.contains("setup heartbeat ok"));
    assert!(out.contains("ready heartbeat ok"));
    assert!(out.contains("ready gatekeeper failed: access denied by host configuration"));
    assert!(out.contains("postInit gatekeeper ok"));
    assert!(out.contains("2 module(s) initialized, 1 failure(s)"));

    let setup = out.find("setup heartbeat").unwrap();
    let configure = out.find("configure heartbeat").unwrap();
    let post_init = out.find("postInit heartbeat").unwrap();
    assert!(setup < configure && configure < post_init);
}

#[test]
fn test_disabled_and_unreachable_modules_are_skipped() {
    let tree = TestTree::new();
    with_builtin_remotes(&tree)
        .write("config/modules.json", json!({ "modules": ["heartbeat", "gatekeeper", "missing"] }))
        .write("config/module-heartbeat.json", json!({ "id": "heartbeat", "enabled": true }))
        .write("config/module-gatekeeper.json", json!({ "id": "gatekeeper", "enabled": false }));

    let output = tree.run();
    let out = stdout(&output);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(out.contains("setup heartbeat ok"));
    assert!(!out.contains("gatekeeper"));
    assert!(out.contains("1 module(s) initialized, 0 failure(s)"));
    assert!(stderr(&output).contains("Config file not found"));
}

#[test]
fn test_missing_manifest_leaves_host_inert() {
    let tree = TestTree::new();
    with_builtin_remotes(&tree);

    let output = tree.run();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("0 module(s) initialized, 0 failure(s)"));
}

#[test]
fn test_undeclared_remote_is_not_loaded() {
    let tree = TestTree::new();
    tree.write("remotes.json", json!({ "heartbeat": "builtin://heartbeat" }))
        .write("config/modules.json", json!({ "modules": ["gatekeeper"] }))
        .write("config/module-gatekeeper.json", json!({ "id": "gatekeeper", "enabled": true }));

    let output = tree.run();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("0 module(s) initialized"));
    assert!(stderr(&output).contains("remote gatekeeper is not registered"));
}

#[test]
fn test_missing_remotes_manifest_fails() {
    let tree = TestTree::new();
    tree.write("config/modules.json", json!({ "modules": [] }));

    let output = tree.run();
    assert!(!output.status.success());
}

#[test]
fn test_discover_lists_enabled_configs() {
    let tree = TestTree::new();
    tree.write("config/modules.json", json!({ "modules": ["a", "b"] }))
        .write("config/module-a.json", json!({ "id": "a", "remoteName": "remote-a", "enabled": true }))
        .write("config/module-b.json", json!({ "id": "b", "enabled": false }));

    let root = tree.root().to_str().unwrap().to_string();
    let output = tree.modhost(&["discover", "--source", &root]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "a\tremote-a\n");
}

#[test]
fn test_phases_command() {
    let tree = TestTree::new();
    let output = tree.modhost(&["phases"]);
    let out = stdout(&output);

    let hooks: Vec<&str> = out
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(hooks, ["onSetup", "onConfigure", "onInitialize", "onReady", "onPostInit"]);
}
