// tests/provision.rs

//! End-to-end provisioning runs with a fake package manager.

mod common;

use common::{FIX_X, FIX_Y, FakeManager, Fixture, LIBX_ORIGINAL, NoHistory, STALE, StaticRevision};
use patchbay::{Error, MismatchKind, Provisioner, ProgressMode, RunState, Stage, Warning};
use std::process::Command;

fn provisioner<'a>(
    fixture: &Fixture,
    manager: &'a FakeManager,
    revision: &'a StaticRevision,
) -> Provisioner<'a> {
    Provisioner::new(fixture.plan(), fixture.env(), manager, revision)
        .with_progress(ProgressMode::Silent)
}

#[test]
fn test_foundational_package_installed_first() {
    let fixture = Fixture::new()
        .package("web-admin", 4)
        .package("server", 2)
        .package("scheduler", 3)
        .package("cli", 1)
        .package("common", 0);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    run.run().unwrap();

    assert_eq!(
        manager.local_attempts(),
        ["common", "cli", "server", "scheduler", "web-admin"]
    );
    // Prerequisite before everything else
    assert_eq!(manager.calls.borrow()[0], "pinned:setuptools==57.5.0");
    assert_eq!(run.report().installed[0], "common");
}

#[test]
fn test_fatal_patch_applied_twice_fails() {
    let fixture = Fixture::new()
        .package("common", 0)
        .patch("fix-x", FIX_X, false)
        .patch("fix-x-again", FIX_X, false);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    let err = run.run().unwrap_err();

    assert!(matches!(err, Error::PatchApplicationFailed { ref patch_name, .. } if patch_name == "fix-x-again"));
    assert!(matches!(
        run.state(),
        RunState::Failed {
            stage: Stage::Patches,
            ..
        }
    ));
    assert_eq!(run.report().applied.len(), 1);
    assert_eq!(fixture.read_libx(), "x = 2\ny = 1\n");
}

#[test]
fn test_tolerant_patch_applied_twice_is_skipped() {
    let fixture = Fixture::new()
        .package("common", 0)
        .patch("fix-x", FIX_X, true)
        .patch("fix-x-again", FIX_X, true);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    run.run().unwrap();

    let report = run.into_report();
    assert!(report.succeeded());
    assert_eq!(report.skipped(), ["fix-x-again"]);
    assert!(report.warnings.contains(&Warning::PatchSkipped {
        patch_name: "fix-x-again".to_string(),
        file: "libx/mod.py".into(),
        reason: MismatchKind::AlreadyApplied,
    }));
}

#[test]
fn test_install_failure_prevents_patching() {
    let fixture = Fixture::new()
        .package("common", 0)
        .package("cli", 1)
        .package("server", 2)
        .package("scheduler", 3)
        .package("web-admin", 4)
        .patch("fix-x", FIX_X, false);
    let manager = FakeManager::failing_on("server");
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    let err = run.run().unwrap_err();

    assert!(matches!(err, Error::DependencyInstallFailed { ref package, .. } if package == "server"));
    assert_eq!(manager.local_attempts(), ["common", "cli", "server"]);
    assert_eq!(run.report().installed, ["common", "cli"]);
    assert!(run.report().applied.is_empty());
    assert!(matches!(
        run.state(),
        RunState::Failed {
            stage: Stage::Packages,
            ..
        }
    ));

    // Patch target untouched, nothing after the installer ran
    assert_eq!(fixture.read_libx(), LIBX_ORIGINAL);
    assert!(!fixture.venv().join("bin/py").exists());
}

#[test]
fn test_revision_file_replaced_not_appended() {
    let fixture = Fixture::new().package("common", 0);
    let revision_file = fixture.root().join("release-info/revision.txt");
    std::fs::create_dir_all(revision_file.parent().unwrap()).unwrap();
    std::fs::write(&revision_file, "ffffffffffffffffffffffffffffffffffffffff\n").unwrap();

    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");
    provisioner(&fixture, &manager, &revision).run().unwrap();

    assert_eq!(std::fs::read_to_string(&revision_file).unwrap(), "abc123");
}

#[test]
fn test_failing_second_patch_keeps_installs() {
    let fixture = Fixture::new()
        .package("dependent", 1)
        .package("foundational", 0)
        .patch("first", FIX_X, false)
        .patch("second", STALE, false);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    let err = run.run().unwrap_err();

    match err {
        Error::PatchApplicationFailed { patch_name, reason } => {
            assert_eq!(patch_name, "second");
            assert!(reason.contains("context does not match"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(fixture.importable("foundational"));
    assert!(fixture.importable("dependent"));
    assert_eq!(fixture.read_libx(), "x = 2\ny = 1\n");
}

#[test]
fn test_patches_build_on_each_other() {
    let fixture = Fixture::new()
        .package("common", 0)
        .patch("fix-x", FIX_X, false)
        .patch("fix-y", FIX_Y, false);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    run.run().unwrap();

    assert_eq!(fixture.read_libx(), "x = 2\ny = 2\n");
    let names: Vec<&str> = run.report().applied.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["fix-x", "fix-y"]);
}

#[test]
fn test_run_is_not_repeatable() {
    let fixture = Fixture::new().package("common", 0);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    run.run().unwrap();

    let err = run.run().unwrap_err();
    assert!(matches!(err, Error::IllegalTransition { .. }));
    assert_eq!(*run.state(), RunState::Completed);
}

#[test]
fn test_artifacts_written() {
    let fixture = Fixture::new().package("common", 0);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    run.run().unwrap();

    let extra = fixture.root().join("extra_paths").canonicalize().unwrap();
    let pth = std::fs::read_to_string(fixture.site_packages().join("extra_paths.pth")).unwrap();
    assert_eq!(pth.trim_end(), extra.to_string_lossy());

    let alias = std::fs::read_link(fixture.root().join("eggs")).unwrap();
    assert_eq!(alias, fixture.env().site_packages);

    let launcher = std::fs::read_to_string(fixture.venv().join("bin/py")).unwrap();
    assert!(launcher.contains("exec -a \"$0\""));
    assert_eq!(run.report().artifacts.len(), 4);
}

#[test]
fn test_alias_failure_does_not_stop_run() {
    let fixture = Fixture::new()
        .package("common", 0)
        .patch("fix-x", FIX_X, false);
    std::fs::create_dir_all(fixture.root().join("eggs/keep")).unwrap();
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    run.run().unwrap();

    let report = run.report();
    assert!(report.succeeded());
    assert!(matches!(
        report.warnings.as_slice(),
        [Warning::AliasCreationWarning { .. }]
    ));
    assert_eq!(report.applied.len(), 1);
}

#[test]
fn test_disabled_artifacts_are_skipped() {
    let fixture = Fixture::new()
        .with_toml("[environment]\nalias = \"\"\nextra_paths = \"\"\nlauncher = \"\"\n")
        .package("common", 0);
    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");

    provisioner(&fixture, &manager, &revision).run().unwrap();

    assert!(!fixture.root().join("eggs").exists());
    assert!(!fixture.root().join("extra_paths").exists());
    assert!(!fixture.venv().join("bin/py").exists());
}

#[test]
fn test_missing_package_directory_is_precondition_error() {
    let fixture = Fixture::new().package("common", 0);
    let plan = fixture.plan();
    std::fs::remove_dir_all(fixture.root().join("code/common")).unwrap();

    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");
    let mut run = Provisioner::new(plan, fixture.env(), &manager, &revision)
        .with_progress(ProgressMode::Silent);

    let err = run.run().unwrap_err();
    assert!(matches!(err, Error::PreconditionError(_)));
    assert!(manager.calls.borrow().is_empty());
    assert!(!fixture.root().join("release-info/revision.txt").exists());
}

#[test]
fn test_concurrent_run_is_rejected() {
    let fixture = Fixture::new().package("common", 0);
    let _held = fixture.env().lock().unwrap();

    let manager = FakeManager::default();
    let revision = StaticRevision("abc123");
    let err = provisioner(&fixture, &manager, &revision).run().unwrap_err();

    assert!(matches!(err, Error::PreconditionError(_)));
    assert!(manager.calls.borrow().is_empty());
}

#[test]
fn test_report_serializes_failure() {
    let fixture = Fixture::new()
        .package("common", 0)
        .package("server", 1);
    let manager = FakeManager::failing_on("common");
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    assert!(run.run().is_err());

    let json = serde_json::to_value(run.report()).unwrap();
    assert_eq!(json["state"]["state"], "failed");
    assert_eq!(json["state"]["stage"], "packages");
    assert_eq!(json["revision"], "abc123");
    assert_eq!(json["error"], "DependencyInstallFailed");
    assert_eq!(manager.local_attempts(), ["common"]);
}

fn assert_stopped_before_local_installs(
    run: &Provisioner<'_>,
    manager: &FakeManager,
    fixture: &Fixture,
    expected: Stage,
) {
    match run.state() {
        RunState::Failed { stage, .. } => assert_eq!(*stage, expected),
        other => panic!("unexpected state: {}", other),
    }
    assert!(manager.local_attempts().is_empty());
    assert!(run.report().installed.is_empty());
    assert!(run.report().applied.is_empty());
    assert_eq!(fixture.read_libx(), LIBX_ORIGINAL);
    assert!(!fixture.venv().join("bin/py").exists());
}

#[test]
fn test_prerequisite_failure_stops_run() {
    let fixture = Fixture::new()
        .package("common", 0)
        .package("server", 1)
        .patch("fix-x", FIX_X, false);
    let manager = FakeManager::failing_prerequisite();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    let err = run.run().unwrap_err();

    match err {
        Error::PrerequisiteInstallFailed { package, reason } => {
            assert_eq!(package, "setuptools==57.5.0");
            assert!(reason.contains("No matching distribution"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(*manager.calls.borrow(), ["pinned:setuptools==57.5.0"]);
    assert_eq!(run.report().error, Some("PrerequisiteInstallFailed"));
    assert_stopped_before_local_installs(&run, &manager, &fixture, Stage::Prerequisite);
}

#[test]
fn test_requirements_failure_stops_run() {
    let fixture = Fixture::new()
        .requirements("gunicorn==20.1.0\nrequests==2.25.1\n")
        .package("common", 0)
        .patch("fix-x", FIX_X, false);
    let manager = FakeManager::failing_manifest();
    let revision = StaticRevision("abc123");

    let mut run = provisioner(&fixture, &manager, &revision);
    let err = run.run().unwrap_err();

    assert!(matches!(err, Error::RequirementsInstallFailed { .. }));
    assert_eq!(
        *manager.calls.borrow(),
        ["pinned:setuptools==57.5.0", "manifest:2"]
    );
    assert_stopped_before_local_installs(&run, &manager, &fixture, Stage::Requirements);
}

#[test]
fn test_missing_history_stops_run_before_installs() {
    let fixture = Fixture::new()
        .package("common", 0)
        .patch("fix-x", FIX_X, false);
    let manager = FakeManager::default();

    let mut run = Provisioner::new(fixture.plan(), fixture.env(), &manager, &NoHistory)
        .with_progress(ProgressMode::Silent);
    let err = run.run().unwrap_err();

    assert!(matches!(err, Error::VcsUnavailable(_)));
    assert!(manager.calls.borrow().is_empty());
    assert!(run.report().revision.is_none());
    assert!(!fixture.root().join("release-info/revision.txt").exists());
    assert_stopped_before_local_installs(&run, &manager, &fixture, Stage::Provenance);
}

#[test]
fn test_git_revision_recorded() {
    let Ok(git) = patchbay::GitCli::locate() else {
        eprintln!("Skipping git test: git not on PATH");
        return;
    };

    let fixture = Fixture::new().package("common", 0);
    let root = fixture.root();
    let git_cmd = |args: &[&str]| {
        let output = Command::new("git")
            .args(["-c", "user.name=patchbay", "-c", "user.email=patchbay@example.com"])
            .args(args)
            .current_dir(&root)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8(output.stdout).unwrap()
    };
    git_cmd(&["init", "-q"]);
    git_cmd(&["commit", "-q", "--allow-empty", "-m", "initial"]);
    let head = git_cmd(&["rev-parse", "HEAD"]).trim().to_string();

    let manager = FakeManager::default();
    let mut run = Provisioner::new(fixture.plan(), fixture.env(), &manager, &git)
        .with_progress(ProgressMode::Silent);
    run.run().unwrap();

    let stamp = std::fs::read_to_string(root.join("release-info/revision.txt")).unwrap();
    assert_eq!(stamp, head);
}
