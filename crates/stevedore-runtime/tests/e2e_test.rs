//! End-to-end tests for the Stevedore runtime.
//!
//! These tests drive the full start/cleanup pipeline against an on-disk
//! image catalog and directory storage driver:
//! 1. Layer chain resolution (ordering, reference balance)
//! 2. Network mode dispatch through assembly
//! 3. Isolation-dependent mount lifecycle
//! 4. Failure handling (mount, assembly, driver, unmount)

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::{Arc, Mutex};

use stevedore_common::config::DaemonConfig;
use stevedore_common::error::{LayerAction, Result, StevedoreError};
use stevedore_common::types::{ContainerId, ContainerState, ImageId, IsolationMode};
use stevedore_core::filesystem::ContainerFilesystem;
use stevedore_image::driver::DirectoryDriver;
use stevedore_image::graph::{CatalogGraph, ImageNode};
use stevedore_runtime::backend::{DryRunDriver, ExecDriver};
use stevedore_runtime::config::{ContainerConfig, HostConfig};
use stevedore_runtime::container::Container;
use stevedore_runtime::engine::Engine;
use stevedore_runtime::launch::LaunchSpec;
use stevedore_runtime::lifecycle::CleanupOutcome;

// ── Fixtures ─────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingFs {
    mounts: usize,
    unmounts: usize,
    fail_mount: bool,
    fail_unmount: bool,
}

impl ContainerFilesystem for RecordingFs {
    fn mount(&mut self) -> Result<()> {
        self.mounts += 1;
        if self.fail_mount {
            return Err(StevedoreError::Unsupported {
                operation: "overlay mount",
            });
        }
        Ok(())
    }

    fn unmount(&mut self) -> Result<()> {
        self.unmounts += 1;
        if self.fail_unmount {
            return Err(StevedoreError::Config {
                message: "device busy".into(),
            });
        }
        Ok(())
    }
}

/// Execution driver that remembers the last spec it was given.
struct CapturingDriver {
    last: Arc<Mutex<Option<LaunchSpec>>>,
    fail: bool,
}

impl ExecDriver for CapturingDriver {
    fn name(&self) -> &'static str {
        "capturing"
    }

    fn run(&self, spec: &LaunchSpec) -> Result<u32> {
        *self.last.lock().unwrap() = Some(spec.clone());
        if self.fail {
            return Err(StevedoreError::Config {
                message: "launcher unavailable".into(),
            });
        }
        Ok(4242)
    }
}

struct World {
    _dir: tempfile::TempDir,
    engine: Engine<CatalogGraph, DirectoryDriver>,
}

/// Builds a catalog chain `l0 <- l1 <- ... <- l{depth-1}` with every layer on disk.
fn world(depth: usize, exec: Box<dyn ExecDriver>) -> World {
    let dir = tempfile::tempdir().expect("tempdir");
    let graph = CatalogGraph::open(dir.path()).expect("catalog");
    let driver = DirectoryDriver::open("dir", dir.path().join("storage")).expect("driver");
    for i in 0..depth {
        let node = if i == 0 {
            ImageNode::root("l0")
        } else {
            ImageNode::child(format!("l{i}"), format!("l{}", i - 1))
        };
        let _ = driver.create_layer(&node.id).expect("layer");
        graph.register(node).expect("register");
    }
    let config = DaemonConfig {
        data_dir: dir.path().to_path_buf(),
        ..DaemonConfig::default()
    };
    World {
        engine: Engine::new(graph, driver, exec, config),
        _dir: dir,
    }
}

fn container(world: &World, leaf: Option<&str>, isolation: IsolationMode) -> Container {
    let id = ContainerId::new("c1");
    let _ = world
        .engine
        .driver()
        .create_container_folder(&id)
        .expect("folder");
    Container::new(
        id,
        "app",
        ContainerConfig {
            cmd: vec!["cmd.exe".into(), "/c".into(), "echo hi".into()],
            env: vec!["GREETING=hi".into()],
            image: leaf.map(ImageId::new),
            mac_address: "00:15:5d:00:00:01".into(),
            hostname: "app".into(),
            ..ContainerConfig::default()
        },
        HostConfig {
            isolation,
            ..HostConfig::default()
        },
        "/run/stevedore/c1/rootfs",
    )
}

fn leaf_of(depth: usize) -> String {
    format!("l{}", depth - 1)
}

// ── Layer resolution ─────────────────────────────────────────────────

#[test]
fn pipeline_layer_paths_are_leaf_to_root() {
    for depth in [1, 2, 5] {
        let w = world(depth, Box::new(DryRunDriver));
        let leaf = leaf_of(depth);
        let c = container(&w, Some(&leaf), IsolationMode::Process);

        let spec = w.engine.assemble(&c).expect("assemble");
        let expected: Vec<_> = (0..depth)
            .rev()
            .map(|i| {
                w.engine
                    .driver()
                    .layer_path(&ImageId::new(format!("l{i}")))
                    .expect("path")
            })
            .collect();
        assert_eq!(spec.layer_paths, expected);
    }
}

#[test]
fn pipeline_references_balance_after_assembly() {
    let w = world(4, Box::new(DryRunDriver));
    let c = container(&w, Some("l3"), IsolationMode::Process);
    let _ = w.engine.assemble(&c).expect("assemble");
    for i in 0..4 {
        assert_eq!(
            w.engine.driver().references(&ImageId::new(format!("l{i}"))),
            0
        );
    }
}

#[test]
fn pipeline_missing_layer_aborts_with_driver_and_layer() {
    let w = world(3, Box::new(DryRunDriver));
    let l1 = w.engine.driver().layer_path(&ImageId::new("l1")).expect("path");
    std::fs::remove_dir_all(l1).expect("rm");
    let c = container(&w, Some("l2"), IsolationMode::Process);

    match w.engine.assemble(&c).unwrap_err() {
        StevedoreError::LayerResolutionFailed {
            driver,
            layer,
            action,
            ..
        } => {
            assert_eq!(driver, "dir");
            assert_eq!(layer, "l1");
            assert_eq!(action, LayerAction::Get);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(w.engine.driver().references(&ImageId::new("l2")), 0);
}

#[test]
fn pipeline_unknown_leaf_image_fails_lookup() {
    let w = world(1, Box::new(DryRunDriver));
    let c = container(&w, Some("ghost"), IsolationMode::Process);
    assert!(matches!(
        w.engine.assemble(&c),
        Err(StevedoreError::ImageLookupFailed { .. })
    ));
}

#[test]
fn pipeline_container_without_image_has_no_layers() {
    let w = world(2, Box::new(DryRunDriver));
    let c = container(&w, None, IsolationMode::Process);
    assert!(w.engine.assemble(&c).expect("assemble").layer_paths.is_empty());
}

#[test]
fn pipeline_assembly_is_deterministic() {
    let w = world(3, Box::new(DryRunDriver));
    let c = container(&w, Some("l2"), IsolationMode::HyperV);
    assert_eq!(
        w.engine.assemble(&c).expect("first"),
        w.engine.assemble(&c).expect("second")
    );
}

// ── Network ──────────────────────────────────────────────────────────

#[test]
fn pipeline_network_modes() {
    let w = world(1, Box::new(DryRunDriver));
    let mut c = container(&w, Some("l0"), IsolationMode::Process);

    c.host_config.network_mode = "none".into();
    assert!(w.engine.assemble(&c).expect("none").network.is_none());

    c.host_config.network_mode = "default".into();
    let default = w.engine.assemble(&c).expect("default").network;
    let iface = default
        .clone()
        .and_then(|n| n.interface)
        .expect("interface");
    assert_eq!(iface.mac_address, "00:15:5d:00:00:01");
    assert_eq!(iface.bridge, "Virtual Switch");

    c.host_config.network_mode = String::new();
    assert_eq!(w.engine.assemble(&c).expect("empty").network, default);

    c.config.network_disabled = true;
    let disabled = w.engine.assemble(&c).expect("disabled").network;
    assert!(disabled.expect("descriptor").interface.is_none());

    c.host_config.network_mode = "bogus-mode".into();
    match w.engine.assemble(&c).unwrap_err() {
        StevedoreError::InvalidNetworkMode { mode } => assert_eq!(mode, "bogus-mode"),
        other => panic!("unexpected error: {other}"),
    }
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[test]
fn pipeline_process_isolation_mounts_and_unmounts_once() {
    let w = world(2, Box::new(DryRunDriver));
    let mut c = container(&w, Some("l1"), IsolationMode::Process);
    let mut fs = RecordingFs::default();

    let _ = w.engine.start(&mut c, &mut fs).expect("start");
    assert_eq!(c.state, ContainerState::Running);
    let outcome = w.engine.cleanup(&mut c, &mut fs).expect("cleanup");

    assert!(matches!(outcome, CleanupOutcome::Unmounted));
    assert_eq!((fs.mounts, fs.unmounts), (1, 1));
    assert_eq!(c.state, ContainerState::Stopped);
}

#[test]
fn pipeline_hypervisor_isolation_never_mounts() {
    let w = world(2, Box::new(DryRunDriver));
    let mut c = container(&w, Some("l1"), IsolationMode::HyperV);
    let mut fs = RecordingFs::default();

    let _ = w.engine.start(&mut c, &mut fs).expect("start");
    let outcome = w.engine.cleanup(&mut c, &mut fs).expect("cleanup");

    assert!(matches!(outcome, CleanupOutcome::Skipped));
    assert_eq!((fs.mounts, fs.unmounts), (0, 0));
}

#[test]
fn pipeline_unmount_failure_does_not_block_cleanup() {
    let w = world(1, Box::new(DryRunDriver));
    let mut c = container(&w, Some("l0"), IsolationMode::Process);
    let mut fs = RecordingFs {
        fail_unmount: true,
        ..RecordingFs::default()
    };

    let _ = w.engine.start(&mut c, &mut fs).expect("start");
    let outcome = w.engine.cleanup(&mut c, &mut fs).expect("cleanup completes");

    assert!(matches!(
        outcome.error(),
        Some(StevedoreError::UnmountFailed { .. })
    ));
    assert_eq!(c.state, ContainerState::Stopped);
}

#[test]
fn pipeline_mount_failure_fails_start_without_launch() {
    let launched = Arc::new(Mutex::new(None));
    let exec = CapturingDriver {
        last: Arc::clone(&launched),
        fail: false,
    };
    let w = world(1, Box::new(exec));
    let mut c = container(&w, Some("l0"), IsolationMode::Process);
    let mut fs = RecordingFs {
        fail_mount: true,
        ..RecordingFs::default()
    };

    let err = w.engine.start(&mut c, &mut fs).unwrap_err();
    assert!(matches!(err, StevedoreError::MountFailed { .. }));
    assert_eq!(c.state, ContainerState::Failed);
    assert_eq!(fs.unmounts, 0);
    assert!(launched.lock().unwrap().is_none());
}

#[test]
fn pipeline_failed_assembly_unmounts_prepared_filesystem() {
    let w = world(1, Box::new(DryRunDriver));
    let mut c = container(&w, Some("l0"), IsolationMode::Process);
    c.host_config.network_mode = "bogus-mode".into();
    let mut fs = RecordingFs::default();

    assert!(w.engine.start(&mut c, &mut fs).is_err());
    assert_eq!((fs.mounts, fs.unmounts), (1, 1));
    assert_eq!(c.state, ContainerState::Failed);
}

#[test]
fn pipeline_driver_failure_unmounts_and_allows_retry() {
    let launched = Arc::new(Mutex::new(None));
    let exec = CapturingDriver {
        last: Arc::clone(&launched),
        fail: true,
    };
    let w = world(1, Box::new(exec));
    let mut c = container(&w, Some("l0"), IsolationMode::Process);
    let mut fs = RecordingFs::default();

    assert!(w.engine.start(&mut c, &mut fs).is_err());
    assert_eq!((fs.mounts, fs.unmounts), (1, 1));
    assert!(launched.lock().unwrap().is_some());
    assert!(!c.has_been_started_before());
    c.begin_start().expect("failed container may be started again");
}

#[test]
fn pipeline_first_start_flag_follows_history() {
    let w = world(1, Box::new(DryRunDriver));
    let mut c = container(&w, Some("l0"), IsolationMode::HyperV);
    let mut fs = RecordingFs::default();

    assert!(w.engine.assemble(&c).expect("assemble").first_start);
    let _ = w.engine.start(&mut c, &mut fs).expect("start");
    let _ = w.engine.cleanup(&mut c, &mut fs).expect("cleanup");
    assert!(!w.engine.assemble(&c).expect("assemble").first_start);
}

#[test]
fn pipeline_cleanup_without_start_is_rejected() {
    let w = world(1, Box::new(DryRunDriver));
    let mut c = container(&w, Some("l0"), IsolationMode::Process);
    let mut fs = RecordingFs::default();
    assert!(matches!(
        w.engine.cleanup(&mut c, &mut fs),
        Err(StevedoreError::InvalidState { .. })
    ));
    assert_eq!(fs.unmounts, 0);
}
