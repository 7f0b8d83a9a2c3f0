//! Lifecycle of a single supervisor: start, liveness, stop and reclamation.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::time::Duration;

use tilewall_cli::application::services::supervisor::ALREADY_RUNNING;
use tilewall_cli::application::services::{StartOutcome, StopOutcome, Supervisor};
use tilewall_cli::domain::{Platform, SupervisorState};
use tilewall_common::{ComponentKind, ComponentSettings, KindSettings};

use crate::mocks::{FixedTopology, Harness, RecordingDispatcher, argv, exit_status};

fn display_settings(on_start: &str, on_stop: &str) -> ComponentSettings {
    let mut settings = ComponentSettings::defaults(ComponentKind::DisplayService);
    if let KindSettings::DisplayService(display) = &mut settings.details {
        display.on_start = on_start.to_string();
        display.on_stop = on_stop.to_string();
    }
    settings
}

fn supervisor(h: &Harness, kind: ComponentKind) -> Supervisor<RecordingDispatcher> {
    Supervisor::new(ComponentSettings::defaults(kind), h.ctx.clone())
}

fn ssh_kill_host(args: &[String]) -> &str {
    assert_eq!(args[0], "/usr/bin/ssh");
    assert_eq!(args[1], "-fx");
    assert!(args[3].starts_with("/usr/bin/killall -9 fsManager "), "got {args:?}");
    &args[2]
}

// ── Start ─────────────────────────────────────────────────────────────────────

#[test]
fn test_start_spawns_and_tracks_pid() {
    let h = Harness::default_hosts();
    let mut proxy = supervisor(&h, ComponentKind::Proxy);

    assert_eq!(proxy.start(), StartOutcome::Started { pid: 1001 });
    assert_eq!(proxy.pid(), Some(1001));
    assert_eq!(proxy.state(), SupervisorState::Running);
    assert_eq!(proxy.settings().last_known_pid, Some(1001));
    assert!(proxy.started_at().is_some());

    let runs = h.dispatcher.runs();
    assert_eq!(runs.len(), 1);
    let args = argv(&runs[0]);
    assert_eq!(args[0], "python3");
    assert_eq!(
        args[3..],
        ["-s", "localhost", "-p", "20001", "-x", "pass", "-v"]
    );
    assert_eq!(
        runs[0].cwd,
        Some(PathBuf::from("/opt/wall").join("bin").join("sageProxy"))
    );
}

#[test]
fn test_start_twice_is_a_no_op() {
    let h = Harness::default_hosts();
    let mut proxy = supervisor(&h, ComponentKind::Proxy);

    proxy.start();
    assert_eq!(proxy.start(), StartOutcome::AlreadyRunning);
    assert_eq!(h.dispatcher.runs().len(), 1);
    assert_eq!(proxy.pid(), Some(1001));
    assert!(h.sink.text(ComponentKind::Proxy).contains(ALREADY_RUNNING));
}

#[test]
fn test_spawn_failure_leaves_supervisor_idle() {
    let h = Harness::new(
        RecordingDispatcher::failing("python3"),
        FixedTopology::hosts(&[]),
    );
    let mut ui = supervisor(&h, ComponentKind::Ui);

    assert_eq!(ui.start(), StartOutcome::Failed);
    assert_eq!(ui.state(), SupervisorState::Idle);
    assert_eq!(ui.pid(), None);
    assert!(!ui.has_handle());
    assert!(!ui.is_alive());
}

#[test]
fn test_background_file_server_gets_trailing_marker() {
    let h = Harness::default_hosts();
    let mut settings = ComponentSettings::defaults(ComponentKind::FileServer);
    settings.run_in_background = true;
    let mut file_server = Supervisor::new(settings, h.ctx.clone());

    file_server.start();
    let args = argv(&h.dispatcher.runs()[0]);
    assert_eq!(args.last().map(String::as_str), Some("&"));
}

#[test]
fn test_output_reaches_sink() {
    let h = Harness::new(
        RecordingDispatcher::with_output(b"listening on 20001\n"),
        FixedTopology::hosts(&[]),
    );
    let mut proxy = supervisor(&h, ComponentKind::Proxy);

    proxy.start();
    assert!(
        h.sink
            .wait_for(ComponentKind::Proxy, "listening on 20001", Duration::from_secs(5))
    );
}

// ── Liveness ──────────────────────────────────────────────────────────────────

#[test]
fn test_exited_process_is_reclaimed() {
    let h = Harness::default_hosts();
    let mut ui = supervisor(&h, ComponentKind::Ui);
    let StartOutcome::Started { pid } = ui.start() else {
        panic!("ui should start");
    };

    h.dispatcher.exit(pid, 3);
    assert!(!ui.is_alive());
    assert_eq!(ui.pid(), None);
    assert_eq!(ui.settings().last_known_pid, None);
    assert_eq!(ui.started_at(), None);
    assert_eq!(ui.last_exit(), Some(exit_status(3)));
    assert_eq!(ui.state(), SupervisorState::Idle);
    assert!(!ui.is_reading());

    // Reclaimed components can be started again.
    assert!(matches!(ui.start(), StartOutcome::Started { pid: next } if next != pid));
}

#[test]
fn test_persisted_pid_counts_as_alive() {
    let h = Harness::default_hosts();
    let mut settings = ComponentSettings::defaults(ComponentKind::Proxy);
    settings.last_known_pid = Some(4242);
    let mut proxy = Supervisor::new(settings, h.ctx.clone());

    assert!(proxy.is_alive());
    assert_eq!(proxy.state(), SupervisorState::Running);
    assert_eq!(proxy.start(), StartOutcome::AlreadyRunning);
    assert!(h.dispatcher.runs().is_empty());
}

#[test]
fn test_stop_reading_leaves_process_running() {
    let h = Harness::default_hosts();
    let mut proxy = supervisor(&h, ComponentKind::Proxy);
    proxy.start();

    proxy.stop_reading();
    assert!(!proxy.is_reading());
    assert!(proxy.is_alive());
    assert!(h.dispatcher.detached().is_empty());
}

#[test]
fn test_forget_pid_never_overrides_a_held_handle() {
    let h = Harness::default_hosts();
    let mut proxy = supervisor(&h, ComponentKind::Proxy);
    proxy.start();

    assert_eq!(proxy.forget_pid(), None);
    assert_eq!(proxy.pid(), Some(1001));
}

// ── Stop ──────────────────────────────────────────────────────────────────────

#[test]
fn test_stop_signals_tracked_pid() {
    let h = Harness::default_hosts();
    let mut proxy = supervisor(&h, ComponentKind::Proxy);
    proxy.start();

    assert_eq!(
        proxy.stop(),
        StopOutcome::Stopped {
            dispatched: 1,
            failed: 0
        }
    );
    assert_eq!(argv(&h.dispatcher.detached()[0]), ["/bin/kill", "-9", "1001"]);
    assert_eq!(proxy.pid(), None);
    assert_eq!(proxy.settings().last_known_pid, None);
    assert_eq!(proxy.state(), SupervisorState::Idle);
}

#[test]
fn test_stop_signals_pid_from_earlier_session() {
    let h = Harness::default_hosts();
    let mut settings = ComponentSettings::defaults(ComponentKind::FileServer);
    settings.last_known_pid = Some(4242);
    let mut file_server = Supervisor::new(settings, h.ctx.clone());

    file_server.stop();
    assert_eq!(argv(&h.dispatcher.detached()[0]), ["/bin/kill", "-9", "4242"]);
    assert_eq!(file_server.pid(), None);
}

#[test]
fn test_stop_when_not_running_signals_nothing() {
    let h = Harness::default_hosts();
    let mut ui = supervisor(&h, ComponentKind::Ui);

    assert_eq!(ui.stop(), StopOutcome::NotRunning);
    assert!(h.dispatcher.detached().is_empty());
}

#[test]
fn test_display_stop_kills_every_host_then_loopback() {
    let h = Harness::default_hosts();
    let mut display = Supervisor::new(display_settings("", ""), h.ctx.clone());

    assert_eq!(
        display.stop(),
        StopOutcome::Stopped {
            dispatched: 3,
            failed: 0
        }
    );
    let detached = h.dispatcher.detached();
    let hosts: Vec<String> = detached
        .iter()
        .map(|cmd| ssh_kill_host(&argv(cmd)).to_string())
        .collect();
    assert_eq!(hosts, ["10.0.0.1", "10.0.0.2", "127.0.0.1"]);
}

#[test]
fn test_display_stop_without_topology_kills_loopback_only() {
    let h = Harness::new(RecordingDispatcher::new(), FixedTopology::unreadable());
    let mut display = Supervisor::new(display_settings("", ""), h.ctx.clone());

    assert_eq!(
        display.stop(),
        StopOutcome::Stopped {
            dispatched: 1,
            failed: 0
        }
    );
    assert_eq!(ssh_kill_host(&argv(&h.dispatcher.detached()[0])), "127.0.0.1");
}

#[test]
fn test_local_display_stop_never_reads_topology() {
    let h = Harness::on_platform(
        Platform::Windows,
        RecordingDispatcher::new(),
        FixedTopology::unreadable(),
    );
    let mut display = Supervisor::new(display_settings("", ""), h.ctx.clone());

    assert_eq!(
        display.stop(),
        StopOutcome::Stopped {
            dispatched: 1,
            failed: 0
        }
    );
    assert_eq!(h.topology_loads(), 0);
    let detached = h.dispatcher.detached();
    assert_eq!(detached.len(), 1);
    assert_eq!(detached[0].program, "taskkill");
}

#[test]
fn test_remote_display_stop_reads_topology_once() {
    let h = Harness::default_hosts();
    let mut display = Supervisor::new(display_settings("", ""), h.ctx.clone());
    display.stop();
    assert_eq!(h.topology_loads(), 1);
}

#[test]
fn test_display_hooks_run_and_are_killed_on_stop() {
    let h = Harness::default_hosts();
    let mut display = Supervisor::new(
        display_settings("xhost +local:\n# disabled\n\npython ../dim/dim.py", ""),
        h.ctx.clone(),
    );

    assert_eq!(display.start(), StartOutcome::Started { pid: 1003 });
    let hooks: Vec<Vec<String>> = h.dispatcher.detached().iter().map(argv).collect();
    assert_eq!(
        hooks,
        [vec!["xhost", "+local:"], vec!["python", "../dim/dim.py"]]
    );
    assert_eq!(display.hook_pids(), [1001, 1002]);
    assert_eq!(h.dispatcher.runs()[0].program, "fsManager");

    assert_eq!(
        display.stop(),
        StopOutcome::Stopped {
            dispatched: 5,
            failed: 0
        }
    );
    let detached = h.dispatcher.detached();
    assert_eq!(argv(&detached[5]), ["/bin/kill", "-9", "1001"]);
    assert_eq!(argv(&detached[6]), ["/bin/kill", "-9", "1002"]);
    assert!(display.hook_pids().is_empty());
}

#[test]
fn test_post_stop_hooks_run_every_non_blank_line() {
    let h = Harness::default_hosts();
    let mut display = Supervisor::new(
        display_settings("", "fuser -k 19010/tcp\n\n#literal"),
        h.ctx.clone(),
    );

    display.stop();
    let detached: Vec<Vec<String>> = h.dispatcher.detached().iter().map(argv).collect();
    assert_eq!(detached.len(), 5);
    assert_eq!(detached[3], ["fuser", "-k", "19010/tcp"]);
    assert_eq!(detached[4], ["#literal"]);
}

#[test]
fn test_kill_spawn_failures_are_counted() {
    let h = Harness::new(
        RecordingDispatcher::failing("/usr/bin/ssh"),
        FixedTopology::hosts(&["10.0.0.1", "10.0.0.2"]),
    );
    let mut display = Supervisor::new(display_settings("", ""), h.ctx.clone());

    assert_eq!(
        display.stop(),
        StopOutcome::Stopped {
            dispatched: 3,
            failed: 3
        }
    );
    assert_eq!(display.state(), SupervisorState::Idle);
}

#[test]
fn test_app_launcher_stop_runs_local_kill_script() {
    let h = Harness::default_hosts();
    let mut launcher = supervisor(&h, ComponentKind::AppLauncher);

    launcher.stop();
    let detached = h.dispatcher.detached();
    assert_eq!(argv(&detached[0]), ["python3", "KILL_LAUNCHER.py", "19010"]);
    assert_eq!(
        detached[0].cwd,
        Some(PathBuf::from("/opt/wall").join("bin").join("appLauncher"))
    );
}
