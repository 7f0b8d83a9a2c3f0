//! Fleet-wide behaviour of the registry: ordering, persistence and
//! reconciliation.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tilewall_cli::application::services::registry::DEFAULT_SETTLE_DELAY;
use tilewall_cli::application::services::{Exited, Persistence, Registry, SettingsSession};
use tilewall_cli::domain::config::set_value;
use tilewall_common::{ComponentKind, FleetSettings, KindSettings};

use crate::mocks::{
    FakeProcessTable, Harness, MemoryStore, RecordingDispatcher, RecordingReporter, argv,
    exit_status,
};

type TestRegistry = Registry<RecordingDispatcher, MemoryStore>;

fn registry(h: &Harness, store: &MemoryStore, delay: Duration) -> TestRegistry {
    let (session, settings) = SettingsSession::open(store.clone());
    Registry::new(&h.ctx, session, &settings, delay)
}

fn kinds<T>(outcomes: &[(ComponentKind, T)]) -> Vec<ComponentKind> {
    outcomes.iter().map(|(kind, _)| *kind).collect()
}

// ── Fleet start ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_start_fleet_starts_display_service_first_and_waits() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, DEFAULT_SETTLE_DELAY);
    let reporter = RecordingReporter::default();

    let outcomes = fleet.start_fleet(&reporter).await;

    assert_eq!(kinds(&outcomes), ComponentKind::ALL);
    assert_eq!(h.dispatcher.run_kinds(), ComponentKind::ALL);
    // The settle delay sits between the display service and the rest, which
    // follow one another without waiting.
    let times = h.dispatcher.run_times();
    assert!(times[1] - times[0] >= DEFAULT_SETTLE_DELAY);
    assert!(times.windows(2).skip(1).all(|w| w[1] - w[0] < DEFAULT_SETTLE_DELAY));
    let programs: Vec<String> = h
        .dispatcher
        .runs()
        .iter()
        .map(|cmd| cmd.argv().into_iter().take(3).collect::<Vec<_>>().join(" "))
        .collect();
    assert_eq!(programs[0], "fsManager");
    assert!(programs[1].ends_with("appLauncher.py"), "got {programs:?}");
    assert!(programs[2].ends_with("sageui.py"), "got {programs:?}");
    assert!(programs[3].ends_with("fileServer.py"), "got {programs:?}");
    assert!(programs[4].ends_with("sageProxy.py"), "got {programs:?}");

    let events = reporter.events.borrow();
    assert!(events[0].starts_with("step: Waiting 2.0s"), "got {events:?}");

    let saved = store.last_saved();
    assert!(saved.iter().all(|s| s.last_known_pid.is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_start_fleet_skips_disabled_components() {
    let mut settings = FleetSettings::default();
    settings.display_service.enabled = false;
    settings.ui.enabled = false;
    let h = Harness::default_hosts();
    let store = MemoryStore::with(settings);
    let mut fleet = registry(&h, &store, DEFAULT_SETTLE_DELAY);
    let reporter = RecordingReporter::default();

    let before = tokio::time::Instant::now();
    let outcomes = fleet.start_fleet(&reporter).await;

    assert_eq!(
        kinds(&outcomes),
        [
            ComponentKind::AppLauncher,
            ComponentKind::FileServer,
            ComponentKind::Proxy
        ]
    );
    // No display service, nothing to settle.
    assert!(before.elapsed() < DEFAULT_SETTLE_DELAY);
    assert!(reporter.events.borrow().is_empty());
}

// ── Fleet stop ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_fleet_leaves_background_components_running() {
    let mut settings = FleetSettings::default();
    settings.file_server.run_in_background = true;
    let h = Harness::default_hosts();
    let store = MemoryStore::with(settings);
    let mut fleet = registry(&h, &store, Duration::ZERO);
    fleet.start_fleet(&RecordingReporter::default()).await;

    let outcomes = fleet.stop_fleet();

    assert!(!kinds(&outcomes).contains(&ComponentKind::FileServer));
    assert_eq!(outcomes.len(), 4);
    assert!(fleet.supervisor(ComponentKind::FileServer).pid().is_some());
    assert!(fleet.supervisor(ComponentKind::Proxy).pid().is_none());

    let saved = store.last_saved();
    assert!(saved.file_server.last_known_pid.is_some());
    assert!(saved.proxy.last_known_pid.is_none());
    assert!(saved.display_service.last_known_pid.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_keeps_settings_saved_by_another_session() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, DEFAULT_SETTLE_DELAY);
    fleet.start_fleet(&RecordingReporter::default()).await;

    let (other, mut edited) = SettingsSession::open(store.clone());
    set_value(edited.get_mut(ComponentKind::Proxy), "port", "20002").unwrap();
    other.save_checked(&edited).unwrap();

    fleet.stop(ComponentKind::Ui);

    let saved = store.last_saved();
    let KindSettings::Proxy(proxy) = &saved.proxy.details else {
        panic!("expected proxy settings");
    };
    assert_eq!(proxy.port, 20002);
    assert!(saved.ui.last_known_pid.is_none());
    assert!(saved.proxy.last_known_pid.is_some());
    // The running registry picked the edit up as well.
    assert_eq!(
        fleet.supervisor(ComponentKind::Proxy).settings().details,
        saved.proxy.details
    );
}

#[test]
fn test_hook_pids_from_an_earlier_session_are_killed_on_stop() {
    let first = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&first, &store, Duration::ZERO);
    fleet.start(ComponentKind::DisplayService);
    assert_eq!(store.last_saved().display_service.hook_pids, [1001, 1002, 1003]);
    drop(fleet);

    let second = Harness::default_hosts();
    let mut fleet = registry(&second, &MemoryStore::with(store.last_saved()), Duration::ZERO);
    assert_eq!(
        fleet.supervisor(ComponentKind::DisplayService).hook_pids(),
        [1001, 1002, 1003]
    );
    fleet.stop(ComponentKind::DisplayService);

    let killed: Vec<Vec<String>> = second.dispatcher.detached().iter().map(argv).collect();
    for pid in ["1001", "1002", "1003"] {
        assert!(
            killed.contains(&vec!["/bin/kill".to_string(), "-9".to_string(), pid.to_string()]),
            "pid {pid} not killed: {killed:?}"
        );
    }
    assert!(fleet.supervisor(ComponentKind::DisplayService).hook_pids().is_empty());
}

#[test]
fn test_single_start_and_stop_persist() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);

    fleet.start(ComponentKind::Ui);
    assert!(store.last_saved().ui.last_known_pid.is_some());

    fleet.stop(ComponentKind::Ui);
    assert!(store.last_saved().ui.last_known_pid.is_none());
    assert_eq!(store.saves().len(), 2);
}

// ── Liveness ──────────────────────────────────────────────────────────────────

#[test]
fn test_reap_exited_reports_status_and_persists() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);
    fleet.start(ComponentKind::Proxy);
    fleet.start(ComponentKind::Ui);
    let pid = fleet.supervisor(ComponentKind::Proxy).pid().unwrap();

    assert!(fleet.reap_exited().is_empty());
    h.dispatcher.exit(pid, 1);

    assert_eq!(
        fleet.reap_exited(),
        [Exited {
            kind: ComponentKind::Proxy,
            status: Some(exit_status(1)),
        }]
    );
    assert!(store.last_saved().proxy.last_known_pid.is_none());
    assert!(fleet.is_alive(ComponentKind::Ui));
}

#[test]
fn test_is_alive_persists_reclaimed_pid() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);
    fleet.start(ComponentKind::FileServer);
    let pid = fleet.supervisor(ComponentKind::FileServer).pid().unwrap();
    let saves_before = store.saves().len();

    h.dispatcher.exit(pid, 0);
    assert!(!fleet.is_alive(ComponentKind::FileServer));
    assert_eq!(store.saves().len(), saves_before + 1);
    assert!(store.last_saved().file_server.last_known_pid.is_none());
}

#[test]
fn test_stop_reading_all_keeps_processes() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);
    fleet.start(ComponentKind::Proxy);

    fleet.stop_reading_all();
    assert!(fleet.supervisors().all(|s| !s.is_reading()));
    assert!(fleet.is_alive(ComponentKind::Proxy));
}

// ── Reconciliation ────────────────────────────────────────────────────────────

#[test]
fn test_reconcile_clears_only_dead_pids() {
    let mut settings = FleetSettings::default();
    settings.proxy.last_known_pid = Some(4242);
    settings.ui.last_known_pid = Some(5151);
    let h = Harness::default_hosts();
    let store = MemoryStore::with(settings);
    let mut fleet = registry(&h, &store, Duration::ZERO);

    let cleared = fleet.reconcile_stale_pids(&FakeProcessTable::alive(&[5151]));

    assert_eq!(cleared, [(ComponentKind::Proxy, 4242)]);
    assert_eq!(fleet.supervisor(ComponentKind::Proxy).pid(), None);
    assert_eq!(fleet.supervisor(ComponentKind::Ui).pid(), Some(5151));
    let saved = store.last_saved();
    assert_eq!(saved.proxy.last_known_pid, None);
    assert_eq!(saved.ui.last_known_pid, Some(5151));
}

#[test]
fn test_reconcile_clears_reused_pid() {
    let started = Utc::now() - TimeDelta::hours(1);
    let mut settings = FleetSettings::default();
    settings.proxy.last_known_pid = Some(4242);
    settings.proxy.last_started_at = Some(started);
    settings.ui.last_known_pid = Some(5151);
    settings.ui.last_started_at = Some(started);
    let h = Harness::default_hosts();
    let store = MemoryStore::with(settings);
    let mut fleet = registry(&h, &store, Duration::ZERO);

    let mut table = FakeProcessTable::alive(&[4242, 5151]);
    // 4242 now belongs to a process started after ours.
    table.started.insert(4242, Utc::now());
    table.started.insert(5151, started);

    let cleared = fleet.reconcile_stale_pids(&table);

    assert_eq!(cleared, [(ComponentKind::Proxy, 4242)]);
    assert_eq!(fleet.supervisor(ComponentKind::Ui).pid(), Some(5151));
    assert_eq!(store.last_saved().proxy.last_known_pid, None);
}

#[test]
fn test_reconcile_drops_dead_hook_pids() {
    let mut settings = FleetSettings::default();
    settings.display_service.hook_pids = vec![31, 32, 33];
    let h = Harness::default_hosts();
    let store = MemoryStore::with(settings);
    let mut fleet = registry(&h, &store, Duration::ZERO);

    assert!(
        fleet
            .reconcile_stale_pids(&FakeProcessTable::alive(&[32]))
            .is_empty()
    );
    assert_eq!(fleet.supervisor(ComponentKind::DisplayService).hook_pids(), [32]);
    assert_eq!(store.last_saved().display_service.hook_pids, [32]);
}

#[test]
fn test_reconcile_without_stale_pids_does_not_save() {
    let mut settings = FleetSettings::default();
    settings.proxy.last_known_pid = Some(4242);
    let h = Harness::default_hosts();
    let store = MemoryStore::with(settings);
    let mut fleet = registry(&h, &store, Duration::ZERO);

    assert!(
        fleet
            .reconcile_stale_pids(&FakeProcessTable::alive(&[4242]))
            .is_empty()
    );
    assert!(store.saves().is_empty());
}

#[test]
fn test_reconcile_ignores_held_processes() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);
    fleet.start(ComponentKind::Proxy);

    assert!(
        fleet
            .reconcile_stale_pids(&FakeProcessTable::alive(&[]))
            .is_empty()
    );
    assert!(fleet.supervisor(ComponentKind::Proxy).pid().is_some());
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[test]
fn test_update_settings_persists_edit() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);

    fleet
        .update_settings(ComponentKind::Proxy, |s| set_value(s, "port", "20002"))
        .unwrap();

    let KindSettings::Proxy(proxy) = store.last_saved().proxy.details else {
        panic!("expected proxy settings");
    };
    assert_eq!(proxy.port, 20002);
}

#[test]
fn test_update_settings_rejects_unknown_key_without_saving() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);

    let err = fleet
        .update_settings(ComponentKind::FileServer, |s| set_value(s, "port", "1"))
        .unwrap_err();
    assert!(err.to_string().contains("port"), "got: {err}");
    assert!(store.saves().is_empty());
}

#[test]
fn test_corrupt_settings_disable_saving() {
    let h = Harness::default_hosts();
    let store = MemoryStore::corrupt();
    let mut fleet = registry(&h, &store, Duration::ZERO);

    assert_eq!(fleet.session().persistence(), Persistence::Disabled);
    fleet.start(ComponentKind::Proxy);
    assert!(fleet.supervisor(ComponentKind::Proxy).pid().is_some());
    assert!(store.saves().is_empty());
    assert!(
        fleet
            .update_settings(ComponentKind::Proxy, |s| set_value(s, "enabled", "no"))
            .is_err()
    );
}

#[test]
fn test_settings_snapshot_reflects_supervisors() {
    let h = Harness::default_hosts();
    let store = MemoryStore::empty();
    let mut fleet = registry(&h, &store, Duration::ZERO);
    fleet.start(ComponentKind::Ui);

    let snapshot = fleet.settings();
    assert_eq!(
        snapshot.ui.last_known_pid,
        fleet.supervisor(ComponentKind::Ui).pid()
    );
    assert!(snapshot.mismatched_kinds().is_empty());
}
