use super::testing::{
    FakeBackend, FakePower, display, forking_script, process_alive, read_pid, wait_for_exit,
};
use super::*;
use crate::sources::BatteryStatus;
use crate::state::{DisplayId, DisplaySet, WindowId};
use std::time::Duration;

fn config(edit: impl FnOnce(&mut BarConfig)) -> Arc<BarConfig> {
    let mut config = BarConfig::default();
    config.modules.show_workspace = false;
    config.modules.show_battery = false;
    edit(&mut config);
    Arc::new(config)
}

fn controller(config: Arc<BarConfig>, backend: FakeBackend) -> Controller<FakeBackend> {
    Controller::new(config, backend, Arc::new(FakePower(None)))
}

fn single_display() -> FakeBackend {
    FakeBackend::with_displays(vec![display(1, "DP-1", 0, 0, 1920)])
}

fn only_window(ctrl: &Controller<FakeBackend>) -> WindowId {
    let windows = ctrl.reconciler().windows();
    assert_eq!(windows.len(), 1);
    windows[0].id
}

async fn step_until(
    ctrl: &mut Controller<FakeBackend>,
    mut done: impl FnMut(&Controller<FakeBackend>) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !done(ctrl) {
            ctrl.step().await.unwrap();
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_start_builds_and_refreshes() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();

    let id = only_window(&ctrl);
    assert!(ctrl.scheduler().is_running());
    assert_eq!(ctrl.guard().phase(), Phase::Idle);
    assert!(ctrl.backend().label(id, Slot::Clock).is_some());
    assert!(ctrl.backend().label(id, Slot::Date).is_some());
    assert!(ctrl.backend().presents > 0);
}

#[tokio::test]
async fn test_hidden_clock_still_writes_date() {
    let mut ctrl = controller(config(|c| c.modules.show_clock = false), single_display());
    ctrl.start();

    let id = only_window(&ctrl);
    assert_eq!(ctrl.backend().label(id, Slot::Clock), None);
    assert!(ctrl.backend().label(id, Slot::Date).is_some());
}

#[tokio::test]
async fn test_detach_reattach_never_writes_retired_window() {
    let cfg = config(|c| {
        c.modules.show_workspace = true;
        c.modules.workspace_command = vec!["echo".to_string(), "1".to_string()];
        c.modules.workspace_prefix = "WS: ".to_string();
    });
    let mut ctrl = controller(cfg, single_display());
    ctrl.start();
    let first = only_window(&ctrl);
    assert!(ctrl.poller().is_in_flight());
    let writes_before = ctrl.backend().writes.len();

    ctrl.backend_mut().displays = DisplaySet::default();
    ctrl.handle_event(BarEvent::DisplaysChanged);
    assert!(ctrl.reconciler().windows().is_empty());
    assert!(!ctrl.poller().is_in_flight());

    ctrl.backend_mut().displays = DisplaySet::new(vec![display(1, "DP-1", 0, 0, 1920)]);
    ctrl.handle_event(BarEvent::DisplaysChanged);
    let second = only_window(&ctrl);
    assert_ne!(first, second);
    assert_eq!(ctrl.reconciler().windows()[0].display, DisplayId(1));

    step_until(&mut ctrl, |c| {
        c.backend().label(second, Slot::Workspace) == Some("WS: 1")
    })
    .await;

    let backend = ctrl.backend();
    assert_eq!(backend.live_count(), 1);
    assert_eq!(backend.stray_writes, 0);
    assert!(
        backend.writes[writes_before..]
            .iter()
            .all(|(id, _, _)| *id != first)
    );
}

#[tokio::test]
async fn test_no_displays_means_no_writes() {
    let mut ctrl = controller(config(|_| {}), FakeBackend::default());
    ctrl.start();

    assert!(ctrl.reconciler().windows().is_empty());
    ctrl.refresh_all();
    assert!(ctrl.backend().writes.is_empty());
    assert!(ctrl.scheduler().is_running());
}

#[tokio::test]
async fn test_stale_workspace_result_not_written() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();

    let stale = QueryResult {
        generation: ctrl.poller().generation() + 5,
        text: "stale".to_string(),
        ok: true,
    };
    ctrl.handle_event(BarEvent::WorkspaceFinished(stale));
    assert_eq!(ctrl.backend().writes_to(Slot::Workspace), 0);
}

#[tokio::test]
async fn test_battery_label_marshalled_back() {
    let status = BatteryStatus {
        percent: 85,
        charging: true,
        plugged: false,
    };
    let mut ctrl = Controller::new(
        config(|c| c.modules.show_battery = true),
        single_display(),
        Arc::new(FakePower(Some(status))),
    );
    ctrl.start();
    let id = only_window(&ctrl);

    step_until(&mut ctrl, |c| {
        c.backend().label(id, Slot::Battery) == Some("⚡85%")
    })
    .await;
}

#[tokio::test]
async fn test_battery_read_from_old_epoch_dropped() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();
    let old_epoch = ctrl.reconciler().epoch();
    ctrl.handle_event(BarEvent::DisplaysChanged);

    ctrl.handle_event(BarEvent::BatteryRead {
        epoch: old_epoch,
        text: "🔋10%".to_string(),
    });
    assert_eq!(ctrl.backend().writes_to(Slot::Battery), 0);

    ctrl.handle_event(BarEvent::BatteryRead {
        epoch: ctrl.reconciler().epoch(),
        text: "🔋11%".to_string(),
    });
    assert_eq!(ctrl.backend().writes_to(Slot::Battery), 1);
}

#[tokio::test]
async fn test_held_guard_blocks_rebuild_and_refresh() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();
    let created = ctrl.backend().created.len();
    let writes = ctrl.backend().writes.len();

    let guard = ctrl.guard().clone();
    let ticket = guard.begin_reconfigure().unwrap();
    ctrl.handle_event(BarEvent::DisplaysChanged);
    ctrl.refresh_all();
    assert_eq!(ctrl.backend().created.len(), created);
    assert_eq!(ctrl.backend().writes.len(), writes);

    drop(ticket);
    ctrl.handle_event(BarEvent::DisplaysChanged);
    assert_eq!(ctrl.backend().created.len(), created + 1);
}

#[tokio::test]
async fn test_display_bursts_coalesced() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();
    let created = ctrl.backend().created.len();

    let tx = ctrl.sender();
    for _ in 0..3 {
        tx.send(BarEvent::DisplaysChanged).unwrap();
    }
    ctrl.step().await.unwrap();

    assert_eq!(ctrl.backend().created.len(), created + 1);
}

#[tokio::test(start_paused = true)]
async fn test_sleep_then_wake_rebuilds_before_ticking() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();
    let before_sleep = only_window(&ctrl);
    let epoch = ctrl.reconciler().epoch();

    ctrl.handle_event(BarEvent::WillSleep);
    assert_eq!(ctrl.guard().phase(), Phase::Asleep);
    assert!(!ctrl.scheduler().is_running());
    let clock_writes = ctrl.backend().writes_to(Slot::Clock);

    // Topology changes during sleep are left to the wake rebuild.
    ctrl.handle_event(BarEvent::DisplaysChanged);
    assert_eq!(ctrl.reconciler().epoch(), epoch);

    let idle = tokio::time::timeout(Duration::from_secs(3), ctrl.step()).await;
    assert!(idle.is_err(), "stepped while asleep");
    assert_eq!(ctrl.backend().writes_to(Slot::Clock), clock_writes);

    ctrl.handle_event(BarEvent::DidWake);
    assert_eq!(ctrl.guard().phase(), Phase::Idle);
    assert!(ctrl.scheduler().is_running());
    assert_eq!(ctrl.reconciler().epoch(), epoch + 1);
    let after_wake = only_window(&ctrl);
    assert_ne!(before_sleep, after_wake);
    assert_eq!(ctrl.backend().retired, vec![before_sleep]);
    assert!(ctrl.backend().label(after_wake, Slot::Clock).is_some());

    let wake_writes = ctrl.backend().writes_to(Slot::Clock);
    tokio::time::timeout(Duration::from_millis(1500), ctrl.step())
        .await
        .expect("no tick after wake")
        .unwrap();
    assert_eq!(ctrl.backend().writes_to(Slot::Clock), wake_writes + 1);
}

#[tokio::test]
async fn test_sleep_terminates_outstanding_query() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("sleep.pid");
    let cfg = config(|c| {
        c.modules.show_workspace = true;
        c.modules.workspace_command = forking_script(&pid_file);
    });
    let mut ctrl = controller(cfg, single_display());
    ctrl.start();
    assert!(ctrl.poller().is_in_flight());
    let sleeper = read_pid(&pid_file).await;

    ctrl.handle_event(BarEvent::WillSleep);
    assert!(!ctrl.poller().is_in_flight());
    assert!(wait_for_exit(sleeper).await, "query survived sleep");

    ctrl.refresh_all();
    assert!(!ctrl.poller().is_in_flight());
}

#[tokio::test]
async fn test_reconfigure_terminates_outstanding_query() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("sleep.pid");
    let cfg = config(|c| {
        c.modules.show_workspace = true;
        c.modules.workspace_command = forking_script(&pid_file);
    });
    let mut ctrl = controller(cfg, single_display());
    ctrl.start();
    let first = read_pid(&pid_file).await;
    std::fs::remove_file(&pid_file).unwrap();

    ctrl.handle_event(BarEvent::DisplaysChanged);
    assert!(wait_for_exit(first).await, "query survived reconfiguration");

    // The post-rebuild refresh starts a fresh query.
    assert!(ctrl.poller().is_in_flight());
    let second = read_pid(&pid_file).await;
    assert_ne!(first, second);
    assert!(process_alive(second));
}

#[tokio::test]
async fn test_backend_wakeup_presents_without_events() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();
    let presents = ctrl.backend().presents;
    let epoch = ctrl.reconciler().epoch();

    ctrl.backend_mut().batches.push_back(Vec::new());
    tokio::time::timeout(Duration::from_millis(500), ctrl.step())
        .await
        .expect("empty batch did not wake the controller")
        .unwrap();

    assert_eq!(ctrl.backend().presents, presents + 1);
    assert_eq!(ctrl.reconciler().epoch(), epoch);
}

#[tokio::test]
async fn test_shutdown_retires_windows() {
    let mut ctrl = controller(config(|_| {}), single_display());
    ctrl.start();
    let id = only_window(&ctrl);

    ctrl.sender().send(BarEvent::Shutdown).unwrap();
    ctrl.step().await.unwrap();

    assert!(!ctrl.is_running());
    assert!(ctrl.reconciler().windows().is_empty());
    assert_eq!(ctrl.backend().retired, vec![id]);
    assert!(!ctrl.scheduler().is_running());
}

#[test]
fn test_coalesce_keeps_other_events() {
    let events = coalesce(vec![
        BarEvent::DisplaysChanged,
        BarEvent::WillSleep,
        BarEvent::DisplaysChanged,
        BarEvent::DidWake,
    ]);
    assert_eq!(
        events,
        vec![
            BarEvent::DisplaysChanged,
            BarEvent::WillSleep,
            BarEvent::DidWake
        ]
    );
}
