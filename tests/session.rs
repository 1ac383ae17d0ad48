//! End-to-end session flows driven through channel-fed listeners.

use clickloop::{
    Button, ChannelSource, ClickKind, Controller, DryRunInjector, FinishReason, InjectedAction,
    InputEvent, InputFeed, ReplayConfig, ReplayEvent, ReplayStart, persist,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn fast_config(max_cycles: Option<u32>) -> ReplayConfig {
    ReplayConfig {
        max_cycles,
        settle: Duration::ZERO,
        cycle_pause: Duration::ZERO,
    }
}

struct Rig {
    controller: Arc<Controller>,
    injector: Arc<DryRunInjector>,
    pointer: InputFeed,
    keyboard: InputFeed,
}

fn rig(max_cycles: Option<u32>) -> Rig {
    let (pointer, pointer_feed) = ChannelSource::new();
    let (keyboard, keyboard_feed) = ChannelSource::new();
    let injector = Arc::new(DryRunInjector::at(0, 0));
    let controller = Arc::new(Controller::with_replay_config(
        Box::new(pointer),
        Box::new(keyboard),
        injector.clone(),
        fast_config(max_cycles),
    ));
    controller.set_step_time(0.001).unwrap();
    Rig {
        controller,
        injector,
        pointer: pointer_feed,
        keyboard: keyboard_feed,
    }
}

#[test]
fn record_save_load_and_replay_with_drift() {
    let rig = rig(Some(3));
    let controller = &rig.controller;
    controller.set_exclusions([(0, 0, 50, 50)]);

    assert!(controller.toggle_recording().unwrap());
    rig.pointer
        .send(InputEvent::mouse_pressed(Button::Left, 100, 200));
    rig.pointer
        .send(InputEvent::mouse_released(Button::Left, 100, 200));
    rig.pointer.send(InputEvent::mouse_pressed(Button::Left, 10, 10));
    rig.pointer
        .send(InputEvent::mouse_pressed(Button::Right, 300, 300));
    rig.pointer
        .send(InputEvent::mouse_pressed(Button::Left, 400, 500));
    rig.pointer
        .send(InputEvent::mouse_pressed(Button::Left, 400, 500));
    assert!(wait_until(|| {
        controller
            .clicks()
            .last()
            .is_some_and(|c| c.kind() == ClickKind::Double)
    }));
    assert!(!controller.toggle_recording().unwrap());

    let clicks = controller.clicks();
    assert_eq!(clicks.len(), 2);
    assert_eq!((clicks.get(0).unwrap().x, clicks.get(0).unwrap().y), (100, 200));
    assert!(clicks.get(1).unwrap().is_double_click);

    controller
        .edit_click(0, clickloop::RecordField::OffsetX, "10")
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macro.json");
    controller.save(&path).unwrap();
    controller.clear();
    assert_eq!(controller.click_count(), 0);
    assert_eq!(controller.load(&path).unwrap(), 2);

    assert_eq!(controller.start_replay().unwrap(), ReplayStart::Started);
    let report = controller.wait_replay().unwrap();
    assert_eq!(report.reason, FinishReason::CycleLimit);
    assert_eq!(report.cycles, 3);
    assert_eq!(report.clicks, 3);
    assert_eq!(report.double_clicks, 3);
    assert!(!controller.is_replaying());

    let singles: Vec<_> = rig
        .injector
        .actions()
        .into_iter()
        .filter(|a| matches!(a, InjectedAction::Click { .. }))
        .collect();
    assert_eq!(
        singles,
        vec![
            InjectedAction::Click { x: 100, y: 200 },
            InjectedAction::Click { x: 110, y: 200 },
            InjectedAction::Click { x: 120, y: 200 },
        ]
    );
}

#[test]
fn hotkeys_drive_the_whole_session() {
    let rig = rig(None);
    let controller = &rig.controller;
    controller.start_keyboard_listener().unwrap();
    assert!(controller.keyboard_listening());

    rig.keyboard.send(InputEvent::char_pressed('d'));
    assert!(wait_until(|| controller.pointer_listening()));
    assert!(controller.is_recording());

    rig.pointer.send(InputEvent::mouse_pressed(Button::Left, 5, 6));
    assert!(wait_until(|| controller.click_count() == 1));

    let events = controller.subscribe();
    rig.keyboard.send(InputEvent::char_pressed('y'));
    assert!(wait_until(|| controller.is_replaying()));
    assert!(!controller.is_recording());
    assert!(wait_until(|| !controller.pointer_listening()));

    let first = events.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(first, ReplayEvent::CycleStarted(1));

    rig.keyboard.send(InputEvent::char_pressed('y'));
    assert!(wait_until(|| !controller.is_replaying()));
    let report = controller.wait_replay().unwrap();
    assert_eq!(report.reason, FinishReason::Stopped);

    rig.keyboard.send(InputEvent::char_pressed('c'));
    assert!(wait_until(|| controller.click_count() == 0));

    rig.keyboard.send(InputEvent::char_pressed('Q'));
    assert!(wait_until(|| !controller.keyboard_listening()));
    assert_eq!(
        controller.status().to_string(),
        "Recording: OFF | Replaying: OFF | Clicks recorded: 0 | Button exclusions: 0 | \
         Keyboard Listener: OFF | Mouse Listener: OFF"
    );

    // The listener can be brought back after an exit key.
    controller.start_keyboard_listener().unwrap();
    assert!(controller.keyboard_listening());
    controller.stop_all().unwrap();
    assert!(!controller.keyboard_listening());
}

#[test]
fn stop_interrupts_a_long_delay() {
    let rig = rig(None);
    let controller = &rig.controller;
    controller.add_scroll_at_cursor(3).unwrap();
    controller
        .edit_click(0, clickloop::RecordField::Delay, "30")
        .unwrap();

    controller.start_replay().unwrap();
    assert!(wait_until(|| rig.injector.actions().len() == 2));

    let stopped_at = Instant::now();
    assert!(controller.stop_replay());
    let report = controller.wait_replay().unwrap();
    assert!(stopped_at.elapsed() < Duration::from_secs(5));
    assert_eq!(report.reason, FinishReason::Stopped);
    assert_eq!(report.scrolls, 1);
    assert_eq!(
        rig.injector.actions(),
        vec![
            InjectedAction::MoveTo { x: 0, y: 0 },
            InjectedAction::Scroll { amount: 3 },
        ]
    );
}

#[test]
fn recording_preempts_replay() {
    let rig = rig(None);
    let controller = &rig.controller;
    controller.add_scroll_at_cursor(1).unwrap();
    controller
        .edit_click(0, clickloop::RecordField::Delay, "10")
        .unwrap();

    controller.start_replay().unwrap();
    assert!(controller.is_replaying());

    assert!(controller.toggle_recording().unwrap());
    assert!(controller.is_recording());
    assert!(!controller.is_replaying());

    let report = controller.wait_replay().unwrap();
    assert_eq!(report.reason, FinishReason::Stopped);
    // The finished loop must not knock recording back off.
    assert!(controller.is_recording());
    controller.stop_all().unwrap();
}

#[test]
fn replay_with_nothing_recorded_is_a_no_op() {
    let rig = rig(None);
    let events = rig.controller.subscribe();
    assert_eq!(
        rig.controller.start_replay().unwrap(),
        ReplayStart::NothingToReplay
    );
    assert!(!rig.controller.is_replaying());
    assert_eq!(events.try_recv().unwrap(), ReplayEvent::NothingToReplay);
    assert!(rig.controller.wait_replay().is_none());
}

#[test]
fn hand_written_files_get_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimal.json");
    std::fs::write(&path, r#"[{"x": 7, "y": 8}, {"x": 1, "y": 2, "is_scroll": true, "scroll_amount": -2}]"#)
        .unwrap();

    let seq = persist::load(&path).unwrap();
    let first = seq.get(0).unwrap();
    assert_eq!(first.kind(), ClickKind::Single);
    assert_eq!(first.button, None);
    assert_eq!(first.delay, 0.0);
    assert_eq!((first.offset_x, first.offset_y), (0, 0));
    assert_eq!(seq.get(1).unwrap().kind(), ClickKind::Scroll);

    let rig = rig(Some(1));
    rig.controller.load(&path).unwrap();
    rig.controller.start_replay().unwrap();
    let report = rig.controller.wait_replay().unwrap();
    assert_eq!((report.clicks, report.scrolls), (1, 1));
    assert_eq!(
        rig.injector.actions(),
        vec![
            InjectedAction::Click { x: 7, y: 8 },
            InjectedAction::MoveTo { x: 1, y: 2 },
            InjectedAction::Scroll { amount: -2 },
        ]
    );
}

#[test]
fn unbounded_replay_ends_when_stopped_from_another_thread() {
    let rig = rig(None);
    let controller = rig.controller.clone();
    controller.add_scroll_at_cursor(1).unwrap();
    controller.start_replay().unwrap();
    assert!(wait_until(|| controller.replay().cycle_count() >= 3));

    // Same shape as the CLI's Ctrl+C handler: a weak handle on another thread.
    let handle = Arc::downgrade(&controller);
    thread::spawn(move || {
        if let Some(controller) = handle.upgrade() {
            controller.stop_replay();
        }
    })
    .join()
    .unwrap();

    let report = controller.wait_replay().unwrap();
    assert_eq!(report.reason, FinishReason::Stopped);
    assert!(report.cycles >= 3);
    assert!(!controller.is_replaying());
}
