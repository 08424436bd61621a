//! Integration tests for backend lifecycle
//!
//! These tests validate the complete backend workflow against the
//! simulated instrument:
//! - Connection status and snapshot publishing
//! - Pause/resume and excitation mode changes
//! - Shutdown and thread join
//! - The UI state consuming real backend snapshots

mod common;

use common::mock_helpers::{create_test_curve_tracer, fast_device_config, spawn_backend};
use common::wait_until;
use curvebug_rs::backend::{BackendMessage, CurveBackend, MockCurveTracer};
use curvebug_rs::config::{Action, AppConfig, DeviceConfig, UiSession};
use curvebug_rs::frontend::CurveBugApp;
use curvebug_rs::types::{Channel, ConnectionStatus, Excitation, ExcitationMode};
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_secs(2);

#[test]
fn test_backend_creation_and_shutdown() {
    let (frontend, handle) = spawn_backend(create_test_curve_tracer());

    thread::sleep(Duration::from_millis(20));
    frontend.shutdown();

    let result = handle.join();
    assert!(result.is_ok(), "Backend thread should exit cleanly");
    assert!(frontend
        .drain()
        .iter()
        .any(|msg| matches!(msg, BackendMessage::Shutdown)));
}

#[test]
fn test_backend_reports_connected_and_publishes_curves() {
    let (frontend, handle) = spawn_backend(create_test_curve_tracer());

    let mut messages = Vec::new();
    let got_curves = wait_until(SETTLE, || {
        messages.extend(frontend.drain());
        messages
            .iter()
            .any(|msg| matches!(msg, BackendMessage::Curves { .. }))
    });
    assert!(got_curves, "Should receive at least one snapshot");

    assert!(messages.iter().any(|msg| matches!(
        msg,
        BackendMessage::ConnectionStatus(ConnectionStatus::Connected)
    )));

    let snapshot = messages.iter().find_map(|msg| match msg {
        BackendMessage::Curves { frame, curves } => Some((*frame, curves)),
        _ => None,
    });
    let (frame, curves) = snapshot.unwrap();
    assert_eq!(frame, 1);
    assert_eq!(curves.active(), Excitation::Standard);
    assert!(!curves.active_channel(Channel::Ch1).is_empty());

    frontend.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_paused_backend_stops_publishing() {
    let (frontend, handle) = spawn_backend(create_test_curve_tracer());
    frontend.set_paused(true);

    // Let any snapshot taken before the pause arrive, then discard it
    thread::sleep(Duration::from_millis(50));
    frontend.drain();
    thread::sleep(Duration::from_millis(100));
    assert!(!frontend
        .drain()
        .iter()
        .any(|msg| matches!(msg, BackendMessage::Curves { .. })));

    frontend.set_paused(false);
    let resumed = wait_until(SETTLE, || {
        frontend
            .drain()
            .iter()
            .any(|msg| matches!(msg, BackendMessage::Curves { .. }))
    });
    assert!(resumed, "Snapshots should resume after unpausing");

    frontend.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_alternating_mode_sends_both_commands() {
    let transport = create_test_curve_tracer();
    let log = transport.command_log();
    let (backend, frontend) = CurveBackend::new(fast_device_config());
    let backend = backend
        .with_transport(Box::new(transport))
        .with_excitation_mode(ExcitationMode::Alternating);
    let handle = thread::spawn(move || backend.run());

    let both = wait_until(SETTLE, || log.lock().unwrap().len() >= 4);
    assert!(both);
    frontend.shutdown();
    handle.join().unwrap();

    let sent = log.lock().unwrap().clone();
    assert!(sent.starts_with(b"TWTW"));
    for pair in sent.chunks_exact(2) {
        assert_eq!(pair, b"TW");
    }
}

#[test]
fn test_mode_change_reaches_snapshots() {
    let (frontend, handle) = spawn_backend(create_test_curve_tracer());
    frontend.set_excitation_mode(ExcitationMode::Weak);

    let weak = wait_until(SETTLE, || {
        frontend.drain().iter().any(|msg| match msg {
            BackendMessage::Curves { curves, .. } => {
                curves.mode() == ExcitationMode::Weak && curves.active() == Excitation::Weak
            }
            _ => false,
        })
    });
    assert!(weak, "Weak-mode snapshots should follow the mode change");

    frontend.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_open_failure_reports_error() {
    let config = DeviceConfig {
        serial_port: "/dev/does-not-exist".to_string(),
        ..fast_device_config()
    };
    let (backend, frontend) = CurveBackend::new(config);
    let backend = backend.with_transport(Box::new(MockCurveTracer::new().with_failing_open()));
    let handle = thread::spawn(move || backend.run());

    let mut messages = Vec::new();
    let reported = wait_until(SETTLE, || {
        messages.extend(frontend.drain());
        messages
            .iter()
            .any(|msg| matches!(msg, BackendMessage::ConnectionError(_)))
    });
    assert!(reported);
    assert!(messages.iter().any(|msg| matches!(
        msg,
        BackendMessage::ConnectionStatus(ConnectionStatus::Error)
    )));
    assert!(!messages
        .iter()
        .any(|msg| matches!(msg, BackendMessage::Curves { .. })));

    frontend.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_dropping_frontend_stops_backend() {
    let (frontend, handle) = spawn_backend(create_test_curve_tracer());
    thread::sleep(Duration::from_millis(20));
    drop(frontend);
    assert!(handle.join().is_ok());
}

#[test]
fn test_app_consumes_backend_snapshots() {
    let (frontend, handle) = spawn_backend(create_test_curve_tracer());
    let session = UiSession {
        mode: ExcitationMode::Standard,
        single_channel: false,
        auto_scale: false,
    };
    let mut app = CurveBugApp::from_parts(frontend, AppConfig::default(), session);

    let got_frame = wait_until(SETTLE, || {
        app.process_backend_messages();
        app.frame_count() > 0
    });
    assert!(got_frame);
    assert!(!app.curves().active_channel(Channel::Ch1).is_empty());

    // Fit frames the open/resistor pair inside the base window
    app.apply_action(Action::FitToData);
    assert!(app.plot().zoom >= 0.1 && app.plot().zoom <= 1.0);

    app.apply_action(Action::CycleMode);
    assert_eq!(app.settings().excitation_mode, ExcitationMode::Weak);
    app.process_backend_messages();
    assert_eq!(app.curves().mode(), ExcitationMode::Weak);

    app.apply_action(Action::Quit);
    assert!(app.quit_requested());

    drop(app);
    assert!(handle.join().is_ok());
}
