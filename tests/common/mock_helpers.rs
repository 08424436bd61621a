//! Mock construction helpers

use crossbeam_channel::{bounded, Receiver, Sender};

use curvebug_rs::backend::{
    BackendCommand, BackendMessage, CurveBackend, FrontendReceiver, MockCurveTracer, MockDut,
};
use curvebug_rs::config::DeviceConfig;
use std::thread::JoinHandle;

/// Create test channels with default size
pub fn create_test_channels<T, U>() -> (Sender<T>, Receiver<T>, Sender<U>, Receiver<U>) {
    let (tx1, rx1) = bounded(16);
    let (tx2, rx2) = bounded(16);
    (tx1, rx1, tx2, rx2)
}

/// A frontend handle wired to test channels instead of a backend
pub fn create_test_frontend() -> (
    FrontendReceiver,
    Receiver<BackendCommand>,
    Sender<BackendMessage>,
) {
    let (cmd_tx, cmd_rx, msg_tx, msg_rx) = create_test_channels();
    let frontend = FrontendReceiver {
        receiver: msg_rx,
        command_sender: cmd_tx,
    };
    (frontend, cmd_rx, msg_tx)
}

/// Simulated instrument with an open channel 1 and a resistor on channel 2
pub fn create_test_curve_tracer() -> MockCurveTracer {
    MockCurveTracer::connected().with_duts(MockDut::Open, MockDut::Resistor { ratio: 0.5 })
}

/// Device settings that make the worker acquire quickly
pub fn fast_device_config() -> DeviceConfig {
    DeviceConfig {
        acquire_interval_ms: 5,
        frame_timeout_ms: 50,
        ..DeviceConfig::default()
    }
}

/// Run a backend around `transport` on its own thread
pub fn spawn_backend(transport: MockCurveTracer) -> (FrontendReceiver, JoinHandle<()>) {
    let (backend, frontend) = CurveBackend::new(fast_device_config());
    let backend = backend.with_transport(Box::new(transport));
    let handle = std::thread::spawn(move || backend.run());
    (frontend, handle)
}
