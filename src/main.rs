//! CurveBug I-V Curve Tracer - Main Entry Point

use curvebug_rs::{
    backend::CurveBackend,
    config::{ensure_app_data_dir, AppConfig, UiSession},
    frontend::CurveBugApp,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rolling log file prefix inside the app data directory
const LOG_FILE_PREFIX: &str = "curvebug.log";

fn main() -> eframe::Result<()> {
    // File logging when the data directory is known; the guard flushes on drop
    let (file_layer, _log_guard) = match ensure_app_data_dir().ok() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,curvebug_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting CurveBug");

    let config = AppConfig::load_or_default();
    let session = UiSession::load();

    // Spawn the acquisition thread
    let (backend, frontend) = CurveBackend::new(config.device.clone());
    let backend = backend.with_excitation_mode(session.mode);
    let backend_handle = std::thread::spawn(move || backend.run());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width as f32, config.window.height as f32])
            .with_min_inner_size([400.0, 400.0])
            .with_title("CurveBug I-V Curve Tracer"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "CurveBug",
        native_options,
        Box::new(|cc| Ok(Box::new(CurveBugApp::new(cc, frontend, config, session)))),
    );

    // on_exit already asked the worker to stop; dropping the app closed its channel
    tracing::info!("Shutting down...");
    if backend_handle.join().is_err() {
        tracing::error!("Acquisition thread panicked");
    }

    result
}
