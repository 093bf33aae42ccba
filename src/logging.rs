use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    EnvFilter, Layer,
};

const DEFAULT_FILTER: &str = "gif_angle_labeler=debug,info";

/// Logs to stderr and to a daily file under `logs/`.
///
/// The returned guard flushes the file writer on drop, keep it alive for the whole run.
pub fn init_logs() -> Option<WorkerGuard> {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }

    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_filter(filter());

    let appender = tracing_appender::rolling::daily("logs", "gif_angle_labeler.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(LocalTime::rfc_3339())
        .with_filter(filter());

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer);

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Some(guard),
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            None
        }
    }
}
