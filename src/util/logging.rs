use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing/logging based on environment variables.
///
/// `LOG_FORMAT=json` switches to structured JSON output for log shippers.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("talk_to_data=info,info"));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
