use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directives per `ENVIRONMENT`. Request spans from tower-http stay at
/// info so a busy party night does not drown the queue events.
fn default_directives(environment: &str) -> &'static str {
    match environment {
        "production" => "info,karaoke_jukebox=debug,tower_http=info",
        "development" => "debug,tower_http=info",
        _ => "info",
    }
}

/// Installs the global tracing subscriber.
///
/// `ENVIRONMENT=production` writes JSON lines; anything else gets the pretty
/// formatter. `RUST_LOG`, when set, replaces the default directives.
pub fn init_logging() {
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&environment)));

    let production = environment == "production";
    let json = production.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
    });
    let pretty = (!production).then(|| {
        fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();

    tracing::debug!("Logging initialised for {}", environment);
}
