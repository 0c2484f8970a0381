use std::sync::OnceLock;

use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_DIRECTIVE: &str = "info";

/// Chatty http dependencies, clamped regardless of `RUST_LOG`.
const QUIET_TARGETS: [&str; 4] = ["h2=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn"];

pub fn get_subscriber() -> impl Subscriber + Send + Sync {
    let filter = QUIET_TARGETS.iter().fold(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
        |filter, directive| filter.add_directive(directive.parse().expect("well-formed")),
    );

    let fmt_layer = fmt::layer().with_file(true).with_line_number(true);

    tracing_subscriber::Registry::default()
        .with(filter)
        .with(fmt_layer)
}

/// Installs `subscriber` as the global default. Later calls are ignored.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    TELEMETRY_INIT.get_or_init(|| {
        tracing::subscriber::set_global_default(subscriber)
            .expect("no other global subscriber is installed");
    });
}
