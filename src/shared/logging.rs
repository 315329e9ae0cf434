use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "offline=debug,offline_first_lib=debug,info";

/// Installs the global subscriber. `json` switches to structured output for
/// log shipping; otherwise the human-readable formatter is used.
pub fn init(service_name: &str, json: bool) {
    init_with_filter(service_name, DEFAULT_FILTER, json);
}

/// Like [`init`], with `default_filter` used when `RUST_LOG` is unset.
pub fn init_with_filter(service_name: &str, default_filter: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().with_target(true).try_init()
    } else {
        builder.with_target(true).try_init()
    };

    if result.is_err() {
        // A subscriber is already installed (tests, embedding applications).
        return;
    }

    tracing::info!(service = service_name, "logging initialized");
}
