//! Shared test support: logging setup and access to `tests/resources`.

use std::env;
use std::path::PathBuf;
use std::sync::Once;

use serde_json::Value;

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

/// Install the test subscriber once per process. `RUST_LOG` overrides the
/// default `fieldtree=debug` filter.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        setup_test_logging();
        info!("Test Setup complete");
    });
}

/// Absolute path of a file under `tests/resources`, independent of the
/// working directory the test runner picked.
pub fn resource(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources")
        .join(relative)
}

/// Parse a stored schema fixture (`tests/resources/schemas/<name>.json`).
///
/// Panics on a missing or malformed fixture; only meant for tests.
pub fn load_schema(name: &str) -> Vec<Value> {
    let path = resource(&format!("schemas/{}.json", name));
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}

fn setup_test_logging() {
    let env_filter = env::var("RUST_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("fieldtree=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repeated_calls_when_initializing_then_no_panic() {
        init_test_setup();
        init_test_setup();
    }

    #[test]
    fn given_product_fixture_when_loading_then_three_top_level_entries() {
        let schema = load_schema("product");

        assert_eq!(schema.len(), 3);
        assert!(resource("templates/custom.toml").is_file());
    }
}
