//! Test harness for the compile pipeline.
//!
//! Provides canned parts, a fluent scenario runner over the mock backend,
//! rich assertions, and structured build reports for diagnosing failures
//! in integration tests.

pub mod assertions;
pub mod helpers;
pub mod report;
pub mod scenario;

pub use helpers::HarnessError;
pub use report::BuildReport;
pub use scenario::Scenario;

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`. Safe to call from every
/// test; only the first call installs.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
