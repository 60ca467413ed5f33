pub mod build_info;
pub mod paths;
pub mod persistence;

use std::sync::Once;

use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "payment_planner=info";

/// Installs the global fmt subscriber, honouring `RUST_LOG` on top of the crate default.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = match DEFAULT_DIRECTIVE.parse::<Directive>() {
            Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
            Err(_) => EnvFilter::from_default_env(),
        };
        // Another subscriber may already be installed by an embedding binary or test harness.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
