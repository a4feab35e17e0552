// Tracing bootstrap for binaries and integration harnesses embedding the client.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

fn default_directives(service_name: &str) -> String {
    format!("{}=info,travel_portal_core=info", service_name)
}

/// Install a global fmt subscriber once. `RUST_LOG` wins over the default
/// directives. Safe to call repeatedly and when another subscriber is
/// already installed.
pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
