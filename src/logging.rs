//! Inicialización de `tracing`.
//!
//! Los eventos van a stderr para que stdout quede libre para JSON/SARIF.
//! `SENTINEL_LOG` acepta la sintaxis de `EnvFilter`
//! (p. ej. `SENTINEL_LOG=sentinel_review::review=debug`).

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "SENTINEL_LOG";

static INIT: Once = Once::new();

/// Filtro por defecto cuando `SENTINEL_LOG` no está definida.
fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Idempotente: solo la primera llamada instala el subscriber.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbose)
                    .without_time(),
            )
            .with(filter)
            .init();
    });
}
