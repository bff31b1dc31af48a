use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging dispatch.
///
/// Call this once at program start to enable tracing output.
/// Uses the `RUST_LOG` environment variable for filtering:
///
/// ```bash
/// RUST_LOG=mop_dispatch=debug my-host
/// RUST_LOG=mop::trace=debug my-host     # traced calls only
/// ```
///
/// Setting `MOP_TRACE_TREE` renders nested spans as an indented tree.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var("MOP_TRACE_TREE").is_ok() {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::debug!(target: "mop_dispatch", "still usable after repeated init");
    }
}
