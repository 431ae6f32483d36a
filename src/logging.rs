use std::sync::Once;

use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter, Registry};

static INIT: Once = Once::new();

/// Initialize logging.  Nothing is emitted unless the environment variable
/// `RUST_LOG` is set to a non-empty value, in which case it is interpreted as
/// an `EnvFilter` directive and log lines go to stderr.  Calling this more than
/// once is harmless.
pub fn init_logging() {
    INIT.call_once(|| {
        // Wrapper scripts tend to set RUST_LOG unconditionally but potentially
        // with an empty value, and we don't want that to be interpreted as a
        // desire to enable logging.
        let rustlog = match std::env::var("RUST_LOG") {
            Ok(rustlog) if !rustlog.is_empty() => rustlog,
            _ => return,
        };

        let env_filter = match EnvFilter::try_new(&rustlog) {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!("Ignoring unparseable RUST_LOG {:?}: {}", rustlog, e);
                return;
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
            .compact()
            // The engine already floods stderr; keep our lines greppable.
            .with_ansi(false)
            .without_time()
            .with_filter(env_filter);

        // A test harness may already have installed a subscriber.
        let _ = Registry::default().with(layer).try_init();
    });
}
