use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Runtime switch between the configured log level and `debug`.
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    base_level: String,
}

impl LogControl {
    /// A control that toggles nothing; used when no subscriber was installed.
    pub fn detached(base_level: &str) -> Self {
        Self {
            handle: None,
            base_level: base_level.to_string(),
        }
    }

    pub fn set_debug(&self, on: bool) {
        let Some(handle) = &self.handle else { return };
        let filter = if on {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(&self.base_level)
        };
        if let Err(e) = handle.reload(filter) {
            tracing::warn!(error=%e, "failed to reload log filter");
        }
    }
}

pub fn init(log_level: &str, debug: bool) -> LogControl {
    // Prefer explicit --log-level; allow RUST_LOG override.
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };
    let (filter, handle) = reload::Layer::new(filter);
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok();

    LogControl {
        handle: installed.then_some(handle),
        base_level: log_level.to_string(),
    }
}
