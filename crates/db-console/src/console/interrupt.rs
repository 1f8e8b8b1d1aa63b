use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

/// Raised by Ctrl-C; checked between pages and cleared before each statement.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Watches for Ctrl-C on a background thread. Each signal raises `flag` and
/// calls `on_interrupt`, which aborts the running statement.
///
/// While the line editor owns the terminal, Ctrl-C reaches it as a key press
/// instead and only clears the input line.
pub fn spawn_watcher<F>(flag: CancelFlag, on_interrupt: F)
where
    F: Fn() + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::warn!(error=%e, "no signal runtime; Ctrl-C will end the process");
                    return;
                }
            };
            rt.block_on(async move {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!(error=%e, "failed to listen for Ctrl-C");
                        return;
                    }
                    eprintln!("^C");
                    flag.raise();
                    on_interrupt();
                }
            });
        });
    if let Err(e) = spawned {
        tracing::warn!(error=%e, "failed to start Ctrl-C watcher");
    }
}
