#![allow(dead_code)]

use std::sync::{Arc, Once};

use parking_lot::Mutex;

static INIT_LOGGING: Once = Once::new();

/// Installs a trace-level subscriber writing through the test harness. Only the
/// first call does anything.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Shared log of labels pushed by callbacks, in firing order.
#[derive(Clone, Default)]
pub struct Fired(Arc<Mutex<Vec<String>>>);

impl Fired {
    pub fn push(&self, label: impl Into<String>) {
        self.0.lock().push(label.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}
