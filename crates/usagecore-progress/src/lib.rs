use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("search canceled")]
pub struct Canceled;

pub trait ProgressListener: Send + Sync {
    fn started(&self);
    fn changed(&self);
}

#[derive(Default)]
struct ProgressState {
    text: Mutex<String>,
    fraction_bits: AtomicU64,
    canceled: AtomicBool,
    running: AtomicBool,
}

impl ProgressState {
    fn text_guard(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fraction(&self) -> f64 {
        f64::from_bits(self.fraction_bits.load(Ordering::Acquire))
    }
}

struct Shared {
    generation: u64,
    state: ProgressState,
    listener: Option<Arc<dyn ProgressListener>>,
}

#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    pub fn new(generation: u64) -> Self {
        Self::build(generation, None)
    }

    pub fn with_listener(generation: u64, listener: Arc<dyn ProgressListener>) -> Self {
        Self::build(generation, Some(listener))
    }

    fn build(generation: u64, listener: Option<Arc<dyn ProgressListener>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                generation,
                state: ProgressState::default(),
                listener,
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation
    }

    pub fn start(&self) {
        if self.shared.state.running.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(listener) = &self.shared.listener {
            listener.started();
        }
    }

    pub fn stop(&self) {
        self.shared.state.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.running.load(Ordering::Acquire)
    }

    pub fn set_text(&self, text: &str) {
        {
            let mut current = self.shared.state.text_guard();
            if current.as_str() == text {
                return;
            }
            current.clear();
            current.push_str(text);
        }
        self.notify_changed();
    }

    pub fn set_fraction(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let previous = f64::from_bits(
            self.shared
                .state
                .fraction_bits
                .swap(fraction.to_bits(), Ordering::AcqRel),
        );
        if previous != fraction {
            self.notify_changed();
        }
    }

    pub fn text(&self) -> String {
        self.shared.state.text_guard().clone()
    }

    pub fn fraction(&self) -> f64 {
        self.shared.state.fraction()
    }

    /// Returns `true` only for the call that actually flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.shared.state.canceled.swap(true, Ordering::AcqRel)
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.state.canceled.load(Ordering::Acquire)
    }

    pub fn check_canceled(&self) -> Result<(), Canceled> {
        if self.is_canceled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }

    fn notify_changed(&self) {
        if let Some(listener) = &self.shared.listener {
            listener.changed();
        }
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("generation", &self.shared.generation)
            .field("canceled", &self.is_canceled())
            .field("running", &self.is_running())
            .finish()
    }
}
