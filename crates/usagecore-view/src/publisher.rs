use std::sync::atomic::{AtomicBool, Ordering};

use usagecore_progress::{CancelHandle, ProgressListener};

use crate::context::UiHandle;
use crate::switcher::ProgressView;

pub trait ProgressMessages: Send + 'static {
    fn progress_started(generation: u64) -> Self;
    fn progress_changed(generation: u64) -> Self;
}

pub struct UiPublisher<M> {
    ui: UiHandle<M>,
    generation: u64,
    paint_in_queue: AtomicBool,
}

impl<M: ProgressMessages> UiPublisher<M> {
    pub fn new(ui: UiHandle<M>, generation: u64) -> Self {
        Self {
            ui,
            generation,
            paint_in_queue: AtomicBool::new(false),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.paint_in_queue.load(Ordering::Acquire)
    }

    // Interactive context only.
    pub fn drain(&self, handle: &CancelHandle) -> ProgressView {
        self.paint_in_queue.store(false, Ordering::Release);
        ProgressView::new(handle.text(), handle.fraction())
    }
}

impl<M: ProgressMessages> ProgressListener for UiPublisher<M> {
    fn started(&self) {
        self.ui.invoke_later(M::progress_started(self.generation));
    }

    fn changed(&self) {
        if self.paint_in_queue.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.ui.invoke_later(M::progress_changed(self.generation)) {
            self.paint_in_queue.store(false, Ordering::Release);
        }
    }
}
