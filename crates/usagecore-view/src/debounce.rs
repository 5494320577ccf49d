use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::context::UiHandle;

pub struct Debouncer<M> {
    ui: UiHandle<M>,
    runtime: Handle,
    epoch: u64,
    pending: Option<(u64, JoinHandle<()>)>,
}

impl<M: Send + 'static> Debouncer<M> {
    pub fn new(ui: UiHandle<M>, runtime: Handle) -> Self {
        Self {
            ui,
            runtime,
            epoch: 0,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, delay: Duration, fire: F) -> u64
    where
        F: FnOnce(u64) -> M + Send + 'static,
    {
        self.cancel_pending();

        self.epoch = self.epoch.wrapping_add(1);
        let epoch = self.epoch;
        let ui = self.ui.clone();
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            ui.invoke_later(fire(epoch));
        });
        self.pending = Some((epoch, timer));

        debug!(epoch, delay_ms = delay.as_millis() as u64, "debounce scheduled");
        epoch
    }

    pub fn cancel_pending(&mut self) -> bool {
        let Some((epoch, timer)) = self.pending.take() else {
            return false;
        };
        timer.abort();
        debug!(epoch, "debounce canceled");
        true
    }

    // Stale epochs return false.
    pub fn take_fired(&mut self, epoch: u64) -> bool {
        match &self.pending {
            Some((pending, _)) if *pending == epoch => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<M> Drop for Debouncer<M> {
    fn drop(&mut self) {
        if let Some((_, timer)) = self.pending.take() {
            timer.abort();
        }
    }
}
