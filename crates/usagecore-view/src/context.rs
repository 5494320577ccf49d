use tokio::sync::mpsc;

pub struct UiHandle<M> {
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Clone for UiHandle<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> UiHandle<M> {
    pub fn invoke_later(&self, message: M) -> bool {
        self.tx.send(message).is_ok()
    }
}

pub struct UiQueue<M> {
    rx: mpsc::UnboundedReceiver<M>,
}

impl<M> UiQueue<M> {
    pub async fn recv(&mut self) -> Option<M> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<M> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

pub fn ui_channel<M>() -> (UiHandle<M>, UiQueue<M>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiHandle { tx }, UiQueue { rx })
}
