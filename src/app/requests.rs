use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::error::ClientResult;
use crate::store::Lifecycle;

/// One background request whose newest issue wins; older answers are dropped with their channel.
pub(super) struct Latest<T> {
    rx: Option<Receiver<ClientResult<T>>>,
    value: Option<T>,
    lifecycle: Lifecycle,
}

impl<T: Send + 'static> Latest<T> {
    pub(super) fn new() -> Self {
        Self {
            rx: None,
            value: None,
            lifecycle: Lifecycle::Idle,
        }
    }

    pub(super) fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> ClientResult<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(job());
        });

        self.rx = Some(rx);
        self.lifecycle = Lifecycle::Pending;
    }

    pub(super) fn poll(&mut self) -> bool {
        let Some(rx) = self.rx.take() else {
            return false;
        };

        match rx.try_recv() {
            Ok(Ok(value)) => {
                self.value = Some(value);
                self.lifecycle = Lifecycle::Idle;
            }
            Ok(Err(error)) => {
                self.lifecycle = Lifecycle::Failed(error.to_string());
            }
            Err(TryRecvError::Empty) => {
                self.rx = Some(rx);
                return false;
            }
            Err(TryRecvError::Disconnected) => {
                self.lifecycle = Lifecycle::Failed("Background request worker disconnected".to_owned());
            }
        }
        true
    }

    pub(super) fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(super) fn clear(&mut self) {
        self.rx = None;
        self.value = None;
        self.lifecycle = Lifecycle::Idle;
    }

    pub(super) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}
