use std::time::Duration;

use crossbeam_channel::{bounded, never, select, Receiver, Sender, TryRecvError};

/// Cancellation is signalled by dropping the sender; nothing is ever sent.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = bounded(0);
    (CancelHandle { tx: Some(tx) }, CancelToken { rx })
}

/// Dropping the handle cancels as well.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<Sender<()>>,
}

impl CancelHandle {
    pub fn cancel(&mut self) {
        drop(self.tx.take());
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        CancelToken { rx: never() }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Waits `dur` unless cancelled first. Returns `false` on cancellation.
    pub fn sleep(&self, dur: Duration) -> bool {
        select! {
            recv(self.rx) -> _ => false,
            default(dur) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn never_token_sleeps_full_duration() {
        let token = CancelToken::never();
        let start = Instant::now();
        assert!(token.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_interrupts_sleep() {
        let (mut handle, token) = cancel_pair();
        assert!(!token.is_cancelled());

        let waiter = thread::spawn(move || {
            let start = Instant::now();
            let slept = token.sleep(Duration::from_secs(10));
            (slept, start.elapsed(), token.is_cancelled())
        });

        thread::sleep(Duration::from_millis(20));
        handle.cancel();
        assert!(handle.is_cancelled());

        let (slept, elapsed, cancelled) = waiter.join().expect("waiter");
        assert!(!slept);
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn dropped_handle_cancels() {
        let (handle, token) = cancel_pair();
        drop(handle);
        assert!(token.is_cancelled());
        assert!(!token.sleep(Duration::from_secs(10)));
    }
}
