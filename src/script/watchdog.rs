//! Wall-clock supervisor for script execution.
//!
//! A watchdog thread waits on a cancel channel; if the deadline passes first
//! it raises the `expired` flag. The interpreter polls the flag through its
//! interrupt handler and stops at the next check. The watchdog never touches
//! script state directly.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

pub struct Watchdog {
    deadline: Duration,
    expired: Arc<AtomicBool>,
    interrupted: Arc<AtomicBool>,
    cancel: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn arm(deadline: Duration) -> io::Result<Self> {
        let expired = Arc::new(AtomicBool::new(false));
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

        let flag = expired.clone();
        let thread = thread::Builder::new()
            .name("pmrun-watchdog".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(deadline) {
                    flag.store(true, Ordering::SeqCst);
                }
            })?;

        Ok(Self {
            deadline,
            expired,
            interrupted: Arc::new(AtomicBool::new(false)),
            cancel: Some(cancel_tx),
            thread: Some(thread),
        })
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Handler for the interpreter: returns `true` once the deadline has
    /// passed and remembers that it asked for an interrupt.
    pub fn interrupt_handler(&self) -> impl FnMut() -> bool + Send + 'static {
        let expired = self.expired.clone();
        let interrupted = self.interrupted.clone();
        move || {
            if expired.load(Ordering::SeqCst) {
                interrupted.store(true, Ordering::SeqCst);
                true
            } else {
                false
            }
        }
    }

    pub fn interrupted_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub fn expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Whether the interpreter was actually stopped by this watchdog.
    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Stops the supervising thread. Idempotent.
    pub fn disarm(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
