use std::{
    sync::{
        mpsc::{self, RecvTimeoutError, SyncSender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Represents a timer inside of the chip infrastruture, it will count down
/// to zero from what ever number is given. Who ticks it, and how often, is
/// decided by the owner of the machine (60Hz for the standard timing).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    value: u8,
}

impl Timer {
    /// Will create a new timer with the given value.
    pub fn new(value: u8) -> Self {
        Self { value }
    }

    /// Will set the value from which the timer shall count down from.
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }

    /// Will get the value that the counter is currently at.
    pub fn get_value(&self) -> u8 {
        self.value
    }

    /// Counts down by one, a timer at zero stays at zero.
    pub fn tick(&mut self) {
        self.value = self.value.saturating_sub(1);
    }

    pub fn is_active(&self) -> bool {
        self.value > 0
    }
}

/// Runs a callback periodically on behalf of the host.
pub trait TimedWorker {
    fn new() -> Self;
    fn start<T>(&mut self, callback: T, interval: Duration)
    where
        T: Send + FnMut() + 'static;
    fn stop(&mut self);
    fn is_alive(&self) -> bool;
}

/// Is the internal worker, that exists on the
/// second thread.
#[derive(Debug)]
pub struct Worker {
    /// Contains the actuall thread, that is running.
    thread: Option<JoinHandle<()>>,
    /// Contains the sync sender used to gracefull shutdown the thread.
    shutdown: Option<SyncSender<()>>,
    /// Counts the actuall threads used (this is never more then 2, but
    /// is simple to use.)
    alive: Arc<()>,
}

impl TimedWorker for Worker {
    /// Will initialize the new worker.
    fn new() -> Self {
        Self {
            thread: None,
            shutdown: None,
            alive: Arc::new(()),
        }
    }

    /// Will start the worker that will run the callback function
    /// every interval.
    /// Attention the worker assumes the callback will finish
    /// calculation faster then the interval.
    fn start<T>(&mut self, mut callback: T, interval: Duration)
    where
        T: Send + FnMut() + 'static,
    {
        // only a single thread per worker
        self.stop();

        let (send, recv) = mpsc::sync_channel::<()>(1);
        let alive = self.alive.clone();
        let thread = thread::spawn(move || {
            let _alive = alive;
            let mut timeout = interval;
            loop {
                match recv.recv_timeout(timeout) {
                    Err(RecvTimeoutError::Timeout) => {
                        let start = Instant::now();

                        callback();

                        // make sure there the system will at most wait the interval
                        timeout = interval
                            .checked_sub(start.elapsed())
                            .unwrap_or_else(|| Duration::from_secs(0));
                    }
                    Ok(_) | Err(_) => break, // shutdown
                }
            }
        });

        self.thread = Some(thread);
        self.shutdown = Some(send);
    }

    /// Will stop the worker, in two steps one by sending an empty message
    /// and second by droping the only sender for the given receiver.
    fn stop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            // the thread may already be gone, the join below tells the rest
            let _ = sender.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("The worker thread panicked.");
            }
        }
    }

    /// Checks if the thread is alive.
    fn is_alive(&self) -> bool {
        Arc::strong_count(&self.alive) > 1
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
