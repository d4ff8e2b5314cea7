//! Pause/resume handshake between the simulation thread and the command thread.
//!
//! The simulation thread parks with a reply describing why it stopped; the
//! command thread picks that reply up, answers the client, and later resumes
//! the simulation. A start gate holds the simulation back until the first Run.
//!
//! ```text
//! simulation thread                command thread
//! -----------------                --------------
//! wait_for_start()  <------------  resume_and_wait(Resume::Start)
//! park(reply)       ------------>  (returns reply)
//!      ...          <------------  resume_and_wait(Resume::Continue)
//! finish()          ------------>  (returns SimulationEnd)
//! ```

use crate::metrics::PauseTimer;
use crate::protocol::Reply;
use crate::tracing_ext;
use parking_lot::{Condvar, Mutex};

/// How the command thread resumes the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resume {
    /// Open the start gate.
    Start,
    /// Wake a parked simulation.
    Continue,
}

#[derive(Debug, Default)]
struct Inner {
    started: bool,
    /// The simulation is parked and `reply` describes why.
    stopped: bool,
    /// Consumed by the simulation thread when it wakes.
    continue_requested: bool,
    reply: Option<Reply>,
    ended: bool,
    /// No thread may block any more.
    closed: bool,
}

/// Two-state (parked / running) rendezvous.
#[derive(Debug, Default)]
pub struct Rendezvous {
    inner: Mutex<Inner>,
    start_cv: Condvar,
    stop_cv: Condvar,
    continue_cv: Condvar,
}

impl Rendezvous {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_started(&self) -> bool {
        self.inner.lock().started
    }

    pub fn has_ended(&self) -> bool {
        self.inner.lock().ended
    }

    /// Whether the simulation thread is currently parked.
    pub fn is_parked(&self) -> bool {
        let inner = self.inner.lock();
        inner.stopped && !inner.continue_requested
    }

    // ========== Simulation side ==========

    /// Block until the first Run request opens the start gate.
    pub fn wait_for_start(&self) {
        let mut inner = self.inner.lock();
        while !inner.started && !inner.closed {
            self.start_cv.wait(&mut inner);
        }
    }

    /// Park the simulation thread with `reply` until the client resumes it.
    ///
    /// Returns immediately once the simulation has ended.
    pub fn park(&self, reply: Reply) {
        let mut inner = self.inner.lock();
        if inner.ended || inner.closed {
            return;
        }

        let _span = tracing_ext::pause_span(reply.kind()).entered();
        let _timer = PauseTimer::start(reply.kind());
        tracing::info!("Simulation paused: {}", reply.kind());

        inner.reply = Some(reply);
        inner.stopped = true;
        self.stop_cv.notify_all();

        while !inner.continue_requested && !inner.closed {
            self.continue_cv.wait(&mut inner);
        }
        inner.continue_requested = false;

        tracing::debug!("Simulation resumed");
    }

    /// Report the end of the simulation and park once more so the client can
    /// still inspect the final state.
    ///
    /// Returns when the client resumes, or at once if the session is closing.
    pub fn finish(&self) {
        let mut inner = self.inner.lock();
        if inner.ended {
            return;
        }

        tracing::info!("Simulation ended");
        inner.ended = true;
        inner.reply = Some(Reply::SimulationEnd);
        inner.stopped = true;
        self.stop_cv.notify_all();

        while !inner.continue_requested && !inner.closed {
            self.continue_cv.wait(&mut inner);
        }
        inner.continue_requested = false;
    }

    /// Release every waiter for good.
    ///
    /// A command thread waiting for a pause receives
    /// [`Reply::SimulationEnd`]; nothing blocks afterwards.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if !inner.ended {
            inner.ended = true;
            inner.reply = Some(Reply::SimulationEnd);
        }
        inner.stopped = true;
        inner.closed = true;

        self.start_cv.notify_all();
        self.stop_cv.notify_all();
        self.continue_cv.notify_all();
    }

    // ========== Command side ==========

    /// Resume the simulation and wait until it pauses again.
    ///
    /// Returns the reply the pause produced, or a generic success if the
    /// simulation parked without one. Once the simulation has ended, returns
    /// [`Reply::SimulationEnd`] without waiting.
    pub fn resume_and_wait(&self, how: Resume) -> Reply {
        let mut inner = self.inner.lock();

        if inner.ended {
            // Release a simulation parked in `finish`
            inner.reply = None;
            inner.continue_requested = true;
            self.continue_cv.notify_all();
            return Reply::SimulationEnd;
        }

        match how {
            Resume::Start => {
                inner.started = true;
                self.start_cv.notify_all();
            }
            Resume::Continue => {
                inner.stopped = false;
                inner.continue_requested = true;
                self.continue_cv.notify_all();
            }
        }

        while !inner.stopped {
            self.stop_cv.wait(&mut inner);
        }

        inner.reply.take().unwrap_or_else(Reply::success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn wait_until_parked(rv: &Rendezvous) {
        for _ in 0..500 {
            if rv.is_parked() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("simulation never parked");
    }

    fn stopped() -> Reply {
        Reply::SimulationStopped {
            module: "parser".to_string(),
            packet_id: 1,
            time: 1.0,
            read: true,
        }
    }

    #[test]
    fn test_start_then_pause() {
        let rv = Arc::new(Rendezvous::new());

        let sim = {
            let rv = rv.clone();
            thread::spawn(move || {
                rv.wait_for_start();
                rv.park(stopped());
                rv.finish();
            })
        };

        let reply = rv.resume_and_wait(Resume::Start);
        assert_eq!(reply, stopped());
        assert!(rv.has_started());

        let reply = rv.resume_and_wait(Resume::Continue);
        assert_eq!(reply, Reply::SimulationEnd);

        // The simulation is parked in `finish` until the next resume
        wait_until_parked(&rv);
        assert_eq!(rv.resume_and_wait(Resume::Continue), Reply::SimulationEnd);
        sim.join().unwrap();

        // Later resumes never block
        assert_eq!(rv.resume_and_wait(Resume::Continue), Reply::SimulationEnd);
    }

    #[test]
    fn test_each_resume_yields_next_pause() {
        let rv = Arc::new(Rendezvous::new());

        let sim = {
            let rv = rv.clone();
            thread::spawn(move || {
                rv.wait_for_start();
                rv.park(Reply::success());
                rv.park(Reply::failed());
                rv.finish();
            })
        };

        assert_eq!(rv.resume_and_wait(Resume::Start), Reply::success());
        assert_eq!(rv.resume_and_wait(Resume::Continue), Reply::failed());
        assert_eq!(rv.resume_and_wait(Resume::Continue), Reply::SimulationEnd);
        rv.close();
        sim.join().unwrap();
    }

    #[test]
    fn test_close_releases_waiters() {
        let rv = Arc::new(Rendezvous::new());

        let sim = {
            let rv = rv.clone();
            thread::spawn(move || rv.wait_for_start())
        };

        rv.close();
        sim.join().unwrap();
        assert!(rv.has_ended());
        assert_eq!(rv.resume_and_wait(Resume::Start), Reply::SimulationEnd);
    }

    #[test]
    fn test_park_after_end_returns() {
        let rv = Rendezvous::new();
        rv.close();
        rv.park(Reply::success());
        rv.finish();
    }
}
