//! Sequential replay of a program.
//!
//! Lines run strictly in order. Moves go to a [`MoveSink`]; a failed move is
//! logged and playback carries on. Delays are real-time pauses that end early
//! when the [`CancelToken`] fires. Cancellation is also checked before every
//! line.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    controller::ServoController,
    program::{Instruction, Line, SequenceProgram},
    transport::TransportSink,
    Error, Result,
};

mod cancel;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    pub dispatched: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Passed to the observer right before a line executes.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub index: usize,
    pub line: &'a Line,
}

pub trait MoveSink {
    fn send_move(&mut self, servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<()>;
}

impl<S: TransportSink> MoveSink for ServoController<S> {
    fn send_move(&mut self, servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<()> {
        ServoController::send_move(self, servo_id, angle_deg, time_ms)
    }
}

/// The lock is held for one move at a time.
impl<S: TransportSink> MoveSink for Arc<Mutex<ServoController<S>>> {
    fn send_move(&mut self, servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<()> {
        self.lock().send_move(servo_id, angle_deg, time_ms)
    }
}

impl<M: MoveSink + ?Sized> MoveSink for &mut M {
    fn send_move(&mut self, servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<()> {
        (**self).send_move(servo_id, angle_deg, time_ms)
    }
}

/// Runs at most one playback at a time. Clones share that guard.
#[derive(Debug, Clone)]
pub struct Interpreter {
    state: Arc<Mutex<State>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter {
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    /// Blocks the caller until every line ran or the token fired.
    pub fn run<M, F>(
        &self,
        lines: &[Line],
        sink: &mut M,
        token: &CancelToken,
        observer: F,
    ) -> Result<Report>
    where
        M: MoveSink + ?Sized,
        F: FnMut(Progress<'_>),
    {
        let guard = self.claim()?;
        Ok(execute(guard, lines, sink, token, observer))
    }

    pub fn play<M: MoveSink + ?Sized>(
        &self,
        program: &SequenceProgram,
        sink: &mut M,
    ) -> Result<Report> {
        self.run(program.lines(), sink, &CancelToken::never(), |_| {})
    }

    /// Replays `program` on a dedicated thread.
    pub fn spawn<M, F>(
        &self,
        program: SequenceProgram,
        mut sink: M,
        observer: F,
    ) -> Result<Playback>
    where
        M: MoveSink + Send + 'static,
        F: FnMut(Progress<'_>) + Send + 'static,
    {
        let guard = self.claim()?;
        let (cancel, token) = cancel_pair();

        let join = thread::Builder::new()
            .name("playback".into())
            .spawn(move || execute(guard, program.lines(), &mut sink, &token, observer))?;

        Ok(Playback {
            cancel,
            join: Some(join),
        })
    }

    fn claim(&self) -> Result<RunGuard> {
        let mut state = self.state.lock();
        if *state == State::Running {
            return Err(Error::Busy);
        }

        *state = State::Running;
        Ok(RunGuard {
            state: self.state.clone(),
            next: State::Idle,
        })
    }
}

/// Resets the interpreter state when a run ends, including by panic.
struct RunGuard {
    state: Arc<Mutex<State>>,
    next: State,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        *self.state.lock() = self.next;
    }
}

fn execute<M, F>(
    mut guard: RunGuard,
    lines: &[Line],
    sink: &mut M,
    token: &CancelToken,
    mut observer: F,
) -> Report
where
    M: MoveSink + ?Sized,
    F: FnMut(Progress<'_>),
{
    let start = Instant::now();
    let mut report = Report {
        outcome: Outcome::Completed,
        dispatched: 0,
        failed: 0,
        skipped: 0,
        elapsed: Duration::ZERO,
    };

    debug!(lines = lines.len(), "playback start");
    for (index, line) in lines.iter().enumerate() {
        if token.is_cancelled() {
            report.outcome = Outcome::Cancelled;
            break;
        }

        observer(Progress { index, line });

        match line {
            Line::Instruction(Instruction::Delay { duration_ms }) => {
                trace!(index, duration_ms, "delay");
                if !token.sleep(Duration::from_millis(*duration_ms as u64)) {
                    report.outcome = Outcome::Cancelled;
                    break;
                }
            }

            Line::Instruction(Instruction::Move {
                servo_id,
                angle_deg,
                time_ms,
            }) => match sink.send_move(*servo_id, *angle_deg, *time_ms) {
                Ok(()) => report.dispatched += 1,
                Err(e) => {
                    warn!(index, servo_id, "move failed, continuing: {}", e);
                    report.failed += 1;
                }
            },

            Line::Text(text) => {
                if line.is_malformed() {
                    warn!(index, line = %text, "malformed instruction skipped");
                } else {
                    trace!(index, "text line skipped");
                }
                report.skipped += 1;
            }
        }
    }

    report.elapsed = start.elapsed();
    if report.outcome == Outcome::Cancelled {
        guard.next = State::Cancelled;
    }

    info!(
        outcome = ?report.outcome,
        dispatched = report.dispatched,
        failed = report.failed,
        skipped = report.skipped,
        elapsed = ?report.elapsed,
        "playback finished"
    );
    report
}

/// A playback running on its own thread. Dropping it cancels the playback
/// and waits for the thread.
pub struct Playback {
    cancel: CancelHandle,
    join: Option<thread::JoinHandle<Report>>,
}

impl Playback {
    pub fn cancel(&mut self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    pub fn join(mut self) -> Result<Report> {
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| Error::Other("playback thread panicked".into())),
            None => Err(Error::Other("playback already joined".into())),
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            debug!("wait for playback thread to be stopped");
            let _ = join.join();
        }
    }
}
