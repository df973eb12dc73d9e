//! One editable program bound to one servo link.
//!
//! Edits are refused with [`Error::Busy`] while a background playback runs,
//! since the playback works on a snapshot taken at start.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    config::RobotConfig,
    controller::ServoController,
    playback::{CancelToken, Interpreter, Playback, Progress, Report},
    program::{Line, SequenceProgram},
    transport::TransportSink,
    Error, Result,
};

pub struct Studio<S> {
    program: SequenceProgram,
    controller: Arc<Mutex<ServoController<S>>>,
    interpreter: Interpreter,
    active: Option<Playback>,
}

impl<S: TransportSink + 'static> Studio<S> {
    pub fn new(controller: ServoController<S>) -> Self {
        Studio {
            program: SequenceProgram::new(),
            controller: Arc::new(Mutex::new(controller)),
            interpreter: Interpreter::new(),
            active: None,
        }
    }

    pub fn with_program(mut self, program: SequenceProgram) -> Self {
        self.program = program;
        self
    }

    pub fn program(&self) -> &SequenceProgram {
        &self.program
    }

    pub fn text(&self) -> String {
        self.program.serialize()
    }

    pub fn controller(&self) -> Arc<Mutex<ServoController<S>>> {
        self.controller.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.interpreter.is_running()
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_playing() {
            return Err(Error::Busy);
        }
        Ok(())
    }

    pub fn append_move(&mut self, servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<()> {
        self.ensure_idle()?;
        self.program.append_move(servo_id, angle_deg, time_ms);
        Ok(())
    }

    pub fn append_delay(&mut self, duration_ms: u32) -> Result<()> {
        self.ensure_idle()?;
        self.program.append_delay(duration_ms);
        Ok(())
    }

    pub fn insert_move(
        &mut self,
        index: usize,
        servo_id: u8,
        angle_deg: u32,
        time_ms: u32,
    ) -> Result<bool> {
        self.ensure_idle()?;
        Ok(self.program.insert_move(index, servo_id, angle_deg, time_ms))
    }

    pub fn insert_delay(&mut self, index: usize, duration_ms: u32) -> Result<bool> {
        self.ensure_idle()?;
        Ok(self.program.insert_delay(index, duration_ms))
    }

    pub fn delete(&mut self, index: usize) -> Result<Option<Line>> {
        self.ensure_idle()?;
        Ok(self.program.delete(index))
    }

    pub fn paste(&mut self, text: &str) -> Result<usize> {
        self.ensure_idle()?;
        Ok(self.program.paste(text))
    }

    pub fn load_text(&mut self, text: &str) -> Result<()> {
        self.ensure_idle()?;
        self.program.replace(text);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.program.clear();
        Ok(())
    }

    pub fn send_move(&self, servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<()> {
        self.controller.lock().send_move(servo_id, angle_deg, time_ms)
    }

    pub fn send_change_id(&self, new_id: u8) -> Result<()> {
        self.controller.lock().send_change_id(new_id)
    }

    pub fn init_pose(&self, config: &RobotConfig) -> Result<usize> {
        self.controller.lock().init_pose(config)
    }

    /// Replays the program on the calling thread.
    pub fn play_blocking(&mut self, token: &CancelToken) -> Result<Report> {
        self.reap();
        let mut sink = self.controller.clone();
        self.interpreter
            .run(self.program.lines(), &mut sink, token, |_| {})
    }

    /// Starts a background playback of the current program.
    pub fn play<F>(&mut self, observer: F) -> Result<()>
    where
        F: FnMut(Progress<'_>) + Send + 'static,
    {
        self.reap();
        let playback = self.interpreter.spawn(
            self.program.clone(),
            self.controller.clone(),
            observer,
        )?;
        self.active = Some(playback);
        Ok(())
    }

    /// Cancels the background playback and returns its report.
    pub fn stop(&mut self) -> Result<Option<Report>> {
        match self.active.take() {
            Some(mut playback) => {
                playback.cancel();
                playback.join().map(Some)
            }
            None => Ok(None),
        }
    }

    /// Waits for the background playback to finish on its own.
    pub fn wait(&mut self) -> Result<Option<Report>> {
        match self.active.take() {
            Some(playback) => playback.join().map(Some),
            None => Ok(None),
        }
    }

    fn reap(&mut self) {
        if self.active.as_ref().map_or(false, Playback::is_finished) {
            debug!("reaping finished playback");
            self.active = None;
        }
    }
}
