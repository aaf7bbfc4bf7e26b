use std::time::Duration;

use crate::{
    chip8::{Machine, TimerCadence},
    definitions,
    devices::{DisplayCommands, KeyboardCommands},
    opcode::Operation,
    timer::TimedWorker,
    ProcessError,
};

/// The pacing of the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// The amount of instructions executed per frame.
    pub cycles_per_frame: usize,
    /// The time between two frames, the timers are ticked once per frame.
    pub frame_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycles_per_frame: definitions::runner::CYCLES_PER_FRAME,
            frame_interval: Duration::from_millis(definitions::timer::INTERVAL),
        }
    }
}

/// What happened during a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    /// executed instructions, a pending key wait ends the frame early
    pub cycles: usize,
    /// the screen was handed to the display
    pub drawn: bool,
    /// the host shall beep
    pub sound: bool,
}

/// Couples a machine with the host devices.
pub struct Runner<D, K>
where
    D: DisplayCommands,
    K: KeyboardCommands,
{
    machine: Machine,
    display: D,
    keyboard: K,
    config: RunnerConfig,
}

impl<D, K> Runner<D, K>
where
    D: DisplayCommands,
    K: KeyboardCommands,
{
    pub fn new(machine: Machine, display: D, keyboard: K) -> Self {
        Self::with_config(machine, display, keyboard, RunnerConfig::default())
    }

    pub fn with_config(
        machine: Machine,
        mut display: D,
        keyboard: K,
        config: RunnerConfig,
    ) -> Self {
        display.clear_display();
        Self {
            machine,
            display,
            keyboard,
            config,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn config(&self) -> RunnerConfig {
        self.config
    }

    /// Runs the instructions of a single frame.
    ///
    /// The keyboard is sampled once at the start of the frame, the display is
    /// only updated if at least one instruction changed the screen. A fatal
    /// error ends the frame without ticking the timers.
    pub fn run_frame(&mut self) -> Result<Frame, ProcessError> {
        let keys = self.keyboard.get_keyboard();
        self.machine.set_keys(&keys);

        let mut frame = Frame::default();
        let mut result = Ok(());
        for _ in 0..self.config.cycles_per_frame {
            let operation = match self.machine.step() {
                Ok(operation) => operation,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            };
            frame.cycles += 1;

            match operation {
                Operation::Draw => frame.drawn = true,
                // nothing will change until the keyboard is sampled again
                Operation::Wait => break,
                Operation::None => {}
            }
        }

        // the screen drawn before a fatal error is still shown
        if frame.drawn {
            self.display.display(self.machine.screen());
        }
        result?;

        if self.machine.config().timer_cadence == TimerCadence::Host {
            self.machine.tick_timers();
        }
        frame.sound = self.machine.is_sound_active();

        Ok(frame)
    }
}

/// Will run the given runner on a worker, one frame per interval. A fatal error
/// stops the execution, the worker keeps idling until it is stopped.
pub fn run<D, K, W>(mut runner: Runner<D, K>) -> W
where
    D: DisplayCommands + Send + 'static,
    K: KeyboardCommands + Send + 'static,
    W: TimedWorker,
{
    let interval = runner.config().frame_interval;
    let mut halted = false;

    let inner_run = move || {
        if halted {
            return;
        }

        if let Err(err) = runner.run_frame() {
            log::error!("Stopped the execution: {}", err);
            halted = true;
        }
    };

    let mut worker = W::new();
    worker.start(inner_run, interval);

    worker
}
