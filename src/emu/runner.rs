use super::{Chip8, Chip8Error, StepResult};
use crate::u4;

pub const CPU_HZ: f32 = 700.0;
pub const TIMER_HZ: f32 = 60.0;

/// Fixed-rate driver: runs CPU steps and timer ticks from separate time accumulators.
pub struct Chip8Runner {
    chip8: Chip8,
    cpu_time_step: f32,
    cpu_dt_accumulator: f32,
    timer_dt_accumulator: f32,
}

/// What happened during one [`Chip8Runner::update`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Chip8RunnerResult {
    pub steps: u32,
    pub timer_ticks: u32,
    /// The sound timer ran out during one of the ticks.
    pub tone_ended: bool,
    /// Unknown opcodes skipped while stepping.
    pub unknown_opcodes: u32,
    /// The most recent unknown opcode skipped during this update.
    pub last_unknown_opcode: Option<UnknownOpcode>,
}

/// An unknown opcode and the address it was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOpcode {
    pub opcode: u16,
    pub address: u16,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8) -> Self {
        Self::with_cpu_hz(chip8, CPU_HZ)
    }

    pub fn with_cpu_hz(chip8: Chip8, cpu_hz: f32) -> Self {
        Self {
            chip8,
            cpu_time_step: 1.0 / cpu_hz,
            cpu_dt_accumulator: 0.0,
            timer_dt_accumulator: 0.0,
        }
    }

    /// Update emulator by delta time, handles both CPU and timer cycles.
    ///
    /// Timers always catch up with `dt`. CPU steps stop early after a display
    /// change or while waiting for a key, so the driver can present the frame
    /// and pump input before executing more instructions.
    pub fn update(&mut self, dt: f32) -> Result<Chip8RunnerResult, Chip8Error> {
        let mut result = Chip8RunnerResult::default();

        self.cpu_dt_accumulator += dt;
        self.timer_dt_accumulator += dt;

        while self.timer_dt_accumulator >= 1.0 / TIMER_HZ {
            self.timer_dt_accumulator -= 1.0 / TIMER_HZ;
            result.timer_ticks += 1;
            result.tone_ended |= self.chip8.tick_timers();
        }

        while self.cpu_dt_accumulator >= self.cpu_time_step {
            self.cpu_dt_accumulator -= self.cpu_time_step;
            result.steps += 1;

            match self.chip8.step()? {
                StepResult::Redraw | StepResult::WaitingForKey => {
                    // We clear the accumulator to avoid "catching up" in the next frame.
                    self.cpu_dt_accumulator = 0.0;
                    break;
                }
                StepResult::UnknownOpcode { opcode, address } => {
                    result.unknown_opcodes += 1;
                    result.last_unknown_opcode = Some(UnknownOpcode { opcode, address });
                }
                StepResult::Continue => {}
            }
        }

        Ok(result)
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.chip8.should_beep()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.chip8.set_key(key, pressed)
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }
}
