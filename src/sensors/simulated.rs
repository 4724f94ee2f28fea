//! Stochastic stand-in for real hardware.
//!
//! Two phases drive the signal statistics: `Idle` (device resting on a desk) and
//! `Moving` (carried around). Each phase lasts for a randomly drawn dwell time and the
//! transition rule is evaluated once per reading. `is_moving` is derived from the
//! generated acceleration, not copied from the phase, so it can disagree with it.

use anyhow::Result;
use chrono::{DateTime, Local};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::models::{clamp_light, reading_timestamp, SensorReading};

use super::{BackendKind, Sensor};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

const REST_X: f64 = 0.0;
const REST_Y: f64 = 9.8;
const REST_Z: f64 = 0.0;

const IDLE_NOISE_SIGMA: f64 = 0.05;
const MOVING_NOISE_SIGMA: f64 = 2.0;
const IDLE_LIGHT_DRIFT: f64 = 1.0;
const MOVING_LIGHT_DRIFT: f64 = 20.0;
const SWAY_RATE: f64 = 3.0;
const INITIAL_LIGHT_LUX: f64 = 300.0;

const IDLE_TO_MOVING_PROBABILITY: f64 = 0.30;
const MOVING_DWELL_SECS: (f64, f64) = (2.0, 10.0);
const IDLE_DWELL_SECS: (f64, f64) = (5.0, 30.0);
const RECOVERY_DWELL_SECS: (f64, f64) = (10.0, 60.0);

/// Deviation from the rest vector above which a simulated sample counts as moving.
pub const SIMULATED_MOVING_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Moving,
}

#[derive(Debug, Clone)]
struct SimulationState {
    acc: [f64; 3],
    light: f64,
    phase: Phase,
    phase_start: f64,
    phase_duration: f64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            acc: [REST_X, REST_Y, REST_Z],
            light: INITIAL_LIGHT_LUX,
            phase: Phase::Idle,
            phase_start: 0.0,
            phase_duration: 0.0,
        }
    }
}

pub struct SimulatedSensor {
    running: bool,
    rng: StdRng,
    state: SimulationState,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible simulator, mainly for tests and demos.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            running: false,
            rng,
            state: SimulationState::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Advance the simulation to `now` and produce the matching sample.
    pub fn reading_at(&mut self, now: DateTime<Local>) -> SensorReading {
        let now_secs = now.timestamp_micros() as f64 / 1_000_000.0;
        self.advance_phase(now_secs);

        let (sigma, drift) = match self.state.phase {
            Phase::Idle => (IDLE_NOISE_SIGMA, IDLE_LIGHT_DRIFT),
            Phase::Moving => (MOVING_NOISE_SIGMA, MOVING_LIGHT_DRIFT),
        };

        let mut x = self.gauss(REST_X, sigma);
        let y = self.gauss(REST_Y, sigma);
        let z = self.gauss(REST_Z, sigma);
        if self.state.phase == Phase::Moving {
            x += (now_secs * SWAY_RATE).sin();
        }

        let light_step: f64 = self.rng.gen_range(-drift..=drift);
        self.state.light = clamp_light(self.state.light + light_step);
        self.state.acc = [x, y, z];

        SensorReading {
            timestamp: reading_timestamp(now),
            acc_x: x,
            acc_y: y,
            acc_z: z,
            light_level: self.state.light,
            is_moving: deviation_from_rest([x, y, z]) > SIMULATED_MOVING_THRESHOLD,
        }
    }

    /// Evaluates the phase transition rule once. Returns the phase that was left when the
    /// dwell time had expired, `None` when the current phase is still running.
    fn advance_phase(&mut self, now_secs: f64) -> Option<Phase> {
        if now_secs - self.state.phase_start <= self.state.phase_duration {
            return None;
        }

        let previous = self.state.phase;
        self.state.phase_start = now_secs;
        match previous {
            Phase::Idle => {
                if self.rng.gen_bool(IDLE_TO_MOVING_PROBABILITY) {
                    self.state.phase = Phase::Moving;
                    self.state.phase_duration = self.uniform(MOVING_DWELL_SECS);
                } else {
                    self.state.phase_duration = self.uniform(IDLE_DWELL_SECS);
                }
            }
            Phase::Moving => {
                self.state.phase = Phase::Idle;
                self.state.phase_duration = self.uniform(RECOVERY_DWELL_SECS);
            }
        }

        if previous != self.state.phase {
            log_debug!(
                "simulator phase {:?} -> {:?} for {:.1}s",
                previous,
                self.state.phase,
                self.state.phase_duration
            );
        }
        Some(previous)
    }

    fn gauss(&mut self, mean: f64, sigma: f64) -> f64 {
        let unit: f64 = self.rng.sample(StandardNormal);
        mean + sigma * unit
    }

    fn uniform(&mut self, (low, high): (f64, f64)) -> f64 {
        self.rng.gen_range(low..=high)
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for SimulatedSensor {
    fn start(&mut self) -> Result<()> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn get_reading(&mut self) -> Option<SensorReading> {
        if !self.running {
            return None;
        }
        Some(self.reading_at(Local::now()))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }
}

fn deviation_from_rest([x, y, z]: [f64; 3]) -> f64 {
    ((x - REST_X).powi(2) + (y - REST_Y).powi(2) + (z - REST_Z).powi(2)).sqrt()
}
