//! Built-in kinematic door-reaching scene (`door_reach`).
//!
//! A point gripper moves through a bounded workspace toward the handle of a
//! hinged door. Grasping the handle (gripper close enough, grip channel
//! engaged) swings the door open; the episode terminates once the hinge angle
//! passes [`OPEN_ANGLE`].

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::debug;

use crate::core::space::BoxSpace;
use crate::core::types::{Action, InfoMap, Observation, Position, StepResult, distance};
use crate::env::shaper::{DEFAULT_GRASP_POINT, DEFAULT_HANDLE_POINT};
use crate::env::{Environment, NamedPoints};
use crate::io::config::{EnvConfig, RenderMode};

pub const KIND: &str = "door_reach";

/// Seconds of simulated motion per step.
const DT: f64 = 0.05;
/// Gripper must be this close to the handle to grasp it.
const GRASP_RADIUS: f64 = 0.05;
/// Grip channel value above which the gripper is closed.
const GRIP_ENGAGED: f64 = 0.5;
/// Hinge rotation per grasped step, in radians.
const OPEN_RATE: f64 = 0.05;
/// Hinge angle at which the door counts as open.
pub const OPEN_ANGLE: f64 = 1.0;
const MAX_ANGLE: f64 = std::f64::consts::FRAC_PI_2;
const OPEN_BONUS: f64 = 10.0;
const DISTANCE_PENALTY: f64 = 0.1;

/// door angle + gripper xyz + handle xyz
const OBSERVATION_SIZE: usize = 7;

const HINGE: Position = [-0.3, 0.5, 0.3];
const DOOR_RADIUS: f64 = 0.3;
const WORKSPACE_LOW: Position = [-0.6, -0.2, 0.0];
const WORKSPACE_HIGH: Position = [0.6, 0.8, 0.6];

/// Door-reaching scene state.
pub struct DoorReachEnv {
    action_space: BoxSpace,
    render_mode: RenderMode,
    /// Wall-clock time one `human` frame is held for.
    frame_period: Duration,
    max_episode_steps: u32,
    rng: StdRng,
    gripper: Position,
    angle: f64,
    steps: u32,
    closed: bool,
}

impl DoorReachEnv {
    pub fn new(config: &EnvConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let frame_period = Duration::try_from_secs_f64(1.0 / config.render_fps)
            .with_context(|| format!("invalid render_fps {}", config.render_fps))?;
        Ok(Self {
            action_space: BoxSpace::uniform(4, -1.0, 1.0)?,
            render_mode: config.render_mode,
            frame_period,
            max_episode_steps: config.max_episode_steps,
            rng,
            gripper: [0.0, 0.0, 0.3],
            angle: 0.0,
            steps: 0,
            closed: false,
        })
    }

    /// Handle position for the current hinge angle.
    pub fn handle(&self) -> Position {
        [
            HINGE[0] + DOOR_RADIUS * self.angle.cos(),
            HINGE[1] - DOOR_RADIUS * self.angle.sin(),
            HINGE[2],
        ]
    }

    pub fn gripper(&self) -> Position {
        self.gripper
    }

    pub fn door_angle(&self) -> f64 {
        self.angle
    }

    fn is_open(&self) -> bool {
        self.angle >= OPEN_ANGLE
    }

    fn observation(&self) -> Observation {
        let mut parts = BTreeMap::new();
        parts.insert("door".to_string(), vec![self.angle]);
        parts.insert("gripper".to_string(), self.gripper.to_vec());
        parts.insert("handle".to_string(), self.handle().to_vec());
        Observation::Dict(parts)
    }

    fn info(&self) -> InfoMap {
        let mut info = InfoMap::new();
        info.insert(
            "distance".to_string(),
            json!(distance(&self.gripper, &self.handle())),
        );
        info.insert("door_angle".to_string(), json!(self.angle));
        info.insert("is_success".to_string(), json!(self.is_open()));
        info
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            bail!("{KIND} environment is closed");
        }
        Ok(())
    }
}

impl Environment for DoorReachEnv {
    fn reset(&mut self) -> Result<(Observation, InfoMap)> {
        self.ensure_open()?;
        self.gripper = [
            self.rng.gen_range(-0.3..=0.3),
            self.rng.gen_range(-0.1..=0.1),
            self.rng.gen_range(0.2..=0.4),
        ];
        self.angle = 0.0;
        self.steps = 0;
        Ok((self.observation(), self.info()))
    }

    fn step(&mut self, action: &Action) -> Result<StepResult> {
        self.ensure_open()?;
        let action = self.action_space.clip(action);
        let values = action.values();

        for axis in 0..3 {
            self.gripper[axis] = (self.gripper[axis] + values[axis] * DT)
                .clamp(WORKSPACE_LOW[axis], WORKSPACE_HIGH[axis]);
        }
        if distance(&self.gripper, &self.handle()) < GRASP_RADIUS && values[3] > GRIP_ENGAGED {
            self.angle = (self.angle + OPEN_RATE).min(MAX_ANGLE);
            // The closed gripper is carried along with the swinging handle.
            self.gripper = self.handle();
        }
        self.steps += 1;

        let distance = distance(&self.gripper, &self.handle());
        let mut reward = -DISTANCE_PENALTY * distance;
        if self.is_open() {
            reward += OPEN_BONUS;
        }

        Ok(StepResult {
            observation: self.observation(),
            reward,
            terminated: self.is_open(),
            truncated: self.steps >= self.max_episode_steps,
            info: self.info(),
        })
    }

    fn render(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.render_mode == RenderMode::Human {
            let handle = self.handle();
            println!(
                "[{KIND}] step={:>4} gripper=({:+.3}, {:+.3}, {:+.3}) handle=({:+.3}, {:+.3}, {:+.3}) door={:.3}rad",
                self.steps,
                self.gripper[0],
                self.gripper[1],
                self.gripper[2],
                handle[0],
                handle[1],
                handle[2],
                self.angle
            );
            thread::sleep(self.frame_period);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!(steps = self.steps, "closing {KIND}");
        self.closed = true;
        Ok(())
    }

    fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    fn observation_size(&self) -> usize {
        OBSERVATION_SIZE
    }

    fn named_points(&self) -> Option<&dyn NamedPoints> {
        Some(self)
    }
}

impl NamedPoints for DoorReachEnv {
    fn try_get_named_point(&self, name: &str) -> Result<Option<Position>> {
        match name {
            DEFAULT_GRASP_POINT => Ok(Some(self.gripper)),
            DEFAULT_HANDLE_POINT => Ok(Some(self.handle())),
            _ => Ok(None),
        }
    }

    fn point_names(&self) -> Vec<String> {
        vec![DEFAULT_GRASP_POINT.to_string(), DEFAULT_HANDLE_POINT.to_string()]
    }
}
