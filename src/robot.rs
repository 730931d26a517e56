use crate::config::{AXIS_LIMIT, RuntimeConfig, SIZE_SCALE_RANGE, SPEED_SCALE_RANGE};
use crate::types::{Point, Pose, WheelCommands};
use crate::utils::{normalize_degrees, push_capped};
use std::collections::VecDeque;

/// One point of the recent trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub time_s: f64,
    pub pose: Pose,
}

// The simulated differential-drive robot
#[derive(Debug, Clone)]
pub struct Robot {
    pub pose: Pose,
    pub speed_scale: f64,
    pub size_scale: f64,
    pub heading_hold: bool,
    pub six_wheel: bool,
    path: VecDeque<PoseSample>,
    path_cap: usize,
}

impl Robot {
    pub fn new(config: &RuntimeConfig) -> Self {
        Robot {
            pose: start_pose(config),
            speed_scale: 1.0,
            size_scale: 1.0,
            heading_hold: false,
            six_wheel: false,
            path: VecDeque::new(),
            path_cap: config.path_sample_cap,
        }
    }

    /// Put the robot back on its start pose and forget the trajectory.
    /// Scales and drive toggles are operator preferences and survive.
    pub fn reset_pose(&mut self, config: &RuntimeConfig) {
        self.pose = start_pose(config);
        self.path.clear();
    }

    pub fn set_speed_scale(&mut self, scale: f64) {
        self.speed_scale = clamp_scale(scale, SPEED_SCALE_RANGE);
    }

    pub fn set_size_scale(&mut self, scale: f64) {
        self.size_scale = clamp_scale(scale, SIZE_SCALE_RANGE);
    }

    /// Linear speed at full command, in inches per second
    pub fn top_speed(&self, config: &RuntimeConfig) -> f64 {
        (config.max_speed * self.speed_scale).max(config.min_speed)
    }

    /// Advance the pose by one tick of differential-drive kinematics
    pub fn integrate(&mut self, wheels: WheelCommands, time_s: f64, config: &RuntimeConfig) {
        let dt = config.dt();
        let speed = self.top_speed(config);
        let v_left = (wheels.left as f64 / AXIS_LIMIT as f64) * speed;
        let v_right = (wheels.right as f64 / AXIS_LIMIT as f64) * speed;
        let linear = (v_left + v_right) / 2.0;
        let angular = (v_right - v_left) / config.track_width; // rad/s

        let heading_rad = self.pose.heading_deg.to_radians() + angular * dt;
        let limit = config.field_size;
        self.pose.x = (self.pose.x + linear * heading_rad.cos() * dt).clamp(0.0, limit);
        self.pose.y = (self.pose.y + linear * heading_rad.sin() * dt).clamp(0.0, limit);
        self.pose.heading_deg = normalize_degrees(heading_rad.to_degrees());

        push_capped(
            &mut self.path,
            PoseSample {
                time_s,
                pose: self.pose,
            },
            self.path_cap,
        );
    }

    pub fn position(&self) -> Point {
        self.pose.position()
    }

    pub fn path(&self) -> &VecDeque<PoseSample> {
        &self.path
    }
}

fn start_pose(config: &RuntimeConfig) -> Pose {
    Pose {
        x: config.start_position.x,
        y: config.start_position.y,
        heading_deg: normalize_degrees(config.start_heading_deg),
    }
}

fn clamp_scale(scale: f64, (min, max): (f64, f64)) -> f64 {
    if scale.is_finite() { scale.clamp(min, max) } else { 1.0 }
}
