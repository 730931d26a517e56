//! Drive kinematics: maps the logical controller to left/right wheel commands.

use crate::config::{AXIS_LIMIT, DPAD_MIN_SPEED, RuntimeConfig};
use crate::input::ControllerSnapshot;
use crate::types::{ControllerButton, DriveMode, WheelCommands};
use crate::utils::{clamp_axis, shortest_heading_error};

/// Which D-pad directions are held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DpadFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DpadFlags {
    pub fn from_snapshot(snapshot: &ControllerSnapshot) -> Self {
        DpadFlags {
            up: snapshot.buttons.is_pressed(ControllerButton::Up),
            down: snapshot.buttons.is_pressed(ControllerButton::Down),
            left: snapshot.buttons.is_pressed(ControllerButton::Left),
            right: snapshot.buttons.is_pressed(ControllerButton::Right),
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// Cardinal target heading for heading-hold; up wins, then right, down, left
    pub fn target_heading(&self) -> f64 {
        if self.up {
            0.0
        } else if self.right {
            90.0
        } else if self.down {
            180.0
        } else if self.left {
            270.0
        } else {
            0.0
        }
    }
}

/// Robot-side context the D-pad mode needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveContext {
    pub heading_hold: bool,
    pub heading_deg: f64,
    pub speed_scale: f64,
}

/// Wheel commands for the given drive mode
pub fn compute_wheel_commands(
    snapshot: &ControllerSnapshot,
    mode: DriveMode,
    dpad: DpadFlags,
    ctx: &DriveContext,
    config: &RuntimeConfig,
) -> WheelCommands {
    match mode {
        DriveMode::Tank => WheelCommands::new(clamp_axis(snapshot.axis(3)), clamp_axis(snapshot.axis(2))),
        DriveMode::Arcade => {
            let throttle = snapshot.axis(3);
            let turn = snapshot.axis(1);
            WheelCommands::new(clamp_axis(throttle + turn), clamp_axis(throttle - turn))
        }
        DriveMode::Dpad => dpad_commands(dpad, ctx, config),
    }
}

fn dpad_commands(dpad: DpadFlags, ctx: &DriveContext, config: &RuntimeConfig) -> WheelCommands {
    if !dpad.any() {
        return WheelCommands::STOP;
    }

    let speed = ((config.dpad_base_speed as f64 * ctx.speed_scale).round() as i32)
        .clamp(DPAD_MIN_SPEED, AXIS_LIMIT);

    if ctx.heading_hold {
        let error = shortest_heading_error(dpad.target_heading(), ctx.heading_deg);
        let turn = (error * config.heading_gain)
            .clamp(-config.heading_turn_limit, config.heading_turn_limit);
        return WheelCommands::new(
            clamp_axis((speed as f64 - turn) as i32),
            clamp_axis((speed as f64 + turn) as i32),
        );
    }

    if dpad.up {
        WheelCommands::new(speed, speed)
    } else if dpad.down {
        WheelCommands::new(-speed, -speed)
    } else if dpad.left {
        WheelCommands::new(-speed, speed)
    } else {
        WheelCommands::new(speed, -speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DriveContext {
        DriveContext {
            heading_hold: false,
            heading_deg: 0.0,
            speed_scale: 1.0,
        }
    }

    fn snapshot(axes: [i32; 4]) -> ControllerSnapshot {
        ControllerSnapshot {
            axes,
            ..Default::default()
        }
    }

    #[test]
    fn test_tank_mode() {
        let cfg = RuntimeConfig::default();
        let cmd = compute_wheel_commands(
            &snapshot([0, -40, 90, 0]),
            DriveMode::Tank,
            DpadFlags::default(),
            &ctx(),
            &cfg,
        );
        assert_eq!(cmd, WheelCommands::new(90, -40));
    }

    #[test]
    fn test_arcade_mode_clamps() {
        let cfg = RuntimeConfig::default();
        let cmd = compute_wheel_commands(
            &snapshot([60, 0, 100, 0]),
            DriveMode::Arcade,
            DpadFlags::default(),
            &ctx(),
            &cfg,
        );
        assert_eq!(cmd, WheelCommands::new(127, 40));
    }

    #[test]
    fn test_dpad_directions_and_scale() {
        let cfg = RuntimeConfig::default();
        let snap = ControllerSnapshot::default();
        let left = DpadFlags {
            left: true,
            ..Default::default()
        };
        assert_eq!(
            compute_wheel_commands(&snap, DriveMode::Dpad, left, &ctx(), &cfg),
            WheelCommands::new(-80, 80)
        );

        let slow = DriveContext {
            speed_scale: 0.1,
            ..ctx()
        };
        let up = DpadFlags {
            up: true,
            ..Default::default()
        };
        assert_eq!(
            compute_wheel_commands(&snap, DriveMode::Dpad, up, &slow, &cfg),
            WheelCommands::new(25, 25)
        );
        assert_eq!(
            compute_wheel_commands(&snap, DriveMode::Dpad, DpadFlags::default(), &ctx(), &cfg),
            WheelCommands::STOP
        );
    }

    #[test]
    fn test_dpad_heading_hold_blends_turn() {
        let cfg = RuntimeConfig::default();
        let hold = DriveContext {
            heading_hold: true,
            heading_deg: 80.0,
            speed_scale: 1.0,
        };
        let right = DpadFlags {
            right: true,
            ..Default::default()
        };
        // error = 10 deg -> turn 12
        let cmd = compute_wheel_commands(&ControllerSnapshot::default(), DriveMode::Dpad, right, &hold, &cfg);
        assert_eq!(cmd, WheelCommands::new(68, 92));

        // Large error saturates at the turn limit
        let far = DriveContext {
            heading_deg: 270.0,
            ..hold
        };
        let cmd = compute_wheel_commands(&ControllerSnapshot::default(), DriveMode::Dpad, right, &far, &cfg);
        assert_eq!(cmd, WheelCommands::new(20, 127));
    }
}
