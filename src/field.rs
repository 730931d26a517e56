//! Game pieces on the field: blocks that can be carried and tubes they score into.

use crate::config::{FieldLayout, PieceColor, RuntimeConfig};
use crate::types::{Point, Pose};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    OnField,
    Carried,
    InTube(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameBlock {
    pub id: u32,
    pub color: PieceColor,
    pub position: Point,
    pub state: BlockState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameTube {
    pub index: u32, // 1-based, as shown to the driver
    pub position: Point,
    pub capacity: u32,
    pub stored: u32,
}

impl GameTube {
    pub fn is_full(&self) -> bool {
        self.stored >= self.capacity
    }
}

/// Something that happened to a block this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldEvent {
    PickedUp { color: PieceColor },
    Scored { color: PieceColor, tube: u32 },
    Dropped { color: PieceColor },
}

impl fmt::Display for FieldEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldEvent::PickedUp { color } => write!(f, "pickup {} block", color.label()),
            FieldEvent::Scored { color, tube } => {
                write!(f, "score {} block in tube {}", color.label(), tube)
            }
            FieldEvent::Dropped { color } => write!(f, "drop {} block", color.label()),
        }
    }
}

// Field state for one match
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub blocks: Vec<GameBlock>,
    pub tubes: Vec<GameTube>,
    pub scored_count: u32,
    pub status_text: String,
    carried: Option<usize>,
    intake_was_active: bool,
    outtake_was_active: bool,
}

impl Field {
    pub fn new(layout: &FieldLayout) -> Self {
        let tubes = layout
            .tubes
            .iter()
            .enumerate()
            .map(|(i, spec)| GameTube {
                index: i as u32 + 1,
                position: spec.position,
                capacity: spec.capacity,
                stored: 0,
            })
            .collect();
        let blocks = layout
            .blocks
            .iter()
            .enumerate()
            .map(|(i, spec)| GameBlock {
                id: i as u32,
                color: spec.color,
                position: spec.position,
                state: BlockState::OnField,
            })
            .collect();

        Field {
            blocks,
            tubes,
            scored_count: 0,
            status_text: "Field ready".to_string(),
            carried: None,
            intake_was_active: false,
            outtake_was_active: false,
        }
    }

    pub fn reset(&mut self, layout: &FieldLayout) {
        *self = Field::new(layout);
    }

    pub fn carried_block(&self) -> Option<&GameBlock> {
        self.carried.and_then(|i| self.blocks.get(i))
    }

    pub fn carried_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.state == BlockState::Carried)
            .count()
    }

    /// Pin the carried block to the robot and react to mechanism rising edges
    pub fn update(&mut self, pose: &Pose, intake: i32, outtake: i32, config: &RuntimeConfig) -> Vec<FieldEvent> {
        let robot = pose.position();
        if let Some(block) = self.carried.and_then(|i| self.blocks.get_mut(i)) {
            block.position = robot;
        }

        let intake_active = intake > 0;
        let outtake_active = outtake > 0;
        let mut events = Vec::new();

        if intake_active && !self.intake_was_active {
            events.extend(self.pick_up_nearest(robot, config.pickup_radius));
        }
        if outtake_active && !self.outtake_was_active {
            events.extend(self.score_or_drop(pose, config));
        }

        self.intake_was_active = intake_active;
        self.outtake_was_active = outtake_active;

        for event in &events {
            self.status_text = match event {
                FieldEvent::PickedUp { color } => format!("Picked up {} block", color.label()),
                FieldEvent::Scored { color, tube } => {
                    format!("Scored {} block in tube {}", color.label(), tube)
                }
                FieldEvent::Dropped { .. } => "Dropped carried block".to_string(),
            };
        }
        events
    }

    fn pick_up_nearest(&mut self, robot: Point, radius: f64) -> Option<FieldEvent> {
        if self.carried.is_some() {
            return None;
        }

        let (index, _) = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.state == BlockState::OnField)
            .map(|(i, b)| (i, b.position.distance(&robot)))
            .filter(|&(_, d)| d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let block = &mut self.blocks[index];
        block.state = BlockState::Carried;
        block.position = robot;
        self.carried = Some(index);
        Some(FieldEvent::PickedUp { color: block.color })
    }

    fn score_or_drop(&mut self, pose: &Pose, config: &RuntimeConfig) -> Option<FieldEvent> {
        let index = self.carried.take()?;
        let robot = pose.position();

        let nearest_tube = self
            .tubes
            .iter_mut()
            .map(|t| {
                let d = t.position.distance(&robot);
                (t, d)
            })
            .filter(|(_, d)| *d <= config.score_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t);

        let block = &mut self.blocks[index];
        if let Some(tube) = nearest_tube.filter(|t| !t.is_full()) {
            tube.stored += 1;
            block.state = BlockState::InTube(tube.index);
            block.position = tube.position;
            self.scored_count += 1;
            return Some(FieldEvent::Scored {
                color: block.color,
                tube: tube.index,
            });
        }

        let heading = pose.heading_deg.to_radians();
        let limit = config.field_size;
        block.state = BlockState::OnField;
        block.position = Point {
            x: (robot.x + heading.cos() * config.drop_offset).clamp(0.0, limit),
            y: (robot.y + heading.sin() * config.drop_offset).clamp(0.0, limit),
        };
        Some(FieldEvent::Dropped { color: block.color })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlockSpec, TubeSpec};
    use assert_approx_eq::assert_approx_eq;

    fn pose(x: f64, y: f64) -> Pose {
        Pose { x, y, heading_deg: 0.0 }
    }

    #[test]
    fn test_pickup_on_rising_edge_only() {
        let cfg = RuntimeConfig::default();
        let mut field = Field::new(&cfg.field_layout);
        let at_block = pose(64.0, 64.0);

        let events = field.update(&at_block, 127, 0, &cfg);
        assert_eq!(events, vec![FieldEvent::PickedUp { color: PieceColor::Red }]);
        assert_eq!(field.blocks[0].state, BlockState::Carried);
        assert_eq!(field.carried_count(), 1);

        // Holding intake is not a new edge; releasing and pressing again is refused
        assert!(field.update(&pose(72.0, 64.0), 127, 0, &cfg).is_empty());
        field.update(&pose(72.0, 64.0), 0, 0, &cfg);
        assert!(field.update(&pose(72.0, 64.0), 127, 0, &cfg).is_empty());
        assert_eq!(field.carried_count(), 1);
        assert_eq!(field.blocks[1].state, BlockState::OnField);
    }

    #[test]
    fn test_pickup_out_of_range_is_noop() {
        let cfg = RuntimeConfig::default();
        let mut field = Field::new(&cfg.field_layout);
        assert!(field.update(&pose(24.0, 24.0), 127, 0, &cfg).is_empty());
        assert!(field.carried_block().is_none());
    }

    #[test]
    fn test_carried_block_follows_robot() {
        let cfg = RuntimeConfig::default();
        let mut field = Field::new(&cfg.field_layout);
        field.update(&pose(64.0, 64.0), 127, 0, &cfg);
        field.update(&pose(100.0, 30.0), 127, 0, &cfg);
        let carried = field.carried_block().expect("block should be carried");
        assert_approx_eq!(carried.position.x, 100.0);
        assert_approx_eq!(carried.position.y, 30.0);
    }

    #[test]
    fn test_score_into_tube() {
        let cfg = RuntimeConfig::default();
        let mut field = Field::new(&cfg.field_layout);
        field.update(&pose(64.0, 64.0), 127, 0, &cfg);
        let events = field.update(&pose(118.0, 52.0), 0, 127, &cfg);
        assert_eq!(
            events,
            vec![FieldEvent::Scored {
                color: PieceColor::Red,
                tube: 2
            }]
        );
        assert_eq!(field.tubes[1].stored, 1);
        assert_eq!(field.blocks[0].state, BlockState::InTube(2));
        assert_eq!(field.blocks[0].position, field.tubes[1].position);
        assert_eq!(field.scored_count, 1);
        assert!(field.carried_block().is_none());
    }

    #[test]
    fn test_full_tube_drops_block_near_robot() {
        let layout = FieldLayout {
            tubes: vec![TubeSpec {
                position: Point { x: 100.0, y: 100.0 },
                capacity: 0,
            }],
            blocks: vec![BlockSpec {
                color: PieceColor::Blue,
                position: Point { x: 95.0, y: 100.0 },
            }],
        };
        let cfg = RuntimeConfig {
            field_layout: layout.clone(),
            ..Default::default()
        };
        let mut field = Field::new(&layout);
        let robot = pose(95.0, 100.0);
        field.update(&robot, 127, 0, &cfg);
        let events = field.update(&robot, 0, 127, &cfg);

        assert_eq!(events, vec![FieldEvent::Dropped { color: PieceColor::Blue }]);
        assert_eq!(field.tubes[0].stored, 0);
        assert_eq!(field.blocks[0].state, BlockState::OnField);
        assert_approx_eq!(field.blocks[0].position.x, 101.0);
        assert_approx_eq!(field.blocks[0].position.y, 100.0);
    }

    #[test]
    fn test_drop_is_clamped_to_field() {
        let cfg = RuntimeConfig::default();
        let mut field = Field::new(&cfg.field_layout);
        field.update(&pose(64.0, 64.0), 127, 0, &cfg);
        let edge = Pose {
            x: 142.0,
            y: 2.0,
            heading_deg: 0.0,
        };
        field.update(&edge, 0, 0, &cfg);
        field.update(&edge, 0, 127, &cfg);
        // tube 1 at (124, 24) is out of range, so the block is dropped
        assert_approx_eq!(field.blocks[0].position.x, 144.0);
        assert_eq!(field.blocks[0].state, BlockState::OnField);
    }

    #[test]
    fn test_reset_restores_layout() {
        let cfg = RuntimeConfig::default();
        let mut field = Field::new(&cfg.field_layout);
        field.update(&pose(64.0, 64.0), 127, 0, &cfg);
        field.update(&pose(124.0, 24.0), 0, 127, &cfg);
        field.reset(&cfg.field_layout);
        let again = {
            let mut f = field.clone();
            f.reset(&cfg.field_layout);
            f
        };
        assert_eq!(field, Field::new(&cfg.field_layout));
        assert_eq!(again, field);
    }
}
