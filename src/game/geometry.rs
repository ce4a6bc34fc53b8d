//! Grid coordinates and movement directions

use serde::{Deserialize, Serialize};

/// Integer position inside (or, transiently, outside) the cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Coordinate {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// True when every axis lies in `[0, edge_length)`
    pub fn is_within(&self, edge_length: u32) -> bool {
        let edge = i64::from(edge_length);
        [self.x, self.y, self.z]
            .iter()
            .all(|v| (0..edge).contains(v))
    }

    /// Shift one cell along the direction's axis. No clamping.
    pub fn step(self, direction: Direction) -> Self {
        let delta = direction.sign();
        match direction.axis() {
            Axis::X => Self { x: self.x + delta, ..self },
            Axis::Y => Self { y: self.y + delta, ..self },
            Axis::Z => Self { z: self.z + delta, ..self },
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One of the six unit moves a bot may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "+X")]
    PlusX,
    #[serde(rename = "-X")]
    MinusX,
    #[serde(rename = "+Y")]
    PlusY,
    #[serde(rename = "-Y")]
    MinusY,
    #[serde(rename = "+Z")]
    PlusZ,
    #[serde(rename = "-Z")]
    MinusZ,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::PlusX | Direction::MinusX => Axis::X,
            Direction::PlusY | Direction::MinusY => Axis::Y,
            Direction::PlusZ | Direction::MinusZ => Axis::Z,
        }
    }

    /// +1 or -1
    pub fn sign(self) -> i64 {
        match self {
            Direction::PlusX | Direction::PlusY | Direction::PlusZ => 1,
            Direction::MinusX | Direction::MinusY | Direction::MinusZ => -1,
        }
    }
}
