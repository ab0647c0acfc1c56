//! Shared value types for browser operations.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use webpilot_core_types::{ActionResult, PageSnapshot};

/// Scroll direction for the scroll primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// Parse a direction from free text, defaulting to down.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.contains("up") || lowered.contains("top") {
            ScrollDirection::Up
        } else if lowered.contains("left") {
            ScrollDirection::Left
        } else if lowered.contains("right") {
            ScrollDirection::Right
        } else {
            ScrollDirection::Down
        }
    }

    /// Pixel offsets `(x, y)` for one scroll step.
    pub fn offsets(&self, distance: i64) -> (i64, i64) {
        match self {
            ScrollDirection::Up => (0, -distance),
            ScrollDirection::Down => (0, distance),
            ScrollDirection::Left => (-distance, 0),
            ScrollDirection::Right => (distance, 0),
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Left => "left",
            ScrollDirection::Right => "right",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directions_with_default() {
        assert_eq!(ScrollDirection::parse("UP"), ScrollDirection::Up);
        assert_eq!(ScrollDirection::parse("scroll to top"), ScrollDirection::Up);
        assert_eq!(ScrollDirection::parse("right"), ScrollDirection::Right);
        assert_eq!(ScrollDirection::parse("body"), ScrollDirection::Down);
        assert_eq!(ScrollDirection::parse(""), ScrollDirection::Down);
    }

    #[test]
    fn offsets_follow_direction() {
        assert_eq!(ScrollDirection::Up.offsets(500), (0, -500));
        assert_eq!(ScrollDirection::Right.offsets(300), (300, 0));
    }
}
