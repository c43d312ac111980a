//! Movement sound classification

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Which movement sound should be playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveAxis {
    #[default]
    None,
    /// Gear only
    Horizontal,
    /// Engine only
    Vertical,
    /// Gear and engine together
    Diagonal,
}

impl MoveAxis {
    /// Classify one tick's displacement; an axis moves when its component
    /// exceeds `epsilon`
    pub fn classify(displacement: Vec2, epsilon: f32) -> Self {
        let x = displacement.x.abs() > epsilon;
        let y = displacement.y.abs() > epsilon;
        match (x, y) {
            (false, false) => MoveAxis::None,
            (true, false) => MoveAxis::Horizontal,
            (false, true) => MoveAxis::Vertical,
            (true, true) => MoveAxis::Diagonal,
        }
    }

    pub fn uses_gear(&self) -> bool {
        matches!(self, MoveAxis::Horizontal | MoveAxis::Diagonal)
    }

    pub fn uses_engine(&self) -> bool {
        matches!(self, MoveAxis::Vertical | MoveAxis::Diagonal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(MoveAxis::classify(Vec2::ZERO, 0.5), MoveAxis::None);
        assert_eq!(MoveAxis::classify(Vec2::new(5.0, 0.0), 0.5), MoveAxis::Horizontal);
        assert_eq!(MoveAxis::classify(Vec2::new(0.0, -5.0), 0.5), MoveAxis::Vertical);
        assert_eq!(MoveAxis::classify(Vec2::new(-4.2, 4.2), 0.5), MoveAxis::Diagonal);
        // Joystick drift below the threshold is ignored
        assert_eq!(MoveAxis::classify(Vec2::new(0.8, 6.0), 1.0), MoveAxis::Vertical);
    }

    #[test]
    fn test_channels() {
        assert!(MoveAxis::Diagonal.uses_gear() && MoveAxis::Diagonal.uses_engine());
        assert!(!MoveAxis::Vertical.uses_gear());
        assert!(!MoveAxis::None.uses_engine());
    }
}
