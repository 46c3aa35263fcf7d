use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;

/// Orientation correction applied to a frame before landmark extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    CounterClockwise90,
}

impl Rotation {
    /// Corrections tried, in order, when the native orientation finds no face.
    pub const FALLBACKS: [Rotation; 2] = [Rotation::Clockwise90, Rotation::CounterClockwise90];

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::CounterClockwise90 => -90,
        }
    }

    pub fn is_corrected(self) -> bool {
        self != Rotation::None
    }

    /// Maps a box found in the rotated frame back to native frame coordinates.
    ///
    /// `native_width`/`native_height` are the dimensions of the frame before
    /// this rotation was applied.
    pub fn to_source_box(self, bbox: &BoundingBox, native_width: f64, native_height: f64) -> BoundingBox {
        match self {
            Rotation::None => *bbox,
            // Clockwise sends native (x, y) to (H - y, x).
            Rotation::Clockwise90 => BoundingBox {
                x: bbox.y,
                y: native_height - (bbox.x + bbox.width),
                width: bbox.height,
                height: bbox.width,
            },
            // Counter-clockwise sends native (x, y) to (y, W - x).
            Rotation::CounterClockwise90 => BoundingBox {
                x: native_width - (bbox.y + bbox.height),
                y: bbox.x,
                width: bbox.height,
                height: bbox.width,
            },
        }
    }

    /// Maps a native-coordinate box into the frame produced by this rotation.
    pub fn to_rotated_box(self, bbox: &BoundingBox, native_width: f64, native_height: f64) -> BoundingBox {
        match self {
            Rotation::None => *bbox,
            Rotation::Clockwise90 => BoundingBox {
                x: native_height - (bbox.y + bbox.height),
                y: bbox.x,
                width: bbox.height,
                height: bbox.width,
            },
            Rotation::CounterClockwise90 => BoundingBox {
                x: bbox.y,
                y: native_width - (bbox.x + bbox.width),
                width: bbox.height,
                height: bbox.width,
            },
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rotation::None => write!(f, "0°"),
            Rotation::Clockwise90 => write!(f, "90° CW"),
            Rotation::CounterClockwise90 => write!(f, "90° CCW"),
        }
    }
}
