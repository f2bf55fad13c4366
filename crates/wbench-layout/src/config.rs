//! Tuning constants for drop resolution, drag tracking, and docking.

use serde::{Deserialize, Serialize};
use wbench_core::geometry::Point;

use crate::error::ConfigError;
use crate::sash::SplitRatio;

/// Default inset of the center drop zone, in basis points of each dimension.
pub const DEFAULT_EDGE_THRESHOLD_BPS: u16 = 2_500;

/// Default pointer travel (cells) before a move re-resolves the drop target.
pub const DEFAULT_DRAG_HYSTERESIS: u16 = 1;

/// Default height of a stack's tab strip in cells.
pub const DEFAULT_TAB_STRIP_HEIGHT: u16 = 1;

/// Combined layout behavior tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Each edge band is this share of the region; the rest is the center.
    pub edge_threshold_bps: u16,
    pub drag_hysteresis: u16,
    /// `incoming:existing` weights for a split drop.
    pub docking_ratio: SplitRatio,
    /// Weights used when the split target holds editors.
    pub editor_docking_ratio: SplitRatio,
    pub tab_strip_height: u16,
}

impl LayoutConfig {
    pub fn validate(self) -> Result<(), ConfigError> {
        if self.edge_threshold_bps == 0 || self.edge_threshold_bps > 5_000 {
            return Err(ConfigError::InvalidEdgeThreshold {
                bps: self.edge_threshold_bps,
            });
        }
        if self.drag_hysteresis == 0 {
            return Err(ConfigError::InvalidHysteresis {
                hysteresis: self.drag_hysteresis,
            });
        }
        for ratio in [self.docking_ratio, self.editor_docking_ratio] {
            if ratio.numerator() == 0 || ratio.denominator() == 0 {
                return Err(ConfigError::InvalidDockingRatio {
                    incoming: ratio.numerator(),
                    existing: ratio.denominator(),
                });
            }
        }
        Ok(())
    }

    /// Whether a pointer moved far enough from `previous` to re-resolve.
    #[must_use]
    pub fn should_retarget(self, previous: Point, current: Point) -> bool {
        let hysteresis = i64::from(self.drag_hysteresis);
        previous.squared_distance(current) >= hysteresis * hysteresis
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            edge_threshold_bps: DEFAULT_EDGE_THRESHOLD_BPS,
            drag_hysteresis: DEFAULT_DRAG_HYSTERESIS,
            docking_ratio: SplitRatio::default(),
            editor_docking_ratio: SplitRatio::ONE_TO_THREE,
            tab_strip_height: DEFAULT_TAB_STRIP_HEIGHT,
        }
    }
}
