//! Display geometry and coordinate scaling.
//!
//! The model reasons about the screen at a reduced "target" resolution (the
//! resolutions computer-use models are trained on), while the OS wants native
//! pixels. `DisplayGeometry` is fixed at startup and owns the mapping in both
//! directions.

use serde::{Deserialize, Serialize};

/// Resolutions the model is allowed to see, in ascending area order.
///
/// XGA (4:3), WXGA (16:10), FWXGA (~16:9). The best aspect-ratio match to the
/// native display is chosen at startup.
pub const SUPPORTED_TARGETS: [(u32, u32); 3] = [(1024, 768), (1280, 800), (1366, 768)];

/// The fixed mapping between native screen pixels and model-facing target
/// pixels. Immutable after startup — a mid-run resolution change is not
/// supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub native_width: u32,
    pub native_height: u32,
    pub target_width: u32,
    pub target_height: u32,
}

impl DisplayGeometry {
    /// Choose the target resolution whose aspect ratio is closest to the
    /// native display's. Ties go to the larger target area.
    pub fn select(native_width: u32, native_height: u32) -> Self {
        let native_ratio = native_width as f64 / native_height as f64;
        let (target_width, target_height) = SUPPORTED_TARGETS
            .iter()
            .copied()
            .min_by(|&(aw, ah), &(bw, bh)| {
                let da = (aw as f64 / ah as f64 - native_ratio).abs();
                let db = (bw as f64 / bh as f64 - native_ratio).abs();
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // On an aspect-ratio tie, prefer the larger area.
                    .then((bw * bh).cmp(&(aw * ah)))
            })
            .unwrap_or((1024, 768));

        Self {
            native_width,
            native_height,
            target_width,
            target_height,
        }
    }

    /// Build a geometry with an explicit target, for config overrides.
    pub fn with_target(
        native_width: u32,
        native_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Self {
        Self {
            native_width,
            native_height,
            target_width,
            target_height,
        }
    }

    /// Convert a native pixel coordinate into target space.
    pub fn to_target(&self, x: u32, y: u32) -> (i32, i32) {
        (
            scale(x, self.target_width, self.native_width),
            scale(y, self.target_height, self.native_height),
        )
    }

    /// Convert a validated target-space coordinate into native pixels.
    ///
    /// Callers must bounds-check with [`contains_target`](Self::contains_target)
    /// first; this only scales.
    pub fn to_native(&self, x: i32, y: i32) -> (u32, u32) {
        (
            scale_u(x.max(0) as u32, self.native_width, self.target_width),
            scale_u(y.max(0) as u32, self.native_height, self.target_height),
        )
    }

    /// Whether a target-space point lies within `[0, width) × [0, height)`.
    pub fn contains_target(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.target_width && (y as u32) < self.target_height
    }

    /// Ratio of native to target width, useful for logging.
    pub fn scale_factor(&self) -> f64 {
        self.native_width as f64 / self.target_width as f64
    }
}

/// Nearest-integer linear scaling: `v * num / den`.
fn scale(v: u32, num: u32, den: u32) -> i32 {
    ((v as f64 * num as f64 / den as f64).round()) as i32
}

fn scale_u(v: u32, num: u32, den: u32) -> u32 {
    (v as f64 * num as f64 / den as f64).round() as u32
}
