//! Graph-side constants
//!
//! Single source of truth for defaults shared by the graph, the canvas
//! adapter and the facade.

use std::time::Duration;

/// Viewport defaults
pub mod viewport {
    /// Zoom ratio of a freshly created or restored canvas
    pub const INIT_ZOOM_VALUE: f64 = 1.0;
    /// Pan offset of a freshly created or restored canvas (x, y)
    pub const INIT_PAN_OFFSET: (f64, f64) = (0.0, 0.0);
}

/// ID prefixes for generated identifiers
pub mod ids {
    /// Prefix for generated operator IDs
    pub const OPERATOR_PREFIX: &str = "operator-";
    /// Prefix for generated link IDs
    pub const LINK_PREFIX: &str = "link-";
    /// Prefix of generated input port IDs (`input-0`, `input-1`, ...)
    pub const INPUT_PORT_PREFIX: &str = "input-";
    /// Prefix of generated output port IDs
    pub const OUTPUT_PORT_PREFIX: &str = "output-";
}

/// Event channel sizing
pub mod events {
    /// Buffered events per broadcast channel before slow subscribers lag
    pub const CHANNEL_CAPACITY: usize = 1024;
}

/// Quiet period before a property form edit is emitted
pub const FORM_INPUT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Maximum number of undo snapshots kept by the facade
pub const MAX_UNDO_SNAPSHOTS: usize = 100;
