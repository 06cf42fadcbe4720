//! Public types and constants for the visualization module.

/// Chart types supported by this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Horizontal bars, one per category of the primary dimension.
    Bar,
    /// Multi-series lines over a time dimension.
    Line,
    /// Two-dimension grid colored by value magnitude.
    Heatmap,
    /// Squarified treemap over a grouped hierarchy.
    Treemap,
    /// Two-stage flow diagram (primary dimension → series dimension).
    Flow,
}

/// Legend placement for series charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendMode {
    /// Overlay legend inside the plotting area (may overlap data).
    Inside,
    /// Separate, non-overlapping legend panel on the right side.
    Right,
    /// Separate, non-overlapping legend band at the bottom.
    Bottom,
}

/// Horizontal legend below the chart keeps labels close to the x-axis start
/// and works well for dashboard-style output.
pub const DEFAULT_LEGEND_MODE: LegendMode = LegendMode::Bottom;
