//! Battery charge assessment
//!
//! The cell voltage is mapped onto four coarse charge bands for the status
//! display.

/// Coarse state of charge of the node's battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    /// 76% - 100%
    Full,
    /// 51% - 75%
    High,
    /// 26% - 50%
    Low,
    /// 0% - 25%
    Critical,
}

impl BatteryLevel {
    /// Assess the charge band for a measured cell voltage.
    ///
    /// Thresholds (V):
    /// Full: >= 4.0, High: >= 3.8, Low: >= 3.6, Critical: below.
    /// A NaN reading is reported as Critical.
    pub fn assess(volts: f32) -> Self {
        if volts >= 4.0 {
            Self::Full
        } else if volts >= 3.8 {
            Self::High
        } else if volts >= 3.6 {
            Self::Low
        } else {
            Self::Critical
        }
    }

    /// Get the display label for this charge band
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "76% - 100%",
            Self::High => "51% - 75%",
            Self::Low => "26% - 50%",
            Self::Critical => "0% - 25%",
        }
    }
}
