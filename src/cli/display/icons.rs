//! Status icons for CLI output

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Module built and written
    pub const SUCCESS: &'static str = "✓";

    /// Files kept from a previous build
    pub const PRESERVED: &'static str = "⟳";

    /// Module failed
    pub const ERROR: &'static str = "✗";

    pub fn outcome_icon(success: bool) -> &'static str {
        if success {
            Self::SUCCESS
        } else {
            Self::ERROR
        }
    }

    pub fn outcome_text(success: bool) -> &'static str {
        if success {
            "Written"
        } else {
            "Failed"
        }
    }
}
