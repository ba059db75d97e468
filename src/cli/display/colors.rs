//! Color theme for CLI output

use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    /// Color for a module build outcome
    pub fn outcome_color(&self, success: bool) -> TableColor {
        if success {
            self.success
        } else {
            self.error
        }
    }

    /// Color for a file count; nothing written is muted
    pub fn count_color(&self, count: usize) -> TableColor {
        if count == 0 {
            self.muted
        } else {
            self.info
        }
    }
}
