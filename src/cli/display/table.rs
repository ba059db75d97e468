//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::build::BuildReport;
use crate::infrastructure::ci::ImageBuild;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render the per-module outcome of a build
    pub fn render_build_report(&self, report: &BuildReport) -> String {
        if report.outcomes.is_empty() {
            return "No modules configured".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("MODULE").set_alignment(CellAlignment::Left),
                Cell::new("NAMESPACE").set_alignment(CellAlignment::Left),
                Cell::new("REVISION").set_alignment(CellAlignment::Left),
                Cell::new("FILES").set_alignment(CellAlignment::Center),
                Cell::new("STATUS").set_alignment(CellAlignment::Left),
            ]);

        for outcome in &report.outcomes {
            let success = outcome.is_success();
            let namespace = outcome
                .info
                .as_ref()
                .map(|info| info.namespace.clone())
                .unwrap_or_else(|| "-".to_string());
            let revision = outcome
                .info
                .as_ref()
                .and_then(|info| info.revision.as_deref())
                .map(|rev| rev.chars().take(12).collect::<String>())
                .unwrap_or_else(|| "local".to_string());

            let (files, written) = match &outcome.result {
                Ok(summary) if summary.preserved > 0 => (
                    format!(
                        "{} (+{} {})",
                        summary.written,
                        summary.preserved,
                        StatusIcon::PRESERVED
                    ),
                    summary.written,
                ),
                Ok(summary) => (summary.written.to_string(), summary.written),
                Err(_) => ("-".to_string(), 0),
            };

            let status = match &outcome.result {
                Ok(_) => format!(
                    "{} {}",
                    StatusIcon::outcome_icon(true),
                    StatusIcon::outcome_text(true)
                ),
                Err(e) => format!("{} {}", StatusIcon::outcome_icon(false), e),
            };

            table.add_row(vec![
                Cell::new(&outcome.name),
                Cell::new(namespace),
                Cell::new(revision).fg(self.theme.muted),
                Cell::new(files).fg(self.theme.count_color(written)),
                Cell::new(status).fg(self.theme.outcome_color(success)),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Build {} ─╮\n",
            format!("[{} modules]", report.outcomes.len())
                .bright_black()
                .to_string()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "{} {} succeeded  {} {} failed\n",
            StatusIcon::SUCCESS.green(),
            report.succeeded(),
            StatusIcon::ERROR.red(),
            report.failed()
        ));
        if let Some(bases) = &report.bases {
            output.push_str(&format!(
                "Applications: {} written to {}",
                bases.written,
                bases.path.display()
            ));
            if bases.preserved > 0 {
                output.push_str(&format!(" ({} kept from unloaded modules)", bases.preserved));
            }
            output.push('\n');
        }

        output
    }

    /// Render the images a module builds
    pub fn render_images(&self, module: &str, images: &[ImageBuild]) -> String {
        if images.is_empty() {
            return format!("Module {} declares no images", module);
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("IMAGE"),
                Cell::new("CONTEXT"),
                Cell::new("TAGS"),
            ]);

        for image in images {
            table.add_row(vec![
                Cell::new(&image.name),
                Cell::new(&image.context).fg(self.theme.muted),
                Cell::new(image.tags.join("\n")).fg(self.theme.info),
            ]);
        }

        table.to_string()
    }
}
