//! Output formatters for loaded models.

use clap::ValueEnum;
use comfy_table::Table;
use coremodel_core::{Model, OverlayReport};

/// Output format for models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented inheritance tree
    Tree,
    /// ASCII table format
    Table,
    /// JSON model file format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Tree => write!(f, "tree"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a whole model.
    fn format_model(&self, model: &Model) -> String;

    /// Format the result of merging a support descriptor.
    fn format_overlay(&self, report: &OverlayReport) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Tree => Box::new(TreeFormatter),
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Indented tree formatter.
pub struct TreeFormatter;

impl Formatter for TreeFormatter {
    fn format_model(&self, model: &Model) -> String {
        if model.is_empty() {
            return "No entities".to_string();
        }

        let mut lines = Vec::with_capacity(model.len());
        for entity in model.iter() {
            let mut line = format!("{}{}", "  ".repeat(entity.depth()), entity.name());
            if let Some(class) = entity.class_name() {
                line.push_str(&format!(" ({})", class));
            }
            if entity.is_abstract() {
                line.push_str(" [abstract]");
            }
            lines.push(line);
        }

        let transformers: Vec<_> = model.transformer_class_names().collect();
        if !transformers.is_empty() {
            lines.push(String::new());
            lines.push("Transformers:".to_string());
            for (class, transformer) in transformers {
                lines.push(format!("  {} -> {}", class, transformer));
            }
        }

        lines.join("\n")
    }

    fn format_overlay(&self, report: &OverlayReport) -> String {
        format_overlay_lines(report)
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_model(&self, model: &Model) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Entity", "Class", "Abstract", "Parent"]);

        for entity in model.iter() {
            table.add_row(vec![
                entity.name().to_string(),
                entity.class_name().unwrap_or("").to_string(),
                entity.is_abstract().to_string(),
                entity
                    .superentity()
                    .map(|p| p.name().to_string())
                    .unwrap_or_default(),
            ]);
        }

        table.to_string()
    }

    fn format_overlay(&self, report: &OverlayReport) -> String {
        format_overlay_lines(report)
    }
}

/// JSON formatter. Model output is a loadable model file.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_model(&self, model: &Model) -> String {
        model.to_json().unwrap_or_else(|_| "{}".to_string())
    }

    fn format_overlay(&self, report: &OverlayReport) -> String {
        serde_json::json!({
            "assigned": report.assigned,
            "unmatched": report.unmatched,
        })
        .to_string()
    }
}

fn format_overlay_lines(report: &OverlayReport) -> String {
    let mut lines = vec![format!(
        "Overlay assigned {} class name(s)",
        report.assigned.len()
    )];
    for (entity, class) in &report.assigned {
        lines.push(format!("  {} <- {}", entity, class));
    }
    for entity in &report.unmatched {
        lines.push(format!("  unmatched: {}", entity));
    }
    lines.join("\n")
}
