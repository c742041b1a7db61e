//! CoreModel Command-Line Inspector
//!
//! Loads an entity model, optionally overlays a support descriptor, and
//! prints the resulting hierarchy.

mod formatter;

use clap::{Parser, ValueEnum};
use coremodel_core::{LoadOptions, Model, OverlayPolicy, SupportDescriptor};
use formatter::OutputFormat;
use std::path::PathBuf;
use tracing::debug;

/// Overlay policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Skip unmatched entries silently
    Ignore,
    /// Skip unmatched entries with a warning
    Warn,
    /// Fail on unmatched entries
    Reject,
}

impl From<PolicyArg> for OverlayPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Ignore => OverlayPolicy::Ignore,
            PolicyArg::Warn => OverlayPolicy::Warn,
            PolicyArg::Reject => OverlayPolicy::Reject,
        }
    }
}

/// CoreModel Command-Line Inspector
#[derive(Parser, Debug)]
#[command(name = "coremodel")]
#[command(version, about = "Inspect CoreModel entity models")]
pub struct Args {
    /// Model file to load
    pub model: PathBuf,

    /// Support descriptor to overlay onto the model
    #[arg(short, long)]
    pub support: Option<PathBuf>,

    /// Handling of descriptor entries for unknown entities
    #[arg(long, default_value = "warn", value_enum)]
    pub overlay_policy: PolicyArg,

    /// Fail if a concrete entity has no class name
    #[arg(long)]
    pub require_classes: bool,

    /// Output format
    #[arg(long, default_value = "tree", value_enum)]
    pub format: OutputFormat,

    /// Maximum file size in MB
    #[arg(long, default_value_t = 16)]
    pub max_file_mb: u64,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coremodel_cli=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_options(args: &Args) -> LoadOptions {
    LoadOptions::new()
        .with_overlay_policy(args.overlay_policy.into())
        .with_max_file_size(args.max_file_mb.saturating_mul(1024 * 1024))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(&args);
    let formatter = formatter::create_formatter(args.format);
    debug!(model = %args.model.display(), format = %args.format, "Inspecting model");

    let mut model = Model::load_with_options(&args.model, None, &options)?;

    if let Some(path) = &args.support {
        let support = SupportDescriptor::load_with_options(path, &options)?;
        let report = model.merge_support(&support, options.overlay_policy)?;
        eprintln!("{}", formatter.format_overlay(&report));
    }

    if args.require_classes {
        model.check_class_names()?;
    }

    println!("{}", formatter.format_model(&model));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["coremodel", "model.json"]).unwrap();
        assert_eq!(args.model, PathBuf::from("model.json"));
        assert!(args.support.is_none());
        assert_eq!(args.overlay_policy, PolicyArg::Warn);
        assert_eq!(args.format, OutputFormat::Tree);
        assert!(!args.require_classes);
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "coremodel",
            "model.json",
            "--support",
            "support.json",
            "--overlay-policy",
            "reject",
            "--require-classes",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.support, Some(PathBuf::from("support.json")));
        assert_eq!(OverlayPolicy::from(args.overlay_policy), OverlayPolicy::Reject);
        assert!(args.require_classes);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_huge_max_file_size_saturates() {
        let args =
            Args::try_parse_from(["coremodel", "model.json", "--max-file-mb", "18446744073709551615"])
                .unwrap();
        assert_eq!(load_options(&args).max_file_size, u64::MAX);

        let args = Args::try_parse_from(["coremodel", "model.json", "--max-file-mb", "2"]).unwrap();
        assert_eq!(load_options(&args).max_file_size, 2 * 1024 * 1024);
    }

    #[test]
    fn test_run_with_huge_max_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"entities": [{"name": "A"}]}"#).unwrap();

        let args = Args::try_parse_from([
            std::ffi::OsStr::new("coremodel"),
            path.as_os_str(),
            std::ffi::OsStr::new("--max-file-mb"),
            std::ffi::OsStr::new("18446744073709551615"),
        ])
        .unwrap();
        run(args).unwrap();
    }

    #[test]
    fn test_run_reports_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"entities": [{"name": "A", "parent": "A"}]}"#).unwrap();

        let args = Args::try_parse_from([std::ffi::OsStr::new("coremodel"), path.as_os_str()]).unwrap();
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
