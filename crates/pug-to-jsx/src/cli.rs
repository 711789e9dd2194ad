//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Convert Pug templates into JSX components.
#[derive(Debug, Parser)]
#[command(name = "pug-to-jsx")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Files or directories to convert (directories are searched for `*.pug`)
    #[arg(default_value = ".")]
    pub paths: Vec<Utf8PathBuf>,

    /// Directory for generated modules (defaults to next to each template)
    #[arg(long = "out-dir")]
    pub out_dir: Option<Utf8PathBuf>,

    /// Extension of generated modules
    #[arg(long)]
    pub extension: Option<String>,

    /// Root for absolute `include /path` references
    #[arg(long)]
    pub basedir: Option<Utf8PathBuf>,

    /// Print generated modules to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,

    /// Report format
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Exit with error on warnings
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,

    /// Glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Watch mode
    #[arg(long)]
    pub watch: bool,

    /// Log every translated node
    #[arg(long, short)]
    pub verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output
    Json,
}

impl Args {
    /// Returns the log filter used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["pug-to-jsx"]);
        assert_eq!(args.paths, vec![Utf8PathBuf::from(".")]);
        assert_eq!(args.output, OutputFormat::Human);
        assert!(args.out_dir.is_none());
        assert!(!args.watch);
        assert!(!args.stdout);
        assert_eq!(args.default_log_filter(), "warn");
    }

    #[test]
    fn test_paths_and_out_dir() {
        let args = Args::parse_from(["pug-to-jsx", "views", "mail/welcome.pug", "--out-dir", "build"]);
        assert_eq!(
            args.paths,
            vec![Utf8PathBuf::from("views"), Utf8PathBuf::from("mail/welcome.pug")]
        );
        assert_eq!(args.out_dir.as_deref().map(|p| p.as_str()), Some("build"));
    }

    #[test]
    fn test_output_formats() {
        let args = Args::parse_from(["pug-to-jsx", "--output", "json"]);
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn test_repeated_ignore() {
        let args = Args::parse_from(["pug-to-jsx", "--ignore", "**/old/**", "--ignore", "*.draft.pug"]);
        assert_eq!(args.ignore, vec!["**/old/**", "*.draft.pug"]);
    }

    #[test]
    fn test_verbose_raises_log_level() {
        let args = Args::parse_from(["pug-to-jsx", "-v", "--fail-on-warnings"]);
        assert!(args.fail_on_warnings);
        assert_eq!(args.default_log_filter(), "debug");
    }
}
