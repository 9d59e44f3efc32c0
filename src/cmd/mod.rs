//! Command-line entry points.

use clap::Args;

use crate::{document::DocumentFormat, prelude::*};

pub mod formula;
pub mod readable;
pub mod render;
pub mod schema;
pub mod solve;

/// Options for loading our configuration file.
#[derive(Debug, Clone, Args)]
pub struct ConfigOpts {
    /// A TOML or JSON config file with extractor thresholds and upload limits.
    #[clap(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,
}

/// Options for subcommands which export a document.
#[derive(Debug, Clone, Args)]
pub struct DocumentOpts {
    /// The document format to write.
    #[clap(long, value_enum, default_value_t = DocumentFormat::Markdown)]
    pub format: DocumentFormat,

    /// The output path to write the document to. Defaults to stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,

    #[clap(flatten)]
    pub config: ConfigOpts,
}
