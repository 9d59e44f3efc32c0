//! The `render` subcommand.

use clap::Args;

use crate::{
    cmd::DocumentOpts,
    config::Config,
    document::Document,
    io::{read_json_or_stdin, write_output},
    prelude::*,
    problem::SolvedProblem,
};

/// Render command line arguments.
#[derive(Debug, Args)]
pub struct RenderOpts {
    /// A saved `/analyze` response, as JSON. Use `-` for stdin.
    #[clap(value_name = "RESPONSE_JSON")]
    pub response_path: PathBuf,

    /// The equation which was confirmed before solving. Defaults to the
    /// response's own `latex` or `problem` field.
    #[clap(long)]
    pub original: Option<String>,

    #[clap(flatten)]
    pub document: DocumentOpts,
}

/// The `render` subcommand.
#[instrument(level = "debug", skip_all, fields(path = %opts.response_path.display()))]
pub async fn cmd_render(opts: &RenderOpts) -> Result<()> {
    let config = Config::load(opts.document.config.config_path.as_deref()).await?;
    let problem = read_json_or_stdin::<SolvedProblem>(&opts.response_path).await?;
    let original = opts.original.as_deref().unwrap_or_default();
    let document = Document::build(&problem, original, &config.extractor);
    let output = document.render(opts.document.format)?;
    write_output(opts.document.output_path.as_deref(), &output).await
}
