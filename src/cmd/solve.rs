//! The `solve` subcommand.

use clap::Args;

use crate::{
    backend::BackendClient,
    cmd::DocumentOpts,
    config::Config,
    document::Document,
    image_input::ImageInput,
    io::write_output,
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// Solve command line arguments.
#[derive(Debug, Args)]
pub struct SolveOpts {
    /// The image to solve: a path, `-` for stdin, or a `data:` URL.
    #[clap(value_name = "IMAGE")]
    pub image: String,

    /// The confirmed formula, as LaTeX. If omitted, we ask the backend to
    /// read it from the image first.
    #[clap(long)]
    pub latex: Option<String>,

    #[clap(flatten)]
    pub document: DocumentOpts,
}

/// The `solve` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_solve(ui: Ui, opts: &SolveOpts) -> Result<()> {
    let config = Config::load(opts.document.config.config_path.as_deref()).await?;
    let image = ImageInput::load(&opts.image, config.max_upload_size).await?;
    let client = BackendClient::from_env();

    // Find the equation we're solving, so we can tell a computed result
    // apart from a restatement of the problem.
    let original = match &opts.latex {
        Some(latex) => latex.trim().to_owned(),
        None => {
            let spinner = ui.new_spinner(&ProgressConfig {
                emoji: "🔍",
                msg: "Reading formula",
                done_msg: "Read formula",
            });
            let response = client.extract_formula(&image).await?;
            spinner.finish();
            response.formula().to_owned()
        }
    };
    if original.is_empty() {
        warn!("No equation detected, letting the backend extract its own");
    } else {
        info!(equation = %original, "Solving");
    }

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🧮",
        msg: "Solving",
        done_msg: "Solved",
    });
    let problem = client.analyze(&image, Some(original.as_str())).await?;
    spinner.finish();
    debug!(steps = problem.steps.len(), "Received solution");

    let document = Document::build(&problem, &original, &config.extractor);
    let output = document.render(opts.document.format)?;
    write_output(opts.document.output_path.as_deref(), &output).await
}
