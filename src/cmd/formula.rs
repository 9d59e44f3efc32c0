//! The `formula` subcommand.

use clap::Args;

use crate::{
    backend::BackendClient,
    cmd::ConfigOpts,
    config::Config,
    image_input::ImageInput,
    io::write_output,
    markup::FormulaView,
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// Formula command line arguments.
#[derive(Debug, Args)]
pub struct FormulaOpts {
    /// The image to read: a path, `-` for stdin, or a `data:` URL.
    #[clap(value_name = "IMAGE")]
    pub image: String,

    /// Print the backend's response as JSON, instead of the formula.
    #[clap(long)]
    pub json: bool,

    #[clap(flatten)]
    pub config: ConfigOpts,
}

/// The `formula` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_formula(ui: Ui, opts: &FormulaOpts) -> Result<()> {
    let config = Config::load(opts.config.config_path.as_deref()).await?;
    let image = ImageInput::load(&opts.image, config.max_upload_size).await?;
    let client = BackendClient::from_env();

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🔍",
        msg: "Reading formula",
        done_msg: "Read formula",
    });
    let response = client.extract_formula(&image).await?;
    spinner.finish();
    info!(confidence = response.confidence, "Extracted formula");

    let output = if opts.json {
        serde_json::to_string_pretty(&response)
            .context("failed to serialize formula response")?
    } else {
        FormulaView::new(response.formula()).to_string()
    };
    write_output(None, &format!("{output}\n")).await
}
