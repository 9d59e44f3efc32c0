use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod backend;
mod cmd;
mod config;
mod data_url;
mod document;
mod extract;
mod image_input;
mod io;
mod markup;
mod prelude;
mod problem;
mod ui;

/// Solve math problems from photos.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - MATHSNAP_API_BASE (optional): The solving backend's base URL.
    Defaults to http://localhost:5000/api.
  - RUST_LOG (optional): Logging filter, such as `debug` or `mathsnap=trace`.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Read the formula in an image, using the "/latex" endpoint.
    Formula(cmd::formula::FormulaOpts),
    /// Solve the problem in an image, and export the solution.
    Solve(cmd::solve::SolveOpts),
    /// Export a saved "/analyze" response as a document, offline.
    Render(cmd::render::RenderOpts),
    /// Convert formula markup to readable plain text.
    Readable(cmd::readable::ReadableOpts),
    /// Print schemas for input and output formats.
    Schema(cmd::schema::SchemaOpts),
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Run the appropriate subcommand.
    match &opts.subcmd {
        Cmd::Formula(opts) => cmd::formula::cmd_formula(ui, opts).await,
        Cmd::Solve(opts) => cmd::solve::cmd_solve(ui, opts).await,
        Cmd::Render(opts) => cmd::render::cmd_render(opts).await,
        Cmd::Readable(opts) => cmd::readable::cmd_readable(opts).await,
        Cmd::Schema(schema_opts) => cmd::schema::cmd_schema(schema_opts).await,
    }
}
