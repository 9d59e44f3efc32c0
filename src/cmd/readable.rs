//! The `readable` subcommand.

use clap::Args;

use crate::{
    io::{read_stdin_to_string, write_output},
    markup::{clean_markup, to_readable_text},
    prelude::*,
};

/// Readable command line arguments.
#[derive(Debug, Args)]
pub struct ReadableOpts {
    /// The formula markup to convert. Read from stdin if omitted.
    #[clap(value_name = "MARKUP")]
    pub markup: Option<String>,
}

/// The `readable` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_readable(opts: &ReadableOpts) -> Result<()> {
    let markup = match &opts.markup {
        Some(markup) => markup.clone(),
        None => read_stdin_to_string().await?,
    };
    let readable = to_readable_text(&clean_markup(&markup));
    write_output(None, &format!("{readable}\n")).await
}
