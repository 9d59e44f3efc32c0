//! I/O utilities.
//!
//! We read small JSON and TOML files all at once, because our parsing
//! libraries don't do async I/O, and we write output to either a file or
//! standard output.

use serde::de::DeserializeOwned;
use tokio::{
    fs::File,
    io::{AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _, BufWriter},
};

use crate::prelude::*;

/// Is this path a JSON file? Everything else is treated as TOML.
fn is_json_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Read TOML or JSON from a file.
pub async fn read_json_or_toml<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at path: {:?}", path))?;
    if is_json_path(path) {
        serde_json::from_str(&data).with_context(|| {
            format!("Failed to parse JSON from file at path: {:?}", path)
        })
    } else {
        toml::from_str(&data).with_context(|| {
            format!("Failed to parse TOML from file at path: {:?}", path)
        })
    }
}

/// Read JSON from a file, or from standard input if `path` is `-`.
pub async fn read_json_or_stdin<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    if path == Path::new("-") {
        let data = read_stdin_to_string().await?;
        serde_json::from_str(&data).context("Failed to parse JSON from stdin")
    } else {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file at path: {:?}", path))?;
        serde_json::from_str(&data).with_context(|| {
            format!("Failed to parse JSON from file at path: {:?}", path)
        })
    }
}

/// Read all of standard input as bytes.
pub async fn read_stdin_to_end() -> Result<Vec<u8>> {
    let mut data = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut data)
        .await
        .context("Failed to read from stdin")?;
    Ok(data)
}

/// Read all of standard input as UTF-8 text.
pub async fn read_stdin_to_string() -> Result<String> {
    let mut data = String::new();
    tokio::io::stdin()
        .read_to_string(&mut data)
        .await
        .context("Failed to read text from stdin")?;
    Ok(data)
}

/// Create an [`AsyncWrite`] for a file or stdout.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write `output` to either standard output or a file.
pub async fn write_output(path: Option<&Path>, output: &str) -> Result<()> {
    let mut writer = BufWriter::new(create_writer(path).await?);
    writer
        .write_all(output.as_bytes())
        .await
        .context("Failed to write output")?;
    writer.flush().await.context("Failed to flush output")?;
    Ok(())
}
