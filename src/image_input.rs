//! Loading the photo of a math problem.

use crate::{
    data_url::{decode_data_url, is_data_url},
    io::read_stdin_to_end,
    prelude::*,
};

/// Largest image we will send to the backend, unless configured otherwise.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Image types the backend accepts, as detected from file contents.
pub const SUPPORTED_IMAGE_TYPES: &[&str] =
    &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// A validated image, ready to upload.
#[derive(Clone, Debug)]
pub struct ImageInput {
    /// File name to send with the upload.
    pub file_name: String,
    /// MIME type, sniffed from the data.
    pub mime_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl ImageInput {
    /// Load an image from a path, from standard input (`-`), or from a
    /// `data:` URL.
    #[instrument(level = "debug", skip(source), fields(source = %describe_source(source)))]
    pub async fn load(source: &str, max_upload_size: u64) -> Result<Self> {
        if source == "-" {
            let data = read_stdin_to_end().await?;
            Self::from_bytes(None, data, max_upload_size)
        } else if is_data_url(source) {
            let (declared, data) = decode_data_url(source)?;
            let declared = if declared == "image/jpg" {
                "image/jpeg"
            } else {
                declared.as_str()
            };
            if !SUPPORTED_IMAGE_TYPES.contains(&declared) {
                bail!("Unsupported declared image type: {declared}");
            }
            Self::from_bytes(None, data, max_upload_size)
        } else {
            let path = Path::new(source);
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read image {:?}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            Self::from_bytes(file_name, data, max_upload_size)
                .with_context(|| format!("cannot use image {:?}", path.display()))
        }
    }

    /// Validate raw image bytes. If `file_name` is missing, we make one up
    /// based on the detected type.
    pub fn from_bytes(
        file_name: Option<String>,
        data: Vec<u8>,
        max_upload_size: u64,
    ) -> Result<Self> {
        if data.is_empty() {
            bail!("The image file is empty.");
        }
        if data.len() as u64 > max_upload_size {
            bail!(
                "The image is too large. Maximum size: {:.1}MB",
                max_upload_size as f64 / 1024.0 / 1024.0
            );
        }

        let mime_type = infer::get(&data)
            .map(|kind| kind.mime_type())
            .filter(|mime_type| SUPPORTED_IMAGE_TYPES.contains(mime_type))
            .ok_or_else(|| {
                anyhow!(
                    "Unsupported or corrupt image. Use PNG, JPEG, GIF or WEBP."
                )
            })?;

        let file_name = match file_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                let extension = mime_guess::get_mime_extensions_str(mime_type)
                    .and_then(|exts| exts.first())
                    .copied()
                    .unwrap_or("png");
                format!("image.{extension}")
            }
        };
        debug!(%file_name, %mime_type, size = data.len(), "Loaded image");
        Ok(Self {
            file_name,
            mime_type: mime_type.to_owned(),
            data,
        })
    }
}

/// A short description of an image source, for logs. `data:` URLs can be
/// megabytes long.
fn describe_source(source: &str) -> &str {
    if is_data_url(source) {
        "data: URL"
    } else {
        source
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, prelude::BASE64_STANDARD};

    use super::*;

    /// Just enough of a PNG to be recognized.
    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn accepts_supported_image_types() {
        let png = ImageInput::from_bytes(None, PNG_HEADER.to_vec(), 1024).unwrap();
        assert_eq!(png.mime_type, "image/png");
        assert_eq!(png.file_name, "image.png");

        let gif = ImageInput::from_bytes(
            Some("photo.gif".to_owned()),
            b"GIF89a\x01\0\x01\0".to_vec(),
            1024,
        )
        .unwrap();
        assert_eq!(gif.mime_type, "image/gif");
        assert_eq!(gif.file_name, "photo.gif");

        let jpeg =
            ImageInput::from_bytes(None, b"\xFF\xD8\xFF\xE0\0\x10JFIF".to_vec(), 1024)
                .unwrap();
        assert_eq!(jpeg.mime_type, "image/jpeg");
    }

    #[test]
    fn rejects_empty_large_and_unknown_data() {
        let err = ImageInput::from_bytes(None, vec![], 1024).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = ImageInput::from_bytes(None, PNG_HEADER.to_vec(), 4).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let err =
            ImageInput::from_bytes(None, b"hello, world".to_vec(), 1024).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));

        // PDFs are recognized, but not accepted.
        let err = ImageInput::from_bytes(None, b"%PDF-1.7\n".to_vec(), 1024).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[tokio::test]
    async fn loads_from_a_data_url() {
        let url = format!("data:image/png;base64,{}", BASE64_STANDARD.encode(PNG_HEADER));
        let image = ImageInput::load(&url, DEFAULT_MAX_UPLOAD_SIZE).await.unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, PNG_HEADER);

        let url = format!("data:text/plain;base64,{}", BASE64_STANDARD.encode(PNG_HEADER));
        assert!(ImageInput::load(&url, DEFAULT_MAX_UPLOAD_SIZE).await.is_err());
    }

    #[tokio::test]
    async fn loads_from_a_file() {
        let dir = tempfile::TempDir::with_prefix("mathsnap").unwrap();
        let path = dir.path().join("equation.png");
        tokio::fs::write(&path, PNG_HEADER).await.unwrap();
        let image = ImageInput::load(path.to_str().unwrap(), DEFAULT_MAX_UPLOAD_SIZE)
            .await
            .unwrap();
        assert_eq!(image.file_name, "equation.png");

        let missing = dir.path().join("missing.png");
        assert!(
            ImageInput::load(missing.to_str().unwrap(), DEFAULT_MAX_UPLOAD_SIZE)
                .await
                .is_err()
        );
    }
}
