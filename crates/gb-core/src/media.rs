//! Accepted thumbnail image types, detected from the uploaded file name.

use crate::error::{BlogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Guess the MIME type from the extension and keep only raster types we
    /// can thumbnail.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let guessed = mime_guess::from_path(file_name)
            .first()
            .ok_or_else(|| BlogError::UnknownMimeType {
                file_name: file_name.to_string(),
            })?;

        if guessed.type_() != mime::IMAGE {
            return Err(BlogError::UnsupportedImageType {
                file_name: file_name.to_string(),
            });
        }
        match guessed.subtype().as_str() {
            "jpeg" => Ok(ImageKind::Jpeg),
            "png" => Ok(ImageKind::Png),
            "gif" => Ok(ImageKind::Gif),
            _ => Err(BlogError::UnsupportedImageType {
                file_name: file_name.to_string(),
            }),
        }
    }

    /// Extension of the stored file, the MIME subtype.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }

    /// Inverse of `extension`, for names the store produced itself.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_accepted_types() {
        assert_eq!(ImageKind::from_file_name("a.jpg").unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_file_name("a.JPEG").unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_file_name("dir/a.png").unwrap(), ImageKind::Png);
        assert_eq!(ImageKind::from_file_name("a.gif").unwrap().extension(), "gif");
    }

    #[test]
    fn stored_extensions_only() {
        for kind in [ImageKind::Jpeg, ImageKind::Png, ImageKind::Gif] {
            assert_eq!(ImageKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(ImageKind::from_extension("jpg"), None);
        assert_eq!(ImageKind::from_extension("PNG"), None);
    }

    #[test]
    fn rejects_non_images() {
        assert!(matches!(
            ImageKind::from_file_name("notes.txt"),
            Err(BlogError::UnsupportedImageType { .. })
        ));
        assert!(matches!(
            ImageKind::from_file_name("vector.svg"),
            Err(BlogError::UnsupportedImageType { .. })
        ));
        assert!(matches!(
            ImageKind::from_file_name("no_extension"),
            Err(BlogError::UnknownMimeType { .. })
        ));
    }
}
