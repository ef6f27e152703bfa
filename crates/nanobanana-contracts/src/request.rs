use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{GenerateError, Result};
use crate::mime::{extension_from_mime, mime_from_extension};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Portrait2x3,
    Landscape3x2,
    Portrait3x4,
    Landscape4x3,
    Portrait4x5,
    Landscape5x4,
    Portrait9x16,
    Landscape16x9,
    Ultrawide21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 10] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Ultrawide21x9,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Ultrawide21x9 => "21:9",
        }
    }

    fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(|ratio| ratio.as_str())
            .collect::<Vec<&str>>()
            .join(", ")
    }
}

impl FromStr for AspectRatio {
    type Err = GenerateError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == raw)
            .ok_or_else(|| GenerateError::InvalidParameter {
                name: "aspect ratio",
                value: raw.to_string(),
                expected: Self::valid_list(),
            })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution tier. Matching is exact: `1k` is not `1K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageSize {
    #[default]
    OneK,
    TwoK,
    FourK,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::OneK, ImageSize::TwoK, ImageSize::FourK];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl FromStr for ImageSize {
    type Err = GenerateError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == raw)
            .ok_or_else(|| GenerateError::InvalidParameter {
                name: "size",
                value: raw.to_string(),
                expected: "1K, 2K, 4K".to_string(),
            })
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-agnostic description of one generation.
///
/// Aspect ratio and size are typed, so an instance can only exist once both
/// have been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub reference_images: Vec<PathBuf>,
    pub aspect_ratio: AspectRatio,
    pub size: ImageSize,
    pub model: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(GenerateError::InvalidParameter {
                name: "prompt",
                value: prompt,
                expected: "non-empty text".to_string(),
            });
        }
        Ok(Self {
            prompt,
            reference_images: Vec::new(),
            aspect_ratio: AspectRatio::default(),
            size: ImageSize::default(),
            model: None,
        })
    }

    pub fn with_reference_images(mut self, paths: Vec<PathBuf>) -> Self {
        self.reference_images = paths;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|value| !value.trim().is_empty());
        self
    }

    /// Reads every reference image in order. The first unreadable file aborts.
    pub fn load_reference_images(&self) -> Result<Vec<ReferenceImage>> {
        self.reference_images
            .iter()
            .map(|path| ReferenceImage::load(path))
            .collect()
    }
}

/// A local input image, read whole and tagged by its file extension.
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ReferenceImage {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|err| {
            GenerateError::local_io(format!("failed to read image {}", path.display()), err)
        })?;
        Ok(Self {
            mime_type: mime_from_extension(path),
            bytes,
        })
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GenerationResult {
    pub fn extension(&self) -> &'static str {
        extension_from_mime(&self.mime_type)
    }
}

impl fmt::Debug for GenerationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationResult")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{AspectRatio, GenerationRequest, ImageSize, ReferenceImage};
    use crate::error::GenerateError;

    #[test]
    fn accepts_exactly_the_ten_aspect_ratios() {
        let accepted = [
            "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
        ];
        for raw in accepted {
            let ratio: AspectRatio = raw.parse().unwrap();
            assert_eq!(ratio.as_str(), raw);
        }
        assert_eq!(AspectRatio::ALL.len(), accepted.len());
    }

    #[test]
    fn rejects_unknown_aspect_ratios() {
        for raw in ["1:2", "16:10", "4:4", "invalid", "", " 1:1", "1:1 "] {
            let err = raw.parse::<AspectRatio>().unwrap_err();
            assert!(
                matches!(err, GenerateError::InvalidParameter { name: "aspect ratio", .. }),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn aspect_ratio_error_lists_valid_values() {
        let err = "99:1".parse::<AspectRatio>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid aspect ratio: 99:1 (valid: 1:1, 2:3, 3:2, 3:4, 4:3, 4:5, 5:4, 9:16, 16:9, 21:9)"
        );
    }

    #[test]
    fn size_matching_is_exact() {
        assert_eq!("1K".parse::<ImageSize>().unwrap(), ImageSize::OneK);
        assert_eq!("2K".parse::<ImageSize>().unwrap(), ImageSize::TwoK);
        assert_eq!("4K".parse::<ImageSize>().unwrap(), ImageSize::FourK);
        for raw in ["1k", "3K", "8K", "HD", ""] {
            assert!(raw.parse::<ImageSize>().is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn request_defaults_and_blank_model_is_dropped() {
        let request = GenerationRequest::new("a cute cat")
            .unwrap()
            .with_model(Some("   ".to_string()));
        assert_eq!(request.aspect_ratio, AspectRatio::Square);
        assert_eq!(request.size, ImageSize::OneK);
        assert!(request.model.is_none());
        assert!(request.reference_images.is_empty());
    }

    #[test]
    fn request_rejects_blank_prompt() {
        assert!(GenerationRequest::new("  ").is_err());
    }

    #[test]
    fn reference_image_infers_mime_from_extension() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("photo.JPG");
        fs::write(&path, b"\xff\xd8\xff\xe0fake")?;
        let image = ReferenceImage::load(&path)?;
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, b"\xff\xd8\xff\xe0fake");
        Ok(())
    }

    #[test]
    fn missing_reference_image_is_local_io_error() {
        let request = GenerationRequest::new("edit")
            .unwrap()
            .with_reference_images(vec!["/nonexistent/file.png".into()]);
        let err = request.load_reference_images().unwrap_err();
        assert!(matches!(err, GenerateError::LocalIo { .. }));
        assert!(err.to_string().starts_with("failed to read image /nonexistent/file.png"));
    }
}
