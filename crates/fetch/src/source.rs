//! Image key classification

use std::path::PathBuf;

/// Prefix marking a key as the name of a bundled resource
pub const RESOURCE_PREFIX: &str = "res:";

/// Where the bytes for an image key come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A resource bundled with the application, by name
    Resource(String),
    /// A file on local storage
    File(PathBuf),
    /// An `http` or `https` URL
    Url(String),
}

impl ImageSource {
    /// Classify a key.
    ///
    /// `http://` and `https://` keys are URLs, `res:<name>` keys are bundled
    /// resources, and anything else is a file path (an optional `file://`
    /// prefix is stripped).
    pub fn parse(key: &str) -> Self {
        let lower = key.get(..8).unwrap_or(key).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Url(key.to_string())
        } else if let Some(name) = key.strip_prefix(RESOURCE_PREFIX) {
            ImageSource::Resource(name.to_string())
        } else if let Some(path) = key.strip_prefix("file://") {
            ImageSource::File(PathBuf::from(path))
        } else {
            ImageSource::File(PathBuf::from(key))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageSource::Url(_))
    }
}

impl From<&str> for ImageSource {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        assert_eq!(
            ImageSource::parse("https://example.com/a.jpg"),
            ImageSource::Url("https://example.com/a.jpg".into())
        );
        assert_eq!(
            ImageSource::parse("HTTP://EXAMPLE.COM/B.PNG"),
            ImageSource::Url("HTTP://EXAMPLE.COM/B.PNG".into())
        );
        assert!(ImageSource::parse("http://x").is_remote());
    }

    #[test]
    fn test_resources() {
        assert_eq!(
            ImageSource::parse("res:empty_photo.png"),
            ImageSource::Resource("empty_photo.png".into())
        );
    }

    #[test]
    fn test_files() {
        assert_eq!(
            ImageSource::parse("/sdcard/photo.jpg"),
            ImageSource::File(PathBuf::from("/sdcard/photo.jpg"))
        );
        assert_eq!(
            ImageSource::parse("file:///tmp/photo.jpg"),
            ImageSource::File(PathBuf::from("/tmp/photo.jpg"))
        );
        assert_eq!(
            ImageSource::parse("relative/photo.jpg"),
            ImageSource::File(PathBuf::from("relative/photo.jpg"))
        );
        // Short keys and non-ASCII keys must not panic
        assert!(!ImageSource::parse("a").is_remote());
        assert!(!ImageSource::parse("фото.jpg").is_remote());
    }
}
