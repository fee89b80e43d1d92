/// A raw encoded image plus the display name it was submitted under.
///
/// The bytes are opaque until normalized; nothing about the payload is
/// validated on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct GalleryImage {
    name: String,
    bytes: Vec<u8>,
}

impl GalleryImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Display name reduced to characters that are safe inside a storage key.
    ///
    /// Path separators and anything outside `[A-Za-z0-9._-]` become `_`;
    /// leading dots are stripped so the result is never `.` or `..`.
    pub fn sanitized_name(&self) -> String {
        let mapped: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let trimmed = mapped.trim_start_matches('.');
        if trimmed.is_empty() {
            "image".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_accessors() {
        let image = GalleryImage::new("a.jpg", vec![1, 2, 3]);
        assert_eq!(image.name(), "a.jpg");
        assert_eq!(image.bytes(), &[1, 2, 3]);
    }

    #[rstest]
    #[case::plain("beach.jpg", "beach.jpg")]
    #[case::spaces("my photo.png", "my_photo.png")]
    #[case::path_separators("../../etc/passwd", "_.._etc_passwd")]
    #[case::dot_only("..", "image")]
    #[case::empty("", "image")]
    #[case::unicode("café.jpg", "caf_.jpg")]
    fn test_sanitized_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(GalleryImage::new(name, vec![]).sanitized_name(), expected);
    }
}
