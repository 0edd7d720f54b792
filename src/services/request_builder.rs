// Request Builder
// Turns raw user input into a validated AnalysisRequest. No I/O.

use thiserror::Error;

use crate::models::{AnalysisRequest, ImagePayload};
use crate::services::config_store::{DetectionConfig, DEFAULT_MAX_CHARS, DEFAULT_MIN_WORDS};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no text or image supplied")]
    EmptyInput,
    #[error("text has {words} word(s), at least {min} required")]
    TextTooShort { words: usize, min: usize },
    #[error("text has {chars} characters, at most {max} allowed")]
    TextTooLong { chars: usize, max: usize },
    #[error("unsupported image type: {mime_type}")]
    InvalidImageType { mime_type: String },
    #[error("image payload is empty")]
    EmptyImage,
}

impl ValidationError {
    /// Actionable guidance shown to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Please provide text or an image to analyze.".to_string(),
            Self::TextTooShort { min, .. } => {
                format!("Please enter at least {} words for analysis.", min)
            }
            Self::TextTooLong { max, .. } => {
                format!("Please shorten the text to at most {} characters.", max)
            }
            Self::InvalidImageType { .. } | Self::EmptyImage => {
                "Please select a valid image file.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub min_words: usize,
    pub max_chars: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl From<&DetectionConfig> for InputLimits {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            min_words: config.min_words,
            max_chars: config.max_chars,
        }
    }
}

/// Whitespace-separated word count, ignoring empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Build a request with the default limits (2 words, 50,000 characters).
pub fn build_request(
    text: Option<&str>,
    image: Option<ImagePayload>,
) -> Result<AnalysisRequest, ValidationError> {
    build_request_with(InputLimits::default(), text, image)
}

pub fn build_request_with(
    limits: InputLimits,
    text: Option<&str>,
    image: Option<ImagePayload>,
) -> Result<AnalysisRequest, ValidationError> {
    let text = text.map(str::trim).filter(|t| !t.is_empty());

    if text.is_none() && image.is_none() {
        return Err(ValidationError::EmptyInput);
    }

    let image = match image {
        Some(img) => Some(validate_image(img)?),
        None => None,
    };

    if let Some(t) = text {
        let chars = t.chars().count();
        if chars > limits.max_chars {
            return Err(ValidationError::TextTooLong {
                chars,
                max: limits.max_chars,
            });
        }
        if image.is_none() {
            let words = word_count(t);
            if words < limits.min_words {
                return Err(ValidationError::TextTooShort {
                    words,
                    min: limits.min_words,
                });
            }
        }
    }

    Ok(AnalysisRequest {
        text: text.map(str::to_string),
        image,
    })
}

fn validate_image(image: ImagePayload) -> Result<ImagePayload, ValidationError> {
    let mime_type = image.mime_type.trim().to_ascii_lowercase();
    if !mime_type.starts_with("image/") {
        return Err(ValidationError::InvalidImageType {
            mime_type: image.mime_type,
        });
    }
    if image.bytes.is_empty() {
        return Err(ValidationError::EmptyImage);
    }
    Ok(ImagePayload {
        bytes: image.bytes,
        mime_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InputType;

    fn png() -> ImagePayload {
        ImagePayload::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png")
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(build_request(None, None), Err(ValidationError::EmptyInput));
        assert_eq!(build_request(Some(""), None), Err(ValidationError::EmptyInput));
        assert_eq!(build_request(Some("  \n\t "), None), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn test_single_word_rejected() {
        assert_eq!(
            build_request(Some("hi"), None),
            Err(ValidationError::TextTooShort { words: 1, min: 2 })
        );
        assert!(matches!(
            build_request(Some("  გამარჯობა  "), None),
            Err(ValidationError::TextTooShort { words: 1, .. })
        ));
    }

    #[test]
    fn test_two_words_accepted_and_trimmed() {
        let req = build_request(Some("  hello   world \n"), None).unwrap();
        assert_eq!(req.text(), Some("hello   world"));
        assert!(req.image().is_none());
        assert_eq!(req.input_type(), InputType::Text);
    }

    #[test]
    fn test_short_text_allowed_with_image() {
        let req = build_request(Some("hi"), Some(png())).unwrap();
        assert_eq!(req.text(), Some("hi"));
        assert_eq!(req.input_type(), InputType::Image);
    }

    #[test]
    fn test_image_only() {
        let req = build_request(None, Some(png())).unwrap();
        assert!(req.text().is_none());
        assert_eq!(req.image().unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_non_image_mime_rejected() {
        for mime in ["application/pdf", "text/plain", "", "imagepng", "video/mp4"] {
            let err = build_request(None, Some(ImagePayload::new(vec![1, 2, 3], mime))).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidImageType { .. }),
                "mime {:?} should be rejected",
                mime
            );
        }
    }

    #[test]
    fn test_mime_normalized() {
        let req = build_request(None, Some(ImagePayload::new(vec![1], " Image/JPEG "))).unwrap();
        assert_eq!(req.image().unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn test_empty_image_rejected() {
        let err = build_request(None, Some(ImagePayload::new(vec![], "image/png"))).unwrap_err();
        assert_eq!(err, ValidationError::EmptyImage);
    }

    #[test]
    fn test_text_too_long_rejected() {
        let limits = InputLimits { min_words: 2, max_chars: 10 };
        let err = build_request_with(limits, Some("one two three four"), None).unwrap_err();
        assert_eq!(err, ValidationError::TextTooLong { chars: 18, max: 10 });

        // Limit counts characters, not bytes.
        let georgian = "ა ბ გ დ ე";
        assert!(build_request_with(limits, Some(georgian), None).is_ok());
    }

    #[test]
    fn test_text_too_long_rejected_with_image() {
        let limits = InputLimits { min_words: 2, max_chars: 10 };
        let err = build_request_with(limits, Some("one two three four"), Some(png())).unwrap_err();
        assert_eq!(err, ValidationError::TextTooLong { chars: 18, max: 10 });
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ValidationError::TextTooShort { words: 1, min: 2 }.user_message(),
            "Please enter at least 2 words for analysis."
        );
        assert_eq!(
            ValidationError::EmptyInput.user_message(),
            "Please provide text or an image to analyze."
        );
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  a  b\tc\nd "), 4);
    }
}
