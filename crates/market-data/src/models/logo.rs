//! Logo artifact decoding.
//!
//! Upstream serves instrument logos in several shapes: a Lottie animation
//! (JSON), a JSON envelope with an embedded SVG string, or a raw SVG
//! document. The payload is decoded exactly once, at the client boundary,
//! into a tagged variant; caching and rendering operate uniformly over it.

use serde_json::Value;

use crate::errors::FetchError;

/// A decoded logo artifact.
#[derive(Clone, Debug, PartialEq)]
pub enum LogoArtifact {
    /// Lottie animation data; frame 0 is renderable by the host.
    Animated(Value),

    /// Vector image data (SVG document bytes).
    Static(Vec<u8>),
}

impl LogoArtifact {
    /// Decode an upstream logo response body.
    ///
    /// Accepted forms:
    /// - Lottie JSON -> `Animated`
    /// - JSON object with an `svg` string field -> `Static`
    /// - raw SVG (`<svg` after whitespace) -> `Static`
    ///
    /// Everything else is an [`FetchError::InvalidResponse`].
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Self, FetchError> {
        let looks_json = content_type
            .map(|c| c.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
            || matches!(body.first(), Some(b'{') | Some(b'['));

        if looks_json {
            let value: Value = serde_json::from_slice(body).map_err(|e| {
                FetchError::InvalidResponse(format!("logo payload is not valid JSON: {e}"))
            })?;

            if let Some(svg) = value.get("svg").and_then(Value::as_str) {
                if svg.contains("<svg") {
                    return Ok(Self::Static(svg.as_bytes().to_vec()));
                }
                return Err(FetchError::InvalidResponse(
                    "embedded svg field does not contain an SVG document".to_string(),
                ));
            }

            return Ok(Self::Animated(value));
        }

        let trimmed = body
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map(|start| &body[start..])
            .unwrap_or(&[]);
        if trimmed.starts_with(b"<svg") {
            return Ok(Self::Static(body.to_vec()));
        }

        Err(FetchError::InvalidResponse(
            "unsupported logo content".to_string(),
        ))
    }

    /// File extension the cached artifact should use.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Animated(_) => "json",
            Self::Static(_) => "svg",
        }
    }
}
