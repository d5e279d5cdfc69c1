//! QR-code redirector URLs.
//!
//! Payconiq renders QR codes for any payment URL through its portal:
//!
//! ```text
//! https://portal.payconiq.com/qrcode?c=<payment url>[&f=<format>][&s=<size>][&cl=<color>]
//! ```
//!
//! Parameters always appear in that order and only when set.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Payconiq's QR-code rendering service.
pub const QR_CODE_SERVICE_URL: &str = "https://portal.payconiq.com/qrcode";

/// Image format of the rendered code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QrFormat {
    /// Raster image.
    Png,
    /// Vector image.
    Svg,
}

impl QrFormat {
    /// Query value for this format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Svg => "SVG",
        }
    }
}

/// Rendered size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QrSize {
    /// Small.
    S,
    /// Medium.
    M,
    /// Large.
    L,
    /// Extra large.
    #[serde(rename = "XL")]
    Xl,
}

impl QrSize {
    /// Query value for this size.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::Xl => "XL",
        }
    }
}

/// Foreground color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrColor {
    /// Payconiq brand color.
    Magenta,
    /// Plain black.
    Black,
}

impl QrColor {
    /// Query value for this color.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Magenta => "magenta",
            Self::Black => "black",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(QrFormat, QrSize, QrColor);

/// Rendering options; unset fields are left to the portal's defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QrCodeOptions {
    /// Image format.
    #[serde(default)]
    pub format: Option<QrFormat>,
    /// Rendered size.
    #[serde(default)]
    pub size: Option<QrSize>,
    /// Foreground color.
    #[serde(default)]
    pub color: Option<QrColor>,
}

impl QrCodeOptions {
    /// These options with every field set in `overrides` replaced.
    #[must_use]
    pub fn merged_with(&self, overrides: &Self) -> Self {
        Self {
            format: overrides.format.or(self.format),
            size: overrides.size.or(self.size),
            color: overrides.color.or(self.color),
        }
    }
}

/// Builds the redirector URL rendering `target` as a QR code.
#[must_use]
pub fn make_qr_code_url(target: &str, options: &QrCodeOptions) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("c", target);
    if let Some(format) = options.format {
        query.append_pair("f", format.as_str());
    }
    if let Some(size) = options.size {
        query.append_pair("s", size.as_str());
    }
    if let Some(color) = options.color {
        query.append_pair("cl", color.as_str());
    }
    format!("{QR_CODE_SERVICE_URL}?{}", query.finish())
}
