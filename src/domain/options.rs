//! Generation options and final prompt construction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Option parsing errors
#[derive(Debug, Error, PartialEq)]
pub enum OptionError {
    #[error("Unsupported aspect ratio: {0}")]
    InvalidAspectRatio(String),
    #[error("Unsupported resolution: {0}")]
    InvalidResolution(String),
    #[error("Unsupported generation mode: {0}")]
    InvalidMode(String),
}

/// Target aspect ratio for the processed subject image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait,
    #[serde(rename = "16:9")]
    Widescreen,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [AspectRatio::Square, AspectRatio::Portrait, AspectRatio::Widescreen];

    /// (width, height) terms of the ratio
    pub fn terms(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Portrait => (2, 3),
            AspectRatio::Widescreen => (16, 9),
        }
    }

    /// Width divided by height
    pub fn ratio(&self) -> f64 {
        let (w, h) = self.terms();
        w as f64 / h as f64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "2:3",
            AspectRatio::Widescreen => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = OptionError;

    /// Parse a "W:H" string, e.g. "16:9"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| OptionError::InvalidAspectRatio(s.to_string()))?;
        let w: u32 = w.trim().parse().map_err(|_| OptionError::InvalidAspectRatio(s.to_string()))?;
        let h: u32 = h.trim().parse().map_err(|_| OptionError::InvalidAspectRatio(s.to_string()))?;

        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.terms() == (w, h))
            .ok_or_else(|| OptionError::InvalidAspectRatio(s.to_string()))
    }
}

/// Resolution hint appended to the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum Resolution {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
    #[serde(rename = "8K")]
    EightK,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Unspecified => "",
            Resolution::TwoK => "2K",
            Resolution::FourK => "4K",
            Resolution::EightK => "8K",
        }
    }
}

impl FromStr for Resolution {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" => Ok(Resolution::Unspecified),
            "2K" => Ok(Resolution::TwoK),
            "4K" => Ok(Resolution::FourK),
            "8K" => Ok(Resolution::EightK),
            _ => Err(OptionError::InvalidResolution(s.to_string())),
        }
    }
}

/// Rendering style hint appended to the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum GenerationMode {
    #[default]
    Default,
    Cinematic,
    Realistic,
    Artistic,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Default => "Default",
            GenerationMode::Cinematic => "Cinematic",
            GenerationMode::Realistic => "Realistic",
            GenerationMode::Artistic => "Artistic",
        }
    }
}

impl FromStr for GenerationMode {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(GenerationMode::Default),
            "cinematic" => Ok(GenerationMode::Cinematic),
            "realistic" => Ok(GenerationMode::Realistic),
            "artistic" => Ok(GenerationMode::Artistic),
            _ => Err(OptionError::InvalidMode(s.to_string())),
        }
    }
}

/// Per-session generation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerationOptions {
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub mode: GenerationMode,
}

impl GenerationOptions {
    pub fn final_prompt(&self, base: &str) -> String {
        build_final_prompt(base, self.mode, self.resolution)
    }
}

/// Append the mode and resolution clauses to a base prompt.
///
/// The mode clause always precedes the resolution clause.
pub fn build_final_prompt(base: &str, mode: GenerationMode, resolution: Resolution) -> String {
    let mut additions = Vec::with_capacity(2);

    if mode != GenerationMode::Default {
        additions.push(format!("a {} style", mode.as_str().to_lowercase()));
    }
    if resolution != Resolution::Unspecified {
        additions.push(format!("in {} resolution", resolution.as_str()));
    }

    let mut prompt = base.to_string();
    if !additions.is_empty() {
        prompt.push_str(", ");
        prompt.push_str(&additions.join(", "));
    }
    prompt.trim().to_string()
}
