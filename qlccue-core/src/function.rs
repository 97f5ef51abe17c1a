//! Function kinds, chaser run orders and fade labels

use crate::ParseError;
use std::fmt;
use std::str::FromStr;

/// Type of a function in a QLC+ workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FunctionKind {
    Scene,
    Chaser,
    Sequence,
    Efx,
    Collection,
    Script,
    RgbMatrix,
    Show,
    Audio,
    Video,
}

impl FunctionKind {
    /// All kinds, in the order the catalog reports them
    pub const ALL: [FunctionKind; 10] = [
        FunctionKind::Scene,
        FunctionKind::Chaser,
        FunctionKind::Sequence,
        FunctionKind::Efx,
        FunctionKind::Collection,
        FunctionKind::Script,
        FunctionKind::RgbMatrix,
        FunctionKind::Show,
        FunctionKind::Audio,
        FunctionKind::Video,
    ];

    /// Returns the `Type` attribute value used in the workspace file
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Scene => "Scene",
            FunctionKind::Chaser => "Chaser",
            FunctionKind::Sequence => "Sequence",
            FunctionKind::Efx => "EFX",
            FunctionKind::Collection => "Collection",
            FunctionKind::Script => "Script",
            FunctionKind::RgbMatrix => "RGBMatrix",
            FunctionKind::Show => "Show",
            FunctionKind::Audio => "Audio",
            FunctionKind::Video => "Video",
        }
    }
}

impl FromStr for FunctionKind {
    type Err = ParseError;

    /// Case-insensitive: "Chaser", "CHASER" and "chaser" are the same kind
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FunctionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseError::UnknownFunctionKind(trimmed.to_string()))
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a chaser repeats or terminates
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RunOrder {
    Loop,
    SingleShot,
    PingPong,
    /// Any other `RunOrder` text found in the workspace (e.g. "Random")
    Other(String),
}

impl RunOrder {
    /// Parses the text content of a `RunOrder` element
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "Loop" => RunOrder::Loop,
            "SingleShot" => RunOrder::SingleShot,
            "PingPong" => RunOrder::PingPong,
            other => RunOrder::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RunOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOrder::Loop => f.write_str("Loop"),
            RunOrder::SingleShot => f.write_str("SingleShot"),
            RunOrder::PingPong => f.write_str("PingPong"),
            RunOrder::Other(text) => f.write_str(text),
        }
    }
}

/// Named fade length used in cue sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FadeLabel {
    #[default]
    None,
    Rapid,
    Quick,
    Medium,
    Slow,
    Long,
}

impl FadeLabel {
    pub const ALL: [FadeLabel; 6] = [
        FadeLabel::None,
        FadeLabel::Rapid,
        FadeLabel::Quick,
        FadeLabel::Medium,
        FadeLabel::Slow,
        FadeLabel::Long,
    ];

    /// Fade length in milliseconds
    pub fn ms(&self) -> u64 {
        match self {
            FadeLabel::None => 0,
            FadeLabel::Rapid => 250,
            FadeLabel::Quick => 500,
            FadeLabel::Medium => 1750,
            FadeLabel::Slow => 3000,
            FadeLabel::Long => 5000,
        }
    }

    /// Returns the label as written in a cue sheet
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeLabel::None => "NONE",
            FadeLabel::Rapid => "RAPID",
            FadeLabel::Quick => "QUICK",
            FadeLabel::Medium => "MEDIUM",
            FadeLabel::Slow => "SLOW",
            FadeLabel::Long => "LONG",
        }
    }
}

impl FromStr for FadeLabel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FadeLabel::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseError::UnknownFade(trimmed.to_string()))
    }
}

impl fmt::Display for FadeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_case_insensitive() {
        assert_eq!("chaser".parse::<FunctionKind>().unwrap(), FunctionKind::Chaser);
        assert_eq!("SCENE".parse::<FunctionKind>().unwrap(), FunctionKind::Scene);
        assert_eq!(" Show ".parse::<FunctionKind>().unwrap(), FunctionKind::Show);
        assert_eq!("rgbmatrix".parse::<FunctionKind>().unwrap(), FunctionKind::RgbMatrix);
        assert!(matches!(
            "Strobe".parse::<FunctionKind>(),
            Err(ParseError::UnknownFunctionKind(name)) if name == "Strobe"
        ));
    }

    #[test]
    fn test_run_order_parse() {
        assert_eq!(RunOrder::parse("Loop"), RunOrder::Loop);
        assert_eq!(RunOrder::parse(" SingleShot\n"), RunOrder::SingleShot);
        assert_eq!(RunOrder::parse("PingPong"), RunOrder::PingPong);
        assert_eq!(RunOrder::parse("Random"), RunOrder::Other("Random".to_string()));
    }

    #[test]
    fn test_fade_table() {
        assert_eq!("SLOW".parse::<FadeLabel>().unwrap().ms(), 3000);
        assert_eq!("medium".parse::<FadeLabel>().unwrap().ms(), 1750);
        assert_eq!("QUICK".parse::<FadeLabel>().unwrap().ms(), 500);
        assert_eq!("NONE".parse::<FadeLabel>().unwrap().ms(), 0);
        assert_eq!("RAPID".parse::<FadeLabel>().unwrap().ms(), 250);
        assert_eq!("LONG".parse::<FadeLabel>().unwrap().ms(), 5000);
        assert!("FAST".parse::<FadeLabel>().is_err());
    }
}
