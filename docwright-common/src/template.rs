//! Named layout bundles applied before any content is inserted.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown template: {0}")]
pub struct UnknownTemplate(pub String);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TemplateName {
    #[default]
    Standard,
    Report,
    Memo,
    Letter,
}

/// How the title block at the top of a document is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStyle {
    Centered,
    /// Centered, enlarged and bold.
    Banner,
    /// A `MEMORANDUM` caption followed by a subject line.
    MemoHeader,
    LeftAligned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutDirectives {
    pub title_style: TitleStyle,
    pub margins_inches: f32,
    pub default_font_family: &'static str,
    pub default_font_size_pt: u8,
    pub heading_size_pt: u8,
}

impl LayoutDirectives {
    pub fn margin_twips(&self) -> i32 {
        (self.margins_inches * 1440.0).round() as i32
    }
}

impl TemplateName {
    pub const ALL: [TemplateName; 4] = [
        TemplateName::Standard,
        TemplateName::Report,
        TemplateName::Memo,
        TemplateName::Letter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateName::Standard => "standard",
            TemplateName::Report => "report",
            TemplateName::Memo => "memo",
            TemplateName::Letter => "letter",
        }
    }

    pub fn layout(self) -> LayoutDirectives {
        match self {
            TemplateName::Standard => LayoutDirectives {
                title_style: TitleStyle::Centered,
                margins_inches: 1.0,
                default_font_family: "Calibri",
                default_font_size_pt: 11,
                heading_size_pt: 14,
            },
            TemplateName::Report => LayoutDirectives {
                title_style: TitleStyle::Banner,
                margins_inches: 1.0,
                default_font_family: "Cambria",
                default_font_size_pt: 11,
                heading_size_pt: 16,
            },
            TemplateName::Memo => LayoutDirectives {
                title_style: TitleStyle::MemoHeader,
                margins_inches: 1.0,
                default_font_family: "Arial",
                default_font_size_pt: 11,
                heading_size_pt: 13,
            },
            TemplateName::Letter => LayoutDirectives {
                title_style: TitleStyle::LeftAligned,
                margins_inches: 1.25,
                default_font_family: "Times New Roman",
                default_font_size_pt: 12,
                heading_size_pt: 14,
            },
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateName {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TemplateName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTemplate(s.to_string()))
    }
}

/// Looks up the layout for a template given by name.
pub fn resolve_template(name: &str) -> Result<LayoutDirectives, UnknownTemplate> {
    Ok(name.parse::<TemplateName>()?.layout())
}
