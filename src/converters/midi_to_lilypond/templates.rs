//! Standalone LilyPond documents
//!
//! The converter itself only produces a music expression. To compile it on
//! its own, LilyPond also needs a `\version` line, the note name language
//! and the `triplets` music function that the expression uses. The
//! mustache template in `templates/standalone.ly.mustache` supplies those.

use serde::Serialize;

use crate::converters::midi_to_lilypond::errors::ConversionError;
use crate::converters::midi_to_lilypond::types::ConversionSettings;

const STANDALONE_TEMPLATE: &str = include_str!("templates/standalone.ly.mustache");

/// Context data for template rendering
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// LilyPond version (e.g., "2.24.0")
    pub version: String,

    /// Argument of `\language`
    pub language: String,

    /// Document title, already escaped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Use a drum staff
    pub drums: bool,

    /// `\relative` or `\drummode` block
    pub music: String,
}

impl TemplateContext {
    pub fn new(version: String, language: String, music: String) -> Self {
        Self {
            version,
            language,
            title: None,
            drums: music.trim_start().starts_with("\\drummode"),
            music,
        }
    }

    pub fn builder(version: String, language: String, music: String) -> TemplateContextBuilder {
        TemplateContextBuilder {
            context: TemplateContext::new(version, language, music),
        }
    }
}

pub struct TemplateContextBuilder {
    context: TemplateContext,
}

impl TemplateContextBuilder {
    pub fn title(mut self, title: Option<String>) -> Self {
        self.context.title = title;
        self
    }

    pub fn build(self) -> TemplateContext {
        self.context
    }
}

/// Render a context with the standalone template
pub fn render_lilypond(context: &TemplateContext) -> Result<String, ConversionError> {
    let template = mustache::compile_str(STANDALONE_TEMPLATE)?;
    Ok(template.render_to_string(context)?)
}

/// Wrap converted music in a complete `.ly` file
pub fn render_standalone_document(
    music: &str,
    settings: &ConversionSettings,
) -> Result<String, ConversionError> {
    let context = TemplateContext::builder(
        settings.lilypond_version.clone(),
        settings.language.lilypond_name().to_string(),
        music.to_string(),
    )
    .title(settings.title.as_deref().map(escape_lilypond_string))
    .build();

    render_lilypond(&context)
}

/// Escape a string for use inside a LilyPond string literal
fn escape_lilypond_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
