//! Report layout and font options
//!
//! Every field has a default so a partial JSON file only overrides what it names.

use crate::error::{ReportGenerationError, ReportResult};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A4 width in points
pub const A4_WIDTH: f32 = 595.28;
/// A4 height in points
pub const A4_HEIGHT: f32 = 841.89;

/// Where the embedded fonts come from and what happens when they are missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FontConfig {
    pub dir: PathBuf,
    pub primary_regular: String,
    pub primary_bold: String,
    pub secondary_regular: String,
    pub secondary_bold: String,
    /// Degrade to the built-in Helvetica set instead of failing the render.
    pub allow_builtin_fallback: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("assets/fonts"),
            primary_regular: "NotoSans-Regular.ttf".to_string(),
            primary_bold: "NotoSans-Bold.ttf".to_string(),
            secondary_regular: "NotoSansSinhala-Regular.ttf".to_string(),
            secondary_bold: "NotoSansSinhala-Bold.ttf".to_string(),
            allow_builtin_fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportOptions {
    pub page_width: f32,
    pub page_height: f32,
    /// Same margin on all four sides.
    pub margin: f32,
    /// Static text centred at the top of every page.
    pub header_text: String,

    pub title_font_size: f32,
    pub details_font_size: f32,
    pub date_header_font_size: f32,
    pub message_meta_font_size: f32,
    pub message_body_font_size: f32,
    pub header_footer_font_size: f32,

    /// Line height as a multiple of the font size.
    pub line_spacing: f32,
    /// Gap after each placed block, in points.
    pub block_spacing: f32,
    /// Share of the content width a chat bubble may use.
    pub bubble_width_ratio: f32,
    /// Offset of the render timezone from UTC, in minutes.
    pub utc_offset_minutes: i32,

    pub fonts: FontConfig,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            margin: 50.0,
            header_text: "DopamineLite".to_string(),
            title_font_size: 14.0,
            details_font_size: 11.0,
            date_header_font_size: 11.0,
            message_meta_font_size: 9.0,
            message_body_font_size: 12.0,
            header_footer_font_size: 10.0,
            line_spacing: 1.35,
            block_spacing: 4.0,
            bubble_width_ratio: 0.85,
            utc_offset_minutes: 0,
            fonts: FontConfig::default(),
        }
    }
}

impl ReportOptions {
    /// Load options from a JSON file and validate them.
    pub fn from_json_file(path: impl AsRef<Path>) -> ReportResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| {
            ReportGenerationError::InvalidOptions(format!("cannot read {}: {}", path.display(), e))
        })?;
        let options: ReportOptions = serde_json::from_slice(&raw)
            .map_err(|e| ReportGenerationError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> ReportResult<()> {
        let invalid = |msg: String| Err(ReportGenerationError::InvalidOptions(msg));

        if !(self.page_width > 0.0 && self.page_height > 0.0) {
            return invalid(format!(
                "page size must be positive, got {}x{}",
                self.page_width, self.page_height
            ));
        }
        if self.margin < 0.0 || self.margin * 2.0 >= self.page_width.min(self.page_height) {
            return invalid(format!("margin {} leaves no content area", self.margin));
        }
        let sizes = [
            self.title_font_size,
            self.details_font_size,
            self.date_header_font_size,
            self.message_meta_font_size,
            self.message_body_font_size,
            self.header_footer_font_size,
        ];
        if sizes.iter().any(|s| !(*s > 0.0)) {
            return invalid("font sizes must be positive".to_string());
        }
        if !(self.line_spacing >= 1.0) {
            return invalid(format!("line spacing {} is below 1.0", self.line_spacing));
        }
        if !(self.bubble_width_ratio > 0.0 && self.bubble_width_ratio <= 1.0) {
            return invalid(format!(
                "bubble width ratio {} must be within (0, 1]",
                self.bubble_width_ratio
            ));
        }
        if self.block_spacing < 0.0 {
            return invalid(format!("block spacing {} is negative", self.block_spacing));
        }
        if self.render_timezone().is_none() {
            return invalid(format!(
                "utc offset {} minutes is out of range",
                self.utc_offset_minutes
            ));
        }
        Ok(())
    }

    /// Timezone used for every timestamp and for the per-day grouping.
    pub fn render_timezone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Maximum width of a chat bubble (meta and body lines).
    pub fn bubble_width(&self) -> f32 {
        self.content_width() * self.bubble_width_ratio
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_a4() {
        let options = ReportOptions::default();
        options.validate().unwrap();
        assert_eq!(options.page_width, A4_WIDTH);
        assert!((options.content_width() - 495.28).abs() < 0.01);
        assert!((options.bubble_width() - 495.28 * 0.85).abs() < 0.01);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let options: ReportOptions =
            serde_json::from_str(r#"{"margin": 36, "fonts": {"dir": "/opt/fonts"}}"#).unwrap();
        assert_eq!(options.margin, 36.0);
        assert_eq!(options.header_text, "DopamineLite");
        assert_eq!(options.fonts.dir, PathBuf::from("/opt/fonts"));
        assert_eq!(options.fonts.primary_bold, "NotoSans-Bold.ttf");
        assert!(options.fonts.allow_builtin_fallback);
    }

    #[test]
    fn rejects_bad_geometry_and_offsets() {
        let mut options = ReportOptions::default();
        options.margin = 400.0;
        assert!(options.validate().is_err());

        let mut options = ReportOptions::default();
        options.bubble_width_ratio = 1.5;
        assert!(options.validate().is_err());

        let mut options = ReportOptions::default();
        options.utc_offset_minutes = 24 * 60;
        assert!(options.validate().is_err());

        let mut options = ReportOptions::default();
        options.utc_offset_minutes = 330;
        options.validate().unwrap();
        assert_eq!(
            options.render_timezone().unwrap().local_minus_utc(),
            330 * 60
        );
    }
}
