//! Font resolution, coverage and metrics
//!
//! Four font slots (regular/bold for each script class) are either embedded TrueType
//! fonts loaded with fontdue or, when a file is missing, the built-in Helvetica pair.
//! A single missing slot switches the whole resolver to non-Unicode mode, in which
//! `sanitize` only lets ASCII through.

use crate::config::FontConfig;
use crate::error::{ReportGenerationError, ReportResult};
use crate::script::ScriptClass;
use fontdue::{Font, FontSettings};
use std::path::Path;
use std::sync::Arc;

/// Substitute for characters a font cannot encode.
pub const REPLACEMENT_CHAR: char = '?';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// Key of one font slot. Cheap to copy and independent of what was loaded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontHandle {
    pub script: ScriptClass,
    pub weight: FontWeight,
}

impl FontHandle {
    pub const ALL: [FontHandle; 4] = [
        FontHandle::new(ScriptClass::Primary, FontWeight::Regular),
        FontHandle::new(ScriptClass::Primary, FontWeight::Bold),
        FontHandle::new(ScriptClass::Secondary, FontWeight::Regular),
        FontHandle::new(ScriptClass::Secondary, FontWeight::Bold),
    ];

    pub const fn new(script: ScriptClass, weight: FontWeight) -> Self {
        Self { script, weight }
    }

    fn slot(self) -> usize {
        match (self.script, self.weight) {
            (ScriptClass::Primary, FontWeight::Regular) => 0,
            (ScriptClass::Primary, FontWeight::Bold) => 1,
            (ScriptClass::Secondary, FontWeight::Regular) => 2,
            (ScriptClass::Secondary, FontWeight::Bold) => 3,
        }
    }

    /// Name of the font in page resource dictionaries.
    pub fn resource_name(self) -> &'static str {
        ["F1", "F2", "F3", "F4"][self.slot()]
    }
}

/// Raw font bytes handed to the resolver.
#[derive(Debug, Clone)]
pub struct FontSource {
    pub name: String,
    pub data: Vec<u8>,
}

/// One optional source per slot; `None` means the resource is missing.
#[derive(Debug, Clone, Default)]
pub struct FontSources {
    pub primary_regular: Option<FontSource>,
    pub primary_bold: Option<FontSource>,
    pub secondary_regular: Option<FontSource>,
    pub secondary_bold: Option<FontSource>,
}

impl FontSources {
    /// Read every configured file. Unreadable files are left as `None`.
    pub fn from_dir(config: &FontConfig) -> Self {
        let read = |file: &str| read_font_file(&config.dir.join(file));
        Self {
            primary_regular: read(&config.primary_regular),
            primary_bold: read(&config.primary_bold),
            secondary_regular: read(&config.secondary_regular),
            secondary_bold: read(&config.secondary_bold),
        }
    }

    fn take(&mut self, handle: FontHandle) -> Option<FontSource> {
        match handle.slot() {
            0 => self.primary_regular.take(),
            1 => self.primary_bold.take(),
            2 => self.secondary_regular.take(),
            _ => self.secondary_bold.take(),
        }
    }
}

fn read_font_file(path: &Path) -> Option<FontSource> {
    match std::fs::read(path) {
        Ok(data) => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "EmbeddedFont".to_string());
            log::info!("Loading font {} from {}", name, path.display());
            Some(FontSource { name, data })
        }
        Err(e) => {
            log::warn!("Font resource {} unavailable: {}", path.display(), e);
            None
        }
    }
}

/// A TrueType font that will be embedded as a CID font.
pub struct EmbeddedFont {
    pub pdf_name: String,
    font: Font,
    data: Vec<u8>,
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("pdf_name", &self.pdf_name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl EmbeddedFont {
    pub fn from_source(source: FontSource) -> Result<Self, String> {
        if !is_truetype(&source.data) {
            return Err(format!("{} is not a TrueType font", source.name));
        }
        let font = Font::from_bytes(source.data.as_slice(), FontSettings::default())
            .map_err(|e| format!("failed to parse {}: {}", source.name, e))?;
        Ok(Self {
            pdf_name: pdf_font_name(&source.name),
            font,
            data: source.data,
        })
    }

    /// BMP only: content strings use the code point as a two-byte CID.
    pub fn covers(&self, ch: char) -> bool {
        (ch as u32) <= 0xFFFF && self.font.lookup_glyph_index(ch) != 0
    }

    pub fn glyph_index(&self, ch: char) -> u16 {
        self.font.lookup_glyph_index(ch)
    }

    /// Advance width in 1/1000 em.
    pub fn advance(&self, ch: char) -> f32 {
        self.font.metrics(ch, 1000.0).advance_width
    }

    /// Ascent and descent in 1/1000 em.
    pub fn ascent_descent(&self) -> (f32, f32) {
        self.font
            .horizontal_line_metrics(1000.0)
            .map(|m| (m.ascent, m.descent))
            .unwrap_or((880.0, -120.0))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn is_truetype(data: &[u8]) -> bool {
    data.len() > 4 && (data[..4] == [0x00, 0x01, 0x00, 0x00] || &data[..4] == b"true")
}

/// Reduce an arbitrary font name to the characters allowed in a PDF name.
pub fn pdf_font_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('-');
        }
    }
    if out.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        out
    }
}

/// Standard 14 fonts used when an embedded font is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
}

// AFM advance widths for U+0020..=U+007E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

impl BuiltinFont {
    pub fn for_weight(weight: FontWeight) -> Self {
        match weight {
            FontWeight::Regular => BuiltinFont::Helvetica,
            FontWeight::Bold => BuiltinFont::HelveticaBold,
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn covers(self, ch: char) -> bool {
        matches!(ch, ' '..='~')
    }

    /// Advance width in 1/1000 em; unencodable characters measure as the replacement.
    pub fn advance(self, ch: char) -> f32 {
        let table = match self {
            BuiltinFont::Helvetica => &HELVETICA_WIDTHS,
            BuiltinFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        let ch = if self.covers(ch) { ch } else { REPLACEMENT_CHAR };
        table[(ch as usize) - 0x20] as f32
    }
}

#[derive(Debug, Clone)]
pub enum FontFace {
    Embedded(Arc<EmbeddedFont>),
    Builtin(BuiltinFont),
}

impl FontFace {
    fn covers(&self, ch: char) -> bool {
        match self {
            FontFace::Embedded(font) => font.covers(ch),
            FontFace::Builtin(font) => font.covers(ch),
        }
    }

    fn advance(&self, ch: char) -> f32 {
        match self {
            FontFace::Embedded(font) => font.advance(ch),
            FontFace::Builtin(font) => font.advance(ch),
        }
    }
}

/// Immutable font set shared by renders. Clones share the loaded fonts.
#[derive(Debug, Clone)]
pub struct FontResolver {
    faces: [FontFace; 4],
    unicode: bool,
}

impl FontResolver {
    /// Resolver backed only by the built-in Helvetica pair (non-Unicode).
    pub fn builtin() -> Self {
        let face = |handle: FontHandle| FontFace::Builtin(BuiltinFont::for_weight(handle.weight));
        Self {
            faces: FontHandle::ALL.map(face),
            unicode: false,
        }
    }

    /// Load the configured font files, degrading per slot when one is missing.
    pub fn load(config: &FontConfig) -> ReportResult<Self> {
        Self::from_sources(FontSources::from_dir(config), config.allow_builtin_fallback)
    }

    pub fn from_sources(mut sources: FontSources, allow_fallback: bool) -> ReportResult<Self> {
        let mut unicode = true;
        let mut faces = Vec::with_capacity(FontHandle::ALL.len());

        for handle in FontHandle::ALL {
            let embedded = match sources.take(handle) {
                Some(source) => EmbeddedFont::from_source(source),
                None => Err(format!("no font supplied for {:?}", handle)),
            };

            match embedded {
                Ok(font) => faces.push(FontFace::Embedded(Arc::new(font))),
                Err(reason) if allow_fallback => {
                    log::warn!(
                        "{}; falling back to {}, text limited to ASCII",
                        reason,
                        BuiltinFont::for_weight(handle.weight).base_font()
                    );
                    unicode = false;
                    faces.push(FontFace::Builtin(BuiltinFont::for_weight(handle.weight)));
                }
                Err(reason) => return Err(ReportGenerationError::FontResourceMissing(reason)),
            }
        }

        let faces: [FontFace; 4] = faces
            .try_into()
            .map_err(|_| ReportGenerationError::InvalidState("font slot count mismatch"))?;
        Ok(Self { faces, unicode })
    }

    /// False once any slot fell back to a built-in font.
    pub fn is_unicode(&self) -> bool {
        self.unicode
    }

    pub fn resolve(&self, script: ScriptClass, weight: FontWeight) -> FontHandle {
        FontHandle::new(script, weight)
    }

    pub fn face(&self, handle: FontHandle) -> &FontFace {
        &self.faces[handle.slot()]
    }

    pub fn can_encode(&self, ch: char, handle: FontHandle) -> bool {
        self.face(handle).covers(ch)
    }

    /// Width of `text` in points at `size`.
    pub fn measure(&self, text: &str, handle: FontHandle, size: f32) -> f32 {
        let face = self.face(handle);
        let units: f32 = text.chars().map(|ch| face.advance(ch)).sum();
        units * size / 1000.0
    }

    /// Make `text` safe to emit with `handle`: controls normalised or dropped,
    /// anything the font cannot encode replaced.
    pub fn sanitize(&self, text: &str, handle: FontHandle) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '\r' | '\n' | '\t' => out.push(' '),
                c if c.is_control() => {}
                c if (c.is_ascii() || self.unicode) && self.can_encode(c, handle) => out.push(c),
                c => {
                    log::debug!("Substituting U+{:04X} for {:?}", c as u32, handle);
                    out.push(REPLACEMENT_CHAR);
                }
            }
        }
        out
    }

    /// Bytes of a PDF string that shows `text` in `handle`'s font.
    pub fn encode(&self, text: &str, handle: FontHandle) -> Vec<u8> {
        match self.face(handle) {
            FontFace::Builtin(font) => text
                .chars()
                .map(|ch| if font.covers(ch) { ch as u8 } else { REPLACEMENT_CHAR as u8 })
                .collect(),
            FontFace::Embedded(font) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let ch = if font.covers(ch) { ch } else { REPLACEMENT_CHAR };
                    bytes.extend_from_slice(&(ch as u16).to_be_bytes());
                }
                bytes
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGULAR: FontHandle = FontHandle::new(ScriptClass::Primary, FontWeight::Regular);
    const BOLD: FontHandle = FontHandle::new(ScriptClass::Primary, FontWeight::Bold);
    const SINHALA: FontHandle = FontHandle::new(ScriptClass::Secondary, FontWeight::Regular);

    #[test]
    fn builtin_measures_with_afm_widths() {
        let fonts = FontResolver::builtin();
        // H 722 + e 556 + l 222 + l 222 + o 556
        assert!((fonts.measure("Hello", REGULAR, 10.0) - 22.78).abs() < 1e-3);
        assert!(fonts.measure("Hello", BOLD, 10.0) > fonts.measure("Hello", REGULAR, 10.0));
        assert_eq!(fonts.measure("", REGULAR, 12.0), 0.0);
    }

    #[test]
    fn builtin_resolver_is_ascii_only() {
        let fonts = FontResolver::builtin();
        assert!(!fonts.is_unicode());
        assert!(fonts.can_encode('a', REGULAR));
        assert!(!fonts.can_encode('é', REGULAR));
        assert!(!fonts.can_encode('ම', SINHALA));
        assert_eq!(fonts.sanitize("café ම", REGULAR), "caf? ?");
    }

    #[test]
    fn sanitize_normalises_control_characters() {
        let fonts = FontResolver::builtin();
        assert_eq!(fonts.sanitize("a\r\nb\tc", REGULAR), "a  b c");
        assert_eq!(fonts.sanitize("bell\u{7}\u{0}!", REGULAR), "bell!");
    }

    #[test]
    fn missing_sources_fall_back_per_slot() {
        let fonts = FontResolver::from_sources(FontSources::default(), true).unwrap();
        assert!(!fonts.is_unicode());
        assert!(matches!(
            fonts.face(BOLD),
            FontFace::Builtin(BuiltinFont::HelveticaBold)
        ));
        assert!(matches!(
            fonts.face(SINHALA),
            FontFace::Builtin(BuiltinFont::Helvetica)
        ));
    }

    #[test]
    fn missing_sources_fail_without_fallback() {
        let err = FontResolver::from_sources(FontSources::default(), false).unwrap_err();
        assert!(matches!(err, ReportGenerationError::FontResourceMissing(_)));
    }

    #[test]
    fn non_truetype_data_is_rejected() {
        let source = FontSource {
            name: "Broken Font".to_string(),
            data: b"OTTO not really a font".to_vec(),
        };
        assert!(EmbeddedFont::from_source(source).is_err());
        assert_eq!(pdf_font_name("Noto Sans (Bold)"), "Noto-Sans-Bold");
        assert_eq!(pdf_font_name("***"), "EmbeddedFont");
    }

    #[test]
    fn missing_directory_degrades_to_builtin() {
        let config = FontConfig {
            dir: std::path::PathBuf::from("/nonexistent/dopaminelite/fonts"),
            ..FontConfig::default()
        };
        let fonts = FontResolver::load(&config).unwrap();
        assert!(!fonts.is_unicode());
        assert_eq!(fonts.encode("Hi?", REGULAR), b"Hi?".to_vec());
        assert_eq!(fonts.encode("Hé", REGULAR), b"H?".to_vec());
    }

    #[test]
    fn system_truetype_font_is_unicode_capable() {
        let path = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        let Ok(data) = std::fs::read(path) else {
            return;
        };
        let source = || {
            Some(FontSource {
                name: "DejaVu Sans".to_string(),
                data: data.clone(),
            })
        };
        let sources = FontSources {
            primary_regular: source(),
            primary_bold: source(),
            secondary_regular: source(),
            secondary_bold: source(),
        };
        let fonts = FontResolver::from_sources(sources, false).unwrap();
        assert!(fonts.is_unicode());
        assert!(fonts.can_encode('é', REGULAR));
        assert_eq!(fonts.sanitize("café", REGULAR), "café");
        assert_eq!(fonts.encode("A", REGULAR), vec![0x00, 0x41]);
        assert!(fonts.measure("Hello", REGULAR, 12.0) > 0.0);
    }
}
