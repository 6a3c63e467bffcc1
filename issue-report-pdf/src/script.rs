//! Per-character script classification used to pick a glyph-covering font.

/// Coarse script bucket. Each class maps to its own font family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScriptClass {
    /// Latin and everything without a dedicated font.
    Primary,
    /// Sinhala block.
    Secondary,
}

/// Inclusive code point ranges routed to the secondary font.
const SECONDARY_RANGES: &[(u32, u32)] = &[(0x0D80, 0x0DFF)];

/// Classify a single character.
#[inline]
pub fn classify(ch: char) -> ScriptClass {
    let cp = ch as u32;
    if SECONDARY_RANGES
        .iter()
        .any(|&(start, end)| cp >= start && cp <= end)
    {
        ScriptClass::Secondary
    } else {
        ScriptClass::Primary
    }
}

/// True if any character of `text` needs the secondary font.
pub fn contains_secondary(text: &str) -> bool {
    text.chars().any(|ch| classify(ch) == ScriptClass::Secondary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinhala_block_is_secondary() {
        assert_eq!(classify('\u{0D80}'), ScriptClass::Secondary);
        assert_eq!(classify('ම'), ScriptClass::Secondary);
        assert_eq!(classify('\u{0DFF}'), ScriptClass::Secondary);
    }

    #[test]
    fn block_edges_and_latin_are_primary() {
        assert_eq!(classify('\u{0D7F}'), ScriptClass::Primary);
        assert_eq!(classify('\u{0E00}'), ScriptClass::Primary);
        assert_eq!(classify('A'), ScriptClass::Primary);
        assert_eq!(classify(' '), ScriptClass::Primary);
        assert_eq!(classify('é'), ScriptClass::Primary);
    }

    #[test]
    fn detects_mixed_text() {
        assert!(contains_secondary("Title: මගේ ගැටළුව"));
        assert!(!contains_secondary("plain ascii"));
    }
}
