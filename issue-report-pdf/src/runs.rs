//! Mixed-script run splitting
//!
//! A paragraph is cut into maximal runs of one script class so each run can be shown
//! with a font that covers it. Character order is preserved and nothing is dropped.

use crate::fonts::{FontHandle, FontResolver, FontWeight};
use crate::script::{classify, ScriptClass};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRun {
    pub text: String,
    pub script: ScriptClass,
    pub font: FontHandle,
}

/// Split `paragraph` into single-script runs in one pass.
pub fn split_runs(paragraph: &str, weight: FontWeight) -> Vec<ScriptRun> {
    let mut runs = Vec::new();
    let mut chars = paragraph.chars();
    let Some(first) = chars.next() else {
        return runs;
    };

    let mut current = classify(first);
    let mut buffer = String::new();
    buffer.push(first);

    for ch in chars {
        let class = classify(ch);
        if class != current {
            runs.push(ScriptRun {
                text: std::mem::take(&mut buffer),
                script: current,
                font: FontHandle::new(current, weight),
            });
            current = class;
        }
        buffer.push(ch);
    }

    runs.push(ScriptRun {
        text: buffer,
        script: current,
        font: FontHandle::new(current, weight),
    });
    runs
}

/// Sanitise each run with its own font and join the result back into one string.
pub fn sanitize_paragraph(fonts: &FontResolver, paragraph: &str, weight: FontWeight) -> String {
    split_runs(paragraph, weight)
        .iter()
        .map(|run| fonts.sanitize(&run.text, run.font))
        .collect()
}

/// Width of a mixed-script string, each run measured with its own font.
pub fn measure_mixed(fonts: &FontResolver, text: &str, weight: FontWeight, size: f32) -> f32 {
    split_runs(text, weight)
        .iter()
        .map(|run| fonts.measure(&run.text, run.font, size))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(runs: &[ScriptRun]) -> Vec<&str> {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn empty_paragraph_has_no_runs() {
        assert!(split_runs("", FontWeight::Regular).is_empty());
    }

    #[test]
    fn splits_on_every_script_change() {
        let runs = split_runs("Title: මගේ ගැටළුව!", FontWeight::Regular);
        assert_eq!(texts(&runs), vec!["Title: ", "මගේ", " ", "ගැටළුව", "!"]);
        assert_eq!(runs[0].script, ScriptClass::Primary);
        assert_eq!(runs[1].script, ScriptClass::Secondary);
        assert_eq!(runs[1].font.script, ScriptClass::Secondary);
        assert_eq!(runs[1].font.weight, FontWeight::Regular);
    }

    #[test]
    fn first_character_seeds_the_class() {
        let runs = split_runs("ම a", FontWeight::Bold);
        assert_eq!(texts(&runs), vec!["ම", " a"]);
        assert_eq!(runs[0].font.weight, FontWeight::Bold);
    }

    #[test]
    fn single_script_is_one_run() {
        let runs = split_runs("plain latin text", FontWeight::Regular);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "plain latin text");
    }

    #[test]
    fn builtin_sanitizing_replaces_secondary_script() {
        let fonts = FontResolver::builtin();
        assert_eq!(
            sanitize_paragraph(&fonts, "Hi මගේ\n", FontWeight::Regular),
            "Hi ??? "
        );
        let width = measure_mixed(&fonts, "ab", FontWeight::Regular, 10.0);
        assert!((width - 11.12).abs() < 1e-3);
    }
}
