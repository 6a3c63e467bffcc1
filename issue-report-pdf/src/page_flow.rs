//! Vertical placement and page breaking
//!
//! `PageFlow` owns the cursor of the page being filled. All placement goes through
//! [`PageFlow::place`] so a page is always footed before the next one is opened.
//! Coordinates are PDF points with the origin at the bottom-left corner.

use crate::config::ReportOptions;
use crate::error::{ReportGenerationError, ReportResult};
use crate::fonts::{FontResolver, FontWeight};
use crate::runs::{measure_mixed, sanitize_paragraph, split_runs, ScriptRun};
use crate::typography::LayoutLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Footer,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Horizontal box a line is aligned within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub align: Align,
    pub left: f32,
    pub width: f32,
}

impl Placement {
    pub fn x_for(&self, line_width: f32) -> f32 {
        match self.align {
            Align::Left => self.left,
            Align::Center => self.left + (self.width - line_width) / 2.0,
            Align::Right => self.left + self.width - line_width,
        }
    }
}

/// A line fixed on a page, ready to be encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub kind: LineKind,
    pub x: f32,
    pub baseline: f32,
    pub size: f32,
    pub weight: FontWeight,
    pub width: f32,
    pub runs: Vec<ScriptRun>,
}

impl PlacedLine {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub number: u32,
    pub lines: Vec<PlacedLine>,
}

impl PageLayout {
    pub fn header(&self) -> Option<&PlacedLine> {
        self.lines.iter().find(|l| l.kind == LineKind::Header)
    }

    pub fn footer(&self) -> Option<&PlacedLine> {
        self.lines.iter().find(|l| l.kind == LineKind::Footer)
    }

    pub fn body_lines(&self) -> impl Iterator<Item = &PlacedLine> {
        self.lines.iter().filter(|l| l.kind == LineKind::Body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub page_number: u32,
    /// Top of the next line.
    pub y: f32,
    pub page_width: f32,
    pub page_height: f32,
}

enum FlowState {
    Open { cursor: PageCursor, page: PageLayout },
    Closed,
}

pub struct PageFlow<'a> {
    fonts: &'a FontResolver,
    options: &'a ReportOptions,
    state: FlowState,
    pages: Vec<PageLayout>,
}

impl<'a> PageFlow<'a> {
    /// Start a document with page 1 open and its header drawn.
    pub fn new(fonts: &'a FontResolver, options: &'a ReportOptions) -> Self {
        let mut flow = Self {
            fonts,
            options,
            state: FlowState::Closed,
            pages: Vec::new(),
        };
        flow.state = flow.open_page(1);
        flow
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        match &self.state {
            FlowState::Open { cursor, .. } => Some(*cursor),
            FlowState::Closed => None,
        }
    }

    /// Y of the first content line on every page, below the header.
    pub fn top_content_offset(&self) -> f32 {
        self.options.page_height
            - self.options.margin
            - self.options.line_height(self.options.header_footer_font_size)
            - self.options.block_spacing
    }

    pub fn bottom_margin(&self) -> f32 {
        self.options.margin
    }

    /// Make room for a block of `block_height`, breaking the page if it does not fit.
    ///
    /// A page that holds no content yet is never broken.
    pub fn place(&mut self, block_height: f32) -> ReportResult<()> {
        let top = self.top_content_offset();
        let bottom = self.bottom_margin();
        let needs_break = match &self.state {
            FlowState::Open { cursor, .. } => cursor.y - block_height < bottom && cursor.y < top,
            FlowState::Closed => return Err(ReportGenerationError::InvalidState("place after finish")),
        };
        if needs_break {
            self.break_page()?;
        }
        Ok(())
    }

    /// Draw one sanitised line and move the cursor down by its line height.
    pub fn place_line(
        &mut self,
        line: &LayoutLine,
        weight: FontWeight,
        size: f32,
        placement: Placement,
    ) -> ReportResult<()> {
        let line_height = self.options.line_height(size);
        self.place(line_height)?;

        let FlowState::Open { cursor, page } = &mut self.state else {
            return Err(ReportGenerationError::InvalidState("place_line after finish"));
        };
        page.lines.push(PlacedLine {
            kind: LineKind::Body,
            x: placement.x_for(line.width),
            baseline: cursor.y - size,
            size,
            weight,
            width: line.width,
            runs: split_runs(&line.text, weight),
        });
        cursor.y -= line_height;
        Ok(())
    }

    /// Vertical gap between blocks. Never breaks a page by itself.
    pub fn advance(&mut self, gap: f32) -> ReportResult<()> {
        match &mut self.state {
            FlowState::Open { cursor, .. } => {
                cursor.y -= gap;
                Ok(())
            }
            FlowState::Closed => Err(ReportGenerationError::InvalidState("advance after finish")),
        }
    }

    /// Foot the last page and hand back every page in order.
    pub fn finish(&mut self) -> ReportResult<Vec<PageLayout>> {
        match std::mem::replace(&mut self.state, FlowState::Closed) {
            FlowState::Open { mut page, .. } => {
                self.stamp_footer(&mut page);
                self.pages.push(page);
                log::debug!("Page flow finished with {} pages", self.pages.len());
                Ok(std::mem::take(&mut self.pages))
            }
            FlowState::Closed => Err(ReportGenerationError::InvalidState("finish called twice")),
        }
    }

    fn break_page(&mut self) -> ReportResult<()> {
        let FlowState::Open { cursor, mut page } = std::mem::replace(&mut self.state, FlowState::Closed)
        else {
            return Err(ReportGenerationError::InvalidState("page break after finish"));
        };
        self.stamp_footer(&mut page);
        self.pages.push(page);
        self.state = self.open_page(cursor.page_number + 1);
        Ok(())
    }

    fn open_page(&self, number: u32) -> FlowState {
        let options = self.options;
        let header_top = options.page_height - options.margin;
        let header = self.fixed_line(
            LineKind::Header,
            &options.header_text,
            FontWeight::Bold,
            header_top - options.header_footer_font_size,
        );
        FlowState::Open {
            cursor: PageCursor {
                page_number: number,
                y: self.top_content_offset(),
                page_width: options.page_width,
                page_height: options.page_height,
            },
            page: PageLayout {
                number,
                lines: vec![header],
            },
        }
    }

    fn stamp_footer(&self, page: &mut PageLayout) {
        let text = format!("Page {}", page.number);
        let footer = self.fixed_line(
            LineKind::Footer,
            &text,
            FontWeight::Regular,
            self.options.margin / 2.0,
        );
        page.lines.push(footer);
    }

    /// Header or footer line centred on the full page width.
    fn fixed_line(&self, kind: LineKind, text: &str, weight: FontWeight, baseline: f32) -> PlacedLine {
        let size = self.options.header_footer_font_size;
        let text = sanitize_paragraph(self.fonts, text, weight);
        let width = measure_mixed(self.fonts, &text, weight, size);
        PlacedLine {
            kind,
            x: (self.options.page_width - width) / 2.0,
            baseline,
            size,
            weight,
            width,
            runs: split_runs(&text, weight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> LayoutLine {
        LayoutLine {
            text: text.to_string(),
            width: 40.0,
        }
    }

    fn left(options: &ReportOptions) -> Placement {
        Placement {
            align: Align::Left,
            left: options.margin,
            width: options.content_width(),
        }
    }

    #[test]
    fn first_page_opens_with_header_below_top_margin() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions::default();
        let flow = PageFlow::new(&fonts, &options);
        let cursor = flow.cursor().unwrap();
        assert_eq!(cursor.page_number, 1);
        assert_eq!(cursor.y, flow.top_content_offset());
        assert!(cursor.y < options.page_height - options.margin);
    }

    #[test]
    fn lines_move_cursor_by_leading() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions::default();
        let mut flow = PageFlow::new(&fonts, &options);
        let start = flow.cursor().unwrap().y;
        flow.place_line(&line("hello"), FontWeight::Regular, 12.0, left(&options))
            .unwrap();
        let after = flow.cursor().unwrap().y;
        assert!((start - after - 12.0 * options.line_spacing).abs() < 1e-4);
    }

    #[test]
    fn overflow_breaks_page_and_stamps_footers() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions::default();
        let mut flow = PageFlow::new(&fonts, &options);
        for i in 0..120 {
            flow.place_line(&line(&format!("line {}", i)), FontWeight::Regular, 12.0, left(&options))
                .unwrap();
        }
        let pages = flow.finish().unwrap();
        assert!(pages.len() >= 2);
        for (index, page) in pages.iter().enumerate() {
            assert_eq!(page.number as usize, index + 1);
            assert_eq!(page.header().unwrap().text(), "DopamineLite");
            assert_eq!(page.footer().unwrap().text(), format!("Page {}", index + 1));
            assert!(page
                .body_lines()
                .all(|l| l.baseline >= options.margin - 1e-3));
        }
        let total: usize = pages.iter().map(|p| p.body_lines().count()).sum();
        assert_eq!(total, 120);
    }

    #[test]
    fn atomic_block_moves_to_next_page() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions::default();
        let mut flow = PageFlow::new(&fonts, &options);
        let leading = options.line_height(12.0);
        let bottom = flow.bottom_margin();
        // Leave room for one line only.
        while flow.cursor().unwrap().y - 2.0 * leading >= bottom {
            flow.place_line(&line("filler"), FontWeight::Regular, 12.0, left(&options))
                .unwrap();
        }
        flow.place(2.0 * leading).unwrap();
        let cursor = flow.cursor().unwrap();
        assert_eq!(cursor.page_number, 2);
        assert_eq!(cursor.y, flow.top_content_offset());
    }

    #[test]
    fn oversized_block_on_fresh_page_stays() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions::default();
        let mut flow = PageFlow::new(&fonts, &options);
        flow.place(options.page_height * 2.0).unwrap();
        assert_eq!(flow.cursor().unwrap().page_number, 1);
    }

    #[test]
    fn placement_after_finish_is_invalid() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions::default();
        let mut flow = PageFlow::new(&fonts, &options);
        let pages = flow.finish().unwrap();
        assert_eq!(pages.len(), 1);
        assert!(flow.cursor().is_none());
        assert!(matches!(
            flow.place(10.0),
            Err(ReportGenerationError::InvalidState(_))
        ));
        assert!(matches!(
            flow.place_line(&line("late"), FontWeight::Regular, 12.0, left(&options)),
            Err(ReportGenerationError::InvalidState(_))
        ));
        assert!(flow.advance(4.0).is_err());
        assert!(flow.finish().is_err());
    }

    #[test]
    fn placement_aligns_within_box() {
        let placement = Placement {
            align: Align::Right,
            left: 50.0,
            width: 400.0,
        };
        assert_eq!(placement.x_for(100.0), 350.0);
        let centred = Placement {
            align: Align::Center,
            ..placement
        };
        assert_eq!(centred.x_for(100.0), 200.0);
    }
}
