//! Issue report composition
//!
//! Lays out the fixed report structure (title, metadata, day-grouped conversation)
//! through the page flow, then hands the pages to the document assembler.

use crate::config::ReportOptions;
use crate::document::ReportDocument;
use crate::error::{ReportGenerationError, ReportResult};
use crate::fonts::{FontResolver, FontWeight};
use crate::model::{ChatMessage, ReportRequest};
use crate::page_flow::{Align, PageFlow, PageLayout, Placement};
use crate::runs::sanitize_paragraph;
use crate::script::contains_secondary;
use crate::typography::{wrap, LayoutLine, MixedMeasure};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::HashMap;

const READABLE_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S";
const MESSAGE_TIME_FORMAT: &str = "%H:%M";
const DATE_HEADER_FORMAT: &str = "%d %B %Y";

const NOT_ASSIGNED: &str = "Not Assigned";
const UNKNOWN_USER: &str = "Unknown User";
const NOT_AVAILABLE: &str = "N/A";

/// Paragraph style: weight and size of every line in a block.
#[derive(Debug, Clone, Copy)]
struct TextStyle {
    weight: FontWeight,
    size: f32,
}

/// A block that has been sanitised and wrapped but not yet placed.
struct WrappedBlock {
    style: TextStyle,
    lines: Vec<LayoutLine>,
}

/// Drives the page flow for one report. One instance per render.
pub struct ReportComposer<'a> {
    fonts: &'a FontResolver,
    options: &'a ReportOptions,
    timezone: FixedOffset,
    flow: PageFlow<'a>,
}

impl<'a> ReportComposer<'a> {
    pub fn new(fonts: &'a FontResolver, options: &'a ReportOptions) -> ReportResult<Self> {
        options.validate()?;
        let timezone = options.render_timezone().ok_or_else(|| {
            ReportGenerationError::InvalidOptions("render timezone out of range".to_string())
        })?;
        Ok(Self {
            fonts,
            options,
            timezone,
            flow: PageFlow::new(fonts, options),
        })
    }

    /// Lay out the whole report and return its pages.
    pub fn compose(mut self, request: &ReportRequest) -> ReportResult<Vec<PageLayout>> {
        if !self.fonts.is_unicode() && request_has_secondary_text(request) {
            log::warn!(
                "Issue {} contains Sinhala text but Unicode fonts are unavailable; it will be replaced",
                request.issue_id
            );
        }

        let bold = self.style(FontWeight::Bold, self.options.title_font_size);
        let details = self.style(FontWeight::Regular, self.options.details_font_size);
        let full_width = self.full_width(Align::Left);

        self.add_block(
            &format!("Issue Report - Issue No. : {}", request.issue_number),
            bold,
            full_width,
        )?;

        for line in self.metadata_lines(request) {
            self.add_block(&line, details, full_width)?;
        }

        let label = self.style(FontWeight::Bold, self.options.details_font_size);
        self.add_block("Conversation:", label, full_width)?;

        self.add_conversation(request)?;

        let mut flow = self.flow;
        flow.finish()
    }

    fn metadata_lines(&self, request: &ReportRequest) -> Vec<String> {
        vec![
            format!("Issue ID: {}", request.issue_id),
            format!("Title: {}", request.title),
            format!("Description: {}", request.description),
            format!("Status: {}", request.status),
            format!("Assigned Admin: {}", assigned_admin_name(request)),
            format!("Created At: {}", self.readable(request.created_at)),
            format!(
                "Solved At: {}",
                request
                    .solved_at
                    .map(|at| self.readable(at))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            ),
        ]
    }

    fn add_conversation(&mut self, request: &ReportRequest) -> ReportResult<()> {
        let date_style = self.style(FontWeight::Regular, self.options.date_header_font_size);
        let centred = self.full_width(Align::Center);

        for (date, messages) in group_by_date(&request.messages, &self.timezone) {
            self.add_block(
                &date.format(DATE_HEADER_FORMAT).to_string(),
                date_style,
                centred,
            )?;
            for message in messages {
                self.add_message(request, message)?;
            }
        }
        Ok(())
    }

    /// Meta line and body are placed as one unit so they stay on the same page.
    fn add_message(&mut self, request: &ReportRequest, message: &ChatMessage) -> ReportResult<()> {
        let meta_style = self.style(FontWeight::Regular, self.options.message_meta_font_size);
        let body_style = self.style(FontWeight::Regular, self.options.message_body_font_size);

        let bubble_width = self.options.bubble_width();
        let (align, left) = if message.sender_role.is_admin_side() {
            (
                Align::Right,
                self.options.margin + self.options.content_width() - bubble_width,
            )
        } else {
            (Align::Left, self.options.margin)
        };
        let bubble = Placement {
            align,
            left,
            width: bubble_width,
        };

        let meta = format!(
            "{} | {} | [{}]",
            request.display_name(&message.sender_id).unwrap_or(UNKNOWN_USER),
            message
                .created_at
                .with_timezone(&self.timezone)
                .format(MESSAGE_TIME_FORMAT),
            message.sender_role.label()
        );
        let blocks = [
            self.wrap_block(&meta, meta_style, bubble.width),
            self.wrap_block(&message.content, body_style, bubble.width),
        ];

        let height: f32 = blocks.iter().map(|b| self.block_height(b)).sum();
        self.flow.place(height)?;
        for block in &blocks {
            self.place_block(block, bubble)?;
        }
        Ok(())
    }

    fn add_block(&mut self, text: &str, style: TextStyle, placement: Placement) -> ReportResult<()> {
        let block = self.wrap_block(text, style, placement.width);
        let height = self.block_height(&block);
        self.flow.place(height)?;
        self.place_block(&block, placement)
    }

    fn wrap_block(&self, text: &str, style: TextStyle, max_width: f32) -> WrappedBlock {
        let clean = sanitize_paragraph(self.fonts, text, style.weight);
        let measure = MixedMeasure {
            fonts: self.fonts,
            weight: style.weight,
            size: style.size,
        };
        WrappedBlock {
            style,
            lines: wrap(&clean, &measure, max_width),
        }
    }

    fn block_height(&self, block: &WrappedBlock) -> f32 {
        block.lines.len() as f32 * self.options.line_height(block.style.size) + self.options.block_spacing
    }

    fn place_block(&mut self, block: &WrappedBlock, placement: Placement) -> ReportResult<()> {
        for line in &block.lines {
            self.flow
                .place_line(line, block.style.weight, block.style.size, placement)?;
        }
        self.flow.advance(self.options.block_spacing)
    }

    fn style(&self, weight: FontWeight, size: f32) -> TextStyle {
        TextStyle { weight, size }
    }

    fn full_width(&self, align: Align) -> Placement {
        Placement {
            align,
            left: self.options.margin,
            width: self.options.content_width(),
        }
    }

    fn readable(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.timezone)
            .format(READABLE_DATE_FORMAT)
            .to_string()
    }
}

/// Display name of the assigned admin, the raw id when the directory has no name.
fn assigned_admin_name(request: &ReportRequest) -> String {
    match request.assigned_admin_id {
        None => NOT_ASSIGNED.to_string(),
        Some(id) => request
            .display_name(&id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string()),
    }
}

/// Group messages by local calendar date in first-seen order. Groups are not sorted.
fn group_by_date<'m>(
    messages: &'m [ChatMessage],
    timezone: &FixedOffset,
) -> Vec<(NaiveDate, Vec<&'m ChatMessage>)> {
    let mut groups: Vec<(NaiveDate, Vec<&ChatMessage>)> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for message in messages {
        let date = message.created_at.with_timezone(timezone).date_naive();
        let slot = *index.entry(date).or_insert_with(|| {
            groups.push((date, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(message);
    }
    groups
}

fn request_has_secondary_text(request: &ReportRequest) -> bool {
    contains_secondary(&request.title)
        || contains_secondary(&request.description)
        || request.messages.iter().any(|m| contains_secondary(&m.content))
        || request.directory.values().any(|name| contains_secondary(name))
}

/// Lay out a report without encoding it.
pub fn compose_report(
    request: &ReportRequest,
    fonts: &FontResolver,
    options: &ReportOptions,
) -> ReportResult<Vec<PageLayout>> {
    ReportComposer::new(fonts, options)?.compose(request)
}

/// Render a complete issue report to PDF bytes.
pub fn generate_report(
    request: &ReportRequest,
    fonts: &FontResolver,
    options: &ReportOptions,
) -> ReportResult<Vec<u8>> {
    log::debug!(
        "Generating report for issue {} with {} messages",
        request.issue_id,
        request.messages.len()
    );
    let pages = compose_report(request, fonts, options)?;
    let bytes = ReportDocument::new(fonts, options).assemble(&pages)?;
    log::debug!(
        "Report for issue {} rendered: {} pages, {} bytes",
        request.issue_id,
        pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueStatus, SenderRole};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn message(sender: Uuid, role: SenderRole, at: DateTime<Utc>, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            sender_id: sender,
            sender_role: role,
            content: content.to_string(),
            created_at: at,
        }
    }

    fn request(messages: Vec<ChatMessage>) -> ReportRequest {
        ReportRequest {
            issue_id: Uuid::new_v4(),
            issue_number: 7,
            title: "Login loop".to_string(),
            description: "Keeps redirecting".to_string(),
            status: IssueStatus::Solved,
            assigned_admin_id: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap(),
            solved_at: None,
            messages,
            directory: HashMap::new(),
        }
    }

    #[test]
    fn grouping_keeps_first_seen_order() {
        let user = Uuid::new_v4();
        let day = |d: u32| Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap();
        let messages = vec![
            message(user, SenderRole::Student, day(7), "a"),
            message(user, SenderRole::Student, day(5), "b"),
            message(user, SenderRole::Student, day(7), "c"),
        ];
        let utc = FixedOffset::east_opt(0).unwrap();
        let groups = group_by_date(&messages, &utc);
        let dates: Vec<u32> = groups.iter().map(|(d, _)| chrono::Datelike::day(d)).collect();
        assert_eq!(dates, vec![7, 5]);
        let contents: Vec<&str> = groups[0].1.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "c"]);
    }

    #[test]
    fn grouping_uses_render_timezone() {
        let user = Uuid::new_v4();
        // 20:00 UTC on the 5th is already the 6th at UTC+05:30.
        let late = Utc.with_ymd_and_hms(2025, 1, 5, 20, 0, 0).unwrap();
        let messages = vec![message(user, SenderRole::Student, late, "x")];
        let colombo = FixedOffset::east_opt(330 * 60).unwrap();
        let groups = group_by_date(&messages, &colombo);
        assert_eq!(groups[0].0, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    }

    #[test]
    fn assigned_admin_resolution() {
        let mut req = request(Vec::new());
        assert_eq!(assigned_admin_name(&req), "Not Assigned");

        let admin = Uuid::new_v4();
        req.assigned_admin_id = Some(admin);
        assert_eq!(assigned_admin_name(&req), admin.to_string());

        req.directory.insert(admin, "Nimal Perera".to_string());
        assert_eq!(assigned_admin_name(&req), "Nimal Perera");
    }

    #[test]
    fn metadata_formats_timestamps() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions::default();
        let composer = ReportComposer::new(&fonts, &options).unwrap();
        let mut req = request(Vec::new());
        req.solved_at = Some(Utc.with_ymd_and_hms(2025, 2, 3, 14, 5, 9).unwrap());
        let lines = composer.metadata_lines(&req);
        assert_eq!(lines[3], "Status: SOLVED");
        assert_eq!(lines[5], "Created At: 05 Jan 2025 09:00:00");
        assert_eq!(lines[6], "Solved At: 03 Feb 2025 14:05:09");

        req.solved_at = None;
        assert_eq!(composer.metadata_lines(&req)[6], "Solved At: N/A");
    }

    #[test]
    fn invalid_options_are_rejected_before_layout() {
        let fonts = FontResolver::builtin();
        let options = ReportOptions {
            bubble_width_ratio: 0.0,
            ..ReportOptions::default()
        };
        assert!(matches!(
            compose_report(&request(Vec::new()), &fonts, &options),
            Err(ReportGenerationError::InvalidOptions(_))
        ));
    }
}
