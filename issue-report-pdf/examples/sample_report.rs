//! Sample issue report
//!
//! Renders a short mixed Latin/Sinhala transcript to `sample_issue_report.pdf`.
//! Pass a font directory as the first argument to embed Noto fonts; without one the
//! built-in Helvetica fallback is used and Sinhala text is replaced.

use chrono::{Duration, TimeZone, Utc};
use issue_report_pdf::{
    generate_report, ChatMessage, FontResolver, IssueStatus, ReportOptions, ReportRequest,
    SenderRole,
};
use std::collections::HashMap;
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Creating sample issue report...");

    let mut options = ReportOptions::default();
    options.utc_offset_minutes = 330;
    if let Some(dir) = std::env::args().nth(1) {
        options.fonts.dir = dir.into();
    }
    let fonts = FontResolver::load(&options.fonts)?;
    println!("Unicode fonts: {}", fonts.is_unicode());

    let student = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let mut directory = HashMap::new();
    directory.insert(student, "Kasun Silva".to_string());
    directory.insert(admin, "Support Team".to_string());

    let start = Utc.with_ymd_and_hms(2025, 6, 10, 4, 30, 0).unwrap();
    let lines = [
        (student, SenderRole::Student, "ආයුබෝවන්! The physics paper I bought is not showing in my library."),
        (admin, SenderRole::Admin, "Thanks, could you send the payment reference number?"),
        (student, SenderRole::Student, "It is PAY-2025-06-10-4471. ස්තූතියි"),
        (admin, SenderRole::MainAdmin, "Found it. The purchase was linked to an old account, it is moved now."),
    ];
    let messages = lines
        .iter()
        .enumerate()
        .map(|(i, (sender, role, content))| ChatMessage {
            id: Uuid::new_v4(),
            sender_id: *sender,
            sender_role: *role,
            content: content.to_string(),
            created_at: start + Duration::hours(10 * i as i64),
        })
        .collect();

    let request = ReportRequest {
        issue_id: Uuid::new_v4(),
        issue_number: 1024,
        title: "Purchased paper missing / මිලදී ගත් ප්‍රශ්න පත්‍රය".to_string(),
        description: "Paper does not appear in the library after payment".to_string(),
        status: IssueStatus::Solved,
        assigned_admin_id: Some(admin),
        created_at: start,
        solved_at: Some(start + Duration::hours(31)),
        messages,
        directory,
    };

    let bytes = generate_report(&request, &fonts, &options)?;
    std::fs::write("sample_issue_report.pdf", &bytes)?;
    println!("Wrote sample_issue_report.pdf ({} bytes)", bytes.len());
    Ok(())
}
