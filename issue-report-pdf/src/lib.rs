//! Issue Report PDF Renderer
//!
//! Renders a solved support issue and its chat transcript as a paginated A4 PDF.
//! Latin and Sinhala text are measured and embedded with separate font families;
//! when the Unicode fonts are unavailable the built-in Helvetica pair is used instead.

pub mod config;
pub mod document;
pub mod error;
pub mod fonts;
pub mod model;
pub mod page_flow;
pub mod report_generator;
pub mod runs;
pub mod script;
pub mod typography;

// Re-export commonly used functions and types
pub use config::{FontConfig, ReportOptions};
pub use error::{ReportGenerationError, ReportResult};
pub use fonts::FontResolver;
pub use model::{ChatMessage, IssueStatus, ReportRequest, SenderRole};
pub use page_flow::PageLayout;
pub use report_generator::{compose_report, generate_report};
