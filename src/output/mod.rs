//! Output module for crawl reports
//!
//! This module handles:
//! - Accumulating crawl outcomes into a report
//! - Printing the report to stdout
//! - Writing a markdown summary file

mod markdown;
mod report;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{print_report, CrawlReport, MAX_REPORTED_ERRORS};
