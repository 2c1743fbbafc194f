//! Renders report content as a Markdown draft.
//!
//! Flags are shown twice: inline under the section they belong to, and
//! collected in a closing "Review items" list so a reviewer can work
//! through them in one place.

use std::fmt::Write;

use async_trait::async_trait;
use vantage_core::report::{Flag, FlagType, ReportContent};

use super::DocumentAssembler;
use crate::error::CollaboratorError;

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownAssembler;

fn flag_label(flag_type: FlagType) -> &'static str {
    match flag_type {
        FlagType::Error => "ERROR",
        FlagType::Missing => "MISSING",
        FlagType::Review => "REVIEW",
    }
}

fn write_flag(out: &mut String, flag: &Flag) {
    let _ = writeln!(out, "> **{}:** {}", flag_label(flag.flag_type), flag.message);
}

pub fn render(content: &ReportContent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} - {}", content.company_name, content.report_type);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Valuation date: {}  ",
        content.valuation_date.format("%B %-d, %Y")
    );
    let _ = writeln!(out, "Status: DRAFT");

    for section in &content.sections {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", section.title);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", section.body.trim_end());
        let mut flags = content.flags_for(&section.key).peekable();
        if flags.peek().is_some() {
            let _ = writeln!(out);
            for flag in flags {
                write_flag(&mut out, flag);
            }
        }
    }

    // Flags on keys without a section (e.g. model findings) only appear here.
    if !content.flags.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Review items");
        let _ = writeln!(out);
        for flag in &content.flags {
            let _ = writeln!(
                out,
                "- [{}] {}: {}",
                flag_label(flag.flag_type),
                flag.section,
                flag.message
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "---");
    let _ = writeln!(
        out,
        "Generated in {:.1}s",
        content.duration.as_secs_f64()
    );
    out
}

#[async_trait]
impl DocumentAssembler for MarkdownAssembler {
    fn extension(&self) -> &'static str {
        "md"
    }

    async fn assemble_document(
        &self,
        content: &ReportContent,
    ) -> Result<Vec<u8>, CollaboratorError> {
        if content.sections.is_empty() {
            return Err(CollaboratorError::Failed(
                "Report has no sections to assemble".to_string(),
            ));
        }
        Ok(render(content).into_bytes())
    }
}
