//! Prompt construction for the text-generation calls of a run.
//!
//! Every call shares [`SYSTEM_PROMPT`]. User prompts carry the engagement
//! facts, the analyst's qualitative context, and only the slice of the
//! parsed model relevant to the section being written.

use vantage_core::report::ValuationApproach;

use crate::collaborators::ParsedModel;

pub const SYSTEM_PROMPT: &str = "You are an experienced business valuation analyst drafting \
sections of a formal valuation report. Write in a neutral, professional register suitable for \
an appraisal document. Use only the facts provided or well-established public information. \
Do not invent financial figures. Where information is missing, say so plainly instead of \
guessing. Return plain prose paragraphs without headings.";

/// Engagement facts shared by every prompt of one run.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub company_name: &'a str,
    pub report_type: &'a str,
    pub valuation_date: chrono::NaiveDate,
    pub qualitative_context: Option<&'a str>,
    pub model: &'a ParsedModel,
}

impl PromptContext<'_> {
    fn header(&self) -> String {
        let mut out = format!(
            "Company: {}\nReport type: {}\nValuation date: {}\n",
            self.company_name,
            self.report_type,
            self.valuation_date.format("%Y-%m-%d"),
        );
        if let Some(context) = self.qualitative_context.map(str::trim).filter(|c| !c.is_empty()) {
            out.push_str("\nAnalyst notes:\n");
            out.push_str(context);
            out.push('\n');
        }
        out
    }

    /// Pretty-printed `structuredData[key]`, if the model has it.
    fn model_slice(&self, key: &str) -> Option<String> {
        self.model
            .structured_data
            .get(key)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::to_string_pretty(v).ok())
    }

    fn with_data(&self, mut prompt: String, key: &str) -> String {
        if let Some(data) = self.model_slice(key) {
            prompt.push_str("\nFinancial model data:\n```json\n");
            prompt.push_str(&data);
            prompt.push_str("\n```\n");
        }
        prompt
    }
}

pub fn company_research(ctx: &PromptContext<'_>) -> String {
    let prompt = format!(
        "{}\nWrite the Company Overview section: history, ownership, products and services, \
         customers, and competitive position as of the valuation date.\n",
        ctx.header()
    );
    ctx.with_data(prompt, "company")
}

pub fn industry_research(ctx: &PromptContext<'_>) -> String {
    let prompt = format!(
        "{}\nWrite the Industry Outlook section: the industry the company operates in, its \
         size and growth, key drivers and risks, and the outlook as of the valuation date.\n",
        ctx.header()
    );
    ctx.with_data(prompt, "industry")
}

pub fn approach_narrative(ctx: &PromptContext<'_>, approach: ValuationApproach) -> String {
    let guidance = match approach {
        ValuationApproach::Income => {
            "Explain the discounted cash flow analysis: projection period, discount rate \
             build-up, terminal value, and the resulting indication of value."
        }
        ValuationApproach::Market => {
            "Explain the guideline public company and transaction analysis: selection of \
             comparables, multiples applied, adjustments, and the resulting indication of value."
        }
        ValuationApproach::Asset => {
            "Explain the adjusted net asset analysis: significant asset and liability \
             adjustments, and the resulting indication of value."
        }
    };
    let prompt = format!(
        "{}\nWrite the {} section of the report. {guidance} Use the figures from the model \
         data below; do not introduce other figures.\n",
        ctx.header(),
        approach.title(),
    );
    ctx.with_data(prompt, approach.as_str())
}
