//! Parsing of the facilitator's structured generation output.
//!
//! The facilitator asks the model to answer in a line-prefixed format:
//!
//! ```text
//! CHOSEN_EXPERT: Technology Officer
//! QUESTION: The research mentions a new cloud platform. How ready is their stack?
//! REASONING: The research is mostly about infrastructure.
//! ```
//!
//! Everything here is pure: raw text in, parsed fields or a [`ParseFailure`] out. The
//! caller decides what to fall back to. Persona names are resolved against the fixed
//! panel so parsed values always name a real panelist.

use crate::roundtable::panelist::{persona, Persona, PANEL};
use std::error::Error;
use std::fmt;

const QUOTE: char = '"';

/// Why structured output could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// A required `FIELD:` line is absent or empty.
    MissingField(&'static str),
    /// A persona field names someone who is not on the panel.
    UnknownPersona(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::MissingField(field) => write!(f, "missing {} field", field),
            ParseFailure::UnknownPersona(name) => write!(f, "unknown persona '{}'", name),
        }
    }
}

impl Error for ParseFailure {}

/// Parsed `CHOSEN_EXPERT` / `QUESTION` / `REASONING` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct OpeningChoice {
    pub expert: &'static Persona,
    /// Quote-cleaned opening question.
    pub question: String,
    pub reasoning: Option<String>,
}

/// Parsed and repaired `LEAD_EXPERT` / `THEME` / `ORDER` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundPlan {
    pub lead: &'static Persona,
    /// Quote-cleaned theme.
    pub theme: String,
    /// Everyone but the lead, each exactly once.
    pub order: Vec<&'static Persona>,
}

impl RoundPlan {
    /// Plan with the remaining panelists in panel order.
    pub fn in_panel_order(lead: &'static Persona, theme: impl Into<String>) -> Self {
        Self {
            lead,
            theme: theme.into(),
            order: repair_order(lead, &[]),
        }
    }

    /// Full speaking order: lead first.
    pub fn speakers(&self) -> Vec<&'static Persona> {
        std::iter::once(self.lead)
            .chain(self.order.iter().copied())
            .collect()
    }
}

/// Strip wrapping quotes and join adjacent quoted fragments.
///
/// A fully wrapping `"` pair is removed, every `" "` collapses to a single space, and a
/// wrapping pair uncovered by that collapse is removed too. The steps repeat until the
/// text stops changing, so the function is idempotent.
pub fn clean_quotation_marks(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = strip_wrapping_quotes(&current).to_string();
        next = next.replace("\" \"", " ");
        next = strip_wrapping_quotes(&next).to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_wrapping_quotes(text: &str) -> &str {
    if text.starts_with(QUOTE) && text.ends_with(QUOTE) {
        // a lone quote is both the opening and the closing one
        if text.len() == 1 {
            return "";
        }
        return &text[1..text.len() - 1];
    }
    text
}

/// Append `?` unless the text already ends with one.
pub fn ensure_question_mark(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.ends_with('?') {
        trimmed.to_string()
    } else {
        format!("{}?", trimmed)
    }
}

/// Parse the opening-speaker answer.
pub fn parse_opening(raw: &str) -> Result<OpeningChoice, ParseFailure> {
    let expert_name =
        field(raw, "CHOSEN_EXPERT").ok_or(ParseFailure::MissingField("CHOSEN_EXPERT"))?;
    let expert = resolve_persona(&expert_name)?;
    let question = field(raw, "QUESTION")
        .map(|q| clean_quotation_marks(&q))
        .filter(|q| !q.trim().is_empty())
        .ok_or(ParseFailure::MissingField("QUESTION"))?;

    Ok(OpeningChoice {
        expert,
        question,
        reasoning: field(raw, "REASONING"),
    })
}

/// Parse the round-2 plan and repair its order so every panelist speaks exactly once.
pub fn parse_round_plan(raw: &str) -> Result<RoundPlan, ParseFailure> {
    let lead_name = field(raw, "LEAD_EXPERT").ok_or(ParseFailure::MissingField("LEAD_EXPERT"))?;
    let lead = resolve_persona(&lead_name)?;
    let theme = field(raw, "THEME")
        .map(|t| clean_quotation_marks(&t))
        .filter(|t| !t.trim().is_empty())
        .ok_or(ParseFailure::MissingField("THEME"))?;

    let proposed: Vec<String> = field(raw, "ORDER")
        .map(|order| order.split(',').map(normalize_name).collect())
        .unwrap_or_default();
    let proposed: Vec<&str> = proposed.iter().map(String::as_str).collect();

    Ok(RoundPlan {
        lead,
        theme,
        order: repair_order(lead, &proposed),
    })
}

/// Opener first, then everyone else in panel order.
pub fn round_one_order(opener: &'static Persona) -> Vec<&'static Persona> {
    std::iter::once(opener)
        .chain(PANEL.iter().filter(|p| p.name != opener.name))
        .collect()
}

/// Keep known, non-lead names in their proposed order without duplicates, then append
/// whoever is missing in panel order.
pub fn repair_order(lead: &'static Persona, proposed: &[&str]) -> Vec<&'static Persona> {
    let mut order: Vec<&'static Persona> = Vec::with_capacity(PANEL.len() - 1);
    for name in proposed {
        match persona(name) {
            Some(p) if p.name != lead.name && !order.iter().any(|o| o.name == p.name) => {
                order.push(p)
            }
            Some(_) => log::debug!("dropping repeated panelist '{}' from round order", name),
            None => log::debug!("dropping unknown panelist '{}' from round order", name),
        }
    }
    for p in PANEL.iter() {
        if p.name != lead.name && !order.iter().any(|o| o.name == p.name) {
            order.push(p);
        }
    }
    order
}

// Value of the first non-empty `NAME:` line.
fn field(raw: &str, name: &str) -> Option<String> {
    raw.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(name)?.strip_prefix(':')?;
        let value = rest.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn resolve_persona(raw_name: &str) -> Result<&'static Persona, ParseFailure> {
    let name = normalize_name(raw_name);
    persona(&name).ok_or(ParseFailure::UnknownPersona(name))
}

// Tolerates "[Technology Officer]", "**Technology Officer**" and a trailing period.
fn normalize_name(raw: &str) -> String {
    clean_quotation_marks(raw.trim())
        .trim_matches(|c: char| c == '[' || c == ']' || c == '*' || c == '.' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn names(order: &[&'static Persona]) -> Vec<&'static str> {
        order.iter().map(|p| p.name).collect()
    }

    #[test]
    fn quote_cleaning_examples() {
        assert_eq!(clean_quotation_marks("\"hello\""), "hello");
        assert_eq!(clean_quotation_marks("\"a\" \"b\""), "a b");
        assert_eq!(clean_quotation_marks("no quotes here"), "no quotes here");
        assert_eq!(clean_quotation_marks("\""), "");
        assert_eq!(clean_quotation_marks(""), "");
        assert_eq!(
            clean_quotation_marks("He said \"fine\" today"),
            "He said \"fine\" today"
        );
    }

    #[test]
    fn quote_cleaning_is_idempotent() {
        let inputs = [
            "\"hello\"",
            "\"a\" \"b\"",
            "\"\"\"a\"\"\"",
            "\"\" \"\"",
            "\"Let's begin.\" \"What do you think?\"",
            "plain",
            "\"",
            "\"\"",
            "\" \"x\" \"",
        ];
        for input in inputs {
            let once = clean_quotation_marks(input);
            assert_eq!(clean_quotation_marks(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn question_mark_is_appended_once() {
        assert_eq!(ensure_question_mark("How so"), "How so?");
        assert_eq!(ensure_question_mark("How so?"), "How so?");
        assert_eq!(ensure_question_mark("How so?  "), "How so?");
        assert_eq!(ensure_question_mark(""), "?");
    }

    #[test]
    fn opening_is_parsed_and_cleaned() {
        let raw = "CHOSEN_EXPERT: Technology Officer\n\
                   QUESTION: \"The research mentions a cloud migration. How ready are they?\"\n\
                   REASONING: Infrastructure dominates the research.";
        let choice = parse_opening(raw).unwrap();
        assert_eq!(choice.expert.name, "Technology Officer");
        assert_eq!(
            choice.question,
            "The research mentions a cloud migration. How ready are they?"
        );
        assert_eq!(
            choice.reasoning.as_deref(),
            Some("Infrastructure dominates the research.")
        );
    }

    #[test]
    fn opening_tolerates_indentation_and_brackets() {
        let raw = "  CHOSEN_EXPERT: [Product Manager]\n  QUESTION: What about users?";
        let choice = parse_opening(raw).unwrap();
        assert_eq!(choice.expert.name, "Product Manager");
        assert!(choice.reasoning.is_none());
    }

    #[test]
    fn opening_failures_are_reported() {
        assert_eq!(
            parse_opening("I think we should start with strategy."),
            Err(ParseFailure::MissingField("CHOSEN_EXPERT"))
        );
        assert_eq!(
            parse_opening("CHOSEN_EXPERT: Chief Vibes Officer\nQUESTION: Why?"),
            Err(ParseFailure::UnknownPersona("Chief Vibes Officer".into()))
        );
        assert_eq!(
            parse_opening("CHOSEN_EXPERT: Product Manager\nQUESTION:   "),
            Err(ParseFailure::MissingField("QUESTION"))
        );
    }

    #[test]
    fn round_one_order_starts_with_opener_and_covers_panel() {
        for opener in PANEL.iter() {
            let order = round_one_order(opener);
            assert_eq!(order[0].name, opener.name);
            let unique: HashSet<_> = names(&order).into_iter().collect();
            assert_eq!(order.len(), 4);
            assert_eq!(unique.len(), 4);
        }
        assert_eq!(
            names(&round_one_order(&PANEL[2])),
            vec![
                "Technology Officer",
                "Business Strategist",
                "Product Manager",
                "Innovation Analyst"
            ]
        );
    }

    #[test]
    fn round_plan_order_is_repaired() {
        let raw = "LEAD_EXPERT: Innovation Analyst\n\
                   THEME: Data as a product\n\
                   ORDER: Technology Officer, Technology Officer, Wizard, Innovation Analyst";
        let plan = parse_round_plan(raw).unwrap();
        assert_eq!(plan.lead.name, "Innovation Analyst");
        assert_eq!(plan.theme, "Data as a product");
        assert_eq!(
            names(&plan.order),
            vec!["Technology Officer", "Business Strategist", "Product Manager"]
        );
    }

    #[test]
    fn repaired_plans_cover_the_panel_exactly_once() {
        let proposals: [&[&str]; 5] = [
            &[],
            &["Product Manager"],
            &["Nobody", "Business Strategist", "Business Strategist"],
            &[
                "Innovation Analyst",
                "Technology Officer",
                "Product Manager",
                "Business Strategist",
            ],
            &["Product Manager.", "  "],
        ];
        for lead in PANEL.iter() {
            for proposed in proposals {
                let plan = RoundPlan {
                    lead,
                    theme: String::new(),
                    order: repair_order(lead, proposed),
                };
                let speakers = names(&plan.speakers());
                let unique: HashSet<_> = speakers.iter().copied().collect();
                assert_eq!(speakers.len(), 4, "lead {} / {:?}", lead.name, proposed);
                assert_eq!(unique.len(), 4, "lead {} / {:?}", lead.name, proposed);
                assert_eq!(speakers[0], lead.name);
            }
        }
    }

    #[test]
    fn round_plan_requires_lead_and_theme() {
        assert_eq!(
            parse_round_plan("THEME: Costs\nORDER: Product Manager"),
            Err(ParseFailure::MissingField("LEAD_EXPERT"))
        );
        assert_eq!(
            parse_round_plan("LEAD_EXPERT: Product Manager\nORDER: Technology Officer"),
            Err(ParseFailure::MissingField("THEME"))
        );
        assert!(matches!(
            parse_round_plan("LEAD_EXPERT: The Intern\nTHEME: Costs"),
            Err(ParseFailure::UnknownPersona(_))
        ));
    }

    #[test]
    fn missing_order_falls_back_to_panel_order() {
        let plan = parse_round_plan("LEAD_EXPERT: Product Manager\nTHEME: Pricing").unwrap();
        assert_eq!(
            names(&plan.order),
            vec![
                "Business Strategist",
                "Technology Officer",
                "Innovation Analyst"
            ]
        );
    }
}
