//! Response Parser: splits the model's free text into narrative and risk mapping.
//!
//! Grammar of the risk line:
//! ```text
//! risk_line := WS* "SEMAFORO_RIESGOS:" pair ("," pair)* EOL
//! pair      := WS* hazard WS* "=" WS* level WS*
//! ```
//! Only the FIRST matching line is used and the capture never crosses a line break,
//! so trailing paragraphs after the risk line stay in the narrative.
//! Parsing never fails: a missing or malformed line degrades to an empty mapping.

use crate::llm_client::prompts::RISK_LINE_PREFIX;
use crate::wizard::models::RiskMap;

/// Narrative and risks extracted from one response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub narrative: String,
    pub risks: RiskMap,
}

/// Parses a raw model response.
pub fn parse_response(text: &str) -> ParsedResponse {
    match find_risk_line(text) {
        Some(line) => {
            let mut narrative = String::with_capacity(text.len());
            narrative.push_str(&text[..line.start]);
            narrative.push_str(&text[line.end..]);
            ParsedResponse {
                narrative: narrative.trim().to_string(),
                risks: parse_pairs(line.payload),
            }
        }
        None => ParsedResponse {
            narrative: text.trim().to_string(),
            risks: RiskMap::new(),
        },
    }
}

/// Splits `hazard=level` pairs. Pairs with an empty side are dropped; `a=b=c` keeps `b`.
pub fn parse_pairs(payload: &str) -> RiskMap {
    let mut risks = RiskMap::new();
    for pair in payload.split(',') {
        let mut sides = pair.split('=');
        let hazard = sides.next().map(str::trim).unwrap_or_default();
        let level = sides.next().map(str::trim).unwrap_or_default();
        if !hazard.is_empty() && !level.is_empty() {
            risks.insert(hazard, level);
        }
    }
    risks
}

/// Byte span of the risk line (without its line terminator) and its payload.
struct RiskLine<'a> {
    start: usize,
    end: usize,
    payload: &'a str,
}

fn find_risk_line(text: &str) -> Option<RiskLine<'_>> {
    let mut offset = 0;
    for raw_line in text.split_inclusive('\n') {
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let indent = line.len() - line.trim_start().len();
        if let Some(payload) = line[indent..].strip_prefix(RISK_LINE_PREFIX) {
            return Some(RiskLine {
                start: offset,
                end: offset + line.len(),
                payload,
            });
        }
        offset += raw_line.len();
    }
    None
}
