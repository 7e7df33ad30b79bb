use serde::Deserialize;
use tradefloor_models::TradeInstruction;

use crate::error::EngineError;

/// Dig the decision object out of a model reply. The model is told to
/// answer with bare JSON, but replies arrive three ways in practice:
/// clean JSON, JSON inside a markdown fence, or JSON with prose around
/// it. Each candidate is validated before it wins.
pub fn extract_json(reply: &str) -> Result<String, EngineError> {
    let candidates = [
        Some(reply.trim()),
        fenced_block(reply),
        balanced_object(reply),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.starts_with('{')
            && serde_json::from_str::<serde_json::Value>(candidate).is_ok()
        {
            return Ok(candidate.to_string());
        }
    }

    Err(EngineError::Parse(format!(
        "no JSON object in reply ({} bytes)",
        reply.len()
    )))
}

// The body of the first ``` fence, skipping the language tag line.
fn fenced_block(reply: &str) -> Option<&str> {
    let open = reply.find("```")?;
    let tagged = &reply[open + 3..];
    let body = &tagged[tagged.find('\n')? + 1..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

// The first balanced brace pair, ignoring braces inside string literals.
fn balanced_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in reply[start..].char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&reply[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct InstructionEnvelope {
    instructions: Vec<TradeInstruction>,
}

/// Parse the trade instructions from raw Claude CLI output. The model is
/// told to answer with an `{"instructions": [...]}` envelope; an empty
/// instruction list is a valid "hold" answer.
pub fn parse_instructions(raw: &str) -> Result<Vec<TradeInstruction>, EngineError> {
    let json_str = extract_json(raw)?;
    let envelope: InstructionEnvelope = serde_json::from_str(&json_str).map_err(|e| {
        EngineError::Parse(format!(
            "Failed to parse instructions: {e}\nJSON: {json_str}"
        ))
    })?;
    Ok(envelope.instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradefloor_models::Side;

    #[test]
    fn extract_clean_json() {
        let input = r#"{"instructions": []}"#;
        let result = extract_json(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn extract_from_markdown() {
        let input = "Here is my plan:\n```json\n{\"instructions\": []}\n```\nDone.";
        let result = extract_json(input).unwrap();
        assert_eq!(result, r#"{"instructions": []}"#);
    }

    #[test]
    fn extract_from_markdown_no_lang() {
        let input = "Result:\n```\n{\"instructions\": []}\n```";
        let result = extract_json(input).unwrap();
        assert_eq!(result, r#"{"instructions": []}"#);
    }

    #[test]
    fn extract_with_prefix_text() {
        let input = "Given current conditions, I will act as follows:\n{\"instructions\": [], \"note\": \"holding\"}";
        let result = extract_json(input).unwrap();
        assert!(result.contains("instructions"));
    }

    #[test]
    fn extract_with_braces_in_strings() {
        let input = r#"{"instructions": [], "note": "watch the {open} and {close}"}"#;
        let result = extract_json(input).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert!(parsed["instructions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn extract_no_json() {
        let input = "I have decided not to trade today.";
        let result = extract_json(input);
        assert!(result.is_err());
    }

    #[test]
    fn parse_full_envelope() {
        let input = r#"```json
{
    "instructions": [
        {"symbol": "AAPL", "quantity": "10", "side": "buy", "rationale": "Undervalued"},
        {"symbol": "TSLA", "quantity": "2.5", "side": "sell"}
    ]
}
```"#;

        let instructions = parse_instructions(input).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].symbol, "AAPL");
        assert_eq!(instructions[0].side, Side::Buy);
        assert_eq!(instructions[1].quantity, dec!(2.5));
        assert_eq!(instructions[1].rationale, None);
    }

    #[test]
    fn parse_empty_envelope_is_hold() {
        let instructions = parse_instructions(r#"{"instructions": []}"#).unwrap();
        assert!(instructions.is_empty());
    }

    #[test]
    fn parse_missing_envelope_field() {
        let result = parse_instructions(r#"{"trades": []}"#);
        assert!(matches!(result, Err(EngineError::Parse(_))));
    }
}
