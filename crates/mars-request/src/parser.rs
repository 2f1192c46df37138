//! Parser for the textual request form `[verb,]key=v1/v2/...,key=...`.

use crate::error::{RequestError, Result};
use crate::request::{Parameter, Request};
use crate::types::KeywordType;

/// Parse a request string.
pub(crate) fn parse_request(text: &str) -> Result<Request> {
    let mut request = Request::default();

    let clauses: Vec<&str> = text.split(',').map(str::trim).collect();
    if clauses.iter().all(|c| c.is_empty()) {
        return Err(RequestError::syntax(text, "empty request"));
    }

    for (position, clause) in clauses.iter().enumerate() {
        if clause.is_empty() {
            let reason = if position + 1 == clauses.len() {
                "empty clause, did the request end in a comma?"
            } else {
                "empty clause between two commas"
            };
            return Err(RequestError::syntax(text, reason));
        }

        let Some((keyword, values)) = clause.split_once('=') else {
            if position == 0 && is_identifier(clause) {
                request.set_verb(clause.to_lowercase());
                continue;
            }
            return Err(RequestError::syntax(
                text,
                format!("expected key=value, found '{}', is a comma missing?", clause),
            ));
        };

        let keyword = keyword.trim().to_lowercase();
        if !is_identifier(&keyword) {
            return Err(RequestError::syntax(text, format!("invalid keyword '{}'", keyword)));
        }
        if request.values(&keyword).is_some() {
            return Err(RequestError::DuplicateKeyword(keyword));
        }

        let values = parse_values(text, &keyword, values)?;
        request.push_parameter(Parameter::new(keyword, values));
    }

    Ok(request)
}

/// Parse the value list of one keyword, expanding `to`/`by` ranges.
pub(crate) fn parse_values(text: &str, keyword: &str, values: &str) -> Result<Vec<String>> {
    let kind = KeywordType::for_keyword(keyword);
    let tokens: Vec<&str> = values.split('/').map(str::trim).collect();

    if tokens.iter().any(|t| t.is_empty()) {
        return Err(RequestError::syntax(
            text,
            format!("empty value for keyword '{}'", keyword),
        ));
    }
    if let Some(bad) = tokens.iter().find(|t| t.contains('=')) {
        return Err(RequestError::syntax(
            text,
            format!("unexpected '=' in value '{}', is a comma missing?", bad),
        ));
    }

    let mut result: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let is_range = tokens
            .get(i + 1)
            .is_some_and(|t| t.eq_ignore_ascii_case("to"));

        if is_range {
            let to = tokens.get(i + 2).ok_or_else(|| {
                RequestError::invalid_range(keyword, "range is missing its end value")
            })?;
            let by = match tokens.get(i + 3) {
                Some(t) if t.eq_ignore_ascii_case("by") => Some(*tokens.get(i + 4).ok_or_else(
                    || RequestError::invalid_range(keyword, "'by' is missing its step value"),
                )?),
                _ => None,
            };

            result.extend(kind.expand_range(keyword, tokens[i], to, by)?);
            i += if by.is_some() { 5 } else { 3 };
        } else {
            if tokens[i].eq_ignore_ascii_case("to") || tokens[i].eq_ignore_ascii_case("by") {
                return Err(RequestError::invalid_range(
                    keyword,
                    format!("unexpected '{}'", tokens[i]),
                ));
            }
            result.push(kind.canonicalise(keyword, tokens[i])?);
            i += 1;
        }
    }

    // Keep first occurrence order, drop repeats.
    let mut seen = std::collections::HashSet::new();
    result.retain(|v| seen.insert(v.clone()));

    Ok(result)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
