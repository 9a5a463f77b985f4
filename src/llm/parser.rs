//! Response parsing for LLM outputs.
//!
//! Extracts SQL from replies that wrap it in markdown code fences.

/// An LLM reply split into prose and SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Text outside the SQL block.
    pub text: String,
    /// SQL from the first usable fenced block, if any.
    pub sql: Option<String>,
}

/// Parses an LLM reply.
///
/// A ```` ```sql ```` block wins over a bare ```` ``` ```` block; blocks tagged
/// with any other language are ignored. Only the first usable block counts.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    let fence = find_fence(response, Some("sql")).or_else(|| find_fence(response, None));

    match fence {
        Some(fence) => {
            let before = response[..fence.start].trim_end();
            let after = response[fence.end..].trim_start();
            ParsedResponse {
                text: format!("{before}{after}").trim().to_string(),
                sql: Some(response[fence.body_start..fence.body_end].trim().to_string())
                    .filter(|sql| !sql.is_empty()),
            }
        }
        None => ParsedResponse {
            text: response.trim().to_string(),
            sql: None,
        },
    }
}

struct Fence {
    start: usize,
    body_start: usize,
    body_end: usize,
    end: usize,
}

/// Finds the first fenced block whose info string is `lang` (or empty for `None`).
fn find_fence(text: &str, lang: Option<&str>) -> Option<Fence> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find("```") {
        let start = search_from + offset;
        let info_start = start + 3;
        let newline = text[info_start..].find('\n')? + info_start;
        let info = text[info_start..newline].trim();
        let body_start = newline + 1;
        let body_end = text[body_start..].find("```")? + body_start;
        let end = body_end + 3;

        let matches = match lang {
            Some(lang) => info.eq_ignore_ascii_case(lang),
            None => info.is_empty(),
        };
        if matches {
            return Some(Fence {
                start,
                body_start,
                body_end,
                end,
            });
        }
        search_from = end;
    }

    None
}
