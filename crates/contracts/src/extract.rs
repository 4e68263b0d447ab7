//! JSON payload recovery from free-form model output.
//!
//! Models wrap their JSON in markdown fences, preamble prose, or trailing
//! commentary. `extract_json` narrows the raw text down to the most likely
//! JSON payload without parsing it; the caller decides whether the slice
//! actually decodes.

/// Extract the best JSON candidate from `raw`.
///
/// Preference order:
/// 1. the body of a ```` ```json ```` fence,
/// 2. the body of the first fenced block of any language,
/// 3. the whole text.
///
/// Within the chosen candidate, if a `{` appears before the last `}`, the
/// inclusive slice between them is returned. Otherwise the trimmed candidate
/// is returned as-is so the caller's parse error points at real content.
pub fn extract_json(raw: &str) -> &str {
    let candidate = fenced_block(raw).unwrap_or(raw);

    if let Some(start) = candidate.find('{')
        && let Some(end) = candidate.rfind('}')
        && start < end
    {
        return &candidate[start..=end];
    }

    candidate.trim()
}

/// The body of the first markdown code fence, preferring a `json`-tagged one.
fn fenced_block(raw: &str) -> Option<&str> {
    tagged_fence(raw, "```json").or_else(|| tagged_fence(raw, "```"))
}

fn tagged_fence<'a>(raw: &'a str, opener: &str) -> Option<&'a str> {
    let after_opener = raw.find(opener)? + opener.len();
    let rest = &raw[after_opener..];
    // Skip the remainder of the opener line (language tag, trailing spaces).
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    let body_end = body.find("```")?;
    Some(&body[..body_end])
}
