use serde::Deserialize;

/// Unwrap Claude's `{"result": "...", ...}` envelope if present
pub fn unwrap_envelope(raw: &str) -> String {
    #[derive(Deserialize)]
    struct ClaudeOutput {
        result: String,
    }

    match serde_json::from_str::<ClaudeOutput>(raw.trim()) {
        Ok(out) => out.result,
        Err(_) => raw.to_string(),
    }
}

/// Extract a JSON object from a string that might contain markdown code blocks
pub fn extract_json(s: &str) -> Option<String> {
    // First try: the whole string is valid JSON
    let trimmed = s.trim();
    if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }

    // Second try: extract from markdown code block
    let re = regex::Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").ok()?;
    for cap in re.captures_iter(s) {
        let potential_json = cap.get(1)?.as_str().trim();
        if serde_json::from_str::<serde_json::Value>(potential_json).is_ok() {
            return Some(potential_json.to_string());
        }
    }

    // Third try: first balanced object, skipping braces inside strings
    let brace_start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (i, c) in s[brace_start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(brace_start + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let potential_json = &s[brace_start..end?];
    serde_json::from_str::<serde_json::Value>(potential_json)
        .ok()
        .map(|_| potential_json.to_string())
}
