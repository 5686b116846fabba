use serde_json::Value;

/// Identifier text for a JSON id that may arrive as a string or a number.
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub fn format_similarity(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

/// First `max_chars` characters of `text`, whitespace collapsed, with an ellipsis when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let mut cut = collapsed.chars().take(max_chars).collect::<String>();
    cut.push('…');
    cut
}
