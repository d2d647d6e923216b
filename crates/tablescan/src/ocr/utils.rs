/// Drops ASCII control characters except `\n`, `\r` and `\t`; they are not
/// allowed in spreadsheet XML.
pub fn strip_control_characters(text: &str) -> String {
    if text
        .chars()
        .any(|c| matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') && !matches!(c, '\n' | '\r' | '\t'))
    {
        text.chars()
            .filter(|c| !matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') || matches!(c, '\n' | '\r' | '\t'))
            .collect()
    } else {
        text.to_string()
    }
}

/// Post-processing applied to every recognizer output.
pub fn clean_recognized_text(text: &str) -> String {
    strip_control_characters(text).trim().to_string()
}

/// Tesseract language codes are letters, digits and `_`, joined with `+`.
pub fn is_valid_language(language: &str) -> bool {
    !language.is_empty()
        && language
            .split('+')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}
