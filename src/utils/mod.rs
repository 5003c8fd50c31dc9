//! Input helpers shared by the resource modules.

use libris_http::FieldError;

/// Maximum stored length of every text column.
pub const MAX_TEXT_LEN: usize = 255;

/// Collects field failures while a payload is checked.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A present, non-blank string of at most [`MAX_TEXT_LEN`] characters.
    pub fn required_text(&mut self, field: &str, value: Option<String>) -> String {
        match value {
            None => {
                self.fail(field, format!("{field} is required"));
                String::new()
            }
            Some(text) if text.trim().is_empty() => {
                self.fail(field, format!("{field} must not be blank"));
                text
            }
            Some(text) => {
                self.check_length(field, &text);
                text
            }
        }
    }

    /// A present string, possibly empty, of at most [`MAX_TEXT_LEN`] characters.
    pub fn present_text(&mut self, field: &str, value: Option<String>) -> String {
        match value {
            None => {
                self.fail(field, format!("{field} is required"));
                String::new()
            }
            Some(text) => {
                self.check_length(field, &text);
                text
            }
        }
    }

    /// An optional string of at most [`MAX_TEXT_LEN`] characters.
    pub fn optional_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        if let Some(text) = &value {
            self.check_length(field, text);
        }
        value
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Return `value` when nothing failed, else every collected failure.
    pub fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }

    fn check_length(&mut self, field: &str, text: &str) {
        if text.chars().count() > MAX_TEXT_LEN {
            self.fail(
                field,
                format!("{field} must be at most {MAX_TEXT_LEN} characters"),
            );
        }
    }
}

/// Escape `%`, `_`, and `\` so `term` matches literally inside a `LIKE` pattern
/// declared with `ESCAPE '\'`.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_blank_values_fail() {
        let mut validator = Validator::new();
        validator.required_text("title", None);
        validator.required_text("firstName", Some("   ".to_string()));
        let errors = validator.finish(()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "title");
        assert_eq!(errors[1].message, "firstName must not be blank");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut validator = Validator::new();
        validator.required_text("title", Some("é".repeat(MAX_TEXT_LEN)));
        assert!(validator.finish(()).is_ok());

        let mut validator = Validator::new();
        validator.optional_text("comment", Some("x".repeat(MAX_TEXT_LEN + 1)));
        assert!(validator.finish(()).is_err());
    }

    #[test]
    fn present_text_accepts_empty_strings() {
        let mut validator = Validator::new();
        let text = validator.present_text("coverText", Some(String::new()));
        assert_eq!(validator.finish(text).unwrap(), "");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Livre"), "%Livre%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
