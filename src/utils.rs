// Utility functions

/// Collapses runs of whitespace (including newlines from nested markup) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
