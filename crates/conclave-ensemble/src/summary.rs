use crate::EnsembleResponses;

/// Returned by [`summarize`] when nothing answered.
pub const NO_BACKENDS_SENTINEL: &str = "Error: No models available";

const SUMMARY_HEADER: &str = "# Multi-Model Analysis\n\n";
const SECTION_DELIMITER: &str = "\n\n---\n\n";

/// Render every response as one markdown document.
///
/// Each section is headed by the upper-cased backend name and the model
/// that answered, and sections are separated by a horizontal rule.
#[must_use]
pub fn summarize(responses: &EnsembleResponses) -> String {
    if responses.is_empty() {
        return NO_BACKENDS_SENTINEL.to_string();
    }

    let mut out = String::from(SUMMARY_HEADER);
    for (name, response) in responses.iter() {
        out.push_str(&format!(
            "## {} ({})\n\n{}{SECTION_DELIMITER}",
            name.to_uppercase(),
            response.model,
            response.content
        ));
    }
    out
}
