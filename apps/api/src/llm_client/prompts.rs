// Shared prompt fragments.
// Each stage's full template lives in projection::prompts; this file only holds
// cross-cutting instructions appended to several of them.

/// Appended to every template that expects a JSON object back.
pub const JSON_ONLY_INSTRUCTION: &str = "Return only the JSON object, no additional text.";

/// Keeps numbers machine-readable in free-text responses.
pub const PLAIN_NUMBERS_INSTRUCTION: &str = "\
Provide all numbers as plain numbers without currency symbols or commas.
Do not include any explanatory text between sections.
Each number should be a specific value, not a range.";

/// Number formatting rules for JSON arrays.
pub const JSON_NUMBERS_INSTRUCTION: &str =
    "All numbers should be integers or decimals without commas.";

/// Asks for an HTML fragment the embedded-fragment parser can extract.
pub const HTML_WRAP_INSTRUCTION: &str = "\
Format the whole answer as a small HTML document. Start it with <html> and end it with </html>. \
Do not put any text outside those tags.";
