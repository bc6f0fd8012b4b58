//! Identifier and indentation utilities shared by the parser and the generator.

/// True for characters allowed in a generated Python identifier.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Removes every character that cannot appear in an identifier.
pub fn identifier_safe(text: &str) -> String {
    text.chars().filter(|&c| is_identifier_char(c)).collect()
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// True for names Python reserves, which cannot follow `self.`.
pub fn is_keyword(name: &str) -> bool {
    PYTHON_KEYWORDS.contains(&name)
}

/// True when `name` can stand on its own as an attribute or method name.
pub fn is_identifier(name: &str) -> bool {
    match name.chars().next() {
        Some(first) => {
            !first.is_ascii_digit() && name.chars().all(is_identifier_char) && !is_keyword(name)
        }
        None => false,
    }
}

/// Title-cases `text`: a letter is uppercased when it follows a non-letter, lowercased otherwise.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_was_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_was_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_was_letter = true;
        } else {
            out.push(c);
            previous_was_letter = false;
        }
    }
    out
}

/// Camel-cases a label for use in a class name: `"adds two numbers"` becomes `AddsTwoNumbers`.
///
/// Underscores are dropped along with every other non-alphanumeric character.
pub fn camelify(label: &str) -> String {
    title_case(label)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Snake-cases a label for use in a method or attribute name: `"Adds Two"` becomes `adds_two`.
pub fn snakify(label: &str) -> String {
    label
        .to_lowercase()
        .split_whitespace()
        .map(identifier_safe)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Number of leading whitespace characters in `line`.
pub fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Strips the indentation of the first line from every line.
///
/// The baseline is measured once, on the first line; later lines lose exactly that many
/// leading characters whatever they are. A line shorter than the baseline becomes empty.
pub fn dedent<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let Some(first) = lines.first() else {
        return Vec::new();
    };
    let baseline = indent_width(first.as_ref());
    lines
        .iter()
        .map(|line| line.as_ref().chars().skip(baseline).collect())
        .collect()
}

/// Prefixes every non-empty line with `width` spaces.
pub fn reindent<S: AsRef<str>>(lines: &[S], width: usize) -> Vec<String> {
    let pad = " ".repeat(width);
    lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camelify_title_cases_and_strips() {
        assert_eq!(camelify("Calc"), "Calc");
        assert_eq!(camelify("adds two numbers"), "AddsTwoNumbers");
        assert_eq!(camelify("with an EMPTY list"), "WithAnEmptyList");
        assert_eq!(camelify("snake_case words"), "SnakeCaseWords");
        assert_eq!(camelify("it's 2nd-rate!"), "ItS2NdRate");
        assert_eq!(camelify(""), "");
    }

    #[test]
    fn snakify_lowers_and_joins() {
        assert_eq!(snakify("adds"), "adds");
        assert_eq!(snakify("Adds Two  Numbers"), "adds_two_numbers");
        assert_eq!(snakify("returns -1 on error!"), "returns_1_on_error");
        assert_eq!(snakify("  "), "");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("calc"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("2calc"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("class"));
        assert!(is_identifier("classes"));
        assert!(is_keyword("None"));
        assert_eq!(identifier_safe("a-b c_d!"), "abc_d");
    }

    #[test]
    fn dedent_uses_first_line_only() {
        let body = ["        x = 1", "        if x:", "            y = 2"];
        assert_eq!(dedent(&body), vec!["x = 1", "if x:", "    y = 2"]);

        // later lines are trusted, not re-measured
        let ragged = ["    a", "  b"];
        assert_eq!(dedent(&ragged), vec!["a", ""]);
    }

    #[test]
    fn dedent_then_reindent_restores_body() {
        let body = [
            "    for item in items:",
            "        total += item",
            "    assert total == 6",
        ];
        let restored = reindent(&dedent(&body), 4);
        assert_eq!(restored, body);
    }

    #[test]
    fn dedent_empty_body() {
        let empty: [&str; 0] = [];
        assert!(dedent(&empty).is_empty());
    }
}
