#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub line: usize,
    pub position: usize,
    pub kind: Kind,
    pub value: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Kind {
    // Lexical classes of the Jack grammar
    Keyword,     // class, function, let, ...
    Symbol,      // { } ( ) [ ] . , ; + - * / & | < > = ~ ^ #
    IntConst,    // decimal literal in 0..=32767
    StringConst, // "..." without the quotes
    Identifier,  // names not matching any keyword

    EOF, // End of file marker
}

/// Reserved words, matched before any other classification.
pub const KEYWORDS: &[&str] = &[
    "class",
    "constructor",
    "function",
    "method",
    "field",
    "static",
    "var",
    "int",
    "char",
    "boolean",
    "void",
    "true",
    "false",
    "null",
    "this",
    "let",
    "do",
    "if",
    "else",
    "while",
    "return",
];

/// Symbol characters. Each one terminates the token before it and forms
/// a token of its own, whitespace or not.
pub const SYMBOLS: &[char] = &[
    '{', '}', '(', ')', '[', ']', '.', ',', ';', '+', '-', '*', '/', '&', '|', '<', '>', '=', '~',
    '^', '#',
];

/// Four symbol characters collide with the structured output markup
/// and are replaced by entities.
pub fn escape_symbol(text: &str) -> String {
    match text {
        "<" => "&lt;".to_string(),
        ">" => "&gt;".to_string(),
        "&" => "&amp;".to_string(),
        "\"" => "&quot;".to_string(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_the_four_markup_symbols() {
        assert_eq!(escape_symbol("<"), "&lt;");
        assert_eq!(escape_symbol(">"), "&gt;");
        assert_eq!(escape_symbol("&"), "&amp;");
        assert_eq!(escape_symbol("\""), "&quot;");
        assert_eq!(escape_symbol("+"), "+");
    }
}
