use crate::error::LexingError;
use crate::token::{Kind, Token, KEYWORDS, SYMBOLS};
use std::iter;
use std::iter::from_fn;
use std::path::PathBuf;

/// Breaks Jack source text into the token sequence defined by the
/// grammar's lexical rules. Whitespace and all three comment forms
/// (`//`, `/*..*/`, `/**..*/`) separate tokens and are dropped; symbol
/// characters are token boundaries even without surrounding whitespace.
pub struct Lexer<'a> {
    source_code: &'a str,
    file_name: &'a PathBuf,
    line: usize,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, file_name: &'a PathBuf) -> Self {
        Self {
            source_code: input,
            file_name,
            line: 0,
            position: 0,
        }
    }

    fn create_token(&self, kind: Kind, value: String) -> Token {
        Token {
            line: self.line,
            position: self.position,
            kind,
            value,
        }
    }

    fn error(&self, message: String) -> LexingError {
        LexingError::new(self.file_name.clone(), message, self.line, self.position)
    }

    /// Classification is order-sensitive: keyword set first, then the
    /// symbol set, then all-digits, then a leading quote, else identifier.
    /// The returned sequence always ends with a single EOF token.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut tokens = Vec::new();
        let mut iter = self.source_code.chars().peekable();

        while let Some(ch) = iter.next() {
            self.position += 1;

            match ch {
                '\n' => {
                    self.line += 1;
                    self.position = 0;
                }
                c if c.is_whitespace() => {}
                '/' => {
                    match iter.peek() {
                        Some('/') => {
                            // Line comment, runs to end of line
                            iter.next();
                            for c in iter.by_ref() {
                                if c == '\n' {
                                    break;
                                }
                            }
                            self.line += 1;
                            self.position = 0;
                        }
                        Some('*') => {
                            // Block comment; /** doc comments take this
                            // path too, the second '*' is just content
                            iter.next();
                            self.position += 1;
                            let mut prev = '\0';
                            let mut closed = false;
                            for c in iter.by_ref() {
                                self.position += 1;
                                if c == '\n' {
                                    self.line += 1;
                                    self.position = 0;
                                }
                                if prev == '*' && c == '/' {
                                    closed = true;
                                    break;
                                }
                                prev = c;
                            }
                            if !closed {
                                return Err(self.error("Unterminated block comment".to_string()));
                            }
                        }
                        _ => {
                            let token = self.create_token(Kind::Symbol, ch.to_string());
                            tokens.push(token);
                        }
                    }
                }
                '"' => {
                    // The interior may hold any character except the
                    // delimiter and newline. Symbols inside do not split.
                    let mut value = String::new();
                    let mut closed = false;
                    for c in iter.by_ref() {
                        self.position += 1;
                        if c == '"' {
                            closed = true;
                            break;
                        }
                        if c == '\n' {
                            return Err(
                                self.error("String constant spans end of line".to_string())
                            );
                        }
                        value.push(c);
                    }
                    if !closed {
                        return Err(self.error("Unterminated string constant".to_string()));
                    }
                    let token = self.create_token(Kind::StringConst, value);
                    tokens.push(token);
                }
                c if SYMBOLS.contains(&c) => {
                    let token = self.create_token(Kind::Symbol, c.to_string());
                    tokens.push(token);
                }
                c if c.is_ascii_digit() => {
                    let number: String = iter::once(ch)
                        .chain(from_fn(|| iter.by_ref().next_if(|s| s.is_ascii_digit())))
                        .collect();

                    self.position += number.len() - 1;

                    // 15-bit constants only; the silent acceptance in
                    // older tooling is treated as a defect here.
                    match number.parse::<u16>() {
                        Ok(value) if value <= 32767 => {
                            let token = self.create_token(Kind::IntConst, number);
                            tokens.push(token);
                        }
                        _ => {
                            return Err(self.error(format!(
                                "Integer constant {} out of range 0..=32767",
                                number
                            )));
                        }
                    }
                }
                c if c.is_alphabetic() || c == '_' => {
                    let ident: String = iter::once(ch)
                        .chain(from_fn(|| {
                            iter.by_ref().next_if(|s| s.is_alphanumeric() || *s == '_')
                        }))
                        .collect();

                    self.position += ident.len() - 1;

                    let kind = if KEYWORDS.contains(&ident.as_str()) {
                        Kind::Keyword
                    } else {
                        Kind::Identifier
                    };
                    let token = self.create_token(kind, ident);
                    tokens.push(token);
                }
                c => {
                    return Err(self.error(format!("Unrecognized character {}", c)));
                }
            }
        }

        let eof_token = Token {
            line: self.line,
            position: self.position,
            kind: Kind::EOF,
            value: "EndOfFile".to_string(),
        };
        tokens.push(eof_token);

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        let path = PathBuf::from("Test.jack");
        Lexer::new(source, &path).tokenize().expect("lexing failed")
    }

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .filter(|t| t.kind != Kind::EOF)
            .map(|t| t.value.as_str())
            .collect()
    }

    #[test]
    fn tokenizes_a_minimal_class() {
        let tokens = tokenize("class Main { function void main() { return; } }");
        assert_eq!(
            values(&tokens),
            vec![
                "class", "Main", "{", "function", "void", "main", "(", ")", "{", "return", ";",
                "}", "}"
            ]
        );
        assert_eq!(tokens.last().unwrap().kind, Kind::EOF);
    }

    #[test]
    fn symbols_split_tokens_without_whitespace() {
        let tokens = tokenize("let a[i]=x;");
        assert_eq!(values(&tokens), vec!["let", "a", "[", "i", "]", "=", "x", ";"]);
        assert_eq!(tokens[0].kind, Kind::Keyword);
        assert_eq!(tokens[1].kind, Kind::Identifier);
        assert_eq!(tokens[2].kind, Kind::Symbol);
    }

    #[test]
    fn comments_and_whitespace_never_change_the_sequence() {
        let plain = tokenize("let x = 1;");
        let commented = tokenize("let /* mid */ x // trailing\n   =\n/** doc */ 1;");
        assert_eq!(values(&plain), values(&commented));
    }

    #[test]
    fn string_constants_keep_symbols_and_drop_quotes() {
        let tokens = tokenize("let s = \"a < b // not-a-comment\";");
        let string = &tokens[3];
        assert_eq!(string.kind, Kind::StringConst);
        assert_eq!(string.value, "a < b // not-a-comment");
    }

    #[test]
    fn integer_constants_validate_to_fifteen_bits() {
        let tokens = tokenize("let x = 32767;");
        assert_eq!(tokens[3].kind, Kind::IntConst);

        let path = PathBuf::from("Test.jack");
        let result = Lexer::new("let x = 32768;", &path).tokenize();
        assert!(result.is_err());
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let path = PathBuf::from("Test.jack");
        assert!(Lexer::new("class /* oops", &path).tokenize().is_err());
    }

    #[test]
    fn string_constant_spanning_a_line_break_is_an_error() {
        let path = PathBuf::from("Test.jack");
        assert!(Lexer::new("let s = \"ab\ncd\";", &path).tokenize().is_err());
    }

    #[test]
    fn unterminated_string_constant_is_an_error() {
        let path = PathBuf::from("Test.jack");
        assert!(Lexer::new("let s = \"oops", &path).tokenize().is_err());
    }

    #[test]
    fn retokenizing_token_text_roundtrips() {
        let source = "class Point { field int x; method int getX() { return x; } }";
        let first = tokenize(source);
        let joined = values(&first).join(" ");
        let second = tokenize(&joined);
        assert_eq!(values(&first), values(&second));
    }
}
