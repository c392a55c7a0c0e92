//! The generic open/close token scanner (§4.4).
//!
//! Scans a text for balanced `open_token ... close_token` spans with
//! backslash-escape support (`\${` keeps the open token literal instead of
//! starting a span), replacing each span's content with whatever a handler
//! returns. The scanner has no opinion on what's inside a span — it is
//! reused as-is for `${var}` substitution and for `#{param}` placeholder
//! parsing.

/// A reusable open/close token scanner bound to one token pair.
#[derive(Debug, Clone, Copy)]
pub struct GenericTokenParser {
    open_token: &'static str,
    close_token: &'static str,
}

impl GenericTokenParser {
    /// Creates a scanner for the given open/close token pair.
    pub const fn new(open_token: &'static str, close_token: &'static str) -> Self {
        Self {
            open_token,
            close_token,
        }
    }

    /// Scans `text`, calling `handler` with the content of each enclosed
    /// span and substituting its return value in place of the whole
    /// `open_token...close_token` run. An open token with no matching close
    /// token is left untouched, verbatim, to the end of the text.
    pub fn parse(&self, text: &str, mut handler: impl FnMut(&str) -> String) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut output = String::with_capacity(text.len());
        let mut rest = text;
        loop {
            let Some(start) = rest.find(self.open_token) else {
                output.push_str(rest);
                break;
            };
            if start > 0 && rest.as_bytes()[start - 1] == b'\\' {
                output.push_str(&rest[..start - 1]);
                output.push_str(self.open_token);
                rest = &rest[start + self.open_token.len()..];
                continue;
            }
            output.push_str(&rest[..start]);
            let after_open = &rest[start + self.open_token.len()..];
            match after_open.find(self.close_token) {
                None => {
                    output.push_str(self.open_token);
                    output.push_str(after_open);
                    break;
                }
                Some(end) => {
                    let expr = &after_open[..end];
                    output.push_str(&handler(expr));
                    rest = &after_open[end + self.close_token.len()..];
                }
            }
        }
        output
    }
}

/// The `${...}` variable-substitution scanner.
pub const VARIABLE_TOKEN_PARSER: GenericTokenParser = GenericTokenParser::new("${", "}");

/// The `#{...}` parameter-placeholder scanner.
pub const PARAMETER_TOKEN_PARSER: GenericTokenParser = GenericTokenParser::new("#{", "}");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_each_span() {
        let parser = GenericTokenParser::new("${", "}");
        let out = parser.parse("a ${x} b ${y}", |expr| expr.to_uppercase());
        assert_eq!(out, "a X b Y");
    }

    #[test]
    fn backslash_escapes_open_token() {
        let parser = GenericTokenParser::new("${", "}");
        let out = parser.parse(r"literal \${not a var} here", |expr| expr.to_string());
        assert_eq!(out, "literal ${not a var} here");
    }

    #[test]
    fn unterminated_span_left_verbatim() {
        let parser = GenericTokenParser::new("#{", "}");
        let out = parser.parse("select #{id", |expr| expr.to_string());
        assert_eq!(out, "select #{id");
    }

    #[test]
    fn handles_consecutive_spans_with_no_gap() {
        let parser = GenericTokenParser::new("#{", "}");
        let mut n = 0;
        let out = parser.parse("#{a}#{b}#{c}", |_| {
            n += 1;
            format!("?{}", n)
        });
        assert_eq!(out, "?1?2?3");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let parser = GenericTokenParser::new("${", "}");
        assert_eq!(parser.parse("", |expr| expr.to_string()), "");
    }
}
