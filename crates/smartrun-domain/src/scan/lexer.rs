//! Line-oriented lexing just deep enough to tell code from strings and
//! comments.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Quote {
    Single,
    Double,
    TripleSingle,
    TripleDouble,
}

impl Quote {
    fn delimiter(self) -> &'static str {
        match self {
            Quote::Single => "'",
            Quote::Double => "\"",
            Quote::TripleSingle => "'''",
            Quote::TripleDouble => "\"\"\"",
        }
    }

    fn is_triple(self) -> bool {
        matches!(self, Quote::TripleSingle | Quote::TripleDouble)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LexedLine {
    /// Code with string bodies elided and the comment removed.
    pub(crate) code: String,
    /// Comment text starting at `#`, when the line carries one outside a string.
    pub(crate) comment: Option<String>,
    /// The line began inside a triple-quoted string.
    pub(crate) starts_in_string: bool,
}

pub(crate) fn lex_source(source: &str) -> Vec<LexedLine> {
    let mut open = None;
    source
        .lines()
        .map(|line| lex_line(line, &mut open))
        .collect()
}

fn lex_line(line: &str, open: &mut Option<Quote>) -> LexedLine {
    let starts_in_string = open.is_some();
    let mut code = String::with_capacity(line.len());
    let mut comment = None;
    let mut idx = 0;

    while idx < line.len() {
        let rest = &line[idx..];
        let Some(ch) = rest.chars().next() else {
            break;
        };

        if let Some(quote) = *open {
            if ch == '\\' {
                idx += ch.len_utf8();
                if let Some(escaped) = line[idx..].chars().next() {
                    idx += escaped.len_utf8();
                }
                continue;
            }
            let delimiter = quote.delimiter();
            if rest.starts_with(delimiter) {
                *open = None;
                code.push_str(delimiter);
                idx += delimiter.len();
                continue;
            }
            idx += ch.len_utf8();
            continue;
        }

        let opened = if rest.starts_with("\"\"\"") {
            Some(Quote::TripleDouble)
        } else if rest.starts_with("'''") {
            Some(Quote::TripleSingle)
        } else if ch == '"' {
            Some(Quote::Double)
        } else if ch == '\'' {
            Some(Quote::Single)
        } else {
            None
        };
        if let Some(quote) = opened {
            *open = Some(quote);
            code.push_str(quote.delimiter());
            idx += quote.delimiter().len();
            continue;
        }

        if ch == '#' {
            comment = Some(rest.to_string());
            break;
        }

        code.push(ch);
        idx += ch.len_utf8();
    }

    // Plain quotes never span lines.
    if open.is_some_and(|quote| !quote.is_triple()) {
        *open = None;
    }

    LexedLine {
        code,
        comment,
        starts_in_string,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_trailing_comment() {
        let lines = lex_source("import numpy as np  # smartrun: numpy>=1.20\n");
        assert_eq!(lines[0].code.trim_end(), "import numpy as np");
        assert_eq!(lines[0].comment.as_deref(), Some("# smartrun: numpy>=1.20"));
    }

    #[test]
    fn hash_inside_string_is_not_a_comment() {
        let lines = lex_source("x = \"# requires: nope\"\n");
        assert!(lines[0].comment.is_none());
    }

    #[test]
    fn triple_quoted_blocks_span_lines() {
        let source = "doc = \"\"\"\nimport fake\n# not a comment\n\"\"\"\nimport real\n";
        let lines = lex_source(source);
        assert!(lines[1].starts_in_string);
        assert!(!lines[1].code.contains("import"));
        assert!(lines[2].comment.is_none());
        assert!(!lines[4].starts_in_string);
        assert_eq!(lines[4].code, "import real");
    }

    #[test]
    fn escaped_quotes_do_not_close_strings() {
        let lines = lex_source("s = 'it\\'s' # tail\n");
        assert_eq!(lines[0].comment.as_deref(), Some("# tail"));
    }
}
