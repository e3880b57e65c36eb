use crate::error::DslError;
use crate::source::{Script, ScriptId};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: keywords, identifiers and unquoted values
    Word(String),
    /// Directly adjacent words joined by dots, e.g. `Common.Employee`
    Path(Vec<String>),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    /// End of the current script
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{}'", w),
            Token::Path(p) => write!(f, "'{}'", p.join(".")),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Semicolon => f.write_str("';'"),
            Token::Eof => f.write_str("end of script"),
        }
    }
}

/// Byte range of a token inside one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub script: ScriptId,
    pub begin: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

fn is_special(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ';' | '"' | '\'' | '.')
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !is_special(c)
}

/// Tokenize one script. The returned list always ends with [`Token::Eof`].
pub fn lex(script: &Script, id: ScriptId) -> Result<Vec<Spanned>, DslError> {
    let src = script.text();
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let offset = |pos: usize| chars.get(pos).map(|(o, _)| *o).unwrap_or(src.len());
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos].1;
        let next = chars.get(pos + 1).map(|(_, c)| *c);

        // Line comment
        if c == '/' && next == Some('/') {
            while pos < chars.len() && chars[pos].1 != '\n' {
                pos += 1;
            }
            continue;
        }

        // Block comment
        if c == '/' && next == Some('*') {
            let start = pos;
            pos += 2;
            loop {
                if pos >= chars.len() {
                    return Err(DslError::lexical(
                        script.span(offset(start), src.len()),
                        "unterminated block comment",
                    ));
                }
                if chars[pos].1 == '*' && chars.get(pos + 1).map(|(_, c)| *c) == Some('/') {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            continue;
        }

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;

        // String literal
        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(DslError::lexical(
                        script.span(offset(start), src.len()),
                        "unterminated string literal",
                    ));
                }
                let sc = chars[pos].1;
                if sc == quote {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    let Some(&(_, escaped)) = chars.get(pos) else {
                        return Err(DslError::lexical(
                            script.span(offset(start), src.len()),
                            "unterminated escape in string",
                        ));
                    };
                    match escaped {
                        '"' => s.push('"'),
                        '\'' => s.push('\''),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                span: Span {
                    script: id,
                    begin: offset(start),
                    end: offset(pos),
                },
            });
            continue;
        }

        let structural = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ';' => Some(Token::Semicolon),
            _ => None,
        };
        if let Some(token) = structural {
            pos += 1;
            tokens.push(Spanned {
                token,
                span: Span {
                    script: id,
                    begin: offset(start),
                    end: offset(pos),
                },
            });
            continue;
        }

        if c == '.' {
            return Err(DslError::lexical(
                script.span(offset(pos), offset(pos + 1)),
                "unexpected '.': a dot may only join two adjacent words, as in 'Module.Entity'",
            ));
        }

        // Word, or a dotted path of adjacent words
        let mut segments = Vec::new();
        loop {
            let seg_start = pos;
            while pos < chars.len() && is_word_char(chars[pos].1) {
                // Comment starts end a word.
                if chars[pos].1 == '/'
                    && matches!(chars.get(pos + 1).map(|(_, c)| *c), Some('/') | Some('*'))
                {
                    break;
                }
                pos += 1;
            }
            segments.push(chars[seg_start..pos].iter().map(|(_, c)| *c).collect::<String>());
            let dot_joins = pos < chars.len()
                && chars[pos].1 == '.'
                && chars
                    .get(pos + 1)
                    .map(|(_, c)| is_word_char(*c))
                    .unwrap_or(false);
            if dot_joins {
                pos += 1;
                continue;
            }
            if pos < chars.len() && chars[pos].1 == '.' {
                return Err(DslError::lexical(
                    script.span(offset(pos), offset(pos + 1)),
                    format!(
                        "unexpected '.' after '{}': a dot must be followed directly by a word",
                        segments.join(".")
                    ),
                ));
            }
            break;
        }
        let token = if segments.len() == 1 {
            Token::Word(segments.remove(0))
        } else {
            Token::Path(segments)
        };
        tokens.push(Spanned {
            token,
            span: Span {
                script: id,
                begin: offset(start),
                end: offset(pos),
            },
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        span: Span {
            script: id,
            begin: src.len(),
            end: src.len(),
        },
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn lex_str(src: &str) -> Result<Vec<Token>, DslError> {
        let script = Script::new("test.dsl", src);
        Ok(lex(&script, ScriptId(0))?
            .into_iter()
            .map(|s| s.token)
            .collect())
    }

    #[test]
    fn lexes_statement_with_nesting() {
        let tokens = lex_str("Entity \"Employee\" { ShortString Name; }").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("Entity".into()),
                Token::Str("Employee".into()),
                Token::LBrace,
                Token::Word("ShortString".into()),
                Token::Word("Name".into()),
                Token::Semicolon,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn adjacent_dotted_words_form_one_path() {
        let tokens = lex_str("Reference Owner Common.Principal;").unwrap();
        assert_eq!(
            tokens[2],
            Token::Path(vec!["Common".into(), "Principal".into()])
        );
        assert_eq!(tokens[3], Token::Semicolon);
    }

    #[test]
    fn dot_followed_by_space_is_rejected() {
        let err = lex_str("Reference Owner Common. Principal;").unwrap_err();
        assert_eq!(err.code, ErrorCode::Lexical);
        let span = err.span.unwrap();
        assert_eq!(span.begin.line, 1);
        assert_eq!(span.begin.column, 23);
    }

    #[test]
    fn comments_are_skipped_without_shifting_positions() {
        let script = Script::new("c.dsl", "// header\n/* block\n */ Module A;");
        let tokens = lex(&script, ScriptId(0)).unwrap();
        let first = &tokens[0];
        assert_eq!(first.token, Token::Word("Module".into()));
        let pos = script.position(first.span.begin);
        assert_eq!((pos.line, pos.column), (3, 5));
    }

    #[test]
    fn single_and_double_quotes_with_escapes() {
        let tokens = lex_str(r#"'it\'s' "say \"hi\"\n""#).unwrap();
        assert_eq!(tokens[0], Token::Str("it's".into()));
        assert_eq!(tokens[1], Token::Str("say \"hi\"\n".into()));
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let err = lex_str("Entity \"Employee { }").unwrap_err();
        assert_eq!(err.code, ErrorCode::Lexical);
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.span.unwrap().begin.column, 8);
    }

    #[test]
    fn unterminated_block_comment_is_lexical_error() {
        let err = lex_str("Module A; /* never closed").unwrap_err();
        assert!(err.message.contains("block comment"));
    }

    #[test]
    fn brackets_are_structural() {
        let tokens = lex_str("Unique [Name Surname];").unwrap();
        assert_eq!(tokens[1], Token::LBracket);
        assert_eq!(tokens[4], Token::RBracket);
    }
}
