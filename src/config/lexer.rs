//! Tokenizer for the configuration dialect
//!
//! The dialect only has words, the two pairs of block delimiters, `;`,
//! comments and line breaks. Line breaks are tokens of their own since the
//! grammar is line-oriented: a directive must end its line.

use crate::errors::{SyntaxError, SyntaxErrorKind};

use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::char;
use nom::combinator::{map, value};
use nom::sequence::preceded;
use nom::IResult;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Directive name, keyword or value
    Word(String),
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Semicolon,
    /// Text after a `#`, up to the end of its line
    Comment(String),
    Newline,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Token::Word(ref w) => write!(f, "`{}`", w),
            Token::OpenBrace => f.write_str("`{`"),
            Token::CloseBrace => f.write_str("`}`"),
            Token::OpenBracket => f.write_str("`[`"),
            Token::CloseBracket => f.write_str("`]`"),
            Token::Semicolon => f.write_str("`;`"),
            Token::Comment(_) => f.write_str("comment"),
            Token::Newline => f.write_str("line break"),
        }
    }
}

/// A token and the 1-based line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r'
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !";#{}[]".contains(c)
}

fn blank(input: &str) -> IResult<&str, &str> {
    take_while(is_blank)(input)
}

fn comment(input: &str) -> IResult<&str, Token> {
    map(preceded(char('#'), take_while(|c: char| c != '\n')), |text: &str| {
        Token::Comment(text.trim_end_matches('\r').to_owned())
    })(input)
}

fn word(input: &str) -> IResult<&str, Token> {
    map(take_while1(is_word_char), |w: &str| Token::Word(w.to_owned()))(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Newline, char('\n')),
        value(Token::OpenBrace, char('{')),
        value(Token::CloseBrace, char('}')),
        value(Token::OpenBracket, char('[')),
        value(Token::CloseBracket, char(']')),
        value(Token::Semicolon, char(';')),
        comment,
        word,
    ))(input)
}

/// Split `input` into a flat token stream.
///
/// Fails only on characters no token can start with, such as a form feed.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    let mut line = 1;

    loop {
        if let Ok((after, _)) = blank(rest) {
            rest = after;
        }
        if rest.is_empty() {
            break;
        }

        match token(rest) {
            Ok((after, tok)) => {
                let newline = tok == Token::Newline;
                tokens.push(Spanned { token: tok, line });
                if newline {
                    line += 1;
                }
                rest = after;
            }
            Err(_) => {
                let bad = rest.chars().next().unwrap_or(' ');
                let snippet = input.lines().nth(line - 1).unwrap_or("");
                return Err(SyntaxError::new(
                    SyntaxErrorKind::UnexpectedToken(format!(
                        "unexpected character {:?}",
                        bad
                    )),
                    line,
                    snippet,
                ));
            }
        }
    }

    trace!("tokenized {} lines into {} tokens", line, tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    fn w(s: &str) -> Token {
        Token::Word(s.to_owned())
    }

    #[test]
    fn directive_line() {
        assert_eq!(
            kinds("  root: /var/www;   # served files\n"),
            vec![
                w("root:"),
                w("/var/www"),
                Token::Semicolon,
                Token::Comment(" served files".to_owned()),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn delimiters_split_words() {
        assert_eq!(
            kinds("location: /a[\n]"),
            vec![
                w("location:"),
                w("/a"),
                Token::OpenBracket,
                Token::Newline,
                Token::CloseBracket,
            ]
        );
        assert_eq!(
            kinds("server:{}"),
            vec![w("server:"), Token::OpenBrace, Token::CloseBrace]
        );
    }

    #[test]
    fn crlf_counts_as_one_line_break() {
        let tokens = tokenize("listen: 80;\r\nserver_name: a;\r\n").unwrap();

        assert_eq!(tokens[3].token, Token::Newline);
        assert_eq!(tokens[4], Spanned { token: w("server_name:"), line: 2 });
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn lines_are_tracked() {
        let tokens = tokenize("a\n\n# c\nb;").unwrap();
        let last = tokens.last().unwrap();

        assert_eq!(last.token, Token::Semicolon);
        assert_eq!(last.line, 4);
    }

    #[test]
    fn comment_swallows_delimiters() {
        assert_eq!(
            kinds("# } ] ; {\n"),
            vec![Token::Comment(" } ] ; {".to_owned()), Token::Newline]
        );
    }

    #[test]
    fn stray_control_character_is_rejected() {
        let err = tokenize("listen: 80;\nroot:\x0c/var;\n").unwrap_err();

        assert_eq!(err.line, 2);
        match err.kind {
            SyntaxErrorKind::UnexpectedToken(_) => (),
            other => panic!("{:?}", other),
        }
    }
}
