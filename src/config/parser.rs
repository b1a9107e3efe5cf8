//! Directive parser
//!
//! A small recursive-descent parser over the token stream from `lexer`.
//! The dialect looks like this:
//!
//! ```text
//! server: {                       # only a comment may follow a `{`
//!     listen: 127.0.0.1:8080;
//!     server_name: example.com;
//!     location: /images [
//!         root: /var/www;         # one directive per line, ended by `;`
//!         auto_index: on;
//!     ]
//! }
//! ```
//!
//! Each block consumes tokens up to its own closing delimiter, so a closer of
//! the wrong kind or running out of input is caught where it happens. The
//! first problem aborts the whole parse; there are no partial results.

use super::lexer::{tokenize, Spanned, Token};
use super::rules::{LocationRule, ServerRule, ServerSetting};
use super::LocationBlock;
use crate::errors::{Result, SyntaxError, SyntaxErrorKind};

const SERVER: &str = "server:";
const LOCATION: &str = "location:";
const REQUIRED: [&str; 2] = ["listen:", "server_name:"];

type SyntaxResult<T> = ::std::result::Result<T, SyntaxError>;

/// Everything parsed out of one server block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerData {
    /// Server-scope directives, in source order
    pub settings: Vec<ServerSetting>,
    /// Location blocks by path, in source order
    pub locations: Vec<(String, LocationBlock)>,
}

/// Parse a configuration holding one or more `server: { ... }` blocks.
pub fn parse_config(text: &str) -> Result<Vec<ServerData>> {
    let mut parser = Parser::new(text)?;
    let mut servers = Vec::new();

    loop {
        parser.skip_blank_lines();
        if parser.at_end() {
            break;
        }
        parser.server_keyword(true)?;
        servers.push(parser.server_block()?);
        parser.end_of_line(None)?;
    }

    if servers.is_empty() {
        return Err(parser.error(SyntaxErrorKind::MissingDirective(SERVER), 1).into());
    }
    Ok(servers)
}

/// Parse a single server block. The leading `server:` keyword is optional.
pub fn parse_server_directive(text: &str) -> Result<ServerData> {
    let mut parser = Parser::new(text)?;

    parser.skip_blank_lines();
    parser.server_keyword(false)?;
    let data = parser.server_block()?;
    parser.end_of_line(None)?;
    parser.expect_end()?;

    Ok(data)
}

/// Parse a single `location: <path> [ ... ]` block.
pub fn parse_location_directive(text: &str) -> Result<(String, LocationBlock)> {
    let mut parser = Parser::new(text)?;

    parser.skip_blank_lines();
    let line = parser.line();
    let glued = match parser.peek().cloned() {
        Some(Token::Word(ref w)) if w.starts_with(LOCATION) => {
            parser.pos += 1;
            w[LOCATION.len()..].to_owned()
        }
        other => return Err(parser.unexpected(other.as_ref(), "`location:`", line).into()),
    };
    let location = parser.location_block(&glued, line)?;
    parser.end_of_line(None)?;
    parser.expect_end()?;

    Ok(location)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> SyntaxResult<Parser<'a>> {
        Ok(Parser {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Line of the next token, or of the last one at end of input
    fn line(&self) -> usize {
        self.tokens.get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn error(&self, kind: SyntaxErrorKind, line: usize) -> SyntaxError {
        let snippet = self.source.lines().nth(line.saturating_sub(1)).unwrap_or("");
        SyntaxError::new(kind, line, snippet)
    }

    fn unexpected(&self, found: Option<&Token>, expected: &str, line: usize) -> SyntaxError {
        let detail = match found {
            Some(tok) => format!("expected {}, found {}", expected, tok),
            None => format!("expected {}, found end of input", expected),
        };
        self.error(SyntaxErrorKind::UnexpectedToken(detail), line)
    }

    fn skip_blank_lines(&mut self) {
        while let Some(&Token::Newline) | Some(&Token::Comment(_)) = self.peek() {
            self.pos += 1;
        }
    }

    fn expect_end(&mut self) -> SyntaxResult<()> {
        self.skip_blank_lines();
        if self.at_end() {
            return Ok(());
        }
        let line = self.line();
        Err(self.unexpected(self.peek(), "end of input", line))
    }

    fn server_keyword(&mut self, required: bool) -> SyntaxResult<()> {
        match self.peek() {
            Some(Token::Word(w)) if w == SERVER => {
                self.pos += 1;
                Ok(())
            }
            found if required => {
                let line = self.line();
                Err(self.unexpected(found, "`server:`", line))
            }
            _ => Ok(()),
        }
    }

    /// What may follow a directive or a block's closer on its line: an
    /// optional comment, then a line break, the end of input, or the
    /// enclosing block's closer (left in place for the caller).
    fn end_of_line(&mut self, closer: Option<&Token>) -> SyntaxResult<()> {
        if let Some(&Token::Comment(_)) = self.peek() {
            self.pos += 1;
        }

        let line = self.line();
        match self.peek().cloned() {
            None => Ok(()),
            Some(Token::Newline) => {
                self.pos += 1;
                Ok(())
            }
            Some(ref tok) if Some(tok) == closer => Ok(()),
            Some(ref tok) => Err(self.error(
                SyntaxErrorKind::UnexpectedToken(format!(
                    "unexpected {} after the end of a directive",
                    tok
                )),
                line,
            )),
        }
    }

    /// Consume a block's opening delimiter and the rest of its line, which
    /// may hold nothing but a comment. Returns the line the block opens on.
    fn open_block(&mut self, open: Token, delimiter: char) -> SyntaxResult<usize> {
        let line = self.line();
        match self.peek() {
            Some(tok) if *tok == open => self.pos += 1,
            found => return Err(self.unexpected(found, &open.to_string(), line)),
        }

        if let Some(&Token::Comment(_)) = self.peek() {
            self.pos += 1;
        }
        match self.peek() {
            Some(&Token::Newline) => {
                self.pos += 1;
                Ok(line)
            }
            None => Err(self.error(SyntaxErrorKind::UnterminatedBlock(delimiter), line)),
            Some(tok) => Err(self.error(
                SyntaxErrorKind::UnexpectedToken(format!(
                    "unexpected {} on the same line as the opening {}",
                    tok, open
                )),
                line,
            )),
        }
    }

    /// Fail unless every required directive name appears somewhere in the
    /// block starting at the current position, nested locations included.
    fn require_directives(&self, line: usize) -> SyntaxResult<()> {
        let mut depth = 0usize;
        let mut body = Vec::new();

        for spanned in &self.tokens[self.pos..] {
            match spanned.token {
                Token::OpenBrace => depth += 1,
                Token::CloseBrace if depth == 0 => break,
                Token::CloseBrace => depth -= 1,
                Token::Word(ref w) => body.push(w.as_str()),
                _ => (),
            }
        }

        for name in REQUIRED.iter() {
            if !body.iter().any(|w| w.starts_with(name)) {
                return Err(self.error(SyntaxErrorKind::MissingDirective(*name), line));
            }
        }
        Ok(())
    }

    fn server_block(&mut self) -> SyntaxResult<ServerData> {
        let open_line = self.open_block(Token::OpenBrace, '{')?;
        self.require_directives(open_line)?;

        let mut data = ServerData::default();
        loop {
            let Spanned { token, line } = match self.tokens.get(self.pos) {
                Some(spanned) => spanned.clone(),
                None => {
                    return Err(self.error(SyntaxErrorKind::UnterminatedBlock('{'), open_line))
                }
            };
            self.pos += 1;

            match token {
                Token::Newline | Token::Comment(_) => (),
                Token::CloseBrace => break,
                Token::Word(ref w) if w.starts_with(LOCATION) => {
                    let (path, location) = self.location_block(&w[LOCATION.len()..], line)?;
                    self.end_of_line(Some(&Token::CloseBrace))?;

                    if data.locations.iter().any(|&(ref p, _)| *p == path) {
                        return Err(self.error(
                            SyntaxErrorKind::InvalidValue(format!(
                                "location `{}` is declared twice",
                                path
                            )),
                            line,
                        ));
                    }
                    data.locations.push((path, location));
                }
                Token::Word(ref w) => self.server_statement(w, line, &mut data)?,
                ref other => {
                    return Err(self.unexpected(Some(other), "a directive or `}`", line))
                }
            }
        }

        debug!("parsed server block at line {}: {} settings, {} locations",
               open_line, data.settings.len(), data.locations.len());
        Ok(data)
    }

    /// Collect the words of a directive up to its `;`. Returns `None`, with
    /// the terminator left unconsumed, if anything else shows up first.
    fn directive_args(&mut self, glued: &str) -> Option<Vec<String>> {
        let mut args = Vec::new();
        if !glued.is_empty() {
            args.push(glued.to_owned());
        }

        loop {
            match self.peek() {
                Some(Token::Word(w)) => {
                    args.push(w.clone());
                    self.pos += 1;
                }
                Some(Token::Semicolon) => {
                    self.pos += 1;
                    return Some(args);
                }
                _ => return None,
            }
        }
    }

    fn server_statement(&mut self, name: &str, line: usize, data: &mut ServerData)
                        -> SyntaxResult<()>
    {
        let (rule, glued) = match ServerRule::lookup(name) {
            Some((rule, glued)) => (Some(rule), glued),
            None => (None, ""),
        };

        let args = match self.directive_args(glued) {
            Some(args) => args,
            None => {
                warn!("line {}: skipping `{}`, which has no terminating `;`", line, name);
                self.skip_line();
                return Ok(());
            }
        };
        self.end_of_line(Some(&Token::CloseBrace))?;

        match rule {
            Some(rule) => {
                let setting = rule.parse(&args)
                    .map_err(|msg| self.error(SyntaxErrorKind::InvalidValue(msg), line))?;
                data.settings.push(setting);
            }
            None => warn!("line {}: ignoring unknown directive `{}`", line, name),
        }
        Ok(())
    }

    /// Drop the rest of the current line, stopping short of a `}`.
    fn skip_line(&mut self) {
        loop {
            match self.peek() {
                None | Some(&Token::CloseBrace) => return,
                Some(&Token::Newline) => {
                    self.pos += 1;
                    return;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Parse a location block whose `location:` keyword, starting at `line`,
    /// has just been consumed. `glued` is whatever followed the keyword in
    /// the same word.
    fn location_block(&mut self, glued: &str, line: usize)
                      -> SyntaxResult<(String, LocationBlock)>
    {
        let path = if !glued.is_empty() {
            glued.to_owned()
        } else {
            match self.peek().cloned() {
                Some(Token::Word(w)) => {
                    self.pos += 1;
                    w
                }
                Some(Token::OpenBracket) => {
                    return Err(self.error(
                        SyntaxErrorKind::InvalidValue("empty location path".to_owned()),
                        line,
                    ))
                }
                other => return Err(self.unexpected(other.as_ref(), "a location path", line)),
            }
        };

        if let Some(&Token::Word(_)) = self.peek() {
            return Err(self.error(
                SyntaxErrorKind::UnexpectedToken(format!(
                    "location path `{}` is followed by another word; paths cannot \
                     contain spaces",
                    path
                )),
                line,
            ));
        }
        let open_line = self.open_block(Token::OpenBracket, '[')?;

        let mut location = LocationBlock {
            path: path.clone(),
            ..Default::default()
        };
        loop {
            let Spanned { token, line } = match self.tokens.get(self.pos) {
                Some(spanned) => spanned.clone(),
                None => {
                    return Err(self.error(SyntaxErrorKind::UnterminatedBlock('['), open_line))
                }
            };
            self.pos += 1;

            match token {
                Token::Newline | Token::Comment(_) => (),
                Token::CloseBracket => break,
                Token::Word(ref w) => self.location_statement(w, line, &mut location)?,
                ref other => {
                    return Err(self.unexpected(Some(other), "a location directive or `]`", line))
                }
            }
        }

        debug!("parsed location `{}` at line {}", path, open_line);
        Ok((path, location))
    }

    fn location_statement(&mut self, name: &str, line: usize, location: &mut LocationBlock)
                          -> SyntaxResult<()>
    {
        let (rule, glued) = LocationRule::lookup(name).ok_or_else(|| {
            self.error(
                SyntaxErrorKind::UnexpectedToken(format!(
                    "unknown location directive `{}`",
                    name
                )),
                line,
            )
        })?;

        let args = match self.directive_args(glued) {
            Some(args) => args,
            None => {
                let found = self.peek().cloned();
                return Err(self.unexpected(found.as_ref(), "`;`", line));
            }
        };
        self.end_of_line(Some(&Token::CloseBracket))?;

        rule.apply(&args, location)
            .map_err(|msg| self.error(SyntaxErrorKind::InvalidValue(msg), line))
    }
}
