//! Token cursor over the `MsSqlDialect` tokenizer output.
//!
//! Whitespace and comments are dropped up front. Prefix sigils that the
//! tokenizer may split off (`@`, `@@`, `#`, `##`) are glued back onto the word
//! that follows them so the parser always sees `@var` and `#temp` as a single
//! word.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer, Word};

use crate::error::ParseError;

/// Keywords that cannot be used as a bare alias or start an implicit alias.
const RESERVED: &[&str] = &[
    "ALTER", "AND", "APPLY", "AS", "BACKUP", "BEGIN", "BETWEEN", "BREAK", "BULK", "BY", "CASE",
    "CATCH", "CHECKPOINT", "CLOSE", "COLLATE", "COMMIT", "CONTINUE", "CREATE", "CROSS", "DBCC",
    "DEALLOCATE", "DECLARE", "DELETE", "DROP", "ELSE", "END", "ESCAPE", "EXCEPT", "EXEC", "EXECUTE",
    "FETCH", "FOR", "FROM", "FULL", "GO", "GOTO", "GROUP", "HAVING", "IF", "IN", "INNER", "INSERT",
    "INTERSECT", "INTO", "IS", "JOIN", "KILL", "LEFT", "LIKE", "MERGE", "NOT", "OFFSET", "ON",
    "OPEN", "OPTION", "OR", "ORDER", "OUTER", "OUTPUT", "PIVOT", "PRINT", "RAISERROR",
    "RECONFIGURE", "RESTORE", "RETURN", "REVERT", "RIGHT", "ROLLBACK", "SAVE", "SELECT", "SET",
    "SETUSER", "SHUTDOWN", "THEN", "THROW", "TRUNCATE", "UNION", "UNPIVOT", "UPDATE", "USE",
    "USING", "VALUES", "WAITFOR", "WHEN", "WHERE", "WHILE", "WITH",
];

/// Returns `true` if `word` (compared case-insensitively) is reserved.
pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

pub(crate) struct Cursor {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
}

impl Cursor {
    /// Tokenize `sql`, failing on the first tokenizer error.
    pub(crate) fn new(sql: &str) -> Result<Self, ParseError> {
        let dialect = MsSqlDialect {};
        let raw = Tokenizer::new(&dialect, sql).tokenize_with_location()?;

        let mut tokens: Vec<TokenWithSpan> = Vec::with_capacity(raw.len());
        let mut pending_sigil: Option<TokenWithSpan> = None;

        for token in raw {
            match &token.token {
                Token::Whitespace(_) => {
                    if let Some(sigil) = pending_sigil.take() {
                        tokens.push(sigil);
                    }
                }
                Token::EOF => {}
                Token::Word(word) if pending_sigil.is_some() && word.quote_style.is_none() => {
                    if let Some(sigil) = pending_sigil.take() {
                        let value = format!("{}{}", sigil.token, word.value);
                        tokens.push(TokenWithSpan {
                            token: Token::Word(Word {
                                value,
                                quote_style: None,
                                keyword: Keyword::NoKeyword,
                            }),
                            span: sigil.span,
                        });
                    }
                }
                _ if is_sigil(&token.token) => {
                    if let Some(previous) = pending_sigil.take() {
                        // `#` `#` from `##temp`
                        let joined = format!("{}{}", previous.token, token.token);
                        pending_sigil = Some(TokenWithSpan {
                            token: Token::Word(Word {
                                value: joined,
                                quote_style: None,
                                keyword: Keyword::NoKeyword,
                            }),
                            span: previous.span,
                        });
                    } else {
                        pending_sigil = Some(token);
                    }
                }
                _ => {
                    if let Some(sigil) = pending_sigil.take() {
                        tokens.push(sigil);
                    }
                    tokens.push(token);
                }
            }
        }
        if let Some(sigil) = pending_sigil.take() {
            tokens.push(sigil);
        }

        Ok(Self { tokens, pos: 0 })
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    pub(crate) fn peek_nth(&self, n: usize) -> &Token {
        self.tokens
            .get(self.pos + n)
            .map_or(&Token::EOF, |t| &t.token)
    }

    /// Advance and return the consumed token.
    pub(crate) fn next_token(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_eof() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn rewind(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// The unquoted word at offset `n`, if any.
    pub(crate) fn peek_nth_word(&self, n: usize) -> Option<&Word> {
        match self.peek_nth(n) {
            Token::Word(word) => Some(word),
            _ => None,
        }
    }

    /// Whether the token at offset `n` is the unquoted keyword `keyword`.
    pub(crate) fn peek_nth_keyword(&self, n: usize, keyword: &str) -> bool {
        self.peek_nth_word(n)
            .is_some_and(|w| w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword))
    }

    pub(crate) fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek_nth_keyword(0, keyword)
    }

    pub(crate) fn peek_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| self.peek_keyword(kw))
    }

    /// The current token as an upper-cased unquoted keyword.
    pub(crate) fn peek_keyword_upper(&self) -> Option<String> {
        self.peek_nth_word(0)
            .filter(|w| w.quote_style.is_none())
            .map(|w| w.value.to_ascii_uppercase())
    }

    /// Consume `keyword` if it is next.
    pub(crate) fn parse_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the whole keyword sequence if it is next, otherwise nothing.
    pub(crate) fn parse_keywords(&mut self, keywords: &[&str]) -> bool {
        let matches = keywords
            .iter()
            .enumerate()
            .all(|(i, kw)| self.peek_nth_keyword(i, kw));
        if matches {
            self.pos += keywords.len();
        }
        matches
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.parse_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    /// Consume `token` if it is next.
    pub(crate) fn consume(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.consume(token) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{token}`")))
        }
    }

    /// Skip a balanced parenthesised group starting at the current `(`.
    pub(crate) fn skip_parenthesized(&mut self) -> Result<(), ParseError> {
        self.expect(&Token::LParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_token() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::EOF => return Err(self.error("unbalanced parenthesis")),
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn location(&self) -> Location {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(Location { line: 1, column: 1 }, |t| t.span.start)
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        let location = self.location();
        ParseError::new(message, location.line, location.column)
    }

    /// "expected X, found Y" at the current token.
    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.peek() {
            Token::EOF => "end of input".to_string(),
            token => format!("`{token}`"),
        };
        self.error(format!("expected {expected}, found {found}"))
    }
}

fn is_sigil(token: &Token) -> bool {
    let text = token.to_string();
    !text.is_empty() && text.chars().all(|c| c == '@' || c == '#')
}
