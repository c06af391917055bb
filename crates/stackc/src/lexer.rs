//! Hand-written lexer.
//!
//! Kept deliberately small: no error recovery, one diagnostic per failure.

use crate::error::ParseError;
use crate::pos::Pos;

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Ident(String),
    IntLit(String),
    FloatLit(String),
    StrLit(String),
    True,
    False,
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwReturn,
    KwInt,
    KwFloat,
    KwBool,
    KwString,
    KwVoid,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokKind,
    pub pos: Pos,
}

pub fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src).run()
}

struct Lexer {
    chars: Vec<char>,
    idx: usize,
    row: u32,
    col: u32,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self { chars: src.chars().collect(), idx: 0, row: 1, col: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn pos(&self) -> Pos {
        Pos::new(self.row, self.col)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError { pos: self.pos(), message: message.into() }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let pos = self.pos();
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokKind::Eof, pos });
                break;
            };

            if c.is_ascii_digit() {
                tokens.push(Token { kind: self.lex_number(), pos });
            } else if c == '"' {
                tokens.push(Token { kind: self.lex_string()?, pos });
            } else if c.is_alphabetic() || c == '_' {
                tokens.push(Token { kind: self.lex_ident_or_keyword(), pos });
            } else {
                tokens.push(Token { kind: self.lex_punct()?, pos });
            }
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> TokKind {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
            TokKind::FloatLit(text)
        } else {
            TokKind::IntLit(text)
        }
    }

    fn lex_string(&mut self) -> Result<TokKind, ParseError> {
        let start_pos = self.pos();
        self.advance(); // opening quote
        let mut text = String::from("\"");
        loop {
            match self.advance() {
                Some('"') => {
                    text.push('"');
                    break;
                }
                Some(c) => text.push(c),
                None => return Err(ParseError { pos: start_pos, message: "unterminated string literal".into() }),
            }
        }
        Ok(TokKind::StrLit(text))
    }

    fn lex_ident_or_keyword(&mut self) -> TokKind {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            text.push(self.advance().unwrap());
        }
        match text.as_str() {
            "true" => TokKind::True,
            "false" => TokKind::False,
            "if" => TokKind::KwIf,
            "else" => TokKind::KwElse,
            "while" => TokKind::KwWhile,
            "for" => TokKind::KwFor,
            "return" => TokKind::KwReturn,
            "int" => TokKind::KwInt,
            "float" => TokKind::KwFloat,
            "bool" => TokKind::KwBool,
            "string" => TokKind::KwString,
            "void" => TokKind::KwVoid,
            _ => TokKind::Ident(text),
        }
    }

    fn lex_punct(&mut self) -> Result<TokKind, ParseError> {
        let c = self.advance().unwrap();
        let two = |second: char| self.peek() == Some(second);
        Ok(match c {
            '(' => TokKind::LParen,
            ')' => TokKind::RParen,
            '{' => TokKind::LBrace,
            '}' => TokKind::RBrace,
            ',' => TokKind::Comma,
            ';' => TokKind::Semi,
            '+' => TokKind::Plus,
            '-' => TokKind::Minus,
            '*' => TokKind::Star,
            '/' => TokKind::Slash,
            '%' => TokKind::Percent,
            '=' if two('=') => {
                self.advance();
                TokKind::EqEq
            }
            '=' => TokKind::Assign,
            '!' if two('=') => {
                self.advance();
                TokKind::NotEq
            }
            '<' if two('=') => {
                self.advance();
                TokKind::Le
            }
            '<' => TokKind::Lt,
            '>' if two('=') => {
                self.advance();
                TokKind::Ge
            }
            '>' => TokKind::Gt,
            '&' if two('&') => {
                self.advance();
                TokKind::AndAnd
            }
            '&' => TokKind::Amp,
            '|' if two('|') => {
                self.advance();
                TokKind::OrOr
            }
            '|' => TokKind::Pipe,
            other => return Err(self.err(format!("unexpected character '{other}'"))),
        })
    }
}
