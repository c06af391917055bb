//! Hand-written recursive-descent parser producing the `ast::Node` tree the
//! rest of the crate operates on.

use crate::ast::{classify_literal, BinOp, Node, NodeKind};
use crate::error::ParseError;
use crate::lexer::{lex, TokKind, Token};
use crate::pos::Pos;

pub fn parse(src: &str) -> Result<Node, ParseError> {
    let tokens = lex(src)?;
    Parser { tokens, idx: 0 }.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    fn cur(&self) -> &TokKind {
        &self.tokens[self.idx].kind
    }

    fn pos(&self) -> Pos {
        self.tokens[self.idx].pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.idx].clone();
        if self.idx + 1 < self.tokens.len() {
            self.idx += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError { pos: self.pos(), message: message.into() }
    }

    fn expect(&mut self, kind: &TokKind) -> PResult<Token> {
        if self.cur() == kind {
            Ok(self.advance())
        } else {
            Err(self.err(format!("expected {kind:?}, found {:?}", self.cur())))
        }
    }

    fn at_type_keyword(&self) -> bool {
        matches!(
            self.cur(),
            TokKind::KwInt | TokKind::KwFloat | TokKind::KwBool | TokKind::KwString | TokKind::KwVoid
        )
    }

    fn parse_type_ref(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let name = match self.advance().kind {
            TokKind::KwInt => "int",
            TokKind::KwFloat => "float",
            TokKind::KwBool => "bool",
            TokKind::KwString => "string",
            TokKind::KwVoid => "void",
            other => return Err(ParseError { pos, message: format!("expected a type, found {other:?}") }),
        };
        Ok(Node::new(pos, NodeKind::TypeRef { name: name.to_owned() }))
    }

    fn parse_ident_name(&mut self) -> PResult<(String, Pos)> {
        let pos = self.pos();
        match self.advance().kind {
            TokKind::Ident(name) => Ok((name, pos)),
            other => Err(ParseError { pos, message: format!("expected identifier, found {other:?}") }),
        }
    }

    fn parse_program(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let mut statements = Vec::new();
        while *self.cur() != TokKind::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(Node::new(pos, NodeKind::StmtList { statements, program: true }))
    }

    fn parse_block(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.expect(&TokKind::LBrace)?;
        let mut statements = Vec::new();
        while *self.cur() != TokKind::RBrace {
            statements.push(self.parse_statement()?);
        }
        self.expect(&TokKind::RBrace)?;
        Ok(Node::new(pos, NodeKind::StmtList { statements, program: false }))
    }

    fn empty_stmt(&self, pos: Pos) -> Node {
        Node::new(pos, NodeKind::StmtList { statements: Vec::new(), program: false })
    }

    fn parse_statement(&mut self) -> PResult<Node> {
        match self.cur() {
            TokKind::LBrace => self.parse_block(),
            TokKind::KwIf => self.parse_if(),
            TokKind::KwWhile => self.parse_while(),
            TokKind::KwFor => self.parse_for(),
            TokKind::KwReturn => self.parse_return(),
            _ if self.at_type_keyword() => self.parse_type_led_statement(),
            TokKind::Ident(_) => self.parse_expr_statement(),
            other => Err(self.err(format!("unexpected token {other:?} at start of statement"))),
        }
    }

    /// A statement that begins with a type name: either a function
    /// declaration (`type ident (`) or a variable declaration.
    fn parse_type_led_statement(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let type_node = self.parse_type_ref()?;
        let (name, name_pos) = self.parse_ident_name()?;
        if *self.cur() == TokKind::LParen {
            self.parse_func_decl(pos, type_node, name)
        } else {
            self.parse_vars_decl_rest(pos, type_node, name, name_pos)
        }
    }

    fn parse_vars_decl_rest(
        &mut self,
        pos: Pos,
        type_node: Node,
        first_name: String,
        first_pos: Pos,
    ) -> PResult<Node> {
        let mut items = vec![self.parse_vars_decl_item(first_name, first_pos)?];
        while *self.cur() == TokKind::Comma {
            self.advance();
            let (name, name_pos) = self.parse_ident_name()?;
            items.push(self.parse_vars_decl_item(name, name_pos)?);
        }
        self.expect(&TokKind::Semi)?;
        Ok(Node::new(pos, NodeKind::VarsDecl { type_node: Box::new(type_node), items }))
    }

    fn parse_vars_decl_item(&mut self, name: String, pos: Pos) -> PResult<Node> {
        let ident = Node::new(pos, NodeKind::Ident { name: name.clone() });
        if *self.cur() == TokKind::Assign {
            self.advance();
            let value = self.parse_expr()?;
            Ok(Node::new(pos, NodeKind::Assign { target: Box::new(ident), value: Box::new(value) }))
        } else {
            Ok(ident)
        }
    }

    fn parse_func_decl(&mut self, pos: Pos, return_type: Node, name: String) -> PResult<Node> {
        self.expect(&TokKind::LParen)?;
        let mut params = Vec::new();
        if *self.cur() != TokKind::RParen {
            loop {
                let param_pos = self.pos();
                let type_node = self.parse_type_ref()?;
                let (param_name, _) = self.parse_ident_name()?;
                params.push(Node::new(
                    param_pos,
                    NodeKind::Param { type_node: Box::new(type_node), name: param_name },
                ));
                if *self.cur() == TokKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Node::new(
            pos,
            NodeKind::Func { return_type: Box::new(return_type), name, params, body: Box::new(body) },
        ))
    }

    fn parse_if(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance();
        self.expect(&TokKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokKind::RParen)?;
        let then_branch = self.parse_statement()?;
        let else_branch = if *self.cur() == TokKind::KwElse {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Node::new(
            pos,
            NodeKind::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch },
        ))
    }

    fn parse_while(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance();
        self.expect(&TokKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Node::new(pos, NodeKind::While { cond: Box::new(cond), body: Box::new(body) }))
    }

    fn parse_for(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance();
        self.expect(&TokKind::LParen)?;

        let init = if *self.cur() == TokKind::Semi {
            self.empty_stmt(self.pos())
        } else if self.at_type_keyword() {
            let decl_pos = self.pos();
            let type_node = self.parse_type_ref()?;
            let (name, name_pos) = self.parse_ident_name()?;
            let item = self.parse_vars_decl_item(name, name_pos)?;
            Node::new(decl_pos, NodeKind::VarsDecl { type_node: Box::new(type_node), items: vec![item] })
        } else {
            self.parse_assign_expr()?
        };
        self.expect(&TokKind::Semi)?;

        let cond = if *self.cur() == TokKind::Semi { None } else { Some(Box::new(self.parse_expr()?)) };
        self.expect(&TokKind::Semi)?;

        let step = if *self.cur() == TokKind::RParen { self.empty_stmt(self.pos()) } else { self.parse_assign_expr()? };
        self.expect(&TokKind::RParen)?;

        let body = self.parse_statement()?;
        Ok(Node::new(pos, NodeKind::For { init: Box::new(init), cond, step: Box::new(step), body: Box::new(body) }))
    }

    /// `ident = expr`, used for `for`'s init/step clauses (no trailing `;`).
    fn parse_assign_expr(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let (name, name_pos) = self.parse_ident_name()?;
        self.expect(&TokKind::Assign)?;
        let value = self.parse_expr()?;
        let target = Node::new(name_pos, NodeKind::Ident { name });
        Ok(Node::new(pos, NodeKind::Assign { target: Box::new(target), value: Box::new(value) }))
    }

    fn parse_return(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance();
        let value = self.parse_expr()?;
        self.expect(&TokKind::Semi)?;
        Ok(Node::new(pos, NodeKind::Return { value: Box::new(value) }))
    }

    /// An identifier-led statement: an assignment or a call expression.
    fn parse_expr_statement(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let expr = self.parse_expr()?;
        let node = if *self.cur() == TokKind::Assign {
            self.advance();
            let value = self.parse_expr()?;
            Node::new(pos, NodeKind::Assign { target: Box::new(expr), value: Box::new(value) })
        } else {
            expr
        };
        self.expect(&TokKind::Semi)?;
        Ok(node)
    }

    fn parse_expr(&mut self) -> PResult<Node> {
        self.parse_binary(0)
    }

    fn binop_for(kind: &TokKind) -> Option<(BinOp, u8)> {
        Some(match kind {
            TokKind::OrOr => (BinOp::Or, 0),
            TokKind::AndAnd => (BinOp::And, 1),
            TokKind::Pipe => (BinOp::BitOr, 2),
            TokKind::Amp => (BinOp::BitAnd, 3),
            TokKind::EqEq => (BinOp::Eq, 4),
            TokKind::NotEq => (BinOp::Ne, 4),
            TokKind::Lt => (BinOp::Lt, 5),
            TokKind::Gt => (BinOp::Gt, 5),
            TokKind::Le => (BinOp::Le, 5),
            TokKind::Ge => (BinOp::Ge, 5),
            TokKind::Plus => (BinOp::Add, 6),
            TokKind::Minus => (BinOp::Sub, 6),
            TokKind::Star => (BinOp::Mul, 7),
            TokKind::Slash => (BinOp::Div, 7),
            TokKind::Percent => (BinOp::Mod, 7),
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Node> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = Self::binop_for(self.cur()) {
            if prec < min_prec {
                break;
            }
            let pos = self.pos();
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Node::new(pos, NodeKind::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Node> {
        if *self.cur() == TokKind::Minus {
            let pos = self.pos();
            self.advance();
            let operand = self.parse_unary()?;
            let zero = Node::new(pos, NodeKind::Literal { text: "0".into(), value: classify_literal("0") });
            return Ok(Node::new(
                pos,
                NodeKind::BinOp { op: BinOp::Sub, lhs: Box::new(zero), rhs: Box::new(operand) },
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let primary = self.parse_primary()?;
        if *self.cur() == TokKind::LParen {
            self.advance();
            let mut args = Vec::new();
            if *self.cur() != TokKind::RParen {
                loop {
                    args.push(self.parse_expr()?);
                    if *self.cur() == TokKind::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(&TokKind::RParen)?;
            Ok(Node::new(pos, NodeKind::Call { callee: Box::new(primary), args }))
        } else {
            Ok(primary)
        }
    }

    fn parse_primary(&mut self) -> PResult<Node> {
        let pos = self.pos();
        match self.cur().clone() {
            TokKind::IntLit(text) => {
                self.advance();
                let value = classify_literal(&text);
                Ok(Node::new(pos, NodeKind::Literal { text, value }))
            }
            TokKind::FloatLit(text) => {
                self.advance();
                let value = classify_literal(&text);
                Ok(Node::new(pos, NodeKind::Literal { text, value }))
            }
            TokKind::StrLit(text) => {
                self.advance();
                let value = classify_literal(&text);
                Ok(Node::new(pos, NodeKind::Literal { text, value }))
            }
            TokKind::True => {
                self.advance();
                Ok(Node::new(pos, NodeKind::Literal { text: "true".into(), value: classify_literal("true") }))
            }
            TokKind::False => {
                self.advance();
                Ok(Node::new(pos, NodeKind::Literal { text: "false".into(), value: classify_literal("false") }))
            }
            TokKind::Ident(name) => {
                self.advance();
                Ok(Node::new(pos, NodeKind::Ident { name }))
            }
            TokKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokKind::RParen)?;
                Ok(inner)
            }
            other => Err(self.err(format!("unexpected token {other:?} in expression"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vars_decl_with_assign() {
        let ast = parse("int x; x = 1 + 2;").unwrap();
        let NodeKind::StmtList { statements, .. } = ast.kind else { panic!() };
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn parses_function_declaration() {
        let ast = parse("int square(int x) { return x * x; }").unwrap();
        let NodeKind::StmtList { statements, .. } = ast.kind else { panic!() };
        assert!(matches!(statements[0].kind, NodeKind::Func { .. }));
    }

    #[test]
    fn parses_if_else_and_call() {
        let ast = parse("if (1 < 2) { print(\"a\"); } else { print(\"b\"); }").unwrap();
        let NodeKind::StmtList { statements, .. } = ast.kind else { panic!() };
        assert!(matches!(statements[0].kind, NodeKind::If { .. }));
    }

    #[test]
    fn parses_for_with_all_clauses() {
        let ast = parse("for (int i = 0; i < 10; i = i + 1) { }").unwrap();
        let NodeKind::StmtList { statements, .. } = ast.kind else { panic!() };
        assert!(matches!(statements[0].kind, NodeKind::For { .. }));
    }
}
