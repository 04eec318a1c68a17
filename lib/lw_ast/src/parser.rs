//! Recursive descent parser building a [`Program`] out of tokens.
//!
//! Grammar overview:
//!
//! ```text
//! program   := class* EOF
//! class     := "class" IDENT ("extends" IDENT)? "{" member* "}"
//! member    := ("public" | "static")* type IDENT ( ";" | "(" params ")" body )
//! body      := "{" (local | stmt)* "}"
//! stmt      := "{" stmt* "}" | IDENT "=" expr ";" | IDENT "[" expr "]" "=" expr ";"
//!            | "if" "(" expr ")" stmt ("else" stmt)? | "while" "(" expr ")" stmt
//!            | "System" "." "out" "." "println" "(" expr ")" ";"
//!            | "return" expr? ";" | "break" ";" | "continue" ";" | call ";"
//! ```

use crate::ast::{BinOp, Class, Expr, Method, Program, Stmt, StmtKind, Type, UnOp, VarDecl};
use crate::errors::{AstError, AstResult};
use crate::lexer::{Token, TokenKind};
use crate::{Loc, NodeId};

/// Maximum number of nested statements and expressions.
pub const MAX_DEPTH: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    depth: usize,
}

impl Parser {
    /// Builds a parser on a token vector, as returned by
    /// [`crate::lexer::tokenize`] (it must end with an `Eof` token).
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: 0,
            depth: 0,
        }
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .or_else(|| self.tokens.last())
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn loc(&self) -> Loc {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or_else(Loc::start, |t| t.loc)
    }

    fn error<T>(&self, expected: &str) -> AstResult<T> {
        Err(AstError::Parsing {
            loc: self.loc(),
            expected: expected.to_string(),
            found: self.peek().to_string(),
        })
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), TokenKind::Punct(q) if *q == p)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn is_ident(&self, name: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(n) if n == name)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> AstResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            self.error(&format!("`{p}`"))
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> AstResult<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            self.error(&format!("keyword `{kw}`"))
        }
    }

    fn expect_ident(&mut self) -> AstResult<String> {
        if let TokenKind::Ident(name) = self.peek() {
            let name = name.clone();
            self.pos += 1;
            Ok(name)
        } else {
            self.error("identifier")
        }
    }

    // runs a parsing function one nesting level deeper
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> AstResult<T>) -> AstResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(AstError::TooDeep {
                loc: self.loc(),
                limit: MAX_DEPTH,
            });
        }
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Parses a whole program.
    ///
    /// # Errors
    ///
    /// Returns an [`AstError::Parsing`] error at the first token that
    /// does not match the grammar, or an [`AstError::TooDeep`] error if
    /// statements or expressions are nested more than [`MAX_DEPTH`]
    /// levels.
    pub fn program(mut self) -> AstResult<Program> {
        let mut classes = Vec::new();
        while *self.peek() != TokenKind::Eof {
            classes.push(self.class()?);
        }
        log::debug!("parsed {} classes", classes.len());
        Ok(Program { classes })
    }

    fn class(&mut self) -> AstResult<Class> {
        let loc = self.loc();
        self.expect_keyword("class")?;
        let name = self.expect_ident()?;
        let parent = if self.eat_keyword("extends") {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect_punct("{")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.eat_punct("}") {
            let member_loc = self.loc();
            let mut is_static = false;
            loop {
                if self.eat_keyword("static") {
                    is_static = true;
                } else if !self.eat_keyword("public") {
                    break;
                }
            }
            let typ = self.typ()?;
            let member_name = self.expect_ident()?;
            if self.eat_punct(";") {
                fields.push(VarDecl {
                    typ,
                    name: member_name,
                    loc: member_loc,
                });
            } else {
                methods.push(self.method(member_name, typ, is_static, member_loc)?);
            }
        }

        Ok(Class {
            name,
            parent,
            fields,
            methods,
            loc,
        })
    }

    fn method(&mut self, name: String, ret: Type, is_static: bool, loc: Loc) -> AstResult<Method> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.eat_punct(")") {
            loop {
                let param_loc = self.loc();
                let typ = self.typ()?;
                let param_name = self.expect_ident()?;
                params.push(VarDecl {
                    typ,
                    name: param_name,
                    loc: param_loc,
                });
                if self.eat_punct(")") {
                    break;
                }
                self.expect_punct(",")?;
            }
        }

        self.expect_punct("{")?;
        let mut locals = Vec::new();
        let mut body = Vec::new();
        while !self.eat_punct("}") {
            if self.at_local_decl() {
                let decl_loc = self.loc();
                let typ = self.typ()?;
                let local_name = self.expect_ident()?;
                self.expect_punct(";")?;
                locals.push(VarDecl {
                    typ,
                    name: local_name,
                    loc: decl_loc,
                });
            } else {
                body.push(self.stmt()?);
            }
        }

        Ok(Method {
            name,
            is_static,
            ret,
            params,
            locals,
            body,
            loc,
        })
    }

    fn at_local_decl(&self) -> bool {
        match self.peek() {
            TokenKind::Keyword(kw) => matches!(*kw, "int" | "boolean" | "String"),
            TokenKind::Ident(_) => matches!(self.peek_at(1), TokenKind::Ident(_)),
            _ => false,
        }
    }

    fn typ(&mut self) -> AstResult<Type> {
        if self.eat_keyword("int") {
            if self.eat_punct("[") {
                self.expect_punct("]")?;
                Ok(Type::IntArray)
            } else {
                Ok(Type::Int)
            }
        } else if self.eat_keyword("boolean") {
            Ok(Type::Boolean)
        } else if self.eat_keyword("void") {
            Ok(Type::Void)
        } else if self.eat_keyword("String") {
            self.expect_punct("[")?;
            self.expect_punct("]")?;
            Ok(Type::StringArray)
        } else if matches!(self.peek(), TokenKind::Ident(_)) {
            Ok(Type::Class(self.expect_ident()?))
        } else {
            self.error("type")
        }
    }

    fn stmt(&mut self) -> AstResult<Stmt> {
        let loc = self.loc();
        let id = self.fresh_id();
        let kind = self.nested(Self::stmt_kind)?;
        Ok(Stmt { id, loc, kind })
    }

    fn stmt_kind(&mut self) -> AstResult<StmtKind> {
        let loc = self.loc();
        let kind = if self.eat_punct("{") {
            let mut stmts = Vec::new();
            while !self.eat_punct("}") {
                stmts.push(self.stmt()?);
            }
            StmtKind::Block(stmts)
        } else if self.eat_keyword("if") {
            self.expect_punct("(")?;
            let cond = self.expr()?;
            self.expect_punct(")")?;
            let then_branch = Box::new(self.stmt()?);
            let else_branch = if self.eat_keyword("else") {
                Some(Box::new(self.stmt()?))
            } else {
                None
            };
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            }
        } else if self.eat_keyword("while") {
            self.expect_punct("(")?;
            let cond = self.expr()?;
            self.expect_punct(")")?;
            let body = Box::new(self.stmt()?);
            StmtKind::While { cond, body }
        } else if self.eat_keyword("return") {
            let value = if self.is_punct(";") {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect_punct(";")?;
            StmtKind::Return(value)
        } else if self.eat_keyword("break") {
            self.expect_punct(";")?;
            StmtKind::Break
        } else if self.eat_keyword("continue") {
            self.expect_punct(";")?;
            StmtKind::Continue
        } else if self.is_ident("System")
            && matches!(self.peek_at(1), TokenKind::Punct("."))
            && matches!(self.peek_at(2), TokenKind::Ident(n) if n == "out")
        {
            self.pos += 3;
            self.expect_punct(".")?;
            match self.expect_ident()?.as_str() {
                "println" => (),
                _ => return self.error("`println`"),
            }
            self.expect_punct("(")?;
            let value = self.expr()?;
            self.expect_punct(")")?;
            self.expect_punct(";")?;
            StmtKind::Print(value)
        } else if matches!(self.peek(), TokenKind::Ident(_))
            && matches!(self.peek_at(1), TokenKind::Punct("=" | "["))
        {
            let target = self.expect_ident()?;
            if self.eat_punct("[") {
                let index = self.expr()?;
                self.expect_punct("]")?;
                self.expect_punct("=")?;
                let value = self.expr()?;
                self.expect_punct(";")?;
                StmtKind::ArrayAssign {
                    target,
                    index,
                    value,
                }
            } else {
                self.expect_punct("=")?;
                let value = self.expr()?;
                self.expect_punct(";")?;
                StmtKind::Assign { target, value }
            }
        } else {
            let call = self.expr()?;
            if !matches!(call, Expr::Call { .. }) {
                return Err(AstError::Parsing {
                    loc,
                    expected: "statement".to_string(),
                    found: "expression".to_string(),
                });
            }
            self.expect_punct(";")?;
            StmtKind::Call(call)
        };
        Ok(kind)
    }

    /// Parses an expression.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed expressions.
    pub fn expr(&mut self) -> AstResult<Expr> {
        self.nested(|p| p.binary(0))
    }

    // Binary operators by increasing precedence level.
    const LEVELS: &'static [&'static [(&'static str, BinOp)]] = &[
        &[("||", BinOp::Or)],
        &[("&&", BinOp::And)],
        &[("==", BinOp::Eq), ("!=", BinOp::Ne)],
        &[
            ("<", BinOp::Lt),
            ("<=", BinOp::Le),
            (">", BinOp::Gt),
            (">=", BinOp::Ge),
        ],
        &[("+", BinOp::Add), ("-", BinOp::Sub)],
        &[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)],
    ];

    fn binary(&mut self, level: usize) -> AstResult<Expr> {
        let Some(ops) = Self::LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        'outer: loop {
            for (p, op) in ops.iter() {
                if self.eat_punct(p) {
                    let rhs = self.binary(level + 1)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn unary(&mut self) -> AstResult<Expr> {
        if self.eat_punct("!") {
            Ok(Expr::Unary(UnOp::Not, Box::new(self.nested(Self::unary)?)))
        } else if self.eat_punct("-") {
            Ok(Expr::Unary(UnOp::Neg, Box::new(self.nested(Self::unary)?)))
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> AstResult<Expr> {
        let mut e = self.primary()?;
        loop {
            if self.eat_punct("[") {
                let index = self.expr()?;
                self.expect_punct("]")?;
                e = Expr::Index(Box::new(e), Box::new(index));
            } else if self.eat_punct(".") {
                let name = self.expect_ident()?;
                if name == "length" && !self.is_punct("(") {
                    e = Expr::Length(Box::new(e));
                    continue;
                }
                self.expect_punct("(")?;
                let mut args = Vec::new();
                if !self.eat_punct(")") {
                    loop {
                        args.push(self.expr()?);
                        if self.eat_punct(")") {
                            break;
                        }
                        self.expect_punct(",")?;
                    }
                }
                e = Expr::Call {
                    receiver: Box::new(e),
                    method: name,
                    args,
                };
            } else {
                return Ok(e);
            }
        }
    }

    fn primary(&mut self) -> AstResult<Expr> {
        let loc = self.loc();
        match self.peek().clone() {
            TokenKind::Int(lit) => {
                self.pos += 1;
                lit.parse()
                    .map(Expr::Int)
                    .map_err(|_| AstError::IntOverflow { loc, literal: lit })
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                Ok(Expr::Var(name))
            }
            TokenKind::Keyword("true") => {
                self.pos += 1;
                Ok(Expr::Bool(true))
            }
            TokenKind::Keyword("false") => {
                self.pos += 1;
                Ok(Expr::Bool(false))
            }
            TokenKind::Keyword("this") => {
                self.pos += 1;
                Ok(Expr::This)
            }
            TokenKind::Keyword("new") => {
                self.pos += 1;
                if self.eat_keyword("int") {
                    self.expect_punct("[")?;
                    let len = self.expr()?;
                    self.expect_punct("]")?;
                    Ok(Expr::NewArray(Box::new(len)))
                } else {
                    let class = self.expect_ident()?;
                    self.expect_punct("(")?;
                    self.expect_punct(")")?;
                    Ok(Expr::NewObject(class))
                }
            }
            TokenKind::Punct("(") => {
                self.pos += 1;
                let e = self.expr()?;
                self.expect_punct(")")?;
                Ok(e)
            }
            _ => self.error("expression"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use super::MAX_DEPTH;
    use crate::errors::AstError;
    use crate::{parse, Loc, NodeId};

    const FACTORIAL: &str = r"
        class Factorial {
            public static void main(String[] args) {
                System.out.println(new Fac().compute(10));
            }
        }

        class Fac {
            int acc;

            public int compute(int num) {
                int r;
                Fac self;
                r = 1;
                while (0 < num) {
                    r = r * num;
                    num = num - 1;
                }
                return r;
            }
        }
    ";

    #[test]
    fn parse_classes_and_methods() {
        let program = parse(FACTORIAL).unwrap();
        assert_eq!(program.classes.len(), 2);
        assert_eq!(program.nb_methods(), 2);

        let (class, method) = program.iter_methods().nth(1).unwrap();
        assert_eq!(method.descriptor(class), "Fac.compute");
        assert_eq!(class.fields.len(), 1);
        assert_eq!(method.params.len(), 1);
        assert_eq!(method.locals.len(), 2);
        assert_eq!(method.locals[1].typ, Type::Class("Fac".to_string()));
        assert_eq!(method.body.len(), 3);
        assert!(program.classes[0].methods[0].is_static);
    }

    #[test]
    fn node_ids_follow_program_order() {
        let program = parse(FACTORIAL).unwrap();
        let ids: Vec<NodeId> = program
            .iter_methods()
            .flat_map(|(_, m)| m.statements())
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, (0..ids.len() as u32).map(NodeId).collect::<Vec<_>>());
    }

    #[test]
    fn statement_locations() {
        let program = parse("class A {\n  int f() {\n    x = 1;\n  }\n}").unwrap();
        assert_eq!(program.classes[0].methods[0].body[0].loc, Loc { line: 3, col: 5 });
    }

    #[test]
    fn precedence() {
        let program = parse("class A { int f() { x = a + b * c < d && !e; } }").unwrap();
        let StmtKind::Assign { value, .. } = &program.classes[0].methods[0].body[0].kind else {
            panic!("assignment expected");
        };
        let Expr::Binary(BinOp::And, lhs, rhs) = value else {
            panic!("conjunction expected");
        };
        assert!(matches!(**rhs, Expr::Unary(UnOp::Not, _)));
        let Expr::Binary(BinOp::Lt, sum, _) = &**lhs else {
            panic!("comparison expected");
        };
        assert!(matches!(&**sum, Expr::Binary(BinOp::Add, _, p) if matches!(**p, Expr::Binary(BinOp::Mul, _, _))));
    }

    #[test]
    fn dangling_else_binds_innermost() {
        let program = parse("class A { int f() { if (a) if (b) x = 1; else x = 2; } }").unwrap();
        let StmtKind::If {
            then_branch,
            else_branch,
            ..
        } = &program.classes[0].methods[0].body[0].kind
        else {
            panic!("if expected");
        };
        assert!(else_branch.is_none());
        assert!(matches!(
            then_branch.kind,
            StmtKind::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn expression_statement_must_be_a_call() {
        match parse("class A { int f() { a + 1; } }") {
            Err(AstError::Parsing { loc, .. }) => assert_eq!(loc, Loc { line: 1, col: 21 }),
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[test]
    fn missing_semicolon() {
        assert!(matches!(
            parse("class A { int f() { return x } }"),
            Err(AstError::Parsing { .. })
        ));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let ifs = format!(
            "class T {{ int m() {{ {} x = 1; return x; }} }}",
            "if (c) ".repeat(5000)
        );
        match parse(&ifs) {
            Err(AstError::TooDeep { loc, limit }) => {
                assert_eq!(loc.line, 1);
                assert_eq!(limit, MAX_DEPTH);
            }
            res => panic!("unexpected result: {res:?}"),
        }

        let parens = format!(
            "class T {{ int m() {{ x = {}1{}; }} }}",
            "(".repeat(20000),
            ")".repeat(20000)
        );
        assert!(matches!(parse(&parens), Err(AstError::TooDeep { .. })));

        let negs = format!("class T {{ int m() {{ x = {}1; }} }}", "-".repeat(20000));
        assert!(matches!(parse(&negs), Err(AstError::TooDeep { .. })));

        let indexes = format!(
            "class T {{ int m() {{ x = {}0{}; }} }}",
            "a[".repeat(20000),
            "]".repeat(20000)
        );
        assert!(matches!(parse(&indexes), Err(AstError::TooDeep { .. })));
    }

    #[test]
    fn nesting_below_limit() {
        let ifs = format!(
            "class T {{ int m() {{ {} x = 1; return x; }} }}",
            "if (c) ".repeat(100)
        );
        let program = parse(&ifs).unwrap();
        assert_eq!(program.classes[0].methods[0].statements().len(), 102);
    }

    #[test]
    fn integer_overflow() {
        assert!(matches!(
            parse("class A { int f() { x = 99999999999999999999; } }"),
            Err(AstError::IntOverflow { .. })
        ));
    }
}
