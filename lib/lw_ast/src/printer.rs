//! Source-like pretty printing of syntax trees.

use crate::ast::{BinOp, Expr, Method, Program, Stmt, StmtKind, Type, UnOp};
use std::fmt;
use std::fmt::Write;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::IntArray => write!(f, "int[]"),
            Self::Boolean => write!(f, "boolean"),
            Self::Void => write!(f, "void"),
            Self::StringArray => write!(f, "String[]"),
            Self::Class(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Not => write!(f, "!"),
            Self::Neg => write!(f, "-"),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        };
        write!(f, "{s}")
    }
}

// Nested binary expressions are always parenthesized, precedence is
// not reconstructed.
fn fmt_operand(e: &Expr, f: &mut fmt::Formatter) -> fmt::Result {
    if matches!(e, Expr::Binary(..)) {
        write!(f, "({e})")
    } else {
        write!(f, "{e}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Var(name) => write!(f, "{name}"),
            Self::This => write!(f, "this"),
            Self::Unary(op, e) => {
                write!(f, "{op}")?;
                fmt_operand(e, f)
            }
            Self::Binary(op, e1, e2) => {
                fmt_operand(e1, f)?;
                write!(f, " {op} ")?;
                fmt_operand(e2, f)
            }
            Self::Index(a, i) => {
                fmt_operand(a, f)?;
                write!(f, "[{i}]")
            }
            Self::Length(a) => {
                fmt_operand(a, f)?;
                write!(f, ".length")
            }
            Self::Call {
                receiver,
                method,
                args,
            } => {
                fmt_operand(receiver, f)?;
                write!(f, ".{method}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::NewArray(len) => write!(f, "new int[{len}]"),
            Self::NewObject(class) => write!(f, "new {class}()"),
        }
    }
}

/// One-line rendering of a statement: the whole statement for simple
/// ones, only the head (`if (c)`, `while (c)`) for compound ones.
pub struct StmtHeader<'a>(pub &'a Stmt);

impl<'a> fmt::Display for StmtHeader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0.kind {
            StmtKind::Block(_) => write!(f, "{{ ... }}"),
            StmtKind::Assign { target, value } => write!(f, "{target} = {value};"),
            StmtKind::ArrayAssign {
                target,
                index,
                value,
            } => write!(f, "{target}[{index}] = {value};"),
            StmtKind::If { cond, .. } => write!(f, "if ({cond})"),
            StmtKind::While { cond, .. } => write!(f, "while ({cond})"),
            StmtKind::Print(e) => write!(f, "System.out.println({e});"),
            StmtKind::Call(e) => write!(f, "{e};"),
            StmtKind::Return(Some(e)) => write!(f, "return {e};"),
            StmtKind::Return(None) => write!(f, "return;"),
            StmtKind::Break => write!(f, "break;"),
            StmtKind::Continue => write!(f, "continue;"),
        }
    }
}

/// Whole program printer. An optional annotation function is called
/// on every non-block statement and its result, if any, is written as
/// a comment line just above the statement.
pub struct PrettyPrinter<'p> {
    annotate: Box<dyn Fn(&Stmt) -> Option<String> + 'p>,
    indent: usize,
}

impl<'p> Default for PrettyPrinter<'p> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> PrettyPrinter<'p> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            annotate: Box::new(|_| None),
            indent: 4,
        }
    }

    #[must_use]
    pub fn with_annotations<F>(annotate: F) -> Self
    where
        F: Fn(&Stmt) -> Option<String> + 'p,
    {
        Self {
            annotate: Box::new(annotate),
            indent: 4,
        }
    }

    #[must_use]
    pub fn print_program(&self, program: &Program) -> String {
        let mut out = String::new();
        for (i, class) in program.classes.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            // writing into a String cannot fail
            let _ = write!(out, "class {}", class.name);
            if let Some(parent) = &class.parent {
                let _ = write!(out, " extends {parent}");
            }
            out.push_str(" {\n");
            for field in &class.fields {
                let _ = writeln!(out, "{:w$}{} {};", "", field.typ, field.name, w = self.indent);
            }
            for method in &class.methods {
                self.write_method(&mut out, method, 1);
            }
            out.push_str("}\n");
        }
        out
    }

    #[must_use]
    pub fn print_method(&self, method: &Method) -> String {
        let mut out = String::new();
        self.write_method(&mut out, method, 0);
        out
    }

    fn write_method(&self, out: &mut String, method: &Method, depth: usize) {
        let pad = depth * self.indent;
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.typ, p.name))
            .collect();
        let _ = writeln!(
            out,
            "{:pad$}public {}{} {}({}) {{",
            "",
            if method.is_static { "static " } else { "" },
            method.ret,
            method.name,
            params.join(", "),
        );
        for local in &method.locals {
            let _ = writeln!(out, "{:w$}{} {};", "", local.typ, local.name, w = pad + self.indent);
        }
        for stmt in &method.body {
            self.write_stmt(out, stmt, depth + 1);
        }
        let _ = writeln!(out, "{:pad$}}}", "");
    }

    // braces of a block branch are aligned with its parent statement
    fn write_branch(&self, out: &mut String, branch: &Stmt, depth: usize) {
        if branch.is_block() {
            self.write_stmt(out, branch, depth);
        } else {
            self.write_stmt(out, branch, depth + 1);
        }
    }

    fn write_stmt(&self, out: &mut String, stmt: &Stmt, depth: usize) {
        let pad = depth * self.indent;
        if !stmt.is_block() {
            if let Some(note) = (self.annotate)(stmt) {
                let _ = writeln!(out, "{:pad$}// {note}", "");
            }
        }
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                let _ = writeln!(out, "{:pad$}{{", "");
                for s in stmts {
                    self.write_stmt(out, s, depth + 1);
                }
                let _ = writeln!(out, "{:pad$}}}", "");
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                let _ = writeln!(out, "{:pad$}{}", "", StmtHeader(stmt));
                self.write_branch(out, then_branch, depth);
                if let Some(else_branch) = else_branch {
                    let _ = writeln!(out, "{:pad$}else", "");
                    self.write_branch(out, else_branch, depth);
                }
            }
            StmtKind::While { body, .. } => {
                let _ = writeln!(out, "{:pad$}{}", "", StmtHeader(stmt));
                self.write_branch(out, body, depth);
            }
            _ => {
                let _ = writeln!(out, "{:pad$}{}", "", StmtHeader(stmt));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn headers() {
        let program = parse(
            "class A { int f() { a[i + 1] = -x * (y - 2); if (!b && c < 3) r = o.g(p, q.length); return r; } }",
        )
        .unwrap();
        let body = &program.classes[0].methods[0].body;
        assert_eq!(
            StmtHeader(&body[0]).to_string(),
            "a[i + 1] = -x * (y - 2);"
        );
        assert_eq!(StmtHeader(&body[1]).to_string(), "if (!b && (c < 3))");
        assert_eq!(StmtHeader(&body[2]).to_string(), "return r;");
    }

    #[test]
    fn annotated_program() {
        let program = parse("class A { int f(int n) { int x; x = n; return x; } }").unwrap();
        let printed = PrettyPrinter::with_annotations(|s: &Stmt| Some(format!("{}", s.id)))
            .print_program(&program);
        assert_eq!(
            printed,
            "class A {\n    public int f(int n) {\n        int x;\n        // #0\n        x = n;\n        // #1\n        return x;\n    }\n}\n"
        );
    }

    #[test]
    fn printed_program_parses_back() {
        let src = "class A { int f(int n) { while (0 < n) { if (n == 3) break; else n = n - 1; } return n; } }";
        let program = parse(src).unwrap();
        let printed = PrettyPrinter::new().print_program(&program);
        let reparsed = parse(&printed).unwrap();
        assert_eq!(PrettyPrinter::new().print_program(&reparsed), printed);
        assert_eq!(reparsed.classes[0].methods[0].statements().len(), 6);
    }
}
