use crate::parser::{
    BinaryOp, Class, ClassVarDec, ClassVarKind, Expression, Param, Statement, SubroutineCall,
    SubroutineDec, SubroutineKind, Term, VarDec,
};
use crate::token::escape_symbol;

/// Renders a parsed class back out as the marked-up token stream, one
/// element per line, without indentation.
pub fn render_class(class: &Class) -> String {
    let mut writer = XmlWriter::new();
    writer.class(class);
    writer.out
}

struct XmlWriter {
    out: String,
}

impl XmlWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn open(&mut self, tag: &str) {
        self.out.push_str(&format!("<{}>\n", tag));
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str(&format!("</{}>\n", tag));
    }

    fn terminal(&mut self, tag: &str, text: &str) {
        self.out.push_str(&format!("<{}> {} </{}>\n", tag, text, tag));
    }

    fn keyword(&mut self, text: &str) {
        self.terminal("keyword", text);
    }

    fn symbol(&mut self, ch: char) {
        let escaped = escape_symbol(&ch.to_string());
        self.terminal("symbol", &escaped);
    }

    fn identifier(&mut self, name: &str) {
        self.terminal("identifier", name);
    }

    /// The built-in type names are keywords, everything else is a
    /// class name.
    fn type_name(&mut self, name: &str) {
        if matches!(name, "int" | "char" | "boolean" | "void") {
            self.keyword(name);
        } else {
            self.identifier(name);
        }
    }

    fn class(&mut self, class: &Class) {
        self.open("class");
        self.keyword("class");
        self.identifier(&class.name.name);
        self.symbol('{');
        for dec in &class.var_decs {
            self.class_var_dec(dec);
        }
        for sub in &class.subroutines {
            self.subroutine(sub);
        }
        self.symbol('}');
        self.close("class");
    }

    fn class_var_dec(&mut self, dec: &ClassVarDec) {
        self.open("classVarDec");
        self.keyword(match dec.kind {
            ClassVarKind::Static => "static",
            ClassVarKind::Field => "field",
        });
        self.type_name(&dec.var_type);
        for (i, name) in dec.names.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }
            self.identifier(&name.name);
        }
        self.symbol(';');
        self.close("classVarDec");
    }

    fn subroutine(&mut self, sub: &SubroutineDec) {
        self.open("subroutineDec");
        self.keyword(match sub.kind {
            SubroutineKind::Constructor => "constructor",
            SubroutineKind::Function => "function",
            SubroutineKind::Method => "method",
        });
        self.type_name(&sub.return_type);
        self.identifier(&sub.name.name);
        self.symbol('(');
        self.parameter_list(&sub.parameters);
        self.symbol(')');

        self.open("subroutineBody");
        self.symbol('{');
        for dec in &sub.locals {
            self.var_dec(dec);
        }
        self.statements(&sub.statements);
        self.symbol('}');
        self.close("subroutineBody");

        self.close("subroutineDec");
    }

    fn parameter_list(&mut self, parameters: &[Param]) {
        self.open("parameterList");
        for (i, param) in parameters.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }
            self.type_name(&param.var_type);
            self.identifier(&param.name.name);
        }
        self.close("parameterList");
    }

    fn var_dec(&mut self, dec: &VarDec) {
        self.open("varDec");
        self.keyword("var");
        self.type_name(&dec.var_type);
        for (i, name) in dec.names.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }
            self.identifier(&name.name);
        }
        self.symbol(';');
        self.close("varDec");
    }

    fn statements(&mut self, statements: &[Statement]) {
        self.open("statements");
        for statement in statements {
            self.statement(statement);
        }
        self.close("statements");
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Let {
                target,
                index,
                value,
            } => {
                self.open("letStatement");
                self.keyword("let");
                self.identifier(&target.name);
                if let Some(index) = index {
                    self.symbol('[');
                    self.expression(index);
                    self.symbol(']');
                }
                self.symbol('=');
                self.expression(value);
                self.symbol(';');
                self.close("letStatement");
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                self.open("ifStatement");
                self.keyword("if");
                self.symbol('(');
                self.expression(condition);
                self.symbol(')');
                self.symbol('{');
                self.statements(then_body);
                self.symbol('}');
                if let Some(else_body) = else_body {
                    self.keyword("else");
                    self.symbol('{');
                    self.statements(else_body);
                    self.symbol('}');
                }
                self.close("ifStatement");
            }
            Statement::While { condition, body } => {
                self.open("whileStatement");
                self.keyword("while");
                self.symbol('(');
                self.expression(condition);
                self.symbol(')');
                self.symbol('{');
                self.statements(body);
                self.symbol('}');
                self.close("whileStatement");
            }
            Statement::Do(call) => {
                self.open("doStatement");
                self.keyword("do");
                self.subroutine_call(call);
                self.symbol(';');
                self.close("doStatement");
            }
            Statement::Return(value) => {
                self.open("returnStatement");
                self.keyword("return");
                if let Some(value) = value {
                    self.expression(value);
                }
                self.symbol(';');
                self.close("returnStatement");
            }
        }
    }

    fn expression(&mut self, expression: &Expression) {
        self.open("expression");
        self.term(&expression.first);
        for (op, term) in &expression.rest {
            self.binary_op(*op);
            self.term(term);
        }
        self.close("expression");
    }

    fn binary_op(&mut self, op: BinaryOp) {
        self.symbol(op.symbol());
    }

    fn term(&mut self, term: &Term) {
        self.open("term");
        match term {
            Term::IntConst { text, .. } => self.terminal("integerConstant", text),
            Term::StringConst(text) => self.terminal("stringConstant", text),
            Term::KeywordConst(constant) => {
                let text = match constant {
                    crate::parser::KeywordConst::True => "true",
                    crate::parser::KeywordConst::False => "false",
                    crate::parser::KeywordConst::Null => "null",
                    crate::parser::KeywordConst::This => "this",
                };
                self.keyword(text);
            }
            Term::Var(name) => self.identifier(&name.name),
            Term::ArrayEntry { name, index } => {
                self.identifier(&name.name);
                self.symbol('[');
                self.expression(index);
                self.symbol(']');
            }
            Term::Call(call) => self.subroutine_call(call),
            Term::Parenthesized(expression) => {
                self.symbol('(');
                self.expression(expression);
                self.symbol(')');
            }
            Term::Unary { op, term } => {
                self.symbol(op.symbol());
                self.term(term);
            }
        }
        self.close("term");
    }

    /// The call has no wrapper element of its own, its tokens sit
    /// directly inside the enclosing term or statement.
    fn subroutine_call(&mut self, call: &SubroutineCall) {
        if let Some(receiver) = &call.receiver {
            self.identifier(&receiver.name);
            self.symbol('.');
        }
        self.identifier(&call.name.name);
        self.symbol('(');
        self.expression_list(&call.args);
        self.symbol(')');
    }

    fn expression_list(&mut self, args: &[Expression]) {
        self.open("expressionList");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.symbol(',');
            }
            self.expression(arg);
        }
        self.close("expressionList");
    }
}
