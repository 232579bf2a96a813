use crate::error::SemanticError;
use crate::parser::{
    BinaryOp, Class, ClassVarKind, Expression, Ident, KeywordConst, Statement, SubroutineCall,
    SubroutineDec, SubroutineKind, Term, UnaryOp,
};
use crate::symbol_table::{SymbolTable, VarKind};
use crate::vm::{ArithmeticOp, Segment, VmWriter};
use std::path::PathBuf;

/// Generates stack machine code for one class. Class and subroutine
/// scopes live in the symbol table; flow-control labels are numbered
/// per class.
pub struct Compiler {
    file_path: PathBuf,
    class_name: String,
    table: SymbolTable,
    writer: VmWriter,
    label_counter: usize,
}

impl Compiler {
    pub fn new(file_name: &PathBuf) -> Self {
        Self {
            file_path: file_name.clone(),
            class_name: String::new(),
            table: SymbolTable::new(),
            writer: VmWriter::new(),
            label_counter: 0,
        }
    }

    pub fn compile(mut self, class: &Class) -> Result<String, SemanticError> {
        self.class_name = class.name.name.clone();

        for dec in &class.var_decs {
            let kind = match dec.kind {
                ClassVarKind::Static => VarKind::Static,
                ClassVarKind::Field => VarKind::Field,
            };
            for name in &dec.names {
                self.table.define(&name.name, &dec.var_type, kind);
            }
        }

        for sub in &class.subroutines {
            self.compile_subroutine(sub)?;
        }

        Ok(self.writer.render())
    }

    fn compile_subroutine(&mut self, sub: &SubroutineDec) -> Result<(), SemanticError> {
        self.table.start_subroutine();

        // Methods receive the object as a hidden first argument.
        if sub.kind == SubroutineKind::Method {
            let class_name = self.class_name.clone();
            self.table.define("this", &class_name, VarKind::Argument);
        }
        for param in &sub.parameters {
            self.table
                .define(&param.name.name, &param.var_type, VarKind::Argument);
        }
        for dec in &sub.locals {
            for name in &dec.names {
                self.table.define(&name.name, &dec.var_type, VarKind::Local);
            }
        }

        let locals = self.table.kind_count(VarKind::Local);
        self.writer
            .write_function(format!("{}.{}", self.class_name, sub.name.name), locals);

        match sub.kind {
            SubroutineKind::Constructor => {
                let fields = self.table.kind_count(VarKind::Field) as i32;
                self.writer.write_push(Segment::Constant, fields);
                self.writer.write_call("Memory.alloc".to_string(), 1);
                self.writer.write_pop(Segment::Pointer, 0);
            }
            SubroutineKind::Method => {
                self.writer.write_push(Segment::Argument, 0);
                self.writer.write_pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements(&sub.statements)
    }

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), SemanticError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), SemanticError> {
        match statement {
            Statement::Let {
                target,
                index,
                value,
            } => self.compile_let(target, index.as_ref(), value),
            Statement::If {
                condition,
                then_body,
                else_body,
            } => self.compile_if(condition, then_body, else_body.as_deref()),
            Statement::While { condition, body } => self.compile_while(condition, body),
            Statement::Do(call) => {
                self.compile_call(call)?;
                // The value of a do call is discarded.
                self.writer.write_pop(Segment::Temp, 0);
                Ok(())
            }
            Statement::Return(value) => {
                match value {
                    Some(value) => self.compile_expression(value)?,
                    // Void subroutines still return a word.
                    None => self.writer.write_push(Segment::Constant, 0),
                }
                self.writer.write_return();
                Ok(())
            }
        }
    }

    fn compile_let(
        &mut self,
        target: &Ident,
        index: Option<&Expression>,
        value: &Expression,
    ) -> Result<(), SemanticError> {
        let (segment, slot) = self.resolve_var(target)?;
        match index {
            Some(index) => {
                // Address first, value second, then store through THAT.
                self.writer.write_push(segment, slot);
                self.compile_expression(index)?;
                self.writer.write_arithmetic(ArithmeticOp::Add);
                self.compile_expression(value)?;
                self.writer.write_pop(Segment::Temp, 0);
                self.writer.write_pop(Segment::Pointer, 1);
                self.writer.write_push(Segment::Temp, 0);
                self.writer.write_pop(Segment::That, 0);
            }
            None => {
                self.compile_expression(value)?;
                self.writer.write_pop(segment, slot);
            }
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        then_body: &[Statement],
        else_body: Option<&[Statement]>,
    ) -> Result<(), SemanticError> {
        let n = self.next_label();
        let false_label = format!("IF_FALSE{}", n);
        let end_label = format!("IF_END{}", n);

        self.compile_expression(condition)?;
        self.writer.write_arithmetic(ArithmeticOp::Not);
        self.writer.write_if(false_label.clone());
        self.compile_statements(then_body)?;
        self.writer.write_goto(end_label.clone());
        self.writer.write_label(false_label);
        if let Some(else_body) = else_body {
            self.compile_statements(else_body)?;
        }
        self.writer.write_label(end_label);
        Ok(())
    }

    fn compile_while(
        &mut self,
        condition: &Expression,
        body: &[Statement],
    ) -> Result<(), SemanticError> {
        let n = self.next_label();
        let test_label = format!("WHILE_EXP{}", n);
        let end_label = format!("WHILE_END{}", n);

        self.writer.write_label(test_label.clone());
        self.compile_expression(condition)?;
        self.writer.write_arithmetic(ArithmeticOp::Not);
        self.writer.write_if(end_label.clone());
        self.compile_statements(body)?;
        self.writer.write_goto(test_label);
        self.writer.write_label(end_label);
        Ok(())
    }

    /// Operands and operators strictly left to right, no precedence.
    fn compile_expression(&mut self, expression: &Expression) -> Result<(), SemanticError> {
        self.compile_term(&expression.first)?;
        for (op, term) in &expression.rest {
            self.compile_term(term)?;
            self.compile_binary_op(*op);
        }
        Ok(())
    }

    fn compile_binary_op(&mut self, op: BinaryOp) {
        match op {
            BinaryOp::Add => self.writer.write_arithmetic(ArithmeticOp::Add),
            BinaryOp::Sub => self.writer.write_arithmetic(ArithmeticOp::Sub),
            BinaryOp::And => self.writer.write_arithmetic(ArithmeticOp::And),
            BinaryOp::Or => self.writer.write_arithmetic(ArithmeticOp::Or),
            BinaryOp::Lt => self.writer.write_arithmetic(ArithmeticOp::Lt),
            BinaryOp::Gt => self.writer.write_arithmetic(ArithmeticOp::Gt),
            BinaryOp::Eq => self.writer.write_arithmetic(ArithmeticOp::Eq),
            BinaryOp::Mul => self.writer.write_call("Math.multiply".to_string(), 2),
            BinaryOp::Div => self.writer.write_call("Math.divide".to_string(), 2),
        }
    }

    fn compile_term(&mut self, term: &Term) -> Result<(), SemanticError> {
        match term {
            Term::IntConst { value, .. } => {
                self.writer.write_push(Segment::Constant, *value as i32);
                Ok(())
            }
            Term::StringConst(text) => {
                self.compile_string(text);
                Ok(())
            }
            Term::KeywordConst(constant) => {
                match constant {
                    KeywordConst::True => {
                        self.writer.write_push(Segment::Constant, 0);
                        self.writer.write_arithmetic(ArithmeticOp::Not);
                    }
                    KeywordConst::False | KeywordConst::Null => {
                        self.writer.write_push(Segment::Constant, 0);
                    }
                    KeywordConst::This => {
                        self.writer.write_push(Segment::Pointer, 0);
                    }
                }
                Ok(())
            }
            Term::Var(name) => {
                let (segment, slot) = self.resolve_var(name)?;
                self.writer.write_push(segment, slot);
                Ok(())
            }
            Term::ArrayEntry { name, index } => {
                let (segment, slot) = self.resolve_var(name)?;
                self.writer.write_push(segment, slot);
                self.compile_expression(index)?;
                self.writer.write_arithmetic(ArithmeticOp::Add);
                self.writer.write_pop(Segment::Pointer, 1);
                self.writer.write_push(Segment::That, 0);
                Ok(())
            }
            Term::Call(call) => self.compile_call(call),
            Term::Parenthesized(expression) => self.compile_expression(expression),
            Term::Unary { op, term } => {
                self.compile_term(term)?;
                let op = match op {
                    UnaryOp::Neg => ArithmeticOp::Neg,
                    UnaryOp::Not => ArithmeticOp::Not,
                    UnaryOp::ShiftLeft => ArithmeticOp::ShiftLeft,
                    UnaryOp::ShiftRight => ArithmeticOp::ShiftRight,
                };
                self.writer.write_arithmetic(op);
                Ok(())
            }
        }
    }

    /// String literals are built character by character at runtime.
    fn compile_string(&mut self, text: &str) {
        self.writer
            .write_push(Segment::Constant, text.len() as i32);
        self.writer.write_call("String.new".to_string(), 1);
        for ch in text.chars() {
            self.writer.write_push(Segment::Constant, ch as i32);
            self.writer.write_call("String.appendChar".to_string(), 2);
        }
    }

    /// The receiver decides the call shape: none means a method on the
    /// current object, a known variable means a method on that object,
    /// anything else is a function of the named class.
    fn compile_call(&mut self, call: &SubroutineCall) -> Result<(), SemanticError> {
        match &call.receiver {
            None => {
                self.writer.write_push(Segment::Pointer, 0);
                for arg in &call.args {
                    self.compile_expression(arg)?;
                }
                self.writer.write_call(
                    format!("{}.{}", self.class_name, call.name.name),
                    call.args.len() + 1,
                );
            }
            Some(receiver) => match self.table.resolve(&receiver.name) {
                Some(entry) => {
                    let target_class = entry.var_type.clone();
                    let segment = kind_segment(entry.kind);
                    let slot = entry.index as i32;
                    self.writer.write_push(segment, slot);
                    for arg in &call.args {
                        self.compile_expression(arg)?;
                    }
                    self.writer.write_call(
                        format!("{}.{}", target_class, call.name.name),
                        call.args.len() + 1,
                    );
                }
                None => {
                    for arg in &call.args {
                        self.compile_expression(arg)?;
                    }
                    self.writer.write_call(
                        format!("{}.{}", receiver.name, call.name.name),
                        call.args.len(),
                    );
                }
            },
        }
        Ok(())
    }

    fn resolve_var(&self, name: &Ident) -> Result<(Segment, i32), SemanticError> {
        match self.table.resolve(&name.name) {
            Some(entry) => Ok((kind_segment(entry.kind), entry.index as i32)),
            None => Err(SemanticError::new(
                self.file_path.clone(),
                format!("Undefined variable '{}'", name.name),
                name.line,
                name.position,
            )),
        }
    }

    fn next_label(&mut self) -> usize {
        let n = self.label_counter;
        self.label_counter += 1;
        n
    }
}

fn kind_segment(kind: VarKind) -> Segment {
    match kind {
        VarKind::Static => Segment::Static,
        VarKind::Field => Segment::This,
        VarKind::Argument => Segment::Argument,
        VarKind::Local => Segment::Local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn compile(source: &str) -> String {
        let path = PathBuf::from("Test.jack");
        let tokens = Lexer::new(source, &path).tokenize().expect("lexing failed");
        let class = Parser::new(tokens, &path).parse().expect("parsing failed");
        Compiler::new(&path).compile(&class).expect("compile failed")
    }

    fn compile_err(source: &str) -> SemanticError {
        let path = PathBuf::from("Test.jack");
        let tokens = Lexer::new(source, &path).tokenize().expect("lexing failed");
        let class = Parser::new(tokens, &path).parse().expect("parsing failed");
        Compiler::new(&path)
            .compile(&class)
            .expect_err("expected a semantic error")
    }

    #[test]
    fn void_function_returns_zero() {
        let vm = compile("class Main { function void main() { return; } }");
        assert_eq!(vm, "function Main.main 0\npush constant 0\nreturn\n");
    }

    #[test]
    fn expressions_evaluate_left_to_right() {
        let vm = compile(
            "class Main { function int f() { return 1 + 2 * 3; } }",
        );
        assert_eq!(
            vm,
            "function Main.f 0\n\
             push constant 1\n\
             push constant 2\n\
             add\n\
             push constant 3\n\
             call Math.multiply 2\n\
             return\n"
        );
    }

    #[test]
    fn constructor_allocates_its_fields() {
        let vm = compile(
            "class Point { field int x, y; \
             constructor Point new() { return this; } }",
        );
        assert!(vm.starts_with(
            "function Point.new 0\n\
             push constant 2\n\
             call Memory.alloc 1\n\
             pop pointer 0\n"
        ));
        assert!(vm.ends_with("push pointer 0\nreturn\n"));
    }

    #[test]
    fn method_binds_this_from_argument_zero() {
        let vm = compile(
            "class Point { field int x; \
             method int getX() { return x; } }",
        );
        assert_eq!(
            vm,
            "function Point.getX 0\n\
             push argument 0\n\
             pop pointer 0\n\
             push this 0\n\
             return\n"
        );
    }

    #[test]
    fn implicit_method_call_pushes_this_first() {
        let vm = compile(
            "class Point { method void a() { do b(1); return; } \
             method void b(int n) { return; } }",
        );
        assert!(vm.contains(
            "push pointer 0\n\
             push constant 1\n\
             call Point.b 2\n\
             pop temp 0\n"
        ));
    }

    #[test]
    fn method_call_on_a_variable_uses_its_type() {
        let vm = compile(
            "class Main { function void f(Point p) { do p.move(3); return; } }",
        );
        assert!(vm.contains(
            "push argument 0\n\
             push constant 3\n\
             call Point.move 2\n"
        ));
    }

    #[test]
    fn unknown_receiver_is_a_class_function_call() {
        let vm = compile("class Main { function void f() { do Output.printInt(7); return; } }");
        assert!(vm.contains("push constant 7\ncall Output.printInt 1\n"));
    }

    #[test]
    fn array_store_stages_the_value_in_temp() {
        let vm = compile(
            "class Main { function void f(Array a) { let a[2] = 5; return; } }",
        );
        assert!(vm.contains(
            "push argument 0\n\
             push constant 2\n\
             add\n\
             push constant 5\n\
             pop temp 0\n\
             pop pointer 1\n\
             push temp 0\n\
             pop that 0\n"
        ));
    }

    #[test]
    fn true_is_not_of_zero() {
        let vm = compile("class Main { function boolean f() { return true; } }");
        assert!(vm.contains("push constant 0\nnot\nreturn\n"));
    }

    #[test]
    fn while_loop_labels_are_numbered_per_class() {
        let vm = compile(
            "class Main { function void f() { \
             while (true) { } while (true) { } return; } }",
        );
        assert!(vm.contains("label WHILE_EXP0"));
        assert!(vm.contains("label WHILE_END0"));
        assert!(vm.contains("label WHILE_EXP1"));
        assert!(vm.contains("label WHILE_END1"));
    }

    #[test]
    fn string_constant_builds_at_runtime() {
        let vm = compile("class Main { function void f() { do Output.printString(\"Hi\"); return; } }");
        assert!(vm.contains(
            "push constant 2\n\
             call String.new 1\n\
             push constant 72\n\
             call String.appendChar 2\n\
             push constant 105\n\
             call String.appendChar 2\n"
        ));
    }

    #[test]
    fn shift_unaries_lower_to_shift_ops() {
        let vm = compile("class Main { function int f(int n) { return ^n + #n; } }");
        assert!(vm.contains("shiftleft"));
        assert!(vm.contains("shiftright"));
    }

    #[test]
    fn undefined_variable_is_reported_with_its_position() {
        let err = compile_err("class Main { function void f() { let x = 1; return; } }");
        assert!(err.message.contains("'x'"));
    }
}
