use crate::error::TranslateError;
use crate::vm::{ArithmeticOp, Segment, VmCommand};
use std::path::PathBuf;

/// Turns stack machine programs into Hack assembly. One writer handles
/// a whole translation run so the comparison and call counters stay
/// unique across files.
pub struct CodeWriter {
    output: String,
    file_name: String,
    current_function: String,
    label_count: usize,
    call_count: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            file_name: String::new(),
            // Labels written before any function declaration land in
            // the entry function's namespace.
            current_function: "Sys.init".to_string(),
            label_count: 0,
            call_count: 0,
        }
    }

    /// SP = 256, then transfer control to Sys.init.
    pub fn write_bootstrap(&mut self) {
        self.emit(&["@256", "D=A", "@SP", "M=D"]);
        self.write_call("Sys.init", 0);
    }

    /// Translates one file worth of stack machine text. The file name
    /// scopes its static variables.
    pub fn write_file(&mut self, source: &str, path: &PathBuf) -> Result<(), TranslateError> {
        self.file_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for (line_index, raw) in source.lines().enumerate() {
            let line = match raw.find("//") {
                Some(i) => &raw[..i],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let command = VmCommand::parse(line)
                .map_err(|message| TranslateError::new(path.clone(), message, line_index))?;
            self.write_command(&command, path, line_index)?;
        }
        Ok(())
    }

    pub fn into_output(self) -> String {
        self.output
    }

    fn emit(&mut self, lines: &[&str]) {
        for line in lines {
            self.output.push_str(line);
            self.output.push('\n');
        }
    }

    fn write_command(
        &mut self,
        command: &VmCommand,
        path: &PathBuf,
        line: usize,
    ) -> Result<(), TranslateError> {
        match command {
            VmCommand::Push(segment, index) => self.write_push(*segment, *index),
            VmCommand::Pop(segment, index) => {
                if *segment == Segment::Constant {
                    return Err(TranslateError::new(
                        path.clone(),
                        "Cannot pop to the constant segment".to_string(),
                        line,
                    ));
                }
                self.write_pop(*segment, *index);
            }
            VmCommand::Arithmetic(op) => self.write_arithmetic(*op),
            VmCommand::Label(label) => {
                let label = self.scoped_label(label);
                self.emit(&[&format!("({})", label)]);
            }
            VmCommand::Goto(label) => {
                let label = self.scoped_label(label);
                self.emit(&[&format!("@{}", label), "0;JMP"]);
            }
            VmCommand::IfGoto(label) => {
                let label = self.scoped_label(label);
                self.emit(&["@SP", "AM=M-1", "D=M"]);
                self.emit(&[&format!("@{}", label), "D;JNE"]);
            }
            VmCommand::Function(name, locals) => self.write_function(name, *locals),
            VmCommand::Call(name, args) => self.write_call(name, *args),
            VmCommand::Return => self.write_return(),
        }
        Ok(())
    }

    fn scoped_label(&self, label: &str) -> String {
        format!("{}${}", self.current_function, label)
    }

    fn write_push(&mut self, segment: Segment, index: i32) {
        match segment {
            Segment::Constant => {
                // -1 is the truth value; A-register constants are
                // otherwise non-negative.
                if index == -1 {
                    self.emit(&["D=-1"]);
                } else {
                    self.emit(&[&format!("@{}", index), "D=A"]);
                }
            }
            Segment::Argument | Segment::Local | Segment::This | Segment::That => {
                let base = pointer_register(segment);
                self.emit(&[&format!("@{}", index), "D=A", &format!("@{}", base), "A=D+M", "D=M"]);
            }
            Segment::Pointer => {
                let register = if index == 0 { "THIS" } else { "THAT" };
                self.emit(&[&format!("@{}", register), "D=M"]);
            }
            Segment::Temp => {
                self.emit(&[&format!("@R{}", 5 + index), "D=M"]);
            }
            Segment::Static => {
                self.emit(&[&format!("@{}.{}", self.file_name, index), "D=M"]);
            }
        }
        self.emit(&["@SP", "A=M", "M=D", "@SP", "M=M+1"]);
    }

    fn write_pop(&mut self, segment: Segment, index: i32) {
        match segment {
            Segment::Argument | Segment::Local | Segment::This | Segment::That => {
                // Destination address staged in R14.
                let base = pointer_register(segment);
                self.emit(&[&format!("@{}", index), "D=A", &format!("@{}", base), "D=D+M"]);
                self.emit(&["@R14", "M=D"]);
                self.emit(&["@SP", "AM=M-1", "D=M", "@R14", "A=M", "M=D"]);
            }
            Segment::Pointer => {
                let register = if index == 0 { "THIS" } else { "THAT" };
                self.emit(&["@SP", "AM=M-1", "D=M", &format!("@{}", register), "M=D"]);
            }
            Segment::Temp => {
                self.emit(&["@SP", "AM=M-1", "D=M", &format!("@R{}", 5 + index), "M=D"]);
            }
            Segment::Static => {
                self.emit(&[
                    "@SP",
                    "AM=M-1",
                    "D=M",
                    &format!("@{}.{}", self.file_name, index),
                    "M=D",
                ]);
            }
            Segment::Constant => unreachable!("rejected before dispatch"),
        }
    }

    fn write_arithmetic(&mut self, op: ArithmeticOp) {
        match op {
            ArithmeticOp::Add => self.binary("M=D+M"),
            ArithmeticOp::Sub => self.binary("M=M-D"),
            ArithmeticOp::And => self.binary("M=D&M"),
            ArithmeticOp::Or => self.binary("M=D|M"),
            ArithmeticOp::Neg => self.unary("M=-M"),
            ArithmeticOp::Not => self.unary("M=!M"),
            ArithmeticOp::ShiftLeft => self.unary("M=M<<"),
            ArithmeticOp::ShiftRight => self.unary("M=M>>"),
            ArithmeticOp::Eq => self.compare("JEQ"),
            ArithmeticOp::Gt => self.compare("JGT"),
            ArithmeticOp::Lt => self.compare("JLT"),
        }
    }

    fn binary(&mut self, op: &str) {
        self.emit(&["@SP", "AM=M-1", "D=M", "A=A-1", op]);
    }

    fn unary(&mut self, op: &str) {
        self.emit(&["@SP", "A=M-1", op]);
    }

    /// True is all ones, false is zero.
    fn compare(&mut self, jump: &str) {
        let true_label = format!("TRUE.{}", self.label_count);
        let continue_label = format!("CONTINUE.{}", self.label_count);
        self.label_count += 1;

        self.emit(&["@SP", "AM=M-1", "D=M", "A=A-1", "D=M-D"]);
        self.emit(&[&format!("@{}", true_label), &format!("D;{}", jump)]);
        self.emit(&["@SP", "A=M-1", "M=0"]);
        self.emit(&[&format!("@{}", continue_label), "0;JMP"]);
        self.emit(&[&format!("({})", true_label)]);
        self.emit(&["@SP", "A=M-1", "M=-1"]);
        self.emit(&[&format!("({})", continue_label)]);
    }

    fn write_function(&mut self, name: &str, locals: usize) {
        self.current_function = name.to_string();
        self.emit(&[&format!("({})", name)]);
        for _ in 0..locals {
            self.emit(&["@SP", "A=M", "M=0", "@SP", "M=M+1"]);
        }
    }

    /// Saves the caller frame, repositions ARG and LCL, then jumps.
    fn write_call(&mut self, name: &str, args: usize) {
        let return_label = format!("{}$ret.{}", self.current_function, self.call_count);
        self.call_count += 1;

        self.emit(&[&format!("@{}", return_label), "D=A"]);
        self.emit(&["@SP", "A=M", "M=D", "@SP", "M=M+1"]);
        for register in ["LCL", "ARG", "THIS", "THAT"] {
            self.emit(&[&format!("@{}", register), "D=M"]);
            self.emit(&["@SP", "A=M", "M=D", "@SP", "M=M+1"]);
        }
        // ARG = SP - 5 - nArgs
        self.emit(&[&format!("@{}", 5 + args), "D=A", "@SP", "D=M-D", "@ARG", "M=D"]);
        self.emit(&["@SP", "D=M", "@LCL", "M=D"]);
        self.emit(&[&format!("@{}", name), "0;JMP"]);
        self.emit(&[&format!("({})", return_label)]);
    }

    /// Frame pointer in R15, return address in R13.
    fn write_return(&mut self) {
        self.emit(&["@LCL", "D=M", "@R15", "M=D"]);
        self.emit(&["@5", "A=D-A", "D=M", "@R13", "M=D"]);
        // *ARG = pop()
        self.emit(&["@SP", "AM=M-1", "D=M", "@ARG", "A=M", "M=D"]);
        self.emit(&["@ARG", "D=M+1", "@SP", "M=D"]);
        for register in ["THAT", "THIS", "ARG", "LCL"] {
            self.emit(&["@R15", "AM=M-1", "D=M", &format!("@{}", register), "M=D"]);
        }
        self.emit(&["@R13", "A=M", "0;JMP"]);
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn pointer_register(segment: Segment) -> &'static str {
    match segment {
        Segment::Argument => "ARG",
        Segment::Local => "LCL",
        Segment::This => "THIS",
        Segment::That => "THAT",
        _ => unreachable!("segment has no pointer register"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(source: &str) -> String {
        let mut writer = CodeWriter::new();
        writer
            .write_file(source, &PathBuf::from("Test.vm"))
            .expect("translation failed");
        writer.into_output()
    }

    #[test]
    fn push_constant_loads_and_pushes() {
        assert_eq!(
            translate("push constant 7"),
            "@7\nD=A\n@SP\nA=M\nM=D\n@SP\nM=M+1\n"
        );
    }

    #[test]
    fn push_negative_one_uses_the_constant_comp() {
        assert!(translate("push constant -1").starts_with("D=-1\n@SP\n"));
    }

    #[test]
    fn pop_local_stages_the_address() {
        let asm = translate("pop local 2");
        assert!(asm.starts_with("@2\nD=A\n@LCL\nD=D+M\n@R14\nM=D\n"));
        assert!(asm.ends_with("@SP\nAM=M-1\nD=M\n@R14\nA=M\nM=D\n"));
    }

    #[test]
    fn static_symbols_carry_the_file_stem() {
        let asm = translate("pop static 3\npush static 3");
        assert!(asm.contains("@Test.3\nM=D\n"));
        assert!(asm.contains("@Test.3\nD=M\n"));
    }

    #[test]
    fn pointer_maps_to_this_and_that() {
        let asm = translate("push pointer 0\npush pointer 1");
        assert!(asm.contains("@THIS\nD=M\n"));
        assert!(asm.contains("@THAT\nD=M\n"));
    }

    #[test]
    fn comparisons_number_their_labels() {
        let asm = translate("eq\nlt");
        assert!(asm.contains("(TRUE.0)"));
        assert!(asm.contains("(CONTINUE.0)"));
        assert!(asm.contains("(TRUE.1)"));
        assert!(asm.contains("D;JEQ"));
        assert!(asm.contains("D;JLT"));
    }

    #[test]
    fn labels_are_scoped_to_the_current_function() {
        let asm = translate("function Main.loop 0\nlabel TOP\ngoto TOP\nif-goto TOP");
        assert!(asm.contains("(Main.loop$TOP)"));
        assert!(asm.contains("@Main.loop$TOP\n0;JMP"));
        assert!(asm.contains("@Main.loop$TOP\nD;JNE"));
    }

    #[test]
    fn function_declaration_zeroes_its_locals() {
        let asm = translate("function Main.f 2");
        assert_eq!(asm.matches("@SP\nA=M\nM=0\n@SP\nM=M+1").count(), 2);
    }

    #[test]
    fn call_saves_the_frame_and_repositions_arg() {
        let asm = translate("call Main.f 2");
        assert!(asm.contains("@Sys.init$ret.0\nD=A\n"));
        assert!(asm.contains("@7\nD=A\n@SP\nD=M-D\n@ARG\nM=D\n"));
        assert!(asm.contains("@Main.f\n0;JMP\n(Sys.init$ret.0)\n"));
    }

    #[test]
    fn return_restores_the_caller_frame() {
        let asm = translate("return");
        assert!(asm.starts_with("@LCL\nD=M\n@R15\nM=D\n@5\nA=D-A\nD=M\n@R13\nM=D\n"));
        assert!(asm.ends_with("@R13\nA=M\n0;JMP\n"));
    }

    #[test]
    fn bootstrap_initializes_sp_then_calls_sys_init() {
        let mut writer = CodeWriter::new();
        writer.write_bootstrap();
        let asm = writer.into_output();
        assert!(asm.starts_with("@256\nD=A\n@SP\nM=D\n"));
        assert!(asm.contains("@Sys.init\n0;JMP\n"));
    }

    #[test]
    fn pop_to_constant_is_rejected() {
        let mut writer = CodeWriter::new();
        let err = writer
            .write_file("pop constant 0", &PathBuf::from("Test.vm"))
            .expect_err("expected a translate error");
        assert!(err.message.contains("constant"));
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let asm = translate("// header\n\n  push constant 1 // inline\n");
        assert!(asm.starts_with("@1\nD=A\n"));
    }
}
