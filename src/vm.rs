use std::fmt;

/// Memory segments of the stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "constant" => Some(Segment::Constant),
            "argument" => Some(Segment::Argument),
            "local" => Some(Segment::Local),
            "static" => Some(Segment::Static),
            "this" => Some(Segment::This),
            "that" => Some(Segment::That),
            "pointer" => Some(Segment::Pointer),
            "temp" => Some(Segment::Temp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    ShiftLeft,
    ShiftRight,
}

impl ArithmeticOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
            ArithmeticOp::ShiftLeft => "shiftleft",
            ArithmeticOp::ShiftRight => "shiftright",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "add" => Some(ArithmeticOp::Add),
            "sub" => Some(ArithmeticOp::Sub),
            "neg" => Some(ArithmeticOp::Neg),
            "eq" => Some(ArithmeticOp::Eq),
            "gt" => Some(ArithmeticOp::Gt),
            "lt" => Some(ArithmeticOp::Lt),
            "and" => Some(ArithmeticOp::And),
            "or" => Some(ArithmeticOp::Or),
            "not" => Some(ArithmeticOp::Not),
            "shiftleft" => Some(ArithmeticOp::ShiftLeft),
            "shiftright" => Some(ArithmeticOp::ShiftRight),
            _ => None,
        }
    }
}

/// One instruction of the intermediate stack machine. The compiler
/// produces these and the translator consumes them, so the textual form
/// here is the contract between the two stages.
#[derive(Debug, Clone, PartialEq)]
pub enum VmCommand {
    Push(Segment, i32),
    Pop(Segment, i32),
    Arithmetic(ArithmeticOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function(String, usize),
    Call(String, usize),
    Return,
}

impl fmt::Display for VmCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmCommand::Push(segment, index) => write!(f, "push {} {}", segment.as_str(), index),
            VmCommand::Pop(segment, index) => write!(f, "pop {} {}", segment.as_str(), index),
            VmCommand::Arithmetic(op) => write!(f, "{}", op.as_str()),
            VmCommand::Label(label) => write!(f, "label {}", label),
            VmCommand::Goto(label) => write!(f, "goto {}", label),
            VmCommand::IfGoto(label) => write!(f, "if-goto {}", label),
            VmCommand::Function(name, locals) => write!(f, "function {} {}", name, locals),
            VmCommand::Call(name, args) => write!(f, "call {} {}", name, args),
            VmCommand::Return => write!(f, "return"),
        }
    }
}

impl VmCommand {
    /// Parses one line of stack machine text. Comments and blank lines
    /// are the caller's problem.
    pub fn parse(line: &str) -> Result<VmCommand, String> {
        let mut parts = line.split_whitespace();
        let command = parts.next().ok_or_else(|| "Empty command".to_string())?;

        let command = match command {
            "push" | "pop" => {
                let segment = parts
                    .next()
                    .and_then(Segment::parse)
                    .ok_or_else(|| format!("Unknown segment in '{}'", line))?;
                let index = parts
                    .next()
                    .and_then(|n| n.parse::<i32>().ok())
                    .ok_or_else(|| format!("Bad index in '{}'", line))?;
                if command == "push" {
                    VmCommand::Push(segment, index)
                } else {
                    VmCommand::Pop(segment, index)
                }
            }
            "label" | "goto" | "if-goto" => {
                let label = parts
                    .next()
                    .ok_or_else(|| format!("Missing label in '{}'", line))?
                    .to_string();
                match command {
                    "label" => VmCommand::Label(label),
                    "goto" => VmCommand::Goto(label),
                    _ => VmCommand::IfGoto(label),
                }
            }
            "function" | "call" => {
                let name = parts
                    .next()
                    .ok_or_else(|| format!("Missing name in '{}'", line))?
                    .to_string();
                let count = parts
                    .next()
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| format!("Bad count in '{}'", line))?;
                if command == "function" {
                    VmCommand::Function(name, count)
                } else {
                    VmCommand::Call(name, count)
                }
            }
            "return" => VmCommand::Return,
            other => match ArithmeticOp::parse(other) {
                Some(op) => VmCommand::Arithmetic(op),
                None => return Err(format!("Unknown command '{}'", other)),
            },
        };

        if parts.next().is_some() {
            return Err(format!("Trailing text in '{}'", line));
        }
        Ok(command)
    }
}

/// Accumulates stack machine instructions for one class.
pub struct VmWriter {
    commands: Vec<VmCommand>,
}

impl VmWriter {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn write_push(&mut self, segment: Segment, index: i32) {
        self.commands.push(VmCommand::Push(segment, index));
    }

    pub fn write_pop(&mut self, segment: Segment, index: i32) {
        self.commands.push(VmCommand::Pop(segment, index));
    }

    pub fn write_arithmetic(&mut self, op: ArithmeticOp) {
        self.commands.push(VmCommand::Arithmetic(op));
    }

    pub fn write_label(&mut self, label: String) {
        self.commands.push(VmCommand::Label(label));
    }

    pub fn write_goto(&mut self, label: String) {
        self.commands.push(VmCommand::Goto(label));
    }

    pub fn write_if(&mut self, label: String) {
        self.commands.push(VmCommand::IfGoto(label));
    }

    pub fn write_call(&mut self, name: String, args: usize) {
        self.commands.push(VmCommand::Call(name, args));
    }

    pub fn write_function(&mut self, name: String, locals: usize) {
        self.commands.push(VmCommand::Function(name, locals));
    }

    pub fn write_return(&mut self) {
        self.commands.push(VmCommand::Return);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            out.push_str(&command.to_string());
            out.push('\n');
        }
        out
    }
}

impl Default for VmWriter {
    fn default() -> Self {
        Self::new()
    }
}
