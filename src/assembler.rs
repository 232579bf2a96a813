use crate::error::AssembleError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Assembles Hack assembly into 16-bit binary words, one per line.
/// Pass one records label addresses, pass two resolves symbols and
/// encodes each instruction.
pub fn assemble(source: &str, path: &PathBuf) -> Result<String, AssembleError> {
    let mut symbols = predefined_symbols();

    // Instructions with their original line numbers, labels stripped.
    let mut instructions: Vec<(usize, String)> = Vec::new();
    for (line_index, raw) in source.lines().enumerate() {
        let line = match raw.find("//") {
            Some(i) => &raw[..i],
            None => raw,
        };
        let line: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        if line.is_empty() {
            continue;
        }

        if let Some(label) = line.strip_prefix('(') {
            let label = label.strip_suffix(')').ok_or_else(|| {
                AssembleError::new(
                    path.clone(),
                    format!("Malformed label '{}'", line),
                    line_index,
                )
            })?;
            symbols.insert(label.to_string(), instructions.len() as u16);
        } else {
            instructions.push((line_index, line));
        }
    }

    let mut next_variable: u16 = 16;
    let mut out = String::new();
    for (line_index, instruction) in &instructions {
        let word = if let Some(symbol) = instruction.strip_prefix('@') {
            let address = match symbol.parse::<u16>() {
                Ok(value) => value,
                Err(_) => match symbols.get(symbol) {
                    Some(address) => *address,
                    None => {
                        // New variables are allocated from 16 in order
                        // of first appearance.
                        let address = next_variable;
                        symbols.insert(symbol.to_string(), address);
                        next_variable += 1;
                        address
                    }
                },
            };
            format!("{:016b}", address)
        } else {
            encode_computation(instruction)
                .ok_or_else(|| {
                    AssembleError::new(
                        path.clone(),
                        format!("Unknown instruction '{}'", instruction),
                        *line_index,
                    )
                })?
        };
        out.push_str(&word);
        out.push('\n');
    }
    Ok(out)
}

fn predefined_symbols() -> HashMap<String, u16> {
    let mut symbols = HashMap::new();
    for i in 0..16 {
        symbols.insert(format!("R{}", i), i);
    }
    symbols.insert("SP".to_string(), 0);
    symbols.insert("LCL".to_string(), 1);
    symbols.insert("ARG".to_string(), 2);
    symbols.insert("THIS".to_string(), 3);
    symbols.insert("THAT".to_string(), 4);
    symbols.insert("SCREEN".to_string(), 16384);
    symbols.insert("KBD".to_string(), 24576);
    symbols
}

/// dest=comp;jump with dest and jump optional. The shift computations
/// already carry their full upper bits, so only the seven-bit
/// computations get the leading 111.
fn encode_computation(instruction: &str) -> Option<String> {
    let (dest, rest) = match instruction.split_once('=') {
        Some((dest, rest)) => (dest, rest),
        None => ("", instruction),
    };
    let (comp, jump) = match rest.split_once(';') {
        Some((comp, jump)) => (comp, jump),
        None => (rest, ""),
    };

    let comp_bits = comp_bits(comp)?;
    let dest_bits = dest_bits(dest)?;
    let jump_bits = jump_bits(jump)?;

    let prefix = if comp_bits.len() > 7 { "" } else { "111" };
    Some(format!("{}{}{}{}", prefix, comp_bits, dest_bits, jump_bits))
}

fn comp_bits(comp: &str) -> Option<&'static str> {
    let bits = match comp {
        "0" => "0101010",
        "1" => "0111111",
        "-1" => "0111010",
        "D" => "0001100",
        "A" => "0110000",
        "!D" => "0001101",
        "!A" => "0110001",
        "-D" => "0001111",
        "-A" => "0110011",
        "D+1" => "0011111",
        "A+1" => "0110111",
        "D-1" => "0001110",
        "A-1" => "0110010",
        "D+A" => "0000010",
        "D-A" => "0010011",
        "A-D" => "0000111",
        "D&A" => "0000000",
        "D|A" => "0010101",
        "M" => "1110000",
        "!M" => "1110001",
        "-M" => "1110011",
        "M+1" => "1110111",
        "M-1" => "1110010",
        "D+M" => "1000010",
        "D-M" => "1010011",
        "M-D" => "1000111",
        "D&M" => "1000000",
        "D|M" => "1010101",
        "A<<" => "1010100000",
        "D<<" => "1010110000",
        "M<<" => "1011100000",
        "A>>" => "1010000000",
        "D>>" => "1010010000",
        "M>>" => "1011000000",
        _ => return None,
    };
    Some(bits)
}

fn dest_bits(dest: &str) -> Option<&'static str> {
    let bits = match dest {
        "" => "000",
        "M" => "001",
        "D" => "010",
        "MD" => "011",
        "A" => "100",
        "AM" => "101",
        "AD" => "110",
        "AMD" => "111",
        _ => return None,
    };
    Some(bits)
}

fn jump_bits(jump: &str) -> Option<&'static str> {
    let bits = match jump {
        "" => "000",
        "JGT" => "001",
        "JEQ" => "010",
        "JGE" => "011",
        "JLT" => "100",
        "JNE" => "101",
        "JLE" => "110",
        "JMP" => "111",
        _ => return None,
    };
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> String {
        assemble(source, &PathBuf::from("Test.asm")).expect("assembly failed")
    }

    #[test]
    fn encodes_the_add_program() {
        let binary = run("@2\nD=A\n@3\nD=D+A\n@0\nM=D\n");
        assert_eq!(
            binary,
            "0000000000000010\n\
             1110110000010000\n\
             0000000000000011\n\
             1110000010010000\n\
             0000000000000000\n\
             1110001100001000\n"
        );
    }

    #[test]
    fn labels_resolve_to_instruction_addresses() {
        let binary = run("@END\n0;JMP\n(END)\n@END\n0;JMP\n");
        let lines: Vec<&str> = binary.lines().collect();
        assert_eq!(lines[0], "0000000000000010");
        assert_eq!(lines[2], "0000000000000010");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn variables_allocate_from_sixteen_in_first_seen_order() {
        let binary = run("@first\n@second\n@first\n");
        let lines: Vec<&str> = binary.lines().collect();
        assert_eq!(lines[0], "0000000000010000");
        assert_eq!(lines[1], "0000000000010001");
        assert_eq!(lines[2], "0000000000010000");
    }

    #[test]
    fn predefined_symbols_are_known() {
        let binary = run("@SP\n@THAT\n@R13\n@SCREEN\n@KBD\n");
        let lines: Vec<&str> = binary.lines().collect();
        assert_eq!(lines[0], "0000000000000000");
        assert_eq!(lines[1], "0000000000000100");
        assert_eq!(lines[2], "0000000000001101");
        assert_eq!(lines[3], "0100000000000000");
        assert_eq!(lines[4], "0110000000000000");
    }

    #[test]
    fn jumps_and_dests_combine() {
        assert_eq!(run("D;JGT\n"), "1110001100000001\n");
        assert_eq!(run("AMD=M+1\n"), "1111110111111000\n");
    }

    #[test]
    fn shift_computations_use_the_extended_encoding() {
        assert_eq!(run("M=M<<\n"), "1011100000001000\n");
        assert_eq!(run("D=D>>\n"), "1010010000010000\n");
        assert_eq!(run("M=M>>\n"), "1011000000001000\n");
    }

    #[test]
    fn comments_and_whitespace_are_stripped() {
        let binary = run("// program\n  @2   // two\n\n D = A \n");
        assert_eq!(binary, "0000000000000010\n1110110000010000\n");
    }

    #[test]
    fn unknown_mnemonics_are_reported_with_their_line() {
        let err =
            assemble("@1\nD=W\n", &PathBuf::from("Test.asm")).expect_err("expected an error");
        assert!(err.message.contains("D=W"));
        assert_eq!(err.line, 1);
    }
}
