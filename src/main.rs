use clap::{Parser as ClapParser, Subcommand};
use jack_compiler::assembler;
use jack_compiler::compiler::Compiler;
use jack_compiler::config::Config;
use jack_compiler::error::CompilerError;
use jack_compiler::lexer::Lexer;
use jack_compiler::parser::{Class, Parser};
use jack_compiler::translator::CodeWriter;
use jack_compiler::xml;
use std::fs;
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(author, version, about = "Jack Compiler for the Hack platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile .jack files to stack machine .vm files
    Compile {
        /// A .jack file or a directory of them; defaults to the configured source directory
        path: Option<PathBuf>,
        /// Emit the parse markup as .xml instead of generating code
        #[arg(long)]
        xml: bool,
    },
    /// Translate .vm files to a Hack assembly .asm file
    Translate {
        /// A .vm file or a directory of them
        path: Option<PathBuf>,
        /// Skip the SP=256 / Sys.init bootstrap preamble
        #[arg(long)]
        no_bootstrap: bool,
    },
    /// Assemble a .asm file into .hack binary code
    Assemble {
        /// A .asm file
        path: Option<PathBuf>,
    },
    /// Run the whole pipeline: .jack sources to a .hack binary
    Build {
        /// A directory of .jack files
        path: Option<PathBuf>,
    },
    /// Manage compiler configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Write a fresh default configuration file
    Init,
}

/// Collects the input files for one stage: a file path is taken as is,
/// a directory contributes every file with the wanted extension, in
/// name order so runs are repeatable.
fn collect_inputs(path: &PathBuf, extension: &str) -> Result<Vec<PathBuf>, CompilerError> {
    if !path.exists() {
        return Err(CompilerError::FileNotFound(format!(
            "No such file or directory: {}",
            path.display()
        )));
    }

    if path.is_file() {
        return Ok(vec![path.clone()]);
    }

    let mut found: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.extension().and_then(|ext| ext.to_str()) == Some(extension) {
            found.push(entry_path);
        }
    }
    found.sort();

    if found.is_empty() {
        return Err(CompilerError::FileNotFound(format!(
            "No .{} files found in: {}",
            extension,
            path.display()
        )));
    }
    Ok(found)
}

fn parse_jack_file(path: &PathBuf) -> Result<Class, CompilerError> {
    let source_code = fs::read_to_string(path)?;
    let tokens = Lexer::new(&source_code, path).tokenize()?;
    let class = Parser::new(tokens, path).parse()?;
    Ok(class)
}

fn compile(path: &PathBuf, emit_xml: bool) -> Result<(), CompilerError> {
    let inputs = collect_inputs(path, "jack")?;

    // Render everything before writing anything, so a failing file
    // never leaves partial outputs behind.
    let mut outputs: Vec<(PathBuf, String)> = Vec::new();
    for input in &inputs {
        let class = parse_jack_file(input)?;
        if emit_xml {
            outputs.push((input.with_extension("xml"), xml::render_class(&class)));
        } else {
            let vm_code = Compiler::new(input).compile(&class)?;
            outputs.push((input.with_extension("vm"), vm_code));
        }
    }

    for (output_path, contents) in &outputs {
        fs::write(output_path, contents)?;
        println!("Wrote {}", output_path.display());
    }
    Ok(())
}

fn translate(path: &PathBuf, bootstrap: bool) -> Result<PathBuf, CompilerError> {
    let inputs = collect_inputs(path, "vm")?;

    let output_path = if path.is_dir() {
        // A directory program becomes a single assembly file named
        // after the directory.
        let stem = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("out"));
        path.join(stem).with_extension("asm")
    } else {
        path.with_extension("asm")
    };

    let mut writer = CodeWriter::new();
    if bootstrap {
        writer.write_bootstrap();
    }
    for input in &inputs {
        let source = fs::read_to_string(input)?;
        writer.write_file(&source, input)?;
    }

    fs::write(&output_path, writer.into_output())?;
    println!("Wrote {}", output_path.display());
    Ok(output_path)
}

fn assemble(path: &PathBuf) -> Result<(), CompilerError> {
    let source = fs::read_to_string(path)?;
    let binary = assembler::assemble(&source, path)?;
    let output_path = path.with_extension("hack");
    fs::write(&output_path, binary)?;
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn build(path: &PathBuf) -> Result<(), CompilerError> {
    compile(path, false)?;
    let asm_path = translate(path, true)?;
    assemble(&asm_path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Compile { path, xml } => {
            let path = path.unwrap_or_else(|| config.source_dir.clone());
            compile(&path, xml)?;
        }
        Commands::Translate { path, no_bootstrap } => {
            let path = path.unwrap_or_else(|| config.source_dir.clone());
            translate(&path, !no_bootstrap)?;
        }
        Commands::Assemble { path } => {
            let path = path.unwrap_or_else(|| config.source_dir.clone());
            assemble(&path)?;
        }
        Commands::Build { path } => {
            let path = path.unwrap_or_else(|| config.source_dir.clone());
            build(&path)?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("Environment: {}", config.env_name);
                println!("Source directory: {}", config.source_dir.display());
                println!("Config file: {}", Config::get_config_path().display());
            }
            ConfigCommands::Init => {
                let config = Config::default();
                config.save()?;
                println!("Wrote {}", Config::get_config_path().display());
            }
        },
    }
    Ok(())
}
