use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};

use armlet::output::{self, Dump};
use armlet::{assemble, Instruction, RunEnvironment};

/// Armlet assembles and emulates a reduced 32-bit ARM instruction set.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a text source file into a flat binary
    Assemble {
        /// Assembly source to read
        input: PathBuf,
        /// Binary file to write
        output: PathBuf,
    },
    /// Run a binary and print the final machine state
    Emulate {
        /// Binary file to load at address 0
        input: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Assemble a source file in memory and run it
    Run {
        /// Assembly source to run
        input: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a source file without writing a binary
    Check {
        /// Assembly source to check
        input: PathBuf,
    },
    /// Print the decoded instructions of a binary
    Disassemble {
        /// Binary file to decode
        input: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    armlet::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(armlet::env::context_lines())
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        println!("\n~ armlet v{VERSION} ~");
        println!("{}", LOGO.cyan().bold());
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Assemble { input, output } => {
            file_message(Green, "Assembling", &input);
            let src = fs::read_to_string(&input).into_diagnostic()?;
            let binary = assemble(&src)?;
            message(Green, "Finished", &format!("emit {} bytes", binary.len()));
            fs::write(&output, binary).into_diagnostic()?;
            file_message(Green, "Saved", &output);
            Ok(())
        }
        Command::Emulate { input, minimal } => {
            let binary = fs::read(&input).into_diagnostic()?;
            emulate(&input, &binary, minimal)
        }
        Command::Run { input, minimal } => {
            if !minimal {
                file_message(Green, "Assembling", &input);
            }
            let src = fs::read_to_string(&input).into_diagnostic()?;
            let binary = assemble(&src)?;
            emulate(&input, &binary, minimal)
        }
        Command::Check { input } => {
            file_message(Green, "Checking", &input);
            let src = fs::read_to_string(&input).into_diagnostic()?;
            let _ = assemble(&src)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Command::Disassemble { input } => {
            let binary = fs::read(&input).into_diagnostic()?;
            if binary.len() % 4 != 0 {
                bail!(
                    code = "load::unaligned",
                    help = "binaries are made of whole 32-bit words",
                    "File is not aligned to 32 bits"
                );
            }
            for (i, word) in binary.chunks_exact(4).enumerate() {
                let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                println!("0x{:08x}: {word:08x}  {}", i * 4, Instruction::decode(word));
            }
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

fn emulate(name: &Path, binary: &[u8], minimal: bool) -> Result<()> {
    let mut program = RunEnvironment::from_raw(binary)?;
    output::set_minimal(minimal);
    program.set_trace(armlet::env::is_trace_enabled());

    if !minimal {
        message(MsgColor::Green, "Running", "emitted binary");
    }
    program.run();

    print!("{}", Dump(program.state()));
    if !minimal {
        let faults = program.faults().len();
        if faults > 0 {
            message(MsgColor::Red, "Faulted", &format!("{faults} time(s)"));
        }
        file_message(MsgColor::Green, "Completed", name);
    }
    Ok(())
}

const LOGO: &str = r#"
                     _      _
   __ _ _ __ _ __ ___ | | ___| |_
  / _` | '__| '_ ` _ \| |/ _ \ __|
 | (_| | |  | | | | | | |  __/ |_
  \__,_|_|  |_| |_| |_|_|\___|\__|"#;

const SHORT_INFO: &str = r"
Welcome to armlet, a two-pass assembler and pipelined emulator
for a reduced 32-bit ARM instruction set.
Please use `-h` or `--help` to access the usage instructions.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
