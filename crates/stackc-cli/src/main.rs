//! `stackc`: argument parsing, stdout layout, and exit-code mapping around
//! the `stackc` library — a manual `std::env::args()` loop and
//! `eprintln!`-based error reporting, rather than reaching for `clap`.

use std::path::Path;
use std::process::ExitCode;

use stackc::codegen::jbc::sanitize_class_name;
use stackc::pipeline::{compile, Backends};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut path = None;
    let mut backends = Backends::Both;
    for arg in &args {
        match arg.as_str() {
            "--msil-only" => backends = Backends::SilOnly,
            "--jbc-only" => backends = Backends::JbcOnly,
            other if path.is_none() => path = Some(other.to_owned()),
            other => {
                eprintln!("stackc: unexpected argument '{other}'");
                return ExitCode::from(1);
            }
        }
    }

    let Some(path) = path else {
        eprintln!("usage: stackc <source-file> [--msil-only | --jbc-only]");
        return ExitCode::from(1);
    };

    let src = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("stackc: could not read '{path}': {e}");
            return ExitCode::from(1);
        }
    };

    let stem = Path::new(&path).file_stem().and_then(|s| s.to_str()).unwrap_or("Program");
    let class_name = sanitize_class_name(stem);

    match compile(&src, &class_name, backends) {
        Ok(output) => {
            match backends {
                Backends::Both => {
                    println!("ast:");
                    println!("{}", output.ast_tree);
                    println!("semantic-check:");
                    println!("{}", output.semantic_check);
                    println!("msil:");
                    println!("{}", output.sil.expect("sil is generated unless jbc-only"));
                    println!("jbc:");
                    println!("{}", output.jbc.expect("jbc is generated unless msil-only"));
                }
                Backends::SilOnly => {
                    println!("msil:");
                    println!("{}", output.sil.expect("sil is generated in msil-only mode"));
                }
                Backends::JbcOnly => {
                    println!("jbc:");
                    println!("{}", output.jbc.expect("jbc is generated in jbc-only mode"));
                }
            }
            ExitCode::from(0)
        }
        Err(err) => {
            eprintln!("stackc: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
