//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs, io,
    path::{Path, PathBuf},
    process,
};

use jack_compiler::compile_str;
use log::{error, info};

static USAGE: &str = r#"
usage: jackc PATH

arguments:
    PATH    one .jack source file, or a directory of .jack source files

Each unit compiles independently; its instruction stream is written
next to the source as <Name>.vm.

examples:
    jackc Main.jack
    jackc projects/Square
"#;

fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let Some(path) = parse_args() else {
        print_usage();
        // FreeBSD EX_USAGE (64)
        process::exit(64);
    };

    if let Err(err) = run(&path) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(path: &Path) -> Result<(), Box<dyn Error>> {
    let sources = collect_sources(path)?;
    if sources.is_empty() {
        return Err(format!("no .jack files found in {}", path.display()).into());
    }

    // Units are fully independent; one malformed file must not corrupt
    // the output of its siblings.
    let mut failed = 0;
    for source_path in &sources {
        match compile_file(source_path) {
            Ok(out_path) => {
                info!("compiled {} -> {}", source_path.display(), out_path.display())
            }
            Err(err) => {
                failed += 1;
                error!("{}: {}", source_path.display(), err);
            }
        }
    }

    if failed > 0 {
        Err(format!("{failed} unit(s) failed to compile").into())
    } else {
        Ok(())
    }
}

/// One file compiles as-is; a directory yields every contained `.jack`
/// file in sorted order, so batch output is deterministic.
fn collect_sources(path: &Path) -> io::Result<Vec<PathBuf>> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "jack"))
            .collect();
        files.sort();
        Ok(files)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

/// Compile one unit. The output file is only written once the whole
/// unit compiled; a failed unit leaves no partial output behind.
fn compile_file(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let source = fs::read_to_string(path)?;
    let code = compile_str(&source)?;

    let out_path = path.with_extension("vm");
    fs::write(&out_path, code)?;
    Ok(out_path)
}

fn parse_args() -> Option<PathBuf> {
    let mut args = env::args().skip(1);
    let path = args.next()?;
    // Extra arguments are a usage error.
    if args.next().is_some() {
        return None;
    }
    Some(PathBuf::from(path))
}

fn print_usage() {
    println!("jackc v{}", env!("CARGO_PKG_VERSION"));
    println!("{USAGE}");
}
