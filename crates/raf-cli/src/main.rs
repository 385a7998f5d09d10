//! The `raf` driver: thin subcommands over the language library.

use std::{
    env, fs,
    io::{self, Write},
    process::ExitCode,
};

use raf::{Backend, ReplSession, Runner, StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("run") => cmd_run(&args[2..]),
        Some("dis") => cmd_dis(&args[2..]),
        Some("repl") => cmd_repl(),
        _ => {
            eprintln!("usage: raf <command>\n");
            eprintln!("  run <file> [--vm]   run a .raf file (tree-walker by default)");
            eprintln!("  dis <file>          compile a .raf file and print its disassembly");
            eprintln!("  repl                start an interactive session");
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(args: &[String]) -> ExitCode {
    let mut file = None;
    let mut backend = Backend::Tree;
    for arg in args {
        match arg.as_str() {
            "--vm" => backend = Backend::Vm,
            other if file.is_none() => file = Some(other),
            other => {
                eprintln!("unexpected argument: {other}");
                return ExitCode::FAILURE;
            }
        }
    }
    let Some(file) = file else {
        eprintln!("usage: raf run <file> [--vm]");
        return ExitCode::FAILURE;
    };

    let source = match read_file(file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let runner = match Runner::new(&source, file) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    match runner.run(backend, &mut StdPrint) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_dis(args: &[String]) -> ExitCode {
    let [file] = args else {
        eprintln!("usage: raf dis <file>");
        return ExitCode::FAILURE;
    };
    let source = match read_file(file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    match Runner::new(&source, file) {
        Ok(runner) => {
            print!("{}", runner.disassemble());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_repl() -> ExitCode {
    println!("raf REPL. End statements with ';'. Use {{ }} for blocks. Type 'quit' to exit.");
    let mut session = ReplSession::new();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { ">>> " } else { "... " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };

        if buffer.is_empty() && matches!(line.trim(), "quit" | "exit") {
            break;
        }

        buffer.push_str(&line);
        buffer.push('\n');

        // submit once the input looks finished: the last non-whitespace
        // character is ';' or '}'
        let stripped = buffer.trim();
        if stripped.is_empty() {
            buffer.clear();
            continue;
        }
        if !(stripped.ends_with(';') || stripped.ends_with('}')) {
            continue;
        }

        if let Err(err) = session.execute(&buffer, &mut StdPrint) {
            eprintln!("{err}");
        }
        buffer.clear();
    }

    ExitCode::SUCCESS
}

fn read_file(path: &str) -> Result<String, String> {
    match fs::metadata(path) {
        Ok(metadata) if !metadata.is_file() => return Err(format!("Error: {path} is not a file")),
        Ok(_) => {}
        Err(err) => return Err(format!("Error reading {path}: {err}")),
    }
    fs::read_to_string(path).map_err(|err| format!("Error reading {path}: {err}"))
}

/// Reads one line from stdin after printing a prompt.
///
/// Returns `None` on EOF (Ctrl+D).
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
