//! An interactive Knight session. Each line is one program; they all share
//! one environment, so variables assigned on one line are visible on the
//! next.

use knight::evaluate_with;
use knight::evaluator::Environment;
use knight::value::Value;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

fn main() {
    println!("Knight interactive session");
    println!("Each line is a Knight program; variables persist between lines.");
    println!("Try: = x 5   then   OUTPUT * x x");
    println!("Type :quit or Ctrl+D to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("could not initialize the line editor: {err}");
            return;
        }
    };

    let mut env = Environment::new();

    loop {
        match rl.readline("knight> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if line == ":quit" || line == ":exit" {
                    break;
                }

                match evaluate_with(line, &mut env) {
                    // Suppress null results so OUTPUT-style lines stay clean.
                    Ok(Value::Null) => {}
                    Ok(value) => println!("{value}"),
                    Err(err) => println!("error: {err}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(err) => {
                println!("error: {err:?}");
                break;
            }
        }
    }
}
