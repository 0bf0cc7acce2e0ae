use crate::domain::models::{JsonErr, JsonOut, StepReport};
use console::style;
use serde::Serialize;

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

/// Failure output: JSON envelope on stdout, or message plus hint on stderr.
pub fn print_error(json: bool, error: &anyhow::Error, hint: Option<String>) {
    if json {
        let body = JsonErr {
            ok: false,
            error: format!("{:#}", error),
            hint,
        };
        match serde_json::to_string_pretty(&body) {
            Ok(s) => println!("{}", s),
            Err(_) => println!("{{\"ok\":false}}"),
        }
    } else {
        eprintln!("{} {:#}", style("error:").red().bold(), error);
        if let Some(h) = hint {
            eprintln!("{} {}", style("hint:").yellow().bold(), h);
        }
    }
}

pub fn step_line(r: &StepReport) -> String {
    let mut line = format!("{}\t{}", r.step, r.status);
    for (k, v) in &r.outputs {
        line.push_str(&format!("\n  {}: {}", k, v));
    }
    line
}
