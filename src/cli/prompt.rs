//! Interactive stdin prompts.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Ask a yes/no question. An empty answer takes `default` when there is one.
pub fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let stdin = io::stdin();
    confirm_from(&mut stdin.lock(), &mut io::stdout(), prompt, default)
}

/// Ask for a path, offering `current` as the default
pub fn prompt_path(prompt: &str, current: Option<&PathBuf>) -> io::Result<PathBuf> {
    let stdin = io::stdin();
    path_from(&mut stdin.lock(), &mut io::stdout(), prompt, current)
}

fn confirm_from(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
    default: Option<bool>,
) -> io::Result<bool> {
    let mut line = String::new();

    loop {
        line.clear();

        match default {
            Some(true) => write!(output, "{} (Y/n): ", prompt)?,
            Some(false) | None => write!(output, "{} (y/N): ", prompt)?,
        }
        output.flush()?;

        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no answer on stdin"));
        }

        match line.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

fn path_from(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
    current: Option<&PathBuf>,
) -> io::Result<PathBuf> {
    let mut line = String::new();

    loop {
        line.clear();

        match current {
            Some(current) => write!(output, "{} [{}]: ", prompt, current.display())?,
            None => write!(output, "{}: ", prompt)?,
        }
        output.flush()?;

        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no answer on stdin"));
        }

        match (line.trim(), current) {
            ("", Some(current)) => return Ok(current.clone()),
            ("", None) => continue,
            (answer, _) => return Ok(PathBuf::from(answer)),
        }
    }
}
