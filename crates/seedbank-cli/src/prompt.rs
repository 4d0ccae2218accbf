use std::io::{self, BufRead, IsTerminal, Write};

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
///
/// Fails when stdin is not a terminal, so scripts must pass an explicit
/// confirmation flag instead.
pub(crate) fn confirm(question: &str, flag: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(format!(
            "refusing to continue without confirmation in non-interactive mode; use {flag} to skip the prompt"
        )
        .into());
    }
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;

    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::is_yes;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES \r\n"));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }
}
