use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::io::BufRead;

pub fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format output")?;
    println!("{text}");
    Ok(())
}

/// Parses `Name: value` into a header pair.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Header '{}' is not in 'Name: value' form", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Header '{}' has an empty name", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Reads one line from stdin, without the trailing newline.
pub fn read_stdin_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
