//! JSON I/O handling for CLI
//!
//! - Input: one JSON value on stdin
//! - Output: one JSON object on stdout
//! - Logs go to stderr, so stdout stays machine-readable

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read one JSON request from stdin
pub fn read_request() -> CliResult<Value> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_request(&input)
}

fn parse_request(input: &str) -> CliResult<Value> {
    if input.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(serde_json::from_str(input)?)
}

/// Read a JSON array of documents
pub fn read_documents(path: &Path) -> CliResult<Vec<Value>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    match serde_json::from_str(&content)? {
        Value::Array(documents) => Ok(documents),
        _ => Err(CliError::io_error(format!(
            "{} must contain a JSON array of documents",
            path.display()
        ))),
    }
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&response)
}

fn write_line(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_parse_request() {
        assert_eq!(parse_request("{\"a\": 1}\n").unwrap()["a"], 1);
        assert_eq!(parse_request("\"status = open\"").unwrap(), "status = open");
        assert!(parse_request("  \n").is_err());
        assert!(parse_request("{").is_err());
    }

    #[test]
    fn test_read_documents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 1}}, {{"id": 2}}]"#).unwrap();
        assert_eq!(read_documents(file.path()).unwrap().len(), 2);

        let mut object = tempfile::NamedTempFile::new().unwrap();
        write!(object, r#"{{"id": 1}}"#).unwrap();
        assert!(read_documents(object.path()).is_err());
    }
}
