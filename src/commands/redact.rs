//! Redact command implementation

use crate::cli::RedactArgs;
use crate::error::Result;
use crate::redact::redact_sensitive_info;
use std::io::Read;

/// Redact a file, or stdin, to stdout
pub fn run_redact(args: &RedactArgs) -> Result<()> {
    let input = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    print!("{}", redact_sensitive_info(&input));
    Ok(())
}
