//! [`Converter`] backed by the system `plutil` tool.

use plist_core::{Converter, Format};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

/// Runs `plutil -convert <format> -o - -- -`, piping the document through
/// stdin and stdout. Failures are logged and reported as an empty result.
#[derive(Debug, Clone)]
pub struct Plutil {
    program: String,
}

impl Plutil {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, bytes: &[u8], target: Format) -> std::io::Result<std::process::Output> {
        let mut child = Command::new(&self.program)
            .args(["-convert", target.external_name(), "-o", "-", "--", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from a separate thread so a full stdout pipe cannot
        // deadlock the child.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = bytes.to_vec();
            thread::spawn(move || stdin.write_all(&input))
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(result) => result?,
                Err(_) => warn!(program = %self.program, "stdin writer thread panicked"),
            }
        }
        Ok(output)
    }
}

impl Converter for Plutil {
    fn convert(&self, bytes: &[u8], target: Format) -> Vec<u8> {
        debug!(program = %self.program, %target, bytes = bytes.len(), "running converter");
        match self.run(bytes, target) {
            Ok(output) if output.status.success() => output.stdout,
            Ok(output) => {
                warn!(
                    program = %self.program,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "converter exited with an error"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(program = %self.program, error = %e, "could not run converter");
                Vec::new()
            }
        }
    }
}
