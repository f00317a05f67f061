//! Command runner abstraction for executing argv vectors.
//!
//! `CommandRunner` is the trait the local runtime uses to execute commands.
//! `ProcessRunner` is the production implementation that spawns the
//! program directly (no shell). `MockRunner` is the test double that
//! records calls and returns preset responses.

use std::cell::RefCell;
use std::path::Path;
use std::process::Command;

use super::ExecOutput;

/// Trait for executing a command in a working directory.
pub trait CommandRunner {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<ExecOutput, String>;
}

/// Production runner that spawns `argv[0]` with the remaining arguments.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<ExecOutput, String> {
        let (program, args) = argv.split_first().ok_or("empty command")?;
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| format!("Failed to execute {}: {}", program, e))?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Test-double runner that records commands and returns pre-configured responses.
pub struct MockRunner {
    responses: RefCell<Vec<Result<ExecOutput, String>>>,
    commands: RefCell<Vec<Vec<String>>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<Result<ExecOutput, String>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: RefCell::new(reversed),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn executed_commands(&self) -> Vec<Vec<String>> {
        self.commands.borrow().clone()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, argv: &[String], _cwd: &Path) -> Result<ExecOutput, String> {
        self.commands.borrow_mut().push(argv.to_vec());
        self.responses
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Ok(ExecOutput::success("")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mock_runner_records_commands() {
        let runner = MockRunner::new();
        runner.run(&argv(&["a2ensite", "wsgi-cinder-api"]), Path::new("/")).unwrap();
        runner.run(&argv(&["true"]), Path::new("/")).unwrap();
        let cmds = runner.executed_commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], argv(&["a2ensite", "wsgi-cinder-api"]));
    }

    #[test]
    fn mock_runner_returns_responses_in_order() {
        let runner = MockRunner::with_responses(vec![
            Ok(ExecOutput::success("first")),
            Err("spawn failed".into()),
            Ok(ExecOutput::failure(3, "third")),
        ]);
        assert_eq!(runner.run(&argv(&["a"]), Path::new("/")).unwrap().stdout, "first");
        assert_eq!(runner.run(&argv(&["b"]), Path::new("/")).unwrap_err(), "spawn failed");
        assert_eq!(runner.run(&argv(&["c"]), Path::new("/")).unwrap().exit_code, 3);
    }

    #[test]
    fn process_runner_rejects_empty_argv() {
        assert!(ProcessRunner.run(&[], Path::new("/")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_captures_exit_code() {
        let out = ProcessRunner.run(&argv(&["sh", "-c", "echo hi; exit 3"]), Path::new("/")).unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, "hi\n");
    }
}
