//! Command execution through the host shell.
//!
//! Commands are handed to `sh -c` (or `cmd /C` on Windows) untouched; natsh
//! never parses them. A non-zero exit status is not an error here: both
//! output streams are shown and recorded like any other run.

use crate::classifier::ShellDialect;
use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Output};
use tracing::{info, warn};

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
}

impl CommandOutput {
    /// Stdout followed by stderr, as recorded in history.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running system processes.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Executes a program and waits for its output.
    fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
}

/// Default process runner using std::process::Command.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.output()
            .with_context(|| format!("failed to start {}", program))
    }
}

// =============================================================================
// Executor Implementation
// =============================================================================

pub struct Executor {
    dialect: ShellDialect,
    runner: Box<dyn ProcessRunner>,
}

impl Executor {
    pub fn new(dialect: ShellDialect) -> Self {
        Self::with_runner(dialect, Box::new(SystemProcessRunner))
    }

    pub fn with_runner(dialect: ShellDialect, runner: Box<dyn ProcessRunner>) -> Self {
        Self { dialect, runner }
    }

    fn shell_invocation(&self) -> (&'static str, &'static str) {
        match self.dialect {
            ShellDialect::Posix => ("sh", "-c"),
            ShellDialect::WindowsCmd => ("cmd", "/C"),
        }
    }

    /// Runs `command` through the shell, echoing its output to `output`.
    ///
    /// # Errors
    ///
    /// Only when the shell itself cannot be started.
    pub fn run_with_io<W: Write>(&self, command: &str, output: &mut W) -> Result<CommandOutput> {
        let (shell, flag) = self.shell_invocation();
        info!("Executing: {} {} {:?}", shell, flag, command);

        let raw = self.runner.run(shell, &[flag, command])?;
        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&raw.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&raw.stderr).into_owned(),
            status: raw.status.code(),
        };
        if !raw.status.success() {
            warn!("Command exited with status: {}", raw.status);
        }

        Self::handle_output(&result, output)?;
        Ok(result)
    }

    /// Writes stdout then stderr, as the shell would interleave them for a
    /// quick command.
    fn handle_output<W: Write>(result: &CommandOutput, output: &mut W) -> Result<()> {
        if !result.stdout.is_empty() {
            write!(output, "{}", result.stdout)?;
        }
        if !result.stderr.is_empty() {
            write!(output, "{}", result.stderr)?;
        }
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }

    /// Mock process runner recording the command lines it was given.
    pub struct MockProcessRunner {
        stdout: String,
        stderr: String,
        code: i32,
        pub calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl MockProcessRunner {
        pub fn success(stdout: &str) -> Self {
            Self {
                stdout: stdout.to_string(),
                stderr: String::new(),
                code: 0,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn failure(stderr: &str) -> Self {
            Self {
                stdout: String::new(),
                stderr: stderr.to_string(),
                code: 1,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ProcessRunner for MockProcessRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.lock().unwrap().push(call);
            Ok(Output {
                status: exit_status(self.code),
                stdout: self.stdout.as_bytes().to_vec(),
                stderr: self.stderr.as_bytes().to_vec(),
            })
        }
    }

    struct FailingRunner;

    impl ProcessRunner for FailingRunner {
        fn run(&self, program: &str, _args: &[&str]) -> Result<Output> {
            Err(anyhow::anyhow!("failed to start {}", program))
        }
    }

    #[test]
    fn test_posix_uses_sh_c() {
        let runner = MockProcessRunner::success("");
        let calls = runner.calls.clone();
        let executor = Executor::with_runner(ShellDialect::Posix, Box::new(runner));

        executor.run_with_io("ls -la | wc -l", &mut Vec::new()).unwrap();

        assert_eq!(calls.lock().unwrap()[0], vec!["sh", "-c", "ls -la | wc -l"]);
    }

    #[test]
    fn test_windows_uses_cmd_c() {
        let runner = MockProcessRunner::success("");
        let calls = runner.calls.clone();
        let executor = Executor::with_runner(ShellDialect::WindowsCmd, Box::new(runner));

        executor.run_with_io("dir /s", &mut Vec::new()).unwrap();

        assert_eq!(calls.lock().unwrap()[0], vec!["cmd", "/C", "dir /s"]);
    }

    #[test]
    fn test_success_writes_and_captures_stdout() {
        let executor = Executor::with_runner(
            ShellDialect::Posix,
            Box::new(MockProcessRunner::success("Hello, World!\n")),
        );
        let mut output = Vec::new();

        let result = executor.run_with_io("echo 'Hello, World!'", &mut output).unwrap();

        assert_eq!(String::from_utf8_lossy(&output), "Hello, World!\n");
        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.status, Some(0));
    }

    #[test]
    fn test_failure_is_not_an_error() {
        let executor = Executor::with_runner(
            ShellDialect::Posix,
            Box::new(MockProcessRunner::failure("No such file\n")),
        );
        let mut output = Vec::new();

        let result = executor.run_with_io("cat missing", &mut output).unwrap();

        assert_eq!(result.status, Some(1));
        assert_eq!(result.combined(), "No such file\n");
        assert_eq!(String::from_utf8_lossy(&output), "No such file\n");
    }

    #[test]
    fn test_unstartable_shell_is_an_error() {
        let executor = Executor::with_runner(ShellDialect::Posix, Box::new(FailingRunner));
        let err = executor.run_with_io("ls", &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("failed to start sh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_shell_captures_both_streams() {
        let executor = Executor::new(ShellDialect::Posix);
        let mut output = Vec::new();

        let result = executor
            .run_with_io("echo out; echo err 1>&2; exit 3", &mut output)
            .unwrap();

        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.status, Some(3));
        assert_eq!(result.combined(), "out\nerr\n");
    }
}
