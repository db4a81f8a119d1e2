use crate::{AdapterError, CommandOutcome};
use pkgmanager_schema::ManagerType;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of one finished external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub command: String,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert a non-zero exit into `ExternalCommandFailed`.
    pub fn check(self) -> Result<Self, AdapterError> {
        if self.success() {
            Ok(self)
        } else {
            Err(AdapterError::ExternalCommandFailed {
                command: self.command,
                code: self.code.unwrap_or(-1),
                stderr: self.stderr.trim().to_owned(),
            })
        }
    }

    pub fn into_outcome(self, message: impl Into<String>) -> CommandOutcome {
        let mut raw_output = self.stdout;
        if !self.stderr.is_empty() {
            if !raw_output.is_empty() && !raw_output.ends_with('\n') {
                raw_output.push('\n');
            }
            raw_output.push_str(&self.stderr);
        }
        CommandOutcome {
            success: self.code == Some(0),
            message: message.into(),
            raw_output,
        }
    }
}

/// Runs external commands on behalf of one manager type with a hard timeout.
#[derive(Debug, Clone)]
pub struct Runner {
    manager: ManagerType,
    timeout: Duration,
}

impl Runner {
    pub fn new(manager: ManagerType, timeout: Duration) -> Self {
        Self { manager, timeout }
    }

    pub fn manager(&self) -> ManagerType {
        self.manager
    }

    /// Run and require a zero exit status.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, AdapterError> {
        self.output(program, args)?.check()
    }

    /// Run a mutating command and describe it as a `CommandOutcome`.
    pub fn invoke(&self, program: &str, args: &[&str]) -> Result<CommandOutcome, AdapterError> {
        let output = self.run(program, args)?;
        let message = format!("ran `{}`", output.command);
        Ok(output.into_outcome(message))
    }

    /// Run and return the output whatever the exit status.
    ///
    /// A missing executable maps to `ManagerUnavailable`; exceeding the
    /// timeout kills the child and maps to `Timeout`. The deadline also
    /// covers draining the pipes, which stay open while any process the
    /// child left in the background still holds them.
    pub fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput, AdapterError> {
        let command = command_line(program, args);
        debug!("{}: running `{command}`", self.manager);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AdapterError::ManagerUnavailable(self.manager),
                _ => AdapterError::Io(e),
            })?;

        let (tx, rx) = mpsc::channel();
        drain(child.stdout.take(), Stream::Stdout, tx.clone());
        drain(child.stderr.take(), Stream::Stderr, tx);

        let deadline = Instant::now() + self.timeout;
        let timed_out = |command: String| AdapterError::Timeout {
            command,
            seconds: self.timeout.as_secs(),
        };
        let Some(status) = wait_until(&mut child, deadline)? else {
            debug!("{}: `{command}` timed out", self.manager);
            return Err(timed_out(command));
        };

        let mut output = CommandOutput {
            command,
            code: status.code(),
            stdout: String::new(),
            stderr: String::new(),
        };
        loop {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok((Stream::Stdout, text)) => output.stdout = text,
                Ok((Stream::Stderr, text)) => output.stderr = text,
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    debug!(
                        "{}: `{}` exited but its output pipes stayed open",
                        self.manager, output.command
                    );
                    return Err(timed_out(output.command));
                }
            }
        }
        debug!(
            "{}: `{}` exited with {:?}",
            self.manager, output.command, output.code
        );
        Ok(output)
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>, AdapterError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

enum Stream {
    Stdout,
    Stderr,
}

/// Read `pipe` to the end on its own thread and send the text to `tx`.
fn drain<R: Read + Send + 'static>(pipe: Option<R>, stream: Stream, tx: Sender<(Stream, String)>) {
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
        });
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_owned();
    for arg in args {
        line.push(' ');
        if arg.contains(char::is_whitespace) || arg.is_empty() {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// The shell used for custom package scripts when a spec names none:
/// `$SHELL` when it exists on disk, else `/bin/bash`, else `sh`.
pub fn detect_shell() -> String {
    if let Ok(shell) = std::env::var("SHELL") {
        if !shell.is_empty() && Path::new(&shell).exists() {
            return shell;
        }
    }
    if Path::new("/bin/bash").exists() {
        return "/bin/bash".to_owned();
    }
    "sh".to_owned()
}

/// Whether `tool` resolves to an executable on `PATH`.
pub fn tool_on_path(tool: &str) -> bool {
    which::which(tool).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(timeout: Duration) -> Runner {
        Runner::new(ManagerType::Custom, timeout)
    }

    #[test]
    fn captures_stdout_and_status() {
        let out = runner(Duration::from_secs(10))
            .run("sh", &["-c", "echo hello"])
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.success());
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let err = runner(Duration::from_secs(10))
            .run("sh", &["-c", "echo broken >&2; exit 3"])
            .unwrap_err();
        match err {
            AdapterError::ExternalCommandFailed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn output_does_not_fail_on_exit_status() {
        let out = runner(Duration::from_secs(10))
            .output("sh", &["-c", "exit 1"])
            .unwrap();
        assert_eq!(out.code, Some(1));
    }

    #[test]
    fn missing_program_is_manager_unavailable() {
        let err = Runner::new(ManagerType::Bun, Duration::from_secs(1))
            .run("pkgmanager-definitely-not-a-real-binary", &[])
            .unwrap_err();
        assert!(matches!(err, AdapterError::ManagerUnavailable(ManagerType::Bun)));
    }

    #[test]
    fn hung_command_times_out() {
        let start = Instant::now();
        let err = runner(Duration::from_millis(200))
            .run("sleep", &["5"])
            .unwrap_err();
        assert!(matches!(err, AdapterError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn background_child_holding_pipes_times_out() {
        let start = Instant::now();
        let err = runner(Duration::from_secs(1))
            .output("sh", &["-c", "sleep 6 & echo started"])
            .unwrap_err();
        assert!(matches!(err, AdapterError::Timeout { .. }), "{err}");
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn outcome_merges_streams() {
        let out = runner(Duration::from_secs(10))
            .output("sh", &["-c", "echo out; echo err >&2"])
            .unwrap();
        let outcome = out.into_outcome("done");
        assert!(outcome.success);
        assert_eq!(outcome.raw_output, "out\nerr\n");
    }

    #[test]
    fn command_line_quotes_whitespace() {
        assert_eq!(
            command_line("sh", &["-c", "echo hi"]),
            "sh -c 'echo hi'"
        );
    }

    #[test]
    fn shell_detection_returns_something_runnable() {
        let shell = detect_shell();
        assert!(!shell.is_empty());
    }
}
