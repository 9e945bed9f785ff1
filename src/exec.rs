use crate::logging::Logger;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::Mutex;

/// One external command invocation. Env entries are additions on top of the
/// inherited environment; only present entries are passed, never
/// empty-string toggles.
#[derive(Debug, Default, Clone)]
pub struct ExecTask {
    pub command: String,
    pub args: Vec<String>,
    pub shell: bool,
    pub env: Vec<(String, String)>,
    pub cwd: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl ExecTask {
    pub fn new(command: &str, args: &[&str]) -> Self {
        ExecTask {
            command: command.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            ..ExecTask::default()
        }
    }

    pub fn shell(command: &str) -> Self {
        ExecTask {
            command: command.into(),
            shell: true,
            ..ExecTask::default()
        }
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Runs the command to completion, streaming output lines through the
    /// logger while capturing both streams and the exit code.
    pub fn execute(&self, log: &Logger) -> Result<ExecResult, String> {
        log.debug("executing", &[("command", &self.command)]);

        let mut cmd = if self.shell {
            let mut c = Command::new("/bin/sh");
            c.arg("-c").arg(&self.command);
            c
        } else {
            let mut c = Command::new(&self.command);
            c.args(&self.args);
            c
        };

        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("starting command {:?}: {}", self.command, e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_buf = Mutex::new(String::new());
        let stderr_buf = Mutex::new(String::new());

        std::thread::scope(|s| {
            let h1 = s.spawn(|| {
                if let Some(r) = stdout {
                    capture_lines(log, r, "stdout", &stdout_buf);
                }
            });
            let h2 = s.spawn(|| {
                if let Some(r) = stderr {
                    capture_lines(log, r, "stderr", &stderr_buf);
                }
            });
            h1.join().ok();
            h2.join().ok();
        });

        let status = child
            .wait()
            .map_err(|e| format!("waiting for command {:?}: {}", self.command, e))?;

        Ok(ExecResult {
            stdout: stdout_buf.into_inner().unwrap_or_default(),
            stderr: stderr_buf.into_inner().unwrap_or_default(),
            exit_code: status.code().unwrap_or(-1),
        })
    }

    /// Like `execute`, but a non-zero exit is an error naming the command.
    pub fn execute_checked(&self, log: &Logger) -> Result<ExecResult, String> {
        let res = self.execute(log)?;
        if !res.success() {
            return Err(format!(
                "command {:?} exited with code {}",
                self.command, res.exit_code
            ));
        }
        Ok(res)
    }
}

fn capture_lines<R: Read>(log: &Logger, reader: R, stream: &str, buf: &Mutex<String>) {
    let lines = BufReader::new(reader);
    for l in lines.lines().map_while(Result::ok) {
        log.info(&l, &[("stream", stream)]);
        if let Ok(mut b) = buf.lock() {
            b.push_str(&l);
            b.push('\n');
        }
    }
}
