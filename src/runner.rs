//! Runs the engine as a child process.

use crate::{
    error::{Err, Result},
    job::CommandLine,
};
use log::{debug, info, warn};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, LineWriter, Read, Write},
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    sync::Mutex,
    thread,
    time::{Duration, Instant},
};

/// Log target of every line the engine prints.
pub const OUTPUT_TARGET: &str = "openg_output";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Where engine output goes: the `log` facade, and optionally a per-run file.
#[derive(Debug, Default)]
pub struct LogContext {
    label: String,
    file: Option<Mutex<LineWriter<File>>>,
}

impl LogContext {
    pub fn new(label: &str) -> Self {
        Self {
            label: String::from(label),
            file: None,
        }
    }

    /// Also appends every engine line to `path`, creating parent directories.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.file = Some(Mutex::new(LineWriter::new(file)));
        Ok(self)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn stdout_line(&self, line: &str) {
        debug!(target: OUTPUT_TARGET, "[OPENG-OUT] {} {}", self.label, line);
        self.tee(line);
    }

    fn stderr_line(&self, line: &str) {
        info!(target: OUTPUT_TARGET, "[OPENG-ERR] {} {}", self.label, line);
        self.tee(line);
    }

    fn tee(&self, line: &str) {
        if let Some(file) = &self.file {
            let mut file = match file.lock() {
                Ok(file) => file,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(e) = writeln!(file, "{}", line) {
                warn!("failed to write engine output to log file: {}", e);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: i32,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Treats any non-zero exit code as a failure of `command`.
    pub fn check(self, command: &CommandLine) -> Result<()> {
        if self.success() {
            Ok(())
        } else {
            Err(Err::ProcessExecutionError {
                program: command.program.display().to_string(),
                exit_code: self.exit_code,
            })
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs `command` to completion, blocking the calling thread.
    ///
    /// Output is forwarded line by line to `context` while the process runs.
    pub fn run(&self, command: &CommandLine, context: &LogContext) -> Result<ProcessOutcome> {
        let program = command.program.display().to_string();
        debug!("starting job with command line: {}", command);
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Anything the engine forks inherits its pipes, so a timed out run
        // has to take the whole group down before the pumps can finish.
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = cmd
            .spawn()
            .map_err(|source| Err::ProcessLaunchError {
                program: program.clone(),
                source,
            })?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let status = thread::scope(|s| {
            if let Some(stdout) = stdout {
                s.spawn(move || pump(stdout, |line| context.stdout_line(line)));
            }
            if let Some(stderr) = stderr {
                s.spawn(move || pump(stderr, |line| context.stderr_line(line)));
            }
            wait(&mut child, self.timeout, &program)
        })?;
        let exit_code = match status.code() {
            Some(code) => code,
            None => {
                warn!("{} was terminated by a signal", program);
                -1
            }
        };
        debug!("{} exited with code {}", program, exit_code);
        Ok(ProcessOutcome { exit_code })
    }
}

fn wait(child: &mut Child, timeout: Option<Duration>, program: &str) -> Result<ExitStatus> {
    let timeout = match timeout {
        Some(timeout) => timeout,
        None => return Ok(child.wait()?),
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!("{} exceeded {:?}, killing it", program, timeout);
            if let Err(e) = kill(child) {
                warn!("failed to kill {}: {}", program, e);
            }
            child.wait()?;
            return Err(Err::ProcessTimedOut {
                program: String::from(program),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill(child: &mut Child) -> io::Result<()> {
    // SAFETY: killpg has no memory safety requirements.
    let ret = unsafe { libc::killpg(child.id() as libc::pid_t, libc::SIGKILL) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill(child: &mut Child) -> io::Result<()> {
    child.kill()
}

fn pump<R: Read, F: FnMut(&str)>(stream: R, mut f: F) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                f(line.trim_end_matches(&['\r', '\n'][..]));
            }
            Err(e) => {
                warn!("failed to read engine output: {}", e);
                return;
            }
        }
    }
}
