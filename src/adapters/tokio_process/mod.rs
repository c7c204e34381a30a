//! Process adapter backed by `tokio::process`
//!
//! The transcoder rewrites its status line with carriage returns, so the
//! diagnostic stream is split on both `\r` and `\n` to surface progress
//! records as they are produced.

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{ClipperError, ClipperResult};
use crate::ports::{Invocation, ProcessOutput, ProcessPort};

/// Upper bound on captured diagnostic text per invocation
const STDERR_CAPTURE_BYTES: usize = 64 * 1024;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs engines as child processes
#[derive(Debug, Default, Clone)]
pub struct TokioProcessAdapter;

impl TokioProcessAdapter {
    pub fn new() -> Self {
        Self
    }

    fn command(program: impl AsRef<OsStr>) -> Command {
        let mut cmd = Command::new(program);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
        cmd
    }
}

#[async_trait]
impl ProcessPort for TokioProcessAdapter {
    async fn run(
        &self,
        invocation: &Invocation,
        on_stderr_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> ClipperResult<ProcessOutput> {
        debug!(command = %invocation.display(), "Spawning process");

        let mut child = Self::command(&invocation.program)
            .args(&invocation.args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClipperError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let run = async move {
            let stdout_task = tokio::spawn(async move {
                let mut buffer = Vec::new();
                if let Some(mut stdout) = stdout {
                    stdout.read_to_end(&mut buffer).await?;
                }
                Ok::<_, io::Error>(String::from_utf8_lossy(&buffer).into_owned())
            });

            let mut captured = String::new();
            if let Some(stderr) = stderr {
                let mut reader = RecordReader::new(stderr);
                while let Some(record) = reader.next_record().await? {
                    on_stderr_line(&record);
                    if captured.len() + record.len() < STDERR_CAPTURE_BYTES {
                        captured.push_str(&record);
                        captured.push('\n');
                    }
                }
            }

            let status = child.wait().await?;
            let stdout = stdout_task
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

            Ok::<_, io::Error>(ProcessOutput {
                code: status.code(),
                stdout,
                stderr: captured,
            })
        };

        let output = match invocation.timeout {
            // Dropping the future drops the child, which kills it
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                ClipperError::Timeout {
                    program: invocation.program.clone(),
                    secs: limit.as_secs(),
                }
            })??,
            None => run.await?,
        };

        debug!(program = %invocation.program, code = ?output.code, "Process exited");
        Ok(output)
    }
}

/// Yields text records delimited by `\n` or `\r`; blank records are skipped
struct RecordReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    scratch: [u8; 4096],
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            scratch: [0u8; 4096],
        }
    }

    async fn next_record(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(index) = self.pending.iter().position(|&b| b == b'\n' || b == b'\r') {
                let bytes: Vec<u8> = self.pending.drain(..=index).collect();
                let record = String::from_utf8_lossy(&bytes).trim().to_string();
                if record.is_empty() {
                    continue;
                }
                return Ok(Some(record));
            }

            let read = self.reader.read(&mut self.scratch).await?;
            if read == 0 {
                let record = String::from_utf8_lossy(&self.pending).trim().to_string();
                self.pending.clear();
                return Ok((!record.is_empty()).then_some(record));
            }
            self.pending.extend_from_slice(&self.scratch[..read]);
        }
    }
}
