// Ports - Interface definitions (contracts)

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ClipperResult;

/// One external engine invocation: program, arguments and an optional deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Command line for logs, with stream URLs redacted
    pub fn display(&self) -> String {
        crate::utils::redact_urls(&format!("{} {}", self.program, self.args.join(" ")))
    }
}

/// Exit status and captured output of a finished invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    /// Diagnostic stream, capped in size
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Port for running external engines (media resolver and transcoder)
#[async_trait]
pub trait ProcessPort: Send + Sync {
    /// Run to completion, handing every diagnostic line to `on_stderr_line` as it arrives.
    ///
    /// A non-zero exit is not an error at this level; callers inspect `ProcessOutput::code`.
    async fn run(
        &self,
        invocation: &Invocation,
        on_stderr_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> ClipperResult<ProcessOutput>;

    /// Check that a program starts and reports a version
    async fn probe_version(&self, program: &str, version_flag: &str) -> ClipperResult<String> {
        let invocation = Invocation::new(program)
            .arg(version_flag)
            .with_timeout(Duration::from_secs(10));
        let output = self.run(&invocation, &mut |_: &str| {}).await?;
        let first_line = output.stdout.lines().next().unwrap_or_default().trim().to_string();
        if output.success() {
            Ok(first_line)
        } else {
            Err(crate::error::ClipperError::EngineFailure {
                stage: format!("{} {}", program, version_flag),
                code: output.code,
                diagnostics: output.stderr,
            })
        }
    }
}
