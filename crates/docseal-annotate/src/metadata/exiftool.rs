//! `exiftool` subprocess backend.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::MetadataWriter;
use crate::error::MetadataError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const TOOL: &str = "exiftool";

/// Writes the mark into the `UserComment` tag through `exiftool`.
///
/// Every invocation is bounded by `timeout`; a tool that overruns is
/// killed and reported as [`MetadataError::Timeout`].
#[derive(Debug, Clone)]
pub struct ExifToolWriter {
    program: PathBuf,
    timeout: Duration,
}

impl ExifToolWriter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: Vec<OsString>) -> Result<String, MetadataError> {
        tracing::debug!(program = %self.program.display(), ?args, "invoking exiftool");
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Both pipes are drained while the tool runs; a full pipe would
        // otherwise stall it until the deadline.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                // Best effort; the process may have exited in between. The
                // readers finish on their own once the pipes close.
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(secs = self.timeout.as_secs(), "exiftool timed out");
                return Err(MetadataError::Timeout {
                    tool: TOOL.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;
        if status.success() {
            return Ok(stdout);
        }
        let output = format!("{}{}", stderr.trim(), stdout.trim());
        if is_unsupported(&output) {
            return Err(MetadataError::Unsupported(output));
        }
        Err(MetadataError::Tool {
            tool: TOOL.to_string(),
            status: status.code().unwrap_or(-1),
            output,
        })
    }
}

type Reader = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

/// Read a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Reader {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(reader: Reader) -> Result<String, MetadataError> {
    let Some(handle) = reader else {
        return Ok(String::new());
    };
    let buf = handle
        .join()
        .map_err(|_| std::io::Error::other("exiftool output reader panicked"))??;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn is_unsupported(output: &str) -> bool {
    let lower = output.to_ascii_lowercase();
    lower.contains("not yet supported")
        || lower.contains("not supported")
        || lower.contains("unknown file type")
}

fn file_arg(path: &Path) -> OsString {
    // A relative name starting with '-' would be read as an option.
    if path.is_relative() && path.to_string_lossy().starts_with('-') {
        Path::new(".").join(path).into_os_string()
    } else {
        path.as_os_str().to_os_string()
    }
}

impl MetadataWriter for ExifToolWriter {
    fn clear_comment(&self, path: &Path) -> Result<(), MetadataError> {
        self.run(vec![
            "-overwrite_original".into(),
            "-UserComment=".into(),
            file_arg(path),
        ])?;
        Ok(())
    }

    fn set_comment(&self, path: &Path, comment: &str) -> Result<(), MetadataError> {
        if comment.contains(['\n', '\r', '\0']) {
            return Err(MetadataError::InvalidComment(
                "comment must be a single line".to_string(),
            ));
        }
        self.run(vec![
            "-overwrite_original".into(),
            format!("-UserComment={comment}").into(),
            file_arg(path),
        ])?;
        Ok(())
    }

    fn read_comment(&self, path: &Path) -> Result<Option<String>, MetadataError> {
        let out = self.run(vec!["-s3".into(), "-UserComment".into(), file_arg(path)])?;
        let text = out.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn name(&self) -> &str {
        TOOL
    }
}
