//! # Tool gateway
//!
//! The four sandboxed operations the model can request. Each one resolves its
//! path through [`PathGuard`] first and returns either a human-readable result
//! string or a typed [`Error`]. Errors are recoverable by kind, so the caller
//! renders them back to the model rather than aborting.

use crate::guard::PathGuard;
use crate::{Error, ErrorKind, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Marker returned when a script printed nothing at all
pub const NO_OUTPUT: &str = "No output produced.";

/// How long to wait for pipes to drain after killing a timed-out script
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Limits applied by the gateway
#[derive(Debug, Clone)]
pub struct GatewayLimits {
    /// Maximum characters returned by `read_file`
    pub max_file_chars: usize,
    /// Wall-clock budget for `run_script`
    pub script_timeout: Duration,
    /// Interpreter used to run scripts
    pub interpreter: String,
    /// Extension (without dot) a script must carry
    pub script_extension: String,
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self {
            max_file_chars: 10_000,
            script_timeout: Duration::from_secs(30),
            interpreter: "python3".to_string(),
            script_extension: "py".to_string(),
        }
    }
}

/// Filesystem and process access confined to a working root
#[derive(Debug, Clone)]
pub struct ToolGateway {
    guard: PathGuard,
    limits: GatewayLimits,
}

impl ToolGateway {
    pub fn new(guard: PathGuard, limits: GatewayLimits) -> Self {
        Self { guard, limits }
    }

    pub fn root(&self) -> &Path {
        self.guard.root()
    }

    pub fn limits(&self) -> &GatewayLimits {
        &self.limits
    }

    // =========================================================================
    // list
    // =========================================================================

    /// List the immediate entries of `dir`, sorted by name.
    pub async fn list_directory(&self, dir: &str) -> Result<String> {
        let target = self.guard.resolve("list", dir)?;
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|_| Error::not_found(dir).with_operation("gateway::list_directory"))?;
        if !meta.is_dir() {
            return Err(Error::not_a_directory(dir).with_operation("gateway::list_directory"));
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| io_failed(e, "gateway::list_directory", dir))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_failed(e, "gateway::list_directory", dir))?
        {
            names.push(entry.file_name());
        }
        names.sort();

        if names.is_empty() {
            return Ok(format!("Directory \"{}\" is empty", dir));
        }

        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            let display = name.to_string_lossy().into_owned();
            // Entries can vanish between readdir and stat.
            match tokio::fs::metadata(target.join(&name)).await {
                Ok(meta) => lines.push(format!(
                    "- {}: size={}, is_dir={}",
                    display,
                    meta.len(),
                    meta.is_dir()
                )),
                Err(e) => lines.push(format!("- {}: Error: {}", display, e)),
            }
        }
        Ok(lines.join("\n"))
    }

    // =========================================================================
    // read
    // =========================================================================

    /// Read up to `max_file_chars` characters of a text file.
    pub async fn read_file(&self, path: &str) -> Result<String> {
        let target = self.guard.resolve("read", path)?;
        self.require_file(&target, path, "gateway::read_file").await?;

        let max = self.limits.max_file_chars;
        // Any UTF-8 char is at most 4 bytes, so this is enough to know whether
        // more than `max` chars exist.
        let budget = (max as u64).saturating_add(1).saturating_mul(4);
        let file = tokio::fs::File::open(&target)
            .await
            .map_err(|e| io_failed(e, "gateway::read_file", path))?;
        let mut bytes = Vec::new();
        file.take(budget)
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| io_failed(e, "gateway::read_file", path))?;
        let cut_short = bytes.len() as u64 == budget;

        let text = decode_text(bytes, cut_short).map_err(|e| {
            Error::new(
                ErrorKind::DecodeFailed,
                format!("Error reading file \"{}\": {}", path, e),
            )
            .with_operation("gateway::read_file")
            .with_context("path", path)
        })?;

        match text.char_indices().nth(max) {
            Some((offset, _)) => Ok(format!(
                "{}[...File \"{}\" truncated at {} characters]",
                &text[..offset],
                path,
                max
            )),
            None => Ok(text),
        }
    }

    // =========================================================================
    // write
    // =========================================================================

    /// Create or overwrite `path` with `content`, creating parent directories.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<String> {
        let target = self.guard.resolve("write to", path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failed(e, "gateway::write_file", path))?;
        }
        if tokio::fs::metadata(&target).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(Error::not_a_file(path).with_operation("gateway::write_file"));
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| io_failed(e, "gateway::write_file", path))?;

        Ok(format!(
            "Successfully wrote to \"{}\" ({} characters written)",
            path,
            content.chars().count()
        ))
    }

    // =========================================================================
    // run
    // =========================================================================

    /// Run a script with the configured interpreter, cwd = working root.
    ///
    /// The child is killed (and reaped) on timeout and when the returned future
    /// is dropped.
    pub async fn run_script(&self, path: &str, args: &[String]) -> Result<String> {
        let target = self.guard.resolve("execute", path)?;
        self.require_file(&target, path, "gateway::run_script").await?;

        let ext = &self.limits.script_extension;
        if target.extension().and_then(|e| e.to_str()) != Some(ext.as_str()) {
            return Err(Error::wrong_extension(path, ext).with_operation("gateway::run_script"));
        }

        let mut child = Command::new(&self.limits.interpreter)
            .arg(&target)
            .args(args)
            .current_dir(self.guard.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::new(
                    ErrorKind::IoFailed,
                    format!("executing \"{}\": {}", path, e),
                )
                .with_operation("gateway::run_script")
                .with_context("interpreter", self.limits.interpreter.clone())
                .set_source(e)
            })?;

        tracing::debug!(script = %target.display(), ?args, "spawned script");

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let waited = tokio::time::timeout(self.limits.script_timeout, child.wait()).await;
        match waited {
            Ok(status) => {
                let status = status.map_err(|e| io_failed(e, "gateway::run_script", path))?;
                let stdout = collect(stdout, None).await;
                let stderr = collect(stderr, None).await;
                Ok(format_output(&stdout, &stderr, status.code(), status.success()))
            }
            Err(_) => {
                // kill() also waits, so no zombie outlives this call.
                if let Err(e) = child.kill().await {
                    tracing::warn!(script = %target.display(), "failed to kill timed-out script: {}", e);
                }
                let stdout = collect(stdout, Some(DRAIN_GRACE)).await;
                let stderr = collect(stderr, Some(DRAIN_GRACE)).await;
                let partial = format_sections(&stdout, &stderr);
                Err(Error::script_timeout(path, self.limits.script_timeout.as_secs(), &partial)
                    .with_operation("gateway::run_script"))
            }
        }
    }

    // =========================================================================
    // helpers
    // =========================================================================

    async fn require_file(&self, target: &Path, path: &str, op: &'static str) -> Result<()> {
        match tokio::fs::metadata(target).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(Error::not_a_file(path).with_operation(op)),
            Err(_) => Err(Error::not_found(path).with_operation(op)),
        }
    }
}

fn io_failed(err: std::io::Error, op: &'static str, path: &str) -> Error {
    Error::new(ErrorKind::IoFailed, format!("\"{}\": {}", path, err))
        .with_operation(op)
        .with_context("path", path)
        .set_source(err)
}

/// Decode `bytes` as UTF-8. When the read was cut short, a multi-byte char
/// split at the end is dropped instead of failing.
fn decode_text(bytes: Vec<u8>, cut_short: bool) -> std::result::Result<String, std::string::FromUtf8Error> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) if cut_short && e.utf8_error().error_len().is_none() => {
            let valid = e.utf8_error().valid_up_to();
            let mut bytes = e.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes)
        }
        Err(e) => Err(e),
    }
}

fn drain<R>(mut pipe: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        // Keep whatever arrived before an error.
        let _ = pipe.read_to_end(&mut buf).await;
        buf
    })
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>, grace: Option<Duration>) -> String {
    let Some(mut handle) = handle else {
        return String::new();
    };
    let bytes = match grace {
        None => handle.await.unwrap_or_default(),
        Some(grace) => match tokio::time::timeout(grace, &mut handle).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => {
                // A grandchild still holds the pipe open.
                handle.abort();
                Vec::new()
            }
        },
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

fn format_sections(stdout: &str, stderr: &str) -> String {
    let mut sections = Vec::new();
    if !stdout.is_empty() {
        sections.push(format!("STDOUT:\n{}", stdout));
    }
    if !stderr.is_empty() {
        sections.push(format!("STDERR:\n{}", stderr));
    }
    sections.join("\n\n")
}

/// Render a finished script run for the model
pub fn format_output(stdout: &str, stderr: &str, code: Option<i32>, success: bool) -> String {
    let mut output = format_sections(stdout, stderr);
    if output.is_empty() {
        output.push_str(NO_OUTPUT);
    }
    if !success {
        match code {
            Some(code) => output.push_str(&format!("\n\nProcess exited with code {}", code)),
            None => output.push_str("\n\nProcess terminated by signal"),
        }
    }
    output
}
