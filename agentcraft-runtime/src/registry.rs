//! # Tool registry
//!
//! A closed set of tools. Names coming from the model are parsed into a
//! [`ToolKind`] once; everything after that is a `match`, never a string lookup.

use crate::gateway::ToolGateway;
use crate::message::{ToolCall, ToolResult};
use crate::schema::{ParamSpec, ParamType, ToolSchema};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The four sandboxed operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GetFilesInfo,
    GetFileContent,
    WriteFile,
    RunPythonFile,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::GetFilesInfo,
        ToolKind::GetFileContent,
        ToolKind::RunPythonFile,
        ToolKind::WriteFile,
    ];

    /// Name advertised to the model
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::GetFilesInfo => "get_files_info",
            ToolKind::GetFileContent => "get_file_content",
            ToolKind::WriteFile => "write_file",
            ToolKind::RunPythonFile => "run_python_file",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Schema for this tool. `max_file_chars` only shows up in descriptions.
    pub fn schema(&self, max_file_chars: usize) -> ToolSchema {
        match self {
            ToolKind::GetFilesInfo => ToolSchema::new(
                self.name(),
                "Lists files in the specified directory along with their sizes, \
                 constrained to the working directory.",
            )
            .with_param(ParamSpec::optional(
                "directory",
                ParamType::String,
                "The directory to list files from, relative to the working directory. \
                 If not provided, lists files in the working directory itself.",
            )),
            ToolKind::GetFileContent => ToolSchema::new(
                self.name(),
                format!(
                    "Reads and returns the first {} characters of the content from a \
                     specified file within the working directory.",
                    max_file_chars
                ),
            )
            .with_param(ParamSpec::required(
                "file_path",
                ParamType::String,
                "The path to the file whose content should be read, relative to the working directory.",
            )),
            ToolKind::WriteFile => ToolSchema::new(
                self.name(),
                "Writes content to a file within the working directory. Creates the file \
                 and any missing parent directories, and overwrites existing files.",
            )
            .with_param(ParamSpec::required(
                "file_path",
                ParamType::String,
                "Path to the file to write, relative to the working directory.",
            ))
            .with_param(ParamSpec::required(
                "content",
                ParamType::String,
                "Content to write to the file.",
            )),
            ToolKind::RunPythonFile => ToolSchema::new(
                self.name(),
                "Executes a Python file within the working directory and returns the \
                 output from the interpreter.",
            )
            .with_param(ParamSpec::required(
                "file_path",
                ParamType::String,
                "Path to the Python file to execute, relative to the working directory.",
            ))
            .with_param(ParamSpec::optional(
                "args",
                ParamType::StringArray,
                "Optional arguments to pass to the Python file.",
            )),
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

// Unknown keys (including a model-supplied `working_directory`) are ignored:
// the root always comes from the gateway.

#[derive(Debug, Deserialize)]
struct FilesInfoArgs {
    #[serde(default)]
    directory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileContentArgs {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct RunFileArgs {
    file_path: String,
    #[serde(default)]
    args: Vec<String>,
}

/// A fully parsed tool request
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    GetFilesInfo { directory: String },
    GetFileContent { file_path: String },
    WriteFile { file_path: String, content: String },
    RunPythonFile { file_path: String, args: Vec<String> },
}

impl ToolInvocation {
    /// Parse model-supplied arguments for `kind`
    pub fn parse(kind: ToolKind, args: &Map<String, Value>) -> Result<Self> {
        Ok(match kind {
            ToolKind::GetFilesInfo => {
                let a: FilesInfoArgs = parse_args(kind, args)?;
                ToolInvocation::GetFilesInfo {
                    directory: a.directory.unwrap_or_else(|| ".".to_string()),
                }
            }
            ToolKind::GetFileContent => {
                let a: FileContentArgs = parse_args(kind, args)?;
                ToolInvocation::GetFileContent { file_path: a.file_path }
            }
            ToolKind::WriteFile => {
                let a: WriteFileArgs = parse_args(kind, args)?;
                ToolInvocation::WriteFile {
                    file_path: a.file_path,
                    content: a.content,
                }
            }
            ToolKind::RunPythonFile => {
                let a: RunFileArgs = parse_args(kind, args)?;
                ToolInvocation::RunPythonFile {
                    file_path: a.file_path,
                    args: a.args,
                }
            }
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInvocation::GetFilesInfo { .. } => ToolKind::GetFilesInfo,
            ToolInvocation::GetFileContent { .. } => ToolKind::GetFileContent,
            ToolInvocation::WriteFile { .. } => ToolKind::WriteFile,
            ToolInvocation::RunPythonFile { .. } => ToolKind::RunPythonFile,
        }
    }

    /// Execute against the gateway
    pub async fn execute(&self, gateway: &ToolGateway) -> Result<String> {
        match self {
            ToolInvocation::GetFilesInfo { directory } => gateway.list_directory(directory).await,
            ToolInvocation::GetFileContent { file_path } => gateway.read_file(file_path).await,
            ToolInvocation::WriteFile { file_path, content } => {
                gateway.write_file(file_path, content).await
            }
            ToolInvocation::RunPythonFile { file_path, args } => {
                gateway.run_script(file_path, args).await
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(kind: ToolKind, args: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args.clone())).map_err(|e| {
        Error::invalid_argument(format!("Invalid arguments for {}: {}", kind.name(), e))
            .with_operation("registry::parse")
            .with_context("tool", kind.name())
    })
}

// ============================================================================
// Registry
// ============================================================================

/// Static table of the tools offered to the model
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    schemas: Vec<(ToolKind, ToolSchema)>,
}

impl ToolRegistry {
    /// Build the registry with every tool in [`ToolKind::ALL`]
    pub fn new(max_file_chars: usize) -> Self {
        Self {
            schemas: ToolKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.schema(max_file_chars)))
                .collect(),
        }
    }

    /// All schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.schemas.iter().map(|(_, schema)| schema.clone()).collect()
    }

    pub fn schema(&self, kind: ToolKind) -> Option<&ToolSchema> {
        self.schemas.iter().find(|(k, _)| *k == kind).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Look a tool up by the name the model used
    pub fn lookup(&self, name: &str) -> Result<ToolKind> {
        ToolKind::from_name(name)
            .filter(|kind| self.schemas.iter().any(|(k, _)| k == kind))
            .ok_or_else(|| Error::unknown_tool(name).with_operation("registry::lookup"))
    }

    /// Resolve, parse and run one call. Always yields a result for the call.
    pub async fn dispatch(&self, gateway: &ToolGateway, call: &ToolCall) -> ToolResult {
        let outcome = match self.lookup(&call.name) {
            Ok(kind) => match ToolInvocation::parse(kind, &call.args) {
                Ok(invocation) => invocation.execute(gateway).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(text) => ToolResult::success(call, text),
            Err(e) => {
                tracing::warn!(tool = %call.name, "tool call failed: {}", e);
                // Unknown tools keep the bare message, matching what the model
                // was told the error payload looks like.
                if e.kind() == crate::ErrorKind::UnknownTool {
                    ToolResult::error(call, e.message())
                } else {
                    ToolResult::error(call, e.to_model_string())
                }
            }
        }
    }
}
