pub mod list_dir;
pub mod read_file;
pub mod run_script;
pub mod write_file;

use crate::config::Config;
use crate::security::path::PathGuard;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`ToolError`], for callers that branch on the
/// failure rather than its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OutOfBoundary,
    NotAFile,
    NotADirectory,
    NotFound,
    InvalidFileType,
    Decode,
    Io,
    Timeout,
    UnknownTool,
    ExecutionFailure,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Cannot {action} \"{path}\" as it is outside the permitted working directory")]
    OutOfBoundary { action: &'static str, path: String },

    #[error("\"{0}\" is not a file")]
    NotAFile(String),

    #[error("\"{0}\" is not a directory")]
    NotADirectory(String),

    #[error("File \"{0}\" not found.")]
    NotFound(String),

    #[error("\"{path}\" is not a .{extension} script")]
    InvalidFileType { path: String, extension: String },

    #[error("Cannot read \"{0}\" as text - it may be a binary file or have unsupported encoding")]
    Decode(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("executing script: timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("executing script: {0}")]
    Spawn(String),

    #[error("Unknown function: {0}")]
    UnknownTool(String),

    #[error("Function execution failed: {0}")]
    ExecutionFailure(String),
}

impl ToolError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::OutOfBoundary { .. } => ErrorKind::OutOfBoundary,
            ToolError::NotAFile(_) => ErrorKind::NotAFile,
            ToolError::NotADirectory(_) => ErrorKind::NotADirectory,
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::InvalidFileType { .. } => ErrorKind::InvalidFileType,
            ToolError::Decode(_) => ErrorKind::Decode,
            ToolError::Io { .. } => ErrorKind::Io,
            ToolError::Timeout(_) => ErrorKind::Timeout,
            ToolError::UnknownTool(_) => ErrorKind::UnknownTool,
            ToolError::InvalidArguments(_)
            | ToolError::Spawn(_)
            | ToolError::ExecutionFailure(_) => ErrorKind::ExecutionFailure,
        }
    }
}

/// A function declaration handed to the model alongside the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;
    /// Run the tool with every path confined to `guard`'s boundary.
    fn execute(&self, guard: &PathGuard, args: serde_json::Value) -> Result<String, ToolError>;
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<&dyn Tool> {
        self.tools.iter().map(|t| t.as_ref()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a ToolRegistry with the four sandboxed tools, tuned by `config`.
pub fn default_registry(config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(list_dir::ListDirTool));
    registry.register(Box::new(read_file::ReadFileTool::new(
        config.limits.max_characters,
    )));
    registry.register(Box::new(write_file::WriteFileTool));
    registry.register(Box::new(run_script::RunScriptTool::new(
        config.runner.process_runner(),
        config.runner.extension.clone(),
    )));
    registry
}

/// Pull a required string argument out of a JSON argument object.
pub(crate) fn required_str<'a>(
    args: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, ToolError> {
    args[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing '{}' argument", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_register_and_list() {
        let registry = default_registry(&Config::default());
        assert_eq!(registry.list().len(), 4);
    }

    #[test]
    fn test_registry_get_by_name() {
        let registry = default_registry(&Config::default());
        assert!(registry.get("list_directory").is_some());
        assert!(registry.get("read_file").is_some());
        assert!(registry.get("write_file").is_some());
        assert!(registry.get("run_script").is_some());
        assert!(registry.get("shell").is_none());
    }

    #[test]
    fn test_registry_empty() {
        let registry = ToolRegistry::default();
        assert_eq!(registry.list().len(), 0);
        assert!(registry.get("anything").is_none());
        assert_eq!(registry.definitions().len(), 0);
    }

    #[test]
    fn test_all_tools_have_valid_schemas() {
        let registry = default_registry(&Config::default());
        for def in registry.definitions() {
            assert!(!def.description.is_empty());
            assert_eq!(
                def.parameters["type"], "object",
                "Tool '{}' schema type should be 'object'",
                def.name
            );
            assert!(
                def.parameters.get("properties").is_some(),
                "Tool '{}' schema should have 'properties'",
                def.name
            );
        }
    }

    #[test]
    fn test_all_tool_names_are_unique() {
        let registry = default_registry(&Config::default());
        let tools = registry.list();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        let original_len = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), original_len, "Tool names should be unique");
    }

    #[test]
    fn test_tool_error_display_messages() {
        let err = ToolError::OutOfBoundary {
            action: "read",
            path: "../secret".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot read \"../secret\" as it is outside the permitted working directory"
        );

        let err = ToolError::UnknownTool("frobnicate".to_string());
        assert_eq!(err.to_string(), "Unknown function: frobnicate");

        let err = ToolError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "executing script: timeout after 30 seconds");

        let err = ToolError::NotFound("nonexistent.py".to_string());
        assert_eq!(err.to_string(), "File \"nonexistent.py\" not found.");
    }

    #[test]
    fn test_tool_error_kinds() {
        assert_eq!(
            ToolError::NotAFile("x".into()).kind(),
            ErrorKind::NotAFile
        );
        assert_eq!(
            ToolError::InvalidArguments("x".into()).kind(),
            ErrorKind::ExecutionFailure
        );
        let io = ToolError::io("x", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(io.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_required_str_missing() {
        let args = serde_json::json!({"other": "x"});
        let err = required_str(&args, "file_path").unwrap_err();
        assert_eq!(err.to_string(), "Invalid arguments: missing 'file_path' argument");
    }
}
