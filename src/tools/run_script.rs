use super::{required_str, Tool, ToolError};
use crate::sandbox::{ProcessResult, ProcessRunner};
use crate::security::path::{Access, PathGuard};
use serde_json::json;
use std::ffi::OsStr;

pub const NO_OUTPUT: &str = "No output produced.";

pub struct RunScriptTool {
    runner: ProcessRunner,
    extension: String,
}

impl RunScriptTool {
    pub fn new(runner: ProcessRunner, extension: impl Into<String>) -> Self {
        Self {
            runner,
            extension: extension.into(),
        }
    }
}

impl Tool for RunScriptTool {
    fn name(&self) -> &str {
        "run_script"
    }

    fn description(&self) -> &str {
        "Runs a script within the working directory with optional arguments and reports its output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the script to run, relative to the working directory."
                },
                "args": {
                    "type": "array",
                    "description": "The arguments to pass to the script.",
                    "items": { "type": "string" }
                }
            },
            "required": ["file_path"]
        })
    }

    fn execute(&self, guard: &PathGuard, args: serde_json::Value) -> Result<String, ToolError> {
        let file_path = required_str(&args, "file_path")?;
        let script_args = parse_args(&args["args"])?;
        run(guard, &self.runner, &self.extension, file_path, &script_args)
    }
}

/// `args` may be absent, a single string, or an array of strings.
fn parse_args(value: &serde_json::Value) -> Result<Vec<String>, ToolError> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::String(s) => Ok(vec![s.clone()]),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ToolError::InvalidArguments("'args' must contain only strings".to_string())
                })
            })
            .collect(),
        _ => Err(ToolError::InvalidArguments(
            "'args' must be an array of strings".to_string(),
        )),
    }
}

pub fn run(
    guard: &PathGuard,
    runner: &ProcessRunner,
    extension: &str,
    file_path: &str,
    args: &[String],
) -> Result<String, ToolError> {
    let target = guard.resolve(file_path, Access::Execute)?;
    if !target.is_file() {
        return Err(ToolError::NotFound(file_path.to_string()));
    }
    if target.extension() != Some(OsStr::new(extension)) {
        return Err(ToolError::InvalidFileType {
            path: file_path.to_string(),
            extension: extension.to_string(),
        });
    }

    let result = runner.run(guard.boundary(), &target, args)?;
    if result.timed_out {
        return Err(ToolError::Timeout(runner.timeout()));
    }
    Ok(format_output(&result))
}

pub fn format_output(result: &ProcessResult) -> String {
    let mut parts = Vec::new();
    if !result.stdout.trim().is_empty() {
        parts.push(format!("STDOUT: {}", result.stdout));
    }
    if !result.stderr.trim().is_empty() {
        parts.push(format!("STDERR: {}", result.stderr));
    }
    if result.exit_code != 0 {
        parts.push(format!("Process exited with code {}", result.exit_code));
    }

    if parts.is_empty() {
        NO_OUTPUT.to_string()
    } else {
        parts.join("\n")
    }
}
