use super::{Tool, ToolError};
use crate::security::path::{Access, PathGuard};
use serde_json::json;

pub struct ListDirTool;

/// One immediate child of a listed directory.
#[derive(Debug)]
struct DirectoryEntry {
    name: String,
    /// `None` for directories, whose byte size is not reported.
    size: Option<u64>,
}

impl DirectoryEntry {
    fn is_dir(&self) -> bool {
        self.size.is_none()
    }

    fn format(&self) -> String {
        match self.size {
            Some(bytes) => format!("- {}: file_size={} bytes, is_dir=False", self.name, bytes),
            None => format!("- {}: file_size=directory, is_dir=True", self.name),
        }
    }
}

impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "Lists files in the specified directory along with their sizes, constrained to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself."
                }
            }
        })
    }

    fn execute(&self, guard: &PathGuard, args: serde_json::Value) -> Result<String, ToolError> {
        match &args["directory"] {
            serde_json::Value::Null => list(guard, "."),
            serde_json::Value::String(directory) => list(guard, directory),
            _ => Err(ToolError::InvalidArguments(
                "'directory' must be a string".to_string(),
            )),
        }
    }
}

pub fn list(guard: &PathGuard, directory: &str) -> Result<String, ToolError> {
    let target = guard.resolve(directory, Access::List)?;
    if !target.is_dir() {
        return Err(ToolError::NotADirectory(directory.to_string()));
    }

    let mut entries = read_entries(&target, directory)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::debug!(
        directory,
        entries = entries.len(),
        dirs = entries.iter().filter(|e| e.is_dir()).count(),
        "listed directory"
    );

    Ok(entries
        .iter()
        .map(DirectoryEntry::format)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn read_entries(path: &std::path::Path, display: &str) -> Result<Vec<DirectoryEntry>, ToolError> {
    let dir = std::fs::read_dir(path)
        .map_err(|e| ToolError::io(format!("Failed to read '{}'", display), e))?;

    let mut entries = Vec::new();
    for entry in dir {
        let entry = entry.map_err(|e| ToolError::io("Failed to read entry", e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follows symlinks, so a link to a directory lists as a directory.
        let metadata = std::fs::metadata(entry.path())
            .map_err(|e| ToolError::io(format!("Failed to stat '{}'", name), e))?;
        let size = if metadata.is_dir() {
            None
        } else {
            Some(metadata.len())
        };
        entries.push(DirectoryEntry { name, size });
    }

    Ok(entries)
}
