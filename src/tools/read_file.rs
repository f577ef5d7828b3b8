use super::{required_str, Tool, ToolError};
use crate::security::path::{Access, PathGuard};
use serde_json::json;

/// Characters returned before a file is cut off.
pub const MAX_CHARACTERS: usize = 10_000;

pub struct ReadFileTool {
    max_characters: usize,
}

impl ReadFileTool {
    pub fn new(max_characters: usize) -> Self {
        Self { max_characters }
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new(MAX_CHARACTERS)
    }
}

impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads the content of a file within the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to read, relative to the working directory."
                }
            },
            "required": ["file_path"]
        })
    }

    fn execute(&self, guard: &PathGuard, args: serde_json::Value) -> Result<String, ToolError> {
        let file_path = required_str(&args, "file_path")?;
        read(guard, file_path, self.max_characters)
    }
}

pub fn read(guard: &PathGuard, file_path: &str, max_characters: usize) -> Result<String, ToolError> {
    let target = guard.resolve(file_path, Access::Read)?;
    if !target.is_file() {
        return Err(ToolError::NotAFile(file_path.to_string()));
    }

    let bytes = std::fs::read(&target)
        .map_err(|e| ToolError::io(format!("Failed to read '{}'", file_path), e))?;
    let content =
        String::from_utf8(bytes).map_err(|_| ToolError::Decode(file_path.to_string()))?;

    Ok(truncate(content, file_path, max_characters))
}

fn truncate(mut content: String, file_path: &str, max_characters: usize) -> String {
    if let Some((cut, _)) = content.char_indices().nth(max_characters) {
        content.truncate(cut);
        content.push_str(&format!(
            "\n\n[File \"{}\" truncated at {} characters]",
            file_path, max_characters
        ));
    }
    content
}
