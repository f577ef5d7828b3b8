use super::{required_str, Tool, ToolError};
use crate::security::path::{Access, PathGuard};
use serde_json::json;

pub struct WriteFileTool;

impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes content to a file within the working directory, creating parent directories as needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to write, relative to the working directory."
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file."
                }
            },
            "required": ["file_path", "content"]
        })
    }

    fn execute(&self, guard: &PathGuard, args: serde_json::Value) -> Result<String, ToolError> {
        let file_path = required_str(&args, "file_path")?;
        let content = required_str(&args, "content")?;
        write(guard, file_path, content)
    }
}

pub fn write(guard: &PathGuard, file_path: &str, content: &str) -> Result<String, ToolError> {
    let target = guard.resolve(file_path, Access::Write)?;

    // TODO: open with O_NOFOLLOW so a symlink swapped in after resolve() is not followed.
    if !target.is_file() {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ToolError::io(format!("Failed to create directories for '{}'", file_path), e)
            })?;
        }
    }

    std::fs::write(&target, content)
        .map_err(|e| ToolError::io(format!("Failed to write '{}'", file_path), e))?;

    Ok(format!(
        "Successfully wrote to \"{}\" ({} characters written)",
        file_path,
        content.chars().count()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ErrorKind;
    use std::fs;

    fn sandbox() -> (tempfile::TempDir, PathGuard) {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();
        (dir, guard)
    }

    #[test]
    fn test_write_and_verify() {
        let (dir, guard) = sandbox();
        let result = WriteFileTool
            .execute(
                &guard,
                json!({"file_path": "lorem.txt", "content": "wait, this isn't lorem ipsum"}),
            )
            .unwrap();
        assert_eq!(
            result,
            "Successfully wrote to \"lorem.txt\" (28 characters written)"
        );
        let read_back = fs::read_to_string(dir.path().join("lorem.txt")).unwrap();
        assert_eq!(read_back, "wait, this isn't lorem ipsum");
    }

    #[test]
    fn test_write_counts_characters_not_bytes() {
        let (_dir, guard) = sandbox();
        let result = write(&guard, "accents.txt", "héllo").unwrap();
        assert!(result.contains("(5 characters written)"));
    }

    #[test]
    fn test_write_creates_missing_parents() {
        let (dir, guard) = sandbox();
        write(&guard, "pkg/deeper/morelorem.txt", "lorem ipsum dolor sit amet").unwrap();

        let read_back = fs::read_to_string(dir.path().join("pkg/deeper/morelorem.txt")).unwrap();
        assert_eq!(read_back, "lorem ipsum dolor sit amet");
    }

    #[test]
    fn test_write_overwrites_existing_fully() {
        let (dir, guard) = sandbox();
        write(&guard, "notes.txt", "a much longer first version").unwrap();
        write(&guard, "notes.txt", "short").unwrap();

        let read_back = fs::read_to_string(dir.path().join("notes.txt")).unwrap();
        assert_eq!(read_back, "short");
    }

    #[test]
    fn test_write_allows_empty_content() {
        let (dir, guard) = sandbox();
        write(&guard, "empty.txt", "").unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("empty.txt")).unwrap(), "");
    }

    #[test]
    fn test_write_outside_boundary_no_mutation() {
        let parent = tempfile::tempdir().unwrap();
        let boundary = parent.path().join("calculator");
        fs::create_dir(&boundary).unwrap();
        let guard = PathGuard::new(&boundary).unwrap();

        let err = write(&guard, "../escaped/temp.txt", "this should not be allowed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBoundary);
        assert!(!parent.path().join("escaped").exists());

        let err = write(&guard, "/tmp/corral_should_not_exist.txt", "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBoundary);
        assert!(!std::path::Path::new("/tmp/corral_should_not_exist.txt").exists());
    }

    #[test]
    fn test_write_onto_directory_is_io_error() {
        let (dir, guard) = sandbox();
        fs::create_dir(dir.path().join("pkg")).unwrap();

        let err = write(&guard, "pkg", "content").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_write_missing_content_arg() {
        let (_dir, guard) = sandbox();
        let err = WriteFileTool
            .execute(&guard, json!({"file_path": "a.txt"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
