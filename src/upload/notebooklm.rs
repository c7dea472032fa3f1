//! Collection sink backed by the `notebooklm` CLI.
//!
//! `create <name>` prints the new notebook's UUID; `source add -n <id>
//! --type text --title <title>` reads the item body from stdin.

use log::{debug, warn};
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::CollectionSink;
use crate::error::UploadError;

const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub struct NotebookLmCli {
    /// Executable name, overridable for wrappers.
    program: String,
}

impl NotebookLmCli {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "notebooklm".to_string(),
        }
    }

    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NotebookLmCli {
    fn default() -> Self {
        Self::new()
    }
}

/// The CLI reports a rejected session in its stderr text; there is no
/// structured error channel.
fn is_auth_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("not authenticated")
        || lower.contains("unauthorized")
        || lower.contains("please log in")
        || lower.contains("login required")
        || lower.contains("authentication")
}

fn extract_collection_id(stdout: &str) -> Option<String> {
    // Notebook IDs are UUIDs embedded in the human-readable output
    let re = Regex::new(r"[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}").ok()?;
    re.find(stdout).map(|m| m.as_str().to_string())
}

impl CollectionSink for NotebookLmCli {
    async fn create_collection(&self, name: &str) -> Result<String, UploadError> {
        debug!("creating collection {name:?}");
        let output = tokio::time::timeout(
            CREATE_TIMEOUT,
            Command::new(&self.program)
                .arg("create")
                .arg(name)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| UploadError::CollectionCreate {
            name: name.to_string(),
            reason: format!("timed out after {CREATE_TIMEOUT:?}"),
        })?
        .map_err(|e| UploadError::CollectionCreate {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_auth_failure(&stderr) {
            return Err(UploadError::Auth(stderr.trim().to_string()));
        }
        if !output.status.success() {
            return Err(UploadError::CollectionCreate {
                name: name.to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        extract_collection_id(&stdout).ok_or_else(|| UploadError::CollectionCreate {
            name: name.to_string(),
            reason: format!("no collection id in output: {}", stdout.trim()),
        })
    }

    async fn upload_item(
        &self,
        collection_id: &str,
        title: &str,
        content: &str,
    ) -> Result<(), UploadError> {
        let mut child = Command::new(&self.program)
            .args(["source", "add", "-n", collection_id, "--type", "text"])
            .arg("--title")
            .arg(title)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| UploadError::Item {
                title: title.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(content.as_bytes())
                .await
                .map_err(|e| UploadError::Item {
                    title: title.to_string(),
                    reason: format!("write stdin: {e}"),
                })?;
            // Dropping stdin closes the pipe so the CLI sees EOF
        }

        let output = tokio::time::timeout(UPLOAD_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| UploadError::Item {
                title: title.to_string(),
                reason: format!("timed out after {UPLOAD_TIMEOUT:?}"),
            })?
            .map_err(|e| UploadError::Item {
                title: title.to_string(),
                reason: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_auth_failure(&stderr) {
            return Err(UploadError::Auth(stderr.trim().to_string()));
        }
        if !output.status.success() {
            warn!("upload of {title:?} failed: {}", stderr.trim());
            return Err(UploadError::Item {
                title: title.to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_auth_failures_in_stderr() {
        assert!(is_auth_failure("Error: Not authenticated. Please log in."));
        assert!(is_auth_failure("401 Unauthorized"));
        assert!(!is_auth_failure("network unreachable"));
    }

    #[test]
    fn extracts_uuid_from_create_output() {
        let out = "Created notebook 'Docs' with id 3f2a1b4c-9d8e-4f00-a1b2-c3d4e5f60718";
        assert_eq!(
            extract_collection_id(out).as_deref(),
            Some("3f2a1b4c-9d8e-4f00-a1b2-c3d4e5f60718")
        );
        assert!(extract_collection_id("no id here").is_none());
    }
}
