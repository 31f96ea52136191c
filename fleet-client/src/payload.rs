//! Multipart payloads sent to the control plane
//!
//! Payloads are first lowered to an ordered list of [`FormPart`]s so the
//! exact wire shape can be inspected without a server; the HTTP client then
//! turns that list into a `reqwest` multipart form.

use fleet_models::{EnvVar, DEFAULT_ENTRY_OBJECT};
use serde::Serialize;
use std::path::Path;

use crate::error::Result;

/// A named blob sent as a file part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, keeping only its final path component as the name
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// One configuration file of a creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEntry {
    Inline { filename: String, content: String },
    Upload(FilePart),
}

impl ConfigEntry {
    pub fn filename(&self) -> &str {
        match self {
            ConfigEntry::Inline { filename, .. } => filename,
            ConfigEntry::Upload(file) => &file.filename,
        }
    }

    fn into_file_part(self) -> FilePart {
        match self {
            ConfigEntry::Inline { filename, content } => FilePart::new(filename, content),
            ConfigEntry::Upload(file) => file,
        }
    }
}

#[derive(Serialize)]
struct InlineConfig<'a> {
    filename: &'a str,
    content: &'a str,
}

/// A single field of a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: &'static str, value: String },
    File { name: &'static str, file: FilePart },
}

impl FormPart {
    pub fn name(&self) -> &'static str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => *name,
        }
    }

    fn text(name: &'static str, value: impl Into<String>) -> Self {
        FormPart::Text {
            name,
            value: value.into(),
        }
    }
}

/// Everything needed to create an instance in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstancePayload {
    pub name: String,
    pub description: Option<String>,
    pub entry_object: String,
    pub ports: Option<String>,
    pub command: Option<String>,
    pub args: Option<String>,
    pub image: Option<String>,
    pub env_vars: Vec<EnvVar>,
    pub config_files: Vec<ConfigEntry>,
    pub code: FilePart,
}

impl CreateInstancePayload {
    pub fn new(name: impl Into<String>, code: FilePart) -> Self {
        Self {
            name: name.into(),
            description: None,
            entry_object: DEFAULT_ENTRY_OBJECT.to_string(),
            ports: None,
            command: None,
            args: None,
            image: None,
            env_vars: Vec::new(),
            config_files: Vec::new(),
            code,
        }
    }

    /// Lowers the payload to its ordered form fields.
    ///
    /// Blank optional fields are omitted, as are `env_vars` and
    /// `config_files` when empty. Config entries go out as one JSON text
    /// field while all of them are inline; as soon as one is an upload,
    /// every entry is sent as a repeated file part instead.
    pub fn into_parts(self) -> Result<Vec<FormPart>> {
        let mut parts = vec![FormPart::text("name", self.name.trim())];

        if let Some(description) = non_blank(self.description) {
            parts.push(FormPart::text("description", description));
        }

        let entry_object = non_blank(Some(self.entry_object))
            .unwrap_or_else(|| DEFAULT_ENTRY_OBJECT.to_string());
        parts.push(FormPart::text("entry_object", entry_object));

        for (name, value) in [
            ("ports", self.ports),
            ("command", self.command),
            ("args", self.args),
            ("image", self.image),
        ] {
            if let Some(value) = non_blank(value) {
                parts.push(FormPart::text(name, value));
            }
        }

        if !self.env_vars.is_empty() {
            let env: Vec<EnvVar> = self
                .env_vars
                .into_iter()
                .map(|var| EnvVar { id: None, ..var })
                .collect();
            parts.push(FormPart::text("env_vars", serde_json::to_string(&env)?));
        }

        if !self.config_files.is_empty() {
            let all_inline = self
                .config_files
                .iter()
                .all(|entry| matches!(entry, ConfigEntry::Inline { .. }));

            if all_inline {
                let inline: Vec<InlineConfig<'_>> = self
                    .config_files
                    .iter()
                    .filter_map(|entry| match entry {
                        ConfigEntry::Inline { filename, content } => Some(InlineConfig {
                            filename,
                            content,
                        }),
                        ConfigEntry::Upload(_) => None,
                    })
                    .collect();
                parts.push(FormPart::text("config_files", serde_json::to_string(&inline)?));
            } else {
                parts.extend(self.config_files.into_iter().map(|entry| FormPart::File {
                    name: "config_files",
                    file: entry.into_file_part(),
                }));
            }
        }

        parts.push(FormPart::File {
            name: "file",
            file: self.code,
        });

        Ok(parts)
    }
}

/// Parts of a code replacement upload
pub fn code_upload_parts(file: FilePart) -> Vec<FormPart> {
    vec![FormPart::File { name: "file", file }]
}

/// Parts of a config upload; same-named files overwrite on the server
pub fn config_upload_parts(files: Vec<FilePart>) -> Vec<FormPart> {
    files
        .into_iter()
        .map(|file| FormPart::File {
            name: "config_files",
            file,
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
