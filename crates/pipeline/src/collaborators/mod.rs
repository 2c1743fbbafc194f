//! External collaborators the pipeline calls but does not implement.
//!
//! Each trait has one production implementation in a submodule. Tests plug
//! in scripted implementations through [`Collaborators`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncRead;
use vantage_core::report::ReportContent;
use vantage_events::Mailer;

use crate::error::CollaboratorError;

pub mod http_generator;
pub mod json_parser;
pub mod local_storage;
pub mod markdown;

pub use http_generator::{HttpGeneratorConfig, HttpTextGenerator};
pub use json_parser::JsonModelParser;
pub use local_storage::LocalFileStorage;
pub use markdown::MarkdownAssembler;

/// Output of the spreadsheet/exhibit extractor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedModel {
    /// Problems that make the model unusable.
    pub errors: Vec<String>,
    /// Problems a reviewer should look at; the run continues.
    pub warnings: Vec<String>,
    pub structured_data: serde_json::Value,
}

#[async_trait]
pub trait ModelParser: Send + Sync {
    async fn parse_model(&self, path: &Path) -> Result<ParsedModel, CollaboratorError>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait DocumentAssembler: Send + Sync {
    /// File extension of the produced document, without the dot.
    fn extension(&self) -> &'static str;

    async fn assemble_document(
        &self,
        content: &ReportContent,
    ) -> Result<Vec<u8>, CollaboratorError>;
}

/// An opened stored document, ready to stream.
pub struct StoredFile {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub len: u64,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save_file(
        &self,
        bytes: &[u8],
        dir: &Path,
        name: &str,
    ) -> Result<PathBuf, CollaboratorError>;

    /// Open a stored file for reading. `None` if it no longer exists.
    async fn open_file(&self, path: &Path) -> Result<Option<StoredFile>, CollaboratorError>;

    /// Remove a stored file. A file that is already gone is not an error.
    async fn delete_file(&self, path: &Path) -> Result<(), CollaboratorError>;
}

/// The full set of collaborators one pipeline instance uses.
#[derive(Clone)]
pub struct Collaborators {
    pub parser: Arc<dyn ModelParser>,
    pub generator: Arc<dyn TextGenerator>,
    pub assembler: Arc<dyn DocumentAssembler>,
    pub storage: Arc<dyn FileStorage>,
    pub mailer: Arc<dyn Mailer>,
}
