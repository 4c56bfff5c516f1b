pub mod apply;
pub mod init;
pub mod show;
pub mod types;

pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use show::{show, ShowArgs};
pub use types::{types, TypesArgs};

use crate::config::Config;
use anyhow::Result;
use blockwright_editor::{DocumentId, EditorSession, FileBackend};
use std::sync::Arc;

/// Mount a session for `document` using the project config in `cwd`
pub async fn open_session(cwd: &str, document: &str) -> Result<EditorSession> {
    let config = Config::load(cwd)?;
    let backend = Arc::new(FileBackend::new(config.get_data_dir(cwd)));
    let source = config.registry_source(cwd);

    let session = EditorSession::mount(DocumentId::new(document), source.as_ref(), backend, config.autosave).await?;
    Ok(session)
}
