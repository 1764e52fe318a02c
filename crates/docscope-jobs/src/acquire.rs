//! Acquisition stage: turn a job configuration into local documents.
//!
//! Every document ends up as `<dir>/<id>/fulltext.<ext>`, the layout shared
//! by uploads, fetched records and existing projects.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use docscope_core::defaults::{ALLOWED_EXTENSIONS, FULLTEXT_STEM};
use docscope_core::{
    extension_of, sanitize_filename, CorpusClient, Document, DocumentOrigin, Error, FetchSpec,
    JobConfig, JobKind, Result, UploadedFile,
};

use crate::context::JobContext;

/// Directory under the job directory that holds acquired documents.
pub const DOCUMENTS_DIR: &str = "documents";

/// Produces the document list for one job.
pub(crate) struct Acquirer {
    corpus: Option<Arc<dyn CorpusClient>>,
    timeout: Duration,
}

impl Acquirer {
    pub(crate) fn new(corpus: Option<Arc<dyn CorpusClient>>, timeout: Duration) -> Self {
        Self { corpus, timeout }
    }

    pub(crate) async fn acquire(
        &self,
        ctx: &JobContext,
        config: &JobConfig,
        job_dir: &Path,
    ) -> Result<Vec<Document>> {
        let dest = job_dir.join(DOCUMENTS_DIR);
        match config.kind {
            JobKind::Upload => stage_uploads(ctx, &config.uploads, &dest).await,
            JobKind::Fetch => {
                let spec = config.fetch.as_ref().ok_or_else(|| {
                    Error::InvalidConfig("fetch job requires a query".to_string())
                })?;
                self.fetch(ctx, spec, &dest).await
            }
            JobKind::ExistingProject => {
                let root = config.project_path.as_deref().ok_or_else(|| {
                    Error::InvalidConfig("existing-project job requires a project path".to_string())
                })?;
                read_project(ctx, root).await
            }
        }
    }

    async fn fetch(&self, ctx: &JobContext, spec: &FetchSpec, dest: &Path) -> Result<Vec<Document>> {
        let client = self
            .corpus
            .as_ref()
            .ok_or_else(|| Error::Fetch("no corpus client is configured".to_string()))?;

        ctx.info(format!(
            "Querying {} for \"{}\" (limit {})",
            client.name(),
            spec.query,
            spec.limit
        ))
        .await;
        tokio::fs::create_dir_all(dest).await?;

        let records = tokio::time::timeout(self.timeout, client.fetch(&spec.query, spec.limit, dest))
            .await
            .map_err(|_| {
                Error::Fetch(format!(
                    "{} did not respond within {}s",
                    client.name(),
                    self.timeout.as_secs()
                ))
            })??;

        info!(
            job_id = %ctx.job_id(),
            corpus = client.name(),
            document_count = records.len(),
            "Corpus fetch complete"
        );
        ctx.info(format!("Downloaded {} record(s)", records.len())).await;

        Ok(records
            .into_iter()
            .map(|record| Document {
                id: record.external_id.clone(),
                title: record.title,
                path: record.stored_path,
                origin: DocumentOrigin::Fetched {
                    external_id: record.external_id,
                },
            })
            .collect())
    }
}

/// Copy uploaded files into the job's document layout.
///
/// Missing files are logged against the job and skipped.
async fn stage_uploads(
    ctx: &JobContext,
    uploads: &[UploadedFile],
    dest: &Path,
) -> Result<Vec<Document>> {
    tokio::fs::create_dir_all(dest).await?;

    let mut used = HashSet::new();
    let mut documents = Vec::with_capacity(uploads.len());
    for upload in uploads {
        if !tokio::fs::try_exists(&upload.path).await.unwrap_or(false) {
            warn!(
                job_id = %ctx.job_id(),
                file = %upload.path.display(),
                "Uploaded file is missing"
            );
            ctx.error(format!("Uploaded file not found: {}", upload.original_name))
                .await;
            continue;
        }

        let id = unique_id(&mut used, &document_stem(&upload.original_name));
        let ext = extension_of(&upload.original_name).unwrap_or_else(|| "txt".to_string());
        let dir = dest.join(&id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.{}", FULLTEXT_STEM, ext));
        tokio::fs::copy(&upload.path, &path).await?;

        debug!(document_id = %id, file = %path.display(), "Upload staged");
        documents.push(Document {
            id,
            title: None,
            path,
            origin: DocumentOrigin::Uploaded {
                original_name: upload.original_name.clone(),
            },
        });
    }

    ctx.info(format!("Staged {} uploaded file(s)", documents.len()))
        .await;
    Ok(documents)
}

/// Read `<root>/<id>/fulltext.<ext>` documents in directory-name order.
async fn read_project(ctx: &JobContext, root: &Path) -> Result<Vec<Document>> {
    let is_dir = tokio::fs::metadata(root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(Error::Fetch(format!(
            "project directory not found: {}",
            root.display()
        )));
    }

    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    let mut documents = Vec::new();
    for dir in dirs {
        let Some(path) = find_fulltext(&dir).await else {
            debug!(dir = %dir.display(), "No fulltext in project entry");
            continue;
        };
        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        documents.push(Document {
            id,
            title: None,
            path,
            origin: DocumentOrigin::Existing,
        });
    }

    ctx.info(format!(
        "Found {} document(s) in {}",
        documents.len(),
        root.display()
    ))
    .await;
    Ok(documents)
}

async fn find_fulltext(dir: &Path) -> Option<PathBuf> {
    for ext in ALLOWED_EXTENSIONS {
        let candidate = dir.join(format!("{}.{}", FULLTEXT_STEM, ext));
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

/// Safe directory name for an uploaded file: its sanitized stem.
fn document_stem(original_name: &str) -> String {
    let sanitized = sanitize_filename(original_name);
    Path::new(&sanitized)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or(sanitized)
}

fn unique_id(used: &mut HashSet<String>, stem: &str) -> String {
    let mut candidate = stem.to_string();
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}_{}", stem, n);
        n += 1;
    }
    candidate
}
