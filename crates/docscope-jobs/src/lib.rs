//! # docscope-jobs
//!
//! Asynchronous analysis jobs for docscope.
//!
//! A job acquires documents (uploads, a Europe PMC query, or an existing
//! project directory), splits each into semantic sections, counts dictionary
//! terms and recognized entities per section, and exports the aggregate as
//! CSV plus an optional JSON or HTML report.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docscope_core::JobConfig;
//! use docscope_jobs::JobOrchestrator;
//! use docscope_text::DirectoryDictionarySource;
//!
//! let orchestrator = JobOrchestrator::builder(Arc::new(DirectoryDictionarySource::new("dictionary")))
//!     .build();
//! let job_id = orchestrator
//!     .submit(JobConfig::existing_project("projects/malaria").with_dictionary("software"))
//!     .await?;
//! orchestrator.wait(job_id).await?;
//! let result = orchestrator.result(job_id).await?;
//! ```

pub mod acquire;
pub mod context;
pub mod europe_pmc;
pub mod export;
pub mod job;
mod orchestrator;
mod pipeline;
pub mod store;
pub mod worker;

pub use context::JobContext;
pub use europe_pmc::EuropePmcClient;
pub use export::ExportSummary;
pub use job::JobRecord;
pub use orchestrator::{JobOrchestrator, OrchestratorBuilder};
pub use store::{JobStore, StoredJob};
pub use worker::{WorkerConfig, WorkerEvent};
