//! Client for the renamed.to document-processing API.
//!
//! Upload documents for AI-assisted renaming or PDF splitting, and follow
//! long-running jobs to completion.
//!
//! ```no_run
//! use renamed::RenamedClient;
//!
//! # async fn example() -> renamed::Result<()> {
//! let client = RenamedClient::new("rt_your_api_key")?;
//!
//! let suggestion = client.rename_file("scan.pdf", None).await?;
//! println!("{}", suggestion.suggested_filename);
//!
//! let split = client.pdf_split_file("bundle.pdf", None).await?;
//! let documents = split
//!     .resolve_with_cancel(&Default::default(), |status| {
//!         println!("{}%", status.progress);
//!     })
//!     .await?;
//! println!("{} documents", documents.documents.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod job;
pub mod types;

pub use client::{ClientBuilder, RenamedClient, Submission};
pub use error::{ErrorKind, RenamedError, Result};
pub use job::{AsyncJob, JobPhase, StatusSource};
pub use types::{
    JobStatus, JobStatusResponse, PdfSplitOptions, PdfSplitResult, RenameOptions, RenameResult,
    SplitDocument, SplitMode, Team, User,
};
