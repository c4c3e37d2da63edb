//! Request options and response payloads exchanged with the service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The account behind the API key.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub credits: Option<i64>,
    pub team: Option<Team>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
}

/// Suggested name and location for an uploaded document.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenameResult {
    pub original_filename: String,
    pub suggested_filename: String,
    pub folder_path: Option<String>,
    /// In `[0, 1]`.
    pub confidence: f64,
}

/// Options for a rename request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenameOptions {
    /// Custom naming template, e.g. `{date}_{vendor}_{type}`.
    pub template: Option<String>,
}

impl RenameOptions {
    pub(crate) fn form_fields(&self) -> Vec<(String, String)> {
        self.template
            .iter()
            .map(|t| ("template".to_string(), t.clone()))
            .collect()
    }
}

/// How the service decides where one document ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Let the model find document boundaries.
    #[default]
    Auto,
    /// Fixed number of pages per document.
    Pages,
    /// Split on blank pages.
    Blank,
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::Auto => write!(f, "auto"),
            SplitMode::Pages => write!(f, "pages"),
            SplitMode::Blank => write!(f, "blank"),
        }
    }
}

impl FromStr for SplitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SplitMode::Auto),
            "pages" => Ok(SplitMode::Pages),
            "blank" => Ok(SplitMode::Blank),
            _ => Err(format!(
                "Unknown split mode: {}. Expected auto, pages, or blank.",
                s
            )),
        }
    }
}

/// Options for a PDF split request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfSplitOptions {
    pub mode: Option<SplitMode>,
    /// Only meaningful with [`SplitMode::Pages`].
    pub pages_per_split: Option<u32>,
}

impl PdfSplitOptions {
    pub(crate) fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        if let Some(mode) = self.mode {
            fields.push(("mode".to_string(), mode.to_string()));
        }
        if let Some(pages) = self.pages_per_split {
            fields.push(("pagesPerSplit".to_string(), pages.to_string()));
        }
        fields
    }
}

/// One document produced by a split.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SplitDocument {
    pub index: u32,
    pub filename: String,
    /// Page range, e.g. `"1-5"`.
    pub pages: String,
    pub download_url: String,
    /// Bytes.
    pub size: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PdfSplitResult {
    pub original_filename: String,
    pub documents: Vec<SplitDocument>,
    pub total_pages: u32,
}

/// Lifecycle of a server-side job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "queued")]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Body of a status URL response.
///
/// `progress` is for display only; successive polls may report lower values.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse<T> {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u32,
    pub error: Option<String>,
    pub result: Option<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_parsing() {
        let status: JobStatusResponse<PdfSplitResult> =
            serde_json::from_str(r#"{"jobId": "job123", "status": "processing", "progress": 33}"#)
                .unwrap();
        assert_eq!(status.job_id, "job123");
        assert_eq!(status.status, JobStatus::Processing);
        assert_eq!(status.progress, 33);
        assert!(status.result.is_none());
        assert!(!status.status.is_terminal());
    }

    #[test]
    fn test_job_status_queued_alias_and_missing_progress() {
        let status: JobStatusResponse<PdfSplitResult> =
            serde_json::from_str(r#"{"jobId": "job123", "status": "queued"}"#).unwrap();
        assert_eq!(status.status, JobStatus::Pending);
        assert_eq!(status.progress, 0);
    }

    #[test]
    fn test_unknown_job_status_is_rejected() {
        let result: Result<JobStatusResponse<PdfSplitResult>, _> =
            serde_json::from_str(r#"{"jobId": "job123", "status": "exploded"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_result_parsing() {
        let result: PdfSplitResult = serde_json::from_str(
            r#"{
                "originalFilename": "multi.pdf",
                "documents": [
                    {"index": 0, "filename": "doc1.pdf", "pages": "1-5", "downloadUrl": "https://dl/1", "size": 1000}
                ],
                "totalPages": 10
            }"#,
        )
        .unwrap();
        assert_eq!(result.original_filename, "multi.pdf");
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].pages, "1-5");
        assert_eq!(result.total_pages, 10);
    }

    #[test]
    fn test_split_mode_from_str() {
        assert_eq!("auto".parse::<SplitMode>().unwrap(), SplitMode::Auto);
        assert_eq!("PAGES".parse::<SplitMode>().unwrap(), SplitMode::Pages);
        assert!("sideways".parse::<SplitMode>().is_err());
    }

    #[test]
    fn test_form_fields() {
        let options = PdfSplitOptions {
            mode: Some(SplitMode::Pages),
            pages_per_split: Some(5),
        };
        assert_eq!(
            options.form_fields(),
            vec![
                ("mode".to_string(), "pages".to_string()),
                ("pagesPerSplit".to_string(), "5".to_string()),
            ]
        );
        assert!(RenameOptions::default().form_fields().is_empty());
    }
}
