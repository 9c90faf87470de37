//! JSON export document: every project plus the analytics computed over them.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analytics::Analytics;
use crate::error::Result;
use crate::models::Project;
use crate::state::ChatState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub projects: Vec<Project>,
    pub export_date: DateTime<Utc>,
    pub analytics: Analytics,
}

impl ExportDocument {
    pub fn from_state(state: &ChatState) -> Self {
        ExportDocument {
            projects: state.projects().to_vec(),
            export_date: Utc::now(),
            analytics: state.analytics(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// `chat-data-<YYYY-MM-DD>.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("chat-data-{}.json", date.format("%Y-%m-%d"))
}

/// Write the export for `state` into `dir`, returning the file path.
pub fn write_export(dir: &Path, state: &ChatState) -> Result<PathBuf> {
    let doc = ExportDocument::from_state(state);
    let json = doc.to_json_pretty()?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(doc.export_date.date_naive()));
    std::fs::write(&path, &json)?;
    info!(path = %path.display(), bytes = json.len(), projects = doc.projects.len(), "export written");
    Ok(path)
}

pub fn read_export(path: &Path) -> Result<ExportDocument> {
    let json = std::fs::read_to_string(path)?;
    ExportDocument::from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::compute_analytics;

    #[test]
    fn test_export_file_name_format() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name(d), "chat-data-2024-03-07.json");
    }

    #[test]
    fn test_document_uses_camel_case_keys() {
        let doc = ExportDocument {
            projects: vec![Project::new("p", "P")],
            export_date: Utc::now(),
            analytics: compute_analytics(&[], &[]),
        };
        let v: serde_json::Value = serde_json::from_str(&doc.to_json_pretty().unwrap()).unwrap();
        assert!(v.get("exportDate").unwrap().as_str().unwrap().contains('T'));
        assert_eq!(v["projects"][0]["id"], "p");
        assert_eq!(v["analytics"]["totalMessages"], 0);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(ExportDocument::from_json("{\"projects\": 3}").is_err());
    }
}
