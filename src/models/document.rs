use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Rechnung,
    Vertrag,
    Sonstiges,
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Rechnung" => Ok(Self::Rechnung),
            "Vertrag" => Ok(Self::Vertrag),
            "Sonstiges" => Ok(Self::Sonstiges),
            other => Err(format!("Invalid document type: {other}")),
        }
    }
}

/// Metadata for an uploaded file. The bytes live in the uploads directory under `file_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub upload_date: NaiveDate,
    pub file_path: String,
    pub file_size: u64,
}
