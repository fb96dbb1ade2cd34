//! Persisted metadata records.
//!
//! Records are immutable documents. Field names are camelCase and the
//! creation time is stored under `timestamp` as an RFC 3339 string with a
//! fixed microsecond precision, so string order equals time order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AetheriaError, Result};
use crate::store::{Document, StoredDocument};

/// Collection holding one [`ImageRecord`] per upload.
pub const IMAGE_RECORDS: &str = "imageRecords";

/// Field holding the owning identity of an [`ImageRecord`].
pub const OWNER_FIELD: &str = "userId";

/// Field linking a derived record to its parent [`ImageRecord`].
pub const PARENT_FIELD: &str = "imageRecordId";

/// Field holding the creation time of every record.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Current time at the precision records are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Metadata for one uploaded source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub user_id: String,
    pub original_image_url: String,
    pub storage_path: String,
    pub original_file_name: String,
    pub media_type: String,
    /// Black-and-white rendition created at upload time, if requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed_storage_path: Option<String>,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Metadata for one enhancement output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementRecord {
    pub id: String,
    pub image_record_id: String,
    pub user_id: String,
    pub enhanced_image_url: String,
    pub storage_path: String,
    pub media_type: String,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Metadata for one stylistic variation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationRecord {
    pub id: String,
    pub image_record_id: String,
    pub user_id: String,
    pub variation_image_url: String,
    pub storage_path: String,
    pub media_type: String,
    /// Prompt the variation was generated from.
    pub style_name: String,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Kind of derived child collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedKind {
    Enhancements,
    Variations,
}

impl DerivedKind {
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Enhancements => "enhancements",
            Self::Variations => "variations",
        }
    }
}

impl fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for DerivedKind {
    type Err = AetheriaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enhancements" => Ok(Self::Enhancements),
            "variations" => Ok(Self::Variations),
            other => Err(AetheriaError::Validation(format!(
                "unknown derived record kind '{other}'"
            ))),
        }
    }
}

/// A transform output belonging to exactly one [`ImageRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DerivedRecord {
    Enhancement(EnhancementRecord),
    Variation(VariationRecord),
}

impl DerivedRecord {
    pub fn kind(&self) -> DerivedKind {
        match self {
            Self::Enhancement(_) => DerivedKind::Enhancements,
            Self::Variation(_) => DerivedKind::Variations,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Enhancement(r) => &r.id,
            Self::Variation(r) => &r.id,
        }
    }

    pub fn parent_id(&self) -> &str {
        match self {
            Self::Enhancement(r) => &r.image_record_id,
            Self::Variation(r) => &r.image_record_id,
        }
    }

    pub fn image_url(&self) -> &str {
        match self {
            Self::Enhancement(r) => &r.enhanced_image_url,
            Self::Variation(r) => &r.variation_image_url,
        }
    }

    pub fn storage_path(&self) -> &str {
        match self {
            Self::Enhancement(r) => &r.storage_path,
            Self::Variation(r) => &r.storage_path,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Enhancement(r) => r.created_at,
            Self::Variation(r) => r.created_at,
        }
    }

    pub(crate) fn from_document(kind: DerivedKind, doc: StoredDocument) -> Result<Self> {
        Ok(match kind {
            DerivedKind::Enhancements => Self::Enhancement(from_document(doc)?),
            DerivedKind::Variations => Self::Variation(from_document(doc)?),
        })
    }
}

/// Serialize a record into document fields. The `id` is store-assigned and
/// never written as a field.
pub(crate) fn to_fields<T: Serialize>(record: &T) -> Result<Document> {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(mut fields)) => {
            fields.remove("id");
            Ok(fields)
        }
        Ok(_) => Err(AetheriaError::MetadataStore(
            "record did not serialize to an object".into(),
        )),
        Err(e) => Err(AetheriaError::MetadataStore(format!(
            "failed to serialize record: {e}"
        ))),
    }
}

/// Materialize a stored document as a typed record.
pub(crate) fn from_document<T: DeserializeOwned>(doc: StoredDocument) -> Result<T> {
    let StoredDocument { id, mut fields, .. } = doc;
    fields.insert("id".to_string(), serde_json::Value::String(id.clone()));
    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| AetheriaError::MetadataStore(format!("malformed document '{id}': {e}")))
}
