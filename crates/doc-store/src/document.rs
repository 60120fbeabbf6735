use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{DocumentId, Result};

/// A stored document.
///
/// `seq` is assigned by the store on insert and strictly increases across
/// inserts, so ordering by it yields creation order regardless of how the
/// backend lays out its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier, unique within its collection.
    pub id: DocumentId,

    /// Store-assigned insertion sequence.
    pub seq: i64,

    /// When the document was inserted.
    pub created_at: DateTime<Utc>,

    /// The document body.
    pub body: serde_json::Value,
}

impl Document {
    /// Deserializes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Consumes the document and deserializes its body.
    pub fn into_decoded<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Widget {
        name: String,
        stock: u32,
    }

    #[test]
    fn decode_typed_body() {
        let doc = Document {
            id: DocumentId::new(),
            seq: 1,
            created_at: Utc::now(),
            body: serde_json::json!({"name": "Widget", "stock": 4}),
        };

        let widget: Widget = doc.decode().unwrap();
        assert_eq!(
            widget,
            Widget {
                name: "Widget".to_string(),
                stock: 4
            }
        );
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        let doc = Document {
            id: DocumentId::new(),
            seq: 1,
            created_at: Utc::now(),
            body: serde_json::json!({"name": 12}),
        };

        assert!(doc.decode::<Widget>().is_err());
    }
}
