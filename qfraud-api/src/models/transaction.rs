//! Transaction rows: a fixed 30-column feature vector plus a binary label

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Number of numeric feature columns
pub const FEATURE_COUNT: usize = 30;

/// Feature columns in storage and CSV order
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "Time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13",
    "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26",
    "V27", "V28", "Amount",
];

/// Label column (1 = fraud)
pub const LABEL_COLUMN: &str = "Class";

/// All 31 columns an uploaded CSV must provide
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    FEATURE_COLUMNS.iter().copied().chain(std::iter::once(LABEL_COLUMN))
}

/// Comma-separated column list for SQL statements
pub fn sql_column_list() -> String {
    required_columns().collect::<Vec<_>>().join(", ")
}

/// One labelled transaction, independent of its project tag
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub features: [f64; FEATURE_COUNT],
    pub class: i64,
}

impl TransactionRow {
    pub fn is_fraud(&self) -> bool {
        self.class == 1
    }
}

/// Stored transaction as returned by the read endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTransaction {
    pub id: i64,
    pub project_name: Option<String>,
    pub row: TransactionRow,
}

impl Serialize for StoredTransaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT + 3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("project_name", &self.project_name)?;
        for (column, value) in FEATURE_COLUMNS.iter().zip(self.row.features.iter()) {
            map.serialize_entry(column, value)?;
        }
        map.serialize_entry(LABEL_COLUMN, &self.row.class)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_columns_are_31_unique() {
        let columns: Vec<_> = required_columns().collect();
        assert_eq!(columns.len(), 31);
        assert_eq!(columns.first(), Some(&"Time"));
        assert_eq!(columns.last(), Some(&"Class"));

        let mut deduped = columns.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), 31);
    }

    #[test]
    fn test_stored_transaction_serializes_column_names() {
        let mut features = [0.0; FEATURE_COUNT];
        features[0] = 12.0;
        features[29] = 149.62;
        let stored = StoredTransaction {
            id: 7,
            project_name: Some("alpha".to_string()),
            row: TransactionRow { features, class: 1 },
        };

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["project_name"], "alpha");
        assert_eq!(json["Time"], 12.0);
        assert_eq!(json["Amount"], 149.62);
        assert_eq!(json["Class"], 1);
        assert_eq!(json.as_object().unwrap().len(), 33);
    }
}
