use serde::{Deserialize, Serialize};

/// Sentinel stored in place of any field the extractor could not find.
/// Downstream consumers rely on this exact string, so it is part of the
/// public contract and must never change casing or spacing.
pub const NOT_FOUND: &str = "Not Found";

/// The fixed set of fields extracted from every receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptField {
    Amount,
    DateTime,
    TransactionId,
    PersonName,
    UpiId,
}

impl ReceiptField {
    pub const ALL: [ReceiptField; 5] = [
        ReceiptField::Amount,
        ReceiptField::DateTime,
        ReceiptField::TransactionId,
        ReceiptField::PersonName,
        ReceiptField::UpiId,
    ];

    /// The human-facing label, also used as the serialization key.
    pub fn label(self) -> &'static str {
        match self {
            ReceiptField::Amount => "Amount",
            ReceiptField::DateTime => "Date & Time",
            ReceiptField::TransactionId => "Transaction ID",
            ReceiptField::PersonName => "Person Name",
            ReceiptField::UpiId => "UPI ID",
        }
    }
}

impl std::fmt::Display for ReceiptField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The extracted values for one receipt. Every field is always present:
/// a validated value or [`NOT_FOUND`], never empty and never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Date & Time")]
    pub date_time: String,
    #[serde(rename = "Transaction ID")]
    pub transaction_id: String,
    #[serde(rename = "Person Name")]
    pub person_name: String,
    #[serde(rename = "UPI ID")]
    pub upi_id: String,
}

impl Default for ExtractedFields {
    fn default() -> Self {
        Self {
            amount: NOT_FOUND.to_string(),
            date_time: NOT_FOUND.to_string(),
            transaction_id: NOT_FOUND.to_string(),
            person_name: NOT_FOUND.to_string(),
            upi_id: NOT_FOUND.to_string(),
        }
    }
}

impl ExtractedFields {
    pub fn get(&self, field: ReceiptField) -> &str {
        match field {
            ReceiptField::Amount => &self.amount,
            ReceiptField::DateTime => &self.date_time,
            ReceiptField::TransactionId => &self.transaction_id,
            ReceiptField::PersonName => &self.person_name,
            ReceiptField::UpiId => &self.upi_id,
        }
    }

    pub fn is_found(&self, field: ReceiptField) -> bool {
        self.get(field) != NOT_FOUND
    }

    /// Iterate the five (label, value) pairs in their fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (ReceiptField, &str)> {
        ReceiptField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

impl std::fmt::Display for ExtractedFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, value) in self.iter() {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{field}: {value}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_sentinels() {
        let fields = ExtractedFields::default();
        for field in ReceiptField::ALL {
            assert_eq!(fields.get(field), NOT_FOUND);
            assert!(!fields.is_found(field));
        }
    }

    #[test]
    fn iter_yields_exactly_five_fields() {
        let fields = ExtractedFields::default();
        assert_eq!(fields.iter().count(), 5);
    }

    #[test]
    fn serializes_under_original_labels() {
        let fields = ExtractedFields {
            amount: "₹500".into(),
            ..ExtractedFields::default()
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["Amount"], "₹500");
        assert_eq!(json["Date & Time"], NOT_FOUND);
        assert_eq!(json["Transaction ID"], NOT_FOUND);
        assert_eq!(json["Person Name"], NOT_FOUND);
        assert_eq!(json["UPI ID"], NOT_FOUND);
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn display_lists_all_fields() {
        let rendered = ExtractedFields::default().to_string();
        for field in ReceiptField::ALL {
            assert!(rendered.contains(field.label()), "missing {field}");
        }
    }
}
