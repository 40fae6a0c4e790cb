use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use crate::storage::ReceiptField;

/// Label substring (lowercase) that marks the line carrying each field.
/// Adding a receipt field is a new row here, not new parsing code.
pub const RECEIPT_LABELS: &[(ReceiptField, &str)] = &[
    (ReceiptField::BillNumber, "bill number"),
    (ReceiptField::ItemPurchased, "item"),
    (ReceiptField::Vendor, "vendor"),
    (ReceiptField::TotalAmount, "amount"),
    (ReceiptField::PurchaseDate, "date of purchase"),
];

/// Best-effort field set pulled out of receipt text. Empty strings mean
/// "not found"; the user fills those in before submitting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptDraft {
    pub bill_number: String,
    pub item_purchased: String,
    pub vendor: String,
    pub total_amount: String,
    /// ISO `YYYY-MM-DD`, or empty.
    pub purchase_date: String,
    /// Fields extraction actually populated.
    pub extracted: BTreeSet<ReceiptField>,
}

impl ReceiptDraft {
    pub fn get(&self, field: ReceiptField) -> &str {
        match field {
            ReceiptField::BillNumber => &self.bill_number,
            ReceiptField::ItemPurchased => &self.item_purchased,
            ReceiptField::Vendor => &self.vendor,
            ReceiptField::TotalAmount => &self.total_amount,
            ReceiptField::PurchaseDate => &self.purchase_date,
        }
    }

    fn slot(&mut self, field: ReceiptField) -> &mut String {
        match field {
            ReceiptField::BillNumber => &mut self.bill_number,
            ReceiptField::ItemPurchased => &mut self.item_purchased,
            ReceiptField::Vendor => &mut self.vendor,
            ReceiptField::TotalAmount => &mut self.total_amount,
            ReceiptField::PurchaseDate => &mut self.purchase_date,
        }
    }

    /// Overwrites a field with the user's value. The field stops counting as
    /// extracted.
    pub fn correct(&mut self, field: ReceiptField, value: &str) {
        *self.slot(field) = value.trim().to_string();
        self.extracted.remove(&field);
    }

    /// Fields still empty after extraction and corrections.
    pub fn missing(&self) -> Vec<ReceiptField> {
        RECEIPT_LABELS
            .iter()
            .map(|(field, _)| *field)
            .filter(|field| self.get(*field).is_empty())
            .collect()
    }
}

/// Stateless extractor over OCR text. Never fails; absent fields stay empty.
pub struct ReceiptExtractor;

impl ReceiptExtractor {
    pub fn extract(text: &str) -> ReceiptDraft {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let mut draft = ReceiptDraft::default();

        for (field, label) in RECEIPT_LABELS {
            let Some(line) = lines.iter().find(|line| line.to_lowercase().contains(label)) else {
                continue;
            };

            let raw = value_after_last_colon(line);
            let value = match field {
                ReceiptField::PurchaseDate => normalize_date(raw),
                _ => raw.to_string(),
            };

            if !value.is_empty() {
                draft.extracted.insert(*field);
            }
            *draft.slot(*field) = value;
        }

        draft
    }
}

/// Text after the last `:`, trimmed. A line without a colon yields itself.
fn value_after_last_colon(line: &str) -> &str {
    line.rsplit(':').next().unwrap_or_default().trim()
}

/// `DD/MM/YYYY` becomes `YYYY-MM-DD`. Anything else, including input that is
/// already ISO, becomes empty.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    // `%Y` alone would read `24` as the year 24.
    let four_digit_year = raw
        .rsplit('/')
        .next()
        .is_some_and(|year| year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()));
    if !four_digit_year {
        return String::new();
    }

    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "GreenMart Superstore
        Bill Number: INV-2041
        Item Purchased: Bamboo toothbrush
        Vendor: GreenMart
        Date of Purchase: 25/03/2024
        Total Amount: $12.50
        Thank you for shopping!";

    #[test]
    fn test_extracts_all_labelled_fields() {
        let draft = ReceiptExtractor::extract(SAMPLE);

        assert_eq!(draft.bill_number, "INV-2041");
        assert_eq!(draft.item_purchased, "Bamboo toothbrush");
        assert_eq!(draft.vendor, "GreenMart");
        assert_eq!(draft.total_amount, "$12.50");
        assert_eq!(draft.purchase_date, "2024-03-25");
        assert_eq!(draft.extracted.len(), 5);
        assert!(draft.missing().is_empty());
    }

    #[test]
    fn test_missing_labels_leave_fields_empty() {
        let draft = ReceiptExtractor::extract("Vendor: Corner Shop\nsomething else");

        assert_eq!(draft.vendor, "Corner Shop");
        assert_eq!(draft.bill_number, "");
        assert_eq!(
            draft.missing(),
            vec![
                ReceiptField::BillNumber,
                ReceiptField::ItemPurchased,
                ReceiptField::TotalAmount,
                ReceiptField::PurchaseDate,
            ]
        );
        assert_eq!(draft.extracted, [ReceiptField::Vendor].into_iter().collect());
    }

    #[test]
    fn test_empty_text_is_an_empty_draft() {
        assert_eq!(ReceiptExtractor::extract(""), ReceiptDraft::default());
    }

    #[test]
    fn test_first_matching_line_wins_and_last_colon_splits() {
        let draft = ReceiptExtractor::extract(
            "ITEM: Organic apples\nItem: Pears\nVendor: Farm: Stall 4\nAmount due 40",
        );
        assert_eq!(draft.item_purchased, "Organic apples");
        assert_eq!(draft.vendor, "Stall 4");
        assert_eq!(draft.total_amount, "Amount due 40");
    }

    #[test]
    fn test_date_normalization() {
        assert_eq!(normalize_date("25/03/2024"), "2024-03-25");
        assert_eq!(normalize_date("2024-03-25"), "");
        assert_eq!(normalize_date("March 25, 2024"), "");
        assert_eq!(normalize_date("31/02/2024"), "");
        assert_eq!(normalize_date("14/03/24"), "");
        assert_eq!(normalize_date("14/03/02024"), "");
    }

    #[test]
    fn test_two_digit_year_is_left_for_the_user() {
        let draft = ReceiptExtractor::extract("Date of purchase: 14/03/24");
        assert_eq!(draft.purchase_date, "");
        assert!(draft.missing().contains(&ReceiptField::PurchaseDate));
    }

    #[test]
    fn test_unrecognized_date_is_not_counted_as_extracted() {
        let draft = ReceiptExtractor::extract("Date of purchase: 2024-03-25");
        assert_eq!(draft.purchase_date, "");
        assert!(!draft.extracted.contains(&ReceiptField::PurchaseDate));
    }

    #[test]
    fn test_correction_replaces_value() {
        let mut draft = ReceiptExtractor::extract(SAMPLE);
        draft.correct(ReceiptField::Vendor, "  GreenMart Ltd ");

        assert_eq!(draft.vendor, "GreenMart Ltd");
        assert!(!draft.extracted.contains(&ReceiptField::Vendor));
    }
}
