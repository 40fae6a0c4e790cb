use chrono::NaiveDate;
use crate::{
    error::{EcoShareError, Result},
    receipt::extract::ReceiptDraft,
    storage::{BillType, EcoCertification, PurchaseMode, ReceiptSubmission},
};

impl ReceiptDraft {
    /// Turns the (possibly corrected) draft into a submission.
    ///
    /// Empty fields are allowed through. Non-empty amount and date values
    /// must parse.
    pub fn finalize(
        self,
        user_id: &str,
        bill_type: BillType,
        purchase_mode: PurchaseMode,
        eco_certification: EcoCertification,
    ) -> Result<ReceiptSubmission> {
        let total_amount = match self.total_amount.trim() {
            "" => None,
            raw => Some(parse_amount(raw)?),
        };

        let purchase_date = match self.purchase_date.trim() {
            "" => None,
            raw => Some(parse_iso_date(raw)?),
        };

        Ok(ReceiptSubmission {
            user_id: user_id.to_string(),
            bill_type,
            bill_number: self.bill_number,
            item_purchased: self.item_purchased,
            purchase_date,
            vendor: self.vendor,
            purchase_mode,
            eco_certification,
            total_amount,
            extracted_fields: self.extracted,
        })
    }
}

/// Strict `YYYY-MM-DD`; short years are rejected rather than read literally.
fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    let invalid = || EcoShareError::Validation(format!("purchaseDate '{}' is not YYYY-MM-DD", raw));

    if raw.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())
}

/// Parses an amount as printed on a receipt: currency symbols and codes are
/// ignored. `.` is the decimal point and `,` may only group thousands, so
/// `1.250,00` and `12,50` are rejected instead of being misread.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let invalid = || EcoShareError::Validation(format!("totalAmount '{}' is not a valid amount", raw));

    let start = raw.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let end = raw.rfind(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    if raw[..start].contains('-') {
        return Err(invalid());
    }

    let digits = &raw[start..=end];
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if fraction.contains(',') || whole.split(',').skip(1).any(|group| group.len() != 3) {
        return Err(invalid());
    }

    let cleaned: String = digits.chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(invalid()),
    }
}
