pub mod extract;
pub mod ocr;
pub mod submission;

pub use extract::{normalize_date, ReceiptDraft, ReceiptExtractor, RECEIPT_LABELS};
pub use ocr::{extract_many, extract_with_timeout, OcrService, TextPassthrough};
pub use submission::parse_amount;
