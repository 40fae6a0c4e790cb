use std::future::Future;
use std::time::Duration;
use futures::future::join_all;
use crate::{
    error::{EcoShareError, Result},
    receipt::extract::{ReceiptDraft, ReceiptExtractor},
};
use tracing::{debug, warn};

/// External OCR collaborator: image bytes in, raw text out.
pub trait OcrService {
    fn recognize(&self, image: &[u8]) -> impl Future<Output = Result<String>> + Send;
}

/// For receipts that were already transcribed: the "image" is UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPassthrough;

impl OcrService for TextPassthrough {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        String::from_utf8(image.to_vec())
            .map_err(|e| EcoShareError::Validation(format!("receipt text is not UTF-8: {}", e)))
    }
}

/// Runs OCR and extraction. An OCR failure or timeout degrades to an empty
/// draft so the user can type the fields in.
pub async fn extract_with_timeout<O: OcrService>(ocr: &O, image: &[u8], timeout: Duration) -> ReceiptDraft {
    match tokio::time::timeout(timeout, ocr.recognize(image)).await {
        Ok(Ok(text)) => {
            let draft = ReceiptExtractor::extract(&text);
            debug!("Extracted {} receipt fields", draft.extracted.len());
            draft
        }
        Ok(Err(e)) => {
            warn!("OCR failed, falling back to manual entry: {}", e);
            ReceiptDraft::default()
        }
        Err(_) => {
            warn!("OCR timed out after {:?}, falling back to manual entry", timeout);
            ReceiptDraft::default()
        }
    }
}

/// Extracts several receipts concurrently, preserving input order.
pub async fn extract_many<O: OcrService + Sync>(ocr: &O, images: &[Vec<u8>], timeout: Duration) -> Vec<ReceiptDraft> {
    join_all(images.iter().map(|image| extract_with_timeout(ocr, image, timeout))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowOcr;

    impl OcrService for SlowOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("Vendor: Too Late".to_string())
        }
    }

    struct BrokenOcr;

    impl OcrService for BrokenOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Err(EcoShareError::Other(anyhow::anyhow!("engine crashed")))
        }
    }

    #[tokio::test]
    async fn test_passthrough_extracts_fields() {
        let draft = extract_with_timeout(&TextPassthrough, b"Vendor: Co-op\nBill number: 9", Duration::from_secs(1)).await;
        assert_eq!(draft.vendor, "Co-op");
        assert_eq!(draft.bill_number, "9");
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_empty_draft() {
        let draft = extract_with_timeout(&SlowOcr, b"", Duration::from_millis(20)).await;
        assert_eq!(draft, ReceiptDraft::default());
    }

    #[tokio::test]
    async fn test_ocr_error_degrades_to_empty_draft() {
        let draft = extract_with_timeout(&BrokenOcr, b"", Duration::from_secs(1)).await;
        assert_eq!(draft, ReceiptDraft::default());

        let draft = extract_with_timeout(&TextPassthrough, &[0xff, 0xfe], Duration::from_secs(1)).await;
        assert_eq!(draft, ReceiptDraft::default());
    }

    #[tokio::test]
    async fn test_extract_many_keeps_order() {
        let images = vec![b"Vendor: A".to_vec(), b"Vendor: B".to_vec()];
        let drafts = extract_many(&TextPassthrough, &images, Duration::from_secs(1)).await;
        let vendors: Vec<&str> = drafts.iter().map(|d| d.vendor.as_str()).collect();
        assert_eq!(vendors, vec!["A", "B"]);
    }
}
