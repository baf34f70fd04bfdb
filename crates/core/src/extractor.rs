use crate::error::IngestError;
use lopdf::Document;
use tracing::warn;

/// Raw text of one PDF page, 1-based page number.
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Extracts per-page text from in-memory PDF bytes.
///
/// A document that cannot be parsed at all is a `PdfParse` error. A page
/// whose text extraction fails degrades to an empty page text; the caller
/// counts it as empty and skips it, so one broken page never sinks a whole
/// upload.
pub fn extract_page_texts(bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
    let document =
        Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = match document.extract_text(&[page_no]) {
            Ok(text) => text,
            Err(error) => {
                warn!(page = page_no, %error, "page text extraction failed");
                String::new()
            }
        };
        pages.push(PageText {
            number: page_no,
            text,
        });
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::extract_page_texts;
    use crate::error::IngestError;
    use crate::test_pdf::pdf_with_pages;

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let result = extract_page_texts(b"%PDF-1.4\nnot really a pdf");
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }

    #[test]
    fn pages_come_back_in_order_with_numbers() {
        let bytes = pdf_with_pages(&["First page words", "Second page words"]);
        let pages = extract_page_texts(&bytes).expect("pdf should parse");

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert!(pages[0].text.contains("First page words"));
        assert_eq!(pages[1].number, 2);
        assert!(pages[1].text.contains("Second page words"));
    }
}
