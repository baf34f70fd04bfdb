use crate::chunking::{chunk_text, clean_page_text, ChunkingConfig};
use crate::error::IngestError;
use crate::extractor::extract_page_texts;
use crate::models::{ChunkMetadata, ChunkRecord, IngestionOptions, IngestionReport};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Hex chars of the document digest kept in chunk ids.
const ID_DIGEST_CHARS: usize = 12;

/// Turns one uploaded document into ordered chunk records.
///
/// Per page: extract, clean, chunk. Pages with no usable text after cleaning
/// are counted and skipped. A document whose total cleaned text is shorter
/// than `min_document_chars` is rejected as scanned or empty. `chunk_index`
/// in the metadata is local to the page; the record id carries a global
/// ordinal plus a digest of the document bytes, so ids stay deterministic
/// per content and uploads of a renamed-but-identical or same-named-but-
/// different file never silently collide.
pub fn process_document(
    bytes: &[u8],
    filename: &str,
    options: &IngestionOptions,
) -> Result<IngestionReport, IngestError> {
    let pages = extract_page_texts(bytes)?;
    let digest = document_digest(bytes);
    let config = ChunkingConfig::from(*options);

    let mut records = Vec::new();
    let mut empty_pages = 0usize;
    let mut total_chars = 0usize;

    for page in &pages {
        let cleaned = clean_page_text(&page.text);
        if cleaned.is_empty() {
            warn!(
                filename,
                page = page.number,
                "page has no extractable text; possible scanned image"
            );
            empty_pages += 1;
            continue;
        }
        total_chars += cleaned.chars().count();

        let chunks = chunk_text(&cleaned, config);
        debug!(filename, page = page.number, chunks = chunks.len(), "page chunked");

        for (chunk_index, text) in chunks.into_iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let ordinal = records.len();
            records.push(ChunkRecord {
                id: chunk_id(filename, &digest, ordinal),
                metadata: ChunkMetadata {
                    text: text.clone(),
                    filename: filename.to_string(),
                    page_number: page.number,
                    chunk_index,
                },
                text,
            });
        }
    }

    if total_chars < options.min_document_chars {
        return Err(IngestError::Validation(
            "This PDF appears to be empty or scanned. No text could be extracted.".to_string(),
        ));
    }

    debug!(filename, total_chunks = records.len(), empty_pages, "document ingested");

    Ok(IngestionReport {
        records,
        page_count: pages.len(),
        empty_pages,
        ingested_at: Utc::now(),
    })
}

fn document_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let full = format!("{:x}", hasher.finalize());
    full[..ID_DIGEST_CHARS].to_string()
}

fn chunk_id(filename: &str, digest: &str, ordinal: usize) -> String {
    format!("{filename}_{digest}_chunk_{ordinal}")
}

#[cfg(test)]
mod tests {
    use super::process_document;
    use crate::error::IngestError;
    use crate::models::IngestionOptions;
    use crate::test_pdf::pdf_with_pages;
    use std::collections::HashSet;

    fn long_page(seed: &str) -> String {
        let mut sentence = String::new();
        for index in 0..120 {
            sentence.push_str(seed);
            sentence.push_str(&format!(" term{index} follows. "));
        }
        sentence
    }

    #[test]
    fn empty_middle_page_is_skipped_without_error() {
        let first = long_page("alpha");
        let third = long_page("gamma");
        let bytes = pdf_with_pages(&[&first, "", &third]);

        let report = process_document(&bytes, "report.pdf", &IngestionOptions::default())
            .expect("two readable pages are enough");

        assert_eq!(report.page_count, 3);
        assert_eq!(report.empty_pages, 1);
        assert!(!report.records.is_empty());
        let pages: HashSet<u32> = report
            .records
            .iter()
            .map(|record| record.metadata.page_number)
            .collect();
        assert_eq!(pages, HashSet::from([1, 3]));
    }

    #[test]
    fn chunk_index_resets_per_page() {
        let first = long_page("alpha");
        let second = long_page("beta");
        let bytes = pdf_with_pages(&[&first, &second]);

        let report = process_document(&bytes, "multi.pdf", &IngestionOptions::default())
            .expect("document should ingest");

        let first_of_page_two = report
            .records
            .iter()
            .find(|record| record.metadata.page_number == 2)
            .expect("page two produced chunks");
        assert_eq!(first_of_page_two.metadata.chunk_index, 0);

        // Ids carry the global ordinal instead and never repeat.
        let ids: HashSet<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), report.records.len());
    }

    #[test]
    fn ids_are_deterministic_per_content() {
        let page = long_page("delta");
        let bytes = pdf_with_pages(&[&page]);

        let first = process_document(&bytes, "same.pdf", &IngestionOptions::default()).unwrap();
        let second = process_document(&bytes, "same.pdf", &IngestionOptions::default()).unwrap();
        assert_eq!(
            first.records.iter().map(|r| &r.id).collect::<Vec<_>>(),
            second.records.iter().map(|r| &r.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn same_filename_different_content_gets_distinct_ids() {
        let a = pdf_with_pages(&[&long_page("first version")]);
        let b = pdf_with_pages(&[&long_page("second version")]);

        let report_a = process_document(&a, "notes.pdf", &IngestionOptions::default()).unwrap();
        let report_b = process_document(&b, "notes.pdf", &IngestionOptions::default()).unwrap();
        assert_ne!(report_a.records[0].id, report_b.records[0].id);
    }

    #[test]
    fn nearly_empty_document_is_rejected() {
        let bytes = pdf_with_pages(&["tiny"]);
        let result = process_document(&bytes, "tiny.pdf", &IngestionOptions::default());
        match result {
            Err(IngestError::Validation(message)) => {
                assert!(message.contains("empty or scanned"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_bytes_are_a_parse_error() {
        let result = process_document(
            b"definitely not a pdf",
            "broken.pdf",
            &IngestionOptions::default(),
        );
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }

    #[test]
    fn chunk_text_lands_in_metadata_too() {
        let bytes = pdf_with_pages(&[&long_page("epsilon")]);
        let report = process_document(&bytes, "meta.pdf", &IngestionOptions::default()).unwrap();
        for record in &report.records {
            assert_eq!(record.text, record.metadata.text);
            assert_eq!(record.metadata.filename, "meta.pdf");
        }
    }
}
