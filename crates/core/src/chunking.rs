use crate::models::IngestionOptions;

/// Separators tried in priority order. The first one that actually splits
/// the text into more than one part wins.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Recursion cap for re-splitting oversized chunks. Past this depth the text
/// is hard-sliced, which keeps pathological inputs (no separators, no
/// spaces) from recursing without bound.
const MAX_SPLIT_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl From<IngestionOptions> for ChunkingConfig {
    fn from(value: IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
        }
    }
}

/// Normalizes raw page text before chunking: drops hyphenated line-break
/// artifacts ("intel-\nligence" -> "intelligence"), turns remaining newlines
/// into spaces, collapses whitespace runs, and trims.
pub fn clean_page_text(text: &str) -> String {
    text.replace("-\n", "")
        .replace('\n', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits `text` into bounded, overlapping chunks.
///
/// The split pass greedily packs separator-delimited parts up to
/// `chunk_size` chars; any chunk still oversized is re-split recursively,
/// and text no separator can split is hard-sliced every `chunk_size` chars.
/// Overlap is applied exactly once, to the finalized top-level list: each
/// chunk after the first is prefixed with the last `overlap` chars of the
/// previous chunk, then every chunk is trimmed. Deterministic; empty input
/// yields an empty list.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let raw = split_recursive(text, config.chunk_size, 0);

    let mut finalized = Vec::with_capacity(raw.len());
    for (position, chunk) in raw.iter().enumerate() {
        if position > 0 && config.overlap > 0 {
            let tail = char_tail(&raw[position - 1], config.overlap);
            finalized.push(format!("{tail}{chunk}").trim().to_string());
        } else {
            finalized.push(chunk.trim().to_string());
        }
    }
    finalized
}

fn split_recursive(text: &str, chunk_size: usize, depth: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if depth >= MAX_SPLIT_DEPTH {
        return slice_fixed_width(text, chunk_size);
    }

    for separator in SEPARATORS {
        let parts: Vec<&str> = text.split(separator).collect();
        if parts.len() == 1 {
            continue;
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        let separator_len = char_len(separator);

        for part in parts {
            let part_len = char_len(part);
            if current.is_empty() {
                if part_len > chunk_size {
                    // A lone part longer than chunk_size passes through
                    // unsplit here; the recursive pass below handles it.
                    chunks.push(part.to_string());
                } else {
                    current.push_str(part);
                    current_len = part_len;
                }
                continue;
            }

            if current_len + separator_len + part_len > chunk_size {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                if part_len > chunk_size {
                    chunks.push(part.to_string());
                } else {
                    current.push_str(part);
                    current_len = part_len;
                }
            } else {
                current.push_str(separator);
                current.push_str(part);
                current_len += separator_len + part_len;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        let mut result = Vec::new();
        for chunk in chunks {
            if char_len(&chunk) > chunk_size {
                result.extend(split_recursive(&chunk, chunk_size, depth + 1));
            } else {
                result.push(chunk);
            }
        }
        return result;
    }

    slice_fixed_width(text, chunk_size)
}

fn slice_fixed_width(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The last `count` chars of `text`, or the whole text if shorter.
fn char_tail(text: &str, count: usize) -> String {
    let total = char_len(text);
    if total <= count {
        return text.to_string();
    }
    text.chars().skip(total - count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            overlap,
        }
    }

    fn words(count: usize) -> String {
        (0..count)
            .map(|index| format!("word{index:04}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn page_text_is_cleaned() {
        let raw = "intel-\nligence  spans\nmany   lines\t here ";
        assert_eq!(clean_page_text(raw), "intelligence spans many lines here");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", ChunkingConfig::default()).is_empty());
        assert_eq!(clean_page_text("\n  \n"), "");
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = words(300);
        let first = chunk_text(&text, ChunkingConfig::default());
        let second = chunk_text(&text, ChunkingConfig::default());
        assert_eq!(first, second);
        assert!(first.len() > 1);
    }

    #[test]
    fn every_chunk_respects_the_length_bound() {
        let text = format!(
            "{}\n\n{}. {} {}",
            words(120),
            words(90),
            "x".repeat(1_700),
            words(40)
        );
        let cfg = ChunkingConfig::default();
        for chunk in chunk_text(&text, cfg) {
            assert!(chunk.chars().count() <= cfg.chunk_size + cfg.overlap);
        }
    }

    #[test]
    fn paragraph_separator_is_preferred() {
        let text = "first paragraph\n\nsecond paragraph\n\nthird paragraph";
        let chunks = chunk_text(text, config(20, 0));
        assert_eq!(
            chunks,
            vec!["first paragraph", "second paragraph", "third paragraph"]
        );
    }

    #[test]
    fn small_parts_are_packed_together() {
        let text = "alpha beta\n\ngamma";
        let chunks = chunk_text(text, config(500, 0));
        assert_eq!(chunks, vec!["alpha beta\n\ngamma"]);
    }

    #[test]
    fn unsplittable_text_is_sliced_fixed_width() {
        let text = "a".repeat(1_200);
        let chunks = chunk_text(&text, config(500, 0));
        assert_eq!(
            chunks.iter().map(String::len).collect::<Vec<_>>(),
            vec![500, 500, 200]
        );
    }

    #[test]
    fn oversized_token_between_words_is_sliced() {
        let token = "b".repeat(1_100);
        let text = format!("{} {} {}", words(10), token, words(10));
        let cfg = config(500, 0);
        let chunks = chunk_text(&text, cfg);
        assert!(chunks.iter().any(|chunk| chunk.contains("bbbb")));
        for chunk in &chunks {
            assert!(chunk.chars().count() <= cfg.chunk_size);
        }
        // The sliced token is still fully present.
        let total_b = chunks
            .iter()
            .map(|chunk| chunk.matches('b').count())
            .sum::<usize>();
        assert_eq!(total_b, 1_100);
    }

    #[test]
    fn overlap_prefixes_the_previous_tail_once() {
        let text = words(200);
        let cfg = config(120, 30);
        let plain = chunk_text(&text, config(120, 0));
        let overlapped = chunk_text(&text, cfg);

        assert_eq!(plain.len(), overlapped.len());
        assert_eq!(plain[0], overlapped[0]);
        for index in 1..plain.len() {
            assert!(overlapped[index].ends_with(&plain[index]));
            assert!(overlapped[index].chars().count() <= cfg.chunk_size + cfg.overlap);
            assert!(overlapped[index].chars().count() >= plain[index].chars().count());
        }
    }

    #[test]
    fn chunks_round_trip_to_the_source_text() {
        // With no overlap, boundary separators are the only loss, so a
        // single-space rejoin reconstructs space-separated input exactly.
        let text = words(400);
        let chunks = chunk_text(&text, config(180, 0));
        assert!(chunks.len() > 2);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_char() {
        let text = "é".repeat(1_050);
        for chunk in chunk_text(&text, config(500, 50)) {
            assert!(chunk.chars().all(|c| c == 'é'));
            assert!(chunk.chars().count() <= 550);
        }
    }
}
