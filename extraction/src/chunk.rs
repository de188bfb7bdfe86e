//! Sentence-aware chunking for long documents.
//!
//! Long text is split on sentence terminators and greedily packed into chunks
//! no larger than `chunk_size` characters, with a tail `overlap` carried into
//! the next chunk so fact-bearing sentences spanning a boundary are not lost.
//! Sizes are measured in characters, not bytes, since the input is Vietnamese.

/// Split `text` into sentences, keeping terminators attached.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if matches!(chars[i], '.' | '!' | '?') {
            // Consume the run of whitespace after the terminator too.
            let mut end = i + 1;
            while end < chars.len() && chars[end].is_whitespace() {
                end += 1;
            }
            if end > i + 1 {
                sentences.push(chars[start..end].iter().collect());
                start = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }

    if start < chars.len() {
        sentences.push(chars[start..].iter().collect());
    }

    sentences
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn char_tail(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(n);
    chars[start..].iter().collect()
}

/// Chunk `text` into pieces of at most `chunk_size` characters with an
/// `overlap`-character tail carried forward. Text that already fits is
/// returned as a single chunk.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if char_len(&current) + char_len(&sentence) > chunk_size && !current.is_empty() {
            chunks.push(current.trim().to_string());
            let mut next = char_tail(&current, overlap);
            next.push_str(&sentence);
            current = next;
        } else {
            current.push_str(&sentence);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    if chunks.is_empty() {
        vec![text.to_string()]
    } else {
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let text = "Lúa ST25 đạt 8.5 tấn/ha.";
        assert_eq!(chunk_text(text, 3000, 200), vec![text.to_string()]);
    }

    #[test]
    fn test_sentences_keep_terminators() {
        let sentences = split_sentences("Câu một. Câu hai! Câu ba");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "Câu một. ");
        assert_eq!(sentences[1], "Câu hai! ");
        assert_eq!(sentences[2], "Câu ba");
    }

    #[test]
    fn test_decimal_numbers_do_not_split_sentences() {
        // "8.5" has no whitespace after the dot, so it is not a boundary.
        let sentences = split_sentences("Năng suất đạt 8.5 tấn/ha. Hết.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("8.5 tấn/ha"));
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let sentence = "Giống lúa ST25 cho năng suất cao ở vùng ven biển. ";
        let text = sentence.repeat(40);
        let chunks = chunk_text(&text, 500, 50);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // A chunk may exceed the limit only by the carried overlap.
            assert!(chunk.chars().count() <= 500 + 50 + sentence.chars().count());
        }
    }

    #[test]
    fn test_overlap_carries_tail_forward() {
        let sentence = "Thông tin về giống lúa thơm ST25 tại đồng bằng sông Cửu Long. ";
        let text = sentence.repeat(20);
        let chunks = chunk_text(&text, 300, 60);

        assert!(chunks.len() >= 2);
        let first_tail: String = chunks[0]
            .chars()
            .rev()
            .take(30)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        assert!(
            chunks[1].contains(first_tail.trim()),
            "second chunk should repeat the tail of the first"
        );
    }

    #[test]
    fn test_unicode_is_never_split_mid_character() {
        let text = "Đặc điểm nổi bật của giống lúa. ".repeat(30);
        // Must not panic on any boundary.
        let chunks = chunk_text(&text, 100, 20);
        assert!(!chunks.is_empty());
    }
}
