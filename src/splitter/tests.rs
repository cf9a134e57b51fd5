use super::*;

fn chars_splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
    SplitterConfig::new()
        .chunk_size(chunk_size)
        .chunk_overlap(chunk_overlap)
        .build()
        .unwrap()
}

fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end - start).collect()
}

fn spans(chunks: &[Chunk]) -> Vec<(&str, usize, usize)> {
    chunks
        .iter()
        .map(|c| (c.text.as_str(), c.start, c.end))
        .collect()
}

fn assert_offsets_exact(text: &str, chunks: &[Chunk]) {
    for chunk in chunks {
        let raw = slice_chars(text, chunk.start, chunk.end);
        assert_eq!(
            raw.trim(),
            chunk.text,
            "chunk [{}, {}) does not match its source range",
            chunk.start,
            chunk.end
        );
    }
}

// ========================================================================
// Character fallback
// ========================================================================

#[test]
fn test_char_fallback_without_overlap() {
    let chunks = chars_splitter(4, 0).split_with_offsets("abcdefghij");
    assert_eq!(
        spans(&chunks),
        vec![("abcd", 0, 4), ("efgh", 4, 8), ("ij", 8, 10)]
    );
}

#[test]
fn test_char_fallback_with_overlap() {
    let chunks = chars_splitter(4, 2).split_with_offsets("abcdefgh");
    assert_eq!(
        spans(&chunks),
        vec![("abcd", 0, 4), ("cdef", 2, 6), ("efgh", 4, 8)]
    );

    for pair in chunks.windows(2) {
        let tail: String = pair[0].text.chars().skip(2).collect();
        let head: String = pair[1].text.chars().take(2).collect();
        assert_eq!(tail, head);
    }
}

#[test]
fn test_multibyte_offsets_are_characters() {
    let chunks = chars_splitter(4, 0).split_with_offsets("人工智能正在快速发展");
    assert_eq!(
        spans(&chunks),
        vec![("人工智能", 0, 4), ("正在快速", 4, 8), ("发展", 8, 10)]
    );
}

#[test]
fn test_offsets_advance_by_characters_not_size() {
    // every character weighs two units
    let splitter = SplitterConfig::new()
        .chunk_size(8)
        .chunk_overlap(4)
        .length_function(|text: &str| text.chars().count() * 2)
        .build()
        .unwrap();

    let chunks = splitter.split_with_offsets("abcdefgh");
    assert_eq!(
        spans(&chunks),
        vec![("abcd", 0, 4), ("cdef", 2, 6), ("efgh", 4, 8)]
    );
    assert!(chunks.iter().all(|c| c.size == 8 && !c.oversized));
}

// ========================================================================
// Configuration
// ========================================================================

#[test]
fn test_overlap_larger_than_size_is_rejected() {
    let err = SplitterConfig::new()
        .chunk_size(4)
        .chunk_overlap(5)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::OverlapTooLarge {
            overlap: 5,
            size: 4
        }
    ));
}

#[test]
fn test_overlap_equal_to_size_is_rejected() {
    let err = SplitterConfig::new()
        .chunk_size(4)
        .chunk_overlap(4)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::OverlapTooLarge { .. }));
}

#[test]
fn test_zero_chunk_size_is_rejected() {
    let err = SplitterConfig::new()
        .chunk_size(0)
        .chunk_overlap(0)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroChunkSize(0)));
}

#[test]
fn test_bad_regex_separator_is_rejected() {
    let err = SplitterConfig::new()
        .separators([Separator::regex("["), Separator::fallback()])
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSeparator { ref pattern, .. } if pattern == "["));
}

#[test]
fn test_empty_separator_list_falls_back_to_chars() {
    let splitter = SplitterConfig::new()
        .chunk_size(3)
        .chunk_overlap(0)
        .separators(Vec::new())
        .build()
        .unwrap();
    assert_eq!(splitter.split("abcdefg"), vec!["abc", "def", "g"]);
}

// ========================================================================
// Cascade and merge
// ========================================================================

#[test]
fn test_short_paragraph_kept_long_paragraph_recursed() {
    let long = (0..5)
        .map(|i| format!("line {i} ").repeat(5).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let text = format!("abc\n\n{long}");
    assert!(long.chars().count() >= 150);

    let splitter = SplitterConfig::new()
        .chunk_size(50)
        .chunk_overlap(0)
        .separators(["\n\n", "\n", ""].map(Separator::literal))
        .build()
        .unwrap();
    let chunks = splitter.split_with_offsets(&text);

    assert_eq!(spans(&chunks[..1]), vec![("abc", 0, 3)]);
    assert!(chunks.len() > 2, "long paragraph must produce several chunks");
    for chunk in &chunks {
        assert!(chunk.size <= 50);
        assert!(!chunk.oversized);
    }
    assert_offsets_exact(&text, &chunks);

    let joined: String = chunks[1..].iter().map(|c| c.text.replace('\n', "")).collect();
    assert_eq!(joined, long.replace('\n', ""));
}

#[test]
fn test_drop_separator_joins_with_original_gap() {
    let splitter = SplitterConfig::new()
        .chunk_size(5)
        .chunk_overlap(0)
        .separators([Separator::literal(" "), Separator::fallback()])
        .keep_separator(KeepSeparator::None)
        .build()
        .unwrap();

    let chunks = splitter.split_with_offsets("aa bb cc dd");
    assert_eq!(spans(&chunks), vec![("aa bb", 0, 5), ("cc dd", 6, 11)]);
}

#[test]
fn test_stripped_text_keeps_untrimmed_range() {
    let splitter = SplitterConfig::new()
        .chunk_size(6)
        .chunk_overlap(0)
        .separators([Separator::literal(" "), Separator::fallback()])
        .build()
        .unwrap();

    let chunks = splitter.split_with_offsets("aa bb cc dd");
    assert_eq!(spans(&chunks), vec![("aa bb", 0, 5), ("cc dd", 5, 11)]);
}

#[test]
fn test_no_strip_keeps_separator_text() {
    let splitter = SplitterConfig::new()
        .chunk_size(6)
        .chunk_overlap(0)
        .separators([Separator::literal(" "), Separator::fallback()])
        .strip_whitespace(false)
        .build()
        .unwrap();

    let chunks = splitter.split_with_offsets("aa bb cc dd");
    assert_eq!(spans(&chunks), vec![("aa bb", 0, 5), (" cc dd", 5, 11)]);
}

#[test]
fn test_regex_separator_drop_mode_offsets() {
    let splitter = SplitterConfig::new()
        .chunk_size(12)
        .chunk_overlap(0)
        .separators([Separator::regex(r"\s+"), Separator::fallback()])
        .keep_separator(KeepSeparator::None)
        .build()
        .unwrap();

    let text = "alpha   beta\t\tgamma delta";
    let chunks = splitter.split_with_offsets(text);
    assert_offsets_exact(text, &chunks);
    assert_eq!(chunks[0].text, "alpha   beta");
    assert_eq!(chunks.last().unwrap().text, "gamma delta");
}

#[test]
fn test_keep_end_attaches_separator_to_preceding_chunk() {
    let build = |chunk_overlap: usize| {
        SplitterConfig::new()
            .chunk_size(8)
            .chunk_overlap(chunk_overlap)
            .separators([Separator::literal("."), Separator::fallback()])
            .keep_separator(KeepSeparator::End)
            .build()
            .unwrap()
    };
    let text = "aa. bb. cc.";

    let chunks = build(0).split_with_offsets(text);
    assert_eq!(spans(&chunks), vec![("aa. bb.", 0, 7), ("cc.", 7, 11)]);
    assert_offsets_exact(text, &chunks);

    let chunks = build(4).split_with_offsets(text);
    assert_eq!(spans(&chunks), vec![("aa. bb.", 0, 7), ("bb. cc.", 3, 11)]);
    assert_offsets_exact(text, &chunks);
    assert!(chunks.iter().all(|c| c.text.ends_with('.')));
}

#[test]
fn test_unsplittable_piece_is_flagged_not_dropped() {
    let splitter = SplitterConfig::new()
        .chunk_size(4)
        .chunk_overlap(0)
        .separators([Separator::literal("\n")])
        .build()
        .unwrap();

    let chunks = splitter.split_with_offsets("ab\nabcdefghij");
    assert_eq!(chunks.len(), 2);
    assert_eq!(spans(&chunks[..1]), vec![("ab", 0, 2)]);
    assert!(!chunks[0].oversized);

    assert_eq!(chunks[1].text, "abcdefghij");
    assert_eq!((chunks[1].start, chunks[1].end), (2, 13));
    assert_eq!(chunks[1].size, 10);
    assert!(chunks[1].oversized);
}

#[test]
fn test_empty_and_blank_text() {
    let splitter = chars_splitter(4, 1);
    assert!(splitter.split_with_offsets("").is_empty());
    assert!(splitter.split("   \n\n  ").is_empty());
}

#[test]
fn test_split_is_projection_of_offsets() {
    let splitter = SplitterConfig::new()
        .chunk_size(20)
        .chunk_overlap(5)
        .default_separators()
        .build()
        .unwrap();
    let text = "First sentence here. Second one follows!\nThird line; fourth part.";

    let texts: Vec<String> = splitter
        .split_with_offsets(text)
        .into_iter()
        .map(|c| c.text)
        .collect();
    assert_eq!(splitter.split(text), texts);
    assert_eq!(splitter.split(text), splitter.split(text));
}

// ========================================================================
// Overlap-aware output
// ========================================================================

#[test]
fn test_main_span_skips_overlap_prefix() {
    let splitter = SplitterConfig::new()
        .chunk_size(4)
        .chunk_overlap(2)
        .overlap_aware(true)
        .build()
        .unwrap();
    let chunks = splitter.split_with_offsets("abcdefgh");

    let mains: Vec<(Option<&str>, Option<usize>, Option<usize>)> = chunks
        .iter()
        .map(|c| (c.main_text.as_deref(), c.main_start, c.main_end))
        .collect();
    assert_eq!(
        mains,
        vec![
            (Some("abcd"), Some(0), Some(4)),
            (Some("ef"), Some(4), Some(6)),
            (Some("gh"), Some(6), Some(8)),
        ]
    );
}

#[test]
fn test_main_span_empty_when_chunk_has_too_few_pieces() {
    let splitter = SplitterConfig::new()
        .chunk_size(10)
        .chunk_overlap(3)
        .separators([Separator::literal(" "), Separator::fallback()])
        .keep_separator(KeepSeparator::None)
        .overlap_aware(true)
        .build()
        .unwrap();
    let chunks = splitter.split_with_offsets("aaaa bbbb cccc");

    assert_eq!(spans(&chunks), vec![("aaaa bbbb", 0, 9), ("cccc", 10, 14)]);
    assert_eq!(chunks[1].main_start, Some(14));
    assert_eq!(chunks[1].main_end, Some(14));
    assert_eq!(chunks[1].main_text.as_deref(), Some(""));
}

#[test]
fn test_main_span_full_when_earlier_windows_were_blank() {
    let splitter = SplitterConfig::new()
        .chunk_size(4)
        .chunk_overlap(2)
        .overlap_aware(true)
        .build()
        .unwrap();
    let chunks = splitter.split_with_offsets("      abcd");

    assert_eq!(spans(&chunks), vec![("ab", 4, 8), ("abcd", 6, 10)]);

    // nothing was emitted before the first chunk, so none of it is overlap
    assert_eq!(chunks[0].main_text.as_deref(), Some("ab"));
    assert_eq!(chunks[0].main_start, Some(4));
    assert_eq!(chunks[0].main_end, Some(8));

    assert_eq!(chunks[1].main_text.as_deref(), Some("cd"));
    assert_eq!(chunks[1].main_start, Some(8));
    assert_eq!(chunks[1].main_end, Some(10));
}

#[test]
fn test_main_fields_absent_by_default() {
    let chunks = chars_splitter(4, 2).split_with_offsets("abcdefgh");
    assert!(chunks.iter().all(|c| c.main_text.is_none() && c.main_start.is_none()));

    let json = serde_json::to_value(&chunks[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "text": "abcd", "start": 0, "end": 4, "size": 4 })
    );
}

// ========================================================================
// Properties over a larger document
// ========================================================================

fn sample_document() -> String {
    let mut text = String::new();
    for p in 0..12 {
        for s in 0..(3 + p % 4) {
            text.push_str(&format!("Paragraph {p} sentence {s} talks about topic {}. ", p * s));
            if s % 2 == 1 {
                text.push('\n');
            }
        }
        text.push_str("人工智能正在快速发展。尤其是在自然语言处理领域！");
        text.push_str("\n\n");
    }
    text
}

#[test]
fn test_properties_with_default_separators() {
    let text = sample_document();
    let total_chars = text.chars().count();

    for (size, overlap) in [(40, 0), (64, 16), (120, 30), (300, 100)] {
        let splitter = SplitterConfig::new()
            .chunk_size(size)
            .chunk_overlap(overlap)
            .default_separators()
            .build()
            .unwrap();
        let chunks = splitter.split_with_offsets(&text);

        assert_offsets_exact(&text, &chunks);

        let mut covered = vec![false; total_chars];
        for chunk in &chunks {
            assert!(chunk.size <= size, "size bound violated: {} > {size}", chunk.size);
            assert!(!chunk.oversized);
            covered[chunk.start..chunk.end].iter_mut().for_each(|c| *c = true);
        }
        for (i, ch) in text.chars().enumerate() {
            assert!(covered[i] || ch.is_whitespace(), "char {i} {ch:?} not covered");
        }

        for pair in chunks.windows(2) {
            assert!(pair[0].start < pair[1].start, "chunks out of order");
        }
    }
}

#[test]
fn test_token_length_function() {
    let text = sample_document();
    let splitter = SplitterConfig::new()
        .chunk_size(24)
        .chunk_overlap(6)
        .default_separators()
        .length_function(TokenLength::cl100k().unwrap())
        .build()
        .unwrap();

    let chunks = splitter.split_with_offsets(&text);
    assert!(chunks.len() > 10);
    assert_offsets_exact(&text, &chunks);
    for chunk in &chunks {
        assert_eq!(chunk.size, splitter.size(&chunk.text));
        assert!(chunk.size <= 24 || chunk.oversized);
    }
}

#[test]
fn test_fragments_cover_input_in_keep_mode() {
    let text = sample_document();
    let splitter = SplitterConfig::new()
        .chunk_size(50)
        .chunk_overlap(10)
        .default_separators()
        .build()
        .unwrap();

    let mut next = 0;
    let mut rebuilt = String::new();
    for segment in splitter.fragments(&text) {
        for fragment in segment.fragments() {
            assert_eq!(fragment.char_start, next, "gap or reordering in fragments");
            next = fragment.char_end;
            rebuilt.push_str(fragment.text);
        }
    }
    assert_eq!(rebuilt, text);
}
