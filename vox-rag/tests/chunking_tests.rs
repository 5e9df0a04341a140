//! Property tests for overlapping window chunking.

use proptest::prelude::*;
use vox_rag::{Chunker, DocumentStore, WindowChunker};

/// Windows over a mix of ASCII words, punctuation, and multibyte text.
fn arb_document() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z]{1,12}",
            Just(" ".to_string()),
            Just("\n".to_string()),
            Just(". ".to_string()),
            Just("ಮಂಗಳೂರು".to_string()),
            Just("café".to_string()),
        ],
        0..80,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_window() -> impl Strategy<Value = (usize, usize)> {
    (1usize..64).prop_flat_map(|max| (Just(max), 0..max))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunks_reconstruct_the_document(doc in arb_document(), (max, overlap) in arb_window()) {
        let chunker = WindowChunker::new(max, overlap).unwrap();
        let store = DocumentStore::load(&doc, &chunker);
        prop_assert_eq!(store.reconstruct(), doc);
    }

    #[test]
    fn chunks_respect_bounds_and_cover_the_document(
        doc in arb_document(),
        (max, overlap) in arb_window(),
    ) {
        let chunks = WindowChunker::new(max, overlap).unwrap().chunk(&doc);

        let total: usize = chunks.iter().map(|c| c.text.len()).sum();
        prop_assert!(total >= doc.len());

        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.id, i);
            prop_assert!(!chunk.text.is_empty());
            prop_assert!(chunk.text.chars().count() <= max);
            prop_assert_eq!(&doc[chunk.source_offset..chunk.source_end()], chunk.text.as_str());
        }
        for pair in chunks.windows(2) {
            prop_assert!(pair[1].source_offset > pair[0].source_offset);
            prop_assert!(pair[1].source_offset <= pair[0].source_end());
        }
    }

    #[test]
    fn chunking_is_deterministic(doc in arb_document(), (max, overlap) in arb_window()) {
        let chunker = WindowChunker::new(max, overlap).unwrap();
        prop_assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
    }
}

#[test]
fn empty_document_has_no_chunks() {
    let chunker = WindowChunker::new(1000, 150).unwrap();
    assert!(chunker.chunk("").is_empty());
}

#[test]
fn short_document_is_one_chunk() {
    let chunker = WindowChunker::new(1000, 150).unwrap();
    let chunks = chunker.chunk("SIT is located in Valachil, Mangaluru.");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].source_offset, 0);
}
