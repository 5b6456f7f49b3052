use wordindex_core::tokenizer::{normalize, tokenize};

#[test]
fn it_strips_edge_punctuation_but_keeps_inner() {
    let words = tokenize(b"\"Hello,\" she said... don't e-mail (please)!");
    assert_eq!(words, vec!["hello", "she", "said", "don't", "e-mail", "please"]);
}

#[test]
fn it_filters_short_terms() {
    let words = tokenize(b"a an the to of cat");
    assert_eq!(words, vec!["the", "cat"]);
    // Length is measured after stripping.
    assert_eq!(normalize(b"...ab!!"), None);
    assert_eq!(normalize(b"!!!"), None);
}

#[test]
fn it_lowercases_unicode() {
    let words = tokenize("ÉCOLE Straße".as_bytes());
    assert_eq!(words, vec!["école", "straße"]);
}

#[test]
fn it_keeps_digits_and_underscores() {
    let words = tokenize(b"2024 _init_ 42");
    assert_eq!(words, vec!["2024", "_init_"]);
}

#[test]
fn it_splits_on_all_ascii_whitespace() {
    let words = tokenize(b"one\ttwo\r\nthree\x0bfour\x0cfive");
    assert_eq!(words, vec!["one", "two", "three", "four", "five"]);
}
