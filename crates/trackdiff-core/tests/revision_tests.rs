//! Accepting and rejecting the revisions of compared documents.

use pretty_assertions::assert_eq;
use trackdiff_core::xml::{parse, serialize};
use trackdiff_core::{
    accept_revisions, compare, count_revisions, extract_revisions, reject_revisions, CompareSettings, Document,
    RevisionKind,
};

fn doc_of(body: &str) -> Document {
    parse(&format!("<document><body>{body}</body></document>")).unwrap()
}

fn paragraphs(texts: &[&str]) -> Document {
    let body: String = texts
        .iter()
        .map(|t| format!(r#"<p><r><t xml:space="preserve">{t}</t></r></p>"#))
        .collect();
    doc_of(&body)
}

/// Compares, then checks that both views reproduce the inputs.
fn assert_round_trip(original: &Document, modified: &Document, settings: &CompareSettings) -> Document {
    let result = compare(original, modified, settings).unwrap();
    assert_eq!(accept_revisions(&result).plain_text(), modified.plain_text(), "accepted view");
    assert_eq!(reject_revisions(&result).plain_text(), original.plain_text(), "rejected view");
    result
}

#[test]
fn word_edits_resolve_to_either_input() {
    assert_round_trip(
        &paragraphs(&["Keep this line.", "The quick brown fox jumps over the lazy dog."]),
        &paragraphs(&["Keep this line.", "The slow brown fox leaps over the dog!"]),
        &CompareSettings::default(),
    );
}

#[test]
fn inserted_and_deleted_paragraphs_resolve_to_either_input() {
    assert_round_trip(
        &paragraphs(&["first", "second paragraph here", "third"]),
        &paragraphs(&["first", "third", "a brand new closing paragraph"]),
        &CompareSettings::default(),
    );
}

#[test]
fn moves_resolve_to_either_input() {
    let original = paragraphs(&["the quick brown fox jumps", "first anchor paragraph", "second anchor paragraph"]);
    let modified = paragraphs(&["first anchor paragraph", "second anchor paragraph", "the quick brown fox jumps"]);
    let result = assert_round_trip(&original, &modified, &CompareSettings::default());
    assert_eq!(count_revisions(&result).moves, 1);

    let accepted = serialize(&accept_revisions(&result)).unwrap();
    for marker in ["moveFrom", "moveTo", "RangeStart", "RangeEnd", "delText"] {
        assert!(!accepted.contains(marker), "{marker} left in {accepted}");
    }
}

#[test]
fn table_rows_resolve_to_either_input() {
    let table = |rows: &[&str]| {
        let rows: String = rows
            .iter()
            .map(|r| format!("<tr><tc><p><r><t>{r}</t></r></p></tc></tr>"))
            .collect();
        doc_of(&format!("<p><r><t>Anchor</t></r></p><tbl><tblPr/>{rows}</tbl>"))
    };
    assert_round_trip(
        &table(&["alpha", "beta", "gamma"]),
        &table(&["alpha", "delta", "gamma", "epsilon"]),
        &CompareSettings::default(),
    );
}

#[test]
fn formatting_changes_resolve_to_either_input() {
    let original = doc_of(r#"<p><r><t>Anchor</t></r></p><p><r><rPr><i/></rPr><t>styled</t></r></p>"#);
    let modified = doc_of(r#"<p><r><t>Anchor</t></r></p><p><r><rPr><b/></rPr><t>styled</t></r></p>"#);
    let result = assert_round_trip(&original, &modified, &CompareSettings::default());

    let rejected = serialize(&reject_revisions(&result)).unwrap();
    assert!(rejected.contains("<w:rPr><w:i/></w:rPr>"), "{rejected}");
    let accepted = serialize(&accept_revisions(&result)).unwrap();
    assert!(accepted.contains("<w:rPr><w:b/></w:rPr>"), "{accepted}");
}

#[test]
fn existing_revisions_in_inputs_are_flattened() {
    let original = doc_of(r#"<p><ins id="9" author="x" date="d"><r><t>already tracked</t></r></ins></p>"#);
    let modified = paragraphs(&["already tracked"]);
    let result = compare(&original, &modified, &CompareSettings::default()).unwrap();
    assert!(extract_revisions(&result).is_empty());
}

#[test]
fn records_carry_settings_author_and_date() {
    use chrono::TimeZone;
    let when = chrono::Utc.with_ymd_and_hms(2025, 5, 4, 3, 2, 1).unwrap();
    let settings = CompareSettings::default().with_author("Reviewer").with_timestamp(when);
    let result = compare(
        &paragraphs(&["Anchor", "one two"]),
        &paragraphs(&["Anchor", "one two three"]),
        &settings,
    )
    .unwrap();

    let records = extract_revisions(&result);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RevisionKind::Insertion);
    assert_eq!(records[0].author, "Reviewer");
    assert_eq!(records[0].date, "2025-05-04T03:02:01Z");
    assert_eq!(records[0].text, " three");
}
