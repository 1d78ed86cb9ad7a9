//! Flattens paragraphs into comparison atoms.
//!
//! Text is split into words and separators: a word is a maximal run of
//! characters that are neither separators nor whitespace, every separator is
//! an atom of its own, and so is every CJK ideograph. A `.` or `,` between
//! digits stays inside the word so numbers like `1,000.50` remain whole.
//! Non-text run content (breaks, tabs, drawings, ...) becomes one leaf atom,
//! and each paragraph ends with a mark atom carrying its paragraph
//! properties.

use super::atom::{AtomContent, ComparisonAtom};
use super::formatting::Formatting;
use super::normalize::NormalizedTree;
use super::settings::CompareSettings;
use crate::hash::Sha1Accumulator;
use crate::tree::{vocab, DocumentNode, NodeId};
use crate::util::comparison_key;

/// Key of every paragraph mark. Control characters cannot occur in XML text,
/// so no word can collide with it.
pub(crate) const PARAGRAPH_MARK_KEY: &str = "\u{1}pmark";

const LEAF_KEY_PREFIX: &str = "\u{1}leaf:";

const EMPTY_KEY_PREFIX: &str = "\u{1}empty:";

pub(crate) fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF      // CJK unified ideographs
        | 0x3400..=0x4DBF    // extension A
        | 0xF900..=0xFAFF    // compatibility ideographs
        | 0x3040..=0x30FF    // hiragana, katakana
        | 0xAC00..=0xD7AF)   // hangul syllables
}

fn is_break_char(c: char, settings: &CompareSettings) -> bool {
    c.is_whitespace() || settings.is_word_separator(c)
}

/// Splits `text` into word and separator tokens. Concatenating the tokens
/// gives back `text`.
pub fn tokenize(text: &str, settings: &CompareSettings) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut word = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let numeric_joint = (c == '.' || c == ',')
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());

        if numeric_joint {
            word.push(c);
        } else if is_cjk(c) || is_break_char(c, settings) {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            tokens.push(c.to_string());
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

fn is_word_token(token: &str, settings: &CompareSettings) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !is_break_char(c, settings),
        (Some(_), Some(_)) => true,
        (None, _) => false,
    }
}

/// Atoms of paragraph `p`, in document order, ending with its mark.
pub(crate) fn atomize_paragraph(
    tree: &NormalizedTree,
    p: NodeId,
    settings: &CompareSettings,
) -> Vec<ComparisonAtom> {
    let mut atoms = Vec::new();
    collect_inline(tree, p, &Formatting::new(), settings, &mut atoms);

    let mark_formatting = tree
        .doc
        .child_by_tag(p, vocab::P_PR)
        .map(|ppr| Formatting::from_properties(&tree.doc, ppr))
        .unwrap_or_default();
    atoms.push(ComparisonAtom::new(
        AtomContent::ParagraphMark,
        tree.path_to(p),
        mark_formatting,
        PARAGRAPH_MARK_KEY.to_string(),
        false,
    ));
    atoms
}

/// A whole element treated as one indivisible atom.
pub(crate) fn leaf_atom(
    tree: &NormalizedTree,
    node: NodeId,
    formatting: Formatting,
) -> ComparisonAtom {
    let tag = tree.doc.tag(node).unwrap_or_default().to_string();
    let key = subtree_digest(tree, node);
    ComparisonAtom::new(
        AtomContent::Leaf { tag: tag.clone(), key: key.clone() },
        tree.path_to(node),
        formatting,
        format!("{LEAF_KEY_PREFIX}{tag}:{key}"),
        false,
    )
}

/// Atom for a table, row or cell that holds nothing to compare.
pub(crate) fn empty_container_atom(tree: &NormalizedTree, node: NodeId) -> ComparisonAtom {
    let tag = tree.doc.tag(node).unwrap_or_default().to_string();
    ComparisonAtom::new(
        AtomContent::EmptyContainer { tag: tag.clone() },
        tree.path_to(node),
        Formatting::new(),
        format!("{EMPTY_KEY_PREFIX}{tag}"),
        false,
    )
}

fn collect_inline(
    tree: &NormalizedTree,
    parent: NodeId,
    formatting: &Formatting,
    settings: &CompareSettings,
    atoms: &mut Vec<ComparisonAtom>,
) {
    for child in tree.doc.element_children(parent) {
        let Some(tag) = tree.doc.tag(child) else { continue };
        if vocab::is_property_container(tag) {
            continue;
        }
        if tag == vocab::R {
            collect_run(tree, child, settings, atoms);
        } else if vocab::is_inline_container(tag) {
            collect_inline(tree, child, formatting, settings, atoms);
        } else {
            atoms.push(leaf_atom(tree, child, formatting.clone()));
        }
    }
}

fn collect_run(
    tree: &NormalizedTree,
    run: NodeId,
    settings: &CompareSettings,
    atoms: &mut Vec<ComparisonAtom>,
) {
    let formatting = tree
        .doc
        .child_by_tag(run, vocab::R_PR)
        .map(|rpr| Formatting::from_properties(&tree.doc, rpr))
        .unwrap_or_default();

    for child in tree.doc.element_children(run) {
        match tree.doc.tag(child) {
            Some(vocab::R_PR) | None => {}
            Some(vocab::T) => {
                let text = tree.doc.text_content(child);
                let path = tree.path_to(child);
                for token in tokenize(&text, settings) {
                    let key = comparison_key(
                        &token,
                        settings.case_insensitive,
                        settings.conflate_breaking_and_nonbreaking_spaces,
                    );
                    let is_word = is_word_token(&token, settings);
                    atoms.push(ComparisonAtom::new(
                        AtomContent::Text(token),
                        path.clone(),
                        formatting.clone(),
                        key,
                        is_word,
                    ));
                }
            }
            Some(_) => atoms.push(leaf_atom(tree, child, formatting.clone())),
        }
    }
}

/// Digest of an element subtree: tags, sorted attributes and text.
pub(crate) fn subtree_digest(tree: &NormalizedTree, node: NodeId) -> String {
    let mut acc = Sha1Accumulator::new();
    let base = tree.doc.ancestors(node).count();
    for n in tree.doc.descendants(node) {
        match tree.doc.get(n) {
            Some(DocumentNode::Element { tag, attributes }) => {
                let depth = (tree.doc.ancestors(n).count() - base).to_string();
                acc.field(&depth).field(tag);
                let mut attrs: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
                attrs.sort();
                for a in &attrs {
                    acc.field(a);
                }
            }
            Some(DocumentNode::Text(text)) => {
                acc.field(text);
            }
            None => {}
        }
    }
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::context::CompareContext;
    use crate::compare::normalize::normalize;
    use crate::xml::parse;

    fn tokens(text: &str) -> Vec<String> {
        tokenize(text, &CompareSettings::default())
    }

    #[test]
    fn words_and_separators_are_separate_tokens() {
        assert_eq!(tokens("The quick fox"), vec!["The", " ", "quick", " ", "fox"]);
        assert_eq!(tokens("a-b (c)"), vec!["a", "-", "b", " ", "(", "c", ")"]);
    }

    #[test]
    fn numbers_keep_their_punctuation() {
        assert_eq!(tokens("$1,000.50 total"), vec!["$", "1,000.50", " ", "total"]);
        assert_eq!(tokens("end, then"), vec!["end", ",", " ", "then"]);
    }

    #[test]
    fn cjk_characters_are_single_tokens() {
        assert_eq!(tokens("中文abc"), vec!["中", "文", "abc"]);
    }

    #[test]
    fn tokens_reassemble_the_text() {
        let text = "Hello,\u{a0}world -- 3.14 (ok)";
        assert_eq!(tokens(text).concat(), text);
    }

    #[test]
    fn paragraph_atoms_end_with_mark_and_carry_run_formatting() {
        let doc = parse(
            r#"<document><body><p><pPr><jc val="center"/></pPr>
                <r><rPr><b/></rPr><t>Bold text</t></r><r><br/></r></p></body></document>"#,
        )
        .unwrap();
        let settings = CompareSettings::default();
        let mut ctx = CompareContext::new(&settings);
        let tree = normalize(&doc, &mut ctx).unwrap();
        let body = tree.block_container().unwrap();
        let p = tree.doc.element_children(body).next().unwrap();

        let atoms = atomize_paragraph(&tree, p, &settings);
        let texts: Vec<_> = atoms.iter().map(|a| a.text().to_string()).collect();
        assert_eq!(texts, vec!["Bold", " ", "text", "", ""]);
        assert_eq!(atoms[0].formatting.get("bold"), Some("true"));
        assert!(atoms[0].is_word());
        assert!(!atoms[1].is_word());
        assert!(matches!(atoms[3].content, AtomContent::Leaf { ref tag, .. } if tag == "br"));

        let mark = atoms.last().unwrap();
        assert!(mark.content.is_paragraph_mark());
        assert_eq!(mark.formatting.get("alignment"), Some("center"));
        assert_eq!(mark.ancestor_path.last().copied(), tree.unid(p));
    }

    #[test]
    fn case_insensitive_keys_fold_case() {
        let settings = CompareSettings::default().with_case_insensitive(true);
        let doc = parse("<document><body><p><r><t>Fox</t></r></p></body></document>").unwrap();
        let mut ctx = CompareContext::new(&settings);
        let tree = normalize(&doc, &mut ctx).unwrap();
        let body = tree.block_container().unwrap();
        let p = tree.doc.element_children(body).next().unwrap();
        let atoms = atomize_paragraph(&tree, p, &settings);
        assert_eq!(atoms[0].key(), "fox");
        assert_eq!(atoms[0].text(), "Fox");
    }
}
