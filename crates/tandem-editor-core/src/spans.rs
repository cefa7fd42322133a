//! Translatable span annotations.
//!
//! A translatable span is an entity of kind [`AnnotationKind::Translatable`]
//! covering a contiguous range. Toggling decides between apply and remove by
//! looking only at the entity under the selection start.

use smol_str::SmolStr;
use tracing::debug;

use crate::annotation::{AnnotationKind, EntityKey, Mutability};
use crate::document::RichTextDocument;
use crate::error::EditorError;
use crate::types::{BlockKey, DocPosition, Selection, SpanRange};

/// What a toggle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleAction {
    /// A new translatable entity now covers the selection.
    Applied(EntityKey),
    /// Entity coverage was detached from the selection.
    Removed,
}

/// Result of a toggle: the new document and the action taken.
#[derive(Clone, Debug)]
pub struct Toggled<D> {
    pub document: D,
    pub action: ToggleAction,
}

/// A rendered translatable span and its literal text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatableSpan {
    pub entity: EntityKey,
    pub block: BlockKey,
    pub range: SpanRange,
    pub text: SmolStr,
}

/// Toggle translatable coverage over a non-collapsed selection.
///
/// If the character at the selection start carries a translatable entity,
/// all entity coverage is removed from exactly the selected range (text is
/// kept). Otherwise one new mutable translatable entity is created and
/// applied to exactly that range. Mixed coverage inside the selection is
/// treated uniformly by the start state, which can leave partial coverage
/// behind.
pub fn toggle_translatable<D>(doc: &D, selection: &Selection) -> Result<Toggled<D>, EditorError>
where
    D: RichTextDocument + Clone,
{
    if selection.is_collapsed() {
        return Err(EditorError::CollapsedSelection);
    }
    if !doc.contains_block(&selection.start.block) {
        return Err(EditorError::UnknownBlock(selection.start.block.clone()));
    }

    let already_marked = doc
        .annotation_kind_at(&selection.start)
        .is_some_and(AnnotationKind::is_translatable);

    let mut next = doc.clone();
    let action = if already_marked {
        next.apply_entity(selection, None)?;
        ToggleAction::Removed
    } else {
        let entity = next.create_entity(AnnotationKind::Translatable, Mutability::Mutable);
        next.apply_entity(selection, Some(entity))?;
        ToggleAction::Applied(entity)
    };

    debug!(
        target: "tandem::spans",
        start_block = %selection.start.block,
        start = selection.start.offset,
        end_block = %selection.end.block,
        end = selection.end.offset,
        ?action,
        "toggled translatable span"
    );
    Ok(Toggled {
        document: next,
        action,
    })
}

/// All translatable spans in a block, in order.
pub fn translatable_spans<D: RichTextDocument>(doc: &D, block: &BlockKey) -> Vec<TranslatableSpan> {
    let Some(text) = doc.block_text(block) else {
        return Vec::new();
    };
    doc.annotations(block)
        .into_iter()
        .filter(|a| a.kind.is_translatable())
        .map(|a| TranslatableSpan {
            entity: a.entity,
            block: a.block,
            range: a.range,
            text: slice_chars(text, a.range),
        })
        .collect()
}

/// Resolve the translatable span under a position (hover target).
pub fn span_at<D: RichTextDocument>(doc: &D, position: &DocPosition) -> Option<TranslatableSpan> {
    translatable_spans(doc, &position.block)
        .into_iter()
        .find(|span| span.range.contains(position.offset))
}

fn slice_chars(text: &str, range: SpanRange) -> SmolStr {
    text.chars()
        .skip(range.start)
        .take(range.len())
        .collect::<String>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn block_key(doc: &Document, idx: usize) -> BlockKey {
        doc.block_at(idx).unwrap().key().clone()
    }

    #[test]
    fn test_toggle_applies_to_exact_range() {
        let doc = Document::from_paragraphs(&["say hello world now"]);
        let key = block_key(&doc, 0);
        let sel = Selection::within(key.clone(), 4..15);

        let toggled = toggle_translatable(&doc, &sel).unwrap();
        assert!(matches!(toggled.action, ToggleAction::Applied(_)));

        let spans = translatable_spans(&toggled.document, &key);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].range, SpanRange::new(4, 15));
        assert_eq!(spans[0].text, "hello world");

        // The input document is untouched.
        assert!(translatable_spans(&doc, &key).is_empty());
    }

    #[test]
    fn test_toggle_twice_restores_coverage() {
        let doc = Document::from_paragraphs(&["hello world"]);
        let key = block_key(&doc, 0);
        let sel = Selection::within(key.clone(), 0..5);

        let once = toggle_translatable(&doc, &sel).unwrap();
        let twice = toggle_translatable(&once.document, &sel).unwrap();

        assert_eq!(twice.action, ToggleAction::Removed);
        assert_eq!(twice.document.annotations(&key), doc.annotations(&key));
        assert_eq!(twice.document.block_text(&key), Some("hello world"));
    }

    #[test]
    fn test_collapsed_selection_rejected() {
        let doc = Document::from_paragraphs(&["hello"]);
        let key = block_key(&doc, 0);
        let sel = Selection::collapsed(DocPosition::new(key, 2));
        assert_eq!(
            toggle_translatable(&doc, &sel).unwrap_err(),
            EditorError::CollapsedSelection
        );
    }

    #[test]
    fn test_start_state_decides_for_mixed_selection() {
        let doc = Document::from_paragraphs(&["abcdefgh"]);
        let key = block_key(&doc, 0);

        // Mark "cdef".
        let marked = toggle_translatable(&doc, &Selection::within(key.clone(), 2..6))
            .unwrap()
            .document;

        // Start at 'a' (unmarked): applies a fresh entity over "abcd".
        let applied = toggle_translatable(&marked, &Selection::within(key.clone(), 0..4)).unwrap();
        assert!(matches!(applied.action, ToggleAction::Applied(_)));
        let ranges: Vec<SpanRange> = translatable_spans(&applied.document, &key)
            .into_iter()
            .map(|s| s.range)
            .collect();
        assert_eq!(ranges, vec![SpanRange::new(0, 4), SpanRange::new(4, 6)]);

        // Start at 'e' (marked): removes over "efgh", leaving "cd" covered.
        let removed = toggle_translatable(&marked, &Selection::within(key.clone(), 4..8)).unwrap();
        assert_eq!(removed.action, ToggleAction::Removed);
        let spans = translatable_spans(&removed.document, &key);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "cd");
    }

    #[test]
    fn test_other_kinds_are_not_translatable_spans() {
        let mut doc = Document::from_paragraphs(&["link here"]);
        let key = block_key(&doc, 0);
        let link = doc.create_entity(AnnotationKind::Other("LINK".into()), Mutability::Mutable);
        doc.apply_entity(&Selection::within(key.clone(), 0..4), Some(link))
            .unwrap();
        assert!(translatable_spans(&doc, &key).is_empty());

        // Starting on a non-translatable entity applies, replacing it.
        let toggled = toggle_translatable(&doc, &Selection::within(key.clone(), 0..4)).unwrap();
        assert!(matches!(toggled.action, ToggleAction::Applied(_)));
        assert_eq!(translatable_spans(&toggled.document, &key)[0].text, "link");
    }

    #[test]
    fn test_span_at_resolves_hover_target() {
        let doc = Document::from_paragraphs(&["héllo wörld"]);
        let key = block_key(&doc, 0);
        let doc = toggle_translatable(&doc, &Selection::within(key.clone(), 6..11))
            .unwrap()
            .document;

        let span = span_at(&doc, &DocPosition::new(key.clone(), 8)).unwrap();
        assert_eq!(span.text, "wörld");
        assert!(span_at(&doc, &DocPosition::new(key, 2)).is_none());
    }
}
