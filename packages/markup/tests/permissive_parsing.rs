//! Arbitrary markup is accepted. Anything outside the supported node set
//! passes through verbatim, and every recovery is reported.

use folio_markup::*;

#[test]
fn test_unknown_block_passes_through_unchanged() {
    let source = r#"<p>before</p>
<figure class="wide"><img src="x.png"><figcaption>Caption</figcaption></figure>
<p>after</p>"#;

    let parsed = parse_with_diagnostics(source);
    assert!(parsed.is_lossless());

    let printed = serialize(&parsed.document);
    assert!(printed.contains(r#"<figure class="wide"><img src="x.png"><figcaption>Caption</figcaption></figure>"#));
}

#[test]
fn test_unknown_inline_passes_through_unchanged() {
    let source = r#"<p>see <a href="https://example.com?a=1&amp;b=2">the link</a> now</p>"#;
    let doc = parse(source);
    assert_eq!(serialize(&doc), source);
}

#[test]
fn test_comments_survive() {
    let source = "<!-- keep me -->\n<p>x</p>";
    assert_eq!(serialize(&parse(source)), source);
}

#[test]
fn test_garbage_never_fails() {
    let inputs = [
        "",
        "<",
        "<<<>>>",
        "</p></p></p>",
        "<p><ul><li>x</p>",
        "<table><td>orphan</td>",
        "<b><i>crossed</b></i>",
        "<li>loose</li>",
        "<p title=\"unterminated>text</p>",
        "<img",
    ];

    for input in inputs {
        let parsed = parse_with_diagnostics(input);
        // Printing the result is always stable
        let printed = serialize(&parsed.document);
        assert_eq!(serialize(&parse(&printed)), printed, "unstable for {input:?}");
    }
}

#[test]
fn test_misplaced_list_item_is_flagged() {
    let parsed = parse_with_diagnostics("<li>loose</li>");
    assert!(parsed
        .errors
        .iter()
        .any(|e| matches!(e, ParseError::MisplacedElement { name, .. } if name == "li")));
    assert_eq!(serialize(&parsed.document), "<li>loose</li>");
}

#[test]
fn test_crossed_marks_are_repaired() {
    let parsed = parse_with_diagnostics("<p><b><i>crossed</b></i></p>");
    assert_eq!(
        parsed.document.blocks[0],
        Block::paragraph(vec![Inline::marked("crossed", [Mark::Bold, Mark::Italic])])
    );
    assert!(!parsed.is_lossless());
}

#[test]
fn test_legacy_tags_are_canonicalized() {
    let doc = parse("<p><b>a</b><i>b</i><del>c</del></p>");
    assert_eq!(serialize(&doc), "<p><strong>a</strong><em>b</em><s>c</s></p>");
}

#[test]
fn test_image_style_size_is_ignored() {
    let doc = parse(r#"<p><img src="a.png" style="width: 50px" width="200"></p>"#);
    assert_eq!(
        serialize(&doc),
        r#"<p><img src="a.png" alt="" class="align-none" width="200" style="width: 200px;"></p>"#
    );
}

#[cfg(feature = "pretty-errors")]
#[test]
fn test_format_errors_mentions_element() {
    let source = "<p>unclosed";
    let parsed = parse_with_diagnostics(source);
    let report = format_errors(source, "post.html", &parsed.errors);
    assert!(report.contains("Unclosed <p>"));
}

fn nesting(blocks: &[Block]) -> usize {
    blocks
        .iter()
        .map(|block| match block {
            Block::Blockquote { blocks, .. } => 1 + nesting(blocks),
            Block::BulletList { items, .. } | Block::OrderedList { items, .. } => {
                1 + items.iter().map(|item| nesting(&item.blocks)).max().unwrap_or(0)
            }
            Block::Table(table) => {
                1 + table
                    .rows
                    .iter()
                    .flat_map(|row| &row.cells)
                    .map(|cell| nesting(&cell.blocks))
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn test_deeply_unclosed_blocks_are_kept_verbatim() {
    let source = "<blockquote>".repeat(10_000);
    let parsed = parse_with_diagnostics(&source);

    assert!(nesting(&parsed.document.blocks) <= MAX_DEPTH);
    assert!(parsed
        .errors
        .iter()
        .any(|e| matches!(e, ParseError::NestingTooDeep { name, .. } if name == "blockquote")));

    // Printing the capped tree and reading it back stays bounded too
    let reparsed = parse(&serialize(&parsed.document));
    assert!(nesting(&reparsed.blocks) <= MAX_DEPTH);
}

#[test]
fn test_deeply_balanced_blocks_round_trip() {
    let source = format!(
        "{}<p>deep</p>{}",
        "<blockquote>".repeat(10_000),
        "</blockquote>".repeat(10_000)
    );
    let doc = parse(&source);
    assert_eq!(nesting(&doc.blocks), MAX_DEPTH);
    assert_eq!(parse(&serialize(&doc)), doc);
}

#[test]
fn test_deeply_nested_marks_are_bounded() {
    let source = format!("<p>{}x</p>", "<em>".repeat(10_000));
    let parsed = parse_with_diagnostics(&source);
    assert_eq!(parsed.document.blocks.len(), 1);
    assert!(parsed
        .errors
        .iter()
        .any(|e| matches!(e, ParseError::NestingTooDeep { name, .. } if name == "em")));
}

#[test]
fn test_deeply_nested_lists_are_bounded() {
    let source = "<ul><li>".repeat(10_000);
    let doc = parse(&source);
    assert!(nesting(&doc.blocks) <= MAX_DEPTH);
}
