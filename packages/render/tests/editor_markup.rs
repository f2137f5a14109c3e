//! The pass reads back the alignment the markup printer writes.

use folio_markup::{serialize, Alignment, Block, Document, Image, Inline};
use folio_render::*;

fn document_with(alignment: Alignment) -> String {
    let image = Image::new("https://cdn.example.com/a.png", "A")
        .with_alignment(alignment)
        .with_size(Some(320), None);
    serialize(&Document::from_blocks(vec![
        Block::paragraph(vec![Inline::text("intro")]),
        Block::paragraph(vec![Inline::Image(image)]),
    ]))
}

#[test]
fn test_printed_alignment_survives_render() {
    for (alignment, class) in [
        (Alignment::Left, "align-left"),
        (Alignment::Center, "align-center"),
        (Alignment::Right, "align-right"),
    ] {
        let rendered = render_rich_content(&document_with(alignment));
        assert!(rendered.contains(class), "{alignment:?}: {rendered}");
        assert!(rendered.contains("display: block;"));
        assert!(rendered.contains("width: 320px;"));
    }
}

#[test]
fn test_unaligned_images_render_left() {
    let rendered = render_rich_content(&document_with(Alignment::None));
    assert!(rendered.contains(r#"class="align-left""#), "{rendered}");
}

#[test]
fn test_render_is_idempotent() {
    let once = render_rich_content(&document_with(Alignment::Right));
    let twice = render_rich_content(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_rendered_markup_parses_back_to_same_alignment() {
    let rendered = render_rich_content(&document_with(Alignment::Center));
    let doc = folio_markup::parse(&rendered);
    let images = doc.images();
    assert_eq!(images[0].alignment, Alignment::Center);
    assert_eq!(images[0].style.get("display"), Some("block"));
}

#[test]
fn test_classification_totality() {
    let samples = ["", "0px auto", "0px 0px 0px auto", "0px 0px 0px 0px", "auto 0px", "5px", "calc(1px) auto", ";"];
    for sample in samples {
        let hint = classify_margin(Some(sample));
        assert!(matches!(hint, AlignmentHint::Left | AlignmentHint::Center | AlignmentHint::Right));
    }
    assert_eq!(classify_margin(Some("0px auto")), AlignmentHint::Center);
    assert_eq!(classify_margin(Some("0px 0px 0px auto")), AlignmentHint::Right);
    assert_eq!(classify_margin(Some("0px 0px 0px 0px")), AlignmentHint::Left);
}

#[test]
fn test_report_serializes_for_tooling() {
    let (_, report) = AlignmentPass::default().render_page(&format!(
        r#"<article class="rich-content">{}</article>"#,
        document_with(Alignment::Left)
    ));
    let value = serde_json::to_value(report).unwrap();
    assert_eq!(value["containers"], 1);
    assert_eq!(value["images"], 1);
}
