//! Integration tests for the editor crate

use folio_editor::{
    BlockKind, Editor, EditorConfig, MediaFile, MemoryMediaStore, NodePath, Position, Selection,
    SourceModeController, UploadEvent, UploadPipeline,
};
use folio_markup::{parse, parse_with_diagnostics, Alignment, Attributes, Block, Mark};
use tokio::sync::{mpsc, Mutex};

fn compact() -> EditorConfig {
    EditorConfig {
        pretty_markup: false,
        ..EditorConfig::default()
    }
}

fn select(editor: &mut Editor, block: usize, from: usize, to: usize) -> anyhow::Result<()> {
    editor.set_selection(Selection::new(
        Position::new(NodePath::block(block), from),
        Position::new(NodePath::block(block), to),
    ))?;
    Ok(())
}

/// Documents built through commands survive print then parse
#[test]
fn test_editor_documents_round_trip() -> anyhow::Result<()> {
    let mut editor = Editor::new(compact());

    editor.insert_text("Release notes")?;
    editor.set_block_type(BlockKind::Heading { level: 2 }, Attributes::new())?;

    editor.insert_table(2, 2)?;
    editor.insert_text("cell & <more>")?;
    editor.toggle_header_row()?;
    editor.add_column_after()?;

    select(&mut editor, 0, 0, 7)?;
    editor.toggle_mark(Mark::Italic)?;
    select(&mut editor, 0, 13, 13)?;
    editor.insert_image("https://cdn.example.com/chart.png", "Chart \"Q3\"", Alignment::Right)?;

    let markup = editor.get_markup();
    let parsed = parse_with_diagnostics(&markup);
    assert!(parsed.is_lossless(), "{:?}", parsed.errors);
    assert_eq!(&parsed.document, editor.document());

    let mut reloaded = Editor::new(compact());
    reloaded.set_markup(&markup);
    assert_eq!(reloaded.document(), editor.document());
    Ok(())
}

#[test]
fn test_delete_last_row_of_one_row_table() -> anyhow::Result<()> {
    let mut editor = Editor::with_markup("<p>intro</p>", compact());
    editor.insert_table(1, 3)?;
    assert!(editor.delete_row()?);
    assert_eq!(editor.get_markup(), "<p>intro</p>");
    Ok(())
}

#[test]
fn test_delete_last_column_removes_table() -> anyhow::Result<()> {
    let mut editor = Editor::with_markup("<p>intro</p>", compact());
    editor.insert_table(2, 1)?;
    assert!(editor.delete_column()?);
    assert_eq!(editor.get_markup(), "<p>intro</p>");

    // No table left to act on
    assert!(!editor.delete_column()?);
    Ok(())
}

#[test]
fn test_column_delete_on_zero_column_table_is_noop() -> anyhow::Result<()> {
    let mut editor = Editor::with_markup("<table><tr></tr></table><p>x</p>", compact());
    let before = editor.get_markup();
    assert!(!editor.select_cell(&NodePath::block(0), 0, 0));
    assert!(!editor.delete_column()?);
    assert_eq!(editor.get_markup(), before);
    Ok(())
}

#[test]
fn test_header_toggle_keeps_content() -> anyhow::Result<()> {
    let mut editor = Editor::new(compact());
    editor.insert_table(2, 2)?;
    editor.insert_text("kept")?;
    editor.toggle_header_column()?;

    let Block::Table(table) = &editor.document().blocks[1] else {
        anyhow::bail!("expected a table");
    };
    assert!(table.is_header_column(0));
    assert!(!table.is_header_column(1));
    assert_eq!(table.rows[0].cells[0].blocks[0].content().map(|c| c.len()), Some(1));
    Ok(())
}

#[test]
fn test_undo_walks_back_through_commands() -> anyhow::Result<()> {
    let mut editor = Editor::with_markup("<p>one</p>", compact());
    editor.set_block_type(BlockKind::Blockquote, Attributes::new())?;
    editor.set_block_type(BlockKind::BulletList, Attributes::new())?;
    assert_eq!(
        editor.get_markup(),
        "<blockquote><ul><li><p>one</p></li></ul></blockquote>"
    );

    assert!(editor.undo());
    assert_eq!(editor.get_markup(), "<blockquote><p>one</p></blockquote>");
    assert!(editor.undo());
    assert_eq!(editor.get_markup(), "<p>one</p>");
    assert!(!editor.can_undo());
    assert!(editor.can_redo());
    Ok(())
}

/// source → visual → source returns the original markup
#[test]
fn test_mode_switch_fidelity() -> anyhow::Result<()> {
    let original = "<h1>Title</h1>\n<p>Body with <strong>bold</strong> and <a href=\"/x\">link</a></p>\n<hr>";
    let mut controller = SourceModeController::new(Editor::new(EditorConfig::default()));

    controller.enter_source();
    controller.set_source(original)?;
    let recoveries = controller.exit_source()?;
    assert!(recoveries.is_empty());

    let buffer = controller.enter_source().to_string();
    let squash = |s: &str| s.split_whitespace().collect::<String>();
    assert_eq!(squash(&buffer), squash(original));
    Ok(())
}

#[test]
fn test_structured_and_source_edits_notify_same_value() -> anyhow::Result<()> {
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::<String>::new()));

    let mut editor = Editor::with_markup("<p>a</p>", compact());
    let sink = seen.clone();
    editor.on_change(move |markup| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(markup.to_string());
        }
    });
    editor.insert_text("b")?;

    let mut controller = SourceModeController::new(editor);
    controller.enter_source();
    controller.set_source("<p>b<b>a</b></p>")?;
    controller.exit_source()?;

    let seen = seen.lock().map_err(|_| anyhow::anyhow!("poisoned"))?.clone();
    assert_eq!(
        seen,
        vec!["<p>ba</p>", "<p>b<strong>a</strong></p>", "<p>b<strong>a</strong></p>"]
    );
    Ok(())
}

/// Two sequential uploads each reach 100% and both images land
#[tokio::test]
async fn test_sequential_uploads_track_progress_independently() -> anyhow::Result<()> {
    let editor = Mutex::new(Editor::with_markup("<p>text</p>", compact()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = UploadPipeline::new(MemoryMediaStore::new("https://cdn.example.com"), "posts").with_events(tx);

    let first = pipeline
        .upload(&editor, MediaFile::new("one.png", "image/png", vec![1]), "one")
        .await?;
    let second = pipeline
        .upload(&editor, MediaFile::new("two.png", "image/png", vec![2]), "two")
        .await?;
    drop(pipeline);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    for id in [1, 2] {
        let progress: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                UploadEvent::Progress { id: task, percent } if *task == id => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(progress.last(), Some(&100), "task {id}: {progress:?}");
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
    }

    let doc = parse(&editor.lock().await.get_markup());
    let sources: Vec<&str> = doc.images().into_iter().map(|image| image.src.as_str()).collect();
    assert_eq!(sources.len(), 2);
    assert!(sources.contains(&first.as_str()));
    assert!(sources.contains(&second.as_str()));
    Ok(())
}

#[tokio::test]
async fn test_upload_into_source_mode_lands_in_buffer() -> anyhow::Result<()> {
    let controller = Mutex::new(SourceModeController::new(Editor::with_markup("<p>x</p>", compact())));
    controller.lock().await.enter_source();

    let pipeline = UploadPipeline::new(MemoryMediaStore::new("https://cdn.example.com"), "posts");
    pipeline
        .upload(&controller, MediaFile::new("a.png", "image/png", vec![]), "")
        .await?;

    let mut controller = controller.into_inner();
    assert!(controller.source().is_some_and(|s| s.contains("posts/a.png")));
    controller.exit_source()?;
    assert_eq!(controller.editor().document().images().len(), 1);
    Ok(())
}
