use crate::ast::*;
use crate::table::Table;

/// Options for printing markup
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Put every top-level block on its own line
    pub pretty: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

struct Context {
    options: SerializeOptions,
    buffer: String,
}

impl Context {
    fn new(options: SerializeOptions) -> Self {
        Self {
            options,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn open_tag(&mut self, name: &str, attrs: &Attributes) {
        self.add("<");
        self.add(name);
        for (key, value) in attrs.iter() {
            self.add(" ");
            self.add(key);
            self.add("=\"");
            self.add(&escape_attribute(value));
            self.add("\"");
        }
        self.add(">");
    }

    fn close_tag(&mut self, name: &str) {
        self.add("</");
        self.add(name);
        self.add(">");
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

/// Print a document as markup with default options
pub fn serialize(document: &Document) -> String {
    serialize_with(document, SerializeOptions::default())
}

/// Print a document as markup
pub fn serialize_with(document: &Document, options: SerializeOptions) -> String {
    let mut ctx = Context::new(options);

    for (index, block) in document.blocks.iter().enumerate() {
        if index > 0 && ctx.options.pretty {
            ctx.add("\n");
        }
        write_block(block, &mut ctx);
    }

    ctx.get_output()
}

fn write_block(block: &Block, ctx: &mut Context) {
    match block {
        Block::Paragraph { content, attrs } => {
            ctx.open_tag("p", attrs);
            write_inlines(content, ctx);
            ctx.close_tag("p");
        }
        Block::Heading {
            level,
            content,
            attrs,
        } => {
            let tag = format!("h{}", (*level).clamp(1, MAX_HEADING_LEVEL));
            ctx.open_tag(&tag, attrs);
            write_inlines(content, ctx);
            ctx.close_tag(&tag);
        }
        Block::BulletList { items, attrs } => write_list("ul", items, attrs, ctx),
        Block::OrderedList { items, attrs } => write_list("ol", items, attrs, ctx),
        Block::Blockquote { blocks, attrs } => {
            ctx.open_tag("blockquote", attrs);
            for block in blocks {
                write_block(block, ctx);
            }
            ctx.close_tag("blockquote");
        }
        Block::HorizontalRule { attrs } => ctx.open_tag("hr", attrs),
        Block::Table(table) => write_table(table, ctx),
        Block::Opaque { raw } => ctx.add(raw),
    }
}

fn write_list(tag: &str, items: &[ListItem], attrs: &Attributes, ctx: &mut Context) {
    ctx.open_tag(tag, attrs);
    for item in items {
        ctx.add("<li>");
        for block in &item.blocks {
            write_block(block, ctx);
        }
        ctx.add("</li>");
    }
    ctx.close_tag(tag);
}

fn write_table(table: &Table, ctx: &mut Context) {
    ctx.open_tag("table", &table.attrs);
    ctx.add("<tbody>");
    for row in &table.rows {
        ctx.add("<tr>");
        for cell in &row.cells {
            let tag = if cell.header { "th" } else { "td" };
            ctx.open_tag(tag, &cell.attrs);
            for block in &cell.blocks {
                write_block(block, ctx);
            }
            ctx.close_tag(tag);
        }
        ctx.add("</tr>");
    }
    ctx.add("</tbody>");
    ctx.close_tag("table");
}

fn write_inlines(content: &[Inline], ctx: &mut Context) {
    for inline in content {
        match inline {
            Inline::Text { text, marks } => {
                for mark in marks.iter() {
                    ctx.add("<");
                    ctx.add(mark.tag());
                    ctx.add(">");
                }
                ctx.add(&escape_text(text));
                for mark in marks.iter().rev() {
                    ctx.close_tag(mark.tag());
                }
            }
            Inline::Image(image) => ctx.open_tag("img", &image.to_attributes()),
            Inline::HardBreak => ctx.add("<br>"),
            Inline::Opaque { raw } => ctx.add(raw),
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, Alignment, Image};

    #[test]
    fn test_serialize_paragraph_with_marks() {
        let doc = Document::from_blocks(vec![Block::paragraph(vec![
            Inline::text("a "),
            Inline::marked("b", [Mark::Italic, Mark::Bold]),
        ])]);
        assert_eq!(serialize(&doc), "<p>a <strong><em>b</em></strong></p>");
    }

    #[test]
    fn test_pretty_puts_blocks_on_lines() {
        let doc = Document::from_blocks(vec![
            Block::heading(1, vec![Inline::text("T")]),
            Block::HorizontalRule {
                attrs: Attributes::new(),
            },
        ]);
        assert_eq!(serialize(&doc), "<h1>T</h1>\n<hr>");
        assert_eq!(
            serialize_with(&doc, SerializeOptions { pretty: false }),
            "<h1>T</h1><hr>"
        );
    }

    #[test]
    fn test_escaping() {
        let doc = Document::from_blocks(vec![Block::paragraph(vec![Inline::text("1 < 2 & 3")])]);
        let out = serialize(&doc);
        assert_eq!(out, "<p>1 &lt; 2 &amp; 3</p>");
        assert_eq!(parse(&out), doc);
    }

    #[test]
    fn test_image_attributes_are_derived() {
        let image = Image::new("a.png", "say \"hi\"")
            .with_alignment(Alignment::Right)
            .with_size(Some(100), Some(50));
        let doc = Document::from_blocks(vec![Block::paragraph(vec![Inline::Image(image)])]);
        assert_eq!(
            serialize(&doc),
            r#"<p><img src="a.png" alt="say &quot;hi&quot;" class="align-right" width="100" height="50" style="width: 100px; height: 50px; margin: 0px 0px 0px auto;"></p>"#
        );
    }

    #[test]
    fn test_table_round_trip() {
        let mut table = Table::new(2, 2);
        table.toggle_header_row();
        let doc = Document::from_blocks(vec![Block::Table(table)]);
        let out = serialize(&doc);
        assert!(out.starts_with("<table><tbody><tr><th><p></p></th>"));
        assert_eq!(parse(&out), doc);
    }
}
