//! Lenient HTML-flavoured markup reader
//!
//! Built on quick-xml's event reader with end-name checking disabled, so the
//! shapes spreadsheet exports produce (unquoted attributes, `<br>`, unclosed
//! cells) still load. Text is kept in its escaped form.

use std::borrow::Cow;

use phf::phf_set;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::tree::{Document, Element, NodeId, NodeKind, TagForm};
use crate::utils::error::MarkupError;

/// Elements that never take children or an end tag
static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
};

/// Elements that bound implicit closing of cells and rows
static TABLE_SCOPES: phf::Set<&'static str> = phf_set! {
    "table", "thead", "tbody", "tfoot",
};

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

fn utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse `markup` and append the resulting nodes under `parent`
pub(crate) fn parse_into(
    doc: &mut Document,
    parent: NodeId,
    markup: &str,
) -> Result<(), MarkupError> {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);
    reader.check_end_names(false);
    reader.expand_empty_elements(false);

    // Open elements; the bottom entry is the insertion root and is never popped
    let mut stack: Vec<NodeId> = vec![parent];

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| MarkupError::new(e.to_string(), position))?;

        match event {
            Event::Start(start) => {
                let element = read_element(&start, position)?;
                close_implicitly(doc, &mut stack, &element);
                let current = *stack.last().unwrap_or(&parent);
                if is_void(&element.name) {
                    let element = Element {
                        form: TagForm::Void,
                        ..element
                    };
                    doc.append(current, NodeKind::Element(element));
                } else {
                    let id = doc.append(current, NodeKind::Element(element));
                    stack.push(id);
                }
            }
            Event::Empty(start) => {
                let element = Element {
                    form: TagForm::SelfClosing,
                    ..read_element(&start, position)?
                };
                close_implicitly(doc, &mut stack, &element);
                let current = *stack.last().unwrap_or(&parent);
                doc.append(current, NodeKind::Element(element));
            }
            Event::End(end) => {
                let name = utf8(end.name().as_ref());
                if is_void(&name) {
                    continue;
                }
                // Close the nearest matching open element; stray end tags are dropped
                if let Some(depth) = stack
                    .iter()
                    .skip(1)
                    .rposition(|&id| doc.is_element(id, &name))
                {
                    stack.truncate(depth + 1);
                }
            }
            Event::Text(text) => {
                let current = *stack.last().unwrap_or(&parent);
                doc.append(current, NodeKind::Text(utf8(&text.into_inner())));
            }
            Event::Comment(text) => {
                let current = *stack.last().unwrap_or(&parent);
                doc.append(current, NodeKind::Comment(utf8(&text.into_inner())));
            }
            Event::CData(data) => {
                let current = *stack.last().unwrap_or(&parent);
                let raw = format!("<![CDATA[{}]]>", utf8(&data.into_inner()));
                doc.append(current, NodeKind::Raw(raw));
            }
            Event::Decl(decl) => {
                let current = *stack.last().unwrap_or(&parent);
                let raw = format!("<?{}?>", utf8(&decl));
                doc.append(current, NodeKind::Raw(raw));
            }
            Event::PI(pi) => {
                let current = *stack.last().unwrap_or(&parent);
                let raw = format!("<?{}?>", utf8(&pi.into_inner()));
                doc.append(current, NodeKind::Raw(raw));
            }
            Event::DocType(doctype) => {
                let current = *stack.last().unwrap_or(&parent);
                let raw = format!("<!DOCTYPE {}>", utf8(&doctype.into_inner()));
                doc.append(current, NodeKind::Raw(raw));
            }
            Event::Eof => break,
        }
    }

    Ok(())
}

fn read_element(start: &BytesStart<'_>, position: usize) -> Result<Element, MarkupError> {
    let mut element = Element::new(utf8(start.name().as_ref()));
    for attr in start.html_attributes() {
        let attr = attr.map_err(|e| MarkupError::new(e.to_string(), position))?;
        let value: Cow<'_, [u8]> = attr.value;
        element
            .attrs
            .insert(utf8(attr.key.as_ref()), utf8(&value));
    }
    Ok(element)
}

/// Apply the table-specific implicit end tags of HTML
///
/// A new cell closes an open cell of the same row; a new row closes an open
/// row of the same table. Nothing is closed past a table boundary.
fn close_implicitly(doc: &Document, stack: &mut Vec<NodeId>, incoming: &Element) {
    let closes: &[&str] = if incoming.is_cell() {
        &["td", "th"]
    } else if incoming.is("tr") {
        &["tr"]
    } else {
        return;
    };

    for depth in (1..stack.len()).rev() {
        let Some(open) = doc.element(stack[depth]) else {
            continue;
        };
        if closes.iter().any(|tag| open.is(tag)) {
            stack.truncate(depth);
            return;
        }
        if TABLE_SCOPES.contains(open.name.to_ascii_lowercase().as_str())
            || (incoming.is_cell() && open.is("tr"))
        {
            return;
        }
    }
}
