//! Arena-backed markup tree
//!
//! Nodes are never freed: a detached node keeps its handle valid, which lets
//! callers notice that an element they hold has left the tree instead of
//! dereferencing a dangling index.

use indexmap::IndexMap;

use super::parser;
use crate::utils::error::MarkupError;

/// Opaque handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Arena index of this node
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Rebuild a handle from a raw index (e.g. a `data-cell` value)
    pub fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// How an element's tags were written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagForm {
    /// `<p>...</p>`
    Normal,
    /// `<br>` with no end tag
    Void,
    /// `<br/>`
    SelfClosing,
}

/// An element: tag name plus ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: IndexMap<String, String>,
    pub form: TagForm,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: IndexMap::new(),
            form: TagForm::Normal,
        }
    }

    /// Case-insensitive tag name check
    pub fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }

    /// Whether this is a `td` or `th`
    pub fn is_cell(&self) -> bool {
        self.is("td") || self.is("th")
    }

    /// Case-insensitive attribute lookup
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic document root
    Root,
    Element(Element),
    /// Text in its escaped source form
    Text(String),
    Comment(String),
    /// Doctype, declarations, CDATA: written back verbatim
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed markup document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            revision: 0,
        }
    }

    /// Parse a markup string
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let mut doc = Document::new();
        let root = doc.root();
        parser::parse_into(&mut doc, root, markup)?;
        doc.revision = 0;
        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Structural revision; bumps on every detach, attribute change and child replacement
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.index()).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.index()).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Whether `id` is an element with the given tag name
    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.element(id).is_some_and(|el| el.is(tag))
    }

    /// Whether `id` is a `td`/`th` element
    pub fn is_cell(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(Element::is_cell)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    /// Whether the node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root()
    }

    /// Ancestors from the parent upward
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Pre-order descendants of `id`, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Push a new node as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(p) = self.nodes.get_mut(parent.index()) {
            p.children.push(id);
        }
        id
    }

    /// Remove `id` from its parent; the handle stays valid but detached
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent.index()) {
            p.children.retain(|&c| c != id);
        }
        if let Some(n) = self.nodes.get_mut(id.index()) {
            n.parent = None;
        }
        self.bump();
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Set an attribute, replacing an existing one of the same name (case-insensitive)
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let existing = el
            .attrs
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned();
        match existing {
            Some(key) => {
                el.attrs.insert(key, value);
            }
            None => {
                el.attrs.insert(name.to_string(), value);
            }
        }
        self.bump();
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let el = self.element_mut(id)?;
        let key = el
            .attrs
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()?;
        let removed = el.attrs.shift_remove(&key);
        self.bump();
        removed
    }

    /// Concatenated text of all descendant text nodes, in source (escaped) form
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(text)) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// The only child of `id` when it is a text node
    pub fn single_text_child(&self, id: NodeId) -> Option<(NodeId, &str)> {
        match self.children(id) {
            [only] => match self.kind(*only) {
                Some(NodeKind::Text(text)) => Some((*only, text.as_str())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Replace the contents of a text node
    pub fn replace_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(Node {
            kind: NodeKind::Text(existing),
            ..
        }) = self.nodes.get_mut(id.index())
        {
            *existing = text.into();
        }
    }

    /// Serialized children of `id`
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(&mut out, child, &|_| Vec::new());
        }
        out
    }

    /// Replace the children of `id` with a parsed fragment
    pub fn set_inner_markup(&mut self, id: NodeId, markup: &str) -> Result<(), MarkupError> {
        let fragment = Document::parse(markup)?;
        self.replace_children(id, &fragment);
        Ok(())
    }

    /// Replace the children of `id` with copies of the top-level nodes of `fragment`
    pub fn replace_children(&mut self, id: NodeId, fragment: &Document) {
        self.replace_children_from(id, fragment, fragment.root());
    }

    /// Replace the children of `id` with copies of the children of `from` in `source`
    pub fn replace_children_from(&mut self, id: NodeId, source: &Document, from: NodeId) {
        self.clear_children(id);
        for &child in source.children(from) {
            self.import(source, child, id);
        }
        self.bump();
    }

    /// Replace the children of `id` with a single text node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.clear_children(id);
        self.append(id, NodeKind::Text(text.into()));
        self.bump();
    }

    fn clear_children(&mut self, id: NodeId) {
        let old = match self.nodes.get_mut(id.index()) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in old {
            if let Some(n) = self.nodes.get_mut(child.index()) {
                n.parent = None;
            }
        }
    }

    fn import(&mut self, source: &Document, node: NodeId, parent: NodeId) {
        let Some(kind) = source.kind(node) else {
            return;
        };
        let copy = self.append(parent, kind.clone());
        for &child in source.children(node) {
            self.import(source, child, copy);
        }
    }

    /// Nearest enclosing `td`/`th`, including `id` itself
    pub fn enclosing_cell(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| self.is_cell(n))
    }

    /// Nearest enclosing `table`, excluding `id` itself
    pub fn enclosing_table(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|&n| self.is_element(n, "table"))
    }

    /// Outermost `table` elements in document order
    pub fn tables(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&n| self.is_element(n, "table") && self.enclosing_table(n).is_none())
            .collect()
    }

    /// `tr` elements owned by `table` (directly or through a row group), excluding nested tables
    pub fn rows_of(&self, table: NodeId) -> Vec<NodeId> {
        let mut rows = Vec::new();
        for &child in self.children(table) {
            if self.is_element(child, "tr") {
                rows.push(child);
            } else if ["thead", "tbody", "tfoot"]
                .iter()
                .any(|tag| self.is_element(child, tag))
            {
                rows.extend(
                    self.children(child)
                        .iter()
                        .copied()
                        .filter(|&r| self.is_element(r, "tr")),
                );
            }
        }
        rows
    }

    /// `td`/`th` children of a row
    pub fn cells_of(&self, row: NodeId) -> Vec<NodeId> {
        self.children(row)
            .iter()
            .copied()
            .filter(|&c| self.is_cell(c))
            .collect()
    }

    /// Every attached `td`/`th` in the document
    pub fn all_cells(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&n| self.is_cell(n))
            .collect()
    }

    /// Serialize the whole document
    pub fn to_markup(&self) -> String {
        self.to_markup_with(&|_| Vec::new())
    }

    /// Serialize, appending presentation attributes returned by `decorate`
    ///
    /// A decorated `class` is joined to an existing class value; any other
    /// decorated attribute overrides the stored one.
    pub fn to_markup_with(&self, decorate: &dyn Fn(NodeId) -> Vec<(String, String)>) -> String {
        let mut out = String::new();
        for &child in self.children(self.root()) {
            self.write_node(&mut out, child, decorate);
        }
        out
    }

    fn write_node(
        &self,
        out: &mut String,
        id: NodeId,
        decorate: &dyn Fn(NodeId) -> Vec<(String, String)>,
    ) {
        match self.kind(id) {
            Some(NodeKind::Element(el)) => {
                out.push('<');
                out.push_str(&el.name);
                let extra = decorate(id);
                let mut attrs = el.attrs.clone();
                for (key, value) in extra {
                    let existing = attrs
                        .keys()
                        .find(|k| k.eq_ignore_ascii_case(&key))
                        .cloned();
                    match existing {
                        Some(k) if key.eq_ignore_ascii_case("class") => {
                            if let Some(current) = attrs.get_mut(&k) {
                                if current.is_empty() {
                                    *current = value;
                                } else {
                                    current.push(' ');
                                    current.push_str(&value);
                                }
                            }
                        }
                        Some(k) => {
                            attrs.insert(k, value);
                        }
                        None => {
                            attrs.insert(key, value);
                        }
                    }
                }
                for (key, value) in &attrs {
                    write_attribute(out, key, value);
                }
                let children = self.children(id);
                match el.form {
                    TagForm::SelfClosing if children.is_empty() => out.push_str("/>"),
                    TagForm::Void if children.is_empty() => out.push('>'),
                    _ => {
                        out.push('>');
                        for &child in children {
                            self.write_node(out, child, decorate);
                        }
                        out.push_str("</");
                        out.push_str(&el.name);
                        out.push('>');
                    }
                }
            }
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Comment(text)) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Some(NodeKind::Raw(text)) => out.push_str(text),
            Some(NodeKind::Root) => {
                for &child in self.children(id) {
                    self.write_node(out, child, decorate);
                }
            }
            None => {}
        }
    }
}

fn write_attribute(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push('=');
    let quote = if value.contains('"') && !value.contains('\'') {
        '\''
    } else {
        '"'
    };
    out.push(quote);
    if quote == '"' {
        out.push_str(&value.replace('"', "&quot;"));
    } else {
        out.push_str(value);
    }
    out.push(quote);
}
