//! In-memory element tree the loader binds URLs onto.
//!
//! Only what asset loading needs: tags, attributes, parent/child links and
//! a `<head>`/`<body>` pair. Text content is dropped on parse.

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("invalid HTML: {0}")]
    Parse(String),
}

/// Handle of an element inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

/// What kind of asset an element renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Image,
    Script,
    Stylesheet,
    Other,
}

impl ElementKind {
    /// Attribute carrying the element's URL.
    pub const fn source_attr(self) -> &'static str {
        match self {
            Self::Stylesheet => "href",
            _ => "src",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Script => "script",
            Self::Stylesheet => "css",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn kind(&self) -> ElementKind {
        match self.tag.as_str() {
            "img" => ElementKind::Image,
            "script" => ElementKind::Script,
            "link"
                if self
                    .attr("rel")
                    .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet")) =>
            {
                ElementKind::Stylesheet
            }
            _ => ElementKind::Other,
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
    root: ElementId,
    head: ElementId,
    body: ElementId,
}

impl Tree {
    fn with_root() -> Self {
        let root = ElementId(0);
        Self {
            nodes: vec![Node::new("#document")],
            root,
            head: root,
            body: root,
        }
    }

    fn push(&mut self, node: Node) -> ElementId {
        self.nodes.push(node);
        ElementId(self.nodes.len() - 1)
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn append(&mut self, parent: ElementId, child: ElementId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        // Moving an attached element detaches it first
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Preorder descendants of `scope`, excluding it.
    fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let Some(node) = self.node(scope) else {
            return out;
        };
        let mut stack: Vec<ElementId> = node.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    fn find_tag(&self, scope: ElementId, tag: &str) -> Option<ElementId> {
        self.descendants(scope)
            .into_iter()
            .find(|id| self.nodes[id.0].tag == tag)
    }

    fn import(&mut self, handle: tl::NodeHandle, parser: &tl::Parser, parent: ElementId) {
        let Some(tl::Node::Tag(tag)) = handle.get(parser) else {
            return;
        };
        let name = tag.name().as_utf8_str();
        // <!DOCTYPE ...>
        if name.starts_with('!') {
            return;
        }

        let mut node = Node::new(&name);
        for (key, value) in tag.attributes().iter() {
            let value = value.map(|v| v.to_string()).unwrap_or_default();
            node.attrs.push((key.to_ascii_lowercase(), value));
        }

        let id = self.push(node);
        self.append(parent, id);
        for child in tag.children().top().iter() {
            self.import(*child, parser, id);
        }
    }
}

/// Mutable element tree shared between concurrent loads.
#[derive(Debug)]
pub struct Document {
    tree: RwLock<Tree>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with `<head>` and `<body>`.
    pub fn new() -> Self {
        let mut tree = Tree::with_root();
        let head = tree.push(Node::new("head"));
        let body = tree.push(Node::new("body"));
        tree.append(tree.root, head);
        tree.append(tree.root, body);
        tree.head = head;
        tree.body = body;
        Self {
            tree: RwLock::new(tree),
        }
    }

    /// Parse HTML, creating `<head>`/`<body>` when the markup has none.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let dom = tl::parse(html, tl::ParserOptions::default())
            .map_err(|err| DomError::Parse(format!("{err:?}")))?;
        let parser = dom.parser();

        let mut tree = Tree::with_root();
        let root = tree.root;
        for handle in dom.children() {
            tree.import(*handle, parser, root);
        }

        let container = tree.find_tag(root, "html").unwrap_or(root);
        tree.head = match tree.find_tag(root, "head") {
            Some(head) => head,
            None => {
                let head = tree.push(Node::new("head"));
                tree.append(container, head);
                head
            }
        };
        tree.body = match tree.find_tag(root, "body") {
            Some(body) => body,
            None => {
                let body = tree.push(Node::new("body"));
                tree.append(container, body);
                body
            }
        };

        Ok(Self {
            tree: RwLock::new(tree),
        })
    }

    #[cfg(test)]
    pub fn root(&self) -> ElementId {
        self.tree.read().root
    }

    #[cfg(test)]
    pub fn head(&self) -> ElementId {
        self.tree.read().head
    }

    pub fn body(&self) -> ElementId {
        self.tree.read().body
    }

    /// New detached element.
    pub fn create_element(&self, tag: &str) -> ElementId {
        self.tree.write().push(Node::new(tag))
    }

    #[cfg(test)]
    /// Append `child` to `parent`, moving it if already attached elsewhere.
    pub fn append_child(&self, parent: ElementId, child: ElementId) {
        self.tree.write().append(parent, child);
    }

    pub fn append_to_head(&self, child: ElementId) {
        let mut tree = self.tree.write();
        let head = tree.head;
        tree.append(head, child);
    }

    pub fn set_attr(&self, id: ElementId, name: &str, value: &str) {
        let mut tree = self.tree.write();
        let Some(node) = tree.nodes.get_mut(id.0) else {
            return;
        };
        match node.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => node.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<String> {
        self.tree
            .read()
            .node(id)
            .and_then(|node| node.attr(name))
            .map(str::to_string)
    }

    #[cfg(test)]
    pub fn tag(&self, id: ElementId) -> Option<String> {
        self.tree.read().node(id).map(|node| node.tag.clone())
    }

    pub fn kind(&self, id: ElementId) -> ElementKind {
        self.tree
            .read()
            .node(id)
            .map_or(ElementKind::Other, Node::kind)
    }

    /// Point the element at `url` through its kind's source attribute.
    pub fn set_source(&self, id: ElementId, url: &str) {
        let attr = self.kind(id).source_attr();
        self.set_attr(id, attr, url);
    }

    /// Current URL of the element (`src`, or `href` for stylesheets).
    pub fn source(&self, id: ElementId) -> Option<String> {
        self.attr(id, self.kind(id).source_attr())
    }

    #[cfg(test)]
    /// Whether the element is reachable from the document root.
    pub fn is_attached(&self, id: ElementId) -> bool {
        let tree = self.tree.read();
        let mut current = Some(id);
        while let Some(cursor) = current {
            if cursor == tree.root {
                return true;
            }
            current = tree.node(cursor).and_then(|node| node.parent);
        }
        false
    }

    /// Attached elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<ElementId> {
        let tree = self.tree.read();
        tree.descendants(tree.root)
            .into_iter()
            .filter(|id| tree.nodes[id.0].tag == tag)
            .collect()
    }

    /// Element by its `id` attribute.
    pub fn element_by_id(&self, value: &str) -> Option<ElementId> {
        let tree = self.tree.read();
        tree.descendants(tree.root)
            .into_iter()
            .find(|id| tree.nodes[id.0].attr("id") == Some(value))
    }

    /// `<img data-src>` descendants of `scope` with their `data-src` path.
    pub fn lazy_images(&self, scope: ElementId) -> Vec<(ElementId, String)> {
        let tree = self.tree.read();
        tree.descendants(scope)
            .into_iter()
            .filter_map(|id| {
                let node = &tree.nodes[id.0];
                if node.tag != "img" {
                    return None;
                }
                node.attr("data-src")
                    .filter(|src| !src.trim().is_empty())
                    .map(|src| (id, src.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Menu</title><link rel="stylesheet" href="/css/app.css"></head>
<body>
  <section id="gallery">
    <img data-src="/img/a.png" alt="a">
    <div><img data-src="/img/b.png"></div>
  </section>
  <img src="/img/static.png">
  <img data-src="/img/c.png">
</body>
</html>"#;

    #[test]
    fn test_parse_finds_head_and_body() {
        let doc = Document::parse(PAGE).unwrap();
        assert_eq!(doc.tag(doc.head()).as_deref(), Some("head"));
        assert_eq!(doc.tag(doc.body()).as_deref(), Some("body"));
        assert_eq!(doc.elements_by_tag("img").len(), 4);
    }

    #[test]
    fn test_lazy_images_respect_scope() {
        let doc = Document::parse(PAGE).unwrap();
        let gallery = doc.element_by_id("gallery").unwrap();

        let scoped: Vec<_> = doc.lazy_images(gallery).into_iter().map(|(_, s)| s).collect();
        assert_eq!(scoped, vec!["/img/a.png", "/img/b.png"]);
        assert_eq!(doc.lazy_images(doc.body()).len(), 3);
    }

    #[test]
    fn test_fragment_gets_head_and_body() {
        let doc = Document::parse(r#"<img data-src="/x.png">"#).unwrap();
        assert_ne!(doc.head(), doc.body());
        assert!(doc.is_attached(doc.head()));
        assert_eq!(doc.lazy_images(doc.root()).len(), 1);
    }

    #[test]
    fn test_element_kind_and_source() {
        let doc = Document::parse(PAGE).unwrap();
        let link = doc.elements_by_tag("link")[0];
        assert_eq!(doc.kind(link), ElementKind::Stylesheet);
        assert_eq!(doc.source(link).as_deref(), Some("/css/app.css"));

        doc.set_source(link, "https://cdn.example/css/app.css");
        assert_eq!(doc.attr(link, "href").as_deref(), Some("https://cdn.example/css/app.css"));
    }

    #[test]
    fn test_append_moves_instead_of_duplicating() {
        let doc = Document::new();
        let script = doc.create_element("script");
        assert!(!doc.is_attached(script));

        doc.append_to_head(script);
        doc.append_to_head(script);
        assert!(doc.is_attached(script));
        assert_eq!(doc.elements_by_tag("script"), vec![script]);

        doc.append_child(doc.body(), script);
        assert_eq!(doc.elements_by_tag("script").len(), 1);
    }
}
