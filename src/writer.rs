/*!
# Encoder: document to XML text

The [`Encoder`] walks a [`Document`] depth-first and writes well-formed,
namespace-well-formed XML 1.0. All namespace declarations go onto the root
element: the root's namespace becomes the default namespace, and every
other registered namespace is declared with the prefix the document's
namespace table assigned to it.

Nothing, not even a newline, is written outside of the root element.
*/
use std::io;

use bytes::{BufMut, BytesMut};

use crate::dom::{Children, Document, Element, Node, NodeId};
use crate::error::{Error, Result};
use crate::strings::{NCName, XMLNS_XML};

const XML_DECL: &[u8] = b"<?xml version=\"1.0\"?>";
const PREFIX_XML: &str = "xml";

const CDATA_SPECIALS: &[u8] = &[b'<', b'>', b'&', b'\r'];

const ATTR_SPECIALS: &[u8] = &[b'"', b'\r', b'\n', b'\t', b'<', b'>', b'&'];

fn escape<B: BufMut>(out: &mut B, data: &[u8], specials: &'static [u8]) {
	let mut last_index = 0;
	for (i, ch) in data.iter().enumerate() {
		if !specials.contains(ch) {
			continue;
		}
		if i > last_index {
			out.put_slice(&data[last_index..i]);
		}
		match ch {
			b'"' => out.put_slice(b"&#34;"),
			b'<' => out.put_slice(b"&lt;"),
			b'>' => out.put_slice(b"&gt;"),
			b'&' => out.put_slice(b"&amp;"),
			b'\r' => out.put_slice(b"&#xd;"),
			b'\n' => out.put_slice(b"&#xa;"),
			b'\t' => out.put_slice(b"&#x9;"),
			_ => out.put_u8(*ch),
		}
		last_index = i + 1;
	}
	out.put_slice(&data[last_index..]);
}

/// Indentation style for element-only content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
	/// Everything on one line.
	None,
	/// One tab per nesting level.
	Tabs,
	/// Two spaces per nesting level.
	TwoSpaces,
}

impl Default for Indent {
	fn default() -> Self {
		Indent::None
	}
}

impl Indent {
	fn unit(self) -> Option<&'static [u8]> {
		match self {
			Indent::None => None,
			Indent::Tabs => Some(b"\t"),
			Indent::TwoSpaces => Some(b"  "),
		}
	}
}

/// Options for the [`Encoder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
	/// Emit a leading `<?xml version="1.0"?>`.
	pub declaration: bool,
	pub indent: Indent,
}

impl EncodeOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_declaration(mut self, declaration: bool) -> Self {
		self.declaration = declaration;
		self
	}

	pub fn with_indent(mut self, indent: Indent) -> Self {
		self.indent = indent;
		self
	}
}

/// Namespace declarations of the root element and the resulting scopes.
struct Plan<'d> {
	doc: &'d Document,
	/// Namespace bound to the empty prefix on the root element.
	default: Option<&'d str>,
	/// Prefixed declarations on the root element, in table order.
	declarations: Vec<(&'d NCName, &'d str)>,
	unit: Option<&'static [u8]>,
}

/// Return true if the root's namespace is also needed with a prefix: for an
/// attribute, or for an element inside an `xmlns=""` region.
fn default_needs_prefix(doc: &Document, root: NodeId, default: &str) -> bool {
	let mut pending = vec![(root, Some(default))];
	while let Some((id, scope)) = pending.pop() {
		let el = match doc.element(id) {
			Some(el) => el,
			None => continue,
		};
		if el.attributes().iter().any(|attr| attr.namespace() == Some(default)) {
			return true;
		}
		let scope = match el.namespace() {
			None => None,
			Some(ns) if ns == default => {
				if scope.is_none() {
					return true;
				}
				scope
			}
			Some(_) => scope,
		};
		pending.extend(doc.children(id).map(|child| (child, scope)));
	}
	false
}

/// An element whose start tag has been written.
struct Frame<'d> {
	prefix: Option<&'d str>,
	local_name: &'d NCName,
	children: Children<'d>,
	/// Namespace bound to the empty prefix inside the element.
	scope: Option<&'d str>,
	depth: usize,
	element_only: bool,
}

impl<'d> Plan<'d> {
	fn new(doc: &'d Document, options: &EncodeOptions) -> Result<Self> {
		let root = doc.root();
		let default = doc
			.element(root)
			.ok_or(Error::InternalError("root is not an element"))?
			.namespace()
			.filter(|ns| *ns != XMLNS_XML);
		let prefixed_default = match default {
			Some(default) => default_needs_prefix(doc, root, default),
			None => false,
		};
		let declarations = doc
			.namespaces()
			.iter()
			.filter(|(uri, _)| {
				let uri: &str = uri;
				uri != XMLNS_XML && (Some(uri) != default || prefixed_default)
			})
			.map(|(uri, prefix)| (prefix, &**uri))
			.collect();
		Ok(Self {
			doc,
			default,
			declarations,
			unit: options.indent.unit(),
		})
	}

	fn prefix(&self, namespace: &str) -> Result<&'d str> {
		if namespace == XMLNS_XML {
			return Ok(PREFIX_XML);
		}
		self.doc
			.namespaces()
			.prefix(namespace)
			.map(|prefix| prefix.as_str())
			.ok_or(Error::InternalError("namespace without prefix"))
	}

	fn newline<B: BufMut>(&self, out: &mut B, depth: usize) {
		if let Some(unit) = self.unit {
			out.put_u8(b'\n');
			for _ in 0..depth {
				out.put_slice(unit);
			}
		}
	}

	fn write_root<B: BufMut>(&self, out: &mut B) -> Result<()> {
		let root = self.doc.root();
		let mut stack = Vec::new();
		stack.extend(self.open_element(root, self.default, 0, self.unit.is_some(), out)?);
		while let Some(frame) = stack.last_mut() {
			let child = match frame.children.next() {
				Some(child) => child,
				None => {
					if frame.element_only {
						self.newline(out, frame.depth);
					}
					out.put_slice(b"</");
					write_name(out, frame.prefix, frame.local_name);
					out.put_u8(b'>');
					stack.pop();
					continue;
				}
			};
			let (scope, depth, element_only) = (frame.scope, frame.depth + 1, frame.element_only);
			if element_only {
				self.newline(out, depth);
			}
			match self.doc.node(child) {
				Some(Node::Element(_)) => {
					stack.extend(self.open_element(child, scope, depth, element_only, out)?)
				}
				Some(Node::Text(text)) => escape(out, text.as_bytes(), CDATA_SPECIALS),
				Some(Node::Comment(text)) => {
					out.put_slice(b"<!--");
					out.put_slice(text.as_bytes());
					out.put_slice(b"-->");
				}
				None => return Err(Error::InternalError("dangling child handle")),
			}
		}
		Ok(())
	}

	/// Write the start tag of `id`.
	///
	/// Returns `None` if the element had no children and was closed right
	/// away.
	fn open_element<B: BufMut>(
		&self,
		id: NodeId,
		scope: Option<&'d str>,
		depth: usize,
		indent: bool,
		out: &mut B,
	) -> Result<Option<Frame<'d>>> {
		let doc = self.doc;
		let el = doc
			.element(id)
			.ok_or(Error::InternalError("element handle does not refer to an element"))?;
		let mut scope = scope;
		let mut undeclare_default = false;
		let prefix = match el.namespace() {
			None => {
				undeclare_default = scope.is_some();
				scope = None;
				None
			}
			Some(ns) if Some(ns) == scope => None,
			Some(ns) => Some(self.prefix(ns)?),
		};

		out.put_u8(b'<');
		write_name(out, prefix, el.local_name());
		if id == doc.root() {
			if let Some(default) = self.default {
				out.put_slice(b" xmlns=\"");
				escape(out, default.as_bytes(), ATTR_SPECIALS);
				out.put_u8(b'"');
			}
			for (declared, uri) in self.declarations.iter() {
				out.put_slice(b" xmlns:");
				out.put_slice(declared.as_bytes());
				out.put_slice(b"=\"");
				escape(out, uri.as_bytes(), ATTR_SPECIALS);
				out.put_u8(b'"');
			}
		}
		if undeclare_default {
			out.put_slice(b" xmlns=\"\"");
		}
		self.write_attributes(el, out)?;

		if el.child_count() == 0 {
			out.put_slice(b"/>");
			return Ok(None);
		}
		out.put_u8(b'>');

		let element_only = indent
			&& doc
				.children(id)
				.all(|child| !matches!(doc.node(child), Some(Node::Text(_))));
		Ok(Some(Frame {
			prefix,
			local_name: el.local_name(),
			children: doc.children(id),
			scope,
			depth,
			element_only,
		}))
	}

	fn write_attributes<B: BufMut>(&self, el: &Element, out: &mut B) -> Result<()> {
		for attr in el.attributes() {
			let prefix = match attr.namespace() {
				Some(ns) => Some(self.prefix(ns)?),
				None => None,
			};
			out.put_u8(b' ');
			write_name(out, prefix, attr.local_name());
			out.put_slice(b"=\"");
			escape(out, attr.value().as_bytes(), ATTR_SPECIALS);
			out.put_u8(b'"');
		}
		Ok(())
	}
}

fn write_name<B: BufMut>(out: &mut B, prefix: Option<&str>, local_name: &NCName) {
	if let Some(prefix) = prefix {
		out.put_slice(prefix.as_bytes());
		out.put_u8(b':');
	}
	out.put_slice(local_name.as_bytes());
}

/**
# Document encoder

```rust
use nsdom::{Document, EncodeOptions, Encoder, Indent};

let mut doc = Document::new("list", "").unwrap();
let item = doc.create_element("item", "").unwrap();
doc.add_child(doc.root(), item).unwrap();

let encoder = Encoder::new(EncodeOptions::new().with_indent(Indent::Tabs));
assert_eq!(encoder.encode_to_string(&doc).unwrap(), "<list>\n\t<item/>\n</list>");
```

On error, whatever was written to the output so far is incomplete and
should be discarded.
*/
#[derive(Debug, Clone, Default)]
pub struct Encoder {
	options: EncodeOptions,
}

impl Encoder {
	pub fn new(options: EncodeOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &EncodeOptions {
		&self.options
	}

	/// Append the encoded document to `out`.
	pub fn encode<B: BufMut>(&self, doc: &Document, out: &mut B) -> Result<()> {
		let start = out.remaining_mut();
		let plan = Plan::new(doc, &self.options)?;
		if self.options.declaration {
			out.put_slice(XML_DECL);
		}
		plan.write_root(out)?;
		tracing::trace!(
			bytes = start.saturating_sub(out.remaining_mut()),
			"encoded document"
		);
		Ok(())
	}

	pub fn encode_to_bytes(&self, doc: &Document) -> Result<BytesMut> {
		let mut out = BytesMut::new();
		self.encode(doc, &mut out)?;
		Ok(out)
	}

	pub fn encode_to_vec(&self, doc: &Document) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		self.encode(doc, &mut out)?;
		Ok(out)
	}

	pub fn encode_to_string(&self, doc: &Document) -> Result<String> {
		String::from_utf8(self.encode_to_vec(doc)?)
			.map_err(|_| Error::InternalError("encoder produced invalid utf-8"))
	}

	/// Encode into a buffer and write it to `w` in one go.
	pub fn encode_to_writer<W: io::Write>(&self, doc: &Document, mut w: W) -> Result<()> {
		let buf = self.encode_to_bytes(doc)?;
		w.write_all(&buf)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SVG: &str = "http://www.w3.org/2000/svg";
	const XLINK: &str = "http://www.w3.org/1999/xlink";

	fn encode(doc: &Document) -> String {
		doc.to_xml_string(&EncodeOptions::default()).unwrap()
	}

	#[test]
	fn escape_text() {
		let mut out = Vec::new();
		escape(&mut out, b"a < b && c > d\r\n\"'", CDATA_SPECIALS);
		assert_eq!(out, b"a &lt; b &amp;&amp; c &gt; d&#xd;\n\"'".to_vec());
	}

	#[test]
	fn escape_attribute_value() {
		let mut out = Vec::new();
		escape(&mut out, b"\"x\"\t<\n>'", ATTR_SPECIALS);
		assert_eq!(out, b"&#34;x&#34;&#x9;&lt;&#xa;&gt;'".to_vec());
	}

	#[test]
	fn empty_root() {
		let doc = Document::new("a", "").unwrap();
		assert_eq!(encode(&doc), "<a/>");
	}

	#[test]
	fn declaration_is_not_followed_by_whitespace() {
		let doc = Document::new("a", "").unwrap();
		let opts = EncodeOptions::new()
			.with_declaration(true)
			.with_indent(Indent::TwoSpaces);
		assert_eq!(
			doc.to_xml_string(&opts).unwrap(),
			"<?xml version=\"1.0\"?><a/>"
		);
	}

	#[test]
	fn root_namespace_becomes_default() {
		let mut doc = Document::new("svg", SVG).unwrap();
		let rect = doc.create_element("rect", SVG).unwrap();
		doc.add_child(doc.root(), rect).unwrap();
		assert_eq!(
			encode(&doc),
			"<svg xmlns=\"http://www.w3.org/2000/svg\"><rect/></svg>"
		);
	}

	#[test]
	fn other_namespaces_are_declared_once_on_root() {
		let mut doc = Document::new("svg", SVG).unwrap();
		let root = doc.root();
		let a = doc.create_element("use", SVG).unwrap();
		let b = doc.create_element("use", SVG).unwrap();
		doc.set_attribute(a, "href", XLINK, "#a").unwrap();
		doc.set_attribute(b, "href", XLINK, "#b").unwrap();
		doc.add_child(root, a).unwrap();
		doc.add_child(root, b).unwrap();
		let out = encode(&doc);
		assert_eq!(
			out,
			"<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\
			 <use xlink:href=\"#a\"/><use xlink:href=\"#b\"/></svg>"
		);
		assert_eq!(out.matches("xmlns:xlink=").count(), 1);
	}

	#[test]
	fn unknown_namespaces_use_generated_prefixes() {
		let mut doc = Document::new("root", "").unwrap();
		let el = doc.create_element("item", "urn:example:a").unwrap();
		doc.set_attribute(el, "k", "urn:example:b", "v").unwrap();
		doc.add_child(doc.root(), el).unwrap();
		assert_eq!(
			encode(&doc),
			"<root xmlns:ns0=\"urn:example:a\" xmlns:ns1=\"urn:example:b\">\
			 <ns0:item ns1:k=\"v\"/></root>"
		);
	}

	#[test]
	fn unnamespaced_child_undeclares_default() {
		let mut doc = Document::new("svg", SVG).unwrap();
		let plain = doc.create_element("metadata", "").unwrap();
		let inner = doc.create_element("g", SVG).unwrap();
		doc.add_child(doc.root(), plain).unwrap();
		doc.add_child(plain, inner).unwrap();
		assert_eq!(
			encode(&doc),
			"<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:svg=\"http://www.w3.org/2000/svg\">\
			 <metadata xmlns=\"\"><svg:g/></metadata></svg>"
		);
	}

	#[test]
	fn attribute_in_default_namespace_gets_prefix() {
		let mut doc = Document::new("svg", SVG).unwrap();
		let root = doc.root();
		doc.set_attribute(root, "width", SVG, "10").unwrap();
		assert_eq!(
			encode(&doc),
			"<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:svg=\"http://www.w3.org/2000/svg\" svg:width=\"10\"/>"
		);
	}

	#[test]
	fn xml_namespace_is_never_declared() {
		let mut doc = Document::new("doc", "").unwrap();
		let root = doc.root();
		doc.set_attribute(root, "lang", XMLNS_XML, "en").unwrap();
		assert_eq!(encode(&doc), "<doc xml:lang=\"en\"/>");
	}

	#[test]
	fn text_and_attribute_values_are_escaped() {
		let mut doc = Document::new("a", "").unwrap();
		let root = doc.root();
		doc.set_attribute(root, "q", "", "say \"<hi>\"\n").unwrap();
		let text = doc.create_text("1 < 2 & 3 > 2").unwrap();
		doc.add_child(root, text).unwrap();
		assert_eq!(
			encode(&doc),
			"<a q=\"say &#34;&lt;hi&gt;&#34;&#xa;\">1 &lt; 2 &amp; 3 &gt; 2</a>"
		);
	}

	#[test]
	fn comments_are_written_verbatim() {
		let mut doc = Document::new("a", "").unwrap();
		let c = doc.create_comment(" <b> & ").unwrap();
		doc.add_child(doc.root(), c).unwrap();
		assert_eq!(encode(&doc), "<a><!-- <b> & --></a>");
	}

	#[test]
	fn indentation_keeps_single_text_inline() {
		let mut doc = Document::new("svg", SVG).unwrap();
		let root = doc.root();
		doc.set_attribute(root, "version", "", "1.1").unwrap();
		let title = doc.create_element("title", SVG).unwrap();
		let text = doc.create_text("Hello, World").unwrap();
		doc.add_child(title, text).unwrap();
		doc.add_child(root, title).unwrap();
		let opts = EncodeOptions::new().with_indent(Indent::TwoSpaces);
		assert_eq!(
			doc.to_xml_string(&opts).unwrap(),
			"<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">\n  <title>Hello, World</title>\n</svg>"
		);
	}

	#[test]
	fn indentation_nests_with_tabs() {
		let mut doc = Document::new("a", "").unwrap();
		let b = doc.create_element("b", "").unwrap();
		let c = doc.create_element("c", "").unwrap();
		let note = doc.create_comment("n").unwrap();
		doc.add_child(doc.root(), b).unwrap();
		doc.add_child(b, c).unwrap();
		doc.add_child(b, note).unwrap();
		let opts = EncodeOptions::new().with_indent(Indent::Tabs);
		assert_eq!(
			doc.to_xml_string(&opts).unwrap(),
			"<a>\n\t<b>\n\t\t<c/>\n\t\t<!--n-->\n\t</b>\n</a>"
		);
	}

	#[test]
	fn mixed_content_is_not_indented() {
		let mut doc = Document::new("p", "").unwrap();
		let root = doc.root();
		let t = doc.create_text("Hello ").unwrap();
		let em = doc.create_element("em", "").unwrap();
		let inner = doc.create_element("strong", "").unwrap();
		doc.add_child(root, t).unwrap();
		doc.add_child(root, em).unwrap();
		doc.add_child(em, inner).unwrap();
		let opts = EncodeOptions::new().with_indent(Indent::TwoSpaces);
		assert_eq!(
			doc.to_xml_string(&opts).unwrap(),
			"<p>Hello <em><strong/></em></p>"
		);
	}

	#[test]
	fn encode_to_writer_and_bytes_agree() {
		let mut doc = Document::new("a", "").unwrap();
		let t = doc.create_text("x").unwrap();
		doc.add_child(doc.root(), t).unwrap();
		let encoder = Encoder::new(EncodeOptions::new().with_declaration(true));
		let mut written = Vec::new();
		encoder.encode_to_writer(&doc, &mut written).unwrap();
		assert_eq!(&written[..], &encoder.encode_to_bytes(&doc).unwrap()[..]);
		assert_eq!(written, b"<?xml version=\"1.0\"?><a>x</a>".to_vec());
	}

	#[test]
	fn detached_nodes_are_not_written() {
		let mut doc = Document::new("a", "").unwrap();
		let b = doc.create_element("b", "").unwrap();
		doc.add_child(doc.root(), b).unwrap();
		doc.remove_child(doc.root(), b).unwrap();
		assert_eq!(encode(&doc), "<a/>");
	}
}
