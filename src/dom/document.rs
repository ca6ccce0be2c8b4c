use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BufMut;
use smartstring::alias::String as SmartString;

use crate::error::{Error, Result};
use crate::reader::Decoder;
use crate::strings::{clark_name, validate_cdata, NCName, XMLNS_XMLNS};
use crate::writer::{EncodeOptions, Encoder};

use super::namespaces::NamespaceTable;
use super::node::{Element, Node, NodeData, NodeId};

/// Local name of the attribute maintained in the identifier index.
const ID_ATTRIBUTE: &str = "id";

static NEXT_DOCUMENT: AtomicU32 = AtomicU32::new(1);

fn check_local_name(what: &str, name: &str) -> Result<NCName> {
	NCName::try_from(name).map_err(|e| Error::invalid_name(what, name, e))
}

/// Map the empty string to "no namespace" and refuse URIs which cannot be
/// carried by a namespace declaration.
fn check_namespace(namespace: &str) -> Result<Option<&str>> {
	if namespace.is_empty() {
		return Ok(None);
	}
	if namespace == XMLNS_XMLNS {
		return Err(Error::InvalidArgument(format!(
			"namespace {:?} is reserved for namespace declarations",
			namespace
		)));
	}
	validate_cdata(namespace).map_err(|e| Error::invalid_name("namespace URI", namespace, e))?;
	Ok(Some(namespace))
}

fn check_payload(what: &str, data: &str) -> Result<()> {
	validate_cdata(data).map_err(|e| Error::InvalidArgument(format!("invalid {}: {}", what, e)))
}

/**
# An XML document

The document owns every node created through it, the namespace table and
the identifier index. Nodes are addressed by [`NodeId`] handles; the root
element is created together with the document and can never be detached.

Namespace arguments are plain strings, with the empty string standing for
"no namespace".

```rust
use nsdom::{Document, EncodeOptions};

let mut doc = Document::new("greeting", "").unwrap();
let text = doc.create_text("hello").unwrap();
doc.add_child(doc.root(), text).unwrap();
assert_eq!(
	doc.to_xml_string(&EncodeOptions::default()).unwrap(),
	"<greeting>hello</greeting>",
);
```
*/
#[derive(Debug, Clone)]
pub struct Document {
	pub(super) tag: u32,
	pub(super) nodes: Vec<NodeData>,
	pub(super) root: NodeId,
	pub(super) namespaces: NamespaceTable,
	pub(super) ids: HashMap<SmartString, HashMap<String, NodeId>>,
}

impl Document {
	/// Create a document with a root element of the given name.
	pub fn new(local_name: &str, namespace: &str) -> Result<Self> {
		let local_name = check_local_name("element name", local_name)?;
		let namespace = check_namespace(namespace)?;
		Self::with_root(namespace, local_name)
	}

	pub(crate) fn with_root(namespace: Option<&str>, local_name: NCName) -> Result<Self> {
		let tag = NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed);
		let mut namespaces = NamespaceTable::new();
		let namespace = namespace.map(|uri| namespaces.intern(uri));
		let root = NodeId::new(tag, 0).ok_or(Error::InternalError("node arena exhausted"))?;
		tracing::debug!(
			document = tag,
			root = %clark_name(namespace.as_deref(), &local_name),
			"created document"
		);
		Ok(Self {
			tag,
			nodes: vec![NodeData {
				node: Node::Element(Element::new((namespace, local_name))),
				parent: None,
			}],
			root,
			namespaces,
			ids: HashMap::new(),
		})
	}

	/// The root element.
	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Return true if `id` refers to a node of this document.
	pub fn contains(&self, id: NodeId) -> bool {
		id.document() == self.tag && id.slot() < self.nodes.len()
	}

	/// Number of nodes ever created in this document, attached or not.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.data(id).ok().map(|data| &data.node)
	}

	/// The element behind `id`, or `None` if `id` is not an element of this
	/// document.
	pub fn element(&self, id: NodeId) -> Option<&Element> {
		self.node(id).and_then(Node::as_element)
	}

	/// Parent element of `id`; `None` for the root and for detached nodes.
	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.data(id).ok().and_then(|data| data.parent)
	}

	pub(crate) fn namespaces(&self) -> &NamespaceTable {
		&self.namespaces
	}

	pub(super) fn data(&self, id: NodeId) -> Result<&NodeData> {
		if id.document() != self.tag {
			return Err(Error::InvalidArgument(
				"node belongs to another document".to_string(),
			));
		}
		self.nodes
			.get(id.slot())
			.ok_or(Error::InternalError("node handle out of range"))
	}

	pub(super) fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
		if id.document() != self.tag {
			return Err(Error::InvalidArgument(
				"node belongs to another document".to_string(),
			));
		}
		self.nodes
			.get_mut(id.slot())
			.ok_or(Error::InternalError("node handle out of range"))
	}

	pub(super) fn element_ref(&self, id: NodeId) -> Result<&Element> {
		self.data(id)?
			.node
			.as_element()
			.ok_or_else(|| Error::InvalidArgument("node is not an element".to_string()))
	}

	pub(super) fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
		self.data_mut(id)?
			.node
			.as_element_mut()
			.ok_or_else(|| Error::InvalidArgument("node is not an element".to_string()))
	}

	fn push_node(&mut self, node: Node) -> Result<NodeId> {
		let id = NodeId::new(self.tag, self.nodes.len())
			.ok_or(Error::InternalError("node arena exhausted"))?;
		self.nodes.push(NodeData { node, parent: None });
		Ok(id)
	}

	/// Create a detached element.
	///
	/// The namespace, if any, is registered with the document's namespace
	/// table.
	pub fn create_element(&mut self, local_name: &str, namespace: &str) -> Result<NodeId> {
		let local_name = check_local_name("element name", local_name)?;
		let namespace = check_namespace(namespace)?;
		self.create_element_resolved(namespace, local_name)
	}

	pub(crate) fn create_element_resolved(
		&mut self,
		namespace: Option<&str>,
		local_name: NCName,
	) -> Result<NodeId> {
		let namespace = namespace.map(|uri| self.namespaces.intern(uri));
		self.push_node(Node::Element(Element::new((namespace, local_name))))
	}

	/// Create a detached text node.
	pub fn create_text<T: Into<String>>(&mut self, text: T) -> Result<NodeId> {
		let text = text.into();
		check_payload("text", &text)?;
		self.push_node(Node::Text(text))
	}

	/// Create a detached comment node.
	///
	/// The payload is written verbatim by the encoder; keeping `--` out of it
	/// is up to the caller.
	pub fn create_comment<T: Into<String>>(&mut self, text: T) -> Result<NodeId> {
		let text = text.into();
		check_payload("comment", &text)?;
		self.push_node(Node::Comment(text))
	}

	/// Set an attribute on an element.
	///
	/// Updating an existing attribute keeps its position. Setting an
	/// attribute named `id` (in any namespace) indexes the element under the
	/// new value; see [`Document::element_by_id_ns`].
	pub fn set_attribute<V: Into<String>>(
		&mut self,
		element: NodeId,
		local_name: &str,
		namespace: &str,
		value: V,
	) -> Result<()> {
		let local_name = check_local_name("attribute name", local_name)?;
		let namespace = check_namespace(namespace)?;
		self.set_attribute_resolved(element, namespace, local_name, value.into())
	}

	pub(crate) fn set_attribute_resolved(
		&mut self,
		element: NodeId,
		namespace: Option<&str>,
		local_name: NCName,
		value: String,
	) -> Result<()> {
		if namespace.is_none() && local_name == "xmlns" {
			return Err(Error::InvalidArgument(
				"xmlns is reserved for namespace declarations".to_string(),
			));
		}
		check_payload("attribute value", &value)?;
		// validates the handle before the namespace gets registered
		self.element_ref(element)?;

		let namespace = namespace.map(|uri| self.namespaces.intern(uri));
		let is_id = local_name == ID_ATTRIBUTE;
		let indexed = if is_id { Some(value.clone()) } else { None };
		let previous = self
			.element_mut(element)?
			.set_attribute((namespace.clone(), local_name), value);
		if let Some(new_value) = indexed {
			if let Some(old_value) = previous {
				self.unindex_id(namespace.as_deref(), &old_value, element);
			}
			self.index_id(namespace.as_deref(), new_value, element);
		}
		Ok(())
	}

	/// Remove an attribute from an element and return its value.
	///
	/// Fails with [`Error::NotFound`] if the attribute is not set.
	pub fn remove_attribute(
		&mut self,
		element: NodeId,
		local_name: &str,
		namespace: &str,
	) -> Result<String> {
		let namespace = if namespace.is_empty() {
			None
		} else {
			Some(namespace)
		};
		let removed = self
			.element_mut(element)?
			.remove_attribute(local_name, namespace)
			.ok_or(Error::NotFound("attribute"))?;
		if local_name == ID_ATTRIBUTE {
			self.unindex_id(namespace, removed.value(), element);
		}
		Ok(removed.value().to_string())
	}

	/// Value of an attribute, or `None` if it is not set or `element` is not
	/// an element of this document.
	pub fn attribute(&self, element: NodeId, local_name: &str, namespace: &str) -> Option<&str> {
		let namespace = if namespace.is_empty() {
			None
		} else {
			Some(namespace)
		};
		self.element(element)?.attribute(local_name, namespace)
	}

	/// Look up the element whose unnamespaced `id` attribute has the given
	/// value.
	pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
		self.element_by_id_ns(value, "")
	}

	/// Look up the element whose `id` attribute in `namespace` has the
	/// given value.
	///
	/// If several elements were given the same id, the most recent
	/// assignment wins.
	pub fn element_by_id_ns(&self, value: &str, namespace: &str) -> Option<NodeId> {
		self.ids.get(namespace)?.get(value).copied()
	}

	fn index_id(&mut self, namespace: Option<&str>, value: String, element: NodeId) {
		let bucket = self
			.ids
			.entry(namespace.unwrap_or("").into())
			.or_insert_with(HashMap::new);
		if let Some(previous) = bucket.insert(value, element) {
			if previous != element {
				tracing::debug!(
					namespace = namespace.unwrap_or(""),
					?previous,
					?element,
					"id reassigned to a different element"
				);
			}
		}
	}

	/// Drop the index entry for `value`, but only if it still points at
	/// `element`.
	fn unindex_id(&mut self, namespace: Option<&str>, value: &str, element: NodeId) {
		let key = namespace.unwrap_or("");
		if let Some(bucket) = self.ids.get_mut(key) {
			if bucket.get(value) == Some(&element) {
				bucket.remove(value);
			}
			if bucket.is_empty() {
				self.ids.remove(key);
			}
		}
	}

	/// Drop every index entry owned by `node` or one of its descendants.
	pub(super) fn forget_ids(&mut self, node: NodeId) {
		let mut owned = Vec::new();
		for id in std::iter::once(node).chain(self.descendants(node)) {
			if let Some(el) = self.element(id) {
				for attr in el.attributes() {
					if attr.local_name() == ID_ATTRIBUTE {
						owned.push((attr.namespace().map(String::from), attr.value().to_string(), id));
					}
				}
			}
		}
		for (namespace, value, id) in owned {
			self.unindex_id(namespace.as_deref(), &value, id);
		}
	}

	/// Serialise the document into `out`.
	pub fn encode<B: BufMut>(&self, options: &EncodeOptions, out: &mut B) -> Result<()> {
		Encoder::new(options.clone()).encode(self, out)
	}

	/// Serialise the document into a string.
	pub fn to_xml_string(&self, options: &EncodeOptions) -> Result<String> {
		Encoder::new(options.clone()).encode_to_string(self)
	}

	/// Decode a document with the default [`Decoder`] settings.
	pub fn parse_str(input: &str) -> Result<Self> {
		Decoder::new().decode_str(input)
	}

	/// Decode a document from UTF-8 bytes with the default [`Decoder`]
	/// settings.
	pub fn parse_bytes(input: &[u8]) -> Result<Self> {
		Decoder::new().decode_bytes(input)
	}
}
