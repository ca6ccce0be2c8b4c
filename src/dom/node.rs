use std::convert::TryFrom;
use std::num::NonZeroU32;

use crate::strings::{NCName, NamespaceName, QName};

/// Number of tombstones an element tolerates before compaction is
/// considered at all.
const COMPACT_MIN_VACANT: usize = 16;

/**
# Handle to a node of a [`Document`]

A `NodeId` is a small `Copy` value: an index into the node arena of its
owning document, tagged with that document's identity. Handles stay valid
for the whole lifetime of the document, including while the node is
detached from the tree. Passing a handle to a different document is
rejected with [`Error::InvalidArgument`].

   [`Document`]: crate::Document
   [`Error::InvalidArgument`]: crate::Error::InvalidArgument
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	document: u32,
	index: NonZeroU32,
}

impl NodeId {
	pub(crate) fn new(document: u32, slot: usize) -> Option<Self> {
		let index = u32::try_from(slot).ok()?.checked_add(1)?;
		Some(Self {
			document,
			index: NonZeroU32::new(index)?,
		})
	}

	pub(crate) fn document(self) -> u32 {
		self.document
	}

	pub(crate) fn slot(self) -> usize {
		(self.index.get() - 1) as usize
	}
}

/// Compare a stored namespace against a namespace given by the caller.
///
/// `None` stands for "no namespace" on both sides.
pub(crate) fn namespace_matches(stored: &Option<NamespaceName>, other: Option<&str>) -> bool {
	stored.as_deref() == other
}

/// A single attribute of an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
	name: QName,
	value: String,
}

impl Attribute {
	/// Namespace URI of the attribute, if any.
	pub fn namespace(&self) -> Option<&str> {
		self.name.0.as_deref()
	}

	/// Local name of the attribute.
	pub fn local_name(&self) -> &NCName {
		&self.name.1
	}

	/// The namespace/local name pair.
	pub fn qname(&self) -> &QName {
		&self.name
	}

	/// Attribute value, unescaped.
	pub fn value(&self) -> &str {
		&self.value
	}

	fn matches(&self, local_name: &str, namespace: Option<&str>) -> bool {
		self.name.1 == local_name && namespace_matches(&self.name.0, namespace)
	}
}

/// Ordered list of child slots.
///
/// Removal leaves an empty slot behind instead of shifting the surviving
/// siblings; enumeration skips the vacancies.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChildSlots {
	slots: Vec<Option<NodeId>>,
	vacant: usize,
}

impl ChildSlots {
	pub(crate) fn iter(&self) -> Children<'_> {
		Children {
			inner: self.slots.iter(),
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.slots.len() - self.vacant
	}

	pub(crate) fn position(&self, id: NodeId) -> Option<usize> {
		self.slots.iter().position(|slot| *slot == Some(id))
	}

	pub(crate) fn next_after(&self, pos: usize) -> Option<NodeId> {
		self.slots[pos + 1..].iter().find_map(|slot| *slot)
	}

	pub(crate) fn previous_before(&self, pos: usize) -> Option<NodeId> {
		self.slots[..pos].iter().rev().find_map(|slot| *slot)
	}

	/// Tombstone the slot at `pos`.
	///
	/// Returns true if the list was compacted as a consequence.
	pub(crate) fn vacate(&mut self, pos: usize) -> bool {
		debug_assert!(self.slots[pos].is_some());
		self.slots[pos] = None;
		self.vacant += 1;
		if self.vacant > COMPACT_MIN_VACANT && self.vacant * 2 > self.slots.len() {
			self.compact();
			return true;
		}
		false
	}

	/// Place `id` at the end, reusing a trailing run of tombstones.
	pub(crate) fn append(&mut self, id: NodeId) {
		let trailing = self
			.slots
			.iter()
			.rev()
			.take_while(|slot| slot.is_none())
			.count();
		if trailing > 0 {
			let pos = self.slots.len() - trailing;
			self.slots[pos] = Some(id);
			self.vacant -= 1;
		} else {
			self.slots.push(Some(id));
		}
	}

	/// Place `id` directly before the occupied slot at `pos`, reusing the
	/// tombstone in front of it if there is one.
	pub(crate) fn insert_before(&mut self, pos: usize, id: NodeId) {
		if pos > 0 && self.slots[pos - 1].is_none() {
			self.slots[pos - 1] = Some(id);
			self.vacant -= 1;
		} else {
			self.slots.insert(pos, Some(id));
		}
	}

	/// Remove all slots, returning the live children in order.
	pub(crate) fn clear(&mut self) -> Vec<NodeId> {
		let live = self.iter().collect();
		self.slots.clear();
		self.vacant = 0;
		live
	}

	pub(crate) fn compact(&mut self) {
		self.slots.retain(|slot| slot.is_some());
		self.vacant = 0;
	}

	#[cfg(test)]
	pub(crate) fn capacity_used(&self) -> usize {
		self.slots.len()
	}
}

/// Iterator over the live children of an element, in document order.
#[derive(Debug, Clone)]
pub struct Children<'a> {
	inner: std::slice::Iter<'a, Option<NodeId>>,
}

impl<'a> Children<'a> {
	pub(crate) fn empty() -> Self {
		let empty: &'a [Option<NodeId>] = &[];
		Children {
			inner: empty.iter(),
		}
	}
}

impl<'a> Iterator for Children<'a> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		self.inner.find_map(|slot| *slot)
	}
}

impl<'a> DoubleEndedIterator for Children<'a> {
	fn next_back(&mut self) -> Option<NodeId> {
		self.inner.rfind(|slot| slot.is_some()).and_then(|slot| *slot)
	}
}

/// An element node: a qualified name, ordered attributes and ordered
/// children.
#[derive(Debug, Clone)]
pub struct Element {
	name: QName,
	attributes: Vec<Attribute>,
	pub(crate) children: ChildSlots,
}

impl Element {
	pub(crate) fn new(name: QName) -> Self {
		Self {
			name,
			attributes: Vec::new(),
			children: ChildSlots::default(),
		}
	}

	/// Namespace URI of the element, if any.
	pub fn namespace(&self) -> Option<&str> {
		self.name.0.as_deref()
	}

	/// Local name of the element.
	pub fn local_name(&self) -> &NCName {
		&self.name.1
	}

	/// The namespace/local name pair.
	pub fn qname(&self) -> &QName {
		&self.name
	}

	/// Attributes in insertion order.
	pub fn attributes(&self) -> &[Attribute] {
		&self.attributes
	}

	/// Look up an attribute value.
	///
	/// Pass `None` as `namespace` for unnamespaced attributes.
	pub fn attribute(&self, local_name: &str, namespace: Option<&str>) -> Option<&str> {
		self.attributes
			.iter()
			.find(|attr| attr.matches(local_name, namespace))
			.map(|attr| attr.value())
	}

	/// Number of live children.
	pub fn child_count(&self) -> usize {
		self.children.len()
	}

	/// Set an attribute, keeping the position of an existing entry.
	///
	/// Returns the previous value, if any.
	pub(crate) fn set_attribute(&mut self, name: QName, value: String) -> Option<String> {
		let existing = self
			.attributes
			.iter_mut()
			.find(|attr| attr.matches(&name.1, name.0.as_deref()));
		match existing {
			Some(attr) => Some(std::mem::replace(&mut attr.value, value)),
			None => {
				self.attributes.push(Attribute { name, value });
				None
			}
		}
	}

	pub(crate) fn remove_attribute(
		&mut self,
		local_name: &str,
		namespace: Option<&str>,
	) -> Option<Attribute> {
		let pos = self
			.attributes
			.iter()
			.position(|attr| attr.matches(local_name, namespace))?;
		Some(self.attributes.remove(pos))
	}
}

/**
# A node of the document tree

Elements own their attributes and child list; text and comment nodes own an
immutable payload. Parent links and the owning document are kept by the
[`Document`](crate::Document) and are queried through it.
*/
#[derive(Debug, Clone)]
pub enum Node {
	Element(Element),
	Text(String),
	Comment(String),
}

impl Node {
	pub fn as_element(&self) -> Option<&Element> {
		match self {
			Self::Element(el) => Some(el),
			_ => None,
		}
	}

	pub(crate) fn as_element_mut(&mut self) -> Option<&mut Element> {
		match self {
			Self::Element(el) => Some(el),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_comment(&self) -> Option<&str> {
		match self {
			Self::Comment(text) => Some(text),
			_ => None,
		}
	}

	pub fn is_element(&self) -> bool {
		matches!(self, Self::Element(_))
	}
}

/// Arena entry: the node and its parent link.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
	pub(crate) node: Node,
	pub(crate) parent: Option<NodeId>,
}
