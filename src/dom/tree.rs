/*!
# Tree mutation and navigation

All mutators validate every argument before touching the tree, so a failed
call leaves the document exactly as it was.
*/
use crate::error::{Error, Result};

use super::document::Document;
use super::node::{namespace_matches, Children, Node, NodeId};

/// Iterator over the ancestors of a node, innermost first.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
	doc: &'a Document,
	next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		let current = self.next?;
		self.next = self.doc.parent(current);
		Some(current)
	}
}

/// Pre-order iterator over the descendants of a node, excluding the node
/// itself.
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
	doc: &'a Document,
	stack: Vec<Children<'a>>,
}

impl<'a> Iterator for Descendants<'a> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		loop {
			let top = self.stack.last_mut()?;
			match top.next() {
				Some(id) => {
					self.stack.push(self.doc.children(id));
					return Some(id);
				}
				None => {
					self.stack.pop();
				}
			}
		}
	}
}

impl Document {
	/// Append `node` as the last child of `parent`.
	///
	/// If `node` is attached somewhere (including to `parent` itself) it is
	/// moved; its identity is retained.
	pub fn add_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
		self.insert_child_before(parent, node, None)
	}

	/// Insert `node` into `parent` directly before `reference`, or at the
	/// end if `reference` is `None`.
	///
	/// # Errors
	///
	/// - [`Error::InvalidArgument`] if `parent` is not an element, if `node`
	///   is the document root or if any handle belongs to another document.
	/// - [`Error::Cycle`] if `node` is `parent` or one of its ancestors.
	/// - [`Error::NotFound`] if `reference` is not a child of `parent`.
	pub fn insert_child_before(
		&mut self,
		parent: NodeId,
		node: NodeId,
		reference: Option<NodeId>,
	) -> Result<()> {
		self.element_ref(parent)?;
		self.data(node)?;
		if node == self.root {
			return Err(Error::InvalidArgument(
				"the document root cannot become a child".to_string(),
			));
		}
		// a childless node can only be its own ancestor
		let has_children = self
			.element(node)
			.map(|el| el.child_count() > 0)
			.unwrap_or(false);
		if node == parent || (has_children && self.ancestors(parent).any(|id| id == node)) {
			return Err(Error::Cycle);
		}
		if let Some(reference) = reference {
			if self.data(reference)?.parent != Some(parent) {
				return Err(Error::NotFound("reference child"));
			}
			if reference == node {
				// inserting a node before itself leaves it where it is
				return Ok(());
			}
		}

		self.detach(node)?;
		let slots = &mut self.element_mut(parent)?.children;
		match reference {
			None => slots.append(node),
			Some(reference) => {
				let pos = slots
					.position(reference)
					.ok_or(Error::InternalError("child missing from parent's slots"))?;
				slots.insert_before(pos, node);
			}
		}
		self.data_mut(node)?.parent = Some(parent);
		Ok(())
	}

	/// Remove `node` from its current parent, if any.
	fn detach(&mut self, node: NodeId) -> Result<()> {
		let parent = match self.data(node)?.parent {
			Some(parent) => parent,
			None => return Ok(()),
		};
		let slots = &mut self.element_mut(parent)?.children;
		let pos = slots
			.position(node)
			.ok_or(Error::InternalError("child missing from parent's slots"))?;
		if slots.vacate(pos) {
			tracing::trace!(?parent, "compacted child slots");
		}
		self.data_mut(node)?.parent = None;
		Ok(())
	}

	/// Detach `node` from `parent`.
	///
	/// Fails with [`Error::NotFound`] if `node` is not a child of `parent`.
	/// The identifier index is left alone; ids owned by `node` keep
	/// resolving to it while it is detached.
	pub fn remove_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
		self.element_ref(parent)?;
		if self.data(node)?.parent != Some(parent) {
			return Err(Error::NotFound("child"));
		}
		self.detach(node)
	}

	/// Detach every child of `parent` in one step.
	///
	/// Every id owned by a removed subtree is dropped from the identifier
	/// index.
	pub fn remove_all_children(&mut self, parent: NodeId) -> Result<()> {
		let removed = self.element_mut(parent)?.children.clear();
		for child in removed.iter() {
			self.data_mut(*child)?.parent = None;
		}
		for child in removed {
			self.forget_ids(child);
		}
		Ok(())
	}

	/// Live children of `node` in document order.
	///
	/// Text, comments and foreign handles have no children.
	pub fn children(&self, node: NodeId) -> Children<'_> {
		match self.element(node) {
			Some(el) => el.children.iter(),
			None => Children::empty(),
		}
	}

	pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
		self.children(node).next()
	}

	pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
		self.children(node).next_back()
	}

	pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
		let slots = &self.element(self.parent(node)?)?.children;
		slots.next_after(slots.position(node)?)
	}

	pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
		let slots = &self.element(self.parent(node)?)?.children;
		slots.previous_before(slots.position(node)?)
	}

	/// Direct child elements of `parent` with the given local name, in any
	/// namespace.
	///
	/// This does not descend into grandchildren.
	pub fn elements_by_tag_name<'a>(
		&'a self,
		parent: NodeId,
		local_name: &'a str,
	) -> impl Iterator<Item = NodeId> + 'a {
		self.children(parent).filter(move |id| {
			self.element(*id)
				.map(|el| el.local_name() == local_name)
				.unwrap_or(false)
		})
	}

	/// Direct child elements of `parent` with the given local name and
	/// namespace (empty for none).
	pub fn elements_by_tag_name_ns<'a>(
		&'a self,
		parent: NodeId,
		local_name: &'a str,
		namespace: &'a str,
	) -> impl Iterator<Item = NodeId> + 'a {
		let namespace = if namespace.is_empty() {
			None
		} else {
			Some(namespace)
		};
		self.children(parent).filter(move |id| {
			self.element(*id)
				.map(|el| el.local_name() == local_name && namespace_matches(&el.qname().0, namespace))
				.unwrap_or(false)
		})
	}

	/// `node` followed by its ancestors up to the root or the top of a
	/// detached subtree.
	pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
		Ancestors {
			doc: self,
			next: if self.contains(node) { Some(node) } else { None },
		}
	}

	/// Pre-order walk over everything below `node`.
	pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
		Descendants {
			doc: self,
			stack: vec![self.children(node)],
		}
	}

	/// Concatenated text of `node` and all of its descendants.
	///
	/// Comments do not contribute.
	pub fn text_content(&self, node: NodeId) -> String {
		let mut out = String::new();
		for id in std::iter::once(node).chain(self.descendants(node)) {
			if let Some(Node::Text(text)) = self.node(id) {
				out.push_str(text);
			}
		}
		out
	}
}
