/*!
# Arena-backed document object model

A [`Document`] owns all of its nodes in an arena; nodes are referred to by
copyable [`NodeId`] handles. Parent links and child lists are index lookups
into that arena, so moving a node around only rewrites handles.
*/
mod document;
mod namespaces;
mod node;
mod tree;

pub use document::Document;
pub use node::{Attribute, Children, Element, Node, NodeId};
pub use tree::{Ancestors, Descendants};
