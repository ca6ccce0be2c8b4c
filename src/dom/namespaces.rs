/*!
# Per-document namespace allocator

Every namespace URI used by an element or attribute is registered here at
creation time and assigned a prefix. The tree itself only ever stores URIs;
prefixes are looked up by the encoder and nowhere else.
*/
use std::collections::{HashMap, HashSet};

use crate::strings::{NCName, NamespaceName, XMLNS_XML};

/// Prefixes for namespaces common enough that a generated `nsN` would be
/// unhelpful to readers of the output.
const WELL_KNOWN: &[(&str, &str)] = &[
	("http://www.w3.org/2000/svg", "svg"),
	("http://www.w3.org/1999/xlink", "xlink"),
	(XMLNS_XML, "xml"),
	("http://www.w3.org/1999/xhtml", "html"),
	("http://www.w3.org/2001/XMLSchema-instance", "xsi"),
	("http://www.w3.org/2001/XMLSchema", "xs"),
	("http://www.w3.org/1998/Math/MathML", "mathml"),
	("http://purl.org/dc/elements/1.1/", "dc"),
	("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "rdf"),
	("http://www.inkscape.org/namespaces/inkscape", "inkscape"),
	(
		"http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd",
		"sodipodi",
	),
	("http://creativecommons.org/ns#", "cc"),
];

fn well_known_prefix(uri: &str) -> Option<&'static str> {
	WELL_KNOWN
		.iter()
		.find(|(known, _)| *known == uri)
		.map(|(_, prefix)| *prefix)
}

/// Insertion-ordered URI to prefix table.
#[derive(Debug, Clone, Default)]
pub(crate) struct NamespaceTable {
	entries: Vec<(NamespaceName, NCName)>,
	by_uri: HashMap<NamespaceName, usize>,
	prefixes: HashSet<NCName>,
	counter: usize,
}

impl NamespaceTable {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Return the shared name for `uri`, registering it if it is new.
	pub(crate) fn intern(&mut self, uri: &str) -> NamespaceName {
		if let Some(index) = self.by_uri.get(uri) {
			return self.entries[*index].0.clone();
		}
		let name: NamespaceName = uri.into();
		let prefix = self.allocate_prefix(uri);
		tracing::trace!(uri, prefix = prefix.as_str(), "registered namespace");
		self.by_uri.insert(name.clone(), self.entries.len());
		self.entries.push((name.clone(), prefix));
		name
	}

	fn allocate_prefix(&mut self, uri: &str) -> NCName {
		if let Some(prefix) = well_known_prefix(uri) {
			let prefix = NCName::from_checked(prefix);
			if !self.prefixes.contains(&prefix) {
				self.prefixes.insert(prefix.clone());
				return prefix;
			}
		}
		loop {
			let candidate = NCName::from_checked(format!("ns{}", self.counter));
			self.counter += 1;
			if !self.prefixes.contains(&candidate) {
				self.prefixes.insert(candidate.clone());
				return candidate;
			}
		}
	}

	/// Prefix assigned to `uri`, if it has been registered.
	pub(crate) fn prefix(&self, uri: &str) -> Option<&NCName> {
		self.by_uri.get(uri).map(|index| &self.entries[*index].1)
	}

	/// Registered namespaces in registration order.
	pub(crate) fn iter(&self) -> impl Iterator<Item = (&NamespaceName, &NCName)> + '_ {
		self.entries.iter().map(|(uri, prefix)| (uri, prefix))
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn well_known_namespaces_get_their_usual_prefix() {
		let mut table = NamespaceTable::new();
		table.intern("http://www.w3.org/2000/svg");
		table.intern("http://www.w3.org/1999/xlink");
		assert_eq!(table.prefix("http://www.w3.org/2000/svg").unwrap(), "svg");
		assert_eq!(table.prefix("http://www.w3.org/1999/xlink").unwrap(), "xlink");
	}

	#[test]
	fn unknown_namespaces_get_generated_prefixes() {
		let mut table = NamespaceTable::new();
		table.intern("urn:example:a");
		table.intern("urn:example:b");
		assert_eq!(table.prefix("urn:example:a").unwrap(), "ns0");
		assert_eq!(table.prefix("urn:example:b").unwrap(), "ns1");
	}

	#[test]
	fn intern_is_idempotent_and_shares_the_allocation() {
		let mut table = NamespaceTable::new();
		let a = table.intern("urn:example:a");
		let b = table.intern("urn:example:a");
		assert!(std::sync::Arc::ptr_eq(&a, &b));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn iteration_follows_registration_order() {
		let mut table = NamespaceTable::new();
		table.intern("urn:example:z");
		table.intern("http://www.w3.org/2000/svg");
		table.intern("urn:example:a");
		let prefixes: Vec<&str> = table.iter().map(|(_, p)| p.as_str()).collect();
		assert_eq!(prefixes, vec!["ns0", "svg", "ns1"]);
	}

	#[test]
	fn unregistered_uri_has_no_prefix() {
		let table = NamespaceTable::new();
		assert!(table.prefix("urn:example:a").is_none());
	}
}
