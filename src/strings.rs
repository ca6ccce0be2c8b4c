/*!
# Strongly-typed strings for names in the document tree

[`NCName`] carries the guarantee that its content conforms to the `NCName`
production of Namespaces in XML 1.0. Element and attribute local names are
stored as [`NCName`]; prefixes never appear in the tree at all (they are
derived by the encoder).

Namespace URIs are stored as shared [`NamespaceName`] pointers so that the
many elements of one namespace refer to a single allocation.
*/
use std::borrow::Borrow;
use std::convert::TryFrom;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use smartstring::alias::String as SmartString;

use crate::selectors::{CharSelector, CLASS_NCNAME, CLASS_NCNAME_START, CLASS_XML_CHAR};

/// The namespace URI bound to the reserved `xml` prefix.
pub const XMLNS_XML: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace URI bound to the reserved `xmlns` prefix.
pub const XMLNS_XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// Shared namespace URI
pub type NamespaceName = Arc<str>;

/// Pair of an optional namespace name (URI) and a local name, used for
/// element and attribute names.
pub type QName = (Option<NamespaceName>, NCName);

/**
Error condition from validating an XML string.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	/// A Name or NCName was empty.
	#[error("name must not be empty")]
	EmptyName,
	/// An invalid character was encountered.
	///
	/// This variant contains the character as data.
	#[error("character {0:?} is not allowed")]
	InvalidChar(char),
}

/**
Check whether a str is a valid NCName

# Example

```rust
use nsdom::strings::{validate_ncname, ValidationError};

assert!(validate_ncname("foobar").is_ok());
assert!(matches!(validate_ncname("foo:bar"), Err(ValidationError::InvalidChar(':'))));
assert!(matches!(validate_ncname(""), Err(ValidationError::EmptyName)));
```
*/
pub fn validate_ncname(s: &str) -> Result<(), ValidationError> {
	let mut chars = s.chars();
	match chars.next() {
		None => return Err(ValidationError::EmptyName),
		Some(c) if !CLASS_NCNAME_START.select(c) => return Err(ValidationError::InvalidChar(c)),
		Some(_) => (),
	}
	match chars.find(|c| !CLASS_NCNAME.select(*c)) {
		Some(c) => Err(ValidationError::InvalidChar(c)),
		None => Ok(()),
	}
}

/**
Check whether a str consists only of XML 1.0 `Char`s

# Example

```rust
use nsdom::strings::{validate_cdata, ValidationError};

assert!(validate_cdata("foo bar baz <fnord!>").is_ok());
assert!(matches!(validate_cdata("\x01"), Err(ValidationError::InvalidChar('\x01'))));
```
*/
pub fn validate_cdata(s: &str) -> Result<(), ValidationError> {
	match s.chars().find(|c| !CLASS_XML_CHAR.select(*c)) {
		Some(c) => Err(ValidationError::InvalidChar(c)),
		None => Ok(()),
	}
}

/// String which conforms to the NCName production of Namespaces in XML 1.0.
///
/// # Formal definition
///
/// ```text
/// [4] NCName ::= Name - (Char* ':' Char*)  /* An XML Name, minus the ":" */
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NCName(SmartString);

impl NCName {
	/// Wrap a string which the caller has already checked.
	pub(crate) fn from_checked<T: Into<SmartString>>(s: T) -> Self {
		let s = s.into();
		debug_assert!(validate_ncname(&s).is_ok());
		Self(s)
	}

	/// Obtain a reference to the inner string slice.
	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}

	/// Extract the inner string and return it.
	pub fn into_inner(self) -> SmartString {
		self.0
	}

	/// Join a prefix and this local name with a colon.
	pub fn with_prefix(&self, prefix: &NCName) -> String {
		let mut s = String::with_capacity(prefix.len() + 1 + self.len());
		s.push_str(prefix);
		s.push(':');
		s.push_str(self);
		s
	}
}

impl Deref for NCName {
	type Target = str;

	fn deref(&self) -> &str {
		self.0.as_str()
	}
}

impl Borrow<str> for NCName {
	fn borrow(&self) -> &str {
		self.0.as_str()
	}
}

impl AsRef<str> for NCName {
	fn as_ref(&self) -> &str {
		self.0.as_str()
	}
}

impl PartialEq<str> for NCName {
	fn eq(&self, other: &str) -> bool {
		self.0.as_str() == other
	}
}

impl PartialEq<&str> for NCName {
	fn eq(&self, other: &&str) -> bool {
		self.0.as_str() == *other
	}
}

impl PartialEq<NCName> for &str {
	fn eq(&self, other: &NCName) -> bool {
		*self == other.0.as_str()
	}
}

impl TryFrom<&str> for NCName {
	type Error = ValidationError;

	fn try_from(other: &str) -> Result<Self, Self::Error> {
		validate_ncname(other)?;
		Ok(Self(other.into()))
	}
}

impl TryFrom<String> for NCName {
	type Error = ValidationError;

	fn try_from(other: String) -> Result<Self, Self::Error> {
		validate_ncname(&other)?;
		Ok(Self(other.into()))
	}
}

impl TryFrom<SmartString> for NCName {
	type Error = ValidationError;

	fn try_from(other: SmartString) -> Result<Self, Self::Error> {
		validate_ncname(&other)?;
		Ok(Self(other))
	}
}

impl From<NCName> for String {
	fn from(other: NCName) -> Self {
		other.0.into()
	}
}

impl fmt::Display for NCName {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Render a namespace/local-name pair in Clark notation (`{uri}local`).
///
/// This is how names appear in error messages; it never reaches the wire.
pub fn clark_name(namespace: Option<&str>, local_name: &str) -> String {
	match namespace {
		Some(ns) => format!("{{{}}}{}", ns, local_name),
		None => local_name.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ncname_rejects_colon() {
		match NCName::try_from("svg:rect") {
			Err(ValidationError::InvalidChar(':')) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn ncname_rejects_leading_digit() {
		match NCName::try_from("1st") {
			Err(ValidationError::InvalidChar('1')) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn ncname_accepts_non_ascii() {
		let name = NCName::try_from("größe").unwrap();
		assert_eq!(name, "größe");
	}

	#[test]
	fn with_prefix_joins_with_colon() {
		let local = NCName::try_from("href").unwrap();
		let prefix = NCName::try_from("xlink").unwrap();
		assert_eq!(local.with_prefix(&prefix), "xlink:href");
	}

	#[test]
	fn clark_name_formats_namespaced_names() {
		assert_eq!(clark_name(Some("uri:a"), "b"), "{uri:a}b");
		assert_eq!(clark_name(None, "b"), "b");
	}
}
