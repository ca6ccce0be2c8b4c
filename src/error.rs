/*!
# Error types

This module holds the error types returned by the various functions of this
crate.

Tree mutations fail with [`Error::InvalidArgument`], [`Error::NotFound`] or
[`Error::Cycle`] and leave the tree exactly as it was before the call. The
decoder additionally produces grammar violations ([`Error::NotWellFormed`],
[`Error::NotNamespaceWellFormed`]) and the stream-protocol errors
[`Error::MismatchedEndTag`] and [`Error::UnterminatedDocument`]; any decode
error discards the partially built tree.
*/
use std::error;
use std::io;
use std::result::Result as StdResult;
use std::str::Utf8Error;

use crate::strings::ValidationError;

/// Violation of a well-formedness constraint or the XML 1.0 grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WFError {
	/// End-of-file encountered during a construct where more data was
	/// expected.
	///
	/// The contents describe the construct.
	#[error("invalid eof {0}")]
	InvalidEof(&'static str),

	/// Attempt to refer to an entity which is not one of the five
	/// predefined ones.
	#[error("use of undeclared entity")]
	UndeclaredEntity,

	/// Unicode codepoint which is not allowed in XML 1.0 encountered.
	///
	/// The flag is true if the codepoint was produced by a character
	/// reference.
	#[error("invalid codepoint U+{0:x} (from reference: {1})")]
	InvalidChar(u32, bool),

	/// Unicode codepoint which was not expected at that point in the
	/// grammar.
	#[error("{1:?} not allowed {0}")]
	UnexpectedChar(&'static str, char),

	/// Generalized invalid syntactic construct which does not fit into any
	/// of the other categories.
	#[error("invalid syntax: {0}")]
	InvalidSyntax(&'static str),

	/// Attribute was declared multiple times in the same element.
	///
	/// **Note:** This is also emitted for namespaced attributes which
	/// resolve to the same `(uri, localname)` pair after prefix resolution.
	#[error("duplicate attribute")]
	DuplicateAttribute,

	/// Character data (including whitespace, unless explicitly allowed)
	/// outside of the root element.
	#[error("text outside of the root element")]
	TextOutsideRoot,

	/// A second element started after the root element was closed.
	#[error("more than one root element")]
	MultipleRootElements,

	/// The stream ended without any element.
	#[error("document has no root element")]
	MissingRootElement,
}

/// Violation of a namespace-well-formedness constraint or the Namespaces for
/// XML 1.0 grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NWFError {
	/// More than one colon encountered in a name.
	#[error("more than one colon in name")]
	MultiColonName,

	/// One side of the colon in a name was empty.
	#[error("empty string on one side of the colon in name")]
	EmptyNamePart,

	/// Use of an undeclared namespace prefix.
	#[error("use of undeclared namespace prefix {0:?}")]
	UndeclaredNamespacePrefix(String),

	/// Attempt to redefine a reserved namespace prefix or to bind a
	/// reserved namespace URI to another prefix.
	#[error("reserved namespace prefix")]
	ReservedNamespacePrefix,

	/// Local name does not conform to the NCName production
	#[error("local name is invalid")]
	InvalidLocalName,

	/// A prefixed namespace declaration with an empty URI
	#[error("namespace URI is empty")]
	EmptyNamespaceUri,
}

/// Error types which may be returned by tree operations, the encoder and
/// the decoder.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A malformed name or value, or a structurally invalid argument (the
	/// document root as a child, a node of another document, a non-element
	/// parent, ...).
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// Removal or lookup of an absent attribute, child or id.
	#[error("not found: {0}")]
	NotFound(&'static str),

	/// The operation would make a node its own descendant.
	#[error("operation would make a node its own descendant")]
	Cycle,

	/// An end tag did not match the innermost open element.
	///
	/// Names are rendered in `{uri}local` notation.
	#[error("end tag {found} does not match open element {expected}")]
	MismatchedEndTag {
		/// Name of the innermost open element, or an empty string if no
		/// element was open.
		expected: String,
		/// Name carried by the end tag.
		found: String,
	},

	/// The token stream ended while elements were still open.
	#[error("document ended with {open} element(s) still open")]
	UnterminatedDocument {
		/// Number of elements which were open at the end of the stream.
		open: usize,
	},

	/// An invariant of the tree was found violated.
	///
	/// This is not reachable through the public API; seeing it is a bug.
	#[error("internal error: {0}")]
	InternalError(&'static str),

	/// A violation of the XML 1.0 grammar or a well-formedness constraint
	/// was encountered during decoding.
	#[error("not-well-formed: {0}")]
	NotWellFormed(WFError),

	/// A violation of the Namespaces in XML 1.0 grammar or a
	/// namespace-well-formedness constraint was encountered during
	/// decoding.
	#[error("not namespace-well-formed: {0}")]
	NotNamespaceWellFormed(NWFError),

	/// A construct this crate does not support (DTDs) was encountered.
	///
	/// The string indicates the context and should not be interpreted by
	/// user code.
	#[error("restricted xml: {0}")]
	RestrictedXml(&'static str),

	/// The element-closed callback of a decoder refused an element.
	#[error("element rejected: {0}")]
	Rejected(#[source] Box<dyn error::Error + Send + Sync>),

	/// The input was not valid UTF-8.
	#[error("invalid utf-8 input: {0}")]
	InvalidUtf8(#[from] Utf8Error),

	/// Reading the input or writing the output failed.
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	/// Wrap an arbitrary error as an [`Error::Rejected`].
	///
	/// This is intended for element-closed callbacks of the decoder.
	pub fn rejected<E: Into<Box<dyn error::Error + Send + Sync>>>(e: E) -> Error {
		Error::Rejected(e.into())
	}

	pub(crate) fn invalid_name(what: &str, name: &str, e: ValidationError) -> Error {
		Error::InvalidArgument(format!("invalid {} {:?}: {}", what, name, e))
	}
}

impl From<WFError> for Error {
	fn from(e: WFError) -> Error {
		Error::NotWellFormed(e)
	}
}

impl From<NWFError> for Error {
	fn from(e: NWFError) -> Error {
		Error::NotNamespaceWellFormed(e)
	}
}
