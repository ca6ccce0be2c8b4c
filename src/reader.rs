/*!
# Decoder: token stream to document

The [`Decoder`] consumes [`Token`]s and builds a [`Document`] using an
explicit stack of open elements. Decoding is all or nothing: the first
error aborts and the partially built tree is dropped.
*/
use std::fmt;
use std::io;

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result, WFError};
use crate::resolver::{Token, Tokens};
use crate::selectors::is_xml_whitespace;
use crate::strings::{clark_name, QName};
use crate::TokenRead;

/// Options for the [`Decoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
	/// Accept whitespace-only character data before and after the root
	/// element.
	///
	/// By default, any character data outside of the root element fails
	/// with [`WFError::TextOutsideRoot`].
	pub allow_outer_whitespace: bool,
}

impl DecodeOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_outer_whitespace(mut self, allow: bool) -> Self {
		self.allow_outer_whitespace = allow;
		self
	}
}

type ElementClosed<'c> = Box<dyn FnMut(&Document, NodeId) -> Result<()> + 'c>;

/// Tree under construction.
struct Builder {
	options: DecodeOptions,
	doc: Option<Document>,
	stack: Vec<NodeId>,
}

impl Builder {
	fn new(options: DecodeOptions) -> Self {
		Self {
			options,
			doc: None,
			stack: Vec::new(),
		}
	}

	fn start_element(&mut self, name: QName, attributes: Vec<(QName, String)>) -> Result<()> {
		let (namespace, local_name) = name;
		let parent = self.stack.last().copied();
		let element = match (self.doc.as_mut(), parent) {
			(Some(_), None) => return Err(WFError::MultipleRootElements.into()),
			(Some(doc), Some(parent)) => {
				let element = doc.create_element_resolved(namespace.as_deref(), local_name)?;
				doc.add_child(parent, element)?;
				element
			}
			(None, _) => {
				let doc = Document::with_root(namespace.as_deref(), local_name)?;
				let root = doc.root();
				self.doc = Some(doc);
				root
			}
		};
		let doc = self
			.doc
			.as_mut()
			.ok_or(Error::InternalError("open element without document"))?;
		for ((namespace, local_name), value) in attributes {
			doc.set_attribute_resolved(element, namespace.as_deref(), local_name, value)?;
		}
		self.stack.push(element);
		Ok(())
	}

	fn char_data(&mut self, text: String) -> Result<()> {
		let parent = match self.stack.last() {
			Some(parent) => *parent,
			None => {
				if self.options.allow_outer_whitespace && is_xml_whitespace(&text) {
					return Ok(());
				}
				return Err(WFError::TextOutsideRoot.into());
			}
		};
		if is_xml_whitespace(&text) {
			return Ok(());
		}
		let doc = self
			.doc
			.as_mut()
			.ok_or(Error::InternalError("open element without document"))?;
		let node = doc.create_text(text)?;
		doc.add_child(parent, node)
	}

	fn comment(&mut self, text: String) -> Result<()> {
		let (doc, parent) = match (self.doc.as_mut(), self.stack.last()) {
			(Some(doc), Some(parent)) => (doc, *parent),
			_ => {
				tracing::trace!("discarded comment outside of the root element");
				return Ok(());
			}
		};
		let node = doc.create_comment(text)?;
		doc.add_child(parent, node)
	}

	/// Close the innermost element and return it.
	fn end_element(&mut self, name: QName) -> Result<NodeId> {
		let (namespace, local_name) = name;
		let found = || clark_name(namespace.as_deref(), &local_name);
		let (doc, top) = match (self.doc.as_ref(), self.stack.last()) {
			(Some(doc), Some(top)) => (doc, *top),
			_ => {
				return Err(Error::MismatchedEndTag {
					expected: String::new(),
					found: found(),
				})
			}
		};
		let el = doc
			.element(top)
			.ok_or(Error::InternalError("open node is not an element"))?;
		if el.local_name() != &local_name || el.namespace() != namespace.as_deref() {
			return Err(Error::MismatchedEndTag {
				expected: clark_name(el.namespace(), el.local_name()),
				found: found(),
			});
		}
		self.stack.pop();
		Ok(top)
	}

	fn finish(self) -> Result<Document> {
		if !self.stack.is_empty() {
			return Err(Error::UnterminatedDocument {
				open: self.stack.len(),
			});
		}
		self.doc.ok_or_else(|| WFError::MissingRootElement.into())
	}
}

/**
# Streaming document decoder

```rust
use nsdom::Decoder;

let doc = Decoder::new()
	.decode_str("<?xml version='1.0'?><svg xmlns='http://www.w3.org/2000/svg'><title>Hi</title></svg>")
	.unwrap();
let title = doc.first_child(doc.root()).unwrap();
assert_eq!(doc.text_content(title), "Hi");
```

A callback registered with [`on_element_closed`](Self::on_element_closed)
sees every element right after its end tag, with all of its children in
place. Returning an error from the callback aborts decoding with that
error.
*/
pub struct Decoder<'c> {
	options: DecodeOptions,
	on_element_closed: Option<ElementClosed<'c>>,
}

impl<'c> Decoder<'c> {
	pub fn new() -> Self {
		Self {
			options: DecodeOptions::default(),
			on_element_closed: None,
		}
	}

	pub fn with_options(mut self, options: DecodeOptions) -> Self {
		self.options = options;
		self
	}

	/// Invoke `f` each time an element has been closed.
	pub fn on_element_closed<F>(mut self, f: F) -> Self
	where
		F: FnMut(&Document, NodeId) -> Result<()> + 'c,
	{
		self.on_element_closed = Some(Box::new(f));
		self
	}

	pub fn decode_str(&mut self, input: &str) -> Result<Document> {
		self.decode_tokens(Tokens::new(input))
	}

	/// Decode UTF-8 encoded bytes.
	pub fn decode_bytes(&mut self, input: &[u8]) -> Result<Document> {
		let input = std::str::from_utf8(input)?;
		self.decode_str(input)
	}

	/// Read `r` to the end and decode the result.
	pub fn decode_reader<R: io::Read>(&mut self, mut r: R) -> Result<Document> {
		let mut buf = Vec::new();
		r.read_to_end(&mut buf)?;
		self.decode_bytes(&buf)
	}

	/// Build a document from an arbitrary token source.
	pub fn decode_tokens<T: TokenRead>(&mut self, mut tokens: T) -> Result<Document> {
		let mut builder = Builder::new(self.options);
		while let Some(token) = tokens.read()? {
			match token {
				Token::StartElement(name, attributes) => builder.start_element(name, attributes)?,
				Token::CharData(text) => builder.char_data(text)?,
				Token::Comment(text) => builder.comment(text)?,
				Token::EndElement(name) => {
					let closed = builder.end_element(name)?;
					if let (Some(cb), Some(doc)) = (self.on_element_closed.as_mut(), builder.doc.as_ref()) {
						cb(doc, closed)?;
					}
				}
			}
		}
		let doc = builder.finish()?;
		tracing::debug!(nodes = doc.node_count(), "decoded document");
		Ok(doc)
	}
}

impl<'c> Default for Decoder<'c> {
	fn default() -> Self {
		Self::new()
	}
}

impl<'c> fmt::Debug for Decoder<'c> {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Decoder")
			.field("options", &self.options)
			.field("on_element_closed", &self.on_element_closed.is_some())
			.finish()
	}
}
