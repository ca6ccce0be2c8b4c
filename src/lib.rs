/*!
# Namespace-aware XML document object model

This crate provides an in-memory XML tree of elements, text and comments
with ordered children, ordered attributes, a per-document identifier index
and a round-trip encoder/decoder.

## Features (some call them restrictions)

* Nodes live in a per-document arena and are addressed by `Copy` handles
* Names are always stored as `(namespace URI, local name)`; prefixes are
  derived at encode time
* All namespace declarations are hoisted to the root element
* No DTD whatsoever, no custom entities
* UTF-8 only
* XML 1.0 only
* Synchronous; a document belongs to one writer at a time

## Example

```
use nsdom::{Document, EncodeOptions, Indent};

const SVG: &str = "http://www.w3.org/2000/svg";

let mut doc = Document::new("svg", SVG).unwrap();
let root = doc.root();
doc.set_attribute(root, "version", "", "1.1").unwrap();
let title = doc.create_element("title", SVG).unwrap();
let text = doc.create_text("Hello, World").unwrap();
doc.add_child(title, text).unwrap();
doc.add_child(root, title).unwrap();

let xml = doc
	.to_xml_string(&EncodeOptions::new().with_indent(Indent::TwoSpaces))
	.unwrap();
assert_eq!(
	xml,
	"<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">\n  <title>Hello, World</title>\n</svg>",
);

let copy = nsdom::Document::parse_str(&xml).unwrap();
assert_eq!(copy.text_content(copy.root()), "Hello, World");
```

## High-level usage

### Building trees

A [`Document`] is the only way to make nodes. Freshly created nodes are
detached; [`Document::add_child`] and [`Document::insert_child_before`]
attach them, and attaching an already attached node moves it.

### Decoding

[`Document::parse_str`] covers the common case. The [`Decoder`] can
additionally run a callback for each closed element, for instance to
validate the tree as it is being built, and can consume any [`TokenRead`]
source instead of text.

### Encoding

[`Document::to_xml_string`] and [`Document::encode`] write the tree using
[`EncodeOptions`] for the XML declaration and indentation.
*/
pub mod dom;
pub mod error;
pub mod lexer;
pub mod reader;
pub mod resolver;
pub mod selectors;
pub mod strings;
pub mod writer;


#[doc(inline)]
pub use dom::{Attribute, Document, Element, Node, NodeId};
#[doc(inline)]
pub use error::{Error, NWFError, Result, WFError};
#[doc(inline)]
pub use reader::{DecodeOptions, Decoder};
#[doc(inline)]
pub use resolver::Token;
#[doc(inline)]
pub use strings::{NCName, NamespaceName, QName, XMLNS_XML, XMLNS_XMLNS};
#[doc(inline)]
pub use writer::{EncodeOptions, Encoder, Indent};

/**
# Source of namespace-resolved tokens

Implemented by the in-crate [`resolver::Tokens`] and by a vector of
[`Token`]s, so that synthetic streams can be fed to the [`Decoder`].
*/
pub trait TokenRead {
	/// Read a single token.
	///
	/// At the end of the stream, `None` is returned.
	fn read(&mut self) -> Result<Option<Token>>;

	/// Read all tokens and pass them to `cb`.
	///
	/// The first error, from the source or from `cb`, is returned.
	fn read_all<F>(&mut self, mut cb: F) -> Result<()>
	where
		F: FnMut(Token) -> Result<()>,
	{
		loop {
			match self.read()? {
				None => return Ok(()),
				Some(token) => cb(token)?,
			}
		}
	}
}

impl TokenRead for std::vec::IntoIter<Token> {
	fn read(&mut self) -> Result<Option<Token>> {
		Ok(self.next())
	}
}
