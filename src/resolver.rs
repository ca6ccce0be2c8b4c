/*!
# Namespace resolution

Converts [`RawToken`]s into [`Token`]s by replacing prefixes with namespace
URIs, following Namespaces in XML 1.0. Namespace declarations are consumed
here and never reach the tree.
*/
use std::collections::HashMap;

use crate::error::{NWFError, Result, WFError};
use crate::lexer::{Lexer, RawName, RawToken};
use crate::strings::{NCName, NamespaceName, QName, XMLNS_XML, XMLNS_XMLNS};
use crate::TokenRead;

const PREFIX_XML: &str = "xml";
const PREFIX_XMLNS: &str = "xmlns";

/**
# Namespace-resolved document token

This is the token stream the [`Decoder`](crate::Decoder) consumes. An empty
element (`<a/>`) is reported as a `StartElement` immediately followed by an
`EndElement`.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
	/// A start tag with its attributes in document order, without namespace
	/// declarations.
	StartElement(QName, Vec<(QName, String)>),
	/// Character data.
	CharData(String),
	/// A comment.
	Comment(String),
	/// An end tag; the name is resolved in the scope of the matching start
	/// tag.
	EndElement(QName),
}

struct Scope {
	default: Option<NamespaceName>,
	prefixes: HashMap<NCName, NamespaceName>,
}

/**
# Namespace/attribute resolver

Keeps the stack of in-scope namespace declarations. The resolver does not
check that start and end tags pair up; that is left to the consumer of the
tokens.
*/
pub struct NamespaceResolver {
	xml: NamespaceName,
	stack: Vec<Scope>,
	pending: Option<Token>,
}

impl NamespaceResolver {
	pub fn new() -> Self {
		Self {
			xml: XMLNS_XML.into(),
			stack: Vec::new(),
			pending: None,
		}
	}

	fn lookup(&self, prefix: &NCName) -> Result<NamespaceName> {
		if *prefix == PREFIX_XML {
			return Ok(self.xml.clone());
		}
		self.stack
			.iter()
			.rev()
			.find_map(|scope| scope.prefixes.get(prefix))
			.cloned()
			.ok_or_else(|| NWFError::UndeclaredNamespacePrefix(prefix.to_string()).into())
	}

	fn default_namespace(&self) -> Option<NamespaceName> {
		self.stack.last().and_then(|scope| scope.default.clone())
	}

	fn resolve_element_name(&self, name: RawName) -> Result<QName> {
		let namespace = match name.prefix.as_ref() {
			Some(prefix) => Some(self.lookup(prefix)?),
			None => self.default_namespace(),
		};
		Ok((namespace, name.local_name))
	}

	fn resolve_attribute_name(&self, name: RawName) -> Result<QName> {
		let namespace = match name.prefix.as_ref() {
			Some(prefix) => Some(self.lookup(prefix)?),
			None => None,
		};
		Ok((namespace, name.local_name))
	}

	/// Split namespace declarations off an attribute list and push the new
	/// scope.
	fn push_scope(&mut self, attributes: Vec<(RawName, String)>) -> Result<Vec<(RawName, String)>> {
		let mut scope = Scope {
			default: self.default_namespace(),
			prefixes: HashMap::new(),
		};
		let mut remaining = Vec::with_capacity(attributes.len());
		for (name, value) in attributes {
			let declares_prefix = name.prefix.as_ref().map(|prefix| *prefix == PREFIX_XMLNS);
			match declares_prefix {
				None if name.local_name == PREFIX_XMLNS => {
					if value == XMLNS_XML || value == XMLNS_XMLNS {
						return Err(NWFError::ReservedNamespacePrefix.into());
					}
					scope.default = if value.is_empty() {
						None
					} else {
						Some(value.into())
					};
				}
				Some(true) => {
					let bound = name.local_name;
					if bound == PREFIX_XMLNS || value == XMLNS_XMLNS {
						return Err(NWFError::ReservedNamespacePrefix.into());
					}
					if (bound == PREFIX_XML) != (value == XMLNS_XML) {
						return Err(NWFError::ReservedNamespacePrefix.into());
					}
					if value.is_empty() {
						return Err(NWFError::EmptyNamespaceUri.into());
					}
					if bound != PREFIX_XML {
						scope.prefixes.insert(bound, value.into());
					}
				}
				_ => remaining.push((name, value)),
			}
		}
		self.stack.push(scope);
		Ok(remaining)
	}

	/// Resolve a single raw token.
	///
	/// After resolving an empty element head, the matching end token is
	/// available from [`take_pending`](Self::take_pending).
	pub fn resolve(&mut self, token: RawToken) -> Result<Token> {
		match token {
			RawToken::ElementHead {
				name,
				attributes,
				empty,
			} => {
				let attributes = self.push_scope(attributes)?;
				let name = self.resolve_element_name(name)?;
				let mut resolved: Vec<(QName, String)> = Vec::with_capacity(attributes.len());
				for (attr_name, value) in attributes {
					let attr_name = self.resolve_attribute_name(attr_name)?;
					if resolved.iter().any(|(existing, _)| *existing == attr_name) {
						return Err(WFError::DuplicateAttribute.into());
					}
					resolved.push((attr_name, value));
				}
				if empty {
					self.stack.pop();
					self.pending = Some(Token::EndElement(name.clone()));
				}
				Ok(Token::StartElement(name, resolved))
			}
			RawToken::ElementFoot(name) => {
				let name = self.resolve_element_name(name)?;
				self.stack.pop();
				Ok(Token::EndElement(name))
			}
			RawToken::Text(text) => Ok(Token::CharData(text)),
			RawToken::Comment(text) => Ok(Token::Comment(text)),
		}
	}

	/// Take the synthesised end token of an empty element, if any.
	pub fn take_pending(&mut self) -> Option<Token> {
		self.pending.take()
	}
}

impl Default for NamespaceResolver {
	fn default() -> Self {
		Self::new()
	}
}

/// Lexer and resolver combined into a [`TokenRead`] over a string.
pub struct Tokens<'x> {
	lexer: Lexer<'x>,
	resolver: NamespaceResolver,
}

impl<'x> Tokens<'x> {
	pub fn new(input: &'x str) -> Self {
		Self {
			lexer: Lexer::new(input),
			resolver: NamespaceResolver::new(),
		}
	}
}

impl<'x> TokenRead for Tokens<'x> {
	fn read(&mut self) -> Result<Option<Token>> {
		if let Some(token) = self.resolver.take_pending() {
			return Ok(Some(token));
		}
		match self.lexer.lex()? {
			Some(raw) => self.resolver.resolve(raw).map(Some),
			None => Ok(None),
		}
	}
}
