//! Shared types for the header reflector: tokens, spans, the type tree, scopes, and errors.

pub mod error;
pub mod scope;
pub mod span;
pub mod specifiers;
pub mod token;
pub mod type_node;

pub use error::ParseError;
pub use scope::{AccessControl, Scope, ScopeKind};
pub use span::{LineIndex, Span};
pub use specifiers::{Signedness, Size, Specifiers};
pub use token::{Comment, ConstKind, ConstValue, Token, TokenKind};
pub use type_node::{Argument, TypeKind, TypeNode, TypeNodeData};
