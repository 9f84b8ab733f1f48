//! # infra-forge-core
//!
//! Shared foundations of the infra-forge compiler:
//! - byte spans, 1-based positions and a line index for converting between them
//! - the `Diagnostic` record every pass reports problems with
//! - the expression engine for the target format's embedded mini-language
//!
//! # Example
//!
//! ```
//! use infra_forge_core::expression::{is_language_expression, parse_language_expression};
//!
//! let text = "[concat('hello ', parameters('name'))]";
//! assert!(is_language_expression(text));
//!
//! let expr = parse_language_expression(text, None).expect("parse failed");
//! assert_eq!(expr.to_string(), "concat('hello ', parameters('name'))");
//! ```

pub mod diagnostic;
pub mod error;
pub mod expression;
pub mod span;

pub use diagnostic::{has_errors, Diagnostic, DiagnosticKind, Severity};
pub use error::{ErrorInfo, ExpressionError, LexicalErrorKind};
pub use span::{LineIndex, Position, Span};
