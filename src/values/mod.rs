//! Simple-type value engine
//!
//! Lexical parsing, canonicalization, value keys and value-space ordering for
//! every XSD 1.0 primitive datatype.

pub mod atomic;
pub mod binary;
pub mod decimal;
pub mod duration;
pub mod float;
pub mod key;
pub mod qname;
pub mod strings;
pub mod temporal;
pub mod uri;
pub mod whitespace;

pub use atomic::{Primitive, Value};
pub use decimal::{Dec, Int};
pub use duration::Duration;
pub use key::ValueKey;
pub use strings::{IntegerKind, StringKind};
pub use temporal::{Temporal, TemporalKind};
pub use whitespace::WhiteSpace;
