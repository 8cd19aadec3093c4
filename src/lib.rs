//! # xmlschema-compiler
//!
//! An XML Schema 1.0 compiler. Schema documents are read into a component
//! model, resolved and checked, and lowered into a compact runtime schema: flat
//! ID-indexed tables of types, elements, attributes, content-model automata,
//! simple-type validators and identity constraints, ready for a streaming
//! validator.
//!
//! ## Pipeline
//!
//! 1. [`reader`] parses the documents into a [`schema::ParsedSchema`]
//! 2. [`semantic::validate_structure`] checks the local shape of components
//! 3. [`resolver::Resolver`] binds named type references
//! 4. [`semantic::validate_references`] enforces the cross-component rules
//! 5. [`pipeline::build_schema`] assigns IDs, checks cycles and UPA, compiles
//!    validators and builds the [`runtime::RuntimeSchema`]
//!
//! ## Example
//!
//! ```rust
//! use xmlschema_compiler::{compile_str, BuildConfig};
//!
//! let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
//!                         targetNamespace="urn:ex" xmlns="urn:ex">
//!   <xs:element name="qty">
//!     <xs:simpleType>
//!       <xs:restriction base="xs:int"><xs:minInclusive value="1"/></xs:restriction>
//!     </xs:simpleType>
//!   </xs:element>
//! </xs:schema>"#;
//!
//! let rt = compile_str(xsd, &BuildConfig::default())?;
//! let qty = rt.symbol("urn:ex", "qty").expect("interned");
//! assert!(rt.global_element(qty).is_some());
//! # Ok::<(), xmlschema_compiler::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod diagnostics;

// Names and documents
pub mod namespaces;
pub mod names;
pub mod documents;

// Component model
pub mod values;
pub mod schema;
pub mod reader;

// Semantic phases
pub mod resolver;
pub mod semantic;
pub mod registry;
pub mod schemacheck;

// Lowering
pub mod models;
pub mod xpath;
pub mod patterns;
pub mod compiler;
pub mod runtime;
pub mod builder;
pub mod pipeline;

pub use diagnostics::{Diagnostic, Severity};
pub use error::{Error, Result, Stage};
pub use limits::{BuildConfig, Limits};
pub use pipeline::{
    build_schema, compile_schema, compile_str, prepare_build_artifacts, CompiledSchema,
    PreparedArtifacts,
};
pub use runtime::RuntimeSchema;
pub use schema::ParsedSchema;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
