//! Schema compilation pipeline
//!
//! [`build_schema`] takes a resolved [`ParsedSchema`] through ID assignment,
//! reference binding, cycle and UPA checks, validator compilation and runtime
//! table construction. [`compile_schema`] adds the reader and the semantic
//! phases in front of it.
//!
//! ```
//! use xmlschema_compiler::limits::BuildConfig;
//! use xmlschema_compiler::pipeline::compile_str;
//!
//! let rt = compile_str(
//!     r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!          <xs:element name="note" type="xs:string"/>
//!        </xs:schema>"#,
//!     &BuildConfig::default(),
//! )
//! .unwrap();
//! assert_ne!(rt.build_hash, 0);
//! ```

use std::sync::Arc;

use crate::builder::{build_runtime, BuildInput};
use crate::compiler::{compile_validators, ValidatorsBundle};
use crate::diagnostics::Diagnostic;
use crate::error::{Result, Stage};
use crate::limits::BuildConfig;
use crate::patterns::{RegexCompiler, XsdRegexCompiler};
use crate::reader::read_schemas;
use crate::registry::{
    assign_ids, build_ancestors, resolve_references, Ancestors, Registry, ResolvedReferences,
};
use crate::resolver::{ResolvePolicy, Resolver};
use crate::runtime::RuntimeSchema;
use crate::schema::{ParsedSchema, Phase};
use crate::schemacheck::{detect_cycles, validate_upa};
use crate::semantic::{validate_references, validate_structure};
use crate::xpath::{DefaultPathCompiler, PathCompiler};

/// Immutable snapshot of everything a runtime build reads
///
/// Cloning the handle is cheap. [`PreparedArtifacts::build`] only reads the
/// snapshot, so one handle may serve concurrent builds with different
/// configurations.
#[derive(Clone)]
pub struct PreparedArtifacts {
    inner: Arc<Snapshot>,
    paths: Arc<dyn PathCompiler>,
}

struct Snapshot {
    schema: ParsedSchema,
    registry: Registry,
    refs: ResolvedReferences,
    ancestors: Ancestors,
    validators: ValidatorsBundle,
}

impl std::fmt::Debug for PreparedArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedArtifacts")
            .field("types", &self.inner.registry.type_count())
            .field("elements", &self.inner.registry.element_order.len())
            .field("attributes", &self.inner.registry.attribute_order.len())
            .finish()
    }
}

impl PreparedArtifacts {
    /// Use another selector and field compiler for later builds
    pub fn with_path_compiler(mut self, paths: Arc<dyn PathCompiler>) -> Self {
        self.paths = paths;
        self
    }

    /// Schema the snapshot was taken from
    pub fn schema(&self) -> &ParsedSchema {
        &self.inner.schema
    }

    /// Component IDs of the snapshot
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Build a runtime schema from the snapshot
    pub fn build(&self, config: &BuildConfig) -> Result<RuntimeSchema> {
        let s = &*self.inner;
        build_runtime(
            BuildInput {
                schema: &s.schema,
                registry: &s.registry,
                refs: &s.refs,
                ancestors: &s.ancestors,
                validators: &s.validators,
                paths: self.paths.as_ref(),
            },
            config,
        )
        .map_err(|e| e.in_stage(Stage::BuildRuntime))
    }
}

/// Snapshot a resolved schema and its bindings for repeated builds
///
/// Runs the same cycle and UPA checks as [`build_schema`], so a schema that
/// `build_schema` rejects cannot be prepared either.
pub fn prepare_build_artifacts(
    parsed: &ParsedSchema,
    registry: &Registry,
    refs: &ResolvedReferences,
) -> Result<PreparedArtifacts> {
    prepare_with(parsed, registry, refs, &XsdRegexCompiler)
}

/// Like [`prepare_build_artifacts`], with a caller-supplied pattern compiler
pub fn prepare_with(
    parsed: &ParsedSchema,
    registry: &Registry,
    refs: &ResolvedReferences,
    regex: &dyn RegexCompiler,
) -> Result<PreparedArtifacts> {
    parsed.require_phase(Phase::Resolved)?;
    detect_cycles(parsed).map_err(|e| e.in_stage(Stage::DetectCycles))?;
    validate_upa(parsed, registry, refs).map_err(|e| e.in_stage(Stage::ValidateUpa))?;
    let validators =
        compile_validators(parsed, registry, regex).map_err(|e| e.in_stage(Stage::CompileValidators))?;
    let ancestors =
        build_ancestors(parsed, registry).map_err(|e| e.in_stage(Stage::BuildRuntime))?;
    Ok(PreparedArtifacts {
        inner: Arc::new(Snapshot {
            schema: parsed.clone(),
            registry: registry.clone(),
            refs: refs.clone(),
            ancestors,
            validators,
        }),
        paths: Arc::new(DefaultPathCompiler),
    })
}

/// Build the runtime schema of a resolved schema
///
/// Every failure is wrapped with the stage that raised it; use
/// [`Error::root_cause`](crate::error::Error::root_cause) to match the
/// underlying category.
pub fn build_schema(parsed: &ParsedSchema, config: &BuildConfig) -> Result<RuntimeSchema> {
    parsed.require_phase(Phase::Resolved)?;
    let registry = assign_ids(parsed).map_err(|e| e.in_stage(Stage::AssignIds))?;
    let refs =
        resolve_references(parsed, &registry).map_err(|e| e.in_stage(Stage::ResolveReferences))?;
    detect_cycles(parsed).map_err(|e| e.in_stage(Stage::DetectCycles))?;
    validate_upa(parsed, &registry, &refs).map_err(|e| e.in_stage(Stage::ValidateUpa))?;

    let validators = compile_validators(parsed, &registry, &XsdRegexCompiler)
        .map_err(|e| e.in_stage(Stage::CompileValidators))?;
    let ancestors =
        build_ancestors(parsed, &registry).map_err(|e| e.in_stage(Stage::BuildRuntime))?;
    build_runtime(
        BuildInput {
            schema: parsed,
            registry: &registry,
            refs: &refs,
            ancestors: &ancestors,
            validators: &validators,
            paths: &DefaultPathCompiler,
        },
        config,
    )
    .map_err(|e| e.in_stage(Stage::BuildRuntime))
}

/// A compiled schema with the non-fatal findings of its semantic phases
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    /// Runtime tables
    pub runtime: RuntimeSchema,
    /// Warnings collected while resolving and checking references
    pub diagnostics: Vec<Diagnostic>,
}

/// Read, check and build schema documents given as `(location, text)` pairs;
/// the first document is the main one
pub fn compile_schema(sources: &[(&str, &str)], config: &BuildConfig) -> Result<CompiledSchema> {
    let mut schema = read_schemas(sources)?;
    validate_structure(&mut schema).map_err(|e| e.in_stage(Stage::Structure))?;
    let mut diagnostics = Resolver::new(&mut schema, ResolvePolicy::Required)
        .resolve()
        .map_err(|e| e.in_stage(Stage::Resolve))?;
    diagnostics
        .extend(validate_references(&schema).map_err(|e| e.in_stage(Stage::Semantic))?);
    let runtime = build_schema(&schema, config)?;
    Ok(CompiledSchema {
        runtime,
        diagnostics,
    })
}

/// Compile a single schema document
pub fn compile_str(xsd: &str, config: &BuildConfig) -> Result<RuntimeSchema> {
    compile_schema(&[("schema.xsd", xsd)], config).map(|c| c.runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reader::read_schema;
    use crate::registry::tests::resolved;

    const ORDER: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns:tns="urn:t" targetNamespace="urn:t" elementFormDefault="qualified">
          <xs:element name="order">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="line" maxOccurs="unbounded" type="tns:Line"/>
              </xs:sequence>
              <xs:attribute name="id" type="xs:ID" use="required"/>
            </xs:complexType>
          </xs:element>
          <xs:complexType name="Line">
            <xs:attribute name="qty" type="xs:positiveInteger"/>
          </xs:complexType>
        </xs:schema>"#;

    #[test]
    fn test_compile_str() {
        let rt = compile_str(ORDER, &BuildConfig::default()).unwrap();
        assert_ne!(rt.build_hash, 0);
        assert_eq!(rt.build_hash, rt.compute_hash());
        let order = rt.symbol("urn:t", "order").unwrap();
        assert!(rt.global_element(order).is_some());
        let line = rt.symbol("urn:t", "Line").unwrap();
        assert!(rt.global_type(line).is_some());
    }

    #[test]
    fn test_builds_are_deterministic() {
        let a = compile_str(ORDER, &BuildConfig::default()).unwrap();
        let b = compile_str(ORDER, &BuildConfig::default()).unwrap();
        assert_eq!(a.build_hash, b.build_hash);
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_requires_resolved_schema() {
        let schema = read_schema(ORDER, "order.xsd").unwrap();
        let err = build_schema(&schema, &BuildConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Phase {
                expected: Phase::Resolved,
                found: Phase::Parsed
            }
        ));
    }

    #[test]
    fn test_upa_failure_names_stage() {
        let schema = resolved(
            r#"<xs:complexType name="T">
                 <xs:sequence><xs:element name="a" minOccurs="0"/><xs:element name="a"/></xs:sequence>
               </xs:complexType>"#,
        );
        let err = build_schema(&schema, &BuildConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::BuildStage {
                stage: Stage::ValidateUpa,
                ..
            }
        ));
        assert!(matches!(err.root_cause(), Error::Constraint(_)));
    }

    #[test]
    fn test_prepare_rejects_ambiguous_model() {
        let schema = resolved(
            r#"<xs:complexType name="T">
                 <xs:choice><xs:element name="a"/><xs:element name="a"/></xs:choice>
               </xs:complexType>"#,
        );
        let registry = assign_ids(&schema).unwrap();
        let refs = resolve_references(&schema, &registry).unwrap();
        let err = prepare_build_artifacts(&schema, &registry, &refs).unwrap_err();
        assert!(matches!(
            err,
            Error::BuildStage {
                stage: Stage::ValidateUpa,
                ..
            }
        ));
        assert!(build_schema(&schema, &BuildConfig::default()).is_err());
    }

    #[test]
    fn test_prepared_artifacts_build_concurrently() {
        let schema = resolved(
            r#"<xs:element name="e"><xs:complexType><xs:sequence>
                 <xs:element name="a" type="xs:int" maxOccurs="5"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        );
        let registry = assign_ids(&schema).unwrap();
        let refs = resolve_references(&schema, &registry).unwrap();
        let prepared = prepare_build_artifacts(&schema, &registry, &refs).unwrap();
        let expected = build_schema(&schema, &BuildConfig::default()).unwrap();

        let hashes: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let prepared = prepared.clone();
                    scope.spawn(move || prepared.build(&BuildConfig::default()).unwrap().build_hash)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(hashes.iter().all(|h| *h == expected.build_hash));
    }

    #[test]
    fn test_prepared_artifacts_honor_each_config() {
        let schema = resolved(
            r#"<xs:complexType name="T"><xs:sequence>
                 <xs:element name="a" maxOccurs="50"/>
               </xs:sequence></xs:complexType>"#,
        );
        let registry = assign_ids(&schema).unwrap();
        let refs = resolve_references(&schema, &registry).unwrap();
        let prepared = prepare_build_artifacts(&schema, &registry, &refs).unwrap();
        let first = prepared.build(&BuildConfig::default()).unwrap();
        let swapped = prepared
            .clone()
            .with_path_compiler(Arc::new(DefaultPathCompiler))
            .build(&BuildConfig::default())
            .unwrap();
        assert_eq!(first.build_hash, swapped.build_hash);
        let err = prepared
            .build(&BuildConfig::default().with_max_occurs_limit(10))
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::OccursTooLarge { value: 50, limit: 10 }
        ));
    }

    #[test]
    fn test_compile_schema_wraps_semantic_errors() {
        let err = compile_str(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="e" type="missing"/>
               </xs:schema>"#,
            &BuildConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::BuildStage { .. }));
    }
}
