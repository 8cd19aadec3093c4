//! XSD document reading
//!
//! Reads one or more schema documents, supplied as text with a location
//! string, into a single [`ParsedSchema`]. Nothing is fetched: `include`
//! targets must be among the supplied documents, and `import` only records
//! which namespaces a document may reference.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::namespaces::{QName, XSD_NAMESPACE};
use crate::schema::particles::parse_occurs;
use crate::schema::{
    AttrHandle, AttributeDecl, AttributeGroup, AttributeUse, ComplexContent, ComplexTypeDef,
    Compositor, ConstraintCategory, Content, DerivationMethod, DerivationSet, ElemHandle,
    ElementDecl, FacetDecl, FacetKind, Form, IdentityConstraint, ModelGroup, NamespaceConstraint,
    NotationDecl, ParsedSchema, Particle, ProcessContents, SimpleContent, SimpleDerivation,
    SimpleTypeDef, Term, TypeDef, TypeRef, Wildcard,
};

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const RESTRICTION: &str = "restriction";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const NOTATION: &str = "notation";
    pub const SELECTOR: &str = "selector";
    pub const FIELD: &str = "field";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const BLOCK_DEFAULT: &str = "blockDefault";
    pub const FINAL_DEFAULT: &str = "finalDefault";
    pub const NILLABLE: &str = "nillable";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const FORM: &str = "form";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const ABSTRACT: &str = "abstract";
    pub const BLOCK: &str = "block";
    pub const FINAL: &str = "final";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const NAMESPACE: &str = "namespace";
    pub const PROCESS_CONTENTS: &str = "processContents";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const PUBLIC: &str = "public";
    pub const SYSTEM: &str = "system";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const USE: &str = "use";
    pub const XPATH: &str = "xpath";
    pub const REFER: &str = "refer";
}

fn element_block_set() -> DerivationSet {
    DerivationSet::EXTENSION
        .union(DerivationSet::RESTRICTION)
        .union(DerivationSet::SUBSTITUTION)
}

fn complex_set() -> DerivationSet {
    DerivationSet::EXTENSION.union(DerivationSet::RESTRICTION)
}

fn simple_final_set() -> DerivationSet {
    DerivationSet::RESTRICTION
        .union(DerivationSet::LIST)
        .union(DerivationSet::UNION)
}

fn intersect(a: DerivationSet, allowed: DerivationSet) -> DerivationSet {
    let mut out = DerivationSet::empty();
    for m in [
        DerivationSet::EXTENSION,
        DerivationSet::RESTRICTION,
        DerivationSet::LIST,
        DerivationSet::UNION,
        DerivationSet::SUBSTITUTION,
    ] {
        if a.contains(m) && allowed.contains(m) {
            out = out.union(m);
        }
    }
    out
}

fn parse_bool(elem: &Element, attr: &str) -> Result<bool> {
    match elem.get_attribute(attr).map(str::trim) {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(Error::lexical("boolean", other)),
    }
}

fn is_xsd(elem: &Element, local: &str) -> bool {
    elem.namespace() == XSD_NAMESPACE && elem.local_name() == local
}

fn xsd_children(elem: &Element) -> impl Iterator<Item = &Element> {
    elem.children
        .iter()
        .filter(|c| c.namespace() == XSD_NAMESPACE && c.local_name() != xsd_elements::ANNOTATION)
}

fn missing(what: &str, on: &str) -> Error {
    ParseError::new(format!("{} missing '{}' attribute", on, what)).into()
}

/// Per-document reading context
#[derive(Debug, Clone)]
struct DocContext {
    location: String,
    target_namespace: String,
    chameleon: bool,
    element_form: Form,
    attribute_form: Form,
    block_default: DerivationSet,
    final_default: DerivationSet,
}

/// Reads schema documents into a [`ParsedSchema`]
pub struct SchemaReader {
    schema: ParsedSchema,
    documents: Vec<Document>,
    visited: HashSet<(String, String)>,
}

impl SchemaReader {
    /// Parse the supplied `(location, text)` documents; the first is the main one
    pub fn new(sources: &[(&str, &str)]) -> Result<Self> {
        if sources.is_empty() {
            return Err(ParseError::new("no schema documents supplied").into());
        }
        let mut documents = Vec::with_capacity(sources.len());
        for (location, text) in sources {
            let doc = Document::from_string(text, *location).map_err(|e| match e {
                Error::Parse(p) => Error::Parse(p.with_location(*location)),
                other => other,
            })?;
            if !is_xsd(&doc.root, xsd_elements::SCHEMA) {
                return Err(ParseError::new(format!(
                    "root element '{}' is not xs:schema",
                    doc.root.qname
                ))
                .with_location(*location)
                .into());
            }
            documents.push(doc);
        }
        let main_tns = documents[0]
            .root
            .get_attribute(xsd_attrs::TARGET_NAMESPACE)
            .unwrap_or("")
            .to_string();
        Ok(Self {
            schema: ParsedSchema::new(main_tns),
            documents,
            visited: HashSet::new(),
        })
    }

    /// Read every document, following includes
    pub fn read(mut self) -> Result<ParsedSchema> {
        let included = self.included_indices();
        let mut queue: VecDeque<usize> = (0..self.documents.len())
            .filter(|i| *i == 0 || !included.contains(i))
            .collect();
        while let Some(index) = queue.pop_front() {
            self.read_document(index, None)?;
        }
        let main = &self.documents[0].root;
        if let Some(v) = main.get_attribute(xsd_attrs::ELEMENT_FORM_DEFAULT) {
            self.schema.element_form_default = Form::from_attr(v).unwrap_or_default();
        }
        if let Some(v) = main.get_attribute(xsd_attrs::ATTRIBUTE_FORM_DEFAULT) {
            self.schema.attribute_form_default = Form::from_attr(v).unwrap_or_default();
        }
        if let Some(v) = main.get_attribute(xsd_attrs::BLOCK_DEFAULT) {
            self.schema.block_default = DerivationSet::parse(v, element_block_set())?;
        }
        if let Some(v) = main.get_attribute(xsd_attrs::FINAL_DEFAULT) {
            self.schema.final_default =
                DerivationSet::parse(v, complex_set().union(simple_final_set()))?;
        }
        Ok(self.schema)
    }

    fn find_document(&self, schema_location: &str) -> Option<usize> {
        let loc = schema_location.trim();
        self.documents.iter().position(|d| {
            d.location == loc
                || d.location.ends_with(&format!("/{}", loc))
                || loc.ends_with(&format!("/{}", d.location))
        })
    }

    fn included_indices(&self) -> HashSet<usize> {
        let mut out = HashSet::new();
        for doc in &self.documents {
            for child in xsd_children(&doc.root) {
                if child.local_name() == xsd_elements::INCLUDE {
                    if let Some(i) = child
                        .get_attribute(xsd_attrs::SCHEMA_LOCATION)
                        .and_then(|l| self.find_document(l))
                    {
                        out.insert(i);
                    }
                }
            }
        }
        out
    }

    fn read_document(&mut self, index: usize, includer_tns: Option<&str>) -> Result<()> {
        let root = self.documents[index].root.clone();
        let location = self.documents[index].location.clone();
        let declared_tns = root.get_attribute(xsd_attrs::TARGET_NAMESPACE).map(str::to_string);
        let (target_namespace, chameleon) = match (declared_tns, includer_tns) {
            (Some(tns), Some(outer)) if tns != outer => {
                return Err(ParseError::new(format!(
                    "included document targetNamespace '{}' differs from '{}'",
                    tns, outer
                ))
                .with_location(location)
                .into());
            }
            (Some(tns), _) => (tns, false),
            (None, Some(outer)) => (outer.to_string(), !outer.is_empty()),
            (None, None) => (String::new(), false),
        };
        if !self
            .visited
            .insert((location.clone(), target_namespace.clone()))
        {
            return Ok(());
        }

        let form = |attr: &str| -> Form {
            root.get_attribute(attr)
                .and_then(Form::from_attr)
                .unwrap_or_default()
        };
        let ctx = DocContext {
            location: location.clone(),
            target_namespace: target_namespace.clone(),
            chameleon,
            element_form: form(xsd_attrs::ELEMENT_FORM_DEFAULT),
            attribute_form: form(xsd_attrs::ATTRIBUTE_FORM_DEFAULT),
            block_default: match root.get_attribute(xsd_attrs::BLOCK_DEFAULT) {
                Some(v) => DerivationSet::parse(v, element_block_set())?,
                None => DerivationSet::empty(),
            },
            final_default: match root.get_attribute(xsd_attrs::FINAL_DEFAULT) {
                Some(v) => DerivationSet::parse(v, complex_set().union(simple_final_set()))?,
                None => DerivationSet::empty(),
            },
        };

        let context = self
            .schema
            .import_contexts
            .entry(location.clone())
            .or_default();
        context.target_namespace = target_namespace.clone();
        self.schema
            .imported_namespaces
            .entry(target_namespace.clone())
            .or_default();

        for child in xsd_children(&root) {
            self.read_schema_child(&ctx, child)
                .map_err(|e| annotate(e, &location))?;
        }
        Ok(())
    }

    fn read_schema_child(&mut self, ctx: &DocContext, elem: &Element) -> Result<()> {
        match elem.local_name() {
            xsd_elements::ELEMENT => self.read_global_element(ctx, elem),
            xsd_elements::COMPLEX_TYPE => {
                let name = self.global_name(ctx, elem, "complexType")?;
                let def = self.read_complex_type(ctx, elem, Some(name.clone()))?;
                self.schema.add_global_type(name, def, &ctx.location);
                Ok(())
            }
            xsd_elements::SIMPLE_TYPE => {
                let name = self.global_name(ctx, elem, "simpleType")?;
                let def = self.read_simple_type(ctx, elem, Some(name.clone()))?;
                self.schema.add_global_type(name, def, &ctx.location);
                Ok(())
            }
            xsd_elements::ATTRIBUTE => {
                let name = self.global_name(ctx, elem, "attribute")?;
                let decl = self.read_attribute_body(ctx, elem, name)?;
                self.schema.add_global_attribute(decl, &ctx.location);
                Ok(())
            }
            xsd_elements::ATTRIBUTE_GROUP => {
                let name = self.global_name(ctx, elem, "attributeGroup")?;
                let mut group = AttributeGroup {
                    name,
                    ..Default::default()
                };
                self.read_attribute_children(
                    ctx,
                    elem,
                    &mut group.attributes,
                    &mut group.attribute_group_refs,
                    &mut group.any_attribute,
                )?;
                self.schema.add_attribute_group(group, &ctx.location);
                Ok(())
            }
            xsd_elements::GROUP => {
                let name = self.global_name(ctx, elem, "group")?;
                let model = xsd_children(elem)
                    .find(|c| Compositor::from_local_name(c.local_name()).is_some())
                    .ok_or_else(|| {
                        Error::from(ParseError::new(format!(
                            "group '{}' has no model group",
                            name
                        )))
                    })?;
                let group = self.read_model_group(ctx, model)?;
                self.schema.add_group(name, group, &ctx.location);
                Ok(())
            }
            xsd_elements::NOTATION => {
                let name = self.global_name(ctx, elem, "notation")?;
                self.schema.add_notation(NotationDecl {
                    name,
                    public: elem.get_attribute(xsd_attrs::PUBLIC).map(str::to_string),
                    system: elem.get_attribute(xsd_attrs::SYSTEM).map(str::to_string),
                });
                Ok(())
            }
            xsd_elements::IMPORT => {
                let namespace = elem
                    .get_attribute(xsd_attrs::NAMESPACE)
                    .unwrap_or("")
                    .to_string();
                if namespace == ctx.target_namespace && !namespace.is_empty() {
                    return Err(ParseError::new(format!(
                        "import of namespace '{}' from a document with the same target namespace",
                        namespace
                    ))
                    .into());
                }
                self.schema
                    .import_contexts
                    .entry(ctx.location.clone())
                    .or_default()
                    .imports
                    .insert(namespace.clone());
                self.schema
                    .imported_namespaces
                    .entry(ctx.target_namespace.clone())
                    .or_default()
                    .insert(namespace);
                Ok(())
            }
            xsd_elements::INCLUDE => {
                let location = elem
                    .get_attribute(xsd_attrs::SCHEMA_LOCATION)
                    .ok_or_else(|| missing(xsd_attrs::SCHEMA_LOCATION, "include"))?;
                match self.find_document(location) {
                    Some(index) => {
                        let tns = ctx.target_namespace.clone();
                        self.read_document(index, Some(&tns))
                    }
                    None => Err(ParseError::new(format!(
                        "included document '{}' was not supplied",
                        location
                    ))
                    .into()),
                }
            }
            xsd_elements::REDEFINE => {
                Err(ParseError::new("xs:redefine is not supported").into())
            }
            other => Err(ParseError::new(format!("unexpected schema child element '{}'", other)).into()),
        }
    }

    fn global_name(&self, ctx: &DocContext, elem: &Element, what: &str) -> Result<QName> {
        let name = elem
            .get_attribute(xsd_attrs::NAME)
            .ok_or_else(|| missing(xsd_attrs::NAME, &format!("global {}", what)))?;
        Ok(QName::new(ctx.target_namespace.clone(), name.trim()))
    }

    fn local_name(&self, ctx: &DocContext, elem: &Element, default_form: Form) -> Result<QName> {
        let name = elem
            .get_attribute(xsd_attrs::NAME)
            .ok_or_else(|| missing(xsd_attrs::NAME, elem.local_name()))?;
        let form = match elem.get_attribute(xsd_attrs::FORM) {
            Some(v) => Form::from_attr(v).ok_or_else(|| Error::lexical("form", v))?,
            None => default_form,
        };
        let namespace = match form {
            Form::Qualified => ctx.target_namespace.clone(),
            Form::Unqualified => String::new(),
        };
        Ok(QName::new(namespace, name.trim()))
    }

    /// Resolve a QName-valued attribute, applying chameleon namespace adoption
    fn qname_ref(&self, ctx: &DocContext, elem: &Element, value: &str) -> Result<QName> {
        let mut q = elem.resolve_qname(value)?;
        if ctx.chameleon && q.namespace.is_empty() {
            q.namespace = ctx.target_namespace.clone();
        }
        Ok(q)
    }

    fn type_attr(&self, ctx: &DocContext, elem: &Element, attr: &str) -> Result<Option<TypeRef>> {
        elem.get_attribute(attr)
            .map(|v| self.qname_ref(ctx, elem, v).map(TypeRef::named))
            .transpose()
    }

    fn read_global_element(&mut self, ctx: &DocContext, elem: &Element) -> Result<()> {
        let name = self.global_name(ctx, elem, "element")?;
        let mut decl = self.read_element_body(ctx, elem, name)?;
        if let Some(head) = elem.get_attribute(xsd_attrs::SUBSTITUTION_GROUP) {
            decl.substitution_group = Some(self.qname_ref(ctx, elem, head)?);
        }
        decl.is_abstract = parse_bool(elem, xsd_attrs::ABSTRACT)?;
        decl.final_set = match elem.get_attribute(xsd_attrs::FINAL) {
            Some(v) => DerivationSet::parse(v, complex_set())?,
            None => intersect(ctx.final_default, complex_set()),
        };
        self.schema.add_global_element(decl, &ctx.location);
        Ok(())
    }

    fn read_element_body(
        &mut self,
        ctx: &DocContext,
        elem: &Element,
        name: QName,
    ) -> Result<ElementDecl> {
        let mut decl = ElementDecl::new(name);
        decl.namespaces = Arc::clone(&elem.namespaces);
        decl.type_ref = self.type_attr(ctx, elem, xsd_attrs::TYPE)?;
        for child in xsd_children(elem) {
            match child.local_name() {
                xsd_elements::COMPLEX_TYPE | xsd_elements::SIMPLE_TYPE => {
                    if decl.type_ref.is_some() {
                        return Err(ParseError::new(format!(
                            "element '{}' has both a type attribute and an inline type",
                            decl.name
                        ))
                        .into());
                    }
                    let def = if child.local_name() == xsd_elements::COMPLEX_TYPE {
                        self.read_complex_type(ctx, child, None)?
                    } else {
                        self.read_simple_type(ctx, child, None)?
                    };
                    let id = self.schema.add_type(def, &ctx.location);
                    decl.type_ref = Some(TypeRef::Inline(id));
                }
                kind => {
                    if let Some(category) = ConstraintCategory::from_local_name(kind) {
                        let ic = self.read_identity_constraint(ctx, child, category)?;
                        decl.constraints.push(ic);
                    }
                }
            }
        }
        decl.default = elem.get_attribute(xsd_attrs::DEFAULT).map(str::to_string);
        decl.fixed = elem.get_attribute(xsd_attrs::FIXED).map(str::to_string);
        decl.nillable = parse_bool(elem, xsd_attrs::NILLABLE)?;
        decl.block = match elem.get_attribute(xsd_attrs::BLOCK) {
            Some(v) => DerivationSet::parse(v, element_block_set())?,
            None => intersect(ctx.block_default, element_block_set()),
        };
        Ok(decl)
    }

    fn read_identity_constraint(
        &self,
        ctx: &DocContext,
        elem: &Element,
        category: ConstraintCategory,
    ) -> Result<IdentityConstraint> {
        let name = self.global_name(ctx, elem, &category.to_string())?;
        let mut selector = None;
        let mut fields = Vec::new();
        for child in xsd_children(elem) {
            let xpath = || {
                child
                    .get_attribute(xsd_attrs::XPATH)
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| missing(xsd_attrs::XPATH, child.local_name()))
            };
            match child.local_name() {
                xsd_elements::SELECTOR => selector = Some(xpath()?),
                xsd_elements::FIELD => fields.push(xpath()?),
                _ => {}
            }
        }
        let selector = selector.ok_or_else(|| {
            Error::from(ParseError::new(format!("{} '{}' has no selector", category, name)))
        })?;
        let refer = match category {
            ConstraintCategory::Keyref => {
                let r = elem
                    .get_attribute(xsd_attrs::REFER)
                    .ok_or_else(|| missing(xsd_attrs::REFER, "keyref"))?;
                Some(self.qname_ref(ctx, elem, r)?)
            }
            _ => None,
        };
        Ok(IdentityConstraint {
            category,
            name,
            selector,
            fields,
            refer,
            namespaces: Arc::clone(&elem.namespaces),
        })
    }

    fn read_simple_type(
        &mut self,
        ctx: &DocContext,
        elem: &Element,
        name: Option<QName>,
    ) -> Result<TypeDef> {
        let derivation_elem = xsd_children(elem)
            .find(|c| {
                matches!(
                    c.local_name(),
                    xsd_elements::RESTRICTION | xsd_elements::LIST | xsd_elements::UNION
                )
            })
            .ok_or_else(|| {
                Error::from(ParseError::new(
                    "simpleType needs a restriction, list or union child",
                ))
            })?;
        let derivation = match derivation_elem.local_name() {
            xsd_elements::RESTRICTION => {
                let (base, facets) = self.read_simple_restriction(ctx, derivation_elem)?;
                let base = base.ok_or_else(|| {
                    Error::from(ParseError::new(
                        "restriction needs a base attribute or an inline simpleType",
                    ))
                })?;
                SimpleDerivation::Restriction { base, facets }
            }
            xsd_elements::LIST => {
                let mut item = self.type_attr(ctx, derivation_elem, xsd_attrs::ITEM_TYPE)?;
                if let Some(inline) = xsd_children(derivation_elem)
                    .find(|c| c.local_name() == xsd_elements::SIMPLE_TYPE)
                {
                    if item.is_some() {
                        return Err(ParseError::new(
                            "list has both an itemType attribute and an inline simpleType",
                        )
                        .into());
                    }
                    let def = self.read_simple_type(ctx, inline, None)?;
                    item = Some(TypeRef::Inline(self.schema.add_type(def, &ctx.location)));
                }
                let item = item.ok_or_else(|| {
                    Error::from(ParseError::new("list needs an item type"))
                })?;
                SimpleDerivation::List { item }
            }
            _ => {
                let mut members = Vec::new();
                if let Some(list) = derivation_elem.get_attribute(xsd_attrs::MEMBER_TYPES) {
                    for token in list.split_whitespace() {
                        members.push(TypeRef::named(self.qname_ref(ctx, derivation_elem, token)?));
                    }
                }
                for inline in xsd_children(derivation_elem)
                    .filter(|c| c.local_name() == xsd_elements::SIMPLE_TYPE)
                {
                    let def = self.read_simple_type(ctx, inline, None)?;
                    members.push(TypeRef::Inline(self.schema.add_type(def, &ctx.location)));
                }
                if members.is_empty() {
                    return Err(ParseError::new("union has no member types").into());
                }
                SimpleDerivation::Union { members }
            }
        };
        let final_set = match elem.get_attribute(xsd_attrs::FINAL) {
            Some(v) => DerivationSet::parse(v, simple_final_set())?,
            None => intersect(ctx.final_default, simple_final_set()),
        };
        Ok(TypeDef::simple(
            name,
            SimpleTypeDef {
                derivation,
                final_set,
                variety: None,
                white_space: None,
            },
        ))
    }

    /// Base and facets of a simple restriction; the base may be an inline type
    fn read_simple_restriction(
        &mut self,
        ctx: &DocContext,
        elem: &Element,
    ) -> Result<(Option<TypeRef>, Vec<FacetDecl>)> {
        let mut base = self.type_attr(ctx, elem, xsd_attrs::BASE)?;
        let mut facets = Vec::new();
        for child in xsd_children(elem) {
            if child.local_name() == xsd_elements::SIMPLE_TYPE {
                if base.is_some() {
                    return Err(ParseError::new(
                        "restriction has both a base attribute and an inline simpleType",
                    )
                    .into());
                }
                let def = self.read_simple_type(ctx, child, None)?;
                base = Some(TypeRef::Inline(self.schema.add_type(def, &ctx.location)));
            } else if let Some(kind) = FacetKind::from_local_name(child.local_name()) {
                facets.push(self.read_facet(child, kind)?);
            }
        }
        Ok((base, facets))
    }

    fn read_facet(&self, elem: &Element, kind: FacetKind) -> Result<FacetDecl> {
        let value = elem
            .get_attribute(xsd_attrs::VALUE)
            .ok_or_else(|| missing(xsd_attrs::VALUE, kind.name()))?;
        Ok(FacetDecl {
            kind,
            value: value.to_string(),
            fixed: parse_bool(elem, xsd_attrs::FIXED)?,
            namespaces: Arc::clone(&elem.namespaces),
        })
    }

    fn read_complex_type(
        &mut self,
        ctx: &DocContext,
        elem: &Element,
        name: Option<QName>,
    ) -> Result<TypeDef> {
        let mixed = parse_bool(elem, xsd_attrs::MIXED)?;
        let mut def = ComplexTypeDef::new(Content::Empty);
        def.mixed = mixed;
        def.is_abstract = parse_bool(elem, xsd_attrs::ABSTRACT)?;
        def.final_set = match elem.get_attribute(xsd_attrs::FINAL) {
            Some(v) => DerivationSet::parse(v, complex_set())?,
            None => intersect(ctx.final_default, complex_set()),
        };
        def.block_set = match elem.get_attribute(xsd_attrs::BLOCK) {
            Some(v) => DerivationSet::parse(v, complex_set())?,
            None => intersect(ctx.block_default, complex_set()),
        };

        let content_elem = xsd_children(elem).find(|c| {
            matches!(
                c.local_name(),
                xsd_elements::SIMPLE_CONTENT | xsd_elements::COMPLEX_CONTENT
            )
        });

        match content_elem {
            Some(content) => {
                let derivation_elem = xsd_children(content)
                    .find(|c| DerivationMethod::from_local_name(c.local_name()).is_some())
                    .ok_or_else(|| {
                        Error::from(ParseError::new(format!(
                            "{} needs a restriction or extension child",
                            content.local_name()
                        )))
                    })?;
                let method = DerivationMethod::from_local_name(derivation_elem.local_name())
                    .unwrap_or_default();
                let base = self
                    .type_attr(ctx, derivation_elem, xsd_attrs::BASE)?
                    .ok_or_else(|| missing(xsd_attrs::BASE, derivation_elem.local_name()))?;
                def.derivation = method;
                def.base = base;
                if content.local_name() == xsd_elements::SIMPLE_CONTENT {
                    let mut simple = SimpleContent::default();
                    if method == DerivationMethod::Restriction {
                        for child in xsd_children(derivation_elem) {
                            if child.local_name() == xsd_elements::SIMPLE_TYPE {
                                let inline = self.read_simple_type(ctx, child, None)?;
                                simple.inline_base =
                                    Some(self.schema.add_type(inline, &ctx.location));
                            } else if let Some(kind) = FacetKind::from_local_name(child.local_name())
                            {
                                simple.facets.push(self.read_facet(child, kind)?);
                            }
                        }
                    }
                    def.content = Content::Simple(simple);
                } else {
                    let content_mixed = match content.get_attribute(xsd_attrs::MIXED) {
                        Some(_) => parse_bool(content, xsd_attrs::MIXED)?,
                        None => mixed,
                    };
                    def.content = Content::Complex(ComplexContent {
                        particle: self.read_content_particle(ctx, derivation_elem)?,
                        mixed: content_mixed,
                    });
                }
                self.read_attribute_children(
                    ctx,
                    derivation_elem,
                    &mut def.attributes,
                    &mut def.attribute_group_refs,
                    &mut def.any_attribute,
                )?;
            }
            None => {
                let particle = self.read_content_particle(ctx, elem)?;
                def.content = match (particle, mixed) {
                    (Some(p), false) => Content::ElementOnly(p),
                    (p, true) => Content::Mixed(p),
                    (None, false) => Content::Empty,
                };
                self.read_attribute_children(
                    ctx,
                    elem,
                    &mut def.attributes,
                    &mut def.attribute_group_refs,
                    &mut def.any_attribute,
                )?;
            }
        }
        Ok(TypeDef::complex(name, def))
    }

    /// The model group or group reference directly under `elem`, if any
    fn read_content_particle(&mut self, ctx: &DocContext, elem: &Element) -> Result<Option<Particle>> {
        for child in xsd_children(elem) {
            match child.local_name() {
                xsd_elements::SEQUENCE
                | xsd_elements::CHOICE
                | xsd_elements::ALL
                | xsd_elements::GROUP => return self.read_particle(ctx, child),
                _ => {}
            }
        }
        Ok(None)
    }

    fn read_model_group(&mut self, ctx: &DocContext, elem: &Element) -> Result<ModelGroup> {
        let compositor = Compositor::from_local_name(elem.local_name()).ok_or_else(|| {
            Error::from(ParseError::new(format!(
                "'{}' is not a model group",
                elem.local_name()
            )))
        })?;
        let mut particles = Vec::new();
        for child in xsd_children(elem) {
            if let Some(p) = self.read_particle(ctx, child)? {
                particles.push(p);
            }
        }
        Ok(ModelGroup::new(compositor, particles))
    }

    fn read_particle(&mut self, ctx: &DocContext, elem: &Element) -> Result<Option<Particle>> {
        let occurs = || {
            parse_occurs(
                elem.get_attribute(xsd_attrs::MIN_OCCURS),
                elem.get_attribute(xsd_attrs::MAX_OCCURS),
            )
        };
        let term = match elem.local_name() {
            xsd_elements::ELEMENT => Term::Element(self.read_local_element(ctx, elem)?),
            xsd_elements::ANY => Term::Any(self.read_wildcard(ctx, elem)?),
            xsd_elements::GROUP => {
                let r = elem
                    .get_attribute(xsd_attrs::REF)
                    .ok_or_else(|| missing(xsd_attrs::REF, "group reference"))?;
                Term::GroupRef(self.qname_ref(ctx, elem, r)?)
            }
            xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                Term::Group(self.read_model_group(ctx, elem)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(Particle::new(occurs()?, term)))
    }

    fn read_local_element(&mut self, ctx: &DocContext, elem: &Element) -> Result<ElemHandle> {
        if let Some(r) = elem.get_attribute(xsd_attrs::REF) {
            let mut decl = ElementDecl::reference(self.qname_ref(ctx, elem, r)?);
            decl.namespaces = Arc::clone(&elem.namespaces);
            return Ok(self.schema.add_element(decl, &ctx.location));
        }
        let name = self.local_name(ctx, elem, ctx.element_form)?;
        let decl = self.read_element_body(ctx, elem, name)?;
        Ok(self.schema.add_element(decl, &ctx.location))
    }

    fn read_wildcard(&self, ctx: &DocContext, elem: &Element) -> Result<Wildcard> {
        let constraint = NamespaceConstraint::from_namespace_attr(
            elem.get_attribute(xsd_attrs::NAMESPACE).unwrap_or("##any"),
            &ctx.target_namespace,
        )?;
        let process_contents = match elem.get_attribute(xsd_attrs::PROCESS_CONTENTS) {
            Some(v) => ProcessContents::from_attr(v)
                .ok_or_else(|| Error::lexical("processContents", v))?,
            None => ProcessContents::Strict,
        };
        Ok(Wildcard::new(
            constraint,
            process_contents,
            ctx.target_namespace.clone(),
        ))
    }

    fn read_attribute_children(
        &mut self,
        ctx: &DocContext,
        parent: &Element,
        attributes: &mut Vec<AttrHandle>,
        group_refs: &mut Vec<QName>,
        any_attribute: &mut Option<Wildcard>,
    ) -> Result<()> {
        for child in xsd_children(parent) {
            match child.local_name() {
                xsd_elements::ATTRIBUTE => {
                    let decl = match child.get_attribute(xsd_attrs::REF) {
                        Some(r) => {
                            let mut decl = AttributeDecl::reference(self.qname_ref(ctx, child, r)?);
                            decl.namespaces = Arc::clone(&child.namespaces);
                            decl.default = child.get_attribute(xsd_attrs::DEFAULT).map(str::to_string);
                            decl.fixed = child.get_attribute(xsd_attrs::FIXED).map(str::to_string);
                            decl
                        }
                        None => {
                            let name = self.local_name(ctx, child, ctx.attribute_form)?;
                            self.read_attribute_body(ctx, child, name)?
                        }
                    };
                    let mut decl = decl;
                    if let Some(u) = child.get_attribute(xsd_attrs::USE) {
                        decl.use_kind =
                            AttributeUse::from_attr(u).ok_or_else(|| Error::lexical("use", u))?;
                    }
                    attributes.push(self.schema.add_attribute(decl, &ctx.location));
                }
                xsd_elements::ATTRIBUTE_GROUP => {
                    let r = child
                        .get_attribute(xsd_attrs::REF)
                        .ok_or_else(|| missing(xsd_attrs::REF, "attributeGroup reference"))?;
                    group_refs.push(self.qname_ref(ctx, child, r)?);
                }
                xsd_elements::ANY_ATTRIBUTE => {
                    *any_attribute = Some(self.read_wildcard(ctx, child)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_attribute_body(
        &mut self,
        ctx: &DocContext,
        elem: &Element,
        name: QName,
    ) -> Result<AttributeDecl> {
        let mut decl = AttributeDecl::new(name);
        decl.namespaces = Arc::clone(&elem.namespaces);
        decl.type_ref = self.type_attr(ctx, elem, xsd_attrs::TYPE)?;
        if let Some(inline) = xsd_children(elem).find(|c| c.local_name() == xsd_elements::SIMPLE_TYPE)
        {
            if decl.type_ref.is_some() {
                return Err(ParseError::new(format!(
                    "attribute '{}' has both a type attribute and an inline type",
                    decl.name
                ))
                .into());
            }
            let def = self.read_simple_type(ctx, inline, None)?;
            decl.type_ref = Some(TypeRef::Inline(self.schema.add_type(def, &ctx.location)));
        }
        decl.default = elem.get_attribute(xsd_attrs::DEFAULT).map(str::to_string);
        decl.fixed = elem.get_attribute(xsd_attrs::FIXED).map(str::to_string);
        Ok(decl)
    }
}

fn annotate(err: Error, location: &str) -> Error {
    match err {
        Error::Parse(p) if p.location.is_none() => Error::Parse(p.with_location(location)),
        other => other,
    }
}

/// Read a single schema document
pub fn read_schema(xml: &str, location: &str) -> Result<ParsedSchema> {
    SchemaReader::new(&[(location, xml)])?.read()
}

/// Read several schema documents; the first is the main document
pub fn read_schemas(sources: &[(&str, &str)]) -> Result<ParsedSchema> {
    SchemaReader::new(sources)?.read()
}
