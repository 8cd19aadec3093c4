//! End-to-end compilation of literal schemas

use pretty_assertions::assert_eq;
use xmlschema_compiler::error::Stage;
use xmlschema_compiler::reader::read_schema;
use xmlschema_compiler::registry::assign_ids;
use xmlschema_compiler::resolver::{ResolvePolicy, Resolver};
use xmlschema_compiler::runtime::{AttrLookup, IcCategory, Matcher, ModelKind, UseKind};
use xmlschema_compiler::semantic::{validate_references, validate_structure};
use xmlschema_compiler::{
    compile_schema, compile_str, BuildConfig, Error, Limits, ParsedSchema, RuntimeSchema,
};

fn schema(body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                      xmlns:tns="urn:t" targetNamespace="urn:t">{}</xs:schema>"#,
        body
    )
}

fn compile(body: &str) -> Result<RuntimeSchema, Error> {
    compile_str(&schema(body), &BuildConfig::default())
}

fn resolved(xsd: &str) -> ParsedSchema {
    let mut s = read_schema(xsd, "main.xsd").unwrap();
    validate_structure(&mut s).unwrap();
    Resolver::new(&mut s, ResolvePolicy::Required).resolve().unwrap();
    s
}

fn complex_of(rt: &RuntimeSchema, name: &str) -> u32 {
    let ty = rt.global_type(rt.symbol("urn:t", name).unwrap()).unwrap();
    rt.type_row(ty).unwrap().complex
}

fn any_leaf(err: &Error, pred: impl Fn(&Error) -> bool) -> bool {
    err.flatten().into_iter().any(|e| pred(e))
}

#[test]
fn test_same_schema_same_hash() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                   <xs:element name="root" type="xs:string"/>
                 </xs:schema>"#;
    let a = compile_str(xsd, &BuildConfig::default()).unwrap();
    let b = compile_str(xsd, &BuildConfig::default()).unwrap();
    assert_ne!(a.build_hash, 0);
    assert_eq!(a.build_hash, b.build_hash);

    let renamed = compile_str(&xsd.replace("\"root\"", "\"root2\""), &BuildConfig::default())
        .unwrap();
    assert_ne!(a.build_hash, renamed.build_hash);
}

#[test]
fn test_added_element_changes_hash() {
    let one = compile(r#"<xs:element name="a" type="xs:int"/>"#).unwrap();
    let two = compile(
        r#"<xs:element name="a" type="xs:int"/><xs:element name="b" type="xs:int"/>"#,
    )
    .unwrap();
    assert_ne!(one.build_hash, two.build_hash);
    assert_eq!(one.build_hash, one.compute_hash());
}

#[test]
fn test_ids_are_deterministic() {
    let xsd = schema(
        r#"<xs:complexType name="T"><xs:sequence>
             <xs:element name="x" type="xs:int"/>
           </xs:sequence><xs:attribute name="at" type="xs:string"/></xs:complexType>
           <xs:element name="e" type="tns:T"/>
           <xs:attribute name="g" type="xs:date"/>"#,
    );
    let first = assign_ids(&resolved(&xsd)).unwrap();
    let second = assign_ids(&resolved(&xsd)).unwrap();
    assert_eq!(first.type_order, second.type_order);
    assert_eq!(first.element_order, second.element_order);
    assert_eq!(first.attribute_order, second.attribute_order);
    assert_eq!(first, second);
}

#[test]
fn test_group_reference_is_compiled() {
    let rt = compile(
        r#"<xs:group name="G"><xs:sequence><xs:element name="inner" type="xs:string"/></xs:sequence></xs:group>
           <xs:complexType name="T"><xs:sequence><xs:group ref="tns:G"/></xs:sequence></xs:complexType>"#,
    )
    .unwrap();
    let row = rt.complex_types[complex_of(&rt, "T") as usize];
    assert_eq!(row.model.kind, ModelKind::Dfa);
    let inner = rt.symbol("", "inner").unwrap();
    assert!(rt
        .models
        .matchers
        .iter()
        .any(|m| matches!(m, Matcher::PosExact { symbol, .. } if *symbol == inner)));
}

#[test]
fn test_final_restriction_is_rejected() {
    let s = resolved(&schema(
        r#"<xs:simpleType name="Base" final="restriction">
             <xs:restriction base="xs:string"/>
           </xs:simpleType>
           <xs:simpleType name="Derived">
             <xs:restriction base="tns:Base"><xs:length value="2"/></xs:restriction>
           </xs:simpleType>"#,
    ));
    let err = validate_references(&s).unwrap_err();
    assert!(
        any_leaf(&err, |e| e.to_string().contains("final for restriction")),
        "{}",
        err
    );
}

#[test]
fn test_union_enumeration_outside_members() {
    let err = compile(
        r#"<xs:simpleType name="Color">
             <xs:restriction base="xs:token">
               <xs:enumeration value="red"/><xs:enumeration value="blue"/>
             </xs:restriction>
           </xs:simpleType>
           <xs:simpleType name="Shade"><xs:union memberTypes="tns:Color"/></xs:simpleType>
           <xs:simpleType name="Limited">
             <xs:restriction base="tns:Shade">
               <xs:enumeration value="red"/><xs:enumeration value="green"/>
             </xs:restriction>
           </xs:simpleType>"#,
    )
    .unwrap_err();
    assert!(
        err.to_string().contains("does not match any member type"),
        "{}",
        err
    );
}

#[test]
fn test_qname_fixed_value_is_expanded() {
    let rt = compile_str(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:ex="urn:ex">
             <xs:attribute name="q" type="xs:QName" fixed="ex:val"/>
             <xs:attribute name="s" type="xs:string" default=""/>
           </xs:schema>"#,
        &BuildConfig::default(),
    )
    .unwrap();
    let q = rt.global_attribute(rt.symbol("", "q").unwrap()).unwrap();
    let row = &rt.attributes[q as usize];
    assert_eq!(rt.value_bytes(&row.values.fixed), Some(&b"urn:ex\x00val"[..]));
    assert!(!row.values.default.present);

    let s = rt.global_attribute(rt.symbol("", "s").unwrap()).unwrap();
    let empty = rt.attributes[s as usize].values.default;
    assert!(empty.present);
    assert_eq!(empty.len, 0);
}

#[test]
fn test_max_occurs_limit() {
    let xsd = schema(
        r#"<xs:complexType name="T"><xs:sequence>
             <xs:element name="item" maxOccurs="2"/>
           </xs:sequence></xs:complexType>"#,
    );
    let err = compile_str(&xsd, &BuildConfig::default().with_max_occurs_limit(1)).unwrap_err();
    assert!(
        any_leaf(&err, |e| matches!(e, Error::OccursTooLarge { value: 2, limit: 1 })),
        "{:?}",
        err
    );
    assert!(compile_str(&xsd, &BuildConfig::default().with_max_occurs_limit(2)).is_ok());
}

#[test]
fn test_attribute_uses_sorted_by_symbol() {
    let limits = Limits {
        attr_linear_max: 0,
        ..Limits::default()
    };
    let config = BuildConfig::default().with_limits(limits);
    for body in [
        r#"<xs:complexType name="T"><xs:attribute name="b"/><xs:attribute name="a"/></xs:complexType>"#,
        r#"<xs:complexType name="T"><xs:attribute name="a"/><xs:attribute name="b"/></xs:complexType>"#,
    ] {
        let rt = compile_str(&schema(body), &config).unwrap();
        let complex = complex_of(&rt, "T");
        assert_eq!(rt.complex_types[complex as usize].attrs.mode, AttrLookup::SortedBinary);
        let names: Vec<u32> = rt.attribute_uses(complex).iter().map(|u| u.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        let a = rt.symbol("", "a").unwrap();
        assert!(rt.attribute_use(complex, a).is_some());
    }
}

#[test]
fn test_prohibited_use_survives_restriction() {
    let rt = compile(
        r#"<xs:complexType name="Base">
             <xs:attribute name="a" type="xs:string"/>
             <xs:attribute name="b" type="xs:int"/>
           </xs:complexType>
           <xs:complexType name="Narrow">
             <xs:complexContent>
               <xs:restriction base="tns:Base">
                 <xs:attribute name="a" type="xs:string" use="prohibited"/>
               </xs:restriction>
             </xs:complexContent>
           </xs:complexType>"#,
    )
    .unwrap();
    let complex = complex_of(&rt, "Narrow");
    let a = rt.symbol("", "a").unwrap();
    let b = rt.symbol("", "b").unwrap();
    assert_eq!(rt.attribute_use(complex, a).unwrap().use_kind, UseKind::Prohibited);
    assert_eq!(rt.attribute_use(complex, b).unwrap().use_kind, UseKind::Optional);
}

#[test]
fn test_keyref_binds_key_of_its_own_element() {
    let rt = compile(
        r#"<xs:complexType name="Items"><xs:sequence>
             <xs:element name="item" maxOccurs="unbounded">
               <xs:complexType><xs:attribute name="id" type="xs:string"/></xs:complexType>
             </xs:element>
           </xs:sequence></xs:complexType>
           <xs:element name="a" type="tns:Items">
             <xs:key name="ka"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:key>
           </xs:element>
           <xs:element name="b" type="tns:Items">
             <xs:key name="kb"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:key>
             <xs:keyref name="rb" refer="tns:kb"><xs:selector xpath="item"/><xs:field xpath="@id"/></xs:keyref>
           </xs:element>"#,
    )
    .unwrap();
    let b = rt.global_element(rt.symbol("urn:t", "b").unwrap()).unwrap();
    let row = rt.element(b).unwrap();
    let ids = &rt.identity.elem_ics[row.ic_off as usize..(row.ic_off + row.ic_len) as usize];
    let keyref = rt.identity.ics[ids[1] as usize];
    assert_eq!(keyref.category, IcCategory::KeyRef);
    assert_eq!(keyref.refer, ids[0]);
    let target = rt.identity.ics[keyref.refer as usize];
    assert_eq!(target.name, rt.symbol("urn:t", "kb").unwrap());
}

#[test]
fn test_cycles_are_named() {
    let err = compile(
        r#"<xs:group name="Loop"><xs:sequence><xs:group ref="tns:Loop"/></xs:sequence></xs:group>"#,
    )
    .unwrap_err();
    assert!(
        any_leaf(&err, |e| matches!(e, Error::CircularReference { name, .. } if name.local_name == "Loop")),
        "{:?}",
        err
    );
}

#[test]
fn test_unique_particle_attribution() {
    let err = compile(
        r#"<xs:complexType name="T"><xs:choice>
             <xs:element name="a"/><xs:element name="a"/>
           </xs:choice></xs:complexType>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::BuildStage {
            stage: Stage::ValidateUpa,
            ..
        }
    ));

    compile(
        r#"<xs:complexType name="T"><xs:sequence>
             <xs:element name="a"/><xs:element name="b"/>
           </xs:sequence></xs:complexType>"#,
    )
    .unwrap();
}

#[test]
fn test_warnings_are_returned_with_the_schema() {
    let xsd = schema(
        r#"<xs:element name="root">
             <xs:complexType><xs:sequence>
               <xs:element name="part" type="xs:string" maxOccurs="unbounded"/>
             </xs:sequence></xs:complexType>
             <xs:unique name="u"><xs:selector xpath=".//part"/><xs:field xpath="."/></xs:unique>
           </xs:element>"#,
    );
    let compiled = compile_schema(&[("main.xsd", &xsd)], &BuildConfig::default()).unwrap();
    assert_eq!(compiled.diagnostics.len(), 1);
    assert!(compiled.diagnostics[0].message.contains(".//part"));
    assert_ne!(compiled.runtime.build_hash, 0);
}

#[test]
fn test_runtime_schema_dumps_to_json() {
    let rt = compile(r#"<xs:element name="a" type="xs:int"/>"#).unwrap();
    let json = rt.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["build_hash"].as_u64(), Some(rt.build_hash));
}
