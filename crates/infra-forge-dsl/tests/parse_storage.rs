use infra_forge_core::expression::Literal;
use infra_forge_dsl::{parse, Declaration, ExpressionKind, StringSegment};

/// A realistic deployment: parameters with defaults, derived variables, two
/// dependent resources and outputs reading resource properties.
const STORAGE_DEPLOYMENT: &str = r#"
// Line comments
/* Block comments */

parameter name: string
parameter location: string = 'westus'
parameter replicas: int = 3
parameter adminPassword: secureString

variable greeting = concat('hello ', name)
variable storageName = '${toLower(name)}store'
variable tags = {
  environment: 'prod'
  'cost-center': 42
}

resource storage: 'Microsoft.Storage/storageAccounts@2019-06-01' = {
  name: storageName
  location: location
  tags: tags
  sku: {
    name: 'Standard_LRS'
  }
  kind: 'StorageV2'
  properties: {
    supportsHttpsTrafficOnly: true
    encryption: null
  }
}

resource container: 'Microsoft.Storage/storageAccounts/blobServices/containers@2019-06-01' = {
  name: '${storage.name}/default/logs'
  properties: {
    publicAccess: 'None'
  }
  dependsOn: [
    storage
  ]
}

output result: string = greeting
output endpoint = storage.properties.primaryEndpoints.blob
output firstTag = tags['cost-center']
"#;

#[test]
fn parse_full_storage_deployment() {
    let program = parse(STORAGE_DEPLOYMENT);
    assert!(
        program.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        program.diagnostics
    );
    assert_eq!(program.declarations.len(), 12);

    let kinds: Vec<_> = program.declarations.iter().map(|d| d.keyword()).collect();
    assert_eq!(
        kinds,
        vec![
            "parameter", "parameter", "parameter", "parameter", "variable", "variable",
            "variable", "resource", "resource", "output", "output", "output",
        ]
    );

    // --- parameters ---
    match &program.declarations[1] {
        Declaration::Parameter(p) => {
            assert_eq!(p.name.name, "location");
            assert_eq!(p.type_annotation.name, "string");
            assert_eq!(
                p.default_value.as_ref().and_then(|e| e.as_string_literal()),
                Some("westus")
            );
        }
        other => panic!("expected parameter, got {other:?}"),
    }
    match &program.declarations[2] {
        Declaration::Parameter(p) => assert!(matches!(
            p.default_value.as_ref().map(|e| &e.kind),
            Some(ExpressionKind::Literal(Literal::Integer(3)))
        )),
        other => panic!("expected parameter, got {other:?}"),
    }

    // --- interpolated variable ---
    match &program.declarations[5] {
        Declaration::Variable(v) => match &v.value.kind {
            ExpressionKind::Interpolated(segments) => {
                assert_eq!(segments.len(), 2);
                assert!(matches!(&segments[1], StringSegment::Text(t) if t == "store"));
            }
            other => panic!("expected interpolation, got {other:?}"),
        },
        other => panic!("expected variable, got {other:?}"),
    }

    // --- storage resource ---
    let Declaration::Resource(storage) = &program.declarations[7] else {
        panic!("expected resource");
    };
    assert_eq!(storage.name.name, "storage");
    assert_eq!(
        storage.resource_type.split(),
        Some(("Microsoft.Storage/storageAccounts", "2019-06-01"))
    );
    let keys: Vec<_> = storage
        .body
        .as_object()
        .expect("object body")
        .iter()
        .map(|p| p.key.as_str())
        .collect();
    assert_eq!(keys, vec!["name", "location", "tags", "sku", "kind", "properties"]);

    // --- container resource ---
    let Declaration::Resource(container) = &program.declarations[8] else {
        panic!("expected resource");
    };
    let depends_on = container.body.property("dependsOn").expect("dependsOn");
    match &depends_on.value.kind {
        ExpressionKind::Array(items) => {
            assert!(matches!(&items[0].kind, ExpressionKind::Reference(id) if id.name == "storage"));
        }
        other => panic!("expected array, got {other:?}"),
    }

    // --- outputs ---
    match &program.declarations[10] {
        Declaration::Output(o) => {
            assert!(o.type_annotation.is_none());
            assert!(matches!(o.value.kind, ExpressionKind::PropertyAccess { .. }));
        }
        other => panic!("expected output, got {other:?}"),
    }
    match &program.declarations[11] {
        Declaration::Output(o) => assert!(matches!(o.value.kind, ExpressionKind::ArrayAccess { .. })),
        other => panic!("expected output, got {other:?}"),
    }
}

#[test]
fn spans_map_to_source_lines() {
    let program = parse(STORAGE_DEPLOYMENT);
    let Declaration::Resource(storage) = &program.declarations[7] else {
        panic!("expected resource");
    };
    let start = program.line_index.position(storage.span.start);
    let end = program.line_index.position(storage.span.end);
    assert_eq!(start.line, 17);
    assert_eq!(end.line, 29);
}

#[test]
fn several_errors_reported_in_one_pass() {
    let source = "parameter a: string\nvariable = 1\nvariable b = concat(a,)\noutput c = b\nresource : 'x/y@1' = {}\n";
    let program = parse(source);
    let lines: Vec<_> = program.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 3, 5]);
    assert_eq!(program.named_declarations().count(), 3);
}

#[test]
fn deeply_nested_expressions_become_one_diagnostic() {
    let sources = [
        format!("variable x = {}1{}\n", "(".repeat(20_000), ")".repeat(20_000)),
        format!("variable x = {}1{}\n", "[".repeat(20_000), "]".repeat(20_000)),
        format!("variable x = {}1{}\n", "f(".repeat(20_000), ")".repeat(20_000)),
        format!("variable x = {}{}\n", "{a: ".repeat(20_000), "}".repeat(20_000)),
        format!("variable x = a{}\n", ".b".repeat(20_000)),
        format!("variable x = {}'x'{}\n", "'${".repeat(10_000), "}'".repeat(10_000)),
    ];
    for source in &sources {
        let program = parse(&format!("{source}output o = 1\n"));
        assert_eq!(program.diagnostics.len(), 1, "{:?}", program.diagnostics);
        assert!(program.diagnostics[0].message.contains("nesting"));
        assert_eq!(program.declarations.len(), 2);
        match &program.declarations[0] {
            Declaration::Variable(v) => assert!(matches!(v.value.kind, ExpressionKind::Skipped)),
            other => panic!("expected variable, got {other:?}"),
        }
    }
}

#[test]
fn broken_object_member_reports_only_its_own_error() {
    let source = "variable x = {\n  a: 1\n  a: 2\n  b: )\n}\nvariable y = 1\n";
    let program = parse(source);
    let lines: Vec<_> = program.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![4]);
    assert_eq!(program.named_declarations().count(), 2);
}
