use proptest::prelude::*;
use proptest::sample::Index;

use infra_forge_compiler::{compile, decompile_to_source, emit, SemanticModel};
use infra_forge_dsl::print;

const RESOURCE_TYPE: &str = "Test.Provider/things";

/// One generated variable: a kind selector, a reference choice, literal text
/// and an integer.
type VariableSeed = (u8, Index, String, i64);

/// Builds a program that binds cleanly: variables only reference earlier
/// string-valued declarations, and resource `r{k}` references `r{k+1}`, so
/// emission has to reverse the resource order.
fn build_source(
    parameters: usize,
    defaults: &[bool],
    variables: &[VariableSeed],
    resources: usize,
) -> String {
    let mut source = String::new();
    let mut strings: Vec<String> = Vec::new();

    for i in 0..parameters {
        if defaults.get(i).copied().unwrap_or(false) {
            source.push_str(&format!("parameter p{i}: string = 'default{i}'\n"));
        } else {
            source.push_str(&format!("parameter p{i}: string\n"));
        }
        strings.push(format!("p{i}"));
    }

    for (j, (kind, choice, text, number)) in variables.iter().enumerate() {
        let target = choice.get(&strings).clone();
        let value = match kind % 5 {
            0 => format!("'{text}'"),
            1 => number.to_string(),
            2 => format!("concat('{text}', {target})"),
            3 => format!("'{text}${{{target}}}'"),
            _ => format!("{{\n  a: {target}\n  b: {number}\n}}"),
        };
        source.push_str(&format!("variable v{j} = {value}\n"));
        if matches!(kind % 5, 0 | 2 | 3) {
            strings.push(format!("v{j}"));
        }
    }

    for k in 0..resources {
        let peer = if k + 1 < resources {
            format!("  peer: r{}.id\n", k + 1)
        } else {
            String::new()
        };
        source.push_str(&format!(
            "resource r{k}: '{RESOURCE_TYPE}@2020-01-01' = {{\n  name: 'r{k}'\n  label: {}\n{peer}}}\n",
            strings[k % strings.len()]
        ));
        source.push_str(&format!("output o{k}: string = r{k}.id\n"));
    }
    source.push_str(&format!("output last = {}\n", strings[strings.len() - 1]));
    source
}

/// `(declaration, referenced declarations)` by name, sorted.
fn reference_names(model: &SemanticModel) -> Vec<(String, Vec<String>)> {
    let declarations = &model.program().declarations;
    let name = |i: usize| declarations[i].name().map(|n| n.name.clone()).unwrap_or_default();
    let mut edges: Vec<(String, Vec<String>)> = (0..declarations.len())
        .map(|i| {
            let mut targets: Vec<String> = model.references(i).iter().map(|t| name(*t)).collect();
            targets.sort();
            (name(i), targets)
        })
        .collect();
    edges.sort();
    edges
}

fn program_source() -> impl Strategy<Value = String> {
    (
        1..4usize,
        prop::collection::vec(any::<bool>(), 4),
        prop::collection::vec(
            (any::<u8>(), any::<Index>(), "[a-z ]{0,8}", -1000i64..1000),
            0..8,
        ),
        0..4usize,
    )
        .prop_map(|(parameters, defaults, variables, resources)| {
            build_source(parameters, &defaults, &variables, resources)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_programs_bind_cleanly(source in program_source()) {
        let model = compile(&source);
        prop_assert!(!model.has_errors(), "{:?}\n{}", model.diagnostics(), source);
    }

    #[test]
    fn printing_preserves_resolved_references(source in program_source()) {
        let model = compile(&source);
        let reprinted = compile(&print(model.program()));
        prop_assert!(!reprinted.has_errors(), "{:?}", reprinted.diagnostics());
        prop_assert_eq!(reference_names(&model), reference_names(&reprinted));
    }

    #[test]
    fn emission_is_deterministic(source in program_source()) {
        let model = compile(&source);
        let first = emit(&model).unwrap().to_json_string().unwrap();
        let second = emit(&model).unwrap().to_json_string().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn resources_never_precede_their_dependencies(source in program_source()) {
        let document = emit(&compile(&source)).unwrap().document;
        let resources = document["resources"].as_array().unwrap();
        let ids: Vec<String> = resources
            .iter()
            .map(|r| format!("[resourceId('{RESOURCE_TYPE}', '{}')]", r["name"].as_str().unwrap()))
            .collect();
        for (position, resource) in resources.iter().enumerate() {
            for dependency in resource["dependsOn"].as_array().into_iter().flatten() {
                let at = ids.iter().position(|id| Some(id.as_str()) == dependency.as_str());
                prop_assert!(matches!(at, Some(at) if at < position), "{} precedes its dependency", ids[position]);
            }
        }
    }

    #[test]
    fn emitted_documents_decompile_to_clean_source(source in program_source()) {
        let json = emit(&compile(&source)).unwrap().to_json_string().unwrap();
        let decompiled = decompile_to_source(&json).unwrap();
        prop_assert!(
            !decompiled.has_errors(),
            "{:?}\n--- original ---\n{}\n--- decompiled ---\n{}",
            decompiled.diagnostics,
            source,
            decompiled.text
        );
    }
}
