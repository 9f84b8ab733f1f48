use infra_forge_dsl::{is_keyword, parse, print};
use proptest::prelude::*;

/// Strategy for identifiers that are not reserved words.
fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,10}".prop_filter("not a keyword", |s| !is_keyword(s))
}

/// Strategy for DSL string literal bodies, including characters that need escaping.
fn string_body() -> impl Strategy<Value = String> {
    "[a-z '$\\\\{}]{0,12}".prop_map(|s| {
        let mut out = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\'' => out.push_str("\\'"),
                '\\' => out.push_str("\\\\"),
                '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
                _ => out.push(c),
            }
        }
        out
    })
}

/// Strategy for expression source text.
fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        any::<i32>().prop_map(|n| n.to_string()),
        Just("true".to_string()),
        Just("null".to_string()),
        identifier(),
        string_body().prop_map(|s| format!("'{s}'")),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (identifier(), prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(f, args)| format!("{f}({})", args.join(", "))),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|items| format!("[{}]", items.join(", "))),
            prop::collection::btree_map(identifier(), inner.clone(), 0..3).prop_map(|props| {
                let entries: Vec<_> = props.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                format!("{{ {} }}", entries.join(", "))
            }),
            (inner.clone(), identifier()).prop_map(|(base, p)| format!("({base}).{p}")),
            (string_body(), inner).prop_map(|(text, hole)| format!("'{text}${{{hole}}}'")),
        ]
    })
}

proptest! {
    /// Lexer and parser should never panic on arbitrary input.
    #[test]
    fn parser_never_panics(input in "\\PC{0,200}") {
        let _ = parse(&input);
    }

    /// Structured garbage around declaration keywords never panics either.
    #[test]
    fn parser_never_panics_on_near_valid_input(
        parts in prop::collection::vec(
            prop_oneof![
                Just("variable"), Just("output"), Just("="), Just("{"), Just("}"),
                Just("["), Just("]"), Just("("), Just(")"), Just(","), Just("\n"),
                Just("'${"), Just("'"), Just("x"), Just("1"), Just(":"),
            ],
            0..40,
        )
    ) {
        let _ = parse(&parts.join(" "));
    }

    /// Printing a parsed program and parsing it again yields the same text.
    #[test]
    fn print_parse_print_is_stable(
        name in identifier(),
        value in expression(),
    ) {
        let source = format!("variable {name} = {value}\noutput out = {name}");
        let program = parse(&source);
        prop_assume!(program.diagnostics.is_empty());

        let printed = print(&program);
        let reparsed = parse(&printed);
        prop_assert!(
            reparsed.diagnostics.is_empty(),
            "re-parse failed for:\n{}\n{:?}", printed, reparsed.diagnostics
        );
        prop_assert_eq!(print(&reparsed), printed);
    }
}
