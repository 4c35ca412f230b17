//! Frontmatter data parser tests.

use lumen_carton::SourceRange;
use lumen_folio::{encode_literal, parse, ErrorCode, Mapping, Node, Scalar, ScalarValue};

fn root_mapping(text: &str) -> Mapping {
    let doc = parse(text);
    assert!(doc.errors.is_empty(), "unexpected errors: {:?}", doc.errors);
    match doc.root {
        Some(Node::Mapping(mapping)) => mapping,
        other => panic!("expected a mapping, got {other:?}"),
    }
}

fn scalar(node: &Node) -> &Scalar {
    match node {
        Node::Scalar(scalar) => scalar,
        other => panic!("expected a scalar, got {other:?}"),
    }
}

fn error_codes(text: &str) -> Vec<ErrorCode> {
    parse(text).errors.iter().map(|e| e.code).collect()
}

// =============================================================================
// Block structure
// =============================================================================

mod block {
    use super::*;

    #[test]
    fn key_and_value_spans() {
        let text = "title: Hello\ncount: 3\n";
        let map = root_mapping(text);
        assert_eq!(map.pairs.len(), 2);

        let title = &map.pairs[0];
        assert_eq!(title.key.span, SourceRange::new(0, 5));
        assert_eq!(scalar(&title.value).span, SourceRange::new(7, 12));
        assert_eq!(scalar(&title.value).source, "Hello");

        assert_eq!(scalar(&map.pairs[1].value).value, ScalarValue::Int(3));
        assert_eq!(map.span, SourceRange::new(0, 21));
    }

    #[test]
    fn nested_mapping_and_sequence() {
        let text = "author:\n  name: Ada\ntags:\n  - a\n  - b\n";
        let map = root_mapping(text);

        let Node::Mapping(author) = &map.pairs[0].value else {
            panic!("author should be a mapping");
        };
        assert_eq!(author.pairs[0].key.source, "name");

        let Node::Sequence(tags) = &map.pairs[1].value else {
            panic!("tags should be a sequence");
        };
        let items: Vec<_> = tags.items.iter().map(|n| scalar(n).source.as_str()).collect();
        assert_eq!(items, vec!["a", "b"]);
    }

    #[test]
    fn sequence_at_key_indent() {
        let map = root_mapping("tags:\n- a\n- b\nnext: 1\n");
        assert!(matches!(&map.pairs[0].value, Node::Sequence(seq) if seq.items.len() == 2));
        assert_eq!(map.pairs[1].key.source, "next");
    }

    #[test]
    fn compact_mappings_in_sequence() {
        let map = root_mapping("items:\n  - id: 1\n    name: x\n  - id: 2\n");
        let Node::Sequence(items) = &map.pairs[0].value else {
            panic!("items should be a sequence");
        };
        assert_eq!(items.items.len(), 2);
        let Node::Mapping(first) = &items.items[0] else {
            panic!("item should be a mapping");
        };
        let keys: Vec<_> = first.pairs.iter().map(|p| p.key.source.as_str()).collect();
        assert_eq!(keys, vec!["id", "name"]);
    }

    #[test]
    fn empty_values_are_null() {
        let text = "draft:\nnote: ~\n";
        let map = root_mapping(text);
        let draft = scalar(&map.pairs[0].value);
        assert!(draft.is_null());
        assert_eq!(draft.span, SourceRange::empty_at(6));
        assert!(scalar(&map.pairs[1].value).is_null());
    }

    #[test]
    fn comments_and_blank_lines() {
        let map = root_mapping("# leading\n\ntitle: Hi # trailing\n\n");
        assert_eq!(scalar(&map.pairs[0].value).source, "Hi");
    }

    #[test]
    fn only_comments() {
        let doc = parse("\n# nothing here\n");
        assert!(doc.root.is_none());
        assert!(doc.errors.is_empty());
    }
}

// =============================================================================
// Scalars
// =============================================================================

mod scalars {
    use super::*;

    fn value_of(text: &str) -> ScalarValue {
        let map = root_mapping(text);
        scalar(&map.pairs[0].value).value.clone()
    }

    #[test]
    fn core_schema() {
        assert_eq!(value_of("a: true"), ScalarValue::Bool(true));
        assert_eq!(value_of("a: 0x1F"), ScalarValue::Int(31));
        assert_eq!(value_of("a: -4"), ScalarValue::Int(-4));
        assert_eq!(value_of("a: .5"), ScalarValue::Float(0.5));
        assert_eq!(value_of("a: 1e3"), ScalarValue::Float(1000.0));
        assert_eq!(value_of("a: 1.2.3"), ScalarValue::Str("1.2.3".into()));
        assert_eq!(value_of("a: 2024-05-01"), ScalarValue::Date("2024-05-01".into()));
        assert_eq!(value_of("a: '12'"), ScalarValue::Str("12".into()));
    }

    #[test]
    fn quoted_escapes() {
        assert_eq!(
            value_of(r#"a: "tab\tand \u00e9""#),
            ScalarValue::Str("tab\tand é".into())
        );
        assert_eq!(value_of("a: 'it''s'"), ScalarValue::Str("it's".into()));
    }

    #[test]
    fn quoted_keys() {
        let map = root_mapping("\"my key\": 1\n");
        assert_eq!(map.pairs[0].key.value, ScalarValue::Str("my key".into()));
        assert_eq!(map.pairs[0].key.span, SourceRange::new(0, 8));
    }

    #[test]
    fn block_scalars() {
        let map = root_mapping("desc: |\n  line one\n  line two\nsummary: >-\n  folded\n  text\n");
        assert_eq!(
            scalar(&map.pairs[0].value).value,
            ScalarValue::Str("line one\nline two\n".into())
        );
        assert_eq!(
            scalar(&map.pairs[1].value).value,
            ScalarValue::Str("folded text".into())
        );
        assert_eq!(map.pairs[1].key.source, "summary");
    }

    #[test]
    fn plain_continuation_lines() {
        let map = root_mapping("description: a long\n  sentence\nnext: 1\n");
        let description = scalar(&map.pairs[0].value);
        assert_eq!(description.value, ScalarValue::Str("a long sentence".into()));
        assert_eq!(description.source, "a long\n  sentence");
    }

    #[test]
    fn literal_encoding_uses_resolved_value() {
        let map = root_mapping("a: 'x'\nb: \"x\"\nc: x\n");
        let encoded: Vec<_> = map
            .pairs
            .iter()
            .map(|p| encode_literal(scalar(&p.value)))
            .collect();
        assert_eq!(encoded, vec!["\"x\"", "\"x\"", "\"x\""]);
    }
}

// =============================================================================
// Flow collections
// =============================================================================

mod flow {
    use super::*;

    #[test]
    fn single_line() {
        let map = root_mapping("tags: [a, 'b', 3]\nmeta: {x: 1, y: [true]}\n");
        let Node::Sequence(tags) = &map.pairs[0].value else {
            panic!("tags should be a sequence");
        };
        assert!(tags.flow);
        assert_eq!(scalar(&tags.items[1]).span, SourceRange::new(10, 13));
        assert_eq!(scalar(&tags.items[2]).value, ScalarValue::Int(3));

        let Node::Mapping(meta) = &map.pairs[1].value else {
            panic!("meta should be a mapping");
        };
        assert_eq!(meta.pairs.len(), 2);
        assert!(matches!(&meta.pairs[1].value, Node::Sequence(s) if s.items.len() == 1));
    }

    #[test]
    fn spanning_lines() {
        let map = root_mapping("tags: [\n  a,\n  b\n]\n");
        let Node::Sequence(tags) = &map.pairs[0].value else {
            panic!("tags should be a sequence");
        };
        assert_eq!(tags.items.len(), 2);
    }

    #[test]
    fn trailing_comma() {
        let map = root_mapping("tags: [a, b,]");
        assert!(matches!(&map.pairs[0].value, Node::Sequence(s) if s.items.len() == 2));
    }
}

// =============================================================================
// Errors
// =============================================================================

mod errors {
    use super::*;

    #[test]
    fn unterminated_string() {
        assert_eq!(error_codes("title: \"Hello\n"), vec![ErrorCode::UnterminatedString]);
    }

    #[test]
    fn unterminated_flow() {
        assert_eq!(
            error_codes("tags: [a, b\nnext: 1\n"),
            vec![ErrorCode::UnterminatedFlow]
        );
    }

    #[test]
    fn missing_separator() {
        assert_eq!(
            error_codes("title: a\nbroken line\n"),
            vec![ErrorCode::MissingValueSeparator]
        );
    }

    #[test]
    fn bad_indentation() {
        assert_eq!(error_codes("a: 1\n  b: 2\n"), vec![ErrorCode::BadIndentation]);
    }

    #[test]
    fn duplicate_keys() {
        let doc = parse("a: 1\na: 2\n");
        assert_eq!(doc.errors.len(), 1);
        assert_eq!(doc.errors[0].code, ErrorCode::DuplicateKey);
        assert_eq!(doc.errors[0].span, SourceRange::new(5, 6));
        insta::assert_snapshot!(doc.errors[0].to_string(), @"Map keys must be unique at 5..6");
    }

    #[test]
    fn tab_indentation() {
        assert!(error_codes("a:\n\tb: 1\n").contains(&ErrorCode::TabIndentation));
    }

    #[test]
    fn errors_keep_the_tree() {
        let doc = parse("title: Hi\ntags: [a\n");
        let Some(Node::Mapping(map)) = doc.root else {
            panic!("expected a mapping");
        };
        assert_eq!(map.pairs.len(), 2);
        assert!(!doc.errors.is_empty());
    }
}
