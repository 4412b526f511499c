use blobview::{
    DocumentPosition, HighlightController, HoverInfo, Hoverifier, Input, JumpTarget, LineTable,
    NoLayout, OverlayContent, Position, Selection, Target, TokenId,
    location::{self, ObjectKind},
    markup::Node,
};
use proptest::prelude::*;

fn text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z \\n\"<&é]{0,12}").unwrap_or_else(|e| panic!("{e}"))
}

fn markup_tree() -> impl Strategy<Value = Node> {
    let leaf = text().prop_map(Node::text);
    leaf.prop_recursive(4, 32, 4, |inner| {
        (
            prop_oneof![Just(String::new()), "[a-z]{1,6}"],
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(class, children)| Node::element(class, children))
    })
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("-".to_string()),
        "[a-zA-Z0-9_. #%@?-]{1,8}".prop_filter("dot segments", |s| s != "." && s != ".."),
    ]
}

/// Repository and revision segments, a lone `-` included.
fn name_segment() -> impl Strategy<Value = String> {
    prop_oneof![Just("-".to_string()), "[a-zA-Z0-9_.-]{1,8}"]
}

fn position() -> impl Strategy<Value = Position> {
    (1..10_000usize, prop::option::of(1..500usize)).prop_map(|(line, column)| Position {
        line,
        column,
    })
}

fn document_position() -> impl Strategy<Value = DocumentPosition> {
    let repo = prop::collection::vec(name_segment(), 1..4).prop_map(|s| s.join("/"));
    let rev = prop::option::of(prop::collection::vec(name_segment(), 1..3).prop_map(|s| s.join("/")));
    let path = prop::collection::vec(segment(), 1..4).prop_map(|s| s.join("/"));
    let selection = prop::option::of(
        (position(), prop::option::of(position())).prop_map(|(start, end)| Selection { start, end }),
    );
    (repo, rev, path, selection, any::<bool>()).prop_map(|(repo, rev, path, selection, tree)| {
        if tree {
            DocumentPosition::tree(repo, rev, path)
        } else {
            DocumentPosition::blob(repo, rev, path).with_selection(selection)
        }
    })
}

proptest! {
    #[test]
    fn lines_reproduce_the_markup_text(nodes in prop::collection::vec(markup_tree(), 0..6)) {
        let expected: String = nodes.iter().map(Node::text_content).collect();
        let table = LineTable::build(&nodes);
        prop_assert_eq!(table.text(), expected.clone());
        prop_assert!(table.verify(&expected).is_ok());
        prop_assert_eq!(table.len(), expected.matches('\n').count() + 1);
    }

    #[test]
    fn tokens_tile_each_line(nodes in prop::collection::vec(markup_tree(), 0..6)) {
        let table = LineTable::build(&nodes);
        for line in table.lines() {
            let mut column = 1;
            for token in line.tokens() {
                prop_assert_eq!(token.start_column(), column);
                column += token.char_len();
            }
            let empty = line.tokens().iter().filter(|t| t.text().is_empty()).count();
            prop_assert!(empty == 0 || line.tokens().len() == 1);
        }
    }

    #[test]
    fn url_round_trip(position in document_position()) {
        let url = location::encode(&position);
        prop_assert_eq!(location::decode(&url), Ok(position.clone()));
        if position.kind == ObjectKind::Tree && position.path.is_empty() {
            prop_assert!(!url.contains("/-/"));
        }
    }

    #[test]
    fn at_most_one_line_highlighted(lines in prop::collection::vec(prop::option::of(0..12usize), 0..40)) {
        let mut table = LineTable::build(&[Node::text("0\n1\n2\n3\n4\n5\n6\n7")]);
        let mut controller = HighlightController::new();
        for line in lines {
            controller.set_highlighted_line(&mut table, line);
            let highlighted = table.highlighted_lines();
            prop_assert!(highlighted.len() <= 1);
            prop_assert_eq!(highlighted.first().copied(), controller.current());
        }
    }

    #[test]
    fn last_issued_request_wins(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
        let mut hoverifier = Hoverifier::new(std::time::Duration::ZERO);
        let mut seqs = Vec::new();
        for index in 0..6 {
            let target = Target {
                position: DocumentPosition::blob("r", None, "f").with_line_column(1, index + 1),
                token: TokenId { line: 1, index },
            };
            hoverifier.handle(Input::Click(Some(target)), &NoLayout);
            seqs.push(hoverifier.latest_seq());
        }
        for index in order {
            let seq = seqs.get(index).copied().unwrap_or_default();
            hoverifier.handle(
                Input::HoverFetched { seq, result: Ok(HoverInfo::new(format!("r{index}"))) },
                &NoLayout,
            );
        }
        let content = hoverifier.overlay(&NoLayout).map(|o| o.content);
        prop_assert_eq!(
            content,
            Some(OverlayContent::Result { text: "r5".to_string(), jump: JumpTarget::Loading })
        );
    }
}
