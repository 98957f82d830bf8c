use earley_forest::chart::Chart;
use earley_forest::grammar::{Grammar, Production};
use earley_forest::parser::Parser;
use earley_forest::sppf::NodeRef;
use earley_forest::symbol::{LexerRule, NonTerminal, Symbol};
use earley_forest::token::CharToken;

fn nt(name: &str) -> NonTerminal {
    NonTerminal::new(name)
}

fn lit(ch: char) -> LexerRule {
    LexerRule::new_string(ch.to_string())
}

fn tokens(s: &str) -> Vec<CharToken> {
    s.chars().enumerate().map(|(i, c)| CharToken::new(c, i)).collect()
}

fn run(grammar: &Grammar, input: &str) -> Parser<CharToken> {
    let _ = env_logger::try_init();
    let mut parser = Parser::new(grammar.clone());
    for token in tokens(input) {
        if !parser.pulse(token) {
            break;
        }
    }
    parser
}

/// `S -> S S | S | 's'`
fn simple_series_grammar() -> Grammar {
    let s = nt("S");
    let productions = vec![
        Production::new(s.clone(), vec![Symbol::NonTerminal(s.clone()), Symbol::NonTerminal(s.clone())]),
        Production::new(s.clone(), vec![Symbol::NonTerminal(s.clone())]),
        Production::new(s.clone(), vec![Symbol::LexerRule(lit('s'))]),
    ];
    Grammar::new(s, productions)
}

#[test]
fn simple_series_accepts_at_every_step() {
    let grammar = simple_series_grammar();
    let mut parser = Parser::new(grammar);
    for token in tokens("ssssssssss") {
        assert!(parser.pulse(token), "token extended the parse at location {}", parser.location());
        assert!(parser.accepted(), "accepted after {} tokens", parser.location());
    }
    assert_eq!(parser.location(), 10);
}

/// Scott (2008) §4 example 1: `S' -> S`, `S -> A A A A`, `A -> 'a' | epsilon`.
fn aycock_horspool_grammar() -> Grammar {
    let s_prime = nt("S'");
    let s = nt("S");
    let a = nt("A");
    let productions = vec![
        Production::new(s_prime.clone(), vec![Symbol::NonTerminal(s.clone())]),
        Production::new(
            s.clone(),
            vec![
                Symbol::NonTerminal(a.clone()),
                Symbol::NonTerminal(a.clone()),
                Symbol::NonTerminal(a.clone()),
                Symbol::NonTerminal(a.clone()),
            ],
        ),
        Production::new(a.clone(), vec![Symbol::LexerRule(lit('a'))]),
        Production::new(a.clone(), vec![]),
    ];
    Grammar::new(s_prime, productions)
}

#[test]
fn aycock_horspool_nullable_prediction_reaches_acceptance_in_one_token() {
    let grammar = aycock_horspool_grammar();
    let parser = run(&grammar, "a");
    assert!(parser.accepted());
}

/// `A -> 'a' A | epsilon`, right-recursive.
fn leo_linear_recursion_grammar() -> Grammar {
    let a = nt("A");
    let productions = vec![
        Production::new(a.clone(), vec![Symbol::LexerRule(lit('a')), Symbol::NonTerminal(a.clone())]),
        Production::new(a.clone(), vec![]),
    ];
    Grammar::new(a, productions)
}

#[test]
fn leo_linear_recursion_accepts_ten_tokens() {
    let grammar = leo_linear_recursion_grammar();
    let parser = run(&grammar, "aaaaaaaaaa");
    assert!(parser.accepted());
    assert_eq!(parser.location(), 10);
}

/// `S -> 'a' S | C`, `C -> 'a' C 'b' | epsilon`.
fn leo_with_trailing_context_grammar() -> Grammar {
    let s = nt("S");
    let c = nt("C");
    let productions = vec![
        Production::new(s.clone(), vec![Symbol::LexerRule(lit('a')), Symbol::NonTerminal(s.clone())]),
        Production::new(s.clone(), vec![Symbol::NonTerminal(c.clone())]),
        Production::new(
            c.clone(),
            vec![Symbol::LexerRule(lit('a')), Symbol::NonTerminal(c.clone()), Symbol::LexerRule(lit('b'))],
        ),
        Production::new(c.clone(), vec![]),
    ];
    Grammar::new(s, productions)
}

#[test]
fn leo_with_trailing_context_accepts() {
    let grammar = leo_with_trailing_context_grammar();
    let parser = run(&grammar, "aaaaaabbbb"); // six 'a' then four 'b'
    assert!(parser.accepted());
}

/// Scott (2008) §4 example 2: `S -> S S | 'b'`.
fn shared_forest_ambiguous_grammar() -> Grammar {
    let s = nt("S");
    let productions = vec![
        Production::new(s.clone(), vec![Symbol::NonTerminal(s.clone()), Symbol::NonTerminal(s.clone())]),
        Production::new(s.clone(), vec![Symbol::LexerRule(lit('b'))]),
    ];
    Grammar::new(s, productions)
}

#[test]
fn shared_forest_ambiguous_has_two_families() {
    let grammar = shared_forest_ambiguous_grammar();
    let mut parser = Parser::new(grammar);
    for token in tokens("bbb") {
        assert!(parser.pulse(token));
    }
    assert!(parser.accepted());

    let root = parser.forest_root().expect("accepted parse has a forest root");
    let families = parser.store_mut().alternatives(root).to_vec();
    // Both of `S`'s productions here have a two-symbol right-hand side, so
    // the left-spine shortcut means no intermediate node ever appears: each
    // family is a plain pair of `S` symbol nodes splitting the three `b`s.
    assert_eq!(families.len(), 2, "ambiguous split should produce exactly two families");

    let mut splits: Vec<usize> = families
        .iter()
        .map(|family| {
            assert_eq!(family.len(), 2);
            let (left, right) = (parser.store().describe(family[0]), parser.store().describe(family[1]));
            match (left, right) {
                (NodeRef::Symbol { origin: 0, location: split, .. }, NodeRef::Symbol { origin, location: 3, .. }) => {
                    assert_eq!(origin, split, "right child must start exactly where the left child ended");
                    split
                }
                other => panic!("unexpected family shape: {:?}", describe_kinds(other)),
            }
        })
        .collect();
    splits.sort_unstable();
    assert_eq!(splits, vec![1, 2], "the two derivations split the three b's at positions 1 and 2");
}

fn describe_kinds(pair: (NodeRef<'_, CharToken>, NodeRef<'_, CharToken>)) -> (&'static str, &'static str) {
    (kind_name(&pair.0), kind_name(&pair.1))
}

fn kind_name(node: &NodeRef<'_, CharToken>) -> &'static str {
    match node {
        NodeRef::Symbol { .. } => "symbol",
        NodeRef::Intermediate { .. } => "intermediate",
        NodeRef::Token { .. } => "token",
    }
}

/// Scott (2008) §4 example 3: `S -> A T | 'a' T`, `A -> 'a' | B A`, `B -> epsilon`, `T -> 'b' 'b' 'b'`.
fn shared_forest_nullable_grammar() -> (Grammar, NonTerminal) {
    let s = nt("S");
    let a = nt("A");
    let b = nt("B");
    let t = nt("T");
    let productions = vec![
        Production::new(s.clone(), vec![Symbol::NonTerminal(a.clone()), Symbol::NonTerminal(t.clone())]),
        Production::new(s.clone(), vec![Symbol::LexerRule(lit('a')), Symbol::NonTerminal(t.clone())]),
        Production::new(a.clone(), vec![Symbol::LexerRule(lit('a'))]),
        Production::new(a.clone(), vec![Symbol::NonTerminal(b.clone()), Symbol::NonTerminal(a.clone())]),
        Production::new(b.clone(), vec![]),
        Production::new(
            t.clone(),
            vec![Symbol::LexerRule(lit('b')), Symbol::LexerRule(lit('b')), Symbol::LexerRule(lit('b'))],
        ),
    ];
    (Grammar::new(s, productions), a)
}

#[test]
fn shared_forest_nullable_has_self_referencing_family() {
    let (grammar, a) = shared_forest_nullable_grammar();
    let mut parser = Parser::new(grammar);
    for token in tokens("abbb") {
        assert!(parser.pulse(token));
    }
    assert!(parser.accepted());

    let root = parser.forest_root().expect("accepted parse has a forest root");
    let root_families = parser.store_mut().alternatives(root).to_vec();
    assert_eq!(root_families.len(), 2, "S(0,4) should have two families");

    let a_node = parser.store_mut().get_or_create_symbol(a, 0, 1);
    let a_families = parser.store_mut().alternatives(a_node).to_vec();
    assert_eq!(a_families.len(), 2, "A(0,1) should have two families");

    // One family derives A directly from 'a'; the other goes through the
    // nullable B, so its second child is the very same A(0,1) node object
    // (a self-reference through a nullable nonterminal), not a copy.
    let has_self_reference = a_families.iter().any(|family| family.len() == 2 && family[1] == a_node);
    assert!(has_self_reference, "expected a family whose second child is A(0,1) itself: {:?}", a_families);
}

#[test]
fn leo_optimization_does_not_change_acceptance() {
    let grammar = leo_linear_recursion_grammar();

    let mut with_leo = Parser::new(grammar.clone());
    let mut without_leo = Parser::new(grammar);
    without_leo.set_optimize_right_recursion(false);

    for token in tokens("aaaaaaaaaa") {
        let a = with_leo.pulse(token.clone());
        let b = without_leo.pulse(token);
        assert_eq!(a, b, "Leo and plain Earley must agree on whether a token extends the parse");
    }
    assert_eq!(with_leo.accepted(), without_leo.accepted());
}

#[test]
fn rejection_is_permanent() {
    let grammar = simple_series_grammar();
    let mut parser = Parser::new(grammar);
    assert!(!parser.pulse(CharToken::new('x', 0)));
    assert!(!parser.pulse(CharToken::new('x', 0)), "a parser that rejected once keeps rejecting");
}

#[test]
fn expected_lists_the_pending_terminals() {
    let grammar = simple_series_grammar();
    let parser = Parser::new(grammar);
    let expected = parser.expected();
    assert_eq!(expected.len(), 1);
    assert_eq!(expected[0].token_type(), "s");
}

#[test]
fn chart_sets_start_empty_and_grow_independently() {
    let chart = Chart::new();
    assert_eq!(chart.set(0).len(), 0);
    assert_eq!(chart.set(3).len(), 0);
}
