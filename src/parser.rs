//! The parse driver: initialization, the scan pass, the interleaved
//! predict/complete reduction pass, the Leo memoizer, and the small query
//! surface (`accepted`, `expected`, `forest_root`) a caller drives a parse
//! through.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use itertools::Itertools;

use crate::chart::{Chart, TransitionData};
use crate::dotted_rule::{DottedRule, DottedRuleRegistry};
use crate::grammar::Grammar;
use crate::sppf::{make_node, SppfHandle, SppfStore};
use crate::symbol::{LexerRule, NonTerminal, Symbol};
use crate::token::Token;

/// Drives one parse. Not `Send`/`Sync` (the chart and forest are plain
/// `Rc`-based arenas, matching the single-threaded model in SPEC_FULL.md
/// §5); spin up one `Parser` per input.
pub struct Parser<T: Token> {
    grammar: Grammar,
    chart: Chart,
    store: SppfStore<T>,
    location: usize,
    optimize_right_recursion: bool,
}

impl<T: Token> Parser<T> {
    pub fn new(grammar: Grammar) -> Self {
        let mut parser = Parser {
            grammar,
            chart: Chart::new(),
            store: SppfStore::new(),
            location: 0,
            optimize_right_recursion: true,
        };
        parser.initialize();
        parser
    }

    pub fn set_optimize_right_recursion(&mut self, on: bool) {
        self.optimize_right_recursion = on;
    }

    pub fn location(&self) -> usize {
        self.location
    }

    pub fn store(&self) -> &SppfStore<T> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SppfStore<T> {
        &mut self.store
    }

    pub fn accepted(&self) -> bool {
        self.chart.accepted(self.location, self.grammar.start())
    }

    /// The lexer rules that would extend the current parse. Several scan
    /// items commonly share the same lexer rule (e.g. two productions
    /// expecting the same literal next), so the result is deduplicated by
    /// object identity before returning.
    pub fn expected(&self) -> Vec<LexerRule> {
        let registry = self.grammar.registry();
        let set = self.chart.set(self.location);
        set.scans()
            .iter()
            .map(|&idx| match registry.post_dot(set.item(idx).dotted_rule) {
                Some(Symbol::LexerRule(lr)) => lr.clone(),
                _ => unreachable!("scans partition only holds lexer-rule postdot items"),
            })
            .unique()
            .collect()
    }

    /// The root of the shared packed parse forest, if the input accepted
    /// so far derives the start symbol from position 0.
    pub fn forest_root(&mut self) -> Option<SppfHandle> {
        if !self.accepted() {
            return None;
        }
        let start = self.grammar.start().clone();
        let location = self.location;
        Some(self.store.get_or_create_symbol(start, 0, location))
    }

    fn initialize(&mut self) {
        let registry = self.grammar.registry();
        let start = self.grammar.start().clone();
        for dr in self.grammar.dotted_rule_starts_for(&start) {
            self.chart.enqueue(registry, 0, dr, 0, None);
        }
        reduction_pass(&mut self.chart, &mut self.store, &self.grammar, 0, self.optimize_right_recursion);
    }

    /// Scans `token` against the current set; on success, advances
    /// `location` and runs a reduction pass on the new set. Returns false
    /// (leaving the parser untouched) if the token extends nothing.
    ///
    /// The SPPF store's identity caches are *not* cleared here: their keys
    /// already include `location`, so entries from earlier locations never
    /// collide with the new one, and clearing would risk wiping the very
    /// node `forest_root` needs if a caller queries it right after a
    /// rejected pulse (whose `location` does not advance). See
    /// [`SppfStore::clear_caches`] for the one-shot reclamation a caller can
    /// opt into once it knows no further lookups at old locations matter.
    pub fn pulse(&mut self, token: T) -> bool {
        let registry = self.grammar.registry();
        let next_location = self.location + 1;
        let mut grew = false;

        let scan_indices: Vec<usize> = self.chart.set(self.location).scans().to_vec();
        for idx in scan_indices {
            let (dr, origin, node) = {
                let item = self.chart.item(self.location, idx);
                (item.dotted_rule, item.origin, item.node())
            };
            let lex = match registry.post_dot(dr) {
                Some(Symbol::LexerRule(lr)) => lr,
                _ => unreachable!("scans partition only holds lexer-rule postdot items"),
            };
            if lex.token_type() != token.token_type() {
                continue;
            }
            let next_dr = registry.next(dr);
            if self.chart.contains(next_location, next_dr, origin) {
                continue;
            }
            let token_node = self.store.get_or_create_token(token.clone(), token.position(), next_location);
            let sppf_node = make_node(&mut self.store, registry, next_dr, origin, node, token_node, next_location);
            self.chart.enqueue(registry, next_location, next_dr, origin, Some(sppf_node));
            grew = true;
        }

        if !grew {
            return false;
        }

        self.location = next_location;
        reduction_pass(&mut self.chart, &mut self.store, &self.grammar, self.location, self.optimize_right_recursion);
        true
    }
}

/// Interleaves completions and predictions at set `l` until neither
/// partition has unconsumed entries, re-reading each partition's length on
/// every iteration since both grow during the pass. Runs the Leo memoizer
/// once the fixpoint is reached.
fn reduction_pass<T: Token>(
    chart: &mut Chart,
    store: &mut SppfStore<T>,
    grammar: &Grammar,
    l: usize,
    optimize_right_recursion: bool,
) {
    let registry = grammar.registry();
    let mut completions_done = 0;
    let mut predictions_done = 0;

    loop {
        let mut progressed = false;

        while completions_done < chart.set(l).completions().len() {
            let idx = chart.set(l).completions()[completions_done];
            complete(chart, store, registry, l, idx);
            completions_done += 1;
            progressed = true;
        }

        while predictions_done < chart.set(l).predictions().len() {
            let idx = chart.set(l).predictions()[predictions_done];
            predict(chart, store, registry, grammar, l, idx);
            predictions_done += 1;
            progressed = true;
        }

        if !progressed {
            break;
        }
    }

    if optimize_right_recursion {
        leo_memoize(chart, registry, grammar, l);
    }
}

fn predict<T: Token>(
    chart: &mut Chart,
    store: &mut SppfStore<T>,
    registry: &DottedRuleRegistry,
    grammar: &Grammar,
    l: usize,
    item_index: usize,
) {
    let (dr, origin, node) = {
        let item = chart.set(l).item(item_index);
        (item.dotted_rule, item.origin, item.node())
    };
    let n = match registry.post_dot(dr) {
        Some(Symbol::NonTerminal(n)) => n.clone(),
        _ => unreachable!("predictions partition only holds nonterminal postdot items"),
    };

    for start_dr in grammar.dotted_rule_starts_for(&n) {
        chart.enqueue(registry, l, start_dr, l, None);
    }

    if grammar.is_nullable(&n) {
        let next_dr = registry.next(dr);
        if !chart.contains(l, next_dr, origin) {
            let empty_symbol_node = store.get_or_create_symbol(n, l, l);
            let sppf_node = make_node(store, registry, next_dr, origin, node, empty_symbol_node, l);
            chart.enqueue(registry, l, next_dr, origin, Some(sppf_node));
        }
    }
}

fn complete<T: Token>(
    chart: &mut Chart,
    store: &mut SppfStore<T>,
    registry: &DottedRuleRegistry,
    l: usize,
    item_index: usize,
) {
    let (dr, origin, mut node) = {
        let item = chart.set(l).item(item_index);
        (item.dotted_rule, item.origin, item.node())
    };
    let lhs = registry.production(dr).lhs().clone();

    if node.is_none() {
        let fresh = store.get_or_create_symbol(lhs.clone(), origin, l);
        chart.set(l).item(item_index).set_node_if_unset(fresh);
        node = Some(fresh);
    }
    let node = node.unwrap();

    let lhs_symbol = Symbol::NonTerminal(lhs);
    let transition = chart.find_transition(origin, &lhs_symbol).cloned();

    match transition {
        Some(trans) => leo_complete(chart, store, registry, l, &trans, node),
        None => earley_complete(chart, store, registry, l, origin, &lhs_symbol, node),
    }
}

fn earley_complete<T: Token>(
    chart: &mut Chart,
    store: &mut SppfStore<T>,
    registry: &DottedRuleRegistry,
    l: usize,
    origin: usize,
    lhs_symbol: &Symbol,
    completion_node: SppfHandle,
) {
    let source_states = chart.find_source_states(registry, origin, lhs_symbol);
    for source_index in source_states {
        let (p_dr, p_origin, p_node) = {
            let item = chart.set(origin).item(source_index);
            (item.dotted_rule, item.origin, item.node())
        };
        let next_dr = registry.next(p_dr);
        let sppf_node = make_node(store, registry, next_dr, p_origin, p_node, completion_node, l);
        if !chart.contains(l, next_dr, p_origin) {
            chart.enqueue(registry, l, next_dr, p_origin, Some(sppf_node));
        }
    }
}

fn leo_complete<T: Token>(
    chart: &mut Chart,
    store: &mut SppfStore<T>,
    registry: &DottedRuleRegistry,
    l: usize,
    trans: &Rc<TransitionData>,
    completion_node: SppfHandle,
) {
    chart.enqueue(registry, l, trans.dotted_rule, trans.origin, None);
    let lhs = registry.production(trans.dotted_rule).lhs().clone();
    let symbol_node = store.get_or_create_symbol(lhs, trans.origin, l);

    if let Some(idx) = chart.item_index(l, trans.dotted_rule, trans.origin) {
        chart.set(l).item(idx).set_node_if_unset(symbol_node);
    }

    let root_transition = chart
        .find_transition(trans.root, &trans.symbol)
        .cloned()
        .unwrap_or_else(|| trans.clone());
    store.add_path(symbol_node, root_transition, completion_node);
}

/// Installs Leo transitions for every nonterminal predicted by exactly one
/// item in set `l`, when that item's production is right-recursive and its
/// successor dotted rule is quasi-complete.
fn leo_memoize(chart: &mut Chart, registry: &DottedRuleRegistry, grammar: &Grammar, l: usize) {
    let mut counts: HashMap<NonTerminal, usize> = HashMap::new();
    let mut representative: HashMap<NonTerminal, usize> = HashMap::new();

    for &idx in chart.set(l).predictions() {
        let dr = chart.set(l).item(idx).dotted_rule;
        if let Some(Symbol::NonTerminal(n)) = registry.post_dot(dr) {
            let n = n.clone();
            *counts.entry(n.clone()).or_insert(0) += 1;
            representative.entry(n).or_insert(idx);
        }
    }

    for (n, count) in counts {
        if count != 1 {
            continue;
        }
        let p_index = representative[&n];
        let (p_dr, p_origin, p_node) = {
            let item = chart.set(l).item(p_index);
            (item.dotted_rule, item.origin, item.node())
        };
        let production = registry.production(p_dr).clone();
        if !grammar.is_right_recursive(&production) {
            continue;
        }
        let next_dr = registry.next(p_dr);
        if !is_quasi_complete(next_dr, registry, grammar) {
            continue;
        }

        let symbol = Symbol::NonTerminal(n.clone());
        let existing = chart.find_transition(p_origin, &symbol).cloned();
        let new_transition = match existing {
            Some(existing) => {
                let copy = Rc::new(TransitionData {
                    symbol: existing.symbol.clone(),
                    dotted_rule: existing.dotted_rule,
                    origin: existing.origin,
                    predict_node: p_node,
                    root: existing.root,
                    at: l,
                    next: RefCell::new(None),
                });
                *existing.next.borrow_mut() = Some(copy.clone());
                copy
            }
            None => Rc::new(TransitionData {
                symbol: symbol.clone(),
                dotted_rule: next_dr,
                origin: p_origin,
                predict_node: p_node,
                root: l,
                at: l,
                next: RefCell::new(None),
            }),
        };
        chart.install_transition(l, symbol, new_transition);
    }
}

/// A dotted rule is quasi-complete if it is structurally complete, or every
/// remaining symbol is a nullable nonterminal. The grammar's start symbol
/// is excluded from the nullable suffix check, so a Leo chain can never be
/// built on the premise that the start symbol derives itself.
fn is_quasi_complete(dr: DottedRule, registry: &DottedRuleRegistry, grammar: &Grammar) -> bool {
    if registry.complete(dr) {
        return true;
    }
    let production = registry.production(dr);
    let mut position = registry.position(dr);
    let rhs = production.rhs();
    while position < rhs.len() {
        match &rhs[position] {
            Symbol::LexerRule(_) => return false,
            Symbol::NonTerminal(nt) => {
                if nt == grammar.start() {
                    return false;
                }
                if !grammar.is_nullable(nt) {
                    return false;
                }
            }
        }
        position += 1;
    }
    true
}
