//! Productions and the preprocessed grammar: nullable-nonterminal closure
//! and right-recursive production detection, computed once at construction
//! and then read-only for the lifetime of the grammar.

use std::collections::{HashSet, VecDeque};

use crate::dotted_rule::{DottedRule, DottedRuleRegistry};
use crate::intern::Interned;
use crate::symbol::{NonTerminal, Symbol};

struct ProductionData {
    lhs: NonTerminal,
    rhs: Vec<Symbol>,
}

/// A single grammar rule `lhs -> rhs`. Identity is by object, like
/// [`NonTerminal`] and [`crate::symbol::LexerRule`]: two productions built
/// from equal-looking data are distinct unless a handle is cloned.
pub type Production = Interned<ProductionData>;

impl Production {
    pub fn new(lhs: NonTerminal, rhs: Vec<Symbol>) -> Self {
        Interned::new(ProductionData { lhs, rhs })
    }

    pub fn lhs(&self) -> &NonTerminal {
        &self.as_ref_data().lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.as_ref_data().rhs
    }

    fn as_ref_data(&self) -> &ProductionData {
        self
    }
}

/// A preprocessed, immutable grammar: a start symbol, its productions, the
/// interned dotted-rule registry, the set of nullable nonterminals, and the
/// set of right-recursive productions (Leo-eligible).
///
/// `Grammar` is cheap to clone: every field it owns is either `Copy`,
/// reference-counted, or built once and never mutated, so sharing one
/// grammar across several [`crate::parser::Parser`] instances (or threads)
/// needs no synchronization.
#[derive(Clone)]
pub struct Grammar {
    start: NonTerminal,
    productions: Vec<Production>,
    registry: std::rc::Rc<DottedRuleRegistry>,
    nullable: std::rc::Rc<HashSet<NonTerminal>>,
    right_recursive: std::rc::Rc<HashSet<Production>>,
}

impl Grammar {
    /// Builds the grammar and runs the preprocessor (nullable closure,
    /// right-recursive detection, dotted-rule interning).
    pub fn new(start: NonTerminal, productions: Vec<Production>) -> Self {
        let registry = DottedRuleRegistry::build(&productions);
        let nullable = compute_nullable(&productions, &registry);
        let right_recursive = compute_right_recursive(&productions, &nullable);

        log::debug!(
            "grammar built: {} productions, {} nullable nonterminals, {} right-recursive productions",
            productions.len(),
            nullable.len(),
            right_recursive.len(),
        );

        Grammar {
            start,
            productions,
            registry: std::rc::Rc::new(registry),
            nullable: std::rc::Rc::new(nullable),
            right_recursive: std::rc::Rc::new(right_recursive),
        }
    }

    pub fn start(&self) -> &NonTerminal {
        &self.start
    }

    pub fn registry(&self) -> &DottedRuleRegistry {
        &self.registry
    }

    pub fn is_nullable(&self, nt: &NonTerminal) -> bool {
        self.nullable.contains(nt)
    }

    pub fn is_right_recursive(&self, production: &Production) -> bool {
        self.right_recursive.contains(production)
    }

    /// The position-0 dotted rules for every production whose lhs is `nt`,
    /// in declaration order. Used by `predict` and by initialization (the
    /// start symbol's own productions).
    pub fn dotted_rule_starts_for<'a>(
        &'a self,
        nt: &'a NonTerminal,
    ) -> impl Iterator<Item = DottedRule> + 'a {
        self.productions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.lhs() == nt)
            .map(|(i, _)| self.registry.start_of(i))
    }
}

/// Two-queue fixpoint over dotted rules: a `work` queue of items being
/// advanced, an `unprocessed` queue for items blocked on a not-yet-nullable
/// nonterminal. A full sweep of `work` that produces no newly-nullable
/// nonterminal ends the computation.
fn compute_nullable(
    productions: &[Production],
    registry: &DottedRuleRegistry,
) -> HashSet<NonTerminal> {
    let mut nullable = HashSet::new();
    let mut work: VecDeque<DottedRule> = VecDeque::new();
    let mut unprocessed: Vec<DottedRule> = Vec::new();

    for (index, _) in productions.iter().enumerate() {
        work.push_back(registry.start_of(index));
    }

    loop {
        let mut changed = false;

        while let Some(dr) = work.pop_front() {
            if registry.complete(dr) {
                let lhs = registry.production(dr).lhs().clone();
                if nullable.insert(lhs) {
                    changed = true;
                }
                continue;
            }

            match registry.post_dot(dr).unwrap() {
                Symbol::LexerRule(_) => {}
                Symbol::NonTerminal(nt) => {
                    if nullable.contains(nt) {
                        work.push_back(registry.next(dr));
                    } else {
                        unprocessed.push(dr);
                    }
                }
            }
        }

        if !changed {
            break;
        }
        work.extend(unprocessed.drain(..));
    }

    nullable
}

/// Right-recursive production detection (see SPEC_FULL.md §4.1 for the
/// derivation of this reading). For each production, compute its *tail
/// nonterminal*: the first non-nullable symbol scanning the RHS from the
/// right, skipping a nullable-nonterminal suffix. Build a graph over
/// productions with an edge `p -> q` whenever `lhs(q)` equals `p`'s tail
/// nonterminal, then close it with Warshall's algorithm; `p` is
/// right-recursive iff it reaches some production headed by `lhs(p)`
/// itself (including the zero-hop case where the tail already is `lhs(p)`).
fn compute_right_recursive(
    productions: &[Production],
    nullable: &HashSet<NonTerminal>,
) -> HashSet<Production> {
    let n = productions.len();
    let tail: Vec<Option<NonTerminal>> = productions
        .iter()
        .map(|p| tail_nonterminal(p, nullable))
        .collect();

    let mut reach = vec![vec![false; n]; n];
    for (p, tail_nt) in tail.iter().enumerate() {
        let Some(tail_nt) = tail_nt else { continue };
        for (q, production) in productions.iter().enumerate() {
            if production.lhs() == tail_nt {
                reach[p][q] = true;
            }
        }
    }

    // Warshall's transitive closure.
    for k in 0..n {
        for i in 0..n {
            if !reach[i][k] {
                continue;
            }
            for j in 0..n {
                if reach[k][j] {
                    reach[i][j] = true;
                }
            }
        }
    }

    let mut right_recursive = HashSet::new();
    for (p, production) in productions.iter().enumerate() {
        let direct = tail[p].as_ref() == Some(production.lhs());
        let via_closure = (0..n).any(|q| reach[p][q] && productions[q].lhs() == production.lhs());
        if direct || via_closure {
            right_recursive.insert(production.clone());
        }
    }
    right_recursive
}

fn tail_nonterminal(production: &Production, nullable: &HashSet<NonTerminal>) -> Option<NonTerminal> {
    for symbol in production.rhs().iter().rev() {
        match symbol {
            Symbol::LexerRule(_) => return None,
            Symbol::NonTerminal(nt) => {
                if nullable.contains(nt) {
                    continue;
                }
                return Some(nt.clone());
            }
        }
    }
    None
}
