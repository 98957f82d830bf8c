//! The interned dotted-rule registry: `(production, position) -> DottedRule`
//! with O(1) `next`. Every dotted rule reachable from a grammar's
//! productions is materialized eagerly when the grammar is built, so there
//! is no lazy-construction path to synchronize when a `Grammar` is shared
//! across parsers.

use crate::grammar::Production;
use crate::symbol::Symbol;

/// A handle into a [`DottedRuleRegistry`]. Cheap to copy; equality is
/// handle equality, exactly as the distilled rule requires.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DottedRule(u32);

struct DottedRuleData {
    production: Production,
    position: usize,
    complete: bool,
    pre_dot: Option<Symbol>,
    post_dot: Option<Symbol>,
    next: Option<DottedRule>,
}

/// Owns every `(production, position)` dotted rule reachable from a set of
/// productions, plus the production's position-0 ("start") rule for each.
pub struct DottedRuleRegistry {
    rules: Vec<DottedRuleData>,
    starts: Vec<DottedRule>,
}

impl DottedRuleRegistry {
    /// Build the full table for `productions`. `starts[i]` is the
    /// position-0 dotted rule for `productions[i]`.
    pub fn build(productions: &[Production]) -> Self {
        let mut rules = Vec::new();
        let mut starts = Vec::with_capacity(productions.len());

        for production in productions {
            let len = production.rhs().len();
            let base = rules.len() as u32;
            for position in 0..=len {
                let complete = position == len;
                let pre_dot = if position > 0 {
                    Some(production.rhs()[position - 1].clone())
                } else {
                    None
                };
                let post_dot = if !complete {
                    Some(production.rhs()[position].clone())
                } else {
                    None
                };
                rules.push(DottedRuleData {
                    production: production.clone(),
                    position,
                    complete,
                    pre_dot,
                    post_dot,
                    next: None,
                });
            }
            starts.push(DottedRule(base));
            for position in 0..len {
                let idx = (base as usize) + position;
                rules[idx].next = Some(DottedRule(base + position as u32 + 1));
            }
        }

        DottedRuleRegistry { rules, starts }
    }

    fn data(&self, dr: DottedRule) -> &DottedRuleData {
        &self.rules[dr.0 as usize]
    }

    /// The position-0 dotted rule for `productions[index]` as passed to
    /// [`Self::build`].
    pub fn start_of(&self, production_index: usize) -> DottedRule {
        self.starts[production_index]
    }

    pub fn production(&self, dr: DottedRule) -> &Production {
        &self.data(dr).production
    }

    pub fn position(&self, dr: DottedRule) -> usize {
        self.data(dr).position
    }

    pub fn complete(&self, dr: DottedRule) -> bool {
        self.data(dr).complete
    }

    pub fn pre_dot(&self, dr: DottedRule) -> Option<&Symbol> {
        self.data(dr).pre_dot.as_ref()
    }

    pub fn post_dot(&self, dr: DottedRule) -> Option<&Symbol> {
        self.data(dr).post_dot.as_ref()
    }

    /// Advances the dot by one position. Calling this on a complete dotted
    /// rule is a precondition violation: every call site only reaches here
    /// after checking `complete()`, so this is a fatal internal error, not
    /// caller-recoverable.
    pub fn next(&self, dr: DottedRule) -> DottedRule {
        self.data(dr).next.unwrap_or_else(|| {
            log::error!(
                "registry.next called on a complete dotted rule (production {:?}, position {})",
                self.data(dr).production.lhs(),
                self.data(dr).position,
            );
            panic!("next() has no successor: dotted rule is already complete");
        })
    }
}
