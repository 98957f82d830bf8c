//! The chart: a sequence of per-location item sets, each partitioned into
//! predictions/scans/completions, plus a by-lhs reductions index and a
//! per-symbol Leo transition table.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use multimap::MultiMap;

use crate::dotted_rule::{DottedRule, DottedRuleRegistry};
use crate::sppf::SppfHandle;
use crate::symbol::{NonTerminal, Symbol};

/// A single Earley item: a dotted rule, an origin position, and a lazily
/// attached SPPF node. The node is set at most once (nil -> node; never
/// overwritten), so a `Cell` suffices without the rest of the item needing
/// interior mutability.
pub struct Item {
    pub dotted_rule: DottedRule,
    pub origin: usize,
    node: Cell<Option<SppfHandle>>,
}

impl Item {
    pub fn node(&self) -> Option<SppfHandle> {
        self.node.get()
    }

    /// Attaches a node if none is attached yet. No-op otherwise (an
    /// already-bound item node is never overwritten).
    pub fn set_node_if_unset(&self, node: SppfHandle) {
        if self.node.get().is_none() {
            self.node.set(Some(node));
        }
    }
}

/// A Leo transition: a memoized shortcut for completing a chain of
/// right-recursive items in O(1).
///
/// `next` links toward the most recently installed continuation of this
/// chain; it is shared (via `Rc`) with every clone of this transition taken
/// before the link was set, so earlier clones (e.g. held in an SPPF node's
/// lazy `paths` table) observe later mutations without needing to go back
/// through the chart.
pub struct TransitionData {
    pub symbol: Symbol,
    pub dotted_rule: DottedRule,
    pub origin: usize,
    pub predict_node: Option<SppfHandle>,
    /// The chart-set index where this chain originated.
    pub root: usize,
    /// The chart-set index this particular transition object was installed
    /// at (used to decide, during lazy path expansion, whether the chain
    /// has been fully walked).
    pub at: usize,
    pub next: RefCell<Option<Transition>>,
}

pub type Transition = Rc<TransitionData>;

/// The item set at a single input position.
#[derive(Default)]
pub struct ChartSet {
    items: Vec<Item>,
    index: HashMap<(DottedRule, usize), usize>,
    predictions: Vec<usize>,
    scans: Vec<usize>,
    completions: Vec<usize>,
    reductions: MultiMap<NonTerminal, usize>,
    transitions: HashMap<Symbol, Transition>,
}

impl ChartSet {
    fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, index: usize) -> &Item {
        &self.items[index]
    }

    pub fn predictions(&self) -> &[usize] {
        &self.predictions
    }

    pub fn scans(&self) -> &[usize] {
        &self.scans
    }

    pub fn completions(&self) -> &[usize] {
        &self.completions
    }

    pub fn find_reductions(&self, lhs: &NonTerminal) -> &[usize] {
        self.reductions.get_vec(lhs).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn item_index(&self, dr: DottedRule, origin: usize) -> Option<usize> {
        self.index.get(&(dr, origin)).copied()
    }

    /// Predictions whose post-dot equals `sym`. Linear in the set's
    /// prediction partition; the chart does not index this further since
    /// it is consulted only once per completing nonterminal per set.
    pub fn find_source_states(&self, registry: &DottedRuleRegistry, sym: &Symbol) -> Vec<usize> {
        self.predictions
            .iter()
            .copied()
            .filter(|&i| registry.post_dot(self.items[i].dotted_rule) == Some(sym))
            .collect()
    }

    pub fn find_transition(&self, sym: &Symbol) -> Option<&Transition> {
        self.transitions.get(sym)
    }

    pub fn install_transition(&mut self, sym: Symbol, transition: Transition) {
        self.transitions.insert(sym, transition);
    }
}

/// The full chart: one [`ChartSet`] per input position, created lazily.
#[derive(Default)]
pub struct Chart {
    sets: Vec<ChartSet>,
    /// Returned by `set` for any index past the current high-water mark,
    /// so reading ahead of where `enqueue` has written never panics.
    empty: ChartSet,
}

impl Chart {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, i: usize) {
        while self.sets.len() <= i {
            self.sets.push(ChartSet::new());
        }
    }

    /// The set at position `i`, or a shared empty set if `i` is past the
    /// high-water mark (sets are created lazily on first `enqueue`).
    pub fn set(&self, i: usize) -> &ChartSet {
        self.sets.get(i).unwrap_or(&self.empty)
    }

    pub fn contains(&self, i: usize, dr: DottedRule, origin: usize) -> bool {
        self.sets
            .get(i)
            .map(|s| s.index.contains_key(&(dr, origin)))
            .unwrap_or(false)
    }

    pub fn item(&self, i: usize, index: usize) -> &Item {
        self.sets[i].item(index)
    }

    pub fn item_index(&self, i: usize, dr: DottedRule, origin: usize) -> Option<usize> {
        self.sets.get(i).and_then(|s| s.item_index(dr, origin))
    }

    /// Inserts `(dr, origin)` into set `i` if not already present,
    /// classifying it into the appropriate partition by `dr`'s shape.
    /// Returns `true` if a new item was created. If `node` is given and
    /// the item already existed, the node is attached only if the item had
    /// none yet (an item's node is never overwritten).
    pub fn enqueue(
        &mut self,
        registry: &DottedRuleRegistry,
        i: usize,
        dr: DottedRule,
        origin: usize,
        node: Option<SppfHandle>,
    ) -> bool {
        self.ensure(i);
        let set = &mut self.sets[i];
        if let Some(&existing) = set.index.get(&(dr, origin)) {
            if let Some(node) = node {
                set.items[existing].set_node_if_unset(node);
            }
            return false;
        }

        let index = set.items.len();
        set.items.push(Item {
            dotted_rule: dr,
            origin,
            node: Cell::new(node),
        });
        set.index.insert((dr, origin), index);

        if registry.complete(dr) {
            set.completions.push(index);
            set.reductions.insert(registry.production(dr).lhs().clone(), index);
        } else {
            match registry.post_dot(dr).unwrap() {
                Symbol::NonTerminal(_) => set.predictions.push(index),
                Symbol::LexerRule(_) => set.scans.push(index),
            }
        }
        true
    }

    pub fn find_reductions(&self, i: usize, lhs: &NonTerminal) -> &[usize] {
        self.sets.get(i).map(|s| s.find_reductions(lhs)).unwrap_or(&[])
    }

    pub fn find_source_states(&self, registry: &DottedRuleRegistry, i: usize, sym: &Symbol) -> Vec<usize> {
        self.sets[i].find_source_states(registry, sym)
    }

    pub fn find_transition(&self, i: usize, sym: &Symbol) -> Option<&Transition> {
        self.sets.get(i).and_then(|s| s.find_transition(sym))
    }

    pub fn install_transition(&mut self, i: usize, sym: Symbol, transition: Transition) {
        self.ensure(i);
        self.sets[i].install_transition(sym, transition);
    }

    /// True iff some completion in set `i` is headed by `lhs` and
    /// originates at position 0.
    pub fn accepted(&self, i: usize, lhs: &NonTerminal) -> bool {
        self.find_reductions(i, lhs)
            .iter()
            .any(|&idx| self.item(i, idx).origin == 0)
    }
}
