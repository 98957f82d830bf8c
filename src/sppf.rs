//! The shared packed parse forest: a per-parse arena of symbol,
//! intermediate, and token nodes, plus Scott's `MAKE-NODE` construction
//! rule and the lazy Leo-path expansion that reinflates a collapsed
//! right-recursive spine on first access.

use std::collections::HashMap;

use crate::chart::Transition;
use crate::dotted_rule::{DottedRule, DottedRuleRegistry};
use crate::symbol::NonTerminal;
use crate::token::Token;

/// An index into an [`SppfStore`]'s arena. Stable for the lifetime of the
/// store; two handles are the same node iff they are numerically equal.
pub type SppfHandle = usize;

/// One alternative (derivation) of a packed node: one or two children, in
/// order. A node's alternatives are a set — no two families with the same
/// children are ever both present.
pub type Family = Vec<SppfHandle>;

enum SppfNodeKind<T: Token> {
    Symbol {
        nonterminal: NonTerminal,
        origin: usize,
        location: usize,
        /// Leo completions defer expansion into families until first
        /// read; each entry is a (transition, descendant) path segment.
        paths: Vec<(Transition, SppfHandle)>,
        paths_expanded: bool,
    },
    Intermediate {
        dotted_rule: DottedRule,
        origin: usize,
        location: usize,
    },
    Token {
        token: T,
        origin: usize,
        location: usize,
    },
}

struct SppfNode<T: Token> {
    kind: SppfNodeKind<T>,
    families: Vec<Family>,
}

/// A read-only view into one node, for callers that want to walk the
/// forest (tests, or an external tree-building pass) without reaching into
/// the store's internals.
pub enum NodeRef<'a, T: Token> {
    Symbol {
        nonterminal: &'a NonTerminal,
        origin: usize,
        location: usize,
    },
    Intermediate {
        dotted_rule: DottedRule,
        origin: usize,
        location: usize,
    },
    Token {
        token: &'a T,
        origin: usize,
        location: usize,
    },
}

/// Owns every SPPF node created during a parse. Per-location caches (keyed
/// by the node's logical identity, location included) are never cleared
/// automatically during a parse: the location is part of every cache key,
/// so entries from different locations never collide, and a caller may
/// query `forest_root` for the current location (or a past one still held
/// via a raw handle) at any point, including right after a rejected
/// `pulse`. The nodes themselves are never freed either way, so
/// cross-location family children (including cycles through a nullable
/// nonterminal) remain valid handles. See [`Self::clear_caches`] for a
/// caller-driven way to reclaim the lookup caches once no further lookups
/// at old locations are needed.
#[derive(Default)]
pub struct SppfStore<T: Token> {
    arena: Vec<SppfNode<T>>,
    symbol_cache: HashMap<(NonTerminal, usize, usize), SppfHandle>,
    intermediate_cache: HashMap<(DottedRule, usize, usize), SppfHandle>,
    token_cache: HashMap<(usize, usize), SppfHandle>,
}

impl<T: Token> SppfStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_symbol(&mut self, nt: NonTerminal, origin: usize, location: usize) -> SppfHandle {
        let key = (nt.clone(), origin, location);
        if let Some(&handle) = self.symbol_cache.get(&key) {
            return handle;
        }
        let handle = self.arena.len();
        self.arena.push(SppfNode {
            kind: SppfNodeKind::Symbol {
                nonterminal: nt,
                origin,
                location,
                paths: Vec::new(),
                paths_expanded: false,
            },
            families: Vec::new(),
        });
        self.symbol_cache.insert(key, handle);
        handle
    }

    pub fn get_or_create_intermediate(&mut self, dr: DottedRule, origin: usize, location: usize) -> SppfHandle {
        let key = (dr, origin, location);
        if let Some(&handle) = self.intermediate_cache.get(&key) {
            return handle;
        }
        let handle = self.arena.len();
        self.arena.push(SppfNode {
            kind: SppfNodeKind::Intermediate { dotted_rule: dr, origin, location },
            families: Vec::new(),
        });
        self.intermediate_cache.insert(key, handle);
        handle
    }

    pub fn get_or_create_token(&mut self, token: T, origin: usize, location: usize) -> SppfHandle {
        let key = (origin, location);
        if let Some(&handle) = self.token_cache.get(&key) {
            return handle;
        }
        let handle = self.arena.len();
        self.arena.push(SppfNode {
            kind: SppfNodeKind::Token { token, origin, location },
            families: Vec::new(),
        });
        self.token_cache.insert(key, handle);
        handle
    }

    /// Inserts `family` into `handle`'s alternatives if no equal family is
    /// already present. Returns true if it was newly inserted.
    pub fn add_family(&mut self, handle: SppfHandle, family: Family) -> bool {
        let node = &mut self.arena[handle];
        if node.families.contains(&family) {
            false
        } else {
            node.families.push(family);
            true
        }
    }

    /// Records a Leo path segment on a symbol node, to be expanded into
    /// families on first call to [`Self::alternatives`].
    pub fn add_path(&mut self, handle: SppfHandle, transition: Transition, descendant: SppfHandle) {
        if let SppfNodeKind::Symbol { paths, .. } = &mut self.arena[handle].kind {
            paths.push((transition, descendant));
        }
    }

    /// The directly-added families, without triggering Leo path expansion.
    pub fn families(&self, handle: SppfHandle) -> &[Family] {
        &self.arena[handle].families
    }

    /// The full alternatives list, expanding any recorded Leo paths into
    /// families on first access. Idempotent: subsequent calls return the
    /// cached result.
    pub fn alternatives(&mut self, handle: SppfHandle) -> &[Family] {
        self.ensure_expanded(handle);
        &self.arena[handle].families
    }

    fn ensure_expanded(&mut self, handle: SppfHandle) {
        let paths = match &mut self.arena[handle].kind {
            SppfNodeKind::Symbol { paths_expanded, paths, .. } => {
                if *paths_expanded {
                    return;
                }
                *paths_expanded = true;
                std::mem::take(paths)
            }
            _ => return,
        };
        if paths.is_empty() {
            return;
        }

        let (this_nonterminal, this_location) = match &self.arena[handle].kind {
            SppfNodeKind::Symbol { nonterminal, location, .. } => (nonterminal.clone(), *location),
            _ => unreachable!("paths only recorded on symbol nodes"),
        };

        for (transition, descendant) in paths {
            let predict_node = transition.predict_node.unwrap_or_else(|| {
                log::error!("Leo path recorded with no predict_node on its transition");
                panic!("Leo transition missing predict_node");
            });
            let descendant_location = self.location_of(descendant);
            let next = transition.next.borrow().clone();

            match next {
                None => {
                    self.add_family(handle, vec![predict_node, descendant]);
                }
                Some(ref next_trans) if next_trans.at == descendant_location => {
                    self.add_family(handle, vec![predict_node, descendant]);
                }
                Some(next_trans) => {
                    let synthesized =
                        self.get_or_create_symbol(this_nonterminal.clone(), next_trans.origin, this_location);
                    self.add_path(synthesized, next_trans, descendant);
                    self.add_family(handle, vec![predict_node, synthesized]);
                }
            }
        }
    }

    pub fn location_of(&self, handle: SppfHandle) -> usize {
        match &self.arena[handle].kind {
            SppfNodeKind::Symbol { location, .. } => *location,
            SppfNodeKind::Intermediate { location, .. } => *location,
            SppfNodeKind::Token { location, .. } => *location,
        }
    }

    pub fn origin_of(&self, handle: SppfHandle) -> usize {
        match &self.arena[handle].kind {
            SppfNodeKind::Symbol { origin, .. } => *origin,
            SppfNodeKind::Intermediate { origin, .. } => *origin,
            SppfNodeKind::Token { origin, .. } => *origin,
        }
    }

    pub fn describe(&self, handle: SppfHandle) -> NodeRef<'_, T> {
        match &self.arena[handle].kind {
            SppfNodeKind::Symbol { nonterminal, origin, location, .. } => NodeRef::Symbol {
                nonterminal,
                origin: *origin,
                location: *location,
            },
            SppfNodeKind::Intermediate { dotted_rule, origin, location } => NodeRef::Intermediate {
                dotted_rule: *dotted_rule,
                origin: *origin,
                location: *location,
            },
            SppfNodeKind::Token { token, origin, location } => NodeRef::Token {
                token,
                origin: *origin,
                location: *location,
            },
        }
    }

    /// Clears the per-location identity caches. Not called automatically by
    /// [`crate::parser::Parser::pulse`] (see its doc comment); a caller that
    /// knows it will never again look up a node at an already-visited
    /// location (e.g. it has stopped feeding tokens for good and finished
    /// walking the forest) may call this to bound the caches' memory.
    /// Existing nodes remain valid and reachable either way — only the
    /// lookup caches are reset.
    pub fn clear_caches(&mut self) {
        self.symbol_cache.clear();
        self.intermediate_cache.clear();
        self.token_cache.clear();
    }
}

/// Scott's `MAKE-NODE` procedure. `w` is the left sibling SPPF node (nil
/// for the first symbol absorbed by a production), `v` is the newly
/// matched right child (a token node from a scan, or a symbol node from a
/// completion).
///
/// The left-spine shortcut runs before any container-node lookup: when
/// `dr` is not complete and sits at position 1, the intermediate node
/// would carry exactly one child anyway, so `v` is returned directly and
/// no intermediate node is created at all.
pub fn make_node<T: Token>(
    store: &mut SppfStore<T>,
    registry: &DottedRuleRegistry,
    dr: DottedRule,
    origin: usize,
    w: Option<SppfHandle>,
    v: SppfHandle,
    location: usize,
) -> SppfHandle {
    if !registry.complete(dr) && registry.position(dr) == 1 {
        return v;
    }

    let container = if registry.complete(dr) {
        store.get_or_create_symbol(registry.production(dr).lhs().clone(), origin, location)
    } else {
        store.get_or_create_intermediate(dr, origin, location)
    };

    let family = match w {
        None => vec![v],
        Some(w) => vec![w, v],
    };
    store.add_family(container, family);
    container
}
