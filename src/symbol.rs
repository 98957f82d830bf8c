//! Grammar value objects: nonterminals and lexer rules (terminals).
//!
//! Identity for both is by object, not by name: two nonterminals built
//! from the same name are two distinct objects unless the caller reuses
//! the same handle.

use std::fmt;

use smol_str::SmolStr;

use crate::intern::Interned;

struct NonTerminalData {
    name: SmolStr,
}

/// A grammar nonterminal. Cheap to clone (reference-counted); equality and
/// hashing are by object identity, not by name.
pub type NonTerminal = Interned<NonTerminalData>;

impl NonTerminal {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Interned::new(NonTerminalData { name: name.into() })
    }

    pub fn name(&self) -> &str {
        &self.as_ref_data().name
    }

    fn as_ref_data(&self) -> &NonTerminalData {
        self
    }
}

impl fmt::Debug for NonTerminalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonTerminal({})", self.name)
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The matching behavior a [`LexerRule`] embodies. The parser itself only
/// ever consults `token_type`, never `kind` directly; `kind` exists so
/// `can_apply` has something to dispatch on, for the benefit of an external
/// scanner that wants to build a character-level matcher from the grammar.
///
/// Only the two variants the construction API (`LexerRule::new_string`,
/// `LexerRule::new_terminal`) exposes are implemented. A `Dfa` variant (or
/// others) is a natural extension point but is not speculatively added.
#[derive(Clone, Debug)]
pub enum LexerRuleKind {
    /// Matches a literal string; `can_apply` checks only the first
    /// character, since the scanner (not this engine) matches the rest.
    StringLit(SmolStr),
    /// An opaque terminal class; matching is deferred entirely to the
    /// external scanner, so `can_apply` always returns true.
    Terminal,
}

struct LexerRuleData {
    kind: LexerRuleKind,
    token_type: SmolStr,
}

/// A terminal symbol: a capability the scanner and the engine both consult.
/// Identity is by object, like [`NonTerminal`].
pub type LexerRule = Interned<LexerRuleData>;

impl LexerRule {
    /// A rule matching a literal string token. `token_type` is the literal
    /// text itself, following the usual convention that a literal's type
    /// is its spelling.
    pub fn new_string(text: impl Into<SmolStr>) -> Self {
        let text = text.into();
        Interned::new(LexerRuleData {
            kind: LexerRuleKind::StringLit(text.clone()),
            token_type: text,
        })
    }

    /// A rule matching an abstract terminal class by name (e.g. `IDENT`).
    pub fn new_terminal(token_type: impl Into<SmolStr>) -> Self {
        let token_type = token_type.into();
        Interned::new(LexerRuleData {
            kind: LexerRuleKind::Terminal,
            token_type,
        })
    }

    pub fn token_type(&self) -> &str {
        &self.as_ref_data().token_type
    }

    pub fn kind(&self) -> &LexerRuleKind {
        &self.as_ref_data().kind
    }

    /// Character-level acceptance test. Not consulted by the engine's own
    /// scan pass (which compares `token_type` strings only); carried as a
    /// capability for an external scanner building its own matcher.
    pub fn can_apply(&self, ch: char) -> bool {
        match self.kind() {
            LexerRuleKind::StringLit(text) => text.chars().next() == Some(ch),
            LexerRuleKind::Terminal => true,
        }
    }

    fn as_ref_data(&self) -> &LexerRuleData {
        self
    }
}

impl fmt::Debug for LexerRuleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LexerRule({:?}, {:?})", self.token_type, self.kind)
    }
}

impl fmt::Display for LexerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.token_type())
    }
}

/// A grammar symbol: either a nonterminal or a lexer rule (terminal).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Symbol {
    NonTerminal(NonTerminal),
    LexerRule(LexerRule),
}

impl Symbol {
    pub fn as_nonterminal(&self) -> Option<&NonTerminal> {
        match self {
            Symbol::NonTerminal(nt) => Some(nt),
            Symbol::LexerRule(_) => None,
        }
    }

    pub fn as_lexer_rule(&self) -> Option<&LexerRule> {
        match self {
            Symbol::LexerRule(lr) => Some(lr),
            Symbol::NonTerminal(_) => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::NonTerminal(nt) => write!(f, "{}", nt),
            Symbol::LexerRule(lr) => write!(f, "{}", lr),
        }
    }
}

impl From<NonTerminal> for Symbol {
    fn from(nt: NonTerminal) -> Self {
        Symbol::NonTerminal(nt)
    }
}

impl From<LexerRule> for Symbol {
    fn from(lr: LexerRule) -> Self {
        Symbol::LexerRule(lr)
    }
}
