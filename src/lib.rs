//! Earley recognition with Leo's right-recursion optimization, Aycock-Horspool
//! nullable prediction, and Scott-style shared packed parse forest construction.
//!
//! The crate is organized bottom-up: grammar value objects ([`symbol`],
//! [`grammar`]), the interned dotted-rule table ([`dotted_rule`]), the chart
//! ([`chart`]), the forest arena ([`sppf`]), and finally the parse driver
//! ([`parser`]) that ties predict/scan/complete together.

mod intern;

pub mod chart;
pub mod dotted_rule;
pub mod grammar;
pub mod parser;
pub mod sppf;
pub mod symbol;
pub mod token;

pub use chart::{Chart, ChartSet};
pub use dotted_rule::{DottedRule, DottedRuleRegistry};
pub use grammar::{Grammar, Production};
pub use parser::Parser;
pub use sppf::{Family, NodeRef, SppfHandle, SppfStore};
pub use symbol::{LexerRule, LexerRuleKind, NonTerminal, Symbol};
pub use token::Token;
