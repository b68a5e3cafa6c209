//! # yacc -- a port of Berkeley YACC to Rust
//!
//! This crate reads a grammar specification and produces the tables for a deterministic
//! LALR(1) parser, exactly in the form that Berkeley YACC produces them.  The grammar can be
//! supplied either as yacc source text (see [`reader`]) or built programmatically using
//! [`GrammarBuilder`].  The packed tables can then be emitted as Rust source (see [`output`])
//! or interpreted directly by the `yacc_runtime` crate.
//!
//! # Pipeline
//!
//! Generation runs as a sequence of phases.  Each phase borrows the outputs of the phases
//! before it, and nothing is mutated after it has been produced:
//!
//! 1. [`builder`] checks and packs the symbols and rules into a [`Grammar`].
//! 2. [`lr0`] computes the DERIVES and NULLABLE relations and the LR(0) automaton, using
//!    [`closure`] to close each kernel.
//! 3. [`lalr`] computes the LALR(1) look-ahead sets, using the DeRemer and Pennello
//!    digraph algorithm.
//! 4. [`mkpar`] merges shifts and reductions into parser actions and resolves conflicts,
//!    using precedence and associativity where they are declared.
//! 5. [`packing`] compresses the action rows and goto columns into the classic
//!    `(base, check, table)` encoding.
//! 6. [`verbose`] optionally renders the `y.output` report.
//!
//! # Example
//!
//! ```rust,ignore
//! let text = "
//!     %token NUM
//!     %left '+'
//!     %%
//!     expr : expr '+' expr
//!          | NUM
//!          ;
//! ";
//! let options = yacc::Options::default();
//! let read = yacc::reader::read_grammar(text, &options)?;
//! let generated = yacc::generate(read.builder, &options)?;
//! println!("{} states", generated.parser.nstates());
//! ```
//!
//! Diagnostics (warnings, conflict counts) are accumulated in [`Diagnostics`] rather than
//! printed, so that the caller decides where they go.  Generation never fails because of
//! conflicts; it fails only on fatal errors, such as an undefined start symbol or a table
//! that outgrows `Options::max_table_size`.

#![warn(rust_2018_idioms)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::cognitive_complexity)]

pub mod builder;
pub mod closure;
pub mod errors;
pub mod grammar;
pub mod lalr;
pub mod lr0;
pub mod mkpar;
pub mod output;
pub mod packing;
pub mod ramp_table;
pub mod reader;
pub mod tvec;
pub mod util;
pub mod verbose;
pub mod warshall;


pub use builder::GrammarBuilder;
pub use errors::{Diagnostic, Diagnostics, ErrorKind, GenerateError, Severity, Warning, YaccError};
pub use grammar::{Assoc, Grammar};
pub use packing::ParserTables;

use lalr::LALROutput;
use log::debug;
use lr0::LR0Output;
use mkpar::YaccParser;

macro_rules! int_alias {
    (type $name:ident = $int:ty;) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
        pub struct $name(pub $int);

        impl $name {
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl core::ops::Add<$int> for $name {
            type Output = Self;
            fn add(self, rhs: $int) -> $name {
                $name(self.0 + rhs)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, fmt)
            }
        }

        impl core::convert::From<$name> for usize {
            fn from(i: $name) -> usize {
                i.0 as usize
            }
        }

        impl core::convert::From<usize> for $name {
            fn from(i: usize) -> $name {
                $name(i as $int)
            }
        }
    };
}

// Packed indices.  All of them fit in an i16, which bounds the size of the generated tables.
int_alias! {type Symbol = i16;}
int_alias! {type Var = i16;}
int_alias! {type Rule = i16;}
int_alias! {type State = i16;}
int_alias! {type Item = i16;}
int_alias! {type Token = i16;}

impl Rule {
    /// Rule 2 is the augmented start rule, `$accept : goal $end`.
    pub const ACCEPT: Rule = Rule(2);
    /// The first rule written by the grammar author.
    pub const FIRST_USER: Rule = Rule(3);
}

impl Symbol {
    /// The end-of-input marker, `$end`.
    pub const END: Symbol = Symbol(0);
    pub const ERROR: Symbol = Token::ERROR.to_symbol();
}

impl Token {
    /// Converts a token to a symbol. This is trivial, since all tokens are symbols
    /// starting at zero.
    pub const fn to_symbol(self) -> Symbol {
        Symbol(self.0)
    }
    pub const END: Token = Token(0);
    pub const ERROR: Token = Token(1);
}

/// One entry of the flattened item array.  Non-negative entries are right-hand-side
/// symbols; a negative entry `-r` terminates the right-hand side of rule `r`.
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd)]
pub struct SymbolOrRule(i16);

/// The decoded form of a [`SymbolOrRule`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Symbol(Symbol),
    RuleEnd(Rule),
}

impl SymbolOrRule {
    pub fn rule(rule: Rule) -> SymbolOrRule {
        assert!(rule.0 > 0);
        Self(-rule.0)
    }
    pub fn symbol(symbol: Symbol) -> SymbolOrRule {
        assert!(symbol.0 >= 0);
        Self(symbol.0)
    }
    pub fn is_symbol(self) -> bool {
        self.0 >= 0
    }
    pub fn as_symbol(self) -> Symbol {
        assert!(self.is_symbol());
        Symbol(self.0)
    }
    pub fn kind(self) -> ItemKind {
        if self.0 >= 0 {
            ItemKind::Symbol(Symbol(self.0))
        } else {
            ItemKind::RuleEnd(Rule(-self.0))
        }
    }
    /// The raw encoding, as stored in the item array.
    pub fn raw(self) -> i16 {
        self.0
    }
}

use core::fmt::{Debug, Formatter};
impl Debug for SymbolOrRule {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> core::fmt::Result {
        match self.kind() {
            ItemKind::Symbol(s) => write!(fmt, "Symbol({})", s.index()),
            ItemKind::RuleEnd(r) => write!(fmt, "Rule({})", r.index()),
        }
    }
}

type StateOrRule = i16;

/// The default limit on the size of the packed `table` / `check` arrays.
pub const DEFAULT_MAX_TABLE_SIZE: usize = 32500;

/// Settings that control a generation run.
#[derive(Clone, Debug)]
pub struct Options {
    /// Used as the prefix of every diagnostic line.
    pub program_name: String,
    /// Used in diagnostic lines that carry a location.
    pub input_file_name: String,
    /// If set, `generate` also renders the verbose state report.
    pub verbose: bool,
    /// Packing fails with a fatal error if the table would grow beyond this many slots.
    pub max_table_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            program_name: "yacc".to_string(),
            input_file_name: String::new(),
            verbose: false,
            max_table_size: DEFAULT_MAX_TABLE_SIZE,
        }
    }
}

/// Everything produced by a successful generation run.
pub struct Generated<A> {
    pub grammar: Grammar<A>,
    pub lr0: LR0Output,
    pub lalr: LALROutput,
    pub parser: YaccParser,
    pub tables: ParserTables,
    /// The verbose report, if `Options::verbose` was set.
    pub report: Option<String>,
    pub diagnostics: Diagnostics,
}

impl<A> Generated<A> {
    /// The action payloads of the external rules, in the same order as the rule numbers
    /// used by the packed tables (`actions()[0]` belongs to the rule reported as rule 0).
    pub fn actions(&self) -> &[Option<A>] {
        &self.grammar.actions[Rule::ACCEPT.index()..]
    }
}

/// Runs the whole pipeline: checks and packs the grammar, then builds the automaton,
/// the look-ahead sets, the parser actions and the packed tables.
///
/// On a fatal error, the returned error carries every diagnostic that was produced
/// before the failure.
pub fn generate<A>(
    builder: GrammarBuilder<A>,
    options: &Options,
) -> Result<Generated<A>, GenerateError> {
    let (grammar, mut diagnostics) = builder.build()?;
    match run_phases(&grammar, options, &mut diagnostics) {
        Ok((lr0, lalr, parser, tables)) => {
            let report = if options.verbose {
                Some(verbose::report(&grammar, &lr0, &parser))
            } else {
                None
            };
            Ok(Generated {
                grammar,
                lr0,
                lalr,
                parser,
                tables,
                report,
                diagnostics,
            })
        }
        Err(error) => Err(GenerateError { error, diagnostics }),
    }
}

fn run_phases<A>(
    gram: &Grammar<A>,
    options: &Options,
    diagnostics: &mut Diagnostics,
) -> Result<(LR0Output, LALROutput, YaccParser, ParserTables), YaccError> {
    debug!(
        "generate: ntokens={} nvars={} nrules={}",
        gram.ntokens, gram.nvars, gram.nrules
    );
    let lr0 = lr0::compute_lr0(gram)?;
    let lalr = lalr::run_lalr_phase(gram, &lr0)?;
    let parser = mkpar::make_parser(gram, &lr0, &lalr, diagnostics);
    let tables = packing::pack_parser_tables(gram, &lalr.gotos, &parser, options.max_table_size)?;
    Ok((lr0, lalr, parser, tables))
}
