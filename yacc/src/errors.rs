//! Diagnostics: fatal errors, warnings, and the sink that collects them.
//!
//! Messages are rendered in the traditional yacc format:
//!
//! ```text
//! yacc: w - line 12 of "calc.y", the type of expr has been redeclared
//! yacc: e - line 3 of "calc.y", syntax error
//! %token <int NUM
//!        ^
//! yacc: 2 shift/reduce conflicts.
//! ```

use core::fmt::Write;
use log::warn;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// An end-of-run summary, such as the number of conflicts.  Rendered without a code.
    Summary,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    fn code(self) -> Option<char> {
        match self {
            Severity::Summary => None,
            Severity::Warning => Some('w'),
            Severity::Error => Some('e'),
            Severity::Fatal => Some('f'),
        }
    }
}

/// A position in the grammar source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number.
    pub line: usize,
    /// The text of the line, if the position should be rendered with a `^` marker.
    pub text: Option<String>,
    /// 0-based character offset of the marker within `text`.
    pub column: usize,
}

impl Location {
    pub fn line(line: usize) -> Option<Location> {
        if line == 0 {
            None
        } else {
            Some(Location {
                line,
                text: None,
                column: 0,
            })
        }
    }

    pub fn at(line: usize, text: &str, column: usize) -> Location {
        Location {
            line,
            text: Some(text.to_string()),
            column,
        }
    }
}

/// Conditions that stop generation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("the start symbol {0} is undefined")]
    UndefinedGoal(String),
    #[error("the start symbol {0} is a token")]
    TerminalStart(String),
    #[error("the start symbol {0} cannot be declared to be a token")]
    TokenizedStart(String),
    #[error("no grammar has been specified")]
    NoGrammar,
    #[error("a token appears on the lhs of a production")]
    TerminalLhs,
    #[error("illegal use of reserved symbol {0}")]
    UsedReserved(String),
    #[error("syntax error")]
    Syntax,
    #[error("unexpected end-of-file")]
    UnexpectedEof,
    #[error("unmatched /*")]
    UnterminatedComment,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unmatched %{{")]
    UnterminatedText,
    #[error("unterminated action")]
    UnterminatedAction,
    #[error("illegal tag")]
    IllegalTag,
    #[error("illegal character")]
    IllegalCharacter,
    #[error("illegal $-name")]
    IllegalDollar,
    #[error("${0} is untyped")]
    UnknownRhs(i32),
    #[error("too many symbols")]
    TooManySymbols,
    #[error("too many rules")]
    TooManyRules,
    #[error("too many states")]
    TooManyStates,
    #[error("too many gotos")]
    TooManyGotos,
    #[error("maximum table size exceeded")]
    TableOverflow,
    #[error("the token {0} has the same name as a generated item")]
    ReservedTokenName(String),
    #[error("${1} in the action of rule {0} is not one of the values the action can see")]
    ValueOutOfReach(usize, i32),
    #[error("the action of rule {0} is not valid Rust: {1}")]
    ActionSyntax(usize, String),
}

impl ErrorKind {
    /// Limits of the table encoding are fatal; everything else is an error in the input.
    pub fn severity(&self) -> Severity {
        match self {
            ErrorKind::TooManySymbols
            | ErrorKind::TooManyRules
            | ErrorKind::TooManyStates
            | ErrorKind::TooManyGotos
            | ErrorKind::TableOverflow => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// Conditions that are reported, after which generation continues.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Warning {
    #[error("the type of {0} has been redeclared")]
    Retyped(String),
    #[error("the precedence of {0} has been redeclared")]
    Reprec(String),
    #[error("the value of {0} has been redeclared")]
    Revalued(String),
    #[error("the start symbol has been redeclared")]
    Restarted,
    #[error("conflicting %prec specifiers")]
    PrecRedeclared,
    #[error("${0} references beyond the end of the current rule")]
    DollarBeyondRule(i32),
    #[error("$$ is untyped")]
    UntypedLhs,
    #[error("${0} ({1}) is untyped")]
    UntypedRhs(i32, String),
    #[error("the default action assigns an undefined value to $$")]
    DefaultAction,
    #[error("the symbol {0} is undefined")]
    UndefinedSymbol(String),
}

/// A fatal error, with the location it was detected at (when there is one).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}")]
pub struct YaccError {
    pub kind: ErrorKind,
    pub location: Option<Location>,
}

impl YaccError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn at(kind: ErrorKind, location: Option<Location>) -> Self {
        Self { kind, location }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            severity: self.severity(),
            message: self.kind.to_string(),
            location: self.location.clone(),
        }
    }
}

impl From<ErrorKind> for YaccError {
    fn from(kind: ErrorKind) -> Self {
        YaccError::new(kind)
    }
}

/// One rendered-on-demand diagnostic line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn render(&self, program: &str, file: &str) -> String {
        let mut s = String::new();
        match (self.severity.code(), &self.location) {
            (None, _) => {
                let _ = writeln!(s, "{}: {}", program, self.message);
            }
            (Some(code), None) => {
                let _ = writeln!(s, "{}: {} - {}", program, code, self.message);
            }
            (Some(code), Some(loc)) => {
                let _ = writeln!(
                    s,
                    "{}: {} - line {} of \"{}\", {}",
                    program, code, loc.line, file, self.message
                );
                if let Some(text) = &loc.text {
                    s.push_str(&print_pos(text, loc.column));
                }
            }
        }
        s
    }
}

/// Renders the offending line, then a `^` under the offending column.  Tabs are kept in
/// the marker line so that the `^` lines up.
fn print_pos(line: &str, column: usize) -> String {
    let mut s = String::new();
    for c in line.chars().take_while(|&c| c != '\n') {
        if c == '\t' || !c.is_control() {
            s.push(c);
        } else {
            s.push('?');
        }
    }
    s.push('\n');
    for c in line.chars().chain(core::iter::repeat(' ')).take(column) {
        s.push(if c == '\t' { '\t' } else { ' ' });
    }
    s.push_str("^\n");
    s
}

/// The ordered sink of everything reported during a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning, location: Option<Location>) {
        warn!("{}", warning);
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message: warning.to_string(),
            location,
        });
    }

    pub fn summary(&mut self, message: String) {
        warn!("{}", message);
        self.entries.push(Diagnostic {
            severity: Severity::Summary,
            message,
            location: None,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The messages of all warnings (not summaries), in order.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.as_str())
    }

    pub fn render(&self, program: &str, file: &str) -> String {
        self.entries
            .iter()
            .map(|d| d.render(program, file))
            .collect()
    }
}

/// A fatal error, together with the diagnostics that were reported before it.
#[derive(Clone, Debug, Error)]
#[error("{error}")]
pub struct GenerateError {
    pub error: YaccError,
    pub diagnostics: Diagnostics,
}

impl GenerateError {
    /// Renders every diagnostic, ending with the fatal error itself.
    pub fn render(&self, program: &str, file: &str) -> String {
        let mut s = self.diagnostics.render(program, file);
        s.push_str(&self.error.to_diagnostic().render(program, file));
        s
    }
}
