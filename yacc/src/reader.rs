//! Reads a grammar written in yacc syntax, and feeds it to a [`GrammarBuilder`].
//!
//! The input has the traditional three sections:
//!
//! ```text
//! declarations
//! %%
//! rules
//! %%
//! epilog
//! ```
//!
//! The declarations section contains `%token`, `%left`, `%right`, `%nonassoc`, `%type`
//! and `%start` declarations, and `%{ ... %}` blocks, whose text is collected as the
//! prolog.  The rules section contains rules of the form `lhs : rhs ... | rhs ... ;`,
//! where each alternative can carry a `%prec` clause and one or more actions.  Actions
//! are stored verbatim (without the enclosing braces).  Their `$` references are checked
//! against the rule, but not rewritten; that is left to whoever consumes the actions.
//!
//! Everything after the second `%%` is the epilog.
//!
//! `,` and `;` are treated as white space, as yacc does, so they can separate anything.
//! Inside actions and `%{ %}` blocks, a `'` that does not start a character literal is
//! taken to be a Rust lifetime.

use crate::builder::{is_reserved, GrammarBuilder, SymbolId};
use crate::errors::{ErrorKind, GenerateError, Location, Warning, YaccError};
use crate::grammar::Assoc;
use crate::Options;
use log::{debug, trace};
use std::convert::TryFrom;

/// The result of reading a grammar file.
pub struct ReadGrammar {
    /// The declarations and rules.  Each action is the source text of the action.
    pub builder: GrammarBuilder<String>,
    /// The text of the `%{ ... %}` blocks, concatenated.
    pub prolog: String,
    /// The text after the second `%%`, if any.
    pub epilog: String,
}

/// Reads a grammar.  On failure, the error carries the warnings reported before it.
pub fn read_grammar(text: &str, options: &Options) -> Result<ReadGrammar, GenerateError> {
    debug!("reading grammar {:?}", options.input_file_name);
    let mut reader = Reader::new(text);
    match reader.read() {
        Ok(epilog) => Ok(ReadGrammar {
            builder: reader.builder,
            prolog: reader.prolog,
            epilog,
        }),
        Err(e) => Err(reader.builder.fail(e)),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Keyword {
    Token,
    Type,
    Left,
    Right,
    NonAssoc,
    Start,
    Text,
    Mark,
}

/// A saved input position, for error reporting.
#[derive(Copy, Clone, Debug)]
struct Mark {
    pos: usize,
    line: usize,
    line_start: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '.' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
    /// 1-based line number of `pos`.
    line: usize,
    /// Position of the first character of the current line.
    line_start: usize,
    builder: GrammarBuilder<String>,
    prolog: String,
    /// Set once any `<tag>` has been seen.  From then on, `$` references are type checked.
    tags_used: bool,
}

impl Reader {
    fn new(text: &str) -> Self {
        let mut builder = GrammarBuilder::new();
        builder.set_line(1);
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
            builder,
            prolog: String::new(),
            tags_used: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.line_start = self.pos;
            self.builder.set_line(self.line);
        }
        Some(c)
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            line_start: self.line_start,
        }
    }

    fn location(&self, mark: Mark) -> Location {
        let text: String = self.chars[mark.line_start..]
            .iter()
            .take_while(|&&c| c != '\n')
            .collect();
        Location::at(mark.line, &text, mark.pos - mark.line_start)
    }

    fn error_at(&self, kind: ErrorKind, mark: Mark) -> YaccError {
        YaccError::at(kind, Some(self.location(mark)))
    }

    fn syntax_error(&self) -> YaccError {
        self.error_at(ErrorKind::Syntax, self.mark())
    }

    fn unexpected_eof(&self) -> YaccError {
        YaccError::at(ErrorKind::UnexpectedEof, Location::line(self.line))
    }

    fn warn(&mut self, warning: Warning) {
        let here = Location::line(self.line);
        self.builder.warn(warning, here);
    }

    /// Skips a `/* */` comment.  The input is positioned at the `/`.
    fn skip_comment(&mut self) -> Result<(), YaccError> {
        let start = self.mark();
        self.pos += 2;
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(self.error_at(ErrorKind::UnterminatedComment, start)),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Skips white space, separators and comments, and returns the next character
    /// without consuming it.  A `\` reads as `%`.
    fn nextc(&mut self) -> Result<Option<char>, YaccError> {
        loop {
            match self.peek() {
                None => return Ok(None),
                Some(' ') | Some('\t') | Some('\x0c') | Some('\r') | Some('\x0b')
                | Some('\n') | Some(',') | Some(';') => {
                    self.bump();
                }
                Some('\\') => return Ok(Some('%')),
                Some('/') if self.peek_at(1) == Some('*') => self.skip_comment()?,
                Some('/') if self.peek_at(1) == Some('/') => self.skip_line(),
                Some(c) => return Ok(Some(c)),
            }
        }
    }

    fn nextc_or_eof(&mut self) -> Result<char, YaccError> {
        match self.nextc()? {
            Some(c) => Ok(c),
            None => Err(self.unexpected_eof()),
        }
    }

    /// Reads the keyword after a `%` (or `\`).
    fn keyword(&mut self) -> Result<Keyword, YaccError> {
        let start = self.mark();
        self.pos += 1;
        match self.peek() {
            Some(c) if c.is_alphabetic() => {
                let mut word = String::new();
                while let Some(c) = self.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    word.extend(c.to_lowercase());
                    self.pos += 1;
                }
                match word.as_str() {
                    "token" | "term" => Ok(Keyword::Token),
                    "type" => Ok(Keyword::Type),
                    "left" => Ok(Keyword::Left),
                    "right" => Ok(Keyword::Right),
                    "nonassoc" | "binary" => Ok(Keyword::NonAssoc),
                    "start" => Ok(Keyword::Start),
                    _ => Err(self.error_at(ErrorKind::Syntax, start)),
                }
            }
            Some(c) => {
                let k = match c {
                    '{' => Keyword::Text,
                    '%' | '\\' => Keyword::Mark,
                    '<' => Keyword::Left,
                    '>' => Keyword::Right,
                    '0' => Keyword::Token,
                    '2' => Keyword::NonAssoc,
                    _ => return Err(self.error_at(ErrorKind::Syntax, start)),
                };
                self.pos += 1;
                Ok(k)
            }
            None => Err(self.error_at(ErrorKind::Syntax, start)),
        }
    }

    /// Copies a string or character literal inside program text.  The input is
    /// positioned at the opening quote.  A `'` that does not begin a character literal
    /// is a lifetime, and only the quote itself is copied.
    fn copy_quoted(&mut self, out: &mut String) -> Result<(), YaccError> {
        let start = self.mark();
        let quote = match self.peek() {
            Some(q) => q,
            None => return Ok(()),
        };
        if quote == '\'' && self.peek_at(1) != Some('\\') && self.peek_at(2) != Some('\'') {
            out.push(quote);
            self.pos += 1;
            return Ok(());
        }
        out.push(quote);
        self.pos += 1;
        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => return Err(self.error_at(ErrorKind::UnterminatedString, start)),
            };
            out.push(c);
            if c == quote {
                return Ok(());
            }
            if c == '\n' && quote == '\'' {
                return Err(self.error_at(ErrorKind::UnterminatedString, start));
            }
            if c == '\\' {
                match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.error_at(ErrorKind::UnterminatedString, start)),
                }
            }
        }
    }

    /// Copies a comment inside program text.  The input is positioned at the `/`.
    fn copy_comment(&mut self, out: &mut String) -> Result<(), YaccError> {
        let start = self.mark();
        if self.peek_at(1) == Some('/') {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                out.push(c);
                self.pos += 1;
            }
            return Ok(());
        }
        out.push_str("/*");
        self.pos += 2;
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.pos += 1;
                    out.push_str("*/");
                    return Ok(());
                }
                Some(c) => out.push(c),
                None => return Err(self.error_at(ErrorKind::UnterminatedComment, start)),
            }
        }
    }

    /// Copies a `%{ ... %}` block into the prolog.  The input is positioned after `%{`.
    fn copy_text(&mut self) -> Result<(), YaccError> {
        let start = Mark {
            pos: self.pos - 2,
            ..self.mark()
        };
        if self.peek() == Some('\n') {
            self.bump();
        }
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error_at(ErrorKind::UnterminatedText, start)),
                Some('%') if self.peek_at(1) == Some('}') => {
                    self.pos += 2;
                    break;
                }
                Some('"') | Some('\'') => self.copy_quoted(&mut text)?,
                Some('/') if matches!(self.peek_at(1), Some('*') | Some('/')) => {
                    self.copy_comment(&mut text)?
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        trace!("prolog text at line {}: {} chars", start.line, text.len());
        self.prolog.push_str(&text);
        if !self.prolog.is_empty() && !self.prolog.ends_with('\n') {
            self.prolog.push('\n');
        }
        Ok(())
    }

    fn get_number(&mut self) -> i32 {
        let mut n: i32 = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            n = n.saturating_mul(10).saturating_add(d as i32);
            self.pos += 1;
        }
        n
    }

    fn get_name(&mut self) -> Result<String, YaccError> {
        let start = self.mark();
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        if is_reserved(&name) {
            return Err(self.error_at(ErrorKind::UsedReserved(name), start));
        }
        Ok(name)
    }

    /// Reads a quoted literal, and returns its unescaped text.
    fn get_literal(&mut self) -> Result<String, YaccError> {
        let start = self.mark();
        let quote = self.bump();
        let mut text = String::new();
        loop {
            let c = match self.bump() {
                Some('\n') | None => {
                    return Err(self.error_at(ErrorKind::UnterminatedString, start))
                }
                Some(c) => c,
            };
            if Some(c) == quote {
                break;
            }
            if c != '\\' {
                text.push(c);
                continue;
            }
            let escape = Mark {
                pos: self.pos - 1,
                ..self.mark()
            };
            let c = match self.bump() {
                Some(c) => c,
                None => return Err(self.error_at(ErrorKind::UnterminatedString, start)),
            };
            let (value, numeric) = match c {
                // an escaped newline continues the literal on the next line
                '\n' => continue,
                '0'..='7' => {
                    let mut n = c as u32 - '0' as u32;
                    for _ in 0..2 {
                        match self.peek().and_then(|c| c.to_digit(8)) {
                            Some(d) => {
                                n = n * 8 + d;
                                self.pos += 1;
                            }
                            None => break,
                        }
                    }
                    (n, true)
                }
                'x' => {
                    let mut n: u32 = 0;
                    while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                        n = n.saturating_mul(16).saturating_add(d);
                        self.pos += 1;
                    }
                    (n, true)
                }
                'a' => (0x07, false),
                'b' => (0x08, false),
                'f' => (0x0c, false),
                'n' => (0x0a, false),
                'r' => (0x0d, false),
                't' => (0x09, false),
                'v' => (0x0b, false),
                c => (c as u32, false),
            };
            if numeric && value > 0xff {
                return Err(self.error_at(ErrorKind::IllegalCharacter, escape));
            }
            match char::from_u32(value) {
                Some(ch) => text.push(ch),
                None => return Err(self.error_at(ErrorKind::IllegalCharacter, escape)),
            }
        }
        Ok(text)
    }

    /// Reads a name or a literal, whichever starts at the current position.
    fn get_symbol(&mut self) -> Result<Option<SymbolId>, YaccError> {
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                let start = self.mark();
                let name = self.get_name()?;
                match self.builder.symbol(&name) {
                    Ok(sym) => Ok(Some(sym)),
                    Err(e) => Err(self.error_at(e.kind, start)),
                }
            }
            Some('\'') | Some('"') => {
                let text = self.get_literal()?;
                Ok(Some(self.builder.literal(&text)))
            }
            _ => Ok(None),
        }
    }

    /// Reads a `<tag>`.  The input is positioned at the `<`.  Generic types such as
    /// `<Vec<Box<Expr>>>` are accepted.  If `empty_ok`, then `<>` reads as `None`.
    fn get_tag(&mut self, empty_ok: bool) -> Result<Option<String>, YaccError> {
        let start = self.mark();
        self.pos += 1;
        let c = self.nextc_or_eof()?;
        if empty_ok && c == '>' {
            self.pos += 1;
            return Ok(None);
        }
        if !(c.is_alphabetic() || c == '_' || c == '$') {
            return Err(self.error_at(ErrorKind::IllegalTag, start));
        }

        let mut tag = String::new();
        let mut depth = 0;
        while let Some(c) = self.peek() {
            match c {
                '<' => depth += 1,
                '>' if depth == 0 => break,
                '>' => depth -= 1,
                ' ' | '?' | '[' | ']' | ',' | ':' | '&' | '\'' if depth > 0 => {}
                c if is_ident_char(c) => {}
                _ => break,
            }
            tag.push(c);
            self.pos += 1;
        }

        if self.nextc_or_eof()? != '>' {
            return Err(self.error_at(ErrorKind::IllegalTag, start));
        }
        self.pos += 1;
        self.tags_used = true;
        Ok(Some(tag))
    }

    fn declare_tokens(&mut self, assoc: Assoc) -> Result<(), YaccError> {
        let mut tag = None;
        if self.nextc_or_eof()? == '<' {
            tag = self.get_tag(false)?;
            self.nextc_or_eof()?;
        }

        let mut tokens = Vec::new();
        while let Some(sym) = self.get_symbol()? {
            let mut value = None;
            if let Some(c) = self.nextc()? {
                if c.is_ascii_digit() {
                    let start = self.mark();
                    let n = self.get_number();
                    match i16::try_from(n) {
                        Ok(n) => value = Some(n),
                        Err(_) => return Err(self.error_at(ErrorKind::Syntax, start)),
                    }
                    self.nextc()?;
                }
            }
            tokens.push((sym, value));
        }

        debug!("declare {:?}: {} symbols, tag {:?}", assoc, tokens.len(), tag);
        self.builder.declare_tokens(assoc, tag.as_deref(), &tokens)
    }

    fn declare_types(&mut self) -> Result<(), YaccError> {
        if self.nextc_or_eof()? != '<' {
            return Err(self.syntax_error());
        }
        let tag = self.get_tag(false)?;
        let mut symbols = Vec::new();
        loop {
            self.nextc()?;
            match self.get_symbol()? {
                Some(sym) => symbols.push(sym),
                None => break,
            }
        }
        if let Some(tag) = tag {
            self.builder.declare_types(&tag, &symbols);
        }
        Ok(())
    }

    fn declare_start(&mut self) -> Result<(), YaccError> {
        let c = self.nextc_or_eof()?;
        if !is_ident_start(c) {
            return Err(self.syntax_error());
        }
        match self.get_symbol()? {
            Some(sym) => self.builder.declare_start(sym),
            None => Err(self.syntax_error()),
        }
    }

    fn read_declarations(&mut self) -> Result<(), YaccError> {
        loop {
            if self.nextc_or_eof()? != '%' {
                return Err(self.syntax_error());
            }
            match self.keyword()? {
                Keyword::Mark => return Ok(()),
                Keyword::Text => self.copy_text()?,
                Keyword::Token => self.declare_tokens(Assoc::Token)?,
                Keyword::Left => self.declare_tokens(Assoc::Left)?,
                Keyword::Right => self.declare_tokens(Assoc::Right)?,
                Keyword::NonAssoc => self.declare_tokens(Assoc::NonAssoc)?,
                Keyword::Type => self.declare_types()?,
                Keyword::Start => self.declare_start()?,
            }
        }
    }

    /// Reads up to and including the `:` of the first rule.
    fn advance_to_start(&mut self) -> Result<(), YaccError> {
        loop {
            match self.nextc()? {
                Some('%') => {}
                Some(_) => break,
                None => return Err(YaccError::new(ErrorKind::NoGrammar)),
            }
            let start = self.mark();
            match self.keyword()? {
                Keyword::Mark => return Err(YaccError::new(ErrorKind::NoGrammar)),
                Keyword::Text => self.copy_text()?,
                Keyword::Start => self.declare_start()?,
                _ => return Err(self.error_at(ErrorKind::Syntax, start)),
            }
        }

        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            _ => return Err(self.syntax_error()),
        }
        let lhs = match self.get_symbol()? {
            Some(sym) => sym,
            None => return Err(self.syntax_error()),
        };
        if self.nextc_or_eof()? != ':' {
            return Err(self.syntax_error());
        }
        self.pos += 1;
        self.builder.start_rule(lhs)
    }

    /// Reads a symbol in a rule.  A symbol followed by `:` begins a new rule.
    fn add_symbol(&mut self) -> Result<(), YaccError> {
        let sym = match self.get_symbol()? {
            Some(sym) => sym,
            None => return Err(self.syntax_error()),
        };
        if self.nextc()? == Some(':') {
            self.pos += 1;
            return self.builder.start_rule(sym);
        }
        self.builder.add_symbol(sym);
        Ok(())
    }

    /// Handles a `%` inside the rules.  Returns true at the `%%` that ends the rules.
    fn mark_symbol(&mut self) -> Result<bool, YaccError> {
        let start = self.mark();
        match self.peek_at(1) {
            Some('%') | Some('\\') => {
                self.pos += 2;
                return Ok(true);
            }
            Some('=') => self.pos += 2,
            Some(_) => {
                let word: String = self.chars[self.pos + 1..]
                    .iter()
                    .take_while(|&&c| is_ident_char(c))
                    .collect();
                if !word.eq_ignore_ascii_case("prec") {
                    return Err(self.error_at(ErrorKind::Syntax, start));
                }
                self.pos += 5;
            }
            None => return Err(self.error_at(ErrorKind::Syntax, start)),
        }

        self.nextc()?;
        match self.get_symbol()? {
            Some(sym) => {
                self.builder.mark_prec(sym);
                Ok(false)
            }
            None => Err(self.syntax_error()),
        }
    }

    /// Copies an action, `{ ... }` or `= ... ;`, and attaches it to the current rule.
    fn copy_action(&mut self) -> Result<(), YaccError> {
        let start = self.mark();
        let braced = self.bump() == Some('{');
        let n = self.builder.current_rhs().len() as i32;
        let mut depth = if braced { 1 } else { 0 };
        let mut text = String::new();

        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => return Err(self.error_at(ErrorKind::UnterminatedAction, start)),
            };
            match c {
                '$' => self.check_dollar(n, &mut text)?,
                '"' | '\'' => self.copy_quoted(&mut text)?,
                '/' if matches!(self.peek_at(1), Some('*') | Some('/')) => {
                    self.copy_comment(&mut text)?
                }
                ';' if depth == 0 => {
                    self.pos += 1;
                    break;
                }
                '{' => {
                    depth += 1;
                    text.push(c);
                    self.pos += 1;
                }
                '}' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth <= 0 {
                        break;
                    }
                    text.push(c);
                }
                _ => {
                    text.push(c);
                    self.bump();
                }
            }
        }

        trace!("action for rule {}: {:?}", self.builder.nrules(), text);
        self.builder.add_action(text.trim().to_string());
        Ok(())
    }

    /// Checks one `$` reference in an action and copies it.  `n` is the number of rhs
    /// symbols that precede the action.
    fn check_dollar(&mut self, n: i32, out: &mut String) -> Result<(), YaccError> {
        let start = self.mark();
        let from = self.pos;
        match self.peek_at(1) {
            Some('<') => {
                self.pos += 1;
                self.get_tag(true)?;
                match self.peek() {
                    Some('$') => self.pos += 1,
                    Some(c) if c.is_ascii_digit() => {
                        let i = self.get_number();
                        if i > n {
                            self.warn(Warning::DollarBeyondRule(i));
                        }
                    }
                    Some('-') if self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) => {
                        self.pos += 1;
                        self.get_number();
                    }
                    _ => return Err(self.error_at(ErrorKind::IllegalDollar, start)),
                }
            }
            Some('$') => {
                self.pos += 2;
                if self.tags_used {
                    let untyped = match self.builder.current_lhs() {
                        Some(lhs) => self.builder.tag(lhs).is_none(),
                        None => false,
                    };
                    if untyped {
                        self.warn(Warning::UntypedLhs);
                    }
                }
            }
            Some(c) if c.is_ascii_digit() => {
                self.pos += 1;
                let i = self.get_number();
                if self.tags_used {
                    if i <= 0 || i > n {
                        return Err(self.error_at(ErrorKind::UnknownRhs(i), start));
                    }
                    let rhs = self.builder.current_rhs();
                    let sym = rhs[(rhs.len() as i32 - n + i - 1) as usize];
                    if self.builder.tag(sym).is_none() {
                        let name = self.builder.name(sym).to_string();
                        self.warn(Warning::UntypedRhs(i, name));
                    }
                } else if i > n {
                    self.warn(Warning::DollarBeyondRule(i));
                }
            }
            Some('-') if self.peek_at(2).map_or(false, |c| c.is_ascii_digit()) => {
                self.pos += 2;
                let i = self.get_number();
                if self.tags_used {
                    return Err(self.error_at(ErrorKind::UnknownRhs(-i), start));
                }
            }
            _ => {
                // not a reference; copy the `$` and any name that follows it
                self.pos += 1;
                while self.peek().map_or(false, |c| c.is_alphanumeric() || c == '_') {
                    self.pos += 1;
                }
            }
        }
        out.extend(&self.chars[from..self.pos]);
        Ok(())
    }

    fn read_grammar(&mut self) -> Result<(), YaccError> {
        self.advance_to_start()?;
        loop {
            let c = match self.nextc()? {
                Some(c) => c,
                None => break,
            };
            match c {
                c if is_ident_start(c) || c == '\'' || c == '"' => self.add_symbol()?,
                '{' | '=' => self.copy_action()?,
                '|' => {
                    self.pos += 1;
                    self.builder.alternative()?;
                }
                '%' => {
                    if self.mark_symbol()? {
                        break;
                    }
                }
                _ => return Err(self.syntax_error()),
            }
        }
        self.builder.end_rule();
        Ok(())
    }

    /// Reads the whole input, and returns the epilog.
    fn read(&mut self) -> Result<String, YaccError> {
        self.read_declarations()?;
        self.read_grammar()?;

        let rest: String = self.chars[self.pos.min(self.chars.len())..].iter().collect();
        let epilog = match rest.find('\n') {
            Some(i) if rest[..i].trim().is_empty() => rest[i + 1..].to_string(),
            _ => rest,
        };
        debug!(
            "read {} rules, prolog {} chars, epilog {} chars",
            self.builder.nrules(),
            self.prolog.len(),
            epilog.len()
        );
        Ok(epilog)
    }
}
