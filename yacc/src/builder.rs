//! Builds a [`Grammar`] from declarations and rules.
//!
//! `GrammarBuilder` is the seam between a front end (such as [`crate::reader`]) and the
//! generator.  The front end declares tokens, types and the start symbol, then describes
//! each rule as a sequence of calls:
//!
//! ```rust,ignore
//! let mut b = GrammarBuilder::<&str>::new();
//! let num = b.symbol("NUM")?;
//! let plus = b.literal("+");
//! let expr = b.symbol("expr")?;
//! b.declare_tokens(Assoc::Token, None, &[(num, None)])?;
//! b.declare_tokens(Assoc::Left, None, &[(plus, None)])?;
//! b.start_rule(expr)?;
//! b.add_symbol(expr);
//! b.add_symbol(plus);
//! b.add_symbol(expr);
//! b.add_action("$$ = $1 + $3");
//! b.alternative()?;
//! b.add_symbol(num);
//! b.end_rule();
//! let (grammar, diagnostics) = b.build()?;
//! ```
//!
//! An action that is followed by more symbols is a mid-rule action.  It is moved onto an
//! empty rule for a generated non-terminal (`$$1`, `$$2`, ...), which takes the action's
//! place in the enclosing rule.

use crate::errors::{Diagnostics, ErrorKind, GenerateError, Location, Warning, YaccError};
use crate::grammar::{Assoc, Grammar, UNDEFINED};
use crate::{Item, Rule, Symbol, SymbolOrRule};
use log::debug;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::mem;

const PREDEFINED_RULES: usize = 3;
const PREDEFINED_ITEMS: usize = 4;

const NO_SYMBOL: usize = !0;
const NO_ITEM: usize = !0;

// symbol classes
#[derive(Clone, Copy, PartialEq, Debug)]
enum SymClass {
    Unknown,
    Terminal,
    NonTerminal,
}

struct SymbolDef {
    name: String,
    tag: Option<String>,
    value: i16,
    prec: i16,
    assoc: Assoc,
    class: SymClass,
}

fn make_symbol(name: String) -> SymbolDef {
    SymbolDef {
        name,
        tag: None,
        value: UNDEFINED,
        prec: 0,
        assoc: Assoc::Token,
        class: SymClass::Unknown,
    }
}

/// Identifies a symbol within a `GrammarBuilder`.  These are not the packed symbol
/// indices of the finished `Grammar`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// Returns true for the names that the generator reserves for itself.
pub fn is_reserved(name: &str) -> bool {
    if name == "." || name == "$accept" || name == "$end" {
        return true;
    }
    match name.strip_prefix("$$") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Produces the name under which a literal token is entered in the symbol table: the text
/// in single quotes if it is one character long, otherwise in double quotes, with C escapes.
pub fn quote_literal(text: &str) -> String {
    let quote = if text.chars().count() == 1 { '\'' } else { '"' };
    let mut s = String::with_capacity(text.len() + 2);
    s.push(quote);
    for c in text.chars() {
        if c == '\\' || c == quote {
            s.push('\\');
            s.push(c);
        } else if (c as u32) >= 0x20 {
            s.push(c);
        } else {
            s.push('\\');
            match c {
                '\x07' => s.push('a'),
                '\x08' => s.push('b'),
                '\x0c' => s.push('f'),
                '\n' => s.push('n'),
                '\r' => s.push('r'),
                '\t' => s.push('t'),
                '\x0b' => s.push('v'),
                _ => s.push_str(&format!("{:03o}", c as u32)),
            }
        }
    }
    s.push(quote);
    s
}

/// Collects declarations and rules, and packs them into a `Grammar`.
pub struct GrammarBuilder<A> {
    /// Contains indices that point into `self.symbols`, or `NO_ITEM` at the end of each rule.
    pitem: Vec<usize>,

    /// Contains indices that point into `self.symbols`.
    /// len = nrules
    lhs: Vec<usize>,

    /// len = nrules
    rprec: Vec<i16>,
    rassoc: Vec<Assoc>,
    actions: Vec<Option<A>>,
    action_offset: Vec<i16>,

    /// Contains all of the symbols, in the order that they are first encountered.
    /// symbols[0] is always the `error` token.
    symbols: Vec<SymbolDef>,

    /// A lookup table, which gives you an index into self.symbols
    symbol_table: HashMap<String, usize>,

    goal: Option<usize>,

    /// The precedence level of the most recent `%left` / `%right` / `%nonassoc`.
    prec: i16,

    // used for generating names for mid-rule action symbols
    gensym: u32,

    last_was_action: bool,
    in_rule: bool,

    line: usize,
    diagnostics: Diagnostics,
}

impl<A> Default for GrammarBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> GrammarBuilder<A> {
    pub fn new() -> Self {
        let mut b = Self {
            pitem: vec![NO_ITEM; PREDEFINED_ITEMS],
            lhs: vec![NO_SYMBOL; PREDEFINED_RULES],
            rprec: vec![0; PREDEFINED_RULES],
            rassoc: vec![Assoc::Token; PREDEFINED_RULES],
            actions: (0..PREDEFINED_RULES).map(|_| None).collect(),
            action_offset: vec![0; PREDEFINED_RULES],
            symbols: Vec::new(),
            symbol_table: HashMap::new(),
            goal: None,
            prec: 0,
            gensym: 0,
            last_was_action: false,
            in_rule: false,
            line: 0,
            diagnostics: Diagnostics::new(),
        };
        let error = b.lookup("error");
        b.symbols[error].class = SymClass::Terminal;
        b
    }

    /// number of rules (productions) in the grammar
    pub fn nrules(&self) -> usize {
        self.lhs.len()
    }

    /// Sets the source line that subsequent diagnostics refer to.
    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    fn here(&self) -> Option<Location> {
        Location::line(self.line)
    }

    fn error(&self, kind: ErrorKind) -> YaccError {
        YaccError::at(kind, self.here())
    }

    /// Records a warning found by the front end.
    pub fn warn(&mut self, warning: Warning, location: Option<Location>) {
        self.diagnostics.warn(warning, location);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Gives up, pairing `error` with everything reported so far.
    pub fn fail(self, error: YaccError) -> GenerateError {
        GenerateError {
            error,
            diagnostics: self.diagnostics,
        }
    }

    fn lookup(&mut self, name: &str) -> usize {
        if let Some(&index) = self.symbol_table.get(name) {
            return index;
        }
        let index = self.symbols.len();
        self.symbols.push(make_symbol(name.to_string()));
        self.symbol_table.insert(name.to_string(), index);
        index
    }

    /// Looks up (or adds) a named symbol.
    pub fn symbol(&mut self, name: &str) -> Result<SymbolId, YaccError> {
        if is_reserved(name) {
            return Err(self.error(ErrorKind::UsedReserved(name.to_string())));
        }
        Ok(SymbolId(self.lookup(name)))
    }

    /// Looks up (or adds) a literal token, such as `'+'` or `"<="`.  `text` is the unquoted
    /// content.  A one-character literal gets that character's code as its value, unless it
    /// already has one.
    pub fn literal(&mut self, text: &str) -> SymbolId {
        let index = self.lookup(&quote_literal(text));
        let sym = &mut self.symbols[index];
        sym.class = SymClass::Terminal;
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if sym.value == UNDEFINED {
                if let Ok(value) = i16::try_from(c as u32) {
                    sym.value = value;
                }
            }
        }
        SymbolId(index)
    }

    pub fn name(&self, sym: SymbolId) -> &str {
        &self.symbols[sym.0].name
    }

    pub fn tag(&self, sym: SymbolId) -> Option<&str> {
        self.symbols[sym.0].tag.as_deref()
    }

    /// The lhs of the rule being built.
    pub fn current_lhs(&self) -> Option<SymbolId> {
        if self.in_rule {
            self.lhs.last().map(|&s| SymbolId(s))
        } else {
            None
        }
    }

    /// The rhs symbols added so far to the rule being built.
    pub fn current_rhs(&self) -> Vec<SymbolId> {
        if !self.in_rule {
            return Vec::new();
        }
        self.pitem
            .iter()
            .rev()
            .take_while(|&&s| s != NO_ITEM)
            .map(|&s| SymbolId(s))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    /// Declares tokens.  `assoc` other than `Assoc::Token` starts a new, higher precedence
    /// level.  The first declaration of a tag, precedence or value wins; a later conflicting
    /// one is reported and ignored.
    pub fn declare_tokens(
        &mut self,
        assoc: Assoc,
        tag: Option<&str>,
        tokens: &[(SymbolId, Option<i16>)],
    ) -> Result<(), YaccError> {
        if assoc != Assoc::Token {
            self.prec += 1;
        }
        for &(SymbolId(s), value) in tokens {
            if self.goal == Some(s) {
                let name = self.symbols[s].name.clone();
                return Err(self.error(ErrorKind::TokenizedStart(name)));
            }
            let here = self.here();
            let prec = self.prec;
            let sym = &mut self.symbols[s];
            sym.class = SymClass::Terminal;

            if let Some(tag) = tag {
                match &sym.tag {
                    Some(old) if old != tag => {
                        self.diagnostics
                            .warn(Warning::Retyped(sym.name.clone()), here.clone());
                    }
                    Some(_) => {}
                    None => sym.tag = Some(tag.to_string()),
                }
            }

            if assoc != Assoc::Token {
                if sym.prec != 0 && sym.prec != prec {
                    self.diagnostics
                        .warn(Warning::Reprec(sym.name.clone()), here.clone());
                } else {
                    sym.assoc = assoc;
                    sym.prec = prec;
                }
            }

            if let Some(value) = value {
                if sym.value != UNDEFINED && sym.value != value {
                    self.diagnostics
                        .warn(Warning::Revalued(sym.name.clone()), here);
                } else {
                    sym.value = value;
                }
            }
        }
        Ok(())
    }

    /// Declares the `<tag>` of some symbols (`%type`).
    pub fn declare_types(&mut self, tag: &str, symbols: &[SymbolId]) {
        for &SymbolId(s) in symbols {
            let here = self.here();
            let sym = &mut self.symbols[s];
            match &sym.tag {
                Some(old) if old != tag => {
                    self.diagnostics.warn(Warning::Retyped(sym.name.clone()), here);
                }
                Some(_) => {}
                None => sym.tag = Some(tag.to_string()),
            }
        }
    }

    /// Declares the start symbol (`%start`).  Without this, the lhs of the first rule is
    /// the start symbol.
    pub fn declare_start(&mut self, start: SymbolId) -> Result<(), YaccError> {
        if self.symbols[start.0].class == SymClass::Terminal {
            let name = self.symbols[start.0].name.clone();
            return Err(self.error(ErrorKind::TerminalStart(name)));
        }
        if self.goal.is_some() && self.goal != Some(start.0) {
            let here = self.here();
            self.diagnostics.warn(Warning::Restarted, here);
        }
        self.goal = Some(start.0);
        Ok(())
    }

    /// Begins a rule for `lhs`, ending the current rule (if any).
    pub fn start_rule(&mut self, lhs: SymbolId) -> Result<(), YaccError> {
        if self.in_rule {
            self.end_rule();
        }
        let s = lhs.0;
        if self.goal.is_none() {
            if self.symbols[s].class == SymClass::Terminal {
                let name = self.symbols[s].name.clone();
                return Err(self.error(ErrorKind::TerminalStart(name)));
            }
            self.goal = Some(s);
        }
        if self.symbols[s].class == SymClass::Terminal {
            return Err(self.error(ErrorKind::TerminalLhs));
        }
        self.symbols[s].class = SymClass::NonTerminal;
        self.lhs.push(s);
        self.rprec.push(UNDEFINED);
        self.rassoc.push(Assoc::Token);
        self.actions.push(None);
        self.action_offset.push(0);
        self.in_rule = true;
        self.last_was_action = false;
        Ok(())
    }

    /// Ends the current rule and begins another one for the same lhs (`|`).
    pub fn alternative(&mut self) -> Result<(), YaccError> {
        match self.current_lhs() {
            Some(lhs) => {
                self.end_rule();
                self.start_rule(lhs)
            }
            None => Err(self.error(ErrorKind::Syntax)),
        }
    }

    /// Adds a symbol to the RHS of the current rule being built.
    /// Can only be called between calls to start_rule() and end_rule().
    pub fn add_symbol(&mut self, sym: SymbolId) {
        assert!(self.in_rule, "add_symbol called outside of a rule");
        if self.last_was_action {
            self.insert_empty_rule();
            self.last_was_action = false;
        }
        self.pitem.push(sym.0);
    }

    /// Sets the precedence of the current rule to that of `sym` (`%prec`).
    pub fn mark_prec(&mut self, sym: SymbolId) {
        assert!(self.in_rule, "mark_prec called outside of a rule");
        let rule = self.nrules() - 1;
        let (prec, assoc) = (self.symbols[sym.0].prec, self.symbols[sym.0].assoc);
        if self.rprec[rule] != UNDEFINED && prec != self.rprec[rule] {
            let here = self.here();
            self.diagnostics.warn(Warning::PrecRedeclared, here);
        }
        self.rprec[rule] = prec;
        self.rassoc[rule] = assoc;
    }

    /// Attaches an action to the current rule.  If more symbols follow, the action becomes
    /// a mid-rule action.
    pub fn add_action(&mut self, action: A) {
        assert!(self.in_rule, "add_action called outside of a rule");
        if self.last_was_action {
            self.insert_empty_rule();
        }
        self.last_was_action = true;
        let rule = self.nrules() - 1;
        let offset = self.current_rhs_len();
        self.actions[rule] = Some(action);
        self.action_offset[rule] = offset as i16;
    }

    fn current_rhs_len(&self) -> usize {
        self.pitem
            .iter()
            .rev()
            .take_while(|&&s| s != NO_ITEM)
            .count()
    }

    /// Adds a complete rule.
    pub fn add_rule(
        &mut self,
        lhs: SymbolId,
        rhs: &[SymbolId],
        action: Option<A>,
    ) -> Result<(), YaccError> {
        self.start_rule(lhs)?;
        for &sym in rhs {
            self.add_symbol(sym);
        }
        if let Some(action) = action {
            self.add_action(action);
        }
        self.end_rule();
        Ok(())
    }

    // Terminates the current rule.
    pub fn end_rule(&mut self) {
        if !self.in_rule {
            return;
        }
        let rule = self.nrules() - 1;
        let rhs_len = self.current_rhs_len();
        if !self.last_was_action {
            if self.symbols[self.lhs[rule]].tag.is_some() && rhs_len == 0 {
                let here = self.here();
                self.diagnostics.warn(Warning::DefaultAction, here);
            }
            self.action_offset[rule] = rhs_len as i16;
        }
        self.pitem.push(NO_ITEM);
        self.in_rule = false;
        self.last_was_action = false;
    }

    /// Moves the pending action of the current rule onto a new empty rule, whose lhs is a
    /// generated non-terminal.  That non-terminal is appended to the current rule's rhs.
    fn insert_empty_rule(&mut self) {
        self.gensym += 1;
        let rule = self.nrules() - 1;
        let tag = self.symbols[self.lhs[rule]].tag.clone();
        let sym_index = self.lookup(&format!("$${}", self.gensym));
        {
            let sym = &mut self.symbols[sym_index];
            sym.tag = tag;
            sym.class = SymClass::NonTerminal;
        }

        // The empty rule's terminator goes in front of the current rule's rhs.
        let mut bpp = self.pitem.len();
        self.pitem.push(NO_ITEM);
        self.pitem.push(sym_index);
        loop {
            let b = self.pitem[bpp - 1];
            self.pitem[bpp] = b;
            if b == NO_ITEM {
                break;
            }
            bpp -= 1;
        }

        // Insert the generated rule right before the current rule.
        let action = self.actions[rule].take();
        let offset = self.action_offset[rule];
        self.lhs.insert(rule, sym_index);
        self.rprec.insert(rule, 0);
        self.rassoc.insert(rule, Assoc::Token);
        self.actions.insert(rule, action);
        self.action_offset.insert(rule, offset);
    }

    /// Checks the symbols, then "packs" the symbol table and the rules.  In the packed
    /// form, the tokens are numbered sequentially, and are followed by the non-terminals.
    pub fn build(mut self) -> Result<(Grammar<A>, Diagnostics), GenerateError> {
        self.end_rule();
        match self.check_symbols() {
            Ok(goal) => {
                let diagnostics = mem::take(&mut self.diagnostics);
                let gram = self.pack_symbols_and_grammar(goal);
                print_grammar(&gram);
                Ok((gram, diagnostics))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn check_symbols(&mut self) -> Result<usize, YaccError> {
        let goal = match self.goal {
            Some(goal) if self.nrules() > PREDEFINED_RULES => goal,
            _ => return Err(self.error(ErrorKind::NoGrammar)),
        };
        if self.symbols[goal].class == SymClass::Unknown {
            let name = self.symbols[goal].name.clone();
            return Err(YaccError::new(ErrorKind::UndefinedGoal(name)));
        }
        for sym in self.symbols.iter_mut() {
            if sym.class == SymClass::Unknown {
                self.diagnostics
                    .warn(Warning::UndefinedSymbol(sym.name.clone()), None);
                sym.class = SymClass::Terminal;
            }
        }
        if self.symbols.len() + 2 > i16::MAX as usize {
            return Err(YaccError::new(ErrorKind::TooManySymbols));
        }
        if self.pitem.len() > i16::MAX as usize || self.nrules() > i16::MAX as usize {
            return Err(YaccError::new(ErrorKind::TooManyRules));
        }
        Ok(goal)
    }

    fn pack_symbols_and_grammar(self, goal: usize) -> Grammar<A> {
        debug!("pack_symbols");

        let nsyms: usize = 2 + self.symbols.len(); // $end and $accept
        let ntokens: usize = 1 + self
            .symbols
            .iter()
            .filter(|sym| sym.class == SymClass::Terminal)
            .count();
        let start_symbol = ntokens;
        let nvars = nsyms - ntokens;

        debug!("ntokens={} nvars={} nsyms={}", ntokens, nvars, nsyms);

        // v maps a position in declaration order (tokens first, then variables) to the
        // unpacked symbol.  v[0] is $end and v[start_symbol] is $accept, which have no
        // unpacked symbol.
        let mut v: Vec<usize> = vec![NO_SYMBOL; nsyms];
        {
            let mut i: usize = 1;
            let mut j: usize = start_symbol + 1;
            for (s, sym) in self.symbols.iter().enumerate() {
                if sym.class == SymClass::Terminal {
                    v[i] = s;
                    i += 1;
                } else {
                    v[j] = s;
                    j += 1;
                }
            }
            assert_eq!(i, ntokens);
            assert_eq!(j, nsyms);
        }

        // packed[s] is the packed index of unpacked symbol s.  The goal always comes right
        // after $accept.
        let mut packed: Vec<usize> = vec![NO_SYMBOL; self.symbols.len()];
        for (i, &s) in v.iter().enumerate().take(ntokens).skip(1) {
            packed[s] = i;
        }
        packed[goal] = start_symbol + 1;
        let mut k = start_symbol + 2;
        for &s in v[start_symbol + 1..].iter() {
            if s != goal {
                packed[s] = k;
                k += 1;
            }
        }

        // Symbol values.  The goal is variable 0, the other variables follow in order.
        let mut symbols_value: Vec<i16> = self.symbols.iter().map(|sym| sym.value).collect();
        symbols_value[goal] = 0;
        let mut k: i16 = 1;
        for &s in v[start_symbol + 1..].iter() {
            if s != goal {
                symbols_value[s] = k;
                k += 1;
            }
        }

        // Token values above 256 that were declared explicitly, in increasing order.
        let mut claimed: Vec<i16> = v[1..ntokens]
            .iter()
            .map(|&s| symbols_value[s])
            .filter(|&n| n > 256)
            .collect();
        claimed.sort_unstable();

        if symbols_value[v[1]] == UNDEFINED {
            symbols_value[v[1]] = 256;
        }

        let mut j = 0;
        let mut n: i16 = 257;
        for &s in v[2..ntokens].iter() {
            if symbols_value[s] == UNDEFINED {
                while j < claimed.len() && n == claimed[j] {
                    while j < claimed.len() && n == claimed[j] {
                        j += 1;
                    }
                    n += 1;
                }
                symbols_value[s] = n;
                n += 1;
            }
        }

        // Lay out the per-symbol arrays in packed order.
        let mut unpacked: Vec<usize> = vec![NO_SYMBOL; nsyms];
        for (s, &p) in packed.iter().enumerate() {
            unpacked[p] = s;
        }

        let mut gram_name: Vec<String> = Vec::with_capacity(nsyms);
        let mut gram_value: Vec<i16> = Vec::with_capacity(nsyms);
        let mut gram_tag: Vec<Option<String>> = Vec::with_capacity(nsyms);
        let mut gram_prec: Vec<i16> = Vec::with_capacity(nsyms);
        let mut gram_assoc: Vec<Assoc> = Vec::with_capacity(nsyms);
        for (p, &u) in unpacked.iter().enumerate() {
            if u == NO_SYMBOL {
                let (name, value) = if p == 0 { ("$end", 0) } else { ("$accept", -1) };
                gram_name.push(name.to_string());
                gram_value.push(value);
                gram_tag.push(None);
                gram_prec.push(0);
                gram_assoc.push(Assoc::Token);
            } else {
                let from = &self.symbols[u];
                gram_name.push(from.name.clone());
                gram_value.push(symbols_value[u]);
                gram_tag.push(from.tag.clone());
                gram_prec.push(from.prec);
                gram_assoc.push(from.assoc);
            }
        }

        debug!("packed symbol table:");
        for i in 0..nsyms {
            debug!(
                "    {:3} {} {:20} value {:3} prec {:2} assoc {:?}",
                i,
                if i < ntokens { "token" } else { "var  " },
                gram_name[i],
                gram_value[i],
                gram_prec[i],
                gram_assoc[i]
            );
        }

        // Second phase: translate pitem and lhs into the packed ritem, rlhs and rrhs.
        //
        // there are three pre-defined rules:
        //      0, 1:  placeholders
        //      2:     $accept -> goal $end
        let nrules = self.nrules();
        let mut rlhs: Vec<Symbol> = vec![Symbol(0), Symbol(0), Symbol(start_symbol as i16)];
        rlhs.extend(
            self.lhs[PREDEFINED_RULES..]
                .iter()
                .map(|&lhs| Symbol(packed[lhs] as i16)),
        );

        let mut ritem: Vec<SymbolOrRule> =
            vec![SymbolOrRule::symbol(Symbol::END); self.pitem.len()];
        ritem[0] = SymbolOrRule::rule(Rule(1));
        ritem[1] = SymbolOrRule::symbol(Symbol((start_symbol + 1) as i16));
        ritem[2] = SymbolOrRule::symbol(Symbol::END);
        ritem[3] = SymbolOrRule::rule(Rule::ACCEPT);

        let mut rrhs: Vec<Item> = Vec::with_capacity(nrules + 1);
        rrhs.push(Item(0));
        rrhs.push(Item(0));
        rrhs.push(Item(1));

        let mut rprec = self.rprec;
        let mut rassoc = self.rassoc;
        let pitem = &self.pitem;
        let symbols = &self.symbols;

        let mut j = PREDEFINED_ITEMS; // index of next item to output
        for i in PREDEFINED_RULES..nrules {
            rrhs.push(Item(j as i16));
            let mut assoc = Assoc::Token;
            let mut prec: i16 = 0;
            while pitem[j] != NO_ITEM {
                let sym = &symbols[pitem[j]];
                if sym.class == SymClass::Terminal {
                    prec = sym.prec;
                    assoc = sym.assoc;
                }
                ritem[j] = SymbolOrRule::symbol(Symbol(packed[pitem[j]] as i16));
                j += 1;
            }

            // Terminate the item list with the negative of the rule index.  lr0 relies on
            // this to find the end of a rule, and so to emit a reduction in a state.
            ritem[j] = SymbolOrRule::rule(Rule(i as i16));
            j += 1;
            if rprec[i] == UNDEFINED {
                rprec[i] = prec;
                rassoc[i] = assoc;
            }
        }
        rrhs.push(Item(j as i16));
        assert_eq!(j, ritem.len());
        assert_eq!(rlhs.len(), nrules);

        Grammar {
            nsyms,
            ntokens,
            nvars,
            start_symbol,
            name: gram_name,
            value: gram_value,
            tag: gram_tag,
            prec: gram_prec,
            assoc: gram_assoc,
            nrules,
            ritem,
            rlhs,
            rrhs,
            rprec,
            rassoc,
            actions: self.actions,
            action_offset: self.action_offset,
        }
    }
}

fn print_grammar<A>(gram: &Grammar<A>) {
    debug!("raw items:");
    for (i, it) in gram.ritem.iter().enumerate() {
        debug!("    {:3} --> {:?}", i, it);
    }
    debug!("rules:");
    for rule in gram.iter_rules() {
        debug!("    {}", gram.rule_to_str(rule));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names() {
        assert!(is_reserved("$accept"));
        assert!(is_reserved("$end"));
        assert!(is_reserved("."));
        assert!(is_reserved("$$12"));
        assert!(!is_reserved("$$"));
        assert!(!is_reserved("$$1a"));
        assert!(!is_reserved("expr"));
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_literal("+"), "'+'");
        assert_eq!(quote_literal("'"), "'\\''");
        assert_eq!(quote_literal("<="), "\"<=\"");
        assert_eq!(quote_literal("\n"), "'\\n'");
        assert_eq!(quote_literal("\x01"), "'\\001'");
    }

    #[test]
    fn reserved_symbol_is_rejected() {
        let mut b = GrammarBuilder::<()>::new();
        let e = b.symbol("$end").unwrap_err();
        assert_eq!(e.kind, ErrorKind::UsedReserved("$end".into()));
    }

    #[test]
    fn first_declaration_wins() {
        let mut b = GrammarBuilder::<()>::new();
        let t = b.symbol("T").unwrap();
        b.declare_tokens(Assoc::Token, Some("int"), &[(t, Some(300))]).unwrap();
        b.declare_tokens(Assoc::Token, Some("str"), &[(t, Some(301))]).unwrap();
        assert_eq!(b.tag(t), Some("int"));
        let warnings: Vec<&str> = b.diagnostics().warnings().collect();
        assert_eq!(
            warnings,
            vec!["the type of T has been redeclared", "the value of T has been redeclared"]
        );
    }

    #[test]
    fn mid_rule_action_gets_its_own_rule() {
        let mut b = GrammarBuilder::<&'static str>::new();
        let s = b.symbol("s").unwrap();
        let x = b.symbol("X").unwrap();
        let y = b.symbol("Y").unwrap();
        b.start_rule(s).unwrap();
        b.add_symbol(x);
        b.add_action("mid");
        b.add_symbol(y);
        b.add_action("end");
        b.end_rule();
        let (gram, _) = b.build().unwrap();

        // rule 3 is "$$1 :", rule 4 is "s : X $$1 Y"
        assert_eq!(gram.nrules, 5);
        assert_eq!(gram.name(gram.rlhs(Rule(3))), "$$1");
        assert_eq!(gram.rule_len(Rule(3)), 0);
        assert_eq!(gram.actions[3], Some("mid"));
        assert_eq!(gram.action_offset[3], 1);
        assert_eq!(gram.name(gram.rlhs(Rule(4))), "s");
        let rhs: Vec<&str> = gram.rule_rhs_syms(Rule(4)).map(|s| gram.name(s)).collect();
        assert_eq!(rhs, vec!["X", "$$1", "Y"]);
        assert_eq!(gram.actions[4], Some("end"));
        assert_eq!(gram.action_offset[4], 3);
    }

    #[test]
    fn terminal_lhs_is_an_error() {
        let mut b = GrammarBuilder::<()>::new();
        let s = b.symbol("s").unwrap();
        let t = b.symbol("T").unwrap();
        b.declare_tokens(Assoc::Token, None, &[(t, None)]).unwrap();
        b.add_rule(s, &[t], None).unwrap();
        assert_eq!(b.start_rule(t).unwrap_err().kind, ErrorKind::TerminalLhs);
    }

    #[test]
    fn empty_builder_has_no_grammar() {
        let b = GrammarBuilder::<()>::new();
        let e = b.build().err().unwrap();
        assert_eq!(e.error.kind, ErrorKind::NoGrammar);
    }
}
