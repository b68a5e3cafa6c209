use crate::{Item, ItemKind, Rule, Symbol, SymbolOrRule, Token, Var};

/// The value of `rprec` for a rule whose precedence has not been set yet.
pub const UNDEFINED: i16 = -1;

/// Associativity of a token, as declared by `%token`, `%left`, `%right` or `%nonassoc`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Assoc {
    /// Declared with `%token`, or not declared.  Has no associativity.
    Token,
    Left,
    Right,
    NonAssoc,
}

impl Default for Assoc {
    fn default() -> Self {
        Assoc::Token
    }
}

// Defines a grammar.  A grammar has these elements:
//
//     * a set of tokens (terminals), each having a name and a value
//     * a set of variables (non-terminals)
//     * a set of rules, in the form A <- B C ... , where A is a variable and B and C are
//       any combination of tokens or variables
//     * (optional) precedence and associativity rules for rules
//     * (optional) an action payload for each rule, which is never interpreted here
//
pub struct Grammar<A> {
    // the symbols (non-terminals and terminals/tokens)
    // symbols are ordered as tokens first, then non-terminals.
    // symbol[0] is the special $end token, symbol[1] is the error token.
    // the first non-terminal is the special "$accept" symbol, followed by the goal.
    pub nsyms: usize,
    pub ntokens: usize,
    pub nvars: usize,
    pub start_symbol: usize,

    /// len = nsyms
    pub name: Vec<String>,

    /// The external value of each symbol.  For tokens, this is the value that the lexer
    /// reports.  For variables, it is the index used for the goto columns (goal = 0).
    /// len = nsyms
    pub value: Vec<i16>,

    /// The `<tag>` of each symbol, if one was declared.
    /// len = nsyms
    pub tag: Vec<Option<String>>,

    pub prec: Vec<i16>,
    pub assoc: Vec<Assoc>,

    // the rules which describe the grammar
    // rule 0 and rule 1 are placeholders, rule 2 is "$accept : goal $end".
    pub nrules: usize,

    // len = nitems
    pub ritem: Vec<SymbolOrRule>,

    /// len = nrules
    pub rlhs: Vec<Symbol>,
    /// len = nrules + 1; the last entry is the end of the item array.
    pub rrhs: Vec<Item>,
    pub rprec: Vec<i16>,
    pub rassoc: Vec<Assoc>,

    /// The action payload of each rule.  len = nrules
    pub actions: Vec<Option<A>>,

    /// The number of values that are visible to each rule's action.  This is the length of
    /// the rhs, except for the empty rules generated for mid-rule actions, which see the
    /// values that precede them in the enclosing rule.
    /// len = nrules
    pub action_offset: Vec<i16>,
}

impl<A> Grammar<A> {
    pub fn is_var(&self, s: Symbol) -> bool {
        s.index() >= self.start_symbol
    }

    pub fn is_token(&self, s: Symbol) -> bool {
        s.index() < self.start_symbol
    }

    pub fn symbol_to_var(&self, s: Symbol) -> Var {
        assert!(self.is_var(s));
        Var((s.index() - self.start_symbol) as i16)
    }

    pub fn var_to_symbol(&self, v: Var) -> Symbol {
        assert!(v.index() < self.nvars);
        Symbol((self.start_symbol + v.index()) as i16)
    }

    pub fn symbol_to_token(&self, s: Symbol) -> Token {
        assert!(self.is_token(s));
        Token(s.0)
    }

    /// The `$accept` symbol.
    pub fn start(&self) -> Symbol {
        Symbol(self.start_symbol as i16)
    }

    /// The symbol that the grammar author designated as the start symbol.
    pub fn goal(&self) -> Symbol {
        Symbol((self.start_symbol + 1) as i16)
    }

    pub fn nitems(&self) -> usize {
        self.ritem.len()
    }

    pub fn name(&self, s: Symbol) -> &str {
        &self.name[s.index()]
    }

    pub fn value(&self, s: Symbol) -> i16 {
        self.value[s.index()]
    }

    pub fn ritem(&self, item: Item) -> SymbolOrRule {
        self.ritem[item.index()]
    }

    pub fn rlhs(&self, rule: Rule) -> Symbol {
        self.rlhs[rule.index()]
    }

    pub fn rrhs(&self, rule: Rule) -> Item {
        self.rrhs[rule.index()]
    }

    pub fn iter_tokens(&self) -> impl Iterator<Item = Token> {
        (0..self.ntokens).map(|i| Token(i as i16))
    }

    pub fn iter_vars(&self) -> impl Iterator<Item = Var> {
        (0..self.nvars).map(|i| Var(i as i16))
    }

    pub fn iter_var_syms(&self) -> impl Iterator<Item = Symbol> {
        (self.start_symbol..self.nsyms).map(|i| Symbol(i as i16))
    }

    /// Iterates the rules that have right-hand sides, starting with the accept rule.
    pub fn iter_rules(&self) -> impl Iterator<Item = Rule> {
        (Rule::ACCEPT.index()..self.nrules).map(|i| Rule(i as i16))
    }

    /// The symbols on the right-hand side of a rule.
    pub fn rule_rhs_syms(&self, rule: Rule) -> impl Iterator<Item = Symbol> + '_ {
        self.ritem[self.rrhs(rule).index()..]
            .iter()
            .map(|sr| sr.kind())
            .take_while(|k| matches!(k, ItemKind::Symbol(_)))
            .filter_map(|k| match k {
                ItemKind::Symbol(s) => Some(s),
                ItemKind::RuleEnd(_) => None,
            })
    }

    pub fn rule_len(&self, rule: Rule) -> usize {
        (self.rrhs[rule.index() + 1].0 - self.rrhs[rule.index()].0 - 1) as usize
    }

    /// Formats a rule as `lhs : a b c`.
    pub fn rule_to_str(&self, rule: Rule) -> String {
        let mut s = format!("(r{}) {} :", rule, self.name(self.rlhs(rule)));
        for sym in self.rule_rhs_syms(rule) {
            s.push(' ');
            s.push_str(self.name(sym));
        }
        s
    }
}
