use crate::grammar::Grammar;
use crate::lr0::DerivesTable;
use crate::util::{word_size, Bitmat, Bitv32};
use crate::warshall::reflexive_transitive_closure;
use crate::{Item, ItemKind, Rule, Var};
use log::debug;

/// Computes the "epsilon-free firsts" (EFF) relation.
/// The EFF is a bit matrix [nvars, nvars]: row A has bit B set if some rule of A starts
/// with B, closed reflexively and transitively.
pub fn set_eff<A>(gram: &Grammar<A>, derives: &DerivesTable) -> Bitmat {
    let nvars = gram.nvars;
    let mut eff: Bitmat = Bitmat::new(nvars, nvars);
    for row in 0..nvars {
        for &rule in derives.values(row) {
            // An empty rule contributes nothing.
            if let ItemKind::Symbol(symbol) = gram.ritem(gram.rrhs(rule)).kind() {
                if gram.is_var(symbol) {
                    eff.set(row, gram.symbol_to_var(symbol).index());
                }
            }
        }
    }

    reflexive_transitive_closure(&mut eff);
    print_eff(gram, &eff);
    eff
}

/// Returns the first_derives relation, which is a bit matrix of size [nvars, nrules].
/// Each row corresponds to a variable, and each column corresponds to a rule.
///
/// Because this relation is only relevant to variables (non-terminals), row 0 is assigned
/// to the first non-terminal (`$accept`).  Index it with `Grammar::symbol_to_var`.
pub fn set_first_derives<A>(gram: &Grammar<A>, derives: &DerivesTable) -> Bitmat {
    let eff = set_eff(gram, derives);
    assert!(eff.rows == gram.nvars);
    assert!(eff.cols == gram.nvars);
    let mut first_derives = Bitmat::new(gram.nvars, gram.nrules);
    for (i, j) in eff.iter_ones() {
        for &rule in derives.values(j) {
            first_derives.set(i, rule.index());
        }
    }

    print_first_derives(gram, &first_derives);
    first_derives
}

/// Everything `closure` needs, computed once per grammar.
pub struct ClosureContext<'a, A> {
    gram: &'a Grammar<A>,
    first_derives: Bitmat,
    // bit vector, size=nrules; scratch space reused by every call
    rule_set: Bitv32,
}

impl<'a, A> ClosureContext<'a, A> {
    pub fn new(gram: &'a Grammar<A>, derives: &DerivesTable) -> Self {
        Self {
            gram,
            first_derives: set_first_derives(gram, derives),
            rule_set: Bitv32::from_elem(gram.nrules, false),
        }
    }

    pub fn first_derives(&self) -> &Bitmat {
        &self.first_derives
    }

    /// Computes the closure of `nucleus` (a sorted list of items) and appends it to
    /// `item_set`, which must be empty.
    pub fn closure(&mut self, nucleus: &[Item], item_set: &mut Vec<Item>) {
        closure(
            self.gram,
            nucleus,
            &self.first_derives,
            &mut self.rule_set,
            item_set,
        )
    }
}

// Computes the closure of a set of item sets, and writes the result into 'item_set'.
// nucleus contains a set of items, that is, positions within reductions that are possible
// in the current state.  The closure() function looks at the next symbol in each item, and
// if the next symbol is a variable, the first_derives relation is consulted in order to see
// which other rules need to be added to the closure.
//
// rule_set is scratch space: a bit vector of size nrules.  item_set must be empty on entry.
pub fn closure<A>(
    gram: &Grammar<A>,
    nucleus: &[Item],
    first_derives: &Bitmat,
    rule_set: &mut Bitv32,
    item_set: &mut Vec<Item>,
) {
    assert!(item_set.is_empty());

    let rulesetsize = word_size(rule_set.nbits);
    rule_set.set_all(false);

    // Merge the first_derives row of every variable that follows a dot in the nucleus.
    for &item in nucleus.iter() {
        if let ItemKind::Symbol(symbol) = gram.ritem(item).kind() {
            if gram.is_var(symbol) {
                let var = gram.symbol_to_var(symbol);
                let dsp = var.index() * first_derives.rowsize;
                for i in 0..rulesetsize {
                    rule_set.data[i] |= first_derives.data[dsp + i];
                }
            }
        }
    }

    // new_items = nucleus merged with the start items of the rules in rule_set.
    //
    // This code relies on this invariant:
    //      for all r: gram.rrhs[r + 1] > gram.rrhs[r]
    let mut i: usize = 0; // index into nucleus
    for rule in rule_set.iter_ones() {
        let item = gram.rrhs[rule];
        while i < nucleus.len() && nucleus[i] < item {
            item_set.push(nucleus[i]);
            i += 1;
        }
        item_set.push(item);
        while i < nucleus.len() && nucleus[i] == item {
            i += 1;
        }
    }

    while i < nucleus.len() {
        item_set.push(nucleus[i]);
        i += 1;
    }
}

fn print_eff<A>(gram: &Grammar<A>, eff: &Bitmat) {
    debug!("Epsilon Free Firsts");
    for i in 0..eff.rows {
        let var = Var(i as i16);
        debug!("{}", gram.name(gram.var_to_symbol(var)));
        for j in eff.iter_ones_in_row(i) {
            debug!("  {}", gram.name(gram.var_to_symbol(Var(j as i16))));
        }
    }
}

// first_derives: cols = nrules
fn print_first_derives<A>(gram: &Grammar<A>, first_derives: &Bitmat) {
    debug!("First Derives");
    for var in gram.iter_vars() {
        debug!("{} derives:", gram.name(gram.var_to_symbol(var)));
        for j in first_derives.iter_ones_in_row(var.index()) {
            debug!("    {}", gram.rule_to_str(Rule(j as i16)));
        }
    }
}
