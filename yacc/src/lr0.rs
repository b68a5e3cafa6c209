//! The LR(0) automaton, together with the DERIVES and NULLABLE relations that the later
//! phases need.

use crate::closure::ClosureContext;
use crate::errors::{ErrorKind, YaccError};
use crate::grammar::Grammar;
use crate::ramp_table::{RampTable, RampTableBuilder};
use crate::tvec::TVec;
use crate::{Item, ItemKind, Rule, State, Symbol};
use log::debug;
use std::collections::HashMap;

pub const INITIAL_STATE_SYMBOL: Symbol = Symbol(0);

// State -> [Item]
pub type CoreTable = RampTable<Item>;

// maps from Var -> [Rule]
pub type DerivesTable = RampTable<Rule>;

// num_keys = number of states
// items = rules
pub type Reductions = RampTable<Rule>;

/// The nullable flag of every symbol.  Only variables can be nullable.
pub type NullableTable = TVec<Symbol, bool>;

pub struct LR0Output {
    pub nstates: usize,

    /// The kernel items of each state.
    pub states: CoreTable,

    // index: State
    // value: Symbol
    pub accessing_symbol: TVec<State, Symbol>,

    /// Contains (State -> [State]) mappings for shifts, ordered by accessing symbol.
    pub shifts: RampTable<State>,

    /// Contains State -> [Rule]
    pub reductions: Reductions,

    /// Contains Var -> [Rule]
    pub derives: DerivesTable,

    pub nullable: NullableTable,
}

impl LR0Output {
    pub fn nstates(&self) -> usize {
        self.nstates
    }

    /// Finds the state that `state` shifts to on `symbol`.
    pub fn shift_on(&self, state: State, symbol: Symbol) -> Option<State> {
        self.shifts
            .values(state)
            .iter()
            .copied()
            .find(|&to| self.accessing_symbol[to] == symbol)
    }
}

pub fn compute_lr0<A>(gram: &Grammar<A>) -> Result<LR0Output, YaccError> {
    let derives = set_derives(gram);
    let nullable = set_nullable(gram);

    // kernel_base[symbol] is the start of the space in kernel_items where the kernel of the
    // successor state on `symbol` is collected.  Each item can appear at most once per
    // state, so one slot per occurrence of the symbol in ritem is enough.
    let mut kernel_items_count: usize = 0;
    let mut symbol_count: Vec<usize> = vec![0; gram.nsyms];
    for &symbol in gram.ritem.iter() {
        if let ItemKind::Symbol(symbol) = symbol.kind() {
            kernel_items_count += 1;
            symbol_count[symbol.index()] += 1;
        }
    }
    let mut kernel_base: Vec<usize> = vec![0; gram.nsyms];
    let mut count: usize = 0;
    for i in 0..gram.nsyms {
        kernel_base[i] = count;
        count += symbol_count[i];
    }
    let mut kernel_items: Vec<Item> = vec![Item(0); kernel_items_count];

    // values in this array are indexes into kernel_items
    let mut kernel_end: Vec<usize> = vec![0; gram.nsyms];

    let mut states = CoreTable::new();
    let mut accessing_symbol: TVec<State, Symbol> = TVec::new();

    // The initial state is the start item of every rule of $accept.  From this initial
    // state, we discover all other states.
    states.push_entry(
        derives
            .values(gram.symbol_to_var(gram.start()))
            .iter()
            .map(|&rule| gram.rrhs(rule)),
    );
    accessing_symbol.push(INITIAL_STATE_SYMBOL);

    // Finds states by their first kernel item.  Item -> [State]
    let mut state_set: HashMap<Item, Vec<State>> = HashMap::new();
    state_set
        .entry(states.values(0usize)[0])
        .or_default()
        .push(State(0));

    let mut closure_context = ClosureContext::new(gram, &derives);

    // These vectors are used for building tables during each state.
    let mut item_set: Vec<Item> = Vec::with_capacity(gram.nitems());
    let mut shift_symbol: Vec<Symbol> = Vec::new();

    let mut reductions = Reductions::new();
    let mut shifts = RampTable::<State>::new();

    // this_state is our position within the work list.  New states are appended to
    // `states` by find_or_create_state().
    let mut this_state: usize = 0;
    while this_state < states.num_keys() {
        debug!("computing closure for state s{}:", this_state);
        print_core(gram, State(this_state as i16), states.values(this_state));

        closure_context.closure(states.values(this_state), &mut item_set);

        save_reductions(gram, &item_set, &mut reductions);

        new_item_sets(
            &kernel_base,
            &mut kernel_items,
            &mut kernel_end,
            gram,
            &item_set,
            &mut shift_symbol,
        );

        // Find or create states for shifts in the current state.  This can add new states
        // to 'states'.  Then record the resulting shifts in 'shifts'.
        shift_symbol.sort();
        for &symbol in shift_symbol.iter() {
            let shift_state = find_or_create_state(
                gram,
                &kernel_items[kernel_base[symbol.index()]..kernel_end[symbol.index()]],
                &mut state_set,
                &mut states,
                &mut accessing_symbol,
                symbol,
            )?;
            shifts.push_value(shift_state);
        }
        shifts.finish_key();

        item_set.clear();
        shift_symbol.clear();
        this_state += 1;
    }

    let nstates = states.num_keys();
    debug!("lr0: {} states", nstates);

    Ok(LR0Output {
        nstates,
        states,
        accessing_symbol,
        shifts,
        reductions,
        derives,
        nullable,
    })
}

// Gets the state for a particular symbol.  If no appropriate state exists,
// then a new state will be created.
fn find_or_create_state<A>(
    gram: &Grammar<A>,
    symbol_items: &[Item],
    state_set: &mut HashMap<Item, Vec<State>>,
    states: &mut CoreTable,
    accessing_symbol: &mut TVec<State, Symbol>,
    symbol: Symbol,
) -> Result<State, YaccError> {
    let key_item = symbol_items[0];
    let this_state_set = state_set.entry(key_item).or_default();

    // Search for an existing state that has the same items.
    for &state in this_state_set.iter() {
        if symbol_items == states.values(state) {
            return Ok(state);
        }
    }

    if states.num_keys() >= i16::MAX as usize {
        return Err(YaccError::new(ErrorKind::TooManyStates));
    }

    let new_state: State = states.num_keys().into();
    states.push_entry_copy_slice(symbol_items);
    accessing_symbol.push(symbol);
    this_state_set.push(new_state);

    debug!("    created state s{}:", new_state);
    print_core(gram, new_state, symbol_items);

    Ok(new_state)
}

fn print_core<A>(gram: &Grammar<A>, state: State, items: &[Item]) {
    debug!("    s{}", state);

    let mut line = String::new();
    for item in items.iter() {
        let rhs = item.index();
        line.push_str(&format!("item {:4} : ", rhs));

        // back up to start of this rule
        let mut rhs_first = rhs;
        while rhs_first > 0 && gram.ritem[rhs_first - 1].is_symbol() {
            rhs_first -= 1;
        }

        // loop through rhs
        let mut j = rhs_first;
        while let ItemKind::Symbol(s) = gram.ritem[j].kind() {
            if j == rhs {
                line.push_str(" .");
            }
            line.push_str(&format!(" {}", gram.name(s)));
            j += 1;
        }
        if j == rhs {
            line.push_str(" .");
        }

        debug!("        {}", line);
        line.clear();
    }
}

// Buckets the items of item_set by the symbol after the dot, advancing the dot.  Fills
// shift_symbol with the symbols that have a nonempty bucket.  The end marker is never
// shifted.
//
// kernel_base: Symbol -> index into kernel_items
// kernel_end: Symbol -> index into kernel_items
fn new_item_sets<A>(
    kernel_base: &[usize],
    kernel_items: &mut [Item],
    kernel_end: &mut [usize],
    gram: &Grammar<A>,
    item_set: &[Item],
    shift_symbol: &mut Vec<Symbol>,
) {
    assert!(shift_symbol.is_empty());

    // reset kernel_end
    kernel_end.copy_from_slice(kernel_base);

    for &item in item_set.iter() {
        if let ItemKind::Symbol(symbol) = gram.ritem(item).kind() {
            if symbol == Symbol::END {
                continue;
            }
            let base = kernel_base[symbol.index()];
            let end = &mut kernel_end[symbol.index()];
            if *end == base {
                shift_symbol.push(symbol);
            }
            kernel_items[*end] = item + 1;
            *end += 1;
        }
    }
}

/// Examine the items in the given item set.  If any of the items have reached the
/// end of the rhs list for a particular rule, then add that rule to the reduction set.
/// We discover this by testing the sign of the next symbol in the item; if it is
/// negative, then we have reached the end of the symbols on the rhs of a rule.
fn save_reductions<A>(gram: &Grammar<A>, item_set: &[Item], rules: &mut Reductions) {
    for &item in item_set {
        if let ItemKind::RuleEnd(rule) = gram.ritem(item).kind() {
            rules.push_value(rule);
        }
    }
    rules.finish_key();
}

/// Compute the DERIVES table. The DERIVES table maps Var -> [Rule], in rule order.
pub fn set_derives<A>(gram: &Grammar<A>) -> DerivesTable {
    let mut d = RampTableBuilder::<Rule>::with_capacity(gram.nvars, gram.nrules);
    for lhs in gram.iter_var_syms() {
        d.start_key();
        for rule in gram.iter_rules() {
            if gram.rlhs(rule) == lhs {
                d.push_value(rule);
            }
        }
    }

    let derives = d.finish();
    print_derives(gram, &derives);
    derives
}

fn print_derives<A>(gram: &Grammar<A>, derives: &DerivesTable) {
    debug!("DERIVES:");
    for lhs in gram.iter_vars() {
        let lhs_sym = gram.var_to_symbol(lhs);
        debug!("    {} derives rules: ", gram.name(lhs_sym));
        for &rule in derives.values(lhs) {
            debug!("        {}", &gram.rule_to_str(rule));
        }
    }
}

/// Computes which variables derive the empty string.  A rule whose rhs is all nullable
/// makes its lhs nullable; repeat until nothing changes.
pub fn set_nullable<A>(gram: &Grammar<A>) -> NullableTable {
    let mut nullable: NullableTable = TVec::from_vec(vec![false; gram.nsyms]);
    loop {
        let mut done = true;
        let mut i = 1;
        while i < gram.ritem.len() {
            let mut empty = true;
            let rule = loop {
                match gram.ritem[i].kind() {
                    ItemKind::RuleEnd(rule) => break rule,
                    ItemKind::Symbol(sym) => {
                        if !nullable[sym] {
                            empty = false;
                        }
                    }
                }
                i += 1;
            };
            if empty {
                let sym = gram.rlhs(rule);
                if !nullable[sym] {
                    nullable[sym] = true;
                    done = false;
                }
            }
            i += 1;
        }
        if done {
            break;
        }
    }

    for sym in gram.iter_var_syms() {
        if nullable[sym] {
            debug!("{} is nullable", gram.name(sym));
        } else {
            debug!("{} is not nullable", gram.name(sym));
        }
    }

    nullable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GrammarBuilder;

    #[test]
    fn state_numbers_must_fit_in_i16() {
        let mut b: GrammarBuilder<()> = GrammarBuilder::new();
        let s = b.symbol("s").unwrap();
        let x = b.literal("x");
        b.add_rule(s, &[x], None).unwrap();
        let gram = match b.build() {
            Ok((gram, _)) => gram,
            Err(e) => panic!("{}", e.render("yacc", "test.y")),
        };

        let mut states = CoreTable::new();
        let mut accessing_symbol: TVec<State, Symbol> = TVec::new();
        for _ in 0..i16::MAX {
            states.push_entry(core::iter::once(Item(0)));
            accessing_symbol.push(INITIAL_STATE_SYMBOL);
        }
        let mut state_set: HashMap<Item, Vec<State>> = HashMap::new();
        state_set.insert(Item(0), vec![State(7)]);

        // an existing state is still found
        let found = find_or_create_state(
            &gram,
            &[Item(0)],
            &mut state_set,
            &mut states,
            &mut accessing_symbol,
            Symbol(2),
        );
        assert_eq!(found.ok(), Some(State(7)));

        match find_or_create_state(
            &gram,
            &[Item(4)],
            &mut state_set,
            &mut states,
            &mut accessing_symbol,
            Symbol(2),
        ) {
            Ok(state) => panic!("created state {:?}", state),
            Err(e) => assert_eq!(e.kind, ErrorKind::TooManyStates),
        }
        assert_eq!(states.num_keys(), i16::MAX as usize);
    }
}
