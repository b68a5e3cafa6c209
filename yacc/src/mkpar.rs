//! Builds the parser actions of each state and resolves conflicts between them.

use crate::errors::Diagnostics;
use crate::grammar::{Assoc, Grammar};
use crate::lalr::LALROutput;
use crate::lr0::{LR0Output, Reductions};
use crate::ramp_table::RampTable;
use crate::{Rule, State, Symbol, Token};
use log::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionCode {
    Shift(State),
    Reduce(Rule),
}

impl ActionCode {
    pub fn is_shift(&self) -> bool {
        matches!(self, ActionCode::Shift(_))
    }

    pub fn is_reduce(&self) -> bool {
        matches!(self, ActionCode::Reduce(_))
    }
}

/// Whether an action survived conflict resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suppressed {
    /// The action is part of the parser.
    No,
    /// Lost a conflict that was resolved by the default rules (shift wins, lowest rule
    /// wins, accept wins).  Counted as a conflict.
    Conflict,
    /// Lost to a precedence or associativity declaration.  Not counted.
    Precedence,
}

#[derive(Clone, Debug)]
pub struct ParserAction {
    pub symbol: Token,
    pub prec: i16,
    pub action_code: ActionCode,
    pub assoc: Assoc,
    pub suppressed: Suppressed,
}

impl ParserAction {
    pub fn is_active(&self) -> bool {
        self.suppressed == Suppressed::No
    }
}

pub struct YaccParser {
    /// State -> [ParserAction], ordered by symbol; for one symbol, shifts come before
    /// reductions and reductions are in rule order.
    pub actions: RampTable<ParserAction>,
    pub final_state: State,

    /// The default reduction of each state, or `Rule(0)` if it has none.
    pub defred: Vec<Rule>,

    /// Per state counts of shift/reduce and reduce/reduce conflicts.
    pub sr_conflicts: Vec<usize>,
    pub rr_conflicts: Vec<usize>,
    pub sr_total: usize,
    pub rr_total: usize,

    /// Rule -> whether some state reduces by it.  len = nrules
    pub rules_used: Vec<bool>,
    pub nunused: usize,
}

impl YaccParser {
    pub fn nstates(&self) -> usize {
        self.actions.num_keys()
    }

    pub fn actions_of(&self, state: State) -> &[ParserAction] {
        self.actions.values(state)
    }
}

pub fn make_parser<A>(
    gram: &Grammar<A>,
    lr0: &LR0Output,
    lalr: &LALROutput,
    diagnostics: &mut Diagnostics,
) -> YaccParser {
    let nstates = lr0.nstates();
    let mut actions: RampTable<ParserAction> = RampTable::new();
    for state in 0..nstates {
        let state: State = state.into();
        get_shifts(gram, lr0, state, &mut actions);
        get_reductions(gram, &lr0.reductions, lalr, state, &mut actions);
        actions.finish_key();
    }

    let final_state = find_final_state(gram, lr0);
    let (sr_conflicts, rr_conflicts) = remove_conflicts(final_state, &mut actions);
    let sr_total = sr_conflicts.iter().sum();
    let rr_total = rr_conflicts.iter().sum();

    let rules_used = find_used_rules(gram, &actions);
    let nunused = rules_used[Rule::FIRST_USER.index()..]
        .iter()
        .filter(|&&used| !used)
        .count();
    match nunused {
        0 => {}
        1 => diagnostics.summary("1 rule never reduced".to_string()),
        n => diagnostics.summary(format!("{} rules never reduced", n)),
    }

    if sr_total + rr_total > 0 {
        diagnostics.summary(total_conflicts(sr_total, rr_total));
    }

    let defred = default_reductions(&actions);

    YaccParser {
        actions,
        final_state,
        defred,
        sr_conflicts,
        rr_conflicts,
        sr_total,
        rr_total,
        rules_used,
        nunused,
    }
}

fn get_shifts<A>(
    gram: &Grammar<A>,
    lr0: &LR0Output,
    stateno: State,
    actions: &mut RampTable<ParserAction>,
) {
    for &k in lr0.shifts.values(stateno) {
        let symbol = lr0.accessing_symbol[k];
        if gram.is_token(symbol) {
            actions.push_value(ParserAction {
                symbol: gram.symbol_to_token(symbol),
                prec: gram.prec[symbol.index()],
                action_code: ActionCode::Shift(k),
                assoc: gram.assoc[symbol.index()],
                suppressed: Suppressed::No,
            });
        }
    }
}

fn get_reductions<A>(
    gram: &Grammar<A>,
    reductions: &Reductions,
    lalr: &LALROutput,
    stateno: State,
    actions: &mut RampTable<ParserAction>,
) {
    let range = reductions.values_range(stateno);
    let state_rules = reductions.values(stateno);
    for (i, &rule) in range.zip(state_rules) {
        for j in (0..gram.ntokens).rev() {
            if lalr.LA.get(i, j) {
                add_reduce(gram, actions, rule, Token(j as i16));
            }
        }
    }
}

/// Inserts a reduction into the open key of `actions`, keeping the order: by symbol,
/// then shifts before reductions, then reductions by rule.
fn add_reduce<A>(
    gram: &Grammar<A>,
    actions: &mut RampTable<ParserAction>,
    rule: Rule,
    symbol: Token,
) {
    let open = actions.open_values();
    let mut next: usize = 0;
    while next < open.len() && open[next].symbol < symbol {
        next += 1;
    }
    while next < open.len() && open[next].symbol == symbol && open[next].action_code.is_shift()
    {
        next += 1;
    }
    while next < open.len() && open[next].symbol == symbol {
        match open[next].action_code {
            ActionCode::Reduce(r) if r < rule => next += 1,
            _ => break,
        }
    }

    actions.insert_open_value(
        next,
        ParserAction {
            symbol,
            prec: gram.rprec[rule.index()],
            action_code: ActionCode::Reduce(rule),
            assoc: gram.rassoc[rule.index()],
            suppressed: Suppressed::No,
        },
    );
}

/// The final state is the one that state 0 reaches by shifting the goal.  The shifts of
/// state 0 are scanned from the end, because variables sort after tokens.
fn find_final_state<A>(gram: &Grammar<A>, lr0: &LR0Output) -> State {
    let goal: Symbol = gram.ritem[1].as_symbol();
    let mut final_state = State(0);
    for &ts in lr0.shifts.values(0usize).iter().rev() {
        final_state = ts;
        if lr0.accessing_symbol[ts] == goal {
            break;
        }
    }
    debug!("final state: {}", final_state);
    final_state
}

fn find_used_rules<A>(gram: &Grammar<A>, actions: &RampTable<ParserAction>) -> Vec<bool> {
    let mut rules_used = vec![false; gram.nrules];
    for action in actions.all_values() {
        if let ActionCode::Reduce(rule) = action.action_code {
            if action.is_active() {
                rules_used[rule.index()] = true;
            }
        }
    }
    rules_used
}

/// Resolves the conflicts of every state.  Returns the per state counts of shift/reduce
/// and reduce/reduce conflicts.
fn remove_conflicts(
    final_state: State,
    actions: &mut RampTable<ParserAction>,
) -> (Vec<usize>, Vec<usize>) {
    let mut sr_conflicts = Vec::with_capacity(actions.num_keys());
    let mut rr_conflicts = Vec::with_capacity(actions.num_keys());
    for (state, state_actions) in actions.iter_mut().enumerate() {
        let is_final_state = state == final_state.index();
        let (srcount, rrcount) = remove_conflicts_for_state(state_actions, is_final_state);
        if srcount + rrcount > 0 {
            trace!(
                "state {}: {} shift/reduce, {} reduce/reduce",
                state,
                srcount,
                rrcount
            );
        }
        sr_conflicts.push(srcount);
        rr_conflicts.push(rrcount);
    }
    (sr_conflicts, rr_conflicts)
}

/// Marks the losing actions of every conflict in one state.  The first action for each
/// symbol is the preferred one, until precedence says otherwise.
///
/// Returns (shift_reduce_conflict_count, reduce_reduce_conflict_count)
pub fn remove_conflicts_for_state(
    actions: &mut [ParserAction],
    is_final_state: bool,
) -> (usize, usize) {
    let mut srcount: usize = 0;
    let mut rrcount: usize = 0;
    let mut pref: usize = 0;
    for i in 1..actions.len() {
        let symbol = actions[pref].symbol;
        if actions[i].symbol != symbol {
            pref = i;
        } else if is_final_state && symbol == Token::END {
            srcount += 1;
            actions[i].suppressed = Suppressed::Conflict;
        } else if actions[pref].action_code.is_shift() {
            let (pref_prec, pref_assoc) = (actions[pref].prec, actions[pref].assoc);
            let p_prec = actions[i].prec;
            if pref_prec > 0 && p_prec > 0 {
                if pref_prec < p_prec {
                    actions[pref].suppressed = Suppressed::Precedence;
                    pref = i;
                } else if pref_prec > p_prec {
                    actions[i].suppressed = Suppressed::Precedence;
                } else {
                    match pref_assoc {
                        Assoc::Left => {
                            actions[pref].suppressed = Suppressed::Precedence;
                            pref = i;
                        }
                        Assoc::Right => {
                            actions[i].suppressed = Suppressed::Precedence;
                        }
                        Assoc::NonAssoc | Assoc::Token => {
                            actions[pref].suppressed = Suppressed::Precedence;
                            actions[i].suppressed = Suppressed::Precedence;
                        }
                    }
                }
            } else {
                srcount += 1;
                actions[i].suppressed = Suppressed::Conflict;
            }
        } else {
            rrcount += 1;
            actions[i].suppressed = Suppressed::Conflict;
        }
    }
    (srcount, rrcount)
}

/// Formats the end-of-run conflict summary, e.g. `1 shift/reduce conflict, 2
/// reduce/reduce conflicts.`
pub fn total_conflicts(srtotal: usize, rrtotal: usize) -> String {
    let mut s = String::new();
    match srtotal {
        0 => {}
        1 => s.push_str("1 shift/reduce conflict"),
        n => s.push_str(&format!("{} shift/reduce conflicts", n)),
    }
    if srtotal != 0 && rrtotal != 0 {
        s.push_str(", ");
    }
    match rrtotal {
        0 => {}
        1 => s.push_str("1 reduce/reduce conflict"),
        n => s.push_str(&format!("{} reduce/reduce conflicts", n)),
    }
    s.push('.');
    s
}

/// Computes the default reduction for a single state: the rule of its active
/// reductions, if there is no active shift and they all agree.  Reductions on `error`
/// alone do not make a default.
pub fn sole_reduction(actions: &[ParserAction]) -> Rule {
    let mut count: usize = 0;
    let mut ruleno = Rule(0);
    for p in actions.iter().filter(|p| p.is_active()) {
        match p.action_code {
            ActionCode::Shift(_) => return Rule(0),
            ActionCode::Reduce(rule) => {
                if ruleno > Rule(0) && rule != ruleno {
                    return Rule(0);
                }
                if p.symbol != Token::ERROR {
                    count += 1;
                }
                ruleno = rule;
            }
        }
    }

    if count == 0 {
        Rule(0)
    } else {
        ruleno
    }
}

/// Computes the default reduction for each state.
/// State -> Rule
pub fn default_reductions(actions: &RampTable<ParserAction>) -> Vec<Rule> {
    actions.iter().map(sole_reduction).collect()
}
