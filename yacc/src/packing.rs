//! Compresses the parser actions and gotos into the classic yacc table layout.
//!
//! Every state contributes two vectors (its shifts and its reductions, both indexed by
//! token value) and every variable contributes one (its gotos, indexed by from-state).
//! The vectors are overlapped into one `table`, with a parallel `check` array that
//! records which vector owns each slot:
//!
//! * vectors `0..nstates` are the shift rows, emitted as `sindex`
//! * vectors `nstates..2 * nstates` are the reduce rows, emitted as `rindex`
//! * vectors `2 * nstates..` are the goto columns, emitted as `gindex`, where the column
//!   of variable `v` is vector `2 * nstates + value(v)`
//!
//! A slot `loc` is free iff `check[loc] == -1`.

use crate::errors::{ErrorKind, YaccError};
use crate::grammar::Grammar;
use crate::lalr::GotoMap;
use crate::mkpar::{ActionCode, YaccParser};
use crate::{Rule, State, StateOrRule, Symbol};
use log::{debug, trace};
use std::cmp;

/// The packed tables, as consumed by the runtime parser and by the code emitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserTables {
    /// The lhs value of each external rule.  `lhs[0]` is the value of `$accept`.
    pub lhs: Vec<i16>,
    /// The rhs length of each external rule.  `len[0]` is 2.
    pub len: Vec<i16>,
    /// The default reduction of each state (an external rule number), or 0.
    pub defred: Vec<i16>,
    /// The default goto of each variable, starting with the goal.
    pub dgoto: Vec<i16>,
    pub sindex: Vec<i16>,
    pub rindex: Vec<i16>,
    pub gindex: Vec<i16>,
    pub table: Vec<i16>,
    pub check: Vec<i16>,
    /// Token names, indexed by token value.  `names[0]` is `end-of-file`.
    pub names: Vec<Option<String>>,
    /// The text of each external rule, as `lhs: a b c`.
    pub rules: Vec<String>,
    pub final_state: i16,
    /// The value of the `error` token.
    pub error_token: i16,
    /// The number of values visible to the action of each external rule.
    pub action_offset: Vec<i16>,
}

impl ParserTables {
    pub fn nstates(&self) -> usize {
        self.defred.len()
    }

    /// Borrows the tables in the form that the runtime parser uses.
    pub fn with_runtime_tables<R>(
        &self,
        f: impl FnOnce(&yacc_runtime::ParserTables<'_>) -> R,
    ) -> R {
        let names: Vec<Option<&str>> = self.names.iter().map(|n| n.as_deref()).collect();
        let rules: Vec<&str> = self.rules.iter().map(|r| r.as_str()).collect();
        let tables = yacc_runtime::ParserTables {
            yyfinal: self.final_state,
            yyerrcode: self.error_token,
            yylhs: &self.lhs,
            yylen: &self.len,
            yydefred: &self.defred,
            yydgoto: &self.dgoto,
            yysindex: &self.sindex,
            yyrindex: &self.rindex,
            yygindex: &self.gindex,
            yytable: &self.table,
            yycheck: &self.check,
            yyoffset: &self.action_offset,
            yyname: &names,
            yyrule: &rules,
        };
        f(&tables)
    }
}

pub fn pack_parser_tables<A>(
    gram: &Grammar<A>,
    gotos: &GotoMap,
    parser: &YaccParser,
    max_table_size: usize,
) -> Result<ParserTables, YaccError> {
    let nstates = parser.nstates();

    let defred: Vec<i16> = parser
        .defred
        .iter()
        .map(|&r| if r != Rule(0) { r.0 - 2 } else { 0 })
        .collect();

    let mut act = ActionsTable::new(nstates, gram.nvars);
    token_actions(gram, parser, &mut act);
    let dgoto = goto_actions(gram, nstates, gotos, &mut act);
    let order = sort_actions(&act);
    let packed = pack_table(&order, &act, max_table_size)?;

    let base = &packed.base;
    let tables = ParserTables {
        lhs: make_lhs(gram),
        len: make_len(gram),
        defred,
        dgoto,
        sindex: base[..nstates].to_vec(),
        rindex: base[nstates..2 * nstates].to_vec(),
        gindex: base[2 * nstates..act.nvectors - 1].to_vec(),
        table: packed.table,
        check: packed.check,
        names: make_names(gram),
        rules: make_rules(gram),
        final_state: parser.final_state.0,
        error_token: gram.value(Symbol::ERROR),
        action_offset: gram.action_offset[Rule::ACCEPT.index()..].to_vec(),
    };
    debug!(
        "packed tables: {} states, table size {}",
        nstates,
        tables.table.len()
    );
    Ok(tables)
}

fn make_lhs<A>(gram: &Grammar<A>) -> Vec<i16> {
    let mut lhs = vec![gram.value(gram.start())];
    lhs.extend(
        (Rule::FIRST_USER.index()..gram.nrules).map(|r| gram.value(gram.rlhs(Rule(r as i16)))),
    );
    lhs
}

fn make_len<A>(gram: &Grammar<A>) -> Vec<i16> {
    let mut len = vec![2];
    len.extend(
        (Rule::FIRST_USER.index()..gram.nrules).map(|r| gram.rule_len(Rule(r as i16)) as i16),
    );
    len
}

fn make_names<A>(gram: &Grammar<A>) -> Vec<Option<String>> {
    let max = (2..gram.ntokens)
        .map(|t| gram.value[t])
        .max()
        .unwrap_or(0)
        .max(0) as usize;
    let mut names: Vec<Option<String>> = vec![None; max + 1];
    for t in (2..gram.ntokens).rev() {
        names[gram.value[t] as usize] = Some(gram.name[t].clone());
    }
    names[0] = Some("end-of-file".to_string());
    names
}

fn make_rules<A>(gram: &Grammar<A>) -> Vec<String> {
    gram.iter_rules()
        .map(|rule| {
            let mut s = gram.name(gram.rlhs(rule)).to_string();
            s.push(':');
            for sym in gram.rule_rhs_syms(rule) {
                s.push(' ');
                s.push_str(gram.name(sym));
            }
            s
        })
        .collect()
}

/// All of the vectors defined in ActionsTable have the same length (nvectors)
/// and the indices are assigned in the same way.
///
/// * S0: first region,  length = nstates, contains: shifts
/// * S1: second region, length = nstates, contains: reduces
/// * V:  third region,  length = nvars,   contains: gotos
///
/// nvectors = 2 * nstates + gram.nvars
struct ActionsTable {
    nvectors: usize,
    nstates: usize,
    tally: Vec<i16>,
    width: Vec<i16>,
    froms: Vec<Vec<StateOrRule>>,
    tos: Vec<Vec<StateOrRule>>,
}

impl ActionsTable {
    fn new(nstates: usize, nvars: usize) -> Self {
        let nvectors = 2 * nstates + nvars;
        Self {
            nvectors,
            nstates,
            tally: vec![0; nvectors],
            width: vec![0; nvectors],
            froms: vec![Vec::new(); nvectors],
            tos: vec![Vec::new(); nvectors],
        }
    }

    // Stores one vector, given as (from, to) pairs.
    fn save(&mut self, vector: usize, entries: Vec<(i16, i16)>) {
        if entries.is_empty() {
            return;
        }
        let min = entries.iter().map(|e| e.0).min().unwrap_or(0);
        let max = entries.iter().map(|e| e.0).max().unwrap_or(0);
        self.tally[vector] = entries.len() as i16;
        self.width[vector] = max - min + 1;
        let (froms, tos) = entries.into_iter().unzip();
        self.froms[vector] = froms;
        self.tos[vector] = tos;
    }
}

fn token_actions<A>(gram: &Grammar<A>, parser: &YaccParser, act: &mut ActionsTable) {
    debug!("token_actions()");

    let nstates = parser.nstates();
    let ntokens = gram.ntokens;
    // shifts in [0, ntokens), reductions in [ntokens, 2 * ntokens); 0 means no action
    let mut actionrow: Vec<StateOrRule> = vec![0; 2 * ntokens];

    for (state, actions) in parser.actions.iter().enumerate() {
        if actions.is_empty() {
            continue;
        }
        for a in actionrow.iter_mut() {
            *a = 0;
        }

        for action in actions.iter().filter(|a| a.is_active()) {
            match action.action_code {
                ActionCode::Shift(to_state) => {
                    actionrow[action.symbol.index()] = to_state.0;
                }
                ActionCode::Reduce(rule) => {
                    if rule != parser.defred[state] {
                        actionrow[ntokens + action.symbol.index()] = rule.0;
                    }
                }
            }
        }

        let shifts: Vec<(i16, i16)> = (0..ntokens)
            .filter(|&j| actionrow[j] != 0)
            .map(|j| (gram.value[j], actionrow[j]))
            .collect();
        let reduces: Vec<(i16, i16)> = (0..ntokens)
            .filter(|&j| actionrow[ntokens + j] != 0)
            .map(|j| (gram.value[j], actionrow[ntokens + j] - 2))
            .collect();
        trace!(
            "    state={} shiftcount={} reducecount={}",
            state,
            shifts.len(),
            reduces.len()
        );
        act.save(state, shifts);
        act.save(nstates + state, reduces);
    }
}

/// Chooses the default goto of each variable, then saves the rest of its gotos as a
/// column vector.  Returns the default gotos, starting with the goal.
fn goto_actions<A>(
    gram: &Grammar<A>,
    nstates: usize,
    gotos: &GotoMap,
    act: &mut ActionsTable,
) -> Vec<i16> {
    let mut state_count: Vec<usize> = vec![0; nstates];
    let mut dgoto: Vec<i16> = Vec::with_capacity(gram.nvars);
    for symbol in gram.iter_var_syms().skip(1) {
        let default_state = default_goto(gram, gotos, symbol, &mut state_count);
        dgoto.push(default_state.0);
        save_column(gram, nstates, gotos, symbol, default_state, act);
    }
    dgoto
}

/// The most frequent destination of the gotos on `symbol`.  Among destinations that are
/// equally frequent, the lowest state wins.
fn default_goto<A>(
    gram: &Grammar<A>,
    gotos: &GotoMap,
    symbol: Symbol,
    state_count: &mut [usize],
) -> State {
    let var_gotos = gotos.values(gram.symbol_to_var(symbol));
    if var_gotos.is_empty() {
        return State(0);
    }

    for c in state_count.iter_mut() {
        *c = 0;
    }
    for g in var_gotos.iter() {
        state_count[g.to_state.index()] += 1;
    }

    let mut max = 0;
    let mut default_state = 0;
    for (state, &count) in state_count.iter().enumerate() {
        if count > max {
            max = count;
            default_state = state;
        }
    }

    trace!("default_goto({}) = {}", gram.name(symbol), default_state);
    State(default_state as i16)
}

fn save_column<A>(
    gram: &Grammar<A>,
    nstates: usize,
    gotos: &GotoMap,
    symbol: Symbol,
    default_state: State,
    act: &mut ActionsTable,
) {
    let entries: Vec<(i16, i16)> = gotos
        .values(gram.symbol_to_var(symbol))
        .iter()
        .filter(|g| g.to_state != default_state)
        .map(|g| (g.from_state.0, g.to_state.0))
        .collect();
    let vector = gram.value(symbol) as usize + 2 * nstates;
    act.save(vector, entries);
}

/// Orders the nonempty vectors by decreasing width, then decreasing tally.  The sort is
/// stable, so equal vectors keep their vector order.
fn sort_actions(act: &ActionsTable) -> Vec<usize> {
    let mut order: Vec<usize> = (0..act.nvectors).filter(|&i| act.tally[i] > 0).collect();
    order.sort_by(|&a, &b| {
        act.width[b]
            .cmp(&act.width[a])
            .then_with(|| act.tally[b].cmp(&act.tally[a]))
    });
    debug!("sort_actions: nentries={}", order.len());
    order
}

struct PackState<'a> {
    base: Vec<i16>,
    // pos[k] is the base chosen for order[k]
    pos: Vec<i16>,
    table: Vec<i16>, // table and check always have same len
    check: Vec<i16>, // table is 0-filled, check is -1-filled
    lowzero: usize,
    high: usize,
    max_table_size: usize,

    order: &'a [usize],
    act: &'a ActionsTable,
}

struct PackedTables {
    base: Vec<i16>,
    table: Vec<i16>,
    check: Vec<i16>,
}

fn pack_table(
    order: &[usize],
    act: &ActionsTable,
    max_table_size: usize,
) -> Result<PackedTables, YaccError> {
    debug!("pack_table: nentries={}", order.len());

    let initial_size = cmp::min(1000, max_table_size);
    let mut pack = PackState {
        base: vec![0; act.nvectors],
        pos: vec![0; order.len()],
        table: vec![0; initial_size],
        check: vec![-1; initial_size],
        lowzero: 0,
        high: 0,
        // table indices must fit in the i16 base and check values
        max_table_size: cmp::min(max_table_size, i16::MAX as usize),
        order,
        act,
    };

    for (i, &vector) in order.iter().enumerate() {
        let place = match matching_vector(&pack, i) {
            Some(j) => pack.base[j],
            None => pack_vector(&mut pack, i)?,
        };
        pack.pos[i] = place;
        pack.base[vector] = place;
    }

    pack.table.truncate(pack.high + 1);
    pack.check.truncate(pack.high + 1);

    Ok(PackedTables {
        base: pack.base,
        table: pack.table,
        check: pack.check,
    })
}

/// Finds an earlier vector (in packing order) that is identical to this one, so that
/// the two can share a base.  Only rows are considered; columns of gotos are never
/// shared, because no two of them can be equal.  Since the vectors are sorted, the
/// search can stop at the first vector with a different width or tally.
fn matching_vector(pack: &PackState<'_>, vector: usize) -> Option<usize> {
    let act = pack.act;
    let i = pack.order[vector];
    if i >= 2 * act.nstates {
        return None;
    }

    let t = act.tally[i];
    let w = act.width[i];
    for &j in pack.order[..vector].iter().rev() {
        if act.width[j] != w || act.tally[j] != t {
            return None;
        }
        if act.tos[i] == act.tos[j] && act.froms[i] == act.froms[j] {
            return Some(j);
        }
    }
    None
}

/// Finds the first base `j` at which every entry of the vector lands on a free slot,
/// then writes the vector there.  Base 0 is never used, and no two vectors share a base.
fn pack_vector(pack: &mut PackState<'_>, vector: usize) -> Result<i16, YaccError> {
    let act = pack.act;
    let i = pack.order[vector];
    let from = &act.froms[i];
    let to = &act.tos[i];
    assert!(!from.is_empty());

    let lowzero = pack.lowzero as i32;
    let mut j: i32 = from
        .iter()
        .map(|&f| lowzero - f as i32)
        .max()
        .unwrap_or(lowzero);

    loop {
        if j == 0 {
            j += 1;
            continue;
        }

        let mut ok = true;
        for &f in from.iter() {
            // j >= lowzero - f, so loc is never negative
            let loc = (j + f as i32) as usize;
            if loc >= pack.table.len() {
                if loc >= pack.max_table_size {
                    return Err(YaccError::new(ErrorKind::TableOverflow));
                }
                pack.table.resize(loc + 1, 0);
                pack.check.resize(loc + 1, -1);
            }
            if pack.check[loc] != -1 {
                ok = false;
                break;
            }
        }
        if ok && pack.pos[..vector].iter().any(|&p| p as i32 == j) {
            ok = false;
        }
        if !ok {
            j += 1;
            continue;
        }

        for (&f, &t) in from.iter().zip(to.iter()) {
            let loc = (j + f as i32) as usize;
            pack.table[loc] = t;
            pack.check[loc] = f;
            pack.high = cmp::max(pack.high, loc);
        }

        while pack.lowzero < pack.check.len() && pack.check[pack.lowzero] != -1 {
            pack.lowzero += 1;
        }

        trace!("pack_vector: vector {} placed at {}", i, j);
        return Ok(j as i16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(vectors: &[&[(i16, i16)]], nstates: usize) -> ActionsTable {
        let nvars = vectors.len() - 2 * nstates;
        let mut act = ActionsTable::new(nstates, nvars);
        for (i, v) in vectors.iter().enumerate() {
            act.save(i, v.to_vec());
        }
        act
    }

    #[test]
    fn wider_vectors_pack_first() {
        let act = table_with(&[&[(1, 5)], &[(0, 1), (9, 2)], &[(3, 1), (4, 1)], &[]], 2);
        assert_eq!(act.width[1], 10);
        assert_eq!(sort_actions(&act), vec![1, 2, 0]);
    }

    #[test]
    fn identical_rows_share_a_base() {
        let act = table_with(&[&[(2, 7), (3, 8)], &[(2, 7), (3, 8)], &[], &[]], 2);
        let order = sort_actions(&act);
        let packed = pack_table(&order, &act, 100).unwrap();
        assert_eq!(packed.base[0], packed.base[1]);
        assert_eq!(packed.table.len(), packed.check.len());
    }

    #[test]
    fn packed_entries_decode() {
        let vectors: &[&[(i16, i16)]] = &[
            &[(0, 3), (4, 6)],
            &[(1, 2), (2, 9), (4, 11)],
            &[(4, 1)],
            &[(0, 5)],
            &[(1, 7), (3, 8)],
        ];
        let act = table_with(vectors, 2);
        let order = sort_actions(&act);
        let packed = pack_table(&order, &act, 100).unwrap();
        for (i, v) in vectors.iter().enumerate() {
            let base = packed.base[i] as i32;
            assert_ne!(base, 0);
            for &(f, t) in v.iter() {
                let loc = (base + f as i32) as usize;
                assert_eq!(packed.check[loc], f);
                assert_eq!(packed.table[loc], t);
            }
        }
        // bases of distinct vectors are distinct
        let mut bases: Vec<i16> = order.iter().map(|&o| packed.base[o]).collect();
        bases.sort();
        bases.dedup();
        assert_eq!(bases.len(), order.len());
    }

    #[test]
    fn overflow_is_fatal() {
        let act = table_with(&[&[(0, 1), (40, 2)], &[], &[]], 1);
        let order = sort_actions(&act);
        let err = pack_table(&order, &act, 16).err().unwrap();
        assert_eq!(err.kind, ErrorKind::TableOverflow);
    }
}
