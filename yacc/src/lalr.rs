//! Implements LALR(1) analysis and table generation.
//!
//! See: [Efficient Computation of LALR(1) Look-Ahead Sets](http://3e8.org/pub/scheme/doc/parsing/Efficient%20Computation%20of%20LALR%281%29%20Look-Ahead%20Sets.pdf),
//! DeRemer and Pennello, ACM Transactions on Programming Languages and Systems.
//! 615-649. doi:10.1145/69622.357187
//!

use crate::errors::{ErrorKind, YaccError};
use crate::grammar::Grammar;
use crate::lr0::{LR0Output, NullableTable, Reductions};
use crate::ramp_table::RampTable;
use crate::util::Bitmat;
use crate::{ItemKind, Rule, State, Symbol, Var};
use log::debug;

/// The outputs of the `run_lalr_phase` function.
#[allow(non_snake_case)]
pub struct LALROutput {
    /// The look-ahead set of each reduction.  Rows are indexed like
    /// `LR0Output::reductions.all_values()`, columns are tokens.
    pub LA: Bitmat,
    pub gotos: GotoMap,
}

impl LALROutput {
    /// The look-ahead tokens of the `k`-th reduction of `state`.
    pub fn lookaheads<'a>(
        &'a self,
        reductions: &Reductions,
        state: State,
        k: usize,
    ) -> impl Iterator<Item = usize> + 'a {
        let row = reductions.values_range(state).start + k;
        self.LA.iter_ones_in_row(row)
    }
}

/// Describes a transition from one state to another state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Goto {
    pub from_state: State,
    pub to_state: State,
}

// Var -> [Goto]
pub type GotoMap = RampTable<Goto>;

#[allow(non_snake_case)]
pub fn run_lalr_phase<A>(gram: &Grammar<A>, lr0: &LR0Output) -> Result<LALROutput, YaccError> {
    debug!("Running LALR phase");
    let gotos = set_goto_map(gram, lr0)?;
    let mut F = initialize_F(gram, lr0, &lr0.nullable, &gotos);
    let (includes, lookback) = build_relations(gram, lr0, &lr0.nullable, &gotos);
    compute_FOLLOWS(&includes, &mut F);
    let LA = compute_lookaheads(gram, lr0, &lookback, &F);
    Ok(LALROutput { LA, gotos })
}

/// Builds the GotoMap: Var -> [Goto]
///
/// For each variable, we find the set of state transitions that it can cause, ordered
/// by from_state.
///
/// GotoMap::num_keys() = nvars
fn set_goto_map<A>(gram: &Grammar<A>, lr0: &LR0Output) -> Result<GotoMap, YaccError> {
    debug!("set_goto_map");
    // Count the number of gotos for each variable.
    let mut goto_map: Vec<usize> = vec![0; gram.nvars + 1];
    let mut ngotos: usize = 0;

    // This code assumes that the entries in lr0.shifts[i] are ordered, such that
    // all token transitions precede all var transitions. This is true because
    // compute_lr0() sorts the shift list for each state.
    for shifts in lr0.shifts.iter() {
        for &state in shifts.iter().rev() {
            let symbol = lr0.accessing_symbol[state];
            if gram.is_token(symbol) {
                break;
            }
            if ngotos >= i16::MAX as usize {
                return Err(YaccError::new(ErrorKind::TooManyGotos));
            }
            ngotos += 1;
            goto_map[gram.symbol_to_var(symbol).index()] += 1;
        }
    }

    // Replace each count with the sum of all previous counts.
    let mut k: usize = 0;
    let mut temp_map: Vec<usize> = Vec::with_capacity(gram.nvars + 1);
    for g in goto_map[..gram.nvars].iter_mut() {
        let n = *g;
        *g = k;
        temp_map.push(k);
        k += n;
    }
    goto_map[gram.nvars] = ngotos;
    temp_map.push(ngotos);

    let mut from_to: Vec<Goto> = vec![
        Goto {
            from_state: State(0),
            to_state: State(0)
        };
        ngotos
    ];

    // States are visited in increasing order, so each variable's gotos are sorted by
    // from_state.  map_goto depends on this.
    for (from_state, sp_shifts) in lr0.shifts.iter().enumerate() {
        let from_state = State(from_state as i16);
        for &to_state in sp_shifts.iter().rev() {
            let symbol = lr0.accessing_symbol[to_state];
            if gram.is_token(symbol) {
                break;
            }

            let k = &mut temp_map[gram.symbol_to_var(symbol).index()];
            from_to[*k] = Goto {
                from_state,
                to_state,
            };
            *k += 1;
        }
    }

    let result = GotoMap {
        index: goto_map,
        table: from_to,
    };

    for (ivar, gotos) in result.iter().enumerate() {
        let var = Var(ivar as i16);
        let var_name = gram.name(gram.var_to_symbol(var));
        for goto in gotos.iter() {
            debug!(
                "goto[{:4}]  {:20} causes s{:-3} --> s{:-3}",
                result.index[ivar], var_name, goto.from_state, goto.to_state
            );
        }
    }

    Ok(result)
}

/// Returns an index into goto_map, i.e. the "goto".
///
/// Searches the `GotoMap` for a state transition for `var` from state
/// `from_state`. Returns the index into the `GotoMap` for the given
/// transition.
pub fn map_goto(gotos: &GotoMap, from_state: State, var: Var) -> usize {
    use std::cmp::Ordering;
    let range = gotos.values_range(var);
    let mut low = range.start;
    let mut high = range.end;
    loop {
        assert!(low < high, "no goto on var {} from s{}", var, from_state);
        let middle = (low + high) / 2;
        match from_state.cmp(&gotos.all_values()[middle].from_state) {
            Ordering::Equal => return middle,
            Ordering::Less => high = middle,
            Ordering::Greater => low = middle + 1,
        }
    }
}

/// Builds the F relation. This relation is a `Bitmat`, whose rows correspond to "goto" indices
/// and whose columns correspond to token indices.  On return, it has been closed over the
/// "reads" relation.
#[allow(non_snake_case)]
fn initialize_F<A>(
    gram: &Grammar<A>,
    lr0: &LR0Output,
    nullable: &NullableTable,
    gotos: &GotoMap,
) -> Bitmat {
    debug!("initialize_F");

    let ngotos = gotos.num_values();
    let mut F = Bitmat::new(ngotos, gram.ntokens);
    let mut reads: Vec<Vec<i16>> = vec![vec![]; ngotos];

    for (i, goto) in gotos.all_values().iter().enumerate() {
        let stateno = goto.to_state;
        let shifts = lr0.shifts.values(stateno);

        // The tokens that can be shifted in `stateno` are read directly.
        let mut j: usize = 0;
        while j < shifts.len() {
            let symbol = lr0.accessing_symbol[shifts[j]];
            if gram.is_var(symbol) {
                break;
            }
            F.set(i, symbol.index());
            j += 1;
        }

        // Whatever a nullable variable's goto reads is also read here.
        let mut edge: Vec<i16> = Vec::new();
        for &shift in shifts[j..].iter() {
            let symbol = lr0.accessing_symbol[shift];
            if nullable[symbol] {
                let mapped_goto = map_goto(gotos, stateno, gram.symbol_to_var(symbol));
                debug!(
                    "    direct read: var {:-20}, mapped_goto {:4}, from_state {:4}",
                    gram.name(symbol),
                    mapped_goto,
                    stateno,
                );
                edge.push(mapped_goto as i16);
            }
        }
        reads[i] = edge;
    }

    if ngotos > 0 {
        F.set(0, 0);
    }

    digraph(&reads, &mut F);

    debug!("initialize_F: Relation F, state transitions caused-by token:");
    for (goto_index, goto) in gotos.all_values().iter().enumerate() {
        for token_index in F.iter_ones_in_row(goto_index) {
            debug!(
                "    {:-4} --> {:-4}   caused by   {}",
                goto.from_state,
                goto.to_state,
                gram.name(Symbol(token_index as i16)),
            );
        }
    }

    F
}

/// Returns (includes, lookback)
///
/// The `includes` relation maps goto_index --> [goto_index].  It is returned transposed,
/// so that row `j` lists the gotos whose FOLLOW set must contain FOLLOW(j).
///
/// `lookback` maps each reduction (an index into `lr0.reductions.all_values()`) to the
/// gotos that it looks back to.
///
/// It is tempting to change the representation of `includes` to use a `Bitmat` or something
/// similar.  However, so sayeth DeRemer:
///
/// > Watt's proposed bit matrix representations of the sparse relations reads and includes would be
/// > wasteful of space and time; for example, for a particular Ada grammar, each matrix contains
/// > almost five million bits.
fn build_relations<A>(
    gram: &Grammar<A>,
    lr0: &LR0Output,
    nullable: &NullableTable,
    gotos: &GotoMap,
) -> (Vec<Vec<i16>>, Vec<Vec<i16>>) {
    debug!("build_relations:");

    let ngotos = gotos.num_values();
    let mut includes: Vec<Vec<i16>> = Vec::with_capacity(ngotos);
    let mut lookback: Vec<Vec<i16>> = vec![Vec::new(); lr0.reductions.num_values()];

    // The states visited while replaying a rhs.  Cleared and reused for each rule.
    let mut states: Vec<State> = Vec::new();

    for (i, goto) in gotos.all_values().iter().enumerate() {
        let mut edge: Vec<i16> = Vec::new();
        let from_state = goto.from_state;
        let symbol1 = lr0.accessing_symbol[goto.to_state];

        for &rule in lr0.derives.values(gram.symbol_to_var(symbol1)) {
            states.clear();
            states.push(from_state);
            let mut stateno = from_state;
            for symbol2 in gram.rule_rhs_syms(rule) {
                for &shift in lr0.shifts.values(stateno) {
                    stateno = shift;
                    if lr0.accessing_symbol[stateno] == symbol2 {
                        break;
                    }
                }
                states.push(stateno);
            }

            add_lookback_edge(stateno, rule, i, &lr0.reductions, &mut lookback);

            // Walk the rhs backwards while it ends in variables.  Each of them includes
            // this goto; keep going past the nullable ones.
            let mut length = states.len() - 1;
            let mut item = gram.rrhs[rule.index() + 1].index() - 1;
            while length > 0 {
                item -= 1;
                let symbol = match gram.ritem[item].kind() {
                    ItemKind::Symbol(symbol) if gram.is_var(symbol) => symbol,
                    _ => break,
                };
                length -= 1;
                edge.push(map_goto(gotos, states[length], gram.symbol_to_var(symbol)) as i16);
                if !nullable[symbol] {
                    break;
                }
            }
        }
        includes.push(edge);
    }

    (transpose(&includes), lookback)
}

// Adds an entry to the 'lookback' table.
fn add_lookback_edge(
    state: State,
    ruleno: Rule,
    goto: usize,
    reductions: &Reductions,
    lookback: &mut [Vec<i16>],
) {
    let range = reductions.values_range(state);
    let state_rules = reductions.values(state);
    for (i, &r) in range.zip(state_rules) {
        if r == ruleno {
            lookback[i].insert(0, goto as i16);
            return;
        }
    }
    unreachable!("rule {} is not reduced in s{}", ruleno, state);
}

fn transpose(r2: &[Vec<i16>]) -> Vec<Vec<i16>> {
    let mut new_r: Vec<Vec<i16>> = vec![Vec::new(); r2.len()];
    for (i, sp) in r2.iter().enumerate() {
        for &k in sp.iter() {
            new_r[k as usize].push(i as i16);
        }
    }
    new_r
}

#[allow(non_snake_case)]
fn compute_FOLLOWS(includes: &[Vec<i16>], F: &mut Bitmat) {
    digraph(includes, F);
}

#[allow(non_snake_case)]
fn compute_lookaheads<A>(
    gram: &Grammar<A>,
    lr0: &LR0Output,
    lookback: &[Vec<i16>],
    F: &Bitmat,
) -> Bitmat {
    let num_reductions = lr0.reductions.num_values();
    let mut LA = Bitmat::new(num_reductions, gram.ntokens);

    assert!(F.cols() == LA.cols());
    assert!(F.rowsize == LA.rowsize);

    for (i, gotos) in lookback.iter().enumerate() {
        for &goto in gotos.iter() {
            let src = goto as usize * F.rowsize;
            let dst = i * LA.rowsize;
            for k in 0..LA.rowsize {
                LA.data[dst + k] |= F.data[src + k];
            }
        }
    }

    LA
}

// One pending call of the traversal.
struct Frame {
    node: usize,
    // the next edge of `node` to follow
    edge: usize,
    height: usize,
}

/// Closes `f` over `relation`: afterwards, row `i` of `f` is the union of the rows of
/// everything reachable from `i`.  Each strongly connected component ends up with one
/// shared row.
///
/// This is Tarjan's algorithm with an explicit stack of frames, visiting edges in the same
/// order as the recursive formulation.
fn digraph(relation: &[Vec<i16>], f: &mut Bitmat) {
    let ngotos = f.rows();
    let infinity = ngotos + 2;
    let mut index: Vec<usize> = vec![0; ngotos + 1];
    let mut vertices: Vec<usize> = Vec::with_capacity(ngotos + 1);
    let mut frames: Vec<Frame> = Vec::new();

    for i in 0..ngotos {
        if index[i] == 0 && !relation[i].is_empty() {
            traverse(relation, f, i, infinity, &mut index, &mut vertices, &mut frames);
        }
    }
}

fn traverse(
    relation: &[Vec<i16>],
    f: &mut Bitmat,
    start: usize,
    infinity: usize,
    index: &mut [usize],
    vertices: &mut Vec<usize>,
    frames: &mut Vec<Frame>,
) {
    enter(start, index, vertices, frames);

    while let Some(frame) = frames.last() {
        let i = frame.node;
        let height = frame.height;
        if let Some(&j) = relation[i].get(frame.edge) {
            let j = j as usize;
            if index[j] == 0 {
                // Visit j first; this edge is revisited when j's frame is done.
                enter(j, index, vertices, frames);
                continue;
            }
            if index[i] > index[j] {
                index[i] = index[j];
            }
            f.union_rows(i, j);
            if let Some(frame) = frames.last_mut() {
                frame.edge += 1;
            }
        } else {
            frames.pop();
            if index[i] == height {
                // i is the root of a component: every member gets i's row.
                while let Some(j) = vertices.pop() {
                    index[j] = infinity;
                    if j == i {
                        break;
                    }
                    f.copy_row(j, i);
                }
            }
        }
    }
}

fn enter(node: usize, index: &mut [usize], vertices: &mut Vec<usize>, frames: &mut Vec<Frame>) {
    vertices.push(node);
    let height = vertices.len();
    index[node] = height;
    frames.push(Frame {
        node,
        edge: 0,
        height,
    });
}
