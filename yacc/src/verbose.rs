//! Renders the `y.output` report: the grammar, every state with its items and actions,
//! and the conflicts.

use crate::grammar::Grammar;
use crate::lr0::LR0Output;
use crate::mkpar::{ActionCode, ParserAction, Suppressed, YaccParser};
use crate::{Item, ItemKind, Rule, State, Token};
use core::fmt::{self, Write};

pub fn report<A>(gram: &Grammar<A>, lr0: &LR0Output, parser: &YaccParser) -> String {
    let mut s = String::new();
    // Formatting into a String does not fail.
    let _ = write_report(&mut s, gram, lr0, parser);
    s
}

pub fn write_report<A, W: Write>(
    out: &mut W,
    gram: &Grammar<A>,
    lr0: &LR0Output,
    parser: &YaccParser,
) -> fmt::Result {
    print_grammar(out, gram)?;

    out.write_str("\x0c\n")?;
    for state in 0..lr0.nstates() {
        print_state(out, gram, lr0, parser, State(state as i16))?;
    }

    if parser.nunused != 0 {
        log_unused(out, gram, parser)?;
    }
    if parser.sr_total != 0 || parser.rr_total != 0 {
        log_conflicts(out, parser)?;
    }

    write!(
        out,
        "\n\n{} terminals, {} nonterminals\n",
        gram.ntokens, gram.nvars
    )?;
    writeln!(
        out,
        "{} grammar rules, {} states",
        gram.nrules - 2,
        lr0.nstates()
    )
}

fn print_grammar<A, W: Write>(out: &mut W, gram: &Grammar<A>) -> fmt::Result {
    let mut spacing = 0;
    for rule in gram.iter_rules() {
        let lhs = gram.rlhs(rule);
        if lhs != gram.rlhs(Rule(rule.0 - 1)) {
            if rule != Rule::ACCEPT {
                out.write_char('\n')?;
            }
            write!(out, "{:4}  {} :", rule.0 - 2, gram.name(lhs))?;
            spacing = gram.name(lhs).len() + 1;
        } else {
            write!(out, "{:4}  {:spacing$}|", rule.0 - 2, "", spacing = spacing)?;
        }
        for sym in gram.rule_rhs_syms(rule) {
            write!(out, " {}", gram.name(sym))?;
        }
        out.write_char('\n')?;
    }
    Ok(())
}

fn log_unused<A, W: Write>(out: &mut W, gram: &Grammar<A>, parser: &YaccParser) -> fmt::Result {
    out.write_str("\n\nRules never reduced:\n")?;
    for r in Rule::FIRST_USER.index()..gram.nrules {
        if !parser.rules_used[r] {
            let rule = Rule(r as i16);
            write!(out, "\t{} :", gram.name(gram.rlhs(rule)))?;
            for sym in gram.rule_rhs_syms(rule) {
                write!(out, " {}", gram.name(sym))?;
            }
            writeln!(out, "  ({})", r - 2)?;
        }
    }
    Ok(())
}

fn log_conflicts<W: Write>(out: &mut W, parser: &YaccParser) -> fmt::Result {
    out.write_str("\n\n")?;
    for state in 0..parser.nstates() {
        let sr = parser.sr_conflicts[state];
        let rr = parser.rr_conflicts[state];
        if sr == 0 && rr == 0 {
            continue;
        }
        write!(out, "State {} contains ", state)?;
        match sr {
            0 => {}
            1 => out.write_str("1 shift/reduce conflict")?,
            n => write!(out, "{} shift/reduce conflicts", n)?,
        }
        if sr != 0 && rr != 0 {
            out.write_str(", ")?;
        }
        match rr {
            0 => {}
            1 => out.write_str("1 reduce/reduce conflict")?,
            n => write!(out, "{} reduce/reduce conflicts", n)?,
        }
        out.write_str(".\n")?;
    }
    Ok(())
}

fn print_state<A, W: Write>(
    out: &mut W,
    gram: &Grammar<A>,
    lr0: &LR0Output,
    parser: &YaccParser,
    state: State,
) -> fmt::Result {
    if state.0 != 0 {
        out.write_str("\n\n")?;
    }
    let actions = parser.actions_of(state);
    if parser.sr_conflicts[state.index()] != 0 || parser.rr_conflicts[state.index()] != 0 {
        print_conflicts(out, gram, parser, state, actions)?;
    }
    writeln!(out, "state {}", state)?;
    print_core(out, gram, lr0.states.values(state))?;
    print_nulls(out, gram, actions)?;
    print_actions(out, gram, lr0, parser, state, actions)
}

fn print_conflicts<A, W: Write>(
    out: &mut W,
    gram: &Grammar<A>,
    parser: &YaccParser,
    state: State,
    actions: &[ParserAction],
) -> fmt::Result {
    let mut current: Option<(Token, ActionCode)> = None;
    for p in actions.iter() {
        if p.suppressed == Suppressed::Precedence {
            continue;
        }
        match current {
            Some((symbol, _)) if symbol == p.symbol => {}
            _ => {
                current = Some((p.symbol, p.action_code));
                continue;
            }
        }
        if p.suppressed != Suppressed::Conflict {
            continue;
        }
        let rule = match p.action_code {
            ActionCode::Reduce(rule) => rule.0 - 2,
            ActionCode::Shift(_) => continue,
        };
        let symbol = p.symbol;
        if state == parser.final_state && symbol == Token::END {
            writeln!(
                out,
                "{}: shift/reduce conflict (accept, reduce {}) on $end",
                state, rule
            )?;
            continue;
        }
        let name = gram.name(symbol.to_symbol());
        match current {
            Some((_, ActionCode::Shift(to))) => writeln!(
                out,
                "{}: shift/reduce conflict (shift {}, reduce {}) on {}",
                state, to, rule, name
            )?,
            Some((_, ActionCode::Reduce(first))) => writeln!(
                out,
                "{}: reduce/reduce conflict (reduce {}, reduce {}) on {}",
                state,
                first.0 - 2,
                rule,
                name
            )?,
            None => {}
        }
    }
    Ok(())
}

fn print_core<A, W: Write>(out: &mut W, gram: &Grammar<A>, items: &[Item]) -> fmt::Result {
    for &item in items.iter() {
        // find the end of the rule, which names it
        let mut end = item.index();
        let rule = loop {
            match gram.ritem[end].kind() {
                ItemKind::RuleEnd(rule) => break rule,
                ItemKind::Symbol(_) => end += 1,
            }
        };

        write!(out, "\t{} : ", gram.name(gram.rlhs(rule)))?;
        let start = gram.rrhs(rule).index();
        for i in start..item.index() {
            write!(out, "{} ", gram.name(gram.ritem[i].as_symbol()))?;
        }
        out.write_char('.')?;
        for i in item.index()..end {
            write!(out, " {}", gram.name(gram.ritem[i].as_symbol()))?;
        }
        writeln!(out, "  ({})", rule.0 - 2)?;
    }
    Ok(())
}

/// Lists the empty rules that the state reduces by, in rule order.
fn print_nulls<A, W: Write>(
    out: &mut W,
    gram: &Grammar<A>,
    actions: &[ParserAction],
) -> fmt::Result {
    let mut null_rules: Vec<Rule> = actions
        .iter()
        .filter(|p| p.suppressed != Suppressed::Precedence)
        .filter_map(|p| match p.action_code {
            ActionCode::Reduce(rule) if gram.rule_len(rule) == 0 => Some(rule),
            _ => None,
        })
        .collect();
    null_rules.sort();
    null_rules.dedup();

    for rule in null_rules {
        writeln!(out, "\t{} : .  ({})", gram.name(gram.rlhs(rule)), rule.0 - 2)?;
    }
    out.write_char('\n')
}

fn print_actions<A, W: Write>(
    out: &mut W,
    gram: &Grammar<A>,
    lr0: &LR0Output,
    parser: &YaccParser,
    state: State,
    actions: &[ParserAction],
) -> fmt::Result {
    if state == parser.final_state {
        out.write_str("\t$end  accept\n")?;
    }

    if !actions.is_empty() {
        for p in actions.iter().filter(|p| p.is_active()) {
            if let ActionCode::Shift(to) = p.action_code {
                writeln!(out, "\t{}  shift {}", gram.name(p.symbol.to_symbol()), to)?;
            }
        }
        print_reductions(out, gram, actions, parser.defred[state.index()])?;
    }

    let shifts = lr0.shifts.values(state);
    if let Some(&last) = shifts.last() {
        if gram.is_var(lr0.accessing_symbol[last]) {
            out.write_char('\n')?;
            for &to in shifts.iter() {
                let symbol = lr0.accessing_symbol[to];
                if gram.is_var(symbol) {
                    writeln!(out, "\t{}  goto {}", gram.name(symbol), to)?;
                }
            }
        }
    }
    Ok(())
}

fn print_reductions<A, W: Write>(
    out: &mut W,
    gram: &Grammar<A>,
    actions: &[ParserAction],
    defred: Rule,
) -> fmt::Result {
    let any_reductions = actions
        .iter()
        .any(|p| p.action_code.is_reduce() && p.suppressed != Suppressed::Precedence);
    if !any_reductions {
        return out.write_str("\t.  error\n");
    }

    for p in actions.iter().filter(|p| p.is_active()) {
        if let ActionCode::Reduce(rule) = p.action_code {
            if rule != defred {
                writeln!(
                    out,
                    "\t{}  reduce {}",
                    gram.name(p.symbol.to_symbol()),
                    rule.0 - 2
                )?;
            }
        }
    }
    if defred > Rule(0) {
        writeln!(out, "\t.  reduce {}", defred.0 - 2)?;
    }
    Ok(())
}
