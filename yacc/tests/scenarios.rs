//! Whole-pipeline checks on small grammars with well-known automata.

use yacc::mkpar::ActionCode;
use yacc::packing::ParserTables;
use yacc::reader::read_grammar;
use yacc::{generate, ErrorKind, Generated, Options, State, Symbol};

#[static_init::dynamic]
static INIT_LOGGER: () = {
    env_logger::builder().default_format_timestamp(false).init();
};

fn build(text: &str, options: &Options) -> Generated<String> {
    let read = match read_grammar(text, options) {
        Ok(read) => read,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    };
    match generate(read.builder, options) {
        Ok(generated) => generated,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    }
}

fn sym(gen: &Generated<String>, name: &str) -> Symbol {
    match gen.grammar.name.iter().position(|n| n == name) {
        Some(i) => Symbol(i as i16),
        None => panic!("no symbol named {}", name),
    }
}

const NULLABLE: &str = "
%%
S : A ;
A : 'a' A
  |
  ;
";

#[test]
fn nullable_tail() {
    let gen = build(NULLABLE, &Options::default());
    assert_eq!(gen.lr0.nstates(), 5);
    assert_eq!(gen.parser.sr_total, 0);
    assert_eq!(gen.parser.rr_total, 0);
    assert!(gen.lr0.nullable[sym(&gen, "A")]);
    assert!(gen.lr0.nullable[sym(&gen, "S")]);

    // the initial state and the state after 'a' both shift 'a', and reduce the empty
    // rule at the end of the input
    let a = sym(&gen, "'a'");
    let after_a = gen.lr0.shift_on(State(0), a).unwrap();
    assert_eq!(gen.lr0.shift_on(after_a, a), Some(after_a));
    assert_eq!(gen.tables.defred[0], 0);
    assert_eq!(gen.tables.defred[after_a.index()], 0);
    gen.tables.with_runtime_tables(|t| {
        assert_eq!(t.reduce_on(0, 0), Some(3));
        assert_eq!(t.reduce_on(after_a.0, 0), Some(3));
        assert_eq!(t.shift_on(0, 'a' as i16), Some(after_a.0));
    });
}

const DANGLING_ELSE: &str = "
%token IF THEN ELSE X
%%
stmt : IF X THEN stmt
     | IF X THEN stmt ELSE stmt
     | X
     ;
";

#[test]
fn dangling_else_is_one_conflict() {
    let options = Options {
        verbose: true,
        ..Options::default()
    };
    let gen = build(DANGLING_ELSE, &options);
    assert_eq!(gen.parser.sr_total, 1);
    assert_eq!(gen.parser.rr_total, 0);
    assert_eq!(
        gen.diagnostics.render("yacc", "test.y"),
        "yacc: 1 shift/reduce conflict.\n"
    );

    let report = gen.report.unwrap();
    assert!(report.contains("reduce 1) on ELSE\n"), "{}", report);
    assert!(report.contains("contains 1 shift/reduce conflict.\n"), "{}", report);
}

#[test]
fn precedence_resolves_silently() {
    let gen = build(
        "
%token NUM
%left '+' '-'
%left '*' '/'
%%
expr : expr '+' expr
     | expr '-' expr
     | expr '*' expr
     | expr '/' expr
     | '(' expr ')'
     | NUM
     ;
",
        &Options::default(),
    );
    assert_eq!(gen.parser.sr_total, 0);
    assert_eq!(gen.parser.rr_total, 0);
    assert!(gen.diagnostics.is_empty());
    assert_eq!(gen.grammar.value(sym(&gen, "NUM")), 257);

    // '*' binds tighter than '+', which associates to the left
    let plus = gen.grammar.prec[sym(&gen, "'+'").index()];
    let times = gen.grammar.prec[sym(&gen, "'*'").index()];
    assert!(times > plus);
    assert_eq!(gen.grammar.rprec[3], plus);
    assert_eq!(gen.grammar.rprec[5], times);
}

#[test]
fn rule_precedence_can_be_overridden() {
    let gen = build(
        "
%token NUM
%left '-'
%left '*'
%nonassoc UMINUS
%%
expr : expr '-' expr
     | expr '*' expr
     | '-' expr %prec UMINUS
     | NUM
     ;
",
        &Options::default(),
    );
    assert_eq!(gen.parser.sr_total, 0);
    let uminus = gen.grammar.prec[sym(&gen, "UMINUS").index()];
    assert_eq!(gen.grammar.rprec[5], uminus);
}

/// The classic grammar that is LALR(1) but not SLR(1).
#[test]
fn lalr_lookaheads_are_sharper_than_follow_sets() {
    let gen = build(
        "
%token ID
%%
S : L '=' R
  | R
  ;
L : '*' R
  | ID
  ;
R : L
  ;
",
        &Options::default(),
    );
    assert_eq!(gen.parser.sr_total, 0);
    assert_eq!(gen.parser.rr_total, 0);

    let l = sym(&gen, "L");
    let eq = sym(&gen, "'='").index();
    let star = sym(&gen, "'*'");

    // after L at the start, '=' is shifted; R : L is reduced only at the end
    let s = gen.lr0.shift_on(State(0), l).unwrap();
    assert_eq!(gen.lr0.reductions.values(s).len(), 1);
    let la: Vec<usize> = gen.lalr.lookaheads(&gen.lr0.reductions, s, 0).collect();
    assert_eq!(la, vec![Symbol::END.index()]);

    // after '*' L, R : L is reduced on both '=' and $end
    let t = gen
        .lr0
        .shift_on(gen.lr0.shift_on(State(0), star).unwrap(), l)
        .unwrap();
    let la: Vec<usize> = gen.lalr.lookaheads(&gen.lr0.reductions, t, 0).collect();
    assert!(la.contains(&eq));
    assert!(la.contains(&Symbol::END.index()));
}

#[test]
fn reduce_reduce_conflict_prefers_the_earlier_rule() {
    let options = Options {
        verbose: true,
        ..Options::default()
    };
    let gen = build(
        "
%token X
%%
s : a
  | b
  ;
a : X ;
b : X ;
",
        &options,
    );
    assert_eq!(gen.parser.rr_total, 1);
    assert_eq!(gen.parser.sr_total, 0);

    // the later rule is never reduced
    assert_eq!(gen.parser.nunused, 1);
    let messages: Vec<String> = gen
        .diagnostics
        .entries()
        .iter()
        .map(|d| d.message.clone())
        .collect();
    assert_eq!(
        messages,
        vec!["1 rule never reduced", "1 reduce/reduce conflict."]
    );
    let report = gen.report.unwrap();
    assert!(report.contains("Rules never reduced:\n\tb : X  (4)\n"), "{}", report);
    assert!(report.contains("reduce/reduce conflict (reduce 3, reduce 4) on $end"));
}

#[test]
fn undefined_symbols_become_tokens() {
    let gen = build("%%\ns : A ;\n", &Options::default());
    let warnings: Vec<&str> = gen.diagnostics.warnings().collect();
    assert_eq!(warnings, vec!["the symbol A is undefined"]);
    assert!(gen.grammar.is_token(sym(&gen, "A")));
}

#[test]
fn start_symbol_can_be_declared() {
    let gen = build(
        "%token X\n%start b\n%%\na : b X ;\nb : X ;\n",
        &Options::default(),
    );
    assert_eq!(gen.grammar.name(gen.grammar.goal()), "b");
    // a is unreachable from b
    assert_eq!(gen.parser.nunused, 1);
}

/// `table[base + key]`, if the slot belongs to `key`.
fn lookup(t: &ParserTables, base: i16, key: i16) -> Option<i16> {
    if base == 0 {
        return None;
    }
    let n = base as i32 + key as i32;
    if n < 0 || n as usize >= t.table.len() {
        return None;
    }
    if t.check[n as usize] == key {
        Some(t.table[n as usize])
    } else {
        None
    }
}

/// Decodes every action and goto from the packed tables, and compares them with the
/// unpacked parser.
fn assert_tables_decode(gen: &Generated<String>) {
    let gram = &gen.grammar;
    let t = &gen.tables;

    for state in 0..gen.parser.nstates() {
        let actions = gen.parser.actions_of(State(state as i16));
        let defred = t.defred[state];
        for token in gram.iter_tokens() {
            let value = gram.value(token.to_symbol());
            let active = actions.iter().filter(|a| a.symbol == token && a.is_active());
            let mut shift = None;
            let mut reduce = None;
            for a in active {
                match a.action_code {
                    ActionCode::Shift(to) => shift = Some(to.0),
                    ActionCode::Reduce(rule) => reduce = Some(rule.0 - 2),
                }
            }

            assert_eq!(
                lookup(t, t.sindex[state], value),
                shift,
                "shift in state {} on {}",
                state,
                gram.name(token.to_symbol())
            );
            if defred != 0 {
                // a default reduction is the only action of its state
                assert_eq!(shift, None);
                assert!(reduce.is_none() || reduce == Some(defred));
                assert_eq!(lookup(t, t.rindex[state], value), None);
            } else {
                assert_eq!(
                    lookup(t, t.rindex[state], value),
                    reduce,
                    "reduce in state {} on {}",
                    state,
                    gram.name(token.to_symbol())
                );
            }
        }
    }

    for sym in gram.iter_var_syms().skip(1) {
        let v = gram.value(sym) as usize;
        for g in gen.lalr.gotos.values(gram.symbol_to_var(sym)).iter() {
            let to = match lookup(t, t.gindex[v], g.from_state.0) {
                Some(to) => to,
                None => t.dgoto[v],
            };
            assert_eq!(
                to,
                g.to_state.0,
                "goto from state {} on {}",
                g.from_state.0,
                gram.name(sym)
            );
        }
    }
}

#[test]
fn packed_tables_decode_to_the_parser() {
    let grammars = [
        "
%token NUM
%left '+' '-'
%left '*' '/'
%%
expr : expr '+' expr
     | expr '-' expr
     | expr '*' expr
     | expr '/' expr
     | '(' expr ')'
     | NUM
     ;
",
        NULLABLE,
        DANGLING_ELSE,
        "
%token X
%%
s : a
  | b
  ;
a : X ;
b : X ;
",
        "
%token NUM
%%
list :
     | list stmt
     ;
stmt : NUM ';'
     | error ';'
     ;
",
        "
%token ID
%%
S : L '=' R
  | R
  ;
L : '*' R
  | ID
  ;
R : L
  ;
",
    ];
    for text in grammars.iter() {
        let gen = build(text, &Options::default());
        assert_tables_decode(&gen);
    }
}

#[test]
fn goto_numbers_must_fit_in_i16() {
    // every state after a T token has a goto on e and on each of the n symbols
    let mut text = String::from("%token X\n%%\n");
    for j in 0..182 {
        text.push_str(&format!("s : T{} e ;\n", j));
    }
    for i in 0..182 {
        text.push_str(&format!("e : n{} ;\nn{} : X ;\n", i, i));
    }

    let options = Options::default();
    let read = match read_grammar(&text, &options) {
        Ok(read) => read,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    };
    match generate(read.builder, &options) {
        Ok(_) => panic!("expected too many gotos"),
        Err(e) => assert_eq!(e.error.kind, ErrorKind::TooManyGotos),
    }
}
