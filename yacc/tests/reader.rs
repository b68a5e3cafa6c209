//! Reading grammars: declarations, `$` references, and the diagnostics they produce.

use yacc::errors::Location;
use yacc::reader::{read_grammar, ReadGrammar};
use yacc::{generate, ErrorKind, GenerateError, Generated, Options, Symbol};

#[static_init::dynamic]
static INIT_LOGGER: () = {
    env_logger::builder().default_format_timestamp(false).init();
};

fn read(text: &str) -> ReadGrammar {
    match read_grammar(text, &Options::default()) {
        Ok(read) => read,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    }
}

fn read_err(text: &str) -> GenerateError {
    match read_grammar(text, &Options::default()) {
        Ok(_) => panic!("expected an error reading {:?}", text),
        Err(e) => e,
    }
}

fn build(text: &str) -> Generated<String> {
    match generate(read(text).builder, &Options::default()) {
        Ok(gen) => gen,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    }
}

fn warnings(read: &ReadGrammar) -> Vec<String> {
    read.builder
        .diagnostics()
        .warnings()
        .map(|w| w.to_string())
        .collect()
}

fn value(gen: &Generated<String>, name: &str) -> i16 {
    match gen.grammar.name.iter().position(|n| n == name) {
        Some(i) => gen.grammar.value(Symbol(i as i16)),
        None => panic!("no symbol named {}", name),
    }
}

#[test]
fn token_numbers() {
    let gen = build("%token A 300 B\n%token C\n%%\ns : A B C '+' ;\n");
    assert_eq!(value(&gen, "A"), 300);
    assert_eq!(value(&gen, "B"), 257);
    assert_eq!(value(&gen, "C"), 258);
    assert_eq!(value(&gen, "'+'"), 43);
    assert_eq!(value(&gen, "error"), 256);
}

#[test]
fn equals_form_of_action() {
    let gen = build("%token A\n%%\ns : A = $$ = $1;\n  ;\n");
    assert_eq!(gen.actions()[1].as_deref(), Some("$$ = $1"));
}

#[test]
fn dollar_beyond_rule() {
    let r = read("%token A\n%%\ns : A { $2 } ;\n");
    assert_eq!(
        warnings(&r),
        vec!["$2 references beyond the end of the current rule"]
    );
    assert_eq!(
        r.builder.diagnostics().render("yacc", "g.y"),
        "yacc: w - line 3 of \"g.y\", $2 references beyond the end of the current rule\n"
    );
}

#[test]
fn untyped_references() {
    let r = read("%token <i32> A\n%token B\n%type <i32> s\n%%\ns : A B { $$ = $1 + $2; } ;\n");
    assert_eq!(warnings(&r), vec!["$2 (B) is untyped"]);

    let r = read("%token <i32> A\n%%\ns : A { $$ = $1; } ;\n");
    assert_eq!(warnings(&r), vec!["$$ is untyped"]);

    // an explicit tag needs no declared type
    let r = read("%token <i32> A\n%%\ns : A { $<i32>$ = $<i32>1; } ;\n");
    assert!(warnings(&r).is_empty());
}

#[test]
fn references_outside_a_typed_rule_are_errors() {
    let e = read_err("%token <i32> A\n%type <i32> s\n%%\ns : A { $$ = $2; } ;\n");
    assert_eq!(e.error.kind, ErrorKind::UnknownRhs(2));
    assert_eq!(e.error.to_string(), "$2 is untyped");

    let e = read_err("%token <i32> A\n%type <i32> s\n%%\ns : A { $$ = $-1; } ;\n");
    assert_eq!(e.error.kind, ErrorKind::UnknownRhs(-1));

    // without tags, $-1 reaches into the enclosing rule, and is allowed
    let r = read("%token A\n%%\ns : A { x = $-1; } ;\n");
    assert!(warnings(&r).is_empty());
}

#[test]
fn illegal_dollar() {
    let e = read_err("%%\ns : A { $<i32>x } ;\n");
    assert_eq!(e.error.kind, ErrorKind::IllegalDollar);
    assert_eq!(
        e.error.location,
        Some(Location::at(2, "s : A { $<i32>x } ;", 8))
    );
    assert_eq!(
        e.render("yacc", "g.y"),
        "yacc: e - line 2 of \"g.y\", illegal $-name\ns : A { $<i32>x } ;\n        ^\n"
    );
}

#[test]
fn default_action_on_a_typed_empty_rule() {
    let r = read("%token <i32> A\n%type <i32> s\n%%\ns : A\n  |\n  ;\n");
    assert_eq!(
        warnings(&r),
        vec!["the default action assigns an undefined value to $$"]
    );
}

#[test]
fn redeclarations_are_reported_and_ignored() {
    let r = read(
        "%token <i32> A 300\n%type <u8> A\n%token A 301\n%left A\n%right A\n%start s\n%start t\n%%\ns : A ;\nt : s ;\n",
    );
    assert_eq!(
        warnings(&r),
        vec![
            "the type of A has been redeclared",
            "the value of A has been redeclared",
            "the precedence of A has been redeclared",
            "the start symbol has been redeclared",
        ]
    );
    let gen = match generate(r.builder, &Options::default()) {
        Ok(gen) => gen,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    };
    assert_eq!(value(&gen, "A"), 300);
    assert_eq!(gen.grammar.name(gen.grammar.goal()), "t");
    assert_eq!(gen.diagnostics.warnings().count(), 4);
}

#[test]
fn conflicting_prec() {
    let r = read("%left '+'\n%left '*'\n%%\ne : e '+' e %prec '*' %prec '+'\n  | 'x'\n  ;\n");
    assert_eq!(warnings(&r), vec!["conflicting %prec specifiers"]);
}

#[test]
fn misplaced_symbols() {
    let e = read_err("%start s\n%token s\n%%\ns : 'x' ;\n");
    assert_eq!(e.error.kind, ErrorKind::TokenizedStart("s".into()));

    let e = read_err("%token A\n%%\ns : A ;\nA : s ;\n");
    assert_eq!(e.error.kind, ErrorKind::TerminalLhs);

    let e = read_err("%token A\n%%\nA : 'x' ;\n");
    assert_eq!(e.error.kind, ErrorKind::TerminalStart("A".into()));

    let e = read_err("%token A\n%%\n");
    assert_eq!(e.error.kind, ErrorKind::NoGrammar);

    let e = read_err("%token A\n%%\ns : A | $$1 ;\n");
    assert_eq!(e.error.kind, ErrorKind::UsedReserved("$$1".into()));
}

#[test]
fn comments_and_separators() {
    let r = read(
        "// line comment\n%token A, B; /* block\ncomment */\n%%\ns : A // trailing\n  | B\n  ;\n",
    );
    assert_eq!(r.builder.nrules(), 5);
    assert!(warnings(&r).is_empty());
}

#[test]
fn lifetimes_in_actions() {
    let r = read("%token A\n%%\ns : A { let s: &'static str = \"a}b\"; let c = '}'; }\n  ;\n");
    let gen = match generate(r.builder, &Options::default()) {
        Ok(gen) => gen,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    };
    assert_eq!(
        gen.actions()[1].as_deref(),
        Some("let s: &'static str = \"a}b\"; let c = '}';")
    );
}
