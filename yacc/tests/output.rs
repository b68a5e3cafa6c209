//! The emitted Rust tables, and the verbose report.

use yacc::output::{output_parser_module, output_tables_module};
use yacc::reader::read_grammar;
use yacc::{generate, ErrorKind, Generated, Options};

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

const CALC: &str = "
%token NUM
%left '+'
%left '*'
%%
expr : expr '+' expr
     | expr '*' expr
     | '(' expr ')'
     | NUM
     ;
";

fn module_items<'a>(file: &'a syn::File, name: &str) -> &'a [syn::Item] {
    assert_eq!(file.items.len(), 1);
    let module = match &file.items[0] {
        syn::Item::Mod(m) => m,
        other => panic!("expected a module, got {:?}", other),
    };
    assert_eq!(module.ident, name);
    &module.content.as_ref().unwrap().1
}

fn find_fn<'a>(items: &'a [syn::Item], name: &str) -> &'a syn::ItemFn {
    for item in items.iter() {
        if let syn::Item::Fn(f) = item {
            if f.sig.ident == name {
                return f;
            }
        }
    }
    panic!("no fn named {}", name);
}

fn find_const<'a>(items: &'a [syn::Item], name: &str) -> &'a syn::ItemConst {
    for item in items.iter() {
        if let syn::Item::Const(c) = item {
            if c.ident == name {
                return c;
            }
        }
    }
    panic!("no const named {}", name);
}

fn const_value(c: &syn::ItemConst) -> i16 {
    match &*c.expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(i),
            ..
        }) => i.base10_parse().unwrap(),
        other => panic!("unexpected const expression {:?}", other),
    }
}

#[test]
fn tables_module_is_valid_rust() {
    let gen = build(CALC, &Options::default());
    let text = output_tables_module(&gen.grammar, &gen.tables, "yy")
        .unwrap()
        .to_string();
    let file: syn::File = syn::parse_str(&text).unwrap();
    let items = module_items(&file, "yy");

    let statics: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Static(s) => Some(s.ident.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(
        statics,
        vec![
            "YYLHS", "YYLEN", "YYDEFRED", "YYDGOTO", "YYSINDEX", "YYRINDEX", "YYGINDEX",
            "YYTABLE", "YYCHECK", "YYOFFSET", "YYNAME", "YYRULES",
        ]
    );

    assert_eq!(
        const_value(find_const(items, "YYFINAL")),
        gen.tables.final_state
    );
    assert_eq!(const_value(find_const(items, "YYERRCODE")), 256);
    assert_eq!(const_value(find_const(items, "NUM")), 257);

    // literal tokens have no constant
    let consts = items
        .iter()
        .filter(|item| matches!(item, syn::Item::Const(_)))
        .count();
    assert_eq!(consts, 3);

    assert!(items.iter().any(|item| match item {
        syn::Item::Fn(f) => f.sig.ident == "tables",
        _ => false,
    }));
}

const CALC_ACTIONS: &str = "
%{
pub type YYSTYPE = i64;
%}
%token NUM
%left '+'
%%
expr : expr '+' expr { $$ = $1 + $3; }
     | '(' expr ')'  { $$ = $2; }
     | NUM
     ;
";

fn arm_rule(arm: &syn::Arm) -> u64 {
    match &arm.pat {
        syn::Pat::Lit(syn::PatLit { expr, .. }) => match &**expr {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Int(i),
                ..
            }) => i.base10_parse().unwrap(),
            other => panic!("unexpected pattern {:?}", other),
        },
        other => panic!("unexpected pattern {:?}", other),
    }
}

fn arm_block(arm: &syn::Arm) -> &syn::Block {
    match &*arm.body {
        syn::Expr::Block(b) => &b.block,
        other => panic!("unexpected arm body {:?}", other),
    }
}

#[test]
fn actions_become_reduce_arms() {
    let gen = build(CALC_ACTIONS, &Options::default());
    let text = output_parser_module(&gen.grammar, &gen.tables, "yy")
        .unwrap()
        .to_string();
    let file: syn::File = syn::parse_str(&text).unwrap();
    let items = module_items(&file, "yy");

    // the actions see the items of the enclosing file, such as YYSTYPE
    assert!(matches!(items[0], syn::Item::Use(_)));
    assert!(items.iter().any(|item| match item {
        syn::Item::Struct(s) => s.ident == "Actions",
        _ => false,
    }));
    assert!(items.iter().any(|item| matches!(item, syn::Item::Impl(_))));
    find_fn(items, "tables");
    find_fn(items, "new_parser");

    let reduce = find_fn(items, "reduce");
    let arms = reduce
        .block
        .stmts
        .iter()
        .find_map(|stmt| match stmt {
            syn::Stmt::Expr(syn::Expr::Match(m)) | syn::Stmt::Semi(syn::Expr::Match(m), _) => {
                Some(&m.arms)
            }
            _ => None,
        })
        .unwrap();

    // rule 3 (expr : NUM) has no action, and takes the default arm
    assert_eq!(arms.len(), 3);
    assert_eq!(arm_rule(&arms[0]), 1);
    assert_eq!(arm_rule(&arms[1]), 2);
    assert!(matches!(arms[2].pat, syn::Pat::Wild(_)));

    let expected: syn::Block = syn::parse_str("{ yyval = values[0] + values[2]; }").unwrap();
    assert_eq!(*arm_block(&arms[0]), expected);
    let expected: syn::Block = syn::parse_str("{ yyval = values[1]; }").unwrap();
    assert_eq!(*arm_block(&arms[1]), expected);
}

#[test]
fn actions_only_reach_their_own_values() {
    // a mid-rule action sees only the values before it
    let gen = build("%token A B\n%%\ns : A { $$ = $2; } B ;\n", &Options::default());
    let e = output_parser_module(&gen.grammar, &gen.tables, "yy").unwrap_err();
    assert_eq!(e.kind, ErrorKind::ValueOutOfReach(1, 2));
    assert_eq!(
        e.to_string(),
        "$2 in the action of rule 1 is not one of the values the action can see"
    );

    let gen = build("%token A\n%%\ns : A { $$ = $-1; } ;\n", &Options::default());
    let e = output_parser_module(&gen.grammar, &gen.tables, "yy").unwrap_err();
    assert_eq!(e.kind, ErrorKind::ValueOutOfReach(1, -1));
}

#[test]
fn token_names_must_not_collide_with_generated_items() {
    for name in ["YYFINAL", "tables", "Actions"].iter() {
        let text = format!("%token {}\n%%\ns : {} ;\n", name, name);
        let gen = build(&text, &Options::default());
        let e = output_tables_module(&gen.grammar, &gen.tables, "yy").unwrap_err();
        assert_eq!(e.kind, ErrorKind::ReservedTokenName(name.to_string()));
    }
}

#[test]
fn names_and_rules() {
    let gen = build(CALC, &Options::default());
    let t = &gen.tables;
    assert_eq!(t.names.len(), 258);
    assert_eq!(t.names[0].as_deref(), Some("end-of-file"));
    assert_eq!(t.names['+' as usize].as_deref(), Some("'+'"));
    assert_eq!(t.names[257].as_deref(), Some("NUM"));
    assert_eq!(t.names[256], None);
    assert_eq!(t.rules[0], "$accept: expr $end");
    assert_eq!(t.rules[3], "expr: '(' expr ')'");
    assert_eq!(t.lhs, vec![-1, 0, 0, 0, 0]);
    assert_eq!(t.len, vec![2, 3, 3, 3, 1]);

    gen.tables.with_runtime_tables(|rt| {
        assert_eq!(rt.token_name(257), "NUM");
        assert_eq!(rt.token_name(1000), "[illegal]");
        assert_eq!(rt.token_name(1), "[unknown]");
        let mut expected = rt.expecting(0);
        expected.sort_unstable();
        assert_eq!(expected, vec!["'('", "NUM"]);
    });
}

const NULLABLE: &str = "
%%
S : A ;
A : 'a' A
  |
  ;
";

#[test]
fn verbose_report() {
    let options = Options {
        verbose: true,
        ..Options::default()
    };
    let gen = build(NULLABLE, &options);
    let report = gen.report.unwrap();

    assert!(report.starts_with(
        "   0  $accept : S $end\n\n   1  S : A\n\n   2  A : 'a' A\n   3    |\n\x0c\n"
    ));
    assert!(report.contains(
        "state 0\n\t$accept : . S $end  (0)\n\tA : .  (3)\n\n\t'a'  shift 1\n\t$end  reduce 3\n\n\tS  goto 2\n\tA  goto 3\n"
    ), "{}", report);
    assert!(report.contains("state 2\n\t$accept : S . $end  (0)\n\n\t$end  accept\n"));
    assert!(report.contains("state 3\n\tS : A .  (1)\n\n\t.  reduce 1\n"));
    assert!(report.ends_with("\n\n3 terminals, 3 nonterminals\n4 grammar rules, 5 states\n"));
}
