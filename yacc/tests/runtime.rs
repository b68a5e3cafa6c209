//! Generates tables from grammar text, then drives `yacc_runtime` with them.

use yacc::reader::read_grammar;
use yacc::{generate, Generated, Options};
use yacc_runtime::{Error, ParserActions, ParserState};

#[static_init::dynamic]
static INIT_LOGGER: () = {
    env_logger::builder().default_format_timestamp(false).init();
};

fn build(text: &str) -> Generated<String> {
    let options = Options::default();
    let read = match read_grammar(text, &options) {
        Ok(read) => read,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    };
    match generate(read.builder, &options) {
        Ok(generated) => generated,
        Err(e) => panic!("{}", e.render("yacc", "test.y")),
    }
}

fn token_value(gen: &Generated<String>, name: &str) -> i16 {
    match gen.grammar.name.iter().position(|n| n == name) {
        Some(i) => gen.grammar.value[i],
        None => panic!("no token named {}", name),
    }
}

fn parse<A: ParserActions<i64>>(
    gen: &Generated<String>,
    actions: &mut A,
    tokens: &[(i16, i64)],
) -> Result<i64, Error> {
    gen.tables.with_runtime_tables(|tables| {
        let mut parser = ParserState::new(*tables);
        for &(token, value) in tokens.iter() {
            parser.push_token(actions, token, value)?;
        }
        parser.finish(actions)
    })
}

const CALC: &str = "
%token NUM
%left '+' '-'
%left '*' '/'
%%
expr : expr '+' expr { $$ = $1 + $3; }
     | expr '-' expr { $$ = $1 - $3; }
     | expr '*' expr { $$ = $1 * $3; }
     | expr '/' expr { $$ = $1 / $3; }
     | '(' expr ')'  { $$ = $2; }
     | NUM
     ;
";

struct Calc;

impl ParserActions<i64> for Calc {
    fn reduce(&mut self, rule: usize, values: &mut [i64]) -> Result<i64, Error> {
        Ok(match rule {
            1 => values[0] + values[2],
            2 => values[0] - values[2],
            3 => values[0] * values[2],
            4 => {
                if values[2] == 0 {
                    return Err(Error::AppError);
                }
                values[0] / values[2]
            }
            5 => values[1],
            _ => values[0],
        })
    }
}

/// One token per character; digits are `NUM`.
fn lex(input: &str, num: i16) -> Vec<(i16, i64)> {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c.to_digit(10) {
            Some(d) => (num, d as i64),
            None => (c as i16, 0),
        })
        .collect()
}

#[test]
fn calculator() {
    let gen = build(CALC);
    assert_eq!(gen.actions()[1].as_deref(), Some("$$ = $1 + $3;"));
    assert_eq!(gen.actions()[6], None);

    let num = token_value(&gen, "NUM");
    let eval = |input: &str| parse(&gen, &mut Calc, &lex(input, num));
    assert_eq!(eval("7"), Ok(7));
    assert_eq!(eval("2 + 3 * 4"), Ok(14));
    assert_eq!(eval("(2 + 3) * 4"), Ok(20));
    assert_eq!(eval("8 - 3 - 2"), Ok(3));
    assert_eq!(eval("8 / 2 / 2"), Ok(2));
    assert_eq!(eval("2 * 3 + 4 * 5"), Ok(26));
}

#[test]
fn calculator_errors() {
    let gen = build(CALC);
    let num = token_value(&gen, "NUM");
    let eval = |input: &str| parse(&gen, &mut Calc, &lex(input, num));
    assert_eq!(eval("1 / 0"), Err(Error::AppError));
    assert_eq!(eval("1 +"), Err(Error::SyntaxError));
    assert_eq!(eval("1 2"), Err(Error::SyntaxError));
    assert_eq!(eval(""), Err(Error::SyntaxError));
    assert_eq!(eval("(1"), Err(Error::SyntaxError));
}

const STATEMENTS: &str = "
%token NUM
%%
list :
     | list stmt   { $$ = $1 + $2; }
     ;
stmt : NUM ';'     { $$ = 1; }
     | error ';'   { $$ = 0; }
     ;
";

/// Counts the statements that parsed, and records the syntax errors.
struct Statements {
    recover: bool,
    errors: Vec<String>,
}

impl ParserActions<i64> for Statements {
    fn reduce(&mut self, rule: usize, values: &mut [i64]) -> Result<i64, Error> {
        Ok(match rule {
            2 => values[0] + values[1],
            3 => 1,
            _ => 0,
        })
    }

    fn syntax_error(&mut self, token_name: &str, expected: &[&str]) -> Result<(), Error> {
        self.errors
            .push(format!("{}, expecting {}", token_name, expected.join(" ")));
        if self.recover {
            Ok(())
        } else {
            Err(Error::SyntaxError)
        }
    }
}

#[test]
fn error_token_recovers() {
    let gen = build(STATEMENTS);
    let num = token_value(&gen, "NUM");
    let semi = ';' as i16;
    let tokens = [
        (num, 0),
        (semi, 0),
        (num, 0),
        (num, 0),
        (semi, 0),
        (num, 0),
        (semi, 0),
    ];

    let mut actions = Statements {
        recover: true,
        errors: Vec::new(),
    };
    assert_eq!(parse(&gen, &mut actions, &tokens), Ok(2));
    assert_eq!(actions.errors, vec!["NUM, expecting ';'".to_string()]);

    let mut actions = Statements {
        recover: false,
        errors: Vec::new(),
    };
    assert_eq!(parse(&gen, &mut actions, &tokens), Err(Error::SyntaxError));
    assert_eq!(actions.errors.len(), 1);
}

#[test]
fn empty_input_is_an_empty_list() {
    let gen = build(STATEMENTS);
    let mut actions = Statements {
        recover: true,
        errors: Vec::new(),
    };
    assert_eq!(parse(&gen, &mut actions, &[]), Ok(0));
    assert!(actions.errors.is_empty());
}

/// Records the rules in the order they are reduced.
struct Trace(Vec<usize>);

impl ParserActions<i64> for Trace {
    fn reduce(&mut self, rule: usize, _values: &mut [i64]) -> Result<i64, Error> {
        self.0.push(rule);
        Ok(0)
    }
}

#[test]
fn else_binds_to_the_nearest_if() {
    let gen = build(
        "
%token IF THEN ELSE X
%%
stmt : IF X THEN stmt
     | IF X THEN stmt ELSE stmt
     | X
     ;
",
    );
    let (i, t, e, x) = (
        token_value(&gen, "IF"),
        token_value(&gen, "THEN"),
        token_value(&gen, "ELSE"),
        token_value(&gen, "X"),
    );
    let tokens: Vec<(i16, i64)> = [i, x, t, i, x, t, x, e, x]
        .iter()
        .map(|&tok| (tok, 0))
        .collect();
    let mut trace = Trace(Vec::new());
    assert_eq!(parse(&gen, &mut trace, &tokens), Ok(0));
    assert_eq!(trace.0, vec![3, 3, 2, 1]);
}

#[test]
fn nullable_recursion() {
    let gen = build(
        "
%%
S : A ;
A : 'a' A { $$ = $2 + 1; }
  |       { $$ = 0; }
  ;
",
    );

    struct Count;
    impl ParserActions<i64> for Count {
        fn reduce(&mut self, rule: usize, values: &mut [i64]) -> Result<i64, Error> {
            Ok(match rule {
                2 => values[1] + 1,
                3 => 0,
                _ => values[0],
            })
        }
    }

    let a = 'a' as i16;
    assert_eq!(parse(&gen, &mut Count, &[(a, 0), (a, 0), (a, 0)]), Ok(3));
    assert_eq!(parse(&gen, &mut Count, &[]), Ok(0));
}

#[test]
fn mid_rule_actions_see_the_values_before_them() {
    let gen = build(
        "
%token A B
%%
s : A { $$ = $1 * 10; } B { $$ = $2 + $3; }
  ;
",
    );
    // $$1 : (empty), then s : A $$1 B
    assert_eq!(gen.actions()[1].as_deref(), Some("$$ = $1 * 10;"));
    assert_eq!(gen.actions()[2].as_deref(), Some("$$ = $2 + $3;"));
    assert_eq!(gen.tables.len[1], 0);
    assert_eq!(gen.tables.action_offset[1], 1);
    assert_eq!(gen.tables.action_offset[2], 3);

    struct Mid;
    impl ParserActions<i64> for Mid {
        fn reduce(&mut self, rule: usize, values: &mut [i64]) -> Result<i64, Error> {
            match rule {
                1 => {
                    assert_eq!(values.len(), 1);
                    Ok(values[0] * 10)
                }
                2 => {
                    assert_eq!(values.len(), 3);
                    Ok(values[1] + values[2])
                }
                _ => Ok(values[0]),
            }
        }
    }

    let (a, b) = (token_value(&gen, "A"), token_value(&gen, "B"));
    assert_eq!(parse(&gen, &mut Mid, &[(a, 4), (b, 2)]), Ok(42));
}
