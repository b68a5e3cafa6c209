//! Emits the packed tables, and the semantic actions, as Rust source.
//!
//! The generated items are plain `static` arrays and constants, together with a
//! `tables()` function that bundles them as a `yacc_runtime::ParserTables`.
//!
//! For grammars read from yacc source, [`output_parser_module`] also emits the actions.
//! Each action becomes one arm of a `reduce` function, with `$$` rewritten to the value
//! being built and `$n` to the n-th value the action can see.  The values have the type
//! `YYSTYPE`, which the prolog declares; the module imports everything from its parent.

use crate::errors::{ErrorKind, YaccError};
use crate::grammar::Grammar;
use crate::packing::ParserTables;
use crate::{Rule, Symbol};
use log::{debug, trace};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Ident, LitStr};

/// Names that the generated module uses for its own items and locals.  A token constant
/// with one of these names would collide with them.
const GENERATED_NAMES: &[&str] = &[
    "YYLHS",
    "YYLEN",
    "YYDEFRED",
    "YYDGOTO",
    "YYSINDEX",
    "YYRINDEX",
    "YYGINDEX",
    "YYTABLE",
    "YYCHECK",
    "YYOFFSET",
    "YYNAME",
    "YYRULES",
    "YYFINAL",
    "YYERRCODE",
    "YYSTYPE",
    "tables",
    "reduce",
    "new_parser",
    "Actions",
    "rule",
    "values",
    "yyval",
];

/// Generates the table items, unwrapped.
pub fn output_tables<A>(
    gram: &Grammar<A>,
    tables: &ParserTables,
) -> Result<TokenStream, YaccError> {
    let sp = Span::call_site();
    let mut items = TokenStream::new();

    items.extend(make_table_i16(Ident::new("YYLHS", sp), &tables.lhs));
    items.extend(make_table_i16(Ident::new("YYLEN", sp), &tables.len));
    items.extend(make_table_i16(Ident::new("YYDEFRED", sp), &tables.defred));
    items.extend(make_table_i16(Ident::new("YYDGOTO", sp), &tables.dgoto));
    items.extend(make_table_i16(Ident::new("YYSINDEX", sp), &tables.sindex));
    items.extend(make_table_i16(Ident::new("YYRINDEX", sp), &tables.rindex));
    items.extend(make_table_i16(Ident::new("YYGINDEX", sp), &tables.gindex));
    items.extend(make_table_i16(Ident::new("YYTABLE", sp), &tables.table));
    items.extend(make_table_i16(Ident::new("YYCHECK", sp), &tables.check));
    items.extend(make_table_i16(Ident::new("YYOFFSET", sp), &tables.action_offset));
    items.extend(make_names_table(Ident::new("YYNAME", sp), &tables.names));
    items.extend(make_table_string(Ident::new("YYRULES", sp), &tables.rules));

    let yyfinal = tables.final_state;
    let yyerrcode = tables.error_token;
    items.extend(quote! {
        pub const YYFINAL: i16 = #yyfinal;
        pub const YYERRCODE: i16 = #yyerrcode;
    });

    items.extend(output_token_consts(gram)?);

    items.extend(quote! {
        pub fn tables() -> yacc_runtime::ParserTables<'static> {
            yacc_runtime::ParserTables {
                yyfinal: YYFINAL,
                yyerrcode: YYERRCODE,
                yylhs: &YYLHS,
                yylen: &YYLEN,
                yydefred: &YYDEFRED,
                yydgoto: &YYDGOTO,
                yysindex: &YYSINDEX,
                yyrindex: &YYRINDEX,
                yygindex: &YYGINDEX,
                yytable: &YYTABLE,
                yycheck: &YYCHECK,
                yyoffset: &YYOFFSET,
                yyname: &YYNAME,
                yyrule: &YYRULES,
            }
        }
    });

    Ok(items)
}

/// Generates the tables inside `pub mod <name> { ... }`.
pub fn output_tables_module<A>(
    gram: &Grammar<A>,
    tables: &ParserTables,
    name: &str,
) -> Result<TokenStream, YaccError> {
    let name = Ident::new(name, Span::call_site());
    let items = output_tables(gram, tables)?;
    Ok(quote! {
        #[allow(dead_code)]
        pub mod #name {
            #items
        }
    })
}

/// Generates the tables and the actions inside `pub mod <name> { ... }`.
pub fn output_parser_module(
    gram: &Grammar<String>,
    tables: &ParserTables,
    name: &str,
) -> Result<TokenStream, YaccError> {
    let name = Ident::new(name, Span::call_site());
    let items = output_tables(gram, tables)?;
    let actions = output_actions(gram)?;
    Ok(quote! {
        #[allow(dead_code, non_camel_case_types, unused_imports)]
        pub mod #name {
            use super::*;

            #items
            #actions
        }
    })
}

/// Generates `reduce`, which runs the action of a rule, and the `Actions` and
/// `new_parser` items that connect it to the runtime.
pub fn output_actions(gram: &Grammar<String>) -> Result<TokenStream, YaccError> {
    let mut arms = TokenStream::new();
    for r in Rule::FIRST_USER.index()..gram.nrules {
        let action = match &gram.actions[r] {
            Some(action) => action,
            None => continue,
        };
        let external = r - Rule::ACCEPT.index();
        let visible = gram.action_offset[r] as usize;
        let text = rewrite_action(action, visible)
            .map_err(|n| YaccError::new(ErrorKind::ValueOutOfReach(external, n)))?;
        trace!("action of rule {}: {}", external, text);
        let body: TokenStream = text
            .parse()
            .map_err(|e| YaccError::new(ErrorKind::ActionSyntax(external, format!("{:?}", e))))?;
        arms.extend(quote! {
            #external => { #body }
        });
    }

    Ok(quote! {
        #[allow(unused_mut, unused_assignments, unused_variables, unreachable_code)]
        pub fn reduce(
            rule: usize,
            values: &mut [YYSTYPE],
        ) -> Result<YYSTYPE, yacc_runtime::Error> {
            let mut yyval = <YYSTYPE as Default>::default();
            match rule {
                #arms
                _ => yyval = values.first_mut().map(core::mem::take).unwrap_or_default(),
            }
            Ok(yyval)
        }

        pub struct Actions;

        impl yacc_runtime::ParserActions<YYSTYPE> for Actions {
            fn reduce(
                &mut self,
                rule: usize,
                values: &mut [YYSTYPE],
            ) -> Result<YYSTYPE, yacc_runtime::Error> {
                reduce(rule, values)
            }
        }

        pub fn new_parser() -> yacc_runtime::ParserState<'static, YYSTYPE> {
            yacc_runtime::ParserState::new(tables())
        }
    })
}

/// Rewrites the `$` references of an action.  `$$` becomes `yyval` and `$n` becomes
/// `values[n - 1]`; a `<tag>` after the `$` is dropped.  Strings, characters and comments
/// are copied unchanged.  Fails with the number of a reference outside `1..=visible`.
fn rewrite_action(text: &str, visible: usize) -> Result<String, i32> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => i = copy_literal(&chars, i, &mut out),
            '\'' if chars.get(i + 1) == Some(&'\\') || chars.get(i + 2) == Some(&'\'') => {
                i = copy_literal(&chars, i, &mut out)
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = (i + 3..chars.len())
                    .find(|&j| chars[j - 1] == '*' && chars[j] == '/')
                    .map_or(chars.len(), |j| j + 1);
                out.extend(&chars[i..end]);
                i = end;
            }
            '$' => i = rewrite_dollar(&chars, i, visible, &mut out)?,
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Copies a string or character literal that starts at `start`, and returns the position
/// after it.
fn copy_literal(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == '\\' {
            if let Some(&escaped) = chars.get(i) {
                out.push(escaped);
                i += 1;
            }
        } else if c == quote {
            break;
        }
    }
    i
}

fn rewrite_dollar(
    chars: &[char],
    start: usize,
    visible: usize,
    out: &mut String,
) -> Result<usize, i32> {
    let mut i = start + 1;
    if chars.get(i) == Some(&'<') {
        let mut depth = 0;
        while i < chars.len() {
            match chars[i] {
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    let is_digit = |i: usize| chars.get(i).map_or(false, |c| c.is_ascii_digit());
    match chars.get(i) {
        Some(&'$') => {
            out.push_str("yyval");
            Ok(i + 1)
        }
        Some(&c) if c.is_ascii_digit() || (c == '-' && is_digit(i + 1)) => {
            let negative = c == '-';
            if negative {
                i += 1;
            }
            let mut n: i32 = 0;
            while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                n = n.saturating_mul(10).saturating_add(d as i32);
                i += 1;
            }
            if negative {
                n = -n;
            }
            if n < 1 || n as usize > visible {
                return Err(n);
            }
            out.push_str(&format!("values[{}]", n - 1));
            Ok(i)
        }
        _ => {
            // not a reference
            out.extend(&chars[start..i]);
            Ok(i)
        }
    }
}

/// One `const` per declared token whose name is a Rust identifier.  `$end` and `error`
/// are skipped.  Literals such as `'+'` have no constant; the lexer uses their character
/// code.
fn output_token_consts<A>(gram: &Grammar<A>) -> Result<TokenStream, YaccError> {
    let mut items = TokenStream::new();
    for t in gram.iter_tokens().skip(2) {
        let sym: Symbol = t.to_symbol();
        let name = gram.name(sym);
        match syn::parse_str::<Ident>(name) {
            Ok(ident) => {
                if GENERATED_NAMES.contains(&name) {
                    return Err(YaccError::new(ErrorKind::ReservedTokenName(name.to_string())));
                }
                let value = gram.value(sym);
                items.extend(quote!(pub const #ident: i16 = #value;));
            }
            Err(_) => debug!("no constant for token {}", name),
        }
    }
    Ok(items)
}

fn make_table_i16(name: Ident, values: &[i16]) -> TokenStream {
    let values_len = values.len();
    quote! {
        static #name: [i16; #values_len] = [
            #(
                #values
            ),*
        ];
    }
}

fn make_table_string(name: Ident, strings: &[String]) -> TokenStream {
    let strings_len = strings.len();
    let strings: Vec<LitStr> = strings
        .iter()
        .map(|s| LitStr::new(s, name.span()))
        .collect();
    quote! {
        static #name: [&str; #strings_len] = [
            #( #strings ),*
        ];
    }
}

fn make_names_table(name: Ident, names: &[Option<String>]) -> TokenStream {
    let names_len = names.len();
    let entries: Vec<TokenStream> = names
        .iter()
        .map(|n| match n {
            Some(s) => {
                let lit = LitStr::new(s, name.span());
                quote!(Some(#lit))
            }
            None => quote!(None),
        })
        .collect();
    quote! {
        static #name: [Option<&str>; #names_len] = [
            #( #entries ),*
        ];
    }
}
