//! Contains the supporting logic needed for applications that use parsers generated by the
//! `yacc` crate: the table layout, and a push-model interpreter for it.
//!
//! The interpreter is driven by the application's lexer.  Each token is handed to
//! [`ParserState::push_token`]; when the input is exhausted, [`ParserState::finish`] pushes the
//! end marker and returns the value of the start symbol.  Reductions are delegated to a
//! [`ParserActions`] implementation, which receives the rule number and the values that the
//! rule's action can see.

use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("syntax error")]
    SyntaxError,
    #[error("irrecoverable syntax error")]
    IrrecoverableSyntaxError,
    /// Returned by an action to stop the parse.
    #[error("the application rejected the input")]
    AppError,
    /// The end marker was passed to `push_token`; only `finish` pushes it.
    #[error("the end marker can only be pushed by finish")]
    UnexpectedEndMarker,
}

#[cfg(feature = "yacc_log")]
#[macro_export]
macro_rules! yacc_log {
    (
        $($t:tt)*
    ) => {
        ::log::debug!( $($t)* )
    }
}

#[cfg(not(feature = "yacc_log"))]
#[macro_export]
macro_rules! yacc_log {
    (
        $($t:tt)*
    ) => {
        // nothing
    };
}

/// The packed tables of one parser.  Rule numbers are external: rule 0 is the accept rule,
/// and the first rule of the grammar is rule 1.
#[derive(Clone, Copy, Debug)]
pub struct ParserTables<'a> {
    pub yyfinal: i16,
    /// The value of the `error` token.
    pub yyerrcode: i16,
    pub yylhs: &'a [i16],
    pub yylen: &'a [i16],
    pub yydefred: &'a [i16],
    pub yydgoto: &'a [i16],
    pub yysindex: &'a [i16],
    pub yyrindex: &'a [i16],
    pub yygindex: &'a [i16],
    pub yytable: &'a [i16],
    pub yycheck: &'a [i16],
    /// The number of stack values visible to the action of each rule.
    pub yyoffset: &'a [i16],
    /// Token names, indexed by token value.
    pub yyname: &'a [Option<&'a str>],
    /// Rule text, for debugging.
    pub yyrule: &'a [&'a str],
}

impl<'a> ParserTables<'a> {
    /// Looks up `table[base[..] + key]`, if the slot belongs to `key`.
    fn lookup(&self, base: i16, key: i16) -> Option<i16> {
        if base == 0 {
            return None;
        }
        let n = base as i32 + key as i32;
        if n < 0 || n as usize >= self.yytable.len() {
            return None;
        }
        let n = n as usize;
        if self.yycheck[n] == key {
            Some(self.yytable[n])
        } else {
            None
        }
    }

    pub fn shift_on(&self, state: i16, token: i16) -> Option<i16> {
        self.lookup(self.yysindex[state as usize], token)
    }

    pub fn reduce_on(&self, state: i16, token: i16) -> Option<i16> {
        self.lookup(self.yyrindex[state as usize], token)
    }

    /// The name of a token value, or `[illegal]` / `[unknown]`.
    pub fn token_name(&self, token: i16) -> &'a str {
        if token < 0 || token as usize >= self.yyname.len() {
            return "[illegal]";
        }
        self.yyname[token as usize].unwrap_or("[unknown]")
    }

    /// The names of the tokens that have an explicit shift or reduce action in `state`.
    /// Tokens that only reach a default reduction are not listed.
    pub fn expecting(&self, state: i16) -> Vec<&'a str> {
        let mut ok = vec![false; self.yyname.len()];
        for &base in &[self.yysindex[state as usize], self.yyrindex[state as usize]] {
            if base == 0 {
                continue;
            }
            for token in 0..self.yyname.len() {
                if self.yyname[token].is_some() && self.lookup(base, token as i16).is_some() {
                    ok[token] = true;
                }
            }
        }
        ok.iter()
            .enumerate()
            .filter(|(_, &ok)| ok)
            .filter_map(|(token, _)| self.yyname[token])
            .collect()
    }
}

/// The application side of a parser.
pub trait ParserActions<V> {
    /// Executes the action of `rule`.  `values` holds the values that the action can see:
    /// for an ordinary rule, one per rhs symbol; for an action in the middle of a rule, the
    /// values of the symbols before it.  Returns the value of the rule's lhs.
    fn reduce(&mut self, rule: usize, values: &mut [V]) -> Result<V, Error>;

    /// Called when a token has no action.  Returning `Ok` starts error recovery, which
    /// succeeds only if the grammar has rules that use the `error` token.
    fn syntax_error(&mut self, token_name: &str, expected: &[&str]) -> Result<(), Error> {
        let _ = (token_name, expected);
        Err(Error::SyntaxError)
    }
}

enum Step<V> {
    /// The token was shifted or discarded.
    Consumed,
    Accepted(V),
}

pub struct ParserState<'a, V> {
    tables: ParserTables<'a>,
    state_stack: Vec<i16>,
    /// One value per state, except the initial state.
    value_stack: Vec<V>,
    /// The number of tokens still to shift before another syntax error is reported.
    errflag: u8,
}

impl<'a, V: Default> ParserState<'a, V> {
    pub fn new(tables: ParserTables<'a>) -> Self {
        Self {
            tables,
            state_stack: vec![0],
            value_stack: Vec::new(),
            errflag: 0,
        }
    }

    pub fn state(&self) -> i16 {
        self.top()
    }

    fn top(&self) -> i16 {
        self.state_stack[self.state_stack.len() - 1]
    }

    /// Pushes one token.  The end marker (token 0) is rejected without changing the state;
    /// use `finish` instead.
    pub fn push_token<A: ParserActions<V>>(
        &mut self,
        actions: &mut A,
        token: i16,
        value: V,
    ) -> Result<(), Error> {
        if token == 0 {
            return Err(Error::UnexpectedEndMarker);
        }
        match self.step(actions, token, value)? {
            Step::Consumed => Ok(()),
            // only the end marker is accepted
            Step::Accepted(_) => Err(Error::UnexpectedEndMarker),
        }
    }

    /// Pushes the end marker, and returns the value of the start symbol.
    pub fn finish<A: ParserActions<V>>(mut self, actions: &mut A) -> Result<V, Error> {
        match self.step(actions, 0, V::default())? {
            Step::Accepted(value) => Ok(value),
            // The end marker is never shifted or discarded.
            Step::Consumed => Err(Error::IrrecoverableSyntaxError),
        }
    }

    fn step<A: ParserActions<V>>(
        &mut self,
        actions: &mut A,
        token: i16,
        value: V,
    ) -> Result<Step<V>, Error> {
        let t = self.tables;
        yacc_log!(
            "state {}, reading {} ({})",
            self.top(),
            token,
            t.token_name(token)
        );

        loop {
            let state = self.top();
            let defred = t.yydefred[state as usize];
            let rule = if defred != 0 {
                defred
            } else if let Some(to) = t.shift_on(state, token) {
                yacc_log!("state {}, shifting to state {}", state, to);
                self.state_stack.push(to);
                self.value_stack.push(value);
                if self.errflag > 0 {
                    self.errflag -= 1;
                }
                return Ok(Step::Consumed);
            } else if let Some(rule) = t.reduce_on(state, token) {
                rule
            } else {
                match self.errflag {
                    0 | 1 | 2 => {
                        if self.errflag == 0 {
                            yacc_log!("syntax error in state {}", state);
                            let expected = t.expecting(state);
                            actions.syntax_error(t.token_name(token), &expected)?;
                        }
                        self.errflag = 3;
                        self.recover()?;
                        continue;
                    }
                    _ => {
                        if token == 0 {
                            return Err(Error::IrrecoverableSyntaxError);
                        }
                        yacc_log!("discarding token {} ({})", token, t.token_name(token));
                        return Ok(Step::Consumed);
                    }
                }
            };

            if let Some(accepted) = self.reduce(actions, rule as usize, token)? {
                return Ok(Step::Accepted(accepted));
            }
        }
    }

    /// Pops states until one of them can shift `error`, then shifts it.
    fn recover(&mut self) -> Result<(), Error> {
        let t = self.tables;
        loop {
            let state = self.top();
            if let Some(to) = t.shift_on(state, t.yyerrcode) {
                yacc_log!("error recovery: state {}, shifting error to state {}", state, to);
                self.state_stack.push(to);
                self.value_stack.push(V::default());
                return Ok(());
            }
            if self.state_stack.len() == 1 {
                return Err(Error::IrrecoverableSyntaxError);
            }
            yacc_log!("error recovery: popping state {}", state);
            self.state_stack.pop();
            self.value_stack.pop();
        }
    }

    /// Reduces by `rule`.  Returns the value of the start symbol if the parse is complete.
    fn reduce<A: ParserActions<V>>(
        &mut self,
        actions: &mut A,
        rule: usize,
        token: i16,
    ) -> Result<Option<V>, Error> {
        let t = self.tables;
        let len = t.yylen[rule] as usize;
        let offset = t.yyoffset[rule] as usize;
        yacc_log!("reducing by rule {} ({}), len {}", rule, t.yyrule[rule], len);
        debug_assert!(self.value_stack.len() >= offset && offset >= len);

        let window_start = self.value_stack.len() - offset;
        let value = actions.reduce(rule, &mut self.value_stack[window_start..])?;

        let new_len = self.value_stack.len() - len;
        self.value_stack.truncate(new_len);
        self.state_stack.truncate(self.state_stack.len() - len);

        let state = self.top();
        let lhs = t.yylhs[rule];
        if state == 0 && lhs == 0 {
            if token == 0 {
                yacc_log!("accept");
                return Ok(Some(value));
            }
            self.state_stack.push(t.yyfinal);
            self.value_stack.push(value);
            return Ok(None);
        }

        let to = match t.lookup(t.yygindex[lhs as usize], state) {
            Some(to) => to,
            None => t.yydgoto[lhs as usize],
        };
        yacc_log!("after reduction, state {} goes to state {}", state, to);
        self.state_stack.push(to);
        self.value_stack.push(value);
        Ok(None)
    }
}
