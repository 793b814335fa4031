//! Difficulty rules
//!
//! A rule is an ordered list of guarded conditions. Guards are written in a
//! closed expression language and compiled to a small tree before evaluation:
//!
//! ```text
//! expr       := conj ( "||" conj )*
//! conj       := atom ( "&&" atom )*
//! atom       := "(" expr ")" | comparison | mode-test | flag | "true" | "false"
//! comparison := operand ( "<" | "<=" | ">" | ">=" | "==" ) operand
//! mode-test  := "mode" "==" string | string "==" "mode"
//! operand    := number | mastery | streak | attempts
//!             | timeSinceTopicMinutes | lastCorrect | lastWrong
//! flag       := lastCorrect | lastWrong
//! ```
//!
//! Anything outside the grammar is rejected, and a rejected guard never matches.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::adaptive::types::{Condition, Difficulty, Mode, Rule, DEFAULT_MASTERY_SCORE};

/// Idle time assumed when the learner has never attempted the topic. Large enough
/// to satisfy any "long idle" guard, so first exposure follows the idle branch.
pub const NO_PRIOR_ATTEMPT_MINUTES: f64 = 99_999.0;

pub const MAX_GUARD_LEN: usize = 512;
pub const MAX_GUARD_NESTING: usize = 32;

/// Difficulty chosen when no rule exists or no guard matches.
pub const DEFAULT_DIFFICULTY: Difficulty = Difficulty::Medium;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleContext {
    pub mastery: f64,
    pub streak: u32,
    pub attempts: u32,
    pub minutes_since_topic_attempt: f64,
    pub last_correct: bool,
    pub last_wrong: bool,
    pub mode: Mode,
}

impl Default for RuleContext {
    fn default() -> Self {
        Self {
            mastery: DEFAULT_MASTERY_SCORE,
            streak: 0,
            attempts: 0,
            minutes_since_topic_attempt: NO_PRIOR_ATTEMPT_MINUTES,
            last_correct: false,
            last_wrong: false,
            mode: Mode::Formative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardError {
    #[error("guard is empty")]
    Empty,
    #[error("guard exceeds the maximum length")]
    TooLong,
    #[error("guard nests parentheses too deeply")]
    TooDeep,
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of guard")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    Mastery,
    Streak,
    Attempts,
    TimeSinceTopicMinutes,
    LastCorrect,
    LastWrong,
}

impl Variable {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "mastery" => Some(Self::Mastery),
            "streak" => Some(Self::Streak),
            "attempts" => Some(Self::Attempts),
            "timeSinceTopicMinutes" => Some(Self::TimeSinceTopicMinutes),
            "lastCorrect" => Some(Self::LastCorrect),
            "lastWrong" => Some(Self::LastWrong),
            _ => None,
        }
    }

    fn is_flag(&self) -> bool {
        matches!(self, Self::LastCorrect | Self::LastWrong)
    }

    fn value(&self, ctx: &RuleContext) -> f64 {
        match self {
            Self::Mastery => ctx.mastery,
            Self::Streak => f64::from(ctx.streak),
            Self::Attempts => f64::from(ctx.attempts),
            Self::TimeSinceTopicMinutes => ctx.minutes_since_topic_attempt,
            Self::LastCorrect => flag_value(ctx.last_correct),
            Self::LastWrong => flag_value(ctx.last_wrong),
        }
    }
}

fn flag_value(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Var(Variable),
    Num(f64),
}

impl Operand {
    fn value(&self, ctx: &RuleContext) -> f64 {
        match self {
            Self::Var(var) => var.value(ctx),
            Self::Num(n) => *n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CompareOp {
    fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
        }
    }
}

/// Compiled guard expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Literal(bool),
    Flag(Variable),
    ModeIs(Mode),
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    And(Box<Guard>, Box<Guard>),
    Or(Box<Guard>, Box<Guard>),
}

impl Guard {
    pub fn parse(source: &str) -> Result<Self, GuardError> {
        if source.len() > MAX_GUARD_LEN {
            return Err(GuardError::TooLong);
        }
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(GuardError::Empty);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let guard = parser.parse_expr()?;
        match parser.peek() {
            None => Ok(guard),
            Some(token) => Err(GuardError::UnexpectedToken(token.describe())),
        }
    }

    pub fn evaluate(&self, ctx: &RuleContext) -> bool {
        match self {
            Self::Literal(value) => *value,
            Self::Flag(var) => var.value(ctx) != 0.0,
            Self::ModeIs(mode) => ctx.mode == *mode,
            Self::Compare { lhs, op, rhs } => op.apply(lhs.value(ctx), rhs.value(ctx)),
            Self::And(a, b) => a.evaluate(ctx) && b.evaluate(ctx),
            Self::Or(a, b) => a.evaluate(ctx) || b.evaluate(ctx),
        }
    }
}

impl std::str::FromStr for Guard {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Evaluates guard source against `ctx`. Invalid guards are logged and never match.
pub fn guard_matches(source: &str, ctx: &RuleContext) -> bool {
    match Guard::parse(source) {
        Ok(guard) => guard.evaluate(ctx),
        Err(err) => {
            tracing::warn!(guard = %source, error = %err, "rejected guard expression");
            false
        }
    }
}

/// Scans conditions in declared order and returns the target of the first
/// matching guard, or [`DEFAULT_DIFFICULTY`].
pub fn decide(conditions: &[Condition], ctx: &RuleContext) -> Difficulty {
    conditions
        .iter()
        .find(|condition| guard_matches(&condition.if_expr, ctx))
        .map(|condition| condition.next_difficulty)
        .unwrap_or(DEFAULT_DIFFICULTY)
}

pub fn decide_for_rule(rule: Option<&Rule>, ctx: &RuleContext) -> Difficulty {
    match rule {
        Some(rule) => decide(&rule.conditions, ctx),
        None => DEFAULT_DIFFICULTY,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Var(Variable),
    Mode,
    Str(String),
    True,
    False,
    Cmp(CompareOp),
    AndAnd,
    OrOr,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Num(n) => format!("number {n}"),
            Self::Var(var) => format!("identifier {var:?}"),
            Self::Mode => "identifier mode".to_string(),
            Self::Str(s) => format!("string '{s}'"),
            Self::True => "true".to_string(),
            Self::False => "false".to_string(),
            Self::Cmp(op) => format!("operator {op:?}"),
            Self::AndAnd => "'&&'".to_string(),
            Self::OrOr => "'||'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, GuardError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' | '-' => tokens.push(lex_number(source, &mut chars)?),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word = take_while(source, &mut chars, |ch| ch.is_ascii_alphanumeric() || ch == '_');
                let token = match word {
                    "true" => Token::True,
                    "false" => Token::False,
                    "mode" => Token::Mode,
                    other => Token::Var(
                        Variable::lookup(other)
                            .ok_or_else(|| GuardError::UnknownIdentifier(other.to_string()))?,
                    ),
                };
                tokens.push(token);
            }
            '\'' | '"' => {
                chars.next();
                let start = offset + c.len_utf8();
                let mut end = None;
                for (i, ch) in chars.by_ref() {
                    if ch == c {
                        end = Some(i);
                        break;
                    }
                }
                let end = end.ok_or(GuardError::UnterminatedString)?;
                tokens.push(Token::Str(source[start..end].to_string()));
            }
            '<' | '>' => {
                chars.next();
                let inclusive = next_is(&mut chars, '=');
                tokens.push(Token::Cmp(match (c, inclusive) {
                    ('<', false) => CompareOp::Lt,
                    ('<', true) => CompareOp::Le,
                    (_, false) => CompareOp::Gt,
                    (_, true) => CompareOp::Ge,
                }));
            }
            '=' => {
                chars.next();
                if !next_is(&mut chars, '=') {
                    return Err(GuardError::UnexpectedChar('=', offset));
                }
                next_is(&mut chars, '=');
                tokens.push(Token::Cmp(CompareOp::Eq));
            }
            '&' | '|' => {
                chars.next();
                if !next_is(&mut chars, c) {
                    return Err(GuardError::UnexpectedChar(c, offset));
                }
                tokens.push(if c == '&' { Token::AndAnd } else { Token::OrOr });
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            other => return Err(GuardError::UnexpectedChar(other, offset)),
        }
    }

    Ok(tokens)
}

fn lex_number(source: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<Token, GuardError> {
    let start = chars.peek().map(|&(i, _)| i).unwrap_or(source.len());
    let mut end = start;
    if let Some(&(i, '-')) = chars.peek() {
        chars.next();
        end = i + 1;
    }
    while let Some(&(i, ch)) = chars.peek() {
        if ch.is_ascii_digit() || ch == '.' {
            chars.next();
            end = i + 1;
        } else {
            break;
        }
    }
    let text = &source[start..end];
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Token::Num)
        .ok_or_else(|| GuardError::InvalidNumber(text.to_string()))
}

fn take_while<'a>(
    source: &'a str,
    chars: &mut Peekable<CharIndices<'_>>,
    pred: impl Fn(char) -> bool,
) -> &'a str {
    let start = chars.peek().map(|&(i, _)| i).unwrap_or(source.len());
    let mut end = start;
    while let Some(&(i, ch)) = chars.peek() {
        if !pred(ch) {
            break;
        }
        chars.next();
        end = i + ch.len_utf8();
    }
    &source[start..end]
}

fn next_is(chars: &mut Peekable<CharIndices<'_>>, expected: char) -> bool {
    if matches!(chars.peek(), Some(&(_, ch)) if ch == expected) {
        chars.next();
        true
    } else {
        false
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Result<Token, GuardError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(GuardError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_expr(&mut self) -> Result<Guard, GuardError> {
        let mut left = self.parse_conj()?;
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            let right = self.parse_conj()?;
            left = Guard::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_conj(&mut self) -> Result<Guard, GuardError> {
        let mut left = self.parse_atom()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            let right = self.parse_atom()?;
            left = Guard::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Guard, GuardError> {
        match self.advance()? {
            Token::LParen => {
                self.depth += 1;
                if self.depth > MAX_GUARD_NESTING {
                    return Err(GuardError::TooDeep);
                }
                let inner = self.parse_expr()?;
                match self.advance()? {
                    Token::RParen => {}
                    other => return Err(GuardError::UnexpectedToken(other.describe())),
                }
                self.depth -= 1;
                Ok(inner)
            }
            Token::True => Ok(Guard::Literal(true)),
            Token::False => Ok(Guard::Literal(false)),
            Token::Mode => {
                self.expect_eq()?;
                match self.advance()? {
                    Token::Str(name) => mode_literal(&name),
                    other => Err(GuardError::UnexpectedToken(other.describe())),
                }
            }
            Token::Str(name) => {
                self.expect_eq()?;
                match self.advance()? {
                    Token::Mode => mode_literal(&name),
                    other => Err(GuardError::UnexpectedToken(other.describe())),
                }
            }
            Token::Num(n) => self.parse_comparison(Operand::Num(n)),
            Token::Var(var) => {
                if var.is_flag() && !matches!(self.peek(), Some(Token::Cmp(_))) {
                    return Ok(Guard::Flag(var));
                }
                self.parse_comparison(Operand::Var(var))
            }
            other => Err(GuardError::UnexpectedToken(other.describe())),
        }
    }

    fn parse_comparison(&mut self, lhs: Operand) -> Result<Guard, GuardError> {
        let op = match self.advance()? {
            Token::Cmp(op) => op,
            other => return Err(GuardError::UnexpectedToken(other.describe())),
        };
        let rhs = match self.advance()? {
            Token::Num(n) => Operand::Num(n),
            Token::Var(var) => Operand::Var(var),
            other => return Err(GuardError::UnexpectedToken(other.describe())),
        };
        Ok(Guard::Compare { lhs, op, rhs })
    }

    fn expect_eq(&mut self) -> Result<(), GuardError> {
        match self.advance()? {
            Token::Cmp(CompareOp::Eq) => Ok(()),
            other => Err(GuardError::UnexpectedToken(other.describe())),
        }
    }
}

/// A mode outside the enum can never equal the current mode, so the comparison
/// compiles to `false` and the rest of the guard still counts.
fn mode_literal(name: &str) -> Result<Guard, GuardError> {
    match Mode::try_parse(name) {
        Some(mode) => Ok(Guard::ModeIs(mode)),
        None => {
            tracing::warn!(mode = %name, "guard compares against unknown mode");
            Ok(Guard::Literal(false))
        }
    }
}
