// Cell expression parser - converts expression strings into an AST
// Supports: int/float/string literals, True/False/None, names, list literals,
// arithmetic (+ - * / // % **), chained comparisons, and/or/not,
// conditional expressions (a if c else b), calls and subscripts with slices.

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    Name(String),
    List(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a < b <= c` keeps every link so each middle operand is evaluated once
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    IfElse {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Subscript {
        target: Box<Expr>,
        items: Vec<SubscriptItem>,
    },
}

/// One comma-separated part of a subscript.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptItem {
    Index(Expr),
    Slice {
        start: Option<Expr>,
        stop: Option<Expr>,
        step: Option<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,    // ==
    NotEq, // != or <>
    Lt,
    Gt,
    LtEq,
    GtEq,
}

/// Parse an expression string into an AST.
pub fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err("unexpected EOF while parsing".to_string());
    }

    let (expr, pos) = parse_ternary(&tokens, 0, 0)?;
    if pos < tokens.len() {
        return Err(format!("invalid syntax near {}", tokens[pos].describe()));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    NoneLit,
    And,
    Or,
    Not,
    If,
    Else,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Int(n) => n.to_string(),
            Token::Float(n) => n.to_string(),
            Token::Str(s) => format!("'{}'", s),
            Token::Ident(name) => format!("'{}'", name),
            other => format!("{:?}", other),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '%' => { tokens.push(Token::Percent); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            '[' => { tokens.push(Token::LBracket); chars.next(); }
            ']' => { tokens.push(Token::RBracket); chars.next(); }
            ',' => { tokens.push(Token::Comma); chars.next(); }
            ':' => { tokens.push(Token::Colon); chars.next(); }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::StarStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    tokens.push(Token::SlashSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => { tokens.push(Token::LtEq); chars.next(); }
                    Some('>') => { tokens.push(Token::NotEq); chars.next(); }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::GtEq);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err("invalid syntax: assignment is not an expression".to_string());
                }
                tokens.push(Token::EqEq);
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err("invalid syntax: unexpected '!'".to_string());
                }
                tokens.push(Token::NotEq);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(escaped) => s.push(escaped),
                            None => return Err("EOL while scanning string literal".to_string()),
                        },
                        Some(ch) => s.push(ch),
                        None => return Err("EOL while scanning string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "True" => Token::True,
                    "False" => Token::False,
                    "None" => Token::NoneLit,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "if" => Token::If,
                    "else" => Token::Else,
                    _ => Token::Ident(ident),
                });
            }
            '0'..='9' | '.' => tokens.push(tokenize_number(&mut chars)?),
            _ => return Err(format!("invalid character '{}'", c)),
        }
    }

    Ok(tokens)
}

fn tokenize_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<Token, String> {
    let mut num_str = String::new();
    let mut is_float = false;

    while let Some(&d) = chars.peek() {
        if d.is_ascii_digit() || d == '_' {
            if d != '_' {
                num_str.push(d);
            }
            chars.next();
        } else if d == '.' && !is_float {
            is_float = true;
            num_str.push(d);
            chars.next();
        } else if d == 'e' || d == 'E' {
            // Exponent, with optional sign
            is_float = true;
            num_str.push('e');
            chars.next();
            if let Some(&sign) = chars.peek() {
                if sign == '+' || sign == '-' {
                    num_str.push(sign);
                    chars.next();
                }
            }
        } else {
            break;
        }
    }

    if num_str == "." {
        return Err("invalid syntax near '.'".to_string());
    }
    if is_float {
        num_str
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| format!("invalid number literal '{}'", num_str))
    } else {
        num_str
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| format!("integer literal '{}' too large", num_str))
    }
}

fn expect(tokens: &[Token], pos: usize, wanted: Token, what: &str) -> Result<usize, String> {
    match tokens.get(pos) {
        Some(t) if *t == wanted => Ok(pos + 1),
        Some(t) => Err(format!("expected {} but found {}", what, t.describe())),
        None => Err(format!("unexpected EOF, expected {}", what)),
    }
}

/// Deepest nesting of brackets, unary operators and operator chains.
pub const MAX_NESTING: usize = 200;

fn nest(depth: usize) -> Result<usize, String> {
    if depth >= MAX_NESTING {
        return Err(format!("expression nested more than {} levels deep", MAX_NESTING));
    }
    Ok(depth + 1)
}

// Lowest precedence: `body if cond else other`
fn parse_ternary(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (body, pos) = parse_or(tokens, pos, depth)?;

    if tokens.get(pos) != Some(&Token::If) {
        return Ok((body, pos));
    }
    let depth = nest(depth)?;
    let (cond, pos) = parse_or(tokens, pos + 1, depth)?;
    let pos = expect(tokens, pos, Token::Else, "'else'")?;
    let (otherwise, pos) = parse_ternary(tokens, pos, depth)?;

    Ok((
        Expr::IfElse {
            cond: Box::new(cond),
            then: Box::new(body),
            otherwise: Box::new(otherwise),
        },
        pos,
    ))
}

// Each link of a left-associative chain deepens the tree by one, so the
// loops below count links against the same nesting limit.

fn parse_or(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_and(tokens, pos, depth)?;
    let mut depth = depth;

    while tokens.get(pos) == Some(&Token::Or) {
        depth = nest(depth)?;
        let (right, new_pos) = parse_and(tokens, pos + 1, depth)?;
        left = Expr::Or(Box::new(left), Box::new(right));
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_and(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_not(tokens, pos, depth)?;
    let mut depth = depth;

    while tokens.get(pos) == Some(&Token::And) {
        depth = nest(depth)?;
        let (right, new_pos) = parse_not(tokens, pos + 1, depth)?;
        left = Expr::And(Box::new(left), Box::new(right));
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_not(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    if tokens.get(pos) == Some(&Token::Not) {
        let (operand, pos) = parse_not(tokens, pos + 1, nest(depth)?)?;
        return Ok((Expr::Not(Box::new(operand)), pos));
    }
    parse_comparison(tokens, pos, depth)
}

fn parse_comparison(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (first, mut pos) = parse_arith(tokens, pos, depth)?;
    let mut rest = Vec::new();

    while let Some(token) = tokens.get(pos) {
        let op = match token {
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            Token::Lt => CmpOp::Lt,
            Token::Gt => CmpOp::Gt,
            Token::LtEq => CmpOp::LtEq,
            Token::GtEq => CmpOp::GtEq,
            _ => break,
        };
        let (right, new_pos) = parse_arith(tokens, pos + 1, depth)?;
        rest.push((op, right));
        pos = new_pos;
    }

    if rest.is_empty() {
        Ok((first, pos))
    } else {
        Ok((Expr::Compare { first: Box::new(first), rest }, pos))
    }
}

fn parse_arith(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_term(tokens, pos, depth)?;
    let mut depth = depth;

    while let Some(token) = tokens.get(pos) {
        let op = match token {
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            _ => break,
        };
        depth = nest(depth)?;
        let (right, new_pos) = parse_term(tokens, pos + 1, depth)?;
        left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_term(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_factor(tokens, pos, depth)?;
    let mut depth = depth;

    while let Some(token) = tokens.get(pos) {
        let op = match token {
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::SlashSlash => BinOp::FloorDiv,
            Token::Percent => BinOp::Mod,
            _ => break,
        };
        depth = nest(depth)?;
        let (right, new_pos) = parse_factor(tokens, pos + 1, depth)?;
        left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

// Unary sign binds looser than ** (-2**2 == -4)
fn parse_factor(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let op = match tokens.get(pos) {
        Some(Token::Minus) => UnaryOp::Neg,
        Some(Token::Plus) => UnaryOp::Pos,
        _ => return parse_power(tokens, pos, depth),
    };
    let (operand, pos) = parse_factor(tokens, pos + 1, nest(depth)?)?;
    Ok((Expr::Unary { op, operand: Box::new(operand) }, pos))
}

// Exponentiation - right-associative, exponent may carry a sign
fn parse_power(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (base, pos) = parse_postfix(tokens, pos, depth)?;

    if tokens.get(pos) == Some(&Token::StarStar) {
        let (exponent, new_pos) = parse_factor(tokens, pos + 1, nest(depth)?)?;
        return Ok((
            Expr::Binary { op: BinOp::Pow, left: Box::new(base), right: Box::new(exponent) },
            new_pos,
        ));
    }

    Ok((base, pos))
}

fn parse_postfix(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let (mut expr, mut pos) = parse_atom(tokens, pos, depth)?;
    let mut depth = depth;

    loop {
        match tokens.get(pos) {
            Some(Token::LBracket) => {
                depth = nest(depth)?;
                let (items, new_pos) = parse_subscript(tokens, pos + 1, depth)?;
                expr = Expr::Subscript { target: Box::new(expr), items };
                pos = new_pos;
            }
            Some(Token::LParen) => {
                let Expr::Name(name) = expr else {
                    return Err("only named functions can be called".to_string());
                };
                let (args, new_pos) =
                    parse_sequence(tokens, pos + 1, Token::RParen, "')'", nest(depth)?)?;
                expr = Expr::Call { name, args };
                pos = new_pos;
            }
            _ => break,
        }
    }

    Ok((expr, pos))
}

fn parse_atom(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), String> {
    let Some(token) = tokens.get(pos) else {
        return Err("unexpected EOF while parsing".to_string());
    };

    match token {
        Token::Int(n) => Ok((Expr::Int(*n), pos + 1)),
        Token::Float(n) => Ok((Expr::Float(*n), pos + 1)),
        Token::Str(s) => {
            // Adjacent literals concatenate: 'a' 'b' == 'ab'
            let mut text = s.clone();
            let mut pos = pos + 1;
            while let Some(Token::Str(more)) = tokens.get(pos) {
                text.push_str(more);
                pos += 1;
            }
            Ok((Expr::Str(text), pos))
        }
        Token::True => Ok((Expr::Bool(true), pos + 1)),
        Token::False => Ok((Expr::Bool(false), pos + 1)),
        Token::NoneLit => Ok((Expr::None, pos + 1)),
        Token::Ident(name) => Ok((Expr::Name(name.clone()), pos + 1)),
        Token::LParen => {
            let (expr, pos) = parse_ternary(tokens, pos + 1, nest(depth)?)?;
            let pos = expect(tokens, pos, Token::RParen, "')'")?;
            Ok((expr, pos))
        }
        Token::LBracket => {
            let (items, pos) =
                parse_sequence(tokens, pos + 1, Token::RBracket, "']'", nest(depth)?)?;
            Ok((Expr::List(items), pos))
        }
        other => Err(format!("invalid syntax near {}", other.describe())),
    }
}

/// Comma-separated expressions up to `close`; a trailing comma is allowed.
fn parse_sequence(
    tokens: &[Token],
    pos: usize,
    close: Token,
    what: &str,
    depth: usize,
) -> Result<(Vec<Expr>, usize), String> {
    let mut items = Vec::new();
    let mut pos = pos;

    loop {
        if tokens.get(pos) == Some(&close) {
            return Ok((items, pos + 1));
        }
        let (item, new_pos) = parse_ternary(tokens, pos, depth)?;
        items.push(item);
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::Comma) => pos += 1,
            Some(t) if *t == close => return Ok((items, pos + 1)),
            Some(t) => return Err(format!("expected ',' or {} but found {}", what, t.describe())),
            None => return Err(format!("unexpected EOF, expected {}", what)),
        }
    }
}

fn parse_optional(tokens: &[Token], pos: usize, depth: usize) -> Result<(Option<Expr>, usize), String> {
    match tokens.get(pos) {
        Some(Token::Colon | Token::Comma | Token::RBracket) | None => Ok((None, pos)),
        _ => parse_ternary(tokens, pos, depth).map(|(expr, pos)| (Some(expr), pos)),
    }
}

fn parse_subscript(
    tokens: &[Token],
    pos: usize,
    depth: usize,
) -> Result<(Vec<SubscriptItem>, usize), String> {
    let mut items = Vec::new();
    let mut pos = pos;

    loop {
        let (start, new_pos) = parse_optional(tokens, pos, depth)?;
        pos = new_pos;

        let item = if tokens.get(pos) == Some(&Token::Colon) {
            let (stop, new_pos) = parse_optional(tokens, pos + 1, depth)?;
            pos = new_pos;
            let step = if tokens.get(pos) == Some(&Token::Colon) {
                let (step, new_pos) = parse_optional(tokens, pos + 1, depth)?;
                pos = new_pos;
                step
            } else {
                None
            };
            SubscriptItem::Slice { start, stop, step }
        } else {
            match start {
                Some(expr) => SubscriptItem::Index(expr),
                None => return Err("invalid syntax: empty subscript".to_string()),
            }
        };
        items.push(item);

        match tokens.get(pos) {
            Some(Token::Comma) => pos += 1,
            Some(Token::RBracket) => return Ok((items, pos + 1)),
            Some(t) => return Err(format!("expected ',' or ']' but found {}", t.describe())),
            None => return Err("unexpected EOF, expected ']'".to_string()),
        }
    }
}
