//! 안전한 계산기
//!
//! 숫자, 공백, `+ - * / ( ) .`만 허용합니다. 정수 연산은 정수로 유지되고
//! `/`는 실수 나눗셈, `//`는 내림 나눗셈, `**`는 거듭제곱입니다.

use crate::error::CalcError;

/// 수식 평가 후 결과 문자열 반환
pub fn safe_eval(expr: &str) -> Result<String, CalcError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(CalcError::Empty);
    }

    if let Some(bad) = expr.chars().find(|c| !is_allowed(*c)) {
        return Err(CalcError::IllegalCharacters(bad));
    }

    let tokens = tokenize(expr)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;

    if parser.pos != parser.tokens.len() {
        return Err(CalcError::Evaluation("invalid syntax".to_string()));
    }

    Ok(value.to_string())
}

/// 도구 출력용 (에러도 메시지 문자열로)
pub fn calc_tool(expr: &str) -> String {
    match safe_eval(expr) {
        Ok(value) => value,
        Err(e) => e.to_string(),
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || "+-*/().".contains(c)
}

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    fn as_f64(self) -> f64 {
        match self {
            Value::Int(i) => i as f64,
            Value::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Value::Int(i) => i == 0,
            Value::Float(f) => f == 0.0,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            // 정수값 실수는 "2.0"처럼 소수점 표시
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}

fn overflow() -> CalcError {
    CalcError::Evaluation("integer overflow".to_string())
}

fn division_by_zero() -> CalcError {
    CalcError::Evaluation("division by zero".to_string())
}

fn add(a: Value, b: Value) -> Result<Value, CalcError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.checked_add(y).map(Value::Int).ok_or_else(overflow),
        _ => Ok(Value::Float(a.as_f64() + b.as_f64())),
    }
}

fn sub(a: Value, b: Value) -> Result<Value, CalcError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.checked_sub(y).map(Value::Int).ok_or_else(overflow),
        _ => Ok(Value::Float(a.as_f64() - b.as_f64())),
    }
}

fn mul(a: Value, b: Value) -> Result<Value, CalcError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.checked_mul(y).map(Value::Int).ok_or_else(overflow),
        _ => Ok(Value::Float(a.as_f64() * b.as_f64())),
    }
}

fn true_div(a: Value, b: Value) -> Result<Value, CalcError> {
    if b.is_zero() {
        return Err(division_by_zero());
    }
    Ok(Value::Float(a.as_f64() / b.as_f64()))
}

fn floor_div(a: Value, b: Value) -> Result<Value, CalcError> {
    if b.is_zero() {
        return Err(division_by_zero());
    }
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            let q = x.checked_div(y).ok_or_else(overflow)?;
            if x % y != 0 && ((x < 0) != (y < 0)) {
                Ok(Value::Int(q - 1))
            } else {
                Ok(Value::Int(q))
            }
        }
        _ => Ok(Value::Float((a.as_f64() / b.as_f64()).floor())),
    }
}

fn pow(a: Value, b: Value) -> Result<Value, CalcError> {
    if a.is_zero() && b.as_f64() < 0.0 {
        return Err(CalcError::Evaluation(
            "0 cannot be raised to a negative power".to_string(),
        ));
    }
    match (a, b) {
        (Value::Int(x), Value::Int(y)) if y >= 0 => {
            let exp = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_pow(exp).map(Value::Int).ok_or_else(overflow)
        }
        _ => {
            let result = a.as_f64().powf(b.as_f64());
            if result.is_nan() {
                return Err(CalcError::Evaluation("math domain error".to_string()));
            }
            Ok(Value::Float(result))
        }
    }
}

fn negate(v: Value) -> Result<Value, CalcError> {
    match v {
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        Value::Float(f) => Ok(Value::Float(-f)),
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Value),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal)?));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::DoubleStar);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(CalcError::IllegalCharacters(other)),
        }
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Value, CalcError> {
    let invalid = || CalcError::Evaluation(format!("invalid number: {}", literal));

    if literal == "." || literal.matches('.').count() > 1 {
        return Err(invalid());
    }

    if literal.contains('.') {
        literal.parse::<f64>().map(Value::Float).map_err(|_| invalid())
    } else {
        // 앞자리 0이 붙은 정수 (예: 012)는 허용하지 않음
        if literal.len() > 1 && literal.starts_with('0') && literal.chars().any(|c| c != '0') {
            return Err(invalid());
        }
        literal.parse::<i64>().map(Value::Int).map_err(|_| overflow())
    }
}

// ============================================================================
// Parser
// ============================================================================

/// 재귀 하강 파서
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/' | '//') factor)*
/// factor := ('+' | '-') factor | power
/// power  := atom ('**' factor)?
/// atom   := number | '(' expr ')'
/// ```
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Value, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = add(value, self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = sub(value, self.term()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Value, CalcError> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = mul(value, self.factor()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    value = true_div(value, self.factor()?)?;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    value = floor_div(value, self.factor()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<Value, CalcError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.factor()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                negate(self.factor()?)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Value, CalcError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.pos += 1;
            let exponent = self.factor()?;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Value, CalcError> {
        match self.next() {
            Some(Token::Num(v)) => Ok(v),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalcError::Evaluation("unbalanced parentheses".to_string())),
                }
            }
            Some(_) => Err(CalcError::Evaluation("invalid syntax".to_string())),
            None => Err(CalcError::Evaluation("unexpected end of expression".to_string())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
