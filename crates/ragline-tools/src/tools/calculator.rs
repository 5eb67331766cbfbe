//! Calculator tool - safe arithmetic expression evaluation
//!
//! A recursive-descent parser over an allow-list of operators, functions,
//! and constants. Nothing is ever handed to an interpreter.

use crate::registry::{Tool, ToolResult};
use serde_json::{json, Value};

pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations. Supports +, -, *, /, %, ^, parentheses, \
         functions (sqrt, sin, cos, tan, log, ln, exp, abs, floor, ceil, round, min, max, pow) \
         and the constants pi and e. Example: \"2 + 3 * 4\" evaluates to 14."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Mathematical expression to evaluate"
                },
                "precision": {
                    "type": "integer",
                    "description": "Decimal places in the result (default 6)"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let expression = match args.get("expression").and_then(|v| v.as_str()) {
            Some(e) => e,
            None => return ToolResult::error("Missing required parameter: expression"),
        };
        let precision = args
            .get("precision")
            .and_then(|v| v.as_u64())
            .unwrap_or(6)
            .min(15) as usize;

        match evaluate(expression) {
            Ok(value) => ToolResult::text(format_number(value, precision)),
            Err(e) => ToolResult::error(e),
        }
    }
}

/// Format with fixed precision, trimming trailing zeros; integral values
/// print without a decimal point.
fn format_number(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{:.*}", precision, value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

pub fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("Unexpected token at position {}", parser.pos));
    }
    Ok(value)
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                // "**" is accepted as power, matching common calculator input
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
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
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent suffix: 1e5, 2.5e-3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number: {}", literal))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("Unexpected character: {:?}", other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> Result<(), String> {
        match self.advance() {
            Some(ref t) if t == expected => Ok(()),
            other => Err(format!("Expected {:?}, found {:?}", expected, other)),
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := factor (('*' | '/' | '%') factor)*
    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    value *= self.factor()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("Division by zero".to_string());
                    }
                    value /= divisor;
                }
                Some(Token::Percent) => {
                    self.advance();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("Division by zero".to_string());
                    }
                    value %= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // factor := unary ('^' factor)?   -- right-associative
    fn factor(&mut self) -> Result<f64, String> {
        let base = self.unary()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.factor()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // unary := '-' unary | '+' unary | primary
    fn unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.primary(),
        }
    }

    // primary := number | ident '(' args ')' | constant | '(' expression ')'
    fn primary(&mut self) -> Result<f64, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                self.eat(&Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let mut args = vec![self.expression()?];
                    while matches!(self.peek(), Some(Token::Comma)) {
                        self.advance();
                        args.push(self.expression()?);
                    }
                    self.eat(&Token::RParen)?;
                    apply_function(&name, &args)
                } else {
                    constant(&name)
                }
            }
            other => Err(format!("Unexpected token: {:?}", other)),
        }
    }
}

fn constant(name: &str) -> Result<f64, String> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        "tau" => Ok(std::f64::consts::TAU),
        _ => Err(format!("Unknown constant: {}", name)),
    }
}

fn apply_function(name: &str, args: &[f64]) -> Result<f64, String> {
    let one = |args: &[f64]| -> Result<f64, String> {
        if args.len() == 1 {
            Ok(args[0])
        } else {
            Err(format!("{} expects 1 argument, got {}", name, args.len()))
        }
    };
    let two = |args: &[f64]| -> Result<(f64, f64), String> {
        if args.len() == 2 {
            Ok((args[0], args[1]))
        } else {
            Err(format!("{} expects 2 arguments, got {}", name, args.len()))
        }
    };

    match name {
        "sqrt" => {
            let x = one(args)?;
            if x < 0.0 {
                return Err("sqrt of negative number".to_string());
            }
            Ok(x.sqrt())
        }
        "sin" => Ok(one(args)?.sin()),
        "cos" => Ok(one(args)?.cos()),
        "tan" => Ok(one(args)?.tan()),
        "ln" => Ok(one(args)?.ln()),
        "log" => Ok(one(args)?.log10()),
        "log2" => Ok(one(args)?.log2()),
        "exp" => Ok(one(args)?.exp()),
        "abs" => Ok(one(args)?.abs()),
        "floor" => Ok(one(args)?.floor()),
        "ceil" => Ok(one(args)?.ceil()),
        "round" => Ok(one(args)?.round()),
        "radians" => Ok(one(args)?.to_radians()),
        "degrees" => Ok(one(args)?.to_degrees()),
        "pow" => {
            let (base, exp) = two(args)?;
            Ok(base.powf(exp))
        }
        "min" => {
            let (a, b) = two(args)?;
            Ok(a.min(b))
        }
        "max" => {
            let (a, b) = two(args)?;
            Ok(a.max(b))
        }
        _ => Err(format!("Unknown function: {}", name)),
    }
}
