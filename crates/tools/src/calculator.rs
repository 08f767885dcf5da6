//! Calculator tool: evaluates arithmetic expressions.
//!
//! Accepts digits, `+ - * /`, parentheses, decimal points and whitespace;
//! anything else is rejected before parsing. Evaluation is a small
//! precedence-climbing parser, no `eval`.

use async_trait::async_trait;
use loopwright_core::error::ToolError;
use loopwright_core::tool::{Tool, ToolResult};

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression with +, -, *, /, parentheses and decimals."
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let expression = arguments["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?
            .trim();

        if let Some(bad) = expression.chars().find(|c| !is_allowed(*c)) {
            return Ok(ToolResult::failed(format!(
                "Expression contains a disallowed character: '{bad}'"
            )));
        }

        Ok(match evaluate(expression) {
            Ok(value) => ToolResult::ok(
                format_number(value),
                serde_json::json!({ "expression": expression, "result": value }),
            ),
            Err(e) => ToolResult::failed(format!("Calculation error: {e}")),
        })
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || "+-*/().".contains(c) || c.is_whitespace()
}

/// Drop the trailing `.0` for whole numbers.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression(0)?;
    match parser.tokens.get(parser.pos) {
        None => Ok(value),
        Some(tok) => Err(format!("Unexpected {tok:?} at token {}", parser.pos)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '+' | '-' | '*' | '/' => tokens.push(Token::Op(c)),
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, d)) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                let literal = &input[start..end];
                let n = literal
                    .parse()
                    .map_err(|_| format!("Invalid number: {literal}"))?;
                tokens.push(Token::Num(n));
            }
            other => return Err(format!("Unexpected character: '{other}'")),
        }
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses and unary minus the parser will follow.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

fn precedence(op: char) -> u8 {
    match op {
        '*' | '/' => 2,
        _ => 1,
    }
}

impl Parser {
    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<f64, String>,
    ) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("Expression nested too deeply".into());
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    // Precedence climbing; all binary operators are left-associative.
    fn expression(&mut self, min_prec: u8) -> Result<f64, String> {
        let mut lhs = self.operand()?;

        while let Some(Token::Op(op)) = self.tokens.get(self.pos).copied() {
            let prec = precedence(op);
            if prec <= min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.expression(prec)?;
            lhs = match op {
                '+' => lhs + rhs,
                '-' => lhs - rhs,
                '*' => lhs * rhs,
                '/' if rhs == 0.0 => return Err("Division by zero".into()),
                _ => lhs / rhs,
            };
        }

        Ok(lhs)
    }

    fn operand(&mut self) -> Result<f64, String> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Op('-')) => Ok(-self.nested(Self::operand)?),
            Some(Token::Open) => {
                let value = self.nested(|p| p.expression(0))?;
                match self.bump() {
                    Some(Token::Close) => Ok(value),
                    _ => Err("Expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("Unexpected {tok:?}")),
            None => Err("Unexpected end of expression".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_is_respected() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("2 * 3 + 4").unwrap(), 10.0);
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("100 / 10 / 5").unwrap(), 2.0);
    }

    #[test]
    fn parentheses() {
        assert_eq!(evaluate("(10 + 5) / 3").unwrap(), 5.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn unary_minus() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("2 * -3").unwrap(), -6.0);
    }

    #[test]
    fn errors() {
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 2").is_err());
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(evaluate(&deep).unwrap_err(), "Expression nested too deeply");

        let negations = format!("{}1", "-".repeat(10_000));
        assert_eq!(evaluate(&negations).unwrap_err(), "Expression nested too deeply");

        let shallow = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&shallow).unwrap(), 1.0);
        assert_eq!(evaluate("--4").unwrap(), 4.0);
    }

    #[tokio::test]
    async fn tool_reports_deep_nesting_in_band() {
        let deep = format!("{}2 + 2{}", "(".repeat(10_000), ")".repeat(10_000));
        let result = CalculatorTool
            .execute(serde_json::json!({ "expression": deep }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("nested too deeply"));
    }

    #[tokio::test]
    async fn tool_formats_whole_numbers() {
        let result = CalculatorTool
            .execute(serde_json::json!({"expression": "2 + 3 * 4"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "14");
        assert_eq!(result.data.unwrap()["expression"], "2 + 3 * 4");
    }

    #[tokio::test]
    async fn tool_formats_decimals() {
        let result = CalculatorTool
            .execute(serde_json::json!({"expression": "10 / 4"}))
            .await
            .unwrap();
        assert_eq!(result.output, "2.5");
    }

    #[tokio::test]
    async fn tool_rejects_disallowed_characters() {
        let result = CalculatorTool
            .execute(serde_json::json!({"expression": "__import__('os')"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("disallowed"));
    }

    #[tokio::test]
    async fn tool_reports_math_errors_in_band() {
        let result = CalculatorTool
            .execute(serde_json::json!({"expression": "1 / 0"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("Division by zero"));
    }

    #[tokio::test]
    async fn tool_missing_expression() {
        let result = CalculatorTool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
