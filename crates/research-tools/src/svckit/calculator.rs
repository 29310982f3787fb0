//! Calculator Capability (`llm-math`)
//!
//! Evaluates arithmetic directly when the input already is an expression.
//! Word problems are first translated into an expression by the model.

use async_trait::async_trait;

use agent_core::{Capability, Message, ModelHandle, Result as CoreResult};

use crate::error::{Result, ToolError};

const TRANSLATE_PROMPT: &str = r"Translate a math problem into a expression that can be evaluated by a simple calculator. Use the output of evaluating the expression to answer the question.

Question: ${Question with math problem.}
```text
${single line mathematical expression that solves the problem}
```
```output
${Output of evaluating the expression}
```
Answer: ${Answer}

Begin.

Question: What is 37593 * 67?
```text
37593 * 67
```
```output
2518731
```
Answer: 2518731

Question: 37593^(1/5)
```text
37593**(1/5)
```
```output
8.222831614237718
```
Answer: 8.222831614237718

Question: {question}
";

const OUTPUT_STOP: &str = "```output";

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    Pow,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' || d == '_' {
                        if d != '_' {
                            number.push(d);
                        }
                        chars.next();
                    } else if (d == 'e' || d == 'E') && !number.contains(['e', 'E']) {
                        // exponent only when followed by a digit or sign
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        match lookahead.peek() {
                            Some(n) if n.is_ascii_digit() || *n == '-' || *n == '+' => {
                                number.push(d);
                                chars.next();
                                if let Some(sign) = chars.next_if(|s| *s == '-' || *s == '+') {
                                    number.push(sign);
                                }
                            }
                            _ => break,
                        }
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse()
                    .map_err(|_| ToolError::Math(format!("invalid number '{number}'")))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(d) = chars.next_if(|d| d.is_ascii_alphanumeric() || *d == '_') {
                    ident.push(d);
                }
                tokens.push(Token::Ident(ident.to_ascii_lowercase()));
            }
            '*' => {
                chars.next();
                if chars.next_if_eq(&'*').is_some() {
                    tokens.push(Token::Pow);
                } else {
                    tokens.push(Token::Op('*'));
                }
            }
            '^' => {
                chars.next();
                tokens.push(Token::Pow);
            }
            '+' | '-' | '/' | '%' => {
                chars.next();
                tokens.push(Token::Op(c));
            }
            '×' => {
                chars.next();
                tokens.push(Token::Op('*'));
            }
            '÷' => {
                chars.next();
                tokens.push(Token::Op('/'));
            }
            '(' | '[' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' | ']' => {
                chars.next();
                tokens.push(Token::Close);
            }
            other => return Err(ToolError::Math(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses and signs the parser will follow
const MAX_DEPTH: usize = 128;

/// Recursive-descent evaluator over a token stream
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    const fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<f64>) -> Result<f64> {
        if self.depth >= MAX_DEPTH {
            return Err(ToolError::Math("expression nested too deeply".into()));
        }
        self.depth += 1;
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(ToolError::Math("division by zero".into())),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> Result<f64> {
        self.nested(Self::signed)
    }

    fn signed(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := atom ('^' unary)?   right associative
    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::Open) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(ToolError::Math("missing closing parenthesis".into())),
                }
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::Open) {
                    let arg = self.atom()?;
                    apply(&name, arg)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(ToolError::Math(format!("unexpected token {token:?}"))),
            None => Err(ToolError::Math("unexpected end of expression".into())),
        }
    }
}

fn constant(name: &str) -> Result<f64> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        "tau" => Ok(std::f64::consts::TAU),
        _ => Err(ToolError::Math(format!("unknown name '{name}'"))),
    }
}

fn apply(function: &str, x: f64) -> Result<f64> {
    let value = match function {
        "sqrt" => x.sqrt(),
        "abs" => x.abs(),
        "exp" => x.exp(),
        "ln" | "log" => x.ln(),
        "log10" => x.log10(),
        "log2" => x.log2(),
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "asin" | "arcsin" => x.asin(),
        "acos" | "arccos" => x.acos(),
        "atan" | "arctan" => x.atan(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "round" => x.round(),
        _ => return Err(ToolError::Math(format!("unknown function '{function}'"))),
    };
    Ok(value)
}

/// Evaluate an arithmetic expression
pub fn evaluate(expr: &str) -> Result<f64> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ToolError::Math("empty expression".into()));
    }

    let mut parser = Parser::new(tokens);
    let value = parser.expr()?;

    if parser.pos < parser.tokens.len() {
        return Err(ToolError::Math(format!("could not evaluate '{}'", expr.trim())));
    }
    if !value.is_finite() {
        return Err(ToolError::Math(format!("'{}' is not a finite number", expr.trim())));
    }
    Ok(value)
}

/// Expression from a fenced ```text block
fn extract_expression(text: &str) -> Option<&str> {
    let start = text.find("```text")? + "```text".len();
    let rest = &text[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Calculator backed by a model for translating word problems
pub struct Calculator {
    model: ModelHandle,
}

impl Calculator {
    pub const fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    async fn translate(&self, question: &str) -> CoreResult<String> {
        let prompt = TRANSLATE_PROMPT.replace("{question}", question);
        let completion = self
            .model
            .complete_until(&[Message::user(prompt)], &[OUTPUT_STOP])
            .await?;
        let text = completion.content.trim();

        if let Some(expression) = extract_expression(text) {
            tracing::debug!(expression = %expression, "translated math problem");
            let value = evaluate(expression)?;
            return Ok(format!("Answer: {value}"));
        }
        if let Some(at) = text.find("Answer:") {
            return Ok(text[at..].to_string());
        }
        Err(ToolError::Math(format!("unknown format from model: {text}")).into())
    }
}

#[async_trait]
impl Capability for Calculator {
    async fn run(&self, input: &str) -> CoreResult<String> {
        match evaluate(input) {
            Ok(value) => Ok(format!("Answer: {value}")),
            Err(_) => self.translate(input).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use agent_core::testing::ScriptedProvider;
    use agent_core::{CapabilityDescriptor, CapabilitySchema};

    use super::*;

    fn approx(expr: &str, expected: f64) {
        let value = evaluate(expr).unwrap();
        assert!((value - expected).abs() < 1e-9, "{expr} = {value}, expected {expected}");
    }

    #[test]
    fn test_arithmetic() {
        approx("2 + 2", 4.0);
        approx("10 * 5", 50.0);
        approx("(2 + 3) * 4", 20.0);
        approx("2 ^ 8", 256.0);
        approx("37593**(1/5)", 8.222_831_614_237_718);
        approx("10 - 4 - 3", 3.0);
        approx("-2^2", -4.0);
        approx("2^-1", 0.5);
        approx("2^3^2", 512.0);
        approx("7 % 4", 3.0);
    }

    #[test]
    fn test_functions_and_constants() {
        approx("sqrt(16) + abs(-2)", 6.0);
        approx("2 * pi", std::f64::consts::TAU);
        approx("1.5e3 / 3", 500.0);
    }

    #[test]
    fn test_errors() {
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("what is two plus two").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("2 2").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let depth = 100_000;
        let parens = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let err = evaluate(&parens).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{err}");

        assert!(evaluate(&format!("{}1", "-".repeat(depth))).is_err());
        assert!(evaluate(&format!("2{}", "^2".repeat(depth))).is_err());
        approx(&format!("{}7{}", "(".repeat(20), ")".repeat(20)), 7.0);
    }

    #[tokio::test]
    async fn test_deep_nesting_through_descriptor() {
        let provider = ScriptedProvider::always("I cannot do math");
        let descriptor = CapabilityDescriptor::available(
            CapabilitySchema::new("llm-math", "math"),
            Arc::new(Calculator::new(provider.handle("gpt-3.5-turbo"))),
        );
        let input = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let out = descriptor.invoke(&input).await;
        assert!(out.starts_with("llm-math failed:"), "{out}");
    }

    #[test]
    fn test_integral_answers_have_no_fraction() {
        assert_eq!(format!("{}", evaluate("37593 * 67").unwrap()), "2518731");
    }

    #[tokio::test]
    async fn test_direct_expression_skips_model() {
        let provider = ScriptedProvider::always("unused");
        let calculator = Calculator::new(provider.handle("gpt-3.5-turbo"));
        assert_eq!(calculator.run("6 * 7").await.unwrap(), "Answer: 42");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_word_problem_is_translated() {
        let provider = ScriptedProvider::always("```text\n3 * 14\n```\n```output\n42\n```");
        let calculator = Calculator::new(provider.handle("gpt-3.5-turbo"));
        let answer = calculator.run("What is three times fourteen?").await.unwrap();
        assert_eq!(answer, "Answer: 42");
    }

    #[tokio::test]
    async fn test_unusable_translation_fails() {
        let provider = ScriptedProvider::always("I cannot do math");
        let calculator = Calculator::new(provider.handle("gpt-3.5-turbo"));
        assert!(calculator.run("how many apples?").await.is_err());
    }
}
