//! Tokenizer for template expressions.

use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Op(op) => (*op).to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        }
    }
}

/// Operators recognised by the lexer, longest first so that `<=` wins over `<`.
const OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "=>", "=<", "+", "-", "*", "/", "^", "<", ">"];

/// Split `source` into tokens.
///
/// ```text
/// "c+9 <= 17" -> [Ident(c), Op(+), Number(9), Op(<=), Number(17)]
/// ```
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let re = regex!(
        r"(?x)^\s*(?:
            (?P<num>(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)
            | (?P<ident>[A-Za-z_][A-Za-z0-9_]*)
            | (?P<op>==|!=|<=|>=|=>|=<|[-+*/^<>])
            | (?P<lparen>\()
            | (?P<rparen>\))
        )"
    );

    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < source.len() {
        let rest = &source[offset..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }

        let Some(caps) = re.captures(rest) else {
            let skipped = rest.len() - trimmed.len();
            let found = trimmed.chars().next().unwrap_or(' ');
            return Err(ExprError::UnexpectedChar { expr: source.to_string(), offset: offset + skipped, found });
        };

        let token = if let Some(num) = caps.name("num") {
            let value = num
                .as_str()
                .parse::<f64>()
                .map_err(|_| ExprError::UnexpectedToken { expr: source.to_string(), found: num.as_str().to_string() })?;
            Token::Number(value)
        } else if let Some(ident) = caps.name("ident") {
            Token::Ident(ident.as_str().to_string())
        } else if let Some(op) = caps.name("op") {
            let op = OPERATORS.iter().copied().find(|candidate| *candidate == op.as_str()).ok_or_else(|| {
                ExprError::UnexpectedToken { expr: source.to_string(), found: op.as_str().to_string() }
            })?;
            Token::Op(op)
        } else if caps.name("lparen").is_some() {
            Token::LParen
        } else {
            Token::RParen
        };

        tokens.push(token);
        offset += caps.get(0).map(|m| m.end()).unwrap_or(rest.len());
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_templates() {
        let tokens = tokenize("c+9 <= 17").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Ident("c".into()), Token::Op("+"), Token::Number(9.0), Token::Op("<="), Token::Number(17.0)]
        );
    }

    #[test]
    fn tokenizes_decimals_and_parens() {
        let tokens = tokenize("(.5 * v) / 1e2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Number(0.5),
                Token::Op("*"),
                Token::Ident("v".into()),
                Token::RParen,
                Token::Op("/"),
                Token::Number(100.0),
            ]
        );
    }

    #[test]
    fn arrow_is_its_own_operator() {
        let tokens = tokenize("c => 1").unwrap();
        assert_eq!(tokens[1], Token::Op("=>"));
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("v % 2").unwrap_err();
        assert_eq!(err, ExprError::UnexpectedChar { expr: "v % 2".into(), offset: 2, found: '%' });
    }

    #[test]
    fn blank_input_has_no_tokens() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
