use log::trace;

use super::{
    Attribute, AttributeSource, BinaryOp, Expression, IntegerBase, IntegerSign, Literal, MAX_DEPTH,
    UnaryOp,
};
use crate::error::{Error, Result};
use crate::{Sid, well_known};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Not,
    Binary(BinaryOp),
    Unary(UnaryOp),
    Attribute(Attribute),
    Literal(Literal),
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '/' | '.')
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    domain: Option<&'a Sid>,
}

impl<'a> Lexer<'a> {
    /// Character position of byte offset `at`, for error reporting.
    fn position(&self, at: usize) -> usize {
        self.text.get(..at).map_or(at, |prefix| prefix.chars().count())
    }

    fn error(&self, at: usize, message: impl Into<String>) -> Error {
        Error::syntax(self.position(at), message)
    }

    fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or_default()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        self.text.get(start..self.pos).unwrap_or_default()
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        // Character position of byte offset `counted`, advanced token by token.
        let (mut counted, mut position) = (0, 0);
        loop {
            self.take_while(char::is_whitespace);
            let start = self.pos;
            let Some(c) = self.peek() else {
                break;
            };
            position += self.text.get(counted..start).map_or(0, |skipped| skipped.chars().count());
            counted = start;
            let token = match c {
                '(' => {
                    self.bump();
                    Token::LParen
                }
                ')' => {
                    self.bump();
                    Token::RParen
                }
                '{' => {
                    self.bump();
                    Token::LBrace
                }
                '}' => {
                    self.bump();
                    Token::RBrace
                }
                ',' => {
                    self.bump();
                    Token::Comma
                }
                '"' => Token::Literal(Literal::String(self.string()?)),
                '#' => Token::Literal(self.octets()?),
                '@' => Token::Attribute(self.attribute()?),
                '0'..='9' | '+' | '-' => Token::Literal(self.integer()?),
                _ => {
                    if let Some(op) = self.operator() {
                        op
                    } else if is_name_char(c) {
                        self.word()?
                    } else {
                        return Err(self.error(start, format!("unexpected character '{c}'")));
                    }
                }
            };
            tokens.push((token, position));
        }
        Ok(tokens)
    }

    fn operator(&mut self) -> Option<Token> {
        const OPERATORS: [(&str, BinaryOp); 8] = [
            ("||", BinaryOp::Or),
            ("&&", BinaryOp::And),
            ("==", BinaryOp::Equals),
            ("!=", BinaryOp::NotEquals),
            ("<=", BinaryOp::LessThanOrEqual),
            (">=", BinaryOp::GreaterThanOrEqual),
            ("<", BinaryOp::LessThan),
            (">", BinaryOp::GreaterThan),
        ];
        if let Some((_, op)) = OPERATORS.iter().find(|(symbol, _)| self.eat(symbol)) {
            return Some(Token::Binary(*op));
        }
        self.eat("!").then_some(Token::Not)
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated string literal")),
                Some('"') => return Ok(out),
                Some('\0') => {
                    return Err(self.error(self.pos - 1, "NUL in string literal, use \\0"));
                }
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('0') => '\0',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(other) => {
                            return Err(self.error(self.pos - other.len_utf8() - 1, format!("unknown escape '\\{other}'")));
                        }
                        None => return Err(self.error(start, "unterminated string literal")),
                    };
                    out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn octets(&mut self) -> Result<Literal> {
        let start = self.pos;
        self.bump();
        let digits = self.take_while(|c| c.is_ascii_hexdigit());
        if digits.len() % 2 != 0 {
            return Err(self.error(start, "octet string needs an even number of hex digits"));
        }
        let bytes = (0..digits.len())
            .step_by(2)
            .map(|i| {
                digits
                    .get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| self.error(start, "malformed octet string"))
            })
            .collect::<Result<Vec<u8>>>()?;
        Ok(Literal::OctetString(bytes))
    }

    fn attribute(&mut self) -> Result<Attribute> {
        let start = self.pos;
        self.bump();
        let word = self.take_while(is_name_char);
        let prefixes = [
            ("User.", AttributeSource::User),
            ("Device.", AttributeSource::Device),
            ("Resource.", AttributeSource::Resource),
        ];
        let (source, name) = prefixes
            .iter()
            .find_map(|(prefix, source)| {
                word.get(..prefix.len())
                    .filter(|head| head.eq_ignore_ascii_case(prefix))
                    .and_then(|_| word.get(prefix.len()..))
                    .map(|name| (*source, name))
            })
            .unwrap_or((AttributeSource::Resource, word));
        if name.is_empty() {
            return Err(self.error(start, "missing attribute name"));
        }
        Ok(Attribute {
            source,
            name: name.to_owned(),
        })
    }

    fn integer(&mut self) -> Result<Literal> {
        let start = self.pos;
        let sign = if self.eat("-") {
            IntegerSign::Negative
        } else if self.eat("+") {
            IntegerSign::Positive
        } else {
            IntegerSign::None
        };
        let (base, radix) = if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.pos += 2;
            (IntegerBase::Hexadecimal, 16)
        } else if self.rest().starts_with('0')
            && self.rest().chars().nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.pos += 1;
            (IntegerBase::Octal, 8)
        } else {
            (IntegerBase::Decimal, 10)
        };
        let digits = self.take_while(|c| c.is_ascii_alphanumeric());
        if digits.is_empty() {
            return Err(self.error(start, "expected digits"));
        }
        if !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(self.error(start, format!("invalid digits \"{digits}\" for base {radix}")));
        }
        let magnitude = u64::from_str_radix(digits, radix)
            .map_err(|_| self.error(start, "integer literal exceeds 64 bits"))?;
        let value = match sign {
            IntegerSign::Negative => {
                if magnitude > i64::MIN.unsigned_abs() {
                    return Err(self.error(start, "integer literal exceeds 64 bits"));
                }
                i64::from_ne_bytes(magnitude.to_ne_bytes()).wrapping_neg()
            }
            IntegerSign::Positive | IntegerSign::None => {
                i64::from_ne_bytes(magnitude.to_ne_bytes())
            }
        };
        Ok(Literal::Integer { value, sign, base })
    }

    fn word(&mut self) -> Result<Token> {
        let start = self.pos;
        let word = self.take_while(is_name_char);
        if word.eq_ignore_ascii_case("SID") && self.peek() == Some('(') {
            return self.sid_literal(start);
        }
        if let Some((_, op)) = BinaryOp::KEYWORDS
            .iter()
            .find(|(keyword, _)| keyword.eq_ignore_ascii_case(word))
        {
            return Ok(Token::Binary(*op));
        }
        if let Some((_, op)) = UnaryOp::KEYWORDS
            .iter()
            .find(|(keyword, _)| keyword.eq_ignore_ascii_case(word))
        {
            return Ok(Token::Unary(*op));
        }
        Ok(Token::Attribute(Attribute {
            source: AttributeSource::Local,
            name: word.to_owned(),
        }))
    }

    fn sid_literal(&mut self, start: usize) -> Result<Token> {
        self.bump();
        let inner = self.take_while(|c| c != ')');
        if !self.eat(")") {
            return Err(self.error(start, "unterminated SID literal"));
        }
        let inner = inner.trim();
        let sid = if inner.len() == 2 {
            well_known::alias_to_sid(inner, self.domain)
        } else {
            inner.parse::<Sid>().ok()
        };
        sid.map(|sid| Token::Literal(Literal::Sid(sid)))
            .ok_or_else(|| self.error(start, format!("invalid SID \"{inner}\"")))
    }
}

/// An expression with the depth of its tree.
type Node = (Expression, usize);

fn too_deep(position: usize) -> Error {
    Error::syntax(position, format!("expression nested deeper than {MAX_DEPTH} levels"))
}

/// Depth of a node built at `position` over children of depth `children`.
fn deeper(position: usize, children: usize) -> Result<usize> {
    if children < MAX_DEPTH {
        Ok(children + 1)
    } else {
        Err(too_deep(position))
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
    end: usize,
    /// Open parentheses, braces and prefix operators around the current token.
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(token, _)| token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.index).map_or(self.end, |(_, at)| *at)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|(token, _)| token.clone());
        self.index += 1;
        token
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        if self.peek() == Some(expected) {
            self.index += 1;
            Ok(())
        } else {
            Err(Error::syntax(self.position(), format!("expected {what}")))
        }
    }

    /// Runs `parse` one nesting level further in.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.nesting >= MAX_DEPTH {
            return Err(too_deep(self.position()));
        }
        self.nesting += 1;
        let parsed = parse(self);
        self.nesting -= 1;
        parsed
    }

    fn or(&mut self) -> Result<Node> {
        let (mut left, mut depth) = self.and()?;
        while self.peek() == Some(&Token::Binary(BinaryOp::Or)) {
            let at = self.position();
            self.index += 1;
            let (right, right_depth) = self.and()?;
            depth = deeper(at, depth.max(right_depth))?;
            left = Expression::binary(BinaryOp::Or, left, right);
        }
        Ok((left, depth))
    }

    fn and(&mut self) -> Result<Node> {
        let (mut left, mut depth) = self.unary()?;
        while self.peek() == Some(&Token::Binary(BinaryOp::And)) {
            let at = self.position();
            self.index += 1;
            let (right, right_depth) = self.unary()?;
            depth = deeper(at, depth.max(right_depth))?;
            left = Expression::binary(BinaryOp::And, left, right);
        }
        Ok((left, depth))
    }

    fn unary(&mut self) -> Result<Node> {
        if self.peek() == Some(&Token::Not) {
            let at = self.position();
            self.index += 1;
            let (operand, depth) = self.nested(Self::unary)?;
            return Ok((Expression::unary(UnaryOp::Not, operand), deeper(at, depth)?));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Node> {
        let (left, left_depth) = self.predicate()?;
        match self.peek() {
            Some(Token::Binary(op)) if !matches!(op, BinaryOp::And | BinaryOp::Or) => {
                let op = *op;
                let at = self.position();
                self.index += 1;
                let (right, right_depth) = self.predicate()?;
                let depth = deeper(at, left_depth.max(right_depth))?;
                Ok((Expression::binary(op, left, right), depth))
            }
            _ => Ok((left, left_depth)),
        }
    }

    fn predicate(&mut self) -> Result<Node> {
        if let Some(Token::Unary(op)) = self.peek() {
            let op = *op;
            let at = self.position();
            self.index += 1;
            let (operand, depth) = self.nested(Self::predicate)?;
            return Ok((Expression::unary(op, operand), deeper(at, depth)?));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Node> {
        let at = self.position();
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.nested(Self::or)?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Attribute(attribute)) => Ok((Expression::Attribute(attribute), 1)),
            Some(Token::Literal(literal)) => Ok((Expression::Literal(literal), 1)),
            Some(Token::LBrace) => {
                let literal = self.nested(Self::composite)?;
                Ok((Expression::Literal(literal), 1))
            }
            Some(other) => Err(Error::syntax(at, format!("unexpected token {other:?}"))),
            None => Err(Error::syntax(at, "unexpected end of expression")),
        }
    }

    fn literal(&mut self) -> Result<Literal> {
        let at = self.position();
        match self.next() {
            Some(Token::Literal(literal)) => Ok(literal),
            Some(Token::LBrace) => self.nested(Self::composite),
            _ => Err(Error::syntax(at, "expected a literal")),
        }
    }

    /// Parses the rest of `{...}` after the opening brace.
    fn composite(&mut self) -> Result<Literal> {
        let mut items = Vec::new();
        if self.peek() == Some(&Token::RBrace) {
            self.index += 1;
            return Ok(Literal::Composite(items));
        }
        loop {
            items.push(self.literal()?);
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::RBrace) => return Ok(Literal::Composite(items)),
                _ => {
                    return Err(Error::syntax(
                        self.tokens.get(self.index - 1).map_or(self.end, |(_, at)| *at),
                        "expected ',' or '}'",
                    ));
                }
            }
        }
    }
}

/// Parses the text form of a conditional expression.
///
/// # Errors
/// [`Error::Syntax`] with the character position of the first fault, including
/// expressions nested deeper than [`MAX_DEPTH`].
#[inline]
pub fn parse_expression(text: &str) -> Result<Expression> {
    parse_expression_with(text, None)
}

/// Like [`parse_expression`], resolving domain-relative aliases in `SID(..)`
/// literals against `domain`.
///
/// # Errors
/// [`Error::Syntax`] with the character position of the first fault.
#[inline]
pub fn parse_expression_with(text: &str, domain: Option<&Sid>) -> Result<Expression> {
    let lexer = Lexer {
        text,
        pos: 0,
        domain,
    };
    let tokens = lexer.tokenize()?;
    trace!("conditional expression tokens: {tokens:?}");
    let mut parser = Parser {
        tokens,
        index: 0,
        end: text.chars().count(),
        nesting: 0,
    };
    let (expression, _) = parser.or()?;
    if parser.index < parser.tokens.len() {
        return Err(Error::syntax(parser.position(), "unexpected trailing input"));
    }
    Ok(expression)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
#[allow(clippy::panic, reason = "Panic is how a test fails")]
mod test {
    use super::*;

    fn attr(source: AttributeSource, name: &str) -> Expression {
        Expression::attribute(source, name)
    }

    fn position_of(text: &str) -> usize {
        match parse_expression(text) {
            Err(Error::Syntax { position, .. }) => position,
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn local_attribute_comparison() {
        let expr = parse_expression("WIN://TokenId == \"TEST\"").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOp::Equals,
                attr(AttributeSource::Local, "WIN://TokenId"),
                Expression::Literal(Literal::String("TEST".into()))
            )
        );
    }

    #[test]
    fn precedence() {
        let expr = parse_expression("!@User.a || @User.b && Member_of {SID(BA)}").unwrap();
        let Expression::Binary { op: BinaryOp::Or, left, right } = expr else {
            panic!("|| must bind loosest");
        };
        assert!(matches!(*left, Expression::Unary { op: UnaryOp::Not, .. }));
        let Expression::Binary { op: BinaryOp::And, right: member, .. } = *right else {
            panic!("&& binds tighter than ||");
        };
        assert_eq!(
            *member,
            Expression::unary(
                UnaryOp::MemberOf,
                Expression::Literal(Literal::Composite(vec![Literal::Sid(
                    well_known::BUILTIN_ADMINISTRATORS
                )]))
            )
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            parse_expression("@device.os any_of {\"a\"}").unwrap(),
            parse_expression("@Device.os Any_of {\"a\"}").unwrap()
        );
    }

    #[test]
    fn bare_at_name_is_a_resource_attribute() {
        assert_eq!(
            parse_expression("@Dept").unwrap(),
            attr(AttributeSource::Resource, "Dept")
        );
    }

    #[test]
    fn integer_forms() {
        let lit = |text: &str| match parse_expression(text).unwrap() {
            Expression::Literal(literal) => literal,
            other => panic!("not a literal: {other:?}"),
        };
        assert_eq!(
            lit("-0x10"),
            Literal::Integer {
                value: -16,
                sign: IntegerSign::Negative,
                base: IntegerBase::Hexadecimal
            }
        );
        assert_eq!(
            lit("017"),
            Literal::Integer {
                value: 15,
                sign: IntegerSign::None,
                base: IntegerBase::Octal
            }
        );
        assert_eq!(
            lit("18446744073709551615"),
            Literal::Integer {
                value: -1,
                sign: IntegerSign::None,
                base: IntegerBase::Decimal
            }
        );
        assert_eq!(lit("-9223372036854775808"), Literal::Integer {
            value: i64::MIN,
            sign: IntegerSign::Negative,
            base: IntegerBase::Decimal
        });
        assert_eq!(position_of("@User.x == 18446744073709551616"), 11);
        assert_eq!(position_of("@User.x == 09"), 11);
    }

    #[test]
    fn empty_composite_and_octets() {
        assert_eq!(
            parse_expression("@User.x Any_of {}").unwrap(),
            Expression::binary(
                BinaryOp::AnyOf,
                attr(AttributeSource::User, "x"),
                Expression::Literal(Literal::Composite(Vec::new()))
            )
        );
        assert_eq!(
            parse_expression("#01ff").unwrap(),
            Expression::Literal(Literal::OctetString(vec![1, 0xff]))
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            parse_expression(r#""a\"b\\c\0""#).unwrap(),
            Expression::Literal(Literal::String("a\"b\\c\0".into()))
        );
        assert_eq!(position_of("\"a\0b\""), 2);
    }

    #[test]
    fn syntax_errors_carry_positions() {
        assert_eq!(position_of("(@User.a == 1"), 13);
        assert_eq!(position_of("@User.a == \"open"), 11);
        assert_eq!(position_of("@User.a == 1)"), 12);
        assert_eq!(position_of("@User.a $ 1"), 8);
        assert_eq!(position_of("Member_of {SID(S-1-x)}"), 11);
    }

    #[test]
    fn domain_relative_sid_alias() {
        let domain: Sid = "S-1-5-21-1-2-3".parse().unwrap();
        assert!(parse_expression("Member_of {SID(DA)}").is_err());
        let expr = parse_expression_with("Member_of {SID(DA)}", Some(&domain)).unwrap();
        let Expression::Unary { operand, .. } = expr else {
            panic!("expected a predicate");
        };
        assert_eq!(
            *operand,
            Expression::Literal(Literal::Composite(vec![Literal::Sid(
                domain.with_rid(512).unwrap()
            )]))
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let parens = |depth: usize| format!("{}@User.a{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(
            parse_expression(&parens(100)).unwrap(),
            attr(AttributeSource::User, "a")
        );
        assert_eq!(position_of(&parens(20_000)), MAX_DEPTH + 1);

        assert!(parse_expression(&format!("{}(@User.a)", "!".repeat(MAX_DEPTH - 1))).is_ok());
        assert_eq!(position_of(&format!("{}(@User.a)", "!".repeat(20_000))), MAX_DEPTH + 1);
        assert!(matches!(
            parse_expression(&"Exists ".repeat(20_000)),
            Err(Error::Syntax { .. })
        ));

        let braces = format!("@User.a Any_of {}{}", "{".repeat(20_000), "}".repeat(20_000));
        assert!(matches!(parse_expression(&braces), Err(Error::Syntax { .. })));
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        let chain = |terms: usize| vec!["@User.a == 1"; terms].join(" || ");
        assert!(parse_expression(&chain(100)).is_ok());
        assert!(matches!(
            parse_expression(&chain(MAX_DEPTH + 1)),
            Err(Error::Syntax { .. })
        ));
    }
}
