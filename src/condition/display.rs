use core::fmt::{self, Display, Write};

use super::{
    Attribute, AttributeSource, Expression, IntegerBase, IntegerSign, Level, Literal,
};
use crate::well_known;

impl Level {
    const fn above(self) -> Self {
        match self {
            Self::Or => Self::And,
            Self::And => Self::Not,
            Self::Not => Self::Comparison,
            Self::Comparison => Self::Predicate,
            Self::Predicate | Self::Primary => Self::Primary,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expression: &Expression, required: Level) -> fmt::Result {
    if expression.level() < required {
        write!(f, "({expression})")
    } else {
        write!(f, "{expression}")
    }
}

fn write_integer(f: &mut fmt::Formatter<'_>, value: i64, sign: IntegerSign, base: IntegerBase) -> fmt::Result {
    let bits = u64::from_ne_bytes(value.to_ne_bytes());
    let magnitude = match sign {
        // A minus marker on a positive value only comes from foreign binary input.
        IntegerSign::Negative if value > 0 => bits,
        IntegerSign::Negative => {
            f.write_char('-')?;
            bits.wrapping_neg()
        }
        IntegerSign::Positive => {
            f.write_char('+')?;
            bits
        }
        IntegerSign::None => bits,
    };
    match base {
        IntegerBase::Octal => write!(f, "0{magnitude:o}"),
        IntegerBase::Decimal => write!(f, "{magnitude}"),
        IntegerBase::Hexadecimal => write!(f, "0x{magnitude:x}"),
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\0' => f.write_str("\\0")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('"')
}

impl Display for Literal {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer { value, sign, base } => write_integer(f, *value, *sign, *base),
            Self::String(text) => write_string(f, text),
            Self::OctetString(bytes) => {
                f.write_char('#')?;
                bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
            Self::Sid(sid) => match well_known::sid_to_alias(sid, None) {
                Some(alias) => write!(f, "SID({alias})"),
                None => write!(f, "SID({sid})"),
            },
            Self::Composite(items) => {
                f.write_char('{')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char('}')
            }
        }
    }
}

impl Display for Attribute {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.source {
            AttributeSource::Local => "",
            AttributeSource::User => "@User.",
            AttributeSource::Resource => "@Resource.",
            AttributeSource::Device => "@Device.",
        };
        write!(f, "{prefix}{}", self.name)
    }
}

impl Display for Expression {
    /// Prints the expression with only the parentheses its structure requires.
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary { op, left, right } => {
                let level = op.level();
                let (left_level, right_level) = if level == Level::Comparison {
                    (Level::Predicate, Level::Predicate)
                } else {
                    (level, level.above())
                };
                write_operand(f, left, left_level)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, right_level)
            }
            Self::Unary { op, operand } => {
                let level = op.level();
                if level == Level::Not {
                    f.write_str(op.symbol())?;
                } else {
                    write!(f, "{} ", op.symbol())?;
                }
                write_operand(f, operand, level)
            }
            Self::Attribute(attribute) => write!(f, "{attribute}"),
            Self::Literal(literal) => write!(f, "{literal}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;
    use crate::condition::{BinaryOp, UnaryOp, parse_expression};
    use crate::sid::test::arb_sid;
    use proptest::prelude::*;

    fn arb_literal() -> impl Strategy<Value = Literal> {
        let integer = (
            prop_oneof![
                Just(IntegerSign::Positive),
                Just(IntegerSign::Negative),
                Just(IntegerSign::None)
            ],
            prop_oneof![
                Just(IntegerBase::Octal),
                Just(IntegerBase::Decimal),
                Just(IntegerBase::Hexadecimal)
            ],
            any::<u64>(),
        )
            .prop_map(|(sign, base, magnitude)| {
                let value = match sign {
                    IntegerSign::Negative => {
                        i64::from_ne_bytes((magnitude >> 1).to_ne_bytes()).wrapping_neg()
                    }
                    IntegerSign::Positive | IntegerSign::None => {
                        i64::from_ne_bytes(magnitude.to_ne_bytes())
                    }
                };
                Literal::Integer { value, sign, base }
            });
        let leaf = prop_oneof![
            integer,
            any::<String>().prop_map(Literal::String),
            proptest::collection::vec(any::<u8>(), 0..6).prop_map(Literal::OctetString),
            arb_sid().prop_map(Literal::Sid),
        ];
        leaf.prop_recursive(2, 8, 4, |inner| {
            proptest::collection::vec(inner, 0..4).prop_map(Literal::Composite)
        })
    }

    fn arb_attribute() -> impl Strategy<Value = Expression> {
        (
            prop_oneof![
                Just(AttributeSource::Local),
                Just(AttributeSource::User),
                Just(AttributeSource::Resource),
                Just(AttributeSource::Device)
            ],
            "[A-Za-z][A-Za-z0-9_]{0,8}",
        )
            .prop_map(|(source, name)| {
                let name = if source == AttributeSource::Local {
                    format!("WIN://{name}")
                } else {
                    name
                };
                Expression::attribute(source, name)
            })
    }

    fn arb_expression() -> impl Strategy<Value = Expression> {
        let leaf = prop_oneof![arb_attribute(), arb_literal().prop_map(Expression::Literal)];
        leaf.prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                (
                    prop_oneof![
                        Just(BinaryOp::Or),
                        Just(BinaryOp::And),
                        Just(BinaryOp::Equals),
                        Just(BinaryOp::GreaterThanOrEqual),
                        Just(BinaryOp::AnyOf),
                        Just(BinaryOp::NotContains)
                    ],
                    inner.clone(),
                    inner.clone()
                )
                    .prop_map(|(op, left, right)| Expression::binary(op, left, right)),
                (
                    prop_oneof![
                        Just(UnaryOp::Not),
                        Just(UnaryOp::Exists),
                        Just(UnaryOp::MemberOf),
                        Just(UnaryOp::NotDeviceMemberOfAny)
                    ],
                    inner
                )
                    .prop_map(|(op, operand)| Expression::unary(op, operand)),
            ]
        })
    }

    proptest! {
        #[test]
        fn text_round_trip(expr in arb_expression()) {
            let text = expr.to_string();
            prop_assert_eq!(parse_expression(&text).unwrap(), expr, "text was {}", text);
        }
    }

    #[test]
    fn tokenid_round_trip() {
        let expr = parse_expression("WIN://TokenId == \"TEST\"").unwrap();
        assert_eq!(expr.to_string(), "WIN://TokenId == \"TEST\"");
        assert_eq!(parse_expression(&expr.to_string()).unwrap(), expr);
    }

    #[test]
    fn minimal_parentheses() {
        let cases = [
            ("(@User.a || @User.b) && @User.c", "(@User.a || @User.b) && @User.c"),
            ("@User.a || (@User.b || @User.c)", "@User.a || (@User.b || @User.c)"),
            ("(@User.a || @User.b) || @User.c", "@User.a || @User.b || @User.c"),
            ("!(@User.a && @User.b)", "!(@User.a && @User.b)"),
            ("((@User.a == 1))", "@User.a == 1"),
            ("(@User.a == 1) == 2", "(@User.a == 1) == 2"),
            ("Member_of ({SID(BA), SID(S-1-5-21-1-2-3-4)})", "Member_of {SID(BA), SID(S-1-5-21-1-2-3-4)}"),
            ("@User.n >= -0x1F", "@User.n >= -0x1f"),
            ("@User.s == \"a\\\"b\"", "@User.s == \"a\\\"b\""),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_expression(input).unwrap().to_string(), expected, "input {input}");
        }
    }

    #[test]
    fn minus_marker_on_positive_value_is_dropped() {
        let literal = |sign| Literal::Integer {
            value: 5,
            sign,
            base: IntegerBase::Hexadecimal,
        };
        let text = literal(IntegerSign::Negative).to_string();
        assert_eq!(text, "0x5");
        assert_eq!(
            parse_expression(&text).unwrap(),
            Expression::Literal(literal(IntegerSign::None))
        );
    }
}
