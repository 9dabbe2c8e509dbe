//! Conditional ACE expressions.
//!
//! Callback ACEs carry a boolean expression over user, device, resource and local
//! claims. This module holds the expression tree, the text grammar used inside SDDL
//! and the `artx` binary token stream stored in the ACE.
//!
//! Precedence, lowest first: `||`, `&&`, `!`, comparisons (`==`, `!=`, `<`, `<=`, `>`,
//! `>=`, `Contains`, `Any_of`, ...), prefix predicates (`Member_of`, `Exists`, ...),
//! then attributes, literals and parenthesized expressions.
//!
//! ```rust
//! # use win_security_descriptor::condition::{self, Expression};
//! let expr: Expression = r#"(@User.Title == "PM") && Member_of {SID(BA)}"#.parse().unwrap();
//! assert_eq!(expr.to_string(), r#"@User.Title == "PM" && Member_of {SID(BA)}"#);
//! let bytes = condition::encode(&expr).unwrap();
//! assert!(bytes.starts_with(b"artx"));
//! assert_eq!(condition::decode(&bytes).unwrap(), expr);
//! ```

mod codec;
mod display;
mod parser;

use core::str::FromStr;

pub use codec::{decode, encode};
pub(crate) use codec::stream_len;
pub use parser::{parse_expression, parse_expression_with};

use crate::Sid;
use crate::error::Error;

/// Deepest expression tree accepted by the parser and the decoder, counting
/// operators, parentheses and nested composites.
pub const MAX_DEPTH: usize = 256;

/// Where an attribute value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSource {
    /// A local attribute such as `WIN://SYSAPPID`.
    Local,
    /// `@User.`
    User,
    /// `@Resource.` (also written as a bare `@Name`).
    Resource,
    /// `@Device.`
    Device,
}

/// A reference to a claim attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Attribute source.
    pub source: AttributeSource,
    /// Name without the `@Source.` prefix.
    pub name: String,
}

/// Sign marker kept with integer literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerSign {
    /// Written with `+`.
    Positive,
    /// Written with `-`.
    Negative,
    /// Written without sign.
    None,
}

/// Base an integer literal was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerBase {
    /// Leading `0`.
    Octal,
    /// Plain digits.
    Decimal,
    /// Leading `0x`.
    Hexadecimal,
}

/// Literal operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// 64-bit integer. Unsigned values above `i64::MAX` keep their bit pattern.
    Integer {
        /// Raw value.
        value: i64,
        /// Sign as written.
        sign: IntegerSign,
        /// Base as written.
        base: IntegerBase,
    },
    /// `"text"`
    String(String),
    /// `#0a0b`
    OctetString(Vec<u8>),
    /// `SID(S-1-...)` or `SID(alias)`
    Sid(Sid),
    /// `{a, b, ...}`; may be empty.
    Composite(Vec<Literal>),
}

impl Literal {
    /// A decimal integer literal written without sign.
    #[inline]
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Integer {
            value,
            sign: IntegerSign::None,
            base: IntegerBase::Decimal,
        }
    }
}

/// Two-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `Contains`
    Contains,
    /// `Any_of`
    AnyOf,
    /// `All_of`; accepted in text, has no binary token.
    AllOf,
    /// `Not_Contains`
    NotContains,
    /// `Not_Any_of`
    NotAnyOf,
}

/// One-operand operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `Exists`
    Exists,
    /// `Not_Exists`
    NotExists,
    /// `Member_of`
    MemberOf,
    /// `Device_Member_of`
    DeviceMemberOf,
    /// `Member_of_Any`
    MemberOfAny,
    /// `Device_Member_of_Any`
    DeviceMemberOfAny,
    /// `Not_Member_of`
    NotMemberOf,
    /// `Not_Device_Member_of`
    NotDeviceMemberOf,
    /// `Not_Member_of_Any`
    NotMemberOfAny,
    /// `Not_Device_Member_of_Any`
    NotDeviceMemberOfAny,
}

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Level {
    Or,
    And,
    Not,
    Comparison,
    Predicate,
    Primary,
}

impl BinaryOp {
    pub(crate) const KEYWORDS: [(&'static str, Self); 5] = [
        ("Contains", Self::Contains),
        ("Any_of", Self::AnyOf),
        ("All_of", Self::AllOf),
        ("Not_Contains", Self::NotContains),
        ("Not_Any_of", Self::NotAnyOf),
    ];

    /// Text form.
    #[inline]
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Contains => "Contains",
            Self::AnyOf => "Any_of",
            Self::AllOf => "All_of",
            Self::NotContains => "Not_Contains",
            Self::NotAnyOf => "Not_Any_of",
        }
    }

    pub(crate) const fn level(self) -> Level {
        match self {
            Self::Or => Level::Or,
            Self::And => Level::And,
            _ => Level::Comparison,
        }
    }

    /// Binary token, `None` for `All_of`.
    #[inline]
    #[must_use]
    pub const fn opcode(self) -> Option<u8> {
        Some(match self {
            Self::Equals => 0x80,
            Self::NotEquals => 0x81,
            Self::LessThan => 0x82,
            Self::LessThanOrEqual => 0x83,
            Self::GreaterThan => 0x84,
            Self::GreaterThanOrEqual => 0x85,
            Self::Contains => 0x86,
            Self::AnyOf => 0x88,
            Self::NotContains => 0x8e,
            Self::NotAnyOf => 0x8f,
            Self::And => 0xa0,
            Self::Or => 0xa1,
            Self::AllOf => return None,
        })
    }

    pub(crate) const fn from_opcode(opcode: u8) -> Option<Self> {
        Some(match opcode {
            0x80 => Self::Equals,
            0x81 => Self::NotEquals,
            0x82 => Self::LessThan,
            0x83 => Self::LessThanOrEqual,
            0x84 => Self::GreaterThan,
            0x85 => Self::GreaterThanOrEqual,
            0x86 => Self::Contains,
            0x88 => Self::AnyOf,
            0x8e => Self::NotContains,
            0x8f => Self::NotAnyOf,
            0xa0 => Self::And,
            0xa1 => Self::Or,
            _ => return None,
        })
    }
}

impl UnaryOp {
    pub(crate) const KEYWORDS: [(&'static str, Self); 10] = [
        ("Exists", Self::Exists),
        ("Not_Exists", Self::NotExists),
        ("Member_of", Self::MemberOf),
        ("Device_Member_of", Self::DeviceMemberOf),
        ("Member_of_Any", Self::MemberOfAny),
        ("Device_Member_of_Any", Self::DeviceMemberOfAny),
        ("Not_Member_of", Self::NotMemberOf),
        ("Not_Device_Member_of", Self::NotDeviceMemberOf),
        ("Not_Member_of_Any", Self::NotMemberOfAny),
        ("Not_Device_Member_of_Any", Self::NotDeviceMemberOfAny),
    ];

    /// Text form.
    #[inline]
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Exists => "Exists",
            Self::NotExists => "Not_Exists",
            Self::MemberOf => "Member_of",
            Self::DeviceMemberOf => "Device_Member_of",
            Self::MemberOfAny => "Member_of_Any",
            Self::DeviceMemberOfAny => "Device_Member_of_Any",
            Self::NotMemberOf => "Not_Member_of",
            Self::NotDeviceMemberOf => "Not_Device_Member_of",
            Self::NotMemberOfAny => "Not_Member_of_Any",
            Self::NotDeviceMemberOfAny => "Not_Device_Member_of_Any",
        }
    }

    pub(crate) const fn level(self) -> Level {
        match self {
            Self::Not => Level::Not,
            _ => Level::Predicate,
        }
    }

    /// Binary token.
    #[inline]
    #[must_use]
    pub const fn opcode(self) -> u8 {
        match self {
            Self::Exists => 0x87,
            Self::MemberOf => 0x89,
            Self::DeviceMemberOf => 0x8a,
            Self::MemberOfAny => 0x8b,
            Self::DeviceMemberOfAny => 0x8c,
            Self::NotExists => 0x8d,
            Self::NotMemberOf => 0x90,
            Self::NotDeviceMemberOf => 0x91,
            Self::NotMemberOfAny => 0x92,
            Self::NotDeviceMemberOfAny => 0x93,
            Self::Not => 0xa2,
        }
    }

    pub(crate) const fn from_opcode(opcode: u8) -> Option<Self> {
        Some(match opcode {
            0x87 => Self::Exists,
            0x89 => Self::MemberOf,
            0x8a => Self::DeviceMemberOf,
            0x8b => Self::MemberOfAny,
            0x8c => Self::DeviceMemberOfAny,
            0x8d => Self::NotExists,
            0x90 => Self::NotMemberOf,
            0x91 => Self::NotDeviceMemberOf,
            0x92 => Self::NotMemberOfAny,
            0x93 => Self::NotDeviceMemberOfAny,
            0xa2 => Self::Not,
            _ => return None,
        })
    }
}

/// A conditional expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Logical connective or comparison.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// Negation or prefix predicate.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expression>,
    },
    /// Attribute reference.
    Attribute(Attribute),
    /// Literal value.
    Literal(Literal),
}

impl Expression {
    /// Builds a binary node.
    #[inline]
    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Builds a unary node.
    #[inline]
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Builds an attribute reference.
    #[inline]
    #[must_use]
    pub fn attribute(source: AttributeSource, name: impl Into<String>) -> Self {
        Self::Attribute(Attribute {
            source,
            name: name.into(),
        })
    }

    pub(crate) const fn level(&self) -> Level {
        match self {
            Self::Binary { op, .. } => op.level(),
            Self::Unary { op, .. } => op.level(),
            Self::Attribute(_) | Self::Literal(_) => Level::Primary,
        }
    }
}

impl FromStr for Expression {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression(s)
    }
}
