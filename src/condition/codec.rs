use log::trace;
use smallvec::SmallVec;

use super::{
    Attribute, AttributeSource, BinaryOp, Expression, IntegerBase, IntegerSign, Literal, MAX_DEPTH,
    UnaryOp,
};
use crate::Sid;
use crate::error::{Error, Result};
use crate::utils::{Reader, decode_utf16, encode_utf16, put_u32, wire_u32};

/// Leading bytes of every encoded expression.
pub const SIGNATURE: [u8; 4] = *b"artx";

const INT8: u8 = 0x01;
const INT16: u8 = 0x02;
const INT32: u8 = 0x03;
const INT64: u8 = 0x04;
const UNICODE_STRING: u8 = 0x10;
const OCTET_STRING: u8 = 0x18;
const COMPOSITE: u8 = 0x50;
const SID: u8 = 0x51;
const LOCAL_ATTRIBUTE: u8 = 0xf8;
const USER_ATTRIBUTE: u8 = 0xf9;
const RESOURCE_ATTRIBUTE: u8 = 0xfa;
const DEVICE_ATTRIBUTE: u8 = 0xfb;
const PADDING: u8 = 0x00;

const fn attribute_opcode(source: AttributeSource) -> u8 {
    match source {
        AttributeSource::Local => LOCAL_ATTRIBUTE,
        AttributeSource::User => USER_ATTRIBUTE,
        AttributeSource::Resource => RESOURCE_ATTRIBUTE,
        AttributeSource::Device => DEVICE_ATTRIBUTE,
    }
}

fn put_blob(out: &mut Vec<u8>, opcode: u8, blob: &[u8]) -> Result<()> {
    out.push(opcode);
    put_u32(out, wire_u32("conditional expression operand", blob.len())?);
    out.extend_from_slice(blob);
    Ok(())
}

fn encode_literal(literal: &Literal, out: &mut Vec<u8>) -> Result<()> {
    match literal {
        Literal::Integer { value, sign, base } => {
            out.push(INT64);
            out.extend_from_slice(&value.to_le_bytes());
            out.push(match sign {
                IntegerSign::Positive => 1,
                IntegerSign::Negative => 2,
                IntegerSign::None => 3,
            });
            out.push(match base {
                IntegerBase::Octal => 1,
                IntegerBase::Decimal => 2,
                IntegerBase::Hexadecimal => 3,
            });
        }
        Literal::String(text) => put_blob(out, UNICODE_STRING, &encode_utf16(text))?,
        Literal::OctetString(bytes) => put_blob(out, OCTET_STRING, bytes)?,
        Literal::Sid(sid) => put_blob(out, SID, &sid.to_bytes())?,
        Literal::Composite(items) => {
            let mut inner = Vec::new();
            for item in items {
                encode_literal(item, &mut inner)?;
            }
            put_blob(out, COMPOSITE, &inner)?;
        }
    }
    Ok(())
}

fn encode_node(expression: &Expression, out: &mut Vec<u8>) -> Result<()> {
    match expression {
        Expression::Binary { op, left, right } => {
            let opcode = op
                .opcode()
                .ok_or(Error::UnsupportedConstruct("All_of has no binary token"))?;
            encode_node(left, out)?;
            encode_node(right, out)?;
            out.push(opcode);
        }
        Expression::Unary { op, operand } => {
            encode_node(operand, out)?;
            out.push(op.opcode());
        }
        Expression::Attribute(attribute) => put_blob(
            out,
            attribute_opcode(attribute.source),
            &encode_utf16(&attribute.name),
        )?,
        Expression::Literal(literal) => encode_literal(literal, out)?,
    }
    Ok(())
}

/// Encodes an expression as the `artx` token stream stored in callback ACEs,
/// zero-padded to a multiple of four bytes.
///
/// # Errors
/// [`Error::UnsupportedConstruct`] when the tree contains `All_of`,
/// [`Error::TooLarge`] for an operand longer than its 32-bit length prefix.
#[inline]
pub fn encode(expression: &Expression) -> Result<Vec<u8>> {
    let mut out = SIGNATURE.to_vec();
    encode_node(expression, &mut out)?;
    while out.len() % 4 != 0 {
        out.push(PADDING);
    }
    Ok(out)
}

fn read_blob<'a>(reader: &mut Reader<'a>) -> Result<(usize, &'a [u8])> {
    let len = reader.u32()? as usize;
    let at = reader.offset();
    Ok((at, reader.take(len)?))
}

/// Reads the operand of a literal token; `depth` counts the composites around it.
fn read_literal(
    opcode: u8,
    offset: usize,
    reader: &mut Reader<'_>,
    depth: usize,
) -> Result<Option<Literal>> {
    let literal = match opcode {
        INT8 | INT16 | INT32 | INT64 => {
            let value = i64::from_le_bytes(reader.array()?);
            let sign_at = reader.offset();
            let sign = match reader.u8()? {
                1 => IntegerSign::Positive,
                2 => IntegerSign::Negative,
                3 => IntegerSign::None,
                other => {
                    return Err(Error::InvalidOpcode {
                        offset: sign_at,
                        opcode: other,
                    });
                }
            };
            let base = match reader.u8()? {
                1 => IntegerBase::Octal,
                2 => IntegerBase::Decimal,
                3 => IntegerBase::Hexadecimal,
                other => {
                    return Err(Error::InvalidOpcode {
                        offset: sign_at + 1,
                        opcode: other,
                    });
                }
            };
            Literal::Integer { value, sign, base }
        }
        UNICODE_STRING => {
            let (at, bytes) = read_blob(reader)?;
            Literal::String(decode_utf16(bytes, at)?)
        }
        OCTET_STRING => Literal::OctetString(read_blob(reader)?.1.to_vec()),
        SID => {
            let (at, bytes) = read_blob(reader)?;
            Literal::Sid(Sid::read(&mut Reader::with_base(bytes, at))?)
        }
        COMPOSITE => {
            if depth > MAX_DEPTH {
                return Err(Error::NestingTooDeep { offset });
            }
            let (at, bytes) = read_blob(reader)?;
            let mut inner = Reader::with_base(bytes, at);
            let mut items = Vec::new();
            while !inner.is_empty() {
                let item_at = inner.offset();
                let item_opcode = inner.u8()?;
                let item = read_literal(item_opcode, item_at, &mut inner, depth + 1)?.ok_or(
                    Error::InvalidOpcode {
                        offset: item_at,
                        opcode: item_opcode,
                    },
                )?;
                items.push(item);
            }
            Literal::Composite(items)
        }
        _ => return Ok(None),
    };
    trace!("decoded literal token {opcode:#04x} at offset {offset}");
    Ok(Some(literal))
}

fn attribute_source(opcode: u8) -> Option<AttributeSource> {
    match opcode {
        LOCAL_ATTRIBUTE => Some(AttributeSource::Local),
        USER_ATTRIBUTE => Some(AttributeSource::User),
        RESOURCE_ATTRIBUTE => Some(AttributeSource::Resource),
        DEVICE_ATTRIBUTE => Some(AttributeSource::Device),
        _ => None,
    }
}

/// Depth of a node built at `offset` over children of depth `children`.
fn deeper(offset: usize, children: usize) -> Result<usize> {
    if children < MAX_DEPTH {
        Ok(children + 1)
    } else {
        Err(Error::NestingTooDeep { offset })
    }
}

/// Decodes the tokens of `bytes`, returning the tree and the offset where the
/// trailing padding starts.
fn decode_tokens(bytes: &[u8]) -> Result<(Expression, usize)> {
    let mut reader = Reader::new(bytes);
    if reader.array::<4>()? != SIGNATURE {
        return Err(Error::InvalidConditionSignature);
    }
    // Each operand is kept with the depth of its tree.
    let mut stack: SmallVec<[(Expression, usize); 8]> = SmallVec::new();
    let mut end = bytes.len();
    while !reader.is_empty() {
        let offset = reader.offset();
        let opcode = reader.u8()?;
        if opcode == PADDING {
            let rest = reader.rest();
            if let Some(index) = rest.iter().position(|&b| b != PADDING) {
                return Err(Error::InvalidOpcode {
                    offset: offset + 1 + index,
                    opcode: rest.get(index).copied().unwrap_or_default(),
                });
            }
            end = offset;
            break;
        }
        if let Some(literal) = read_literal(opcode, offset, &mut reader, 1)? {
            stack.push((Expression::Literal(literal), 1));
        } else if let Some(source) = attribute_source(opcode) {
            let (at, name) = read_blob(&mut reader)?;
            let attribute = Attribute {
                source,
                name: decode_utf16(name, at)?,
            };
            stack.push((Expression::Attribute(attribute), 1));
        } else if let Some(op) = UnaryOp::from_opcode(opcode) {
            let (operand, depth) = stack.pop().ok_or(Error::UnbalancedExpression { offset })?;
            stack.push((Expression::unary(op, operand), deeper(offset, depth)?));
        } else if let Some(op) = BinaryOp::from_opcode(opcode) {
            let (right, right_depth) = stack.pop().ok_or(Error::UnbalancedExpression { offset })?;
            let (left, left_depth) = stack.pop().ok_or(Error::UnbalancedExpression { offset })?;
            let depth = deeper(offset, left_depth.max(right_depth))?;
            stack.push((Expression::binary(op, left, right), depth));
        } else {
            return Err(Error::InvalidOpcode { offset, opcode });
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some((expression, _)), true) => Ok((expression, end)),
        _ => Err(Error::UnbalancedExpression {
            offset: reader.offset(),
        }),
    }
}

/// Decodes an `artx` token stream back into an expression tree.
///
/// Trailing zero bytes after the last token are padding.
///
/// # Errors
/// [`Error::InvalidConditionSignature`] without the `artx` prefix,
/// [`Error::InvalidOpcode`] for unknown tokens, [`Error::TruncatedBuffer`] when a
/// token runs past the end, [`Error::UnbalancedExpression`] when the tokens do not
/// reduce to exactly one expression, [`Error::NestingTooDeep`] past
/// [`MAX_DEPTH`] levels of operators or composites.
#[inline]
pub fn decode(bytes: &[u8]) -> Result<Expression> {
    decode_tokens(bytes).map(|(expression, _)| expression)
}

/// Length of the well-formed `artx` stream at the start of `bytes` with its own
/// 4-byte alignment, or `None` when `bytes` does not decode.
pub(crate) fn stream_len(bytes: &[u8]) -> Option<usize> {
    let (_, end) = decode_tokens(bytes).ok()?;
    Some(end.next_multiple_of(4).min(bytes.len()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;
    use crate::condition::parse_expression;
    use crate::well_known;

    #[test]
    fn any_of_composite_round_trip() {
        let expr = Expression::binary(
            BinaryOp::AnyOf,
            Expression::attribute(AttributeSource::User, "clearance"),
            Expression::Literal(Literal::Composite(vec![
                Literal::integer(1),
                Literal::integer(2),
                Literal::integer(3),
            ])),
        );
        let bytes = encode(&expr).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(decode(&bytes).unwrap(), expr);
    }

    #[test]
    fn token_layout() {
        let expr = parse_expression("Member_of {SID(SY)}").unwrap();
        let bytes = encode(&expr).unwrap();
        let mut expected = b"artx".to_vec();
        expected.push(COMPOSITE);
        expected.extend_from_slice(&17u32.to_le_bytes());
        expected.push(SID);
        expected.extend_from_slice(&12u32.to_le_bytes());
        expected.extend_from_slice(&well_known::LOCAL_SYSTEM.to_bytes());
        expected.push(0x89);
        expected.push(PADDING);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn every_operator_round_trips() {
        let text = r#"(!(@User.a == 1) || @User.b != "x" && @Device.c < -2 && @Resource.d <= 0x10)
            || (@User.e > 017 && @User.f >= +3) || (@User.g Contains {"a", "b"} && @User.h Not_Contains #00ff)
            || (@User.i Not_Any_of {} && Exists @User.j && Not_Exists WIN://SYSAPPID)
            || (Device_Member_of {SID(BA)} && Member_of_Any {SID(WD)} && Device_Member_of_Any {SID(AU)})
            || (Not_Member_of {SID(BU)} && Not_Device_Member_of {SID(BG)})
            || (Not_Member_of_Any {SID(AN)} && Not_Device_Member_of_Any {SID(S-1-5-21-1-2-3-1000)})"#;
        let expr = parse_expression(text).unwrap();
        assert_eq!(decode(&encode(&expr).unwrap()).unwrap(), expr);
    }

    #[test]
    fn all_of_has_no_token() {
        let expr = parse_expression("@User.a All_of {1}").unwrap();
        assert_eq!(
            encode(&expr),
            Err(Error::UnsupportedConstruct("All_of has no binary token"))
        );
    }

    #[test]
    fn malformed_streams() {
        assert_eq!(decode(b"xtra"), Err(Error::InvalidConditionSignature));
        assert!(matches!(decode(b"ar"), Err(Error::TruncatedBuffer { .. })));
        assert_eq!(
            decode(b"artx\x42\0\0\0"),
            Err(Error::InvalidOpcode {
                offset: 4,
                opcode: 0x42
            })
        );
        assert_eq!(
            decode(b"artx\x80\0\0\0"),
            Err(Error::UnbalancedExpression { offset: 4 })
        );
        assert_eq!(
            decode(b"artx"),
            Err(Error::UnbalancedExpression { offset: 4 })
        );
        assert!(matches!(
            decode(b"artx\x10\x08\0\0\0a\0"),
            Err(Error::TruncatedBuffer { .. })
        ));
        assert_eq!(
            decode(b"artx\0\0\x01\0"),
            Err(Error::InvalidOpcode {
                offset: 6,
                opcode: 1
            })
        );
    }

    #[test]
    fn narrow_integer_tokens_decode() {
        let mut bytes = b"artx".to_vec();
        bytes.push(INT8);
        bytes.extend_from_slice(&(-5i64).to_le_bytes());
        bytes.extend_from_slice(&[2, 2, 0, 0]);
        assert_eq!(
            decode(&bytes).unwrap(),
            Expression::Literal(Literal::Integer {
                value: -5,
                sign: IntegerSign::Negative,
                base: IntegerBase::Decimal
            })
        );
    }

    /// `levels` composites, each holding only the next one.
    fn nested_composites(levels: usize) -> Vec<u8> {
        let mut bytes = b"artx".to_vec();
        for inner in (0..levels).rev() {
            bytes.push(COMPOSITE);
            bytes.extend_from_slice(&u32::try_from(5 * inner).unwrap().to_le_bytes());
        }
        bytes
    }

    #[test]
    fn composite_nesting_is_bounded() {
        assert!(decode(&nested_composites(MAX_DEPTH)).is_ok());
        let too_deep = Err(Error::NestingTooDeep {
            offset: 4 + 5 * MAX_DEPTH,
        });
        assert_eq!(decode(&nested_composites(MAX_DEPTH + 1)), too_deep);
        assert_eq!(decode(&nested_composites(12_000)), too_deep);
    }

    #[test]
    fn operator_chains_are_bounded() {
        let not_chain = |count: usize| {
            let mut bytes = b"artx".to_vec();
            bytes.extend_from_slice(&[USER_ATTRIBUTE, 2, 0, 0, 0, b'a', 0]);
            bytes.resize(bytes.len() + count, 0xa2);
            bytes
        };
        assert!(decode(&not_chain(MAX_DEPTH - 1)).is_ok());
        assert_eq!(
            decode(&not_chain(20_000)),
            Err(Error::NestingTooDeep {
                offset: 11 + MAX_DEPTH - 1
            })
        );

        let mut or_chain = b"artx".to_vec();
        or_chain.extend_from_slice(&[USER_ATTRIBUTE, 2, 0, 0, 0, b'a', 0]);
        for _ in 0..MAX_DEPTH {
            or_chain.extend_from_slice(&[USER_ATTRIBUTE, 2, 0, 0, 0, b'b', 0, 0xa1]);
        }
        assert!(matches!(decode(&or_chain), Err(Error::NestingTooDeep { .. })));
    }

    #[test]
    fn sid_errors_point_into_the_stream() {
        let mut bytes = b"artx".to_vec();
        bytes.push(SID);
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 1, 0, 0]);
        assert_eq!(
            decode(&bytes),
            Err(Error::TruncatedBuffer {
                offset: 9,
                needed: 8,
                available: 4
            })
        );
    }

    #[test]
    fn stream_length_excludes_extra_padding() {
        let encoded = encode(&parse_expression("Member_of {SID(SY)}").unwrap()).unwrap();
        let mut padded = encoded.clone();
        padded.extend_from_slice(&[0; 8]);
        assert_eq!(stream_len(&padded), Some(encoded.len()));
        assert_eq!(stream_len(&encoded), Some(encoded.len()));
        assert_eq!(stream_len(b"\x01\x02\x03\x04"), None);
    }
}
