use core::fmt;
use core::marker::PhantomData;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};

use crate::{DomainAndName, Guid, SecurityDescriptor, SecurityInformation, Sid, sddl};

impl Serialize for Sid {
    /// `S-1-...` for human-readable formats, the binary form otherwise.
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for Sid {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_text_or_binary(deserializer, "a Windows SID as a string (e.g., \"S-1-...\") or as raw binary")
    }
}

impl Serialize for Guid {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.to_bytes_le())
        }
    }
}

impl<'de> Deserialize<'de> for Guid {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_text_or_binary(deserializer, "a GUID as a string or as 16 raw bytes")
    }
}

impl Serialize for SecurityDescriptor {
    /// SDDL for human-readable formats, the self-relative binary form otherwise.
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            let text = sddl::to_sddl(self, SecurityInformation::ALL).map_err(<S::Error as ser::Error>::custom)?;
            serializer.serialize_str(&text)
        } else {
            let bytes = self.to_self_relative().map_err(<S::Error as ser::Error>::custom)?;
            serializer.serialize_bytes(&bytes)
        }
    }
}

impl<'de> Deserialize<'de> for SecurityDescriptor {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_text_or_binary(deserializer, "a security descriptor as SDDL or in self-relative binary form")
    }
}

// Types with a string form (FromStr) and a binary form (TryFrom<&[u8]>).
fn deserialize_text_or_binary<'de, D, T>(deserializer: D, expecting: &'static str) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    for<'a> T: FromStr + TryFrom<&'a [u8]>,
    <T as FromStr>::Err: fmt::Display,
    for<'a> <T as TryFrom<&'a [u8]>>::Error: fmt::Display,
{
    struct Visitor<T> {
        expecting: &'static str,
        _marker: PhantomData<T>,
    }

    impl<T> de::Visitor<'_> for Visitor<T>
    where
        for<'a> T: FromStr + TryFrom<&'a [u8]>,
        <T as FromStr>::Err: fmt::Display,
        for<'a> <T as TryFrom<&'a [u8]>>::Error: fmt::Display,
    {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.expecting)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            T::from_str(v).map_err(E::custom)
        }

        fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            T::try_from(v).map_err(E::custom)
        }
    }

    let visitor = Visitor {
        expecting,
        _marker: PhantomData,
    };
    if deserializer.is_human_readable() {
        deserializer.deserialize_str(visitor)
    } else {
        deserializer.deserialize_bytes(visitor)
    }
}

impl<'de> Deserialize<'de> for DomainAndName {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DomainAndNameVisitor;

        impl de::Visitor<'_> for DomainAndNameVisitor {
            type Value = DomainAndName;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a domain and name in the format 'DOMAIN\\NAME'")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                DomainAndName::from_str(v).map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(DomainAndNameVisitor)
    }
}

impl Serialize for DomainAndName {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;
    use crate::sid;
    use serde_test::{Configure, Token};

    const ADMINISTRATORS: Sid = sid!("S-1-5-32-544");
    const ADMINISTRATORS_BYTES: &[u8] = &[1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 32, 2, 0, 0];

    #[test]
    fn sid_forms() {
        serde_test::assert_tokens(&ADMINISTRATORS.readable(), &[Token::Str("S-1-5-32-544")]);
        serde_test::assert_tokens(&ADMINISTRATORS.compact(), &[Token::Bytes(ADMINISTRATORS_BYTES)]);
    }

    #[test]
    fn invalid_sid_strings_are_rejected() {
        serde_test::assert_de_tokens_error::<serde_test::Readable<Sid>>(
            &[Token::Str("S-1")],
            &"S-1".parse::<Sid>().unwrap_err().to_string(),
        );
    }

    #[test]
    fn guid_forms() {
        let guid: Guid = "00299570-246d-11d0-a768-00aa006e0529".parse().unwrap();
        serde_test::assert_tokens(&guid.readable(), &[Token::Str("00299570-246d-11d0-a768-00aa006e0529")]);
        serde_test::assert_tokens(
            &guid.compact(),
            &[Token::Bytes(&[
                0x70, 0x95, 0x29, 0x00, 0x6d, 0x24, 0xd0, 0x11, 0xa7, 0x68, 0x00, 0xaa, 0x00, 0x6e, 0x05, 0x29,
            ])],
        );
    }

    #[test]
    fn domain_and_name() {
        let account = DomainAndName::new("NT AUTHORITY", "SYSTEM");
        serde_test::assert_tokens(&account, &[Token::Str("NT AUTHORITY\\SYSTEM")]);
    }

    #[test]
    fn security_descriptor_forms() {
        let sd: SecurityDescriptor = "O:SYG:SYD:(A;;GA;;;WD)".parse().unwrap();
        serde_test::assert_tokens(&sd.clone().readable(), &[Token::Str("O:SYG:SYD:(A;;GA;;;WD)")]);
        let bytes: &'static [u8] = Box::leak(sd.to_self_relative().unwrap().into_boxed_slice());
        serde_test::assert_tokens(&sd.compact(), &[Token::Bytes(bytes)]);
    }

    #[test]
    fn json_struct() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Entry {
            owner: Sid,
            descriptor: SecurityDescriptor,
        }
        let entry = Entry {
            owner: ADMINISTRATORS,
            descriptor: "O:BAD:P(A;OICI;FA;;;SY)".parse().unwrap(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"owner":"S-1-5-32-544","descriptor":"O:BAD:P(A;OICI;0x1f01ff;;;SY)"}"#
        );
        assert_eq!(serde_json::from_str::<Entry>(&json).unwrap(), entry);
    }
}
