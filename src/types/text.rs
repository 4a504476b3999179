//! Text-format encode/decode (C2): the PostgreSQL textual literals named in
//! spec.md §4.2/§6 — `t`/`f` booleans, `NaN`/`Infinity`/`-Infinity` floats,
//! `\x`-hex bytea, and the canonical timestamp pattern. Used by the
//! `Vec<String>` batch-insert expansion's per-element parameters and
//! available for decoding text-format columns.
use crate::common::general;

use super::TypeError;

pub trait TextEncode {
    fn encode_text(&self) -> String;
}

pub trait TextDecode: Sized {
    fn decode_text(text: &str) -> Result<Self, TypeError>;
}

impl TextEncode for bool {
    fn encode_text(&self) -> String {
        if *self { "t".to_owned() } else { "f".to_owned() }
    }
}

impl TextDecode for bool {
    fn decode_text(text: &str) -> Result<Self, TypeError> {
        match text {
            "t" => Ok(true),
            "f" => Ok(false),
            _ => Err(TypeError::other(general!("invalid boolean literal {text:?}"))),
        }
    }
}

macro_rules! int_text {
    ($ty:ty) => {
        impl TextEncode for $ty {
            fn encode_text(&self) -> String {
                self.to_string()
            }
        }

        impl TextDecode for $ty {
            fn decode_text(text: &str) -> Result<Self, TypeError> {
                text.parse().map_err(TypeError::other)
            }
        }
    };
}

int_text!(i16);
int_text!(i32);
int_text!(i64);

macro_rules! float_text {
    ($ty:ty) => {
        impl TextEncode for $ty {
            fn encode_text(&self) -> String {
                if self.is_nan() {
                    "NaN".to_owned()
                } else if *self == <$ty>::INFINITY {
                    "Infinity".to_owned()
                } else if *self == <$ty>::NEG_INFINITY {
                    "-Infinity".to_owned()
                } else {
                    self.to_string()
                }
            }
        }

        impl TextDecode for $ty {
            fn decode_text(text: &str) -> Result<Self, TypeError> {
                match text {
                    "NaN" => Ok(<$ty>::NAN),
                    "Infinity" => Ok(<$ty>::INFINITY),
                    "-Infinity" => Ok(<$ty>::NEG_INFINITY),
                    _ => text.parse().map_err(TypeError::other),
                }
            }
        }
    };
}

float_text!(f32);
float_text!(f64);

impl TextEncode for str {
    fn encode_text(&self) -> String {
        self.to_owned()
    }
}

impl TextEncode for String {
    fn encode_text(&self) -> String {
        self.clone()
    }
}

impl TextDecode for String {
    fn decode_text(text: &str) -> Result<Self, TypeError> {
        Ok(text.to_owned())
    }
}

/// `bytea`'s text form: `\x` followed by lowercase hex pairs.
impl TextEncode for [u8] {
    fn encode_text(&self) -> String {
        let mut out = String::with_capacity(2 + self.len() * 2);
        out.push_str("\\x");
        for byte in self {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

impl TextEncode for Vec<u8> {
    fn encode_text(&self) -> String {
        self.as_slice().encode_text()
    }
}

impl TextDecode for Vec<u8> {
    fn decode_text(text: &str) -> Result<Self, TypeError> {
        let hex = text.strip_prefix("\\x").ok_or_else(|| TypeError::other(general!("bytea text value missing \\x prefix: {text:?}")))?;
        if hex.len() % 2 != 0 {
            return Err(TypeError::other(general!("bytea hex text has odd length")));
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(TypeError::other))
            .collect()
    }
}

#[cfg(feature = "time")]
mod time_text {
    use time::PrimitiveDateTime;
    use time::format_description::FormatItem;

    use super::{TextDecode, TextEncode, TypeError, general};

    const FORMAT: &[FormatItem<'_>] = time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond digits:1+]]]"
    );

    impl TextEncode for PrimitiveDateTime {
        fn encode_text(&self) -> String {
            self.format(FORMAT).expect("well-formed timestamp")
        }
    }

    impl TextDecode for PrimitiveDateTime {
        fn decode_text(text: &str) -> Result<Self, TypeError> {
            PrimitiveDateTime::parse(text, FORMAT).map_err(|e| TypeError::other(general!("{e}")))
        }
    }

    impl TextEncode for time::OffsetDateTime {
        fn encode_text(&self) -> String {
            PrimitiveDateTime::new(self.date(), self.time()).encode_text()
        }
    }

    impl TextDecode for time::OffsetDateTime {
        fn decode_text(text: &str) -> Result<Self, TypeError> {
            Ok(PrimitiveDateTime::decode_text(text)?.assume_utc())
        }
    }

    #[cfg(test)]
    mod test {
        use time::macros::datetime;

        use super::*;

        #[test]
        fn timestamp_text_roundtrips() {
            let t = datetime!(2026-07-31 12:34:56.789_123 UTC);
            let text = t.encode_text();
            assert_eq!(text, "2026-07-31 12:34:56.789123");
            assert_eq!(time::OffsetDateTime::decode_text(&text).unwrap(), t);
        }

        #[test]
        fn rejects_malformed_timestamp() {
            assert!(time::OffsetDateTime::decode_text("not-a-date").is_err());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bool_literals() {
        assert_eq!(true.encode_text(), "t");
        assert!(!bool::decode_text("f").unwrap());
        assert!(bool::decode_text("yes").is_err());
    }

    #[test]
    fn float_specials_roundtrip() {
        assert_eq!(f64::NAN.encode_text(), "NaN");
        assert_eq!(f64::INFINITY.encode_text(), "Infinity");
        assert!(f64::decode_text("NaN").unwrap().is_nan());
        assert_eq!(f64::decode_text("-Infinity").unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn bytea_hex_roundtrips() {
        let bytes = vec![0xde, 0xad, 0xbe, 0xef];
        let text = bytes.encode_text();
        assert_eq!(text, "\\xdeadbeef");
        assert_eq!(Vec::<u8>::decode_text(&text).unwrap(), bytes);
    }

    #[test]
    fn bytea_rejects_missing_prefix() {
        assert!(Vec::<u8>::decode_text("deadbeef").is_err());
    }
}
