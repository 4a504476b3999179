//! `timestamp`/`timestamptz` binary codec (spec.md §4.2, §8 property 3).
//!
//! Wire representation is an 8-byte signed integer: microseconds since
//! 2000-01-01 00:00:00 UTC. `PG_EPOCH_OFFSET` is the distance from the Unix
//! epoch, in seconds.
use bytes::{Buf, BufMut, BytesMut};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use super::{BinaryDecode, BinaryEncode, TypeError};

const PG_EPOCH_OFFSET: i64 = 946_684_800;

impl BinaryEncode for PrimitiveDateTime {
    fn encode_binary(&self, buf: &mut BytesMut) {
        let unix_micros = self.assume_utc().unix_timestamp_nanos() / 1_000;
        buf.put_i64((unix_micros - PG_EPOCH_OFFSET as i128 * 1_000_000) as i64);
    }
}

impl BinaryDecode<'_> for PrimitiveDateTime {
    fn decode_binary(mut bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != 8 {
            return Err(TypeError::LengthMismatch { expected: 8, found: bytes.len() });
        }
        let micros = bytes.get_i64();
        let epoch = PrimitiveDateTime::new(
            time::Date::from_ordinal_date(2000, 1).expect("valid date"),
            time::Time::MIDNIGHT,
        );
        Ok(epoch + Duration::microseconds(micros))
    }
}

impl BinaryEncode for OffsetDateTime {
    fn encode_binary(&self, buf: &mut BytesMut) {
        let unix_micros = self.unix_timestamp_nanos() / 1_000;
        buf.put_i64((unix_micros - PG_EPOCH_OFFSET as i128 * 1_000_000) as i64);
    }
}

impl BinaryDecode<'_> for OffsetDateTime {
    fn decode_binary(mut bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != 8 {
            return Err(TypeError::LengthMismatch { expected: 8, found: bytes.len() });
        }
        let micros = bytes.get_i64();
        let epoch = OffsetDateTime::UNIX_EPOCH + Duration::seconds(PG_EPOCH_OFFSET);
        Ok(epoch + Duration::microseconds(micros))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn epoch_boundary_roundtrips() {
        let t = datetime!(2000-01-01 0:00:00 UTC);
        let mut buf = BytesMut::new();
        t.encode_binary(&mut buf);
        assert_eq!(i64::from_be_bytes(buf[..].try_into().unwrap()), 0);
        assert_eq!(OffsetDateTime::decode_binary(&buf).unwrap(), t);
    }

    #[test]
    fn roundtrips_with_microsecond_precision() {
        let t = datetime!(2026-07-31 12:34:56.789_123 UTC);
        let mut buf = BytesMut::new();
        t.encode_binary(&mut buf);
        assert_eq!(OffsetDateTime::decode_binary(&buf).unwrap(), t);
    }

    #[test]
    fn roundtrips_before_unix_epoch() {
        let t = datetime!(1970-01-01 0:00:00 UTC);
        let mut buf = BytesMut::new();
        t.encode_binary(&mut buf);
        assert_eq!(OffsetDateTime::decode_binary(&buf).unwrap(), t);
    }
}
