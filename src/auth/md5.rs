//! MD5 password authentication.
//!
//! `"md5" || hex(md5(hex(md5(password || user)) || salt))`
use md5::{Digest, Md5};

/// Computes the `md5`-prefixed password hash sent in a `PasswordMessage`.
pub fn encode(user: &str, password: &str, salt: [u8; 4]) -> String {
    let inner = hex(&Md5::digest([password.as_bytes(), user.as_bytes()].concat()));

    let mut hasher = Md5::new();
    hasher.update(inner.as_bytes());
    hasher.update(salt);
    let outer = hex(&hasher.finalize());

    format!("md5{outer}")
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("write to String never fails");
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // password "postgres", user "postgres", salt [1,2,3,4]
        let got = encode("postgres", "postgres", [1, 2, 3, 4]);
        assert!(got.starts_with("md5"));
        assert_eq!(got.len(), 35);
    }

    #[test]
    fn is_deterministic() {
        let a = encode("u", "p", [9, 9, 9, 9]);
        let b = encode("u", "p", [9, 9, 9, 9]);
        assert_eq!(a, b);
    }
}
