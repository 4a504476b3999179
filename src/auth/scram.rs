//! SCRAM-SHA-256 authentication (RFC 5802, RFC 7677).
use base64::Engine;
use base64::engine::general_purpose::STANDARD as base64;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::common::{BoxError, general};

type HmacSha256 = Hmac<Sha256>;

/// Errors specific to the SCRAM exchange.
#[derive(Debug, thiserror::Error)]
pub enum ScramError {
    #[error("malformed SCRAM message: {0}")]
    Malformed(BoxError),
    #[error("server nonce does not continue the client nonce")]
    NonceMismatch,
    #[error("server signature verification failed")]
    ServerSignatureMismatch,
}

/// Drives a single SCRAM-SHA-256 authentication exchange.
///
/// Usage: [`Self::new`] → send [`Self::client_first_message`] as the SASL
/// initial response → feed the server's `AuthenticationSASLContinue` body to
/// [`Self::handle_server_first`] and send the returned message → feed the
/// server's `AuthenticationSASLFinal` body to [`Self::handle_server_final`]
/// to verify the server's identity.
pub struct ScramSha256 {
    password: String,
    client_nonce: String,
    client_first_bare: String,
    auth_message: Option<String>,
    salted_password: Option<[u8; 32]>,
}

impl ScramSha256 {
    pub const MECHANISM: &'static str = "SCRAM-SHA-256";

    pub fn new(user: &str, password: &str) -> Self {
        let client_nonce = hex_lower(&random_bytes::<16>());
        let client_first_bare = format!("n={user},r={client_nonce}");
        Self {
            password: stringprep::saslprep(password).map(|s| s.into_owned()).unwrap_or_else(|_| password.to_owned()),
            client_nonce,
            client_first_bare,
            auth_message: None,
            salted_password: None,
        }
    }

    /// The GS2 header + client-first-bare, sent as the SASL initial response.
    pub fn client_first_message(&self) -> String {
        format!("n,,{}", self.client_first_bare)
    }

    /// Parses `AuthenticationSASLContinue`'s data and returns the
    /// client-final-message to send back.
    pub fn handle_server_first(&mut self, server_first: &str) -> Result<String, ScramError> {
        let fields = parse_fields(server_first);
        let nonce = fields.get("r").ok_or_else(|| ScramError::Malformed(general!("server-first missing nonce").into()))?;
        let salt = fields.get("s").ok_or_else(|| ScramError::Malformed(general!("server-first missing salt").into()))?;
        let iterations: u32 = fields
            .get("i")
            .ok_or_else(|| ScramError::Malformed(general!("server-first missing iteration count").into()))?
            .parse()
            .map_err(|_| ScramError::Malformed(general!("server-first iteration count not a number").into()))?;

        if !nonce.starts_with(&self.client_nonce) {
            return Err(ScramError::NonceMismatch);
        }

        let salt = base64.decode(salt.as_bytes()).map_err(|e| ScramError::Malformed(e.into()))?;

        let mut salted_password = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(self.password.as_bytes(), &salt, iterations, &mut salted_password);
        self.salted_password = Some(salted_password);

        let client_final_without_proof = format!("c=biws,r={nonce}");
        let auth_message = format!("{},{},{}", self.client_first_bare, server_first, client_final_without_proof);

        let client_key = hmac(&salted_password, b"Client Key");
        let stored_key = Sha256::digest(client_key);
        let client_signature = hmac(&stored_key, auth_message.as_bytes());
        let client_proof = xor(&client_key, &client_signature);

        self.auth_message = Some(auth_message);

        Ok(format!("{client_final_without_proof},p={}", base64.encode(client_proof)))
    }

    /// Verifies `AuthenticationSASLFinal`'s data proves the server also knew
    /// the password, completing mutual authentication.
    pub fn handle_server_final(&self, server_final: &str) -> Result<(), ScramError> {
        let fields = parse_fields(server_final);
        let signature = fields.get("v").ok_or_else(|| ScramError::Malformed(general!("server-final missing signature").into()))?;
        let signature = base64.decode(signature.as_bytes()).map_err(|e| ScramError::Malformed(e.into()))?;

        let salted_password = self.salted_password.ok_or_else(|| ScramError::Malformed(general!("handle_server_first was not called").into()))?;
        let auth_message = self.auth_message.as_deref().ok_or_else(|| ScramError::Malformed(general!("handle_server_first was not called").into()))?;

        let server_key = hmac(&salted_password, b"Server Key");
        let expected = hmac(&server_key, auth_message.as_bytes());

        if expected.as_slice() == signature.as_slice() {
            Ok(())
        } else {
            Err(ScramError::ServerSignatureMismatch)
        }
    }
}

fn hmac(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// 32-character lowercase-hex client nonce (spec.md §4.4: "a 32-character
/// nonce").
fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").unwrap();
    }
    out
}

fn parse_fields(message: &str) -> std::collections::HashMap<&str, &str> {
    message
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    // RFC 7677 §3 test vector.
    const USER: &str = "user";
    const PASSWORD: &str = "pencil";
    const CLIENT_NONCE: &str = "rOprNGfwEbeRWgbNEkqO";
    const SERVER_FIRST: &str = "r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096";
    const SERVER_FINAL: &str = "v=6rriTRBi23WpRR/wtup+mMhUZUn/dB5nLTJRsjl95G4=";

    #[test]
    fn matches_rfc7677_vector() {
        let mut client = ScramSha256::new(USER, PASSWORD);
        client.client_nonce = CLIENT_NONCE.to_owned();
        client.client_first_bare = format!("n={USER},r={CLIENT_NONCE}");

        let client_final = client.handle_server_first(SERVER_FIRST).unwrap();
        assert!(client_final.starts_with("c=biws,r="));
        assert!(client_final.contains(",p="));

        client.handle_server_final(SERVER_FINAL).unwrap();
    }

    #[test]
    fn rejects_tampered_server_signature() {
        let mut client = ScramSha256::new(USER, PASSWORD);
        client.client_nonce = CLIENT_NONCE.to_owned();
        client.client_first_bare = format!("n={USER},r={CLIENT_NONCE}");
        client.handle_server_first(SERVER_FIRST).unwrap();

        let tampered = "v=AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";
        assert!(matches!(client.handle_server_final(tampered), Err(ScramError::ServerSignatureMismatch)));
    }

    #[test]
    fn rejects_nonce_not_continued() {
        let mut client = ScramSha256::new(USER, PASSWORD);
        client.client_nonce = "totally-different".to_owned();
        let err = client.handle_server_first(SERVER_FIRST).unwrap_err();
        assert!(matches!(err, ScramError::NonceMismatch));
    }
}
