//! RS256 JWT assertions for the OAuth2 JWT-bearer grant (RFC 7523).

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::{rand::SystemRandom, signature};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Assertion lifetime accepted by Google's token endpoint.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            alg: "RS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub scope: String,
}

impl JwtClaims {
    /// Claims for a service account asserting itself to `audience` at `issued_at`.
    pub fn for_service_account(
        client_email: &str,
        audience: &str,
        scopes: &[String],
        issued_at: i64,
    ) -> Self {
        Self {
            iss: client_email.to_string(),
            sub: client_email.to_string(),
            aud: audience.to_string(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
            scope: scopes.join(" "),
        }
    }
}

/// Build `base64url(header).base64url(claims).base64url(signature)`.
///
/// `pkcs8_der` is the decoded private key; see [`super::pem::decode_pkcs8`].
pub fn sign_assertion(
    header: &JwtHeader,
    claims: &JwtClaims,
    pkcs8_der: &[u8],
) -> Result<String, SyncError> {
    let key_pair = signature::RsaKeyPair::from_pkcs8(pkcs8_der)
        .map_err(|e| SyncError::KeyFormat(format!("key rejected by RSA parser: {e}")))?;

    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut sig = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &signature::RSA_PKCS1_SHA256,
            &SystemRandom::new(),
            signing_input.as_bytes(),
            &mut sig,
        )
        .map_err(|_| SyncError::Signing("RSASSA-PKCS1-v1_5 signing failed".to_string()))?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(sig)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_oauth::pem::decode_pkcs8;

    const KEY: &str = include_str!("../../tests/fixtures/service_account_key.pem");
    const PUBLIC_KEY_DER: &[u8] = include_bytes!("../../tests/fixtures/service_account_pub.der");

    fn claims() -> JwtClaims {
        JwtClaims::for_service_account(
            "sync@demo-project.iam.gserviceaccount.com",
            "https://oauth2.googleapis.com/token",
            &[
                "https://www.googleapis.com/auth/analytics.readonly".to_string(),
                "https://www.googleapis.com/auth/webmasters.readonly".to_string(),
            ],
            1_700_000_000,
        )
    }

    #[test]
    fn claims_cover_one_hour_and_join_scopes() {
        let c = claims();
        assert_eq!(c.iss, c.sub);
        assert_eq!(c.exp - c.iat, 3600);
        assert_eq!(
            c.scope,
            "https://www.googleapis.com/auth/analytics.readonly https://www.googleapis.com/auth/webmasters.readonly"
        );
    }

    #[test]
    fn signed_assertion_verifies_with_public_key() {
        let der = decode_pkcs8(KEY).unwrap();
        let jwt = sign_assertion(&JwtHeader::default(), &claims(), &der).unwrap();

        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(!jwt.contains('='));

        let header: JwtHeader =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header, JwtHeader::default());
        let decoded: JwtClaims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(decoded, claims());

        let sig = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
        let public_key =
            signature::UnparsedPublicKey::new(&signature::RSA_PKCS1_2048_8192_SHA256, PUBLIC_KEY_DER);
        let message = format!("{}.{}", parts[0], parts[1]);
        public_key.verify(message.as_bytes(), &sig).unwrap();

        // A tampered payload must not verify.
        let tampered = format!("{}.{}x", parts[0], parts[1]);
        assert!(public_key.verify(tampered.as_bytes(), &sig).is_err());
    }

    #[test]
    fn non_rsa_der_is_rejected() {
        let err = sign_assertion(&JwtHeader::default(), &claims(), b"not a key").unwrap_err();
        assert!(matches!(err, SyncError::KeyFormat(_)));
    }
}
