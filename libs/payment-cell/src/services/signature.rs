use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_over(secret: &[u8], parts: &[&[u8]]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    for part in parts {
        mac.update(part);
    }
    Some(mac)
}

/// Hex HMAC-SHA256 of the concatenated `parts`.
pub fn sign_hex(secret: &[u8], parts: &[&[u8]]) -> Option<String> {
    mac_over(secret, parts).map(|mac| hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature. Anything that does not decode is a
/// mismatch.
pub fn verify_hex(secret: &[u8], parts: &[&[u8]], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    match mac_over(secret, parts) {
        Some(mac) => mac.verify_slice(&expected).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        let sig = sign_hex(b"Jefe", &[&b"what do ya want "[..], &b"for nothing?"[..]]).unwrap();
        assert_eq!(sig, "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
    }

    #[test]
    fn round_trip_and_tamper() {
        let sig = sign_hex(b"secret", &[&b"order_1|pay_1"[..]]).unwrap();
        assert!(verify_hex(b"secret", &[&b"order_1|pay_1"[..]], &sig));
        assert!(!verify_hex(b"secret", &[&b"order_1|pay_2"[..]], &sig));
        assert!(!verify_hex(b"other", &[&b"order_1|pay_1"[..]], &sig));
        assert!(!verify_hex(b"secret", &[&b"order_1|pay_1"[..]], "not-hex"));
        assert!(!verify_hex(b"secret", &[&b"order_1|pay_1"[..]], &sig[..10]));
    }
}
