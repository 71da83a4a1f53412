use rsa::traits::PublicKeyParts as _;
use sha1::{Digest as _, Sha1};

/// The non-standard SHA-1 rendering Minecraft uses for the session
/// `serverId` parameter: the digest is interpreted as a signed big-endian
/// integer and formatted in lowercase hex with leading zeroes stripped.
#[derive(Debug, Default)]
pub struct LoginHash {
    hasher: Sha1,
}

impl LoginHash {
    pub fn update<D: AsRef<[u8]>>(&mut self, data: D) {
        self.hasher.update(data)
    }

    pub fn finalize(self) -> String {
        let mut digest = self.hasher.finalize();

        let negative = digest[0] & 0x80 != 0;
        if negative {
            // Two's complement negation of the whole digest.
            let mut carry = true;
            for byte in digest.iter_mut().rev() {
                *byte = !*byte;
                if carry {
                    let (value, overflow) = byte.overflowing_add(1);
                    *byte = value;
                    carry = overflow;
                }
            }
        }

        let hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
        let hex = hex.trim_start_matches('0');
        if negative {
            format!("-{}", hex)
        } else {
            hex.to_owned()
        }
    }

    pub fn calc<D: AsRef<[u8]>>(data: D) -> String {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

const RSA_ENCRYPTION_OID: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];

/// DER-encoded SubjectPublicKeyInfo, as sent in the EncryptionRequest packet.
/// https://minecraft.wiki/w/Protocol_encryption#Key_Exchange
pub fn encode_public_key_der(key: &rsa::RsaPublicKey) -> Box<[u8]> {
    yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            writer.next().write_sequence(|writer| {
                writer
                    .next()
                    .write_oid(&yasna::models::ObjectIdentifier::from_slice(
                        RSA_ENCRYPTION_OID,
                    ));
                writer.next().write_null();
            });

            let key_der = yasna::construct_der(|writer| {
                writer.write_sequence(|writer| {
                    writer
                        .next()
                        .write_bigint_bytes(&key.n().to_bytes_be(), true);
                    writer
                        .next()
                        .write_bigint_bytes(&key.e().to_bytes_be(), true);
                });
            });
            writer
                .next()
                .write_bitvec_bytes(&key_der, key_der.len() * 8);
        });
    })
    .into_boxed_slice()
}

#[cfg(test)]
mod test {
    use super::LoginHash;

    // Test vectors published by Mojang.
    #[test]
    fn login_hash() {
        assert_eq!(
            LoginHash::calc("Notch"),
            "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48",
        );
        assert_eq!(
            LoginHash::calc("jeb_"),
            "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1",
        );
        assert_eq!(
            LoginHash::calc("simon"),
            "88e16a1019277b15d58faf0541e11910eb756f6",
        );
    }

    #[test]
    fn login_hash_multiple_updates() {
        let mut hasher = LoginHash::default();
        hasher.update("No");
        hasher.update("tch");
        assert_eq!(hasher.finalize(), LoginHash::calc("Notch"));
    }
}
