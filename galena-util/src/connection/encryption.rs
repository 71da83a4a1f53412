use aes::cipher::{BlockEncrypt as _, KeyInit as _, generic_array::GenericArray};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionEncryptionError {
    #[error(transparent)]
    AesInvalidLength(#[from] aes::cipher::InvalidLength),
}

/// AES-128/CFB8 with the shared secret as both key and IV. The feedback
/// registers live as long as the connection: frame boundaries do not reset
/// the stream, so both peers must process every byte in order.
#[derive(Default, Debug)]
pub enum ConnectionEncryption {
    #[default]
    Unencrypted,
    Aes {
        key: aes::Aes128,
        encrypt_register: [u8; 16],
        decrypt_register: [u8; 16],
    },
}

fn feed(register: &mut [u8; 16], cipher_byte: u8) {
    register.copy_within(1.., 0);
    register[15] = cipher_byte;
}

impl ConnectionEncryption {
    pub fn new_aes(shared_secret: &[u8; 16]) -> Result<Self, ConnectionEncryptionError> {
        Ok(Self::Aes {
            key: aes::Aes128::new_from_slice(shared_secret)?,
            encrypt_register: *shared_secret,
            decrypt_register: *shared_secret,
        })
    }

    pub(crate) fn encrypt(&mut self, buf: &mut [u8]) {
        let Self::Aes {
            key,
            encrypt_register,
            ..
        } = self
        else {
            return;
        };
        let mut block = GenericArray::from([0u8; 16]);
        for byte in buf.iter_mut() {
            block.copy_from_slice(encrypt_register);
            key.encrypt_block(&mut block);
            let cipher_byte = block[0] ^ *byte;
            *byte = cipher_byte;
            feed(encrypt_register, cipher_byte);
        }
    }

    pub(crate) fn decrypt(&mut self, buf: &mut [u8]) {
        let Self::Aes {
            key,
            decrypt_register,
            ..
        } = self
        else {
            return;
        };
        let mut block = GenericArray::from([0u8; 16]);
        for byte in buf.iter_mut() {
            block.copy_from_slice(decrypt_register);
            key.encrypt_block(&mut block);
            let cipher_byte = *byte;
            *byte = block[0] ^ cipher_byte;
            feed(decrypt_register, cipher_byte);
        }
    }
}

#[cfg(test)]
mod test {
    use super::ConnectionEncryption;

    const SECRET: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
        0x0F,
    ];

    #[test]
    fn roundtrip_with_different_segmentation() {
        let mut encryptor = ConnectionEncryption::new_aes(&SECRET).unwrap();
        let mut decryptor = ConnectionEncryption::new_aes(&SECRET).unwrap();

        let plaintext = b"hello there, encrypted world".to_vec();
        let mut ciphertext = plaintext.clone();
        encryptor.encrypt(&mut ciphertext);
        assert_ne!(ciphertext, plaintext);

        // The decryptor may consume the stream in arbitrary chunks, as long
        // as every byte passes through in order.
        let (mut head, mut tail) = (ciphertext[..5].to_vec(), ciphertext[5..].to_vec());
        decryptor.decrypt(&mut head);
        decryptor.decrypt(&mut tail);
        assert_eq!([head, tail].concat(), plaintext);
    }

    #[test]
    fn stream_state_persists_across_frames() {
        let mut chunked = ConnectionEncryption::new_aes(&SECRET).unwrap();
        let mut whole = ConnectionEncryption::new_aes(&SECRET).unwrap();

        let mut a = *b"A";
        let mut b = *b"B";
        chunked.encrypt(&mut a);
        chunked.encrypt(&mut b);

        let mut ab = *b"AB";
        whole.encrypt(&mut ab);
        assert_eq!([a[0], b[0]], ab);

        // Re-encrypting the same byte must not produce the same output.
        let mut first = *b"A";
        let mut second = *b"A";
        let mut cipher = ConnectionEncryption::new_aes(&SECRET).unwrap();
        cipher.encrypt(&mut first);
        cipher.encrypt(&mut second);
        assert_ne!(first, second);
    }
}
