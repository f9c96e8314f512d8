//! Random value generation for secrets.

use ::base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ::base64::Engine;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::core::constants::PASSWORD_SYMBOLS;
use crate::core::domain::Generator;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Produce a fresh value according to `generator`.
pub fn generate(generator: &Generator) -> Zeroizing<String> {
    match *generator {
        Generator::Token { len } => token(len),
        Generator::Alphanumeric { len } => alphanumeric(len),
        Generator::MixedClass { len } => mixed_class(len),
    }
}

/// URL-safe token of exactly `len` characters.
fn token(len: usize) -> Zeroizing<String> {
    // 3 bytes encode to 4 characters
    let mut bytes = Zeroizing::new(vec![0u8; len.div_ceil(4) * 3]);
    OsRng.fill_bytes(&mut bytes);
    let mut encoded = Zeroizing::new(URL_SAFE_NO_PAD.encode(bytes.as_slice()));
    encoded.truncate(len);
    encoded
}

fn alphanumeric(len: usize) -> Zeroizing<String> {
    let alphabet: Vec<u8> = [LOWER, UPPER, DIGITS].concat();
    Zeroizing::new(pick(&alphabet, len).into_iter().map(char::from).collect())
}

fn mixed_class(len: usize) -> Zeroizing<String> {
    let classes: [&[u8]; 4] = [LOWER, UPPER, DIGITS, PASSWORD_SYMBOLS];
    let alphabet: Vec<u8> = classes.concat();
    let mut rng = OsRng;

    let mut chars: Vec<u8> = classes
        .iter()
        .take(len)
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    chars.extend(pick(&alphabet, len.saturating_sub(chars.len())));
    chars.shuffle(&mut rng);

    let value = Zeroizing::new(chars.iter().copied().map(char::from).collect());
    chars.iter_mut().for_each(|c| *c = 0);
    value
}

fn pick(alphabet: &[u8], len: usize) -> Vec<u8> {
    let mut rng = OsRng;
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

/// Short, non-reversible fingerprint for logs.
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
