use rand::Rng;
use uuid::Uuid;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Random identifier such as `lkc-3f9a01c2`
pub(crate) fn resource_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &simple[..8])
}

/// Upper-case token of `len` hex characters from the thread-local CSPRNG
pub(crate) fn token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX_UPPER[rng.gen_range(0..HEX_UPPER.len())] as char)
        .collect()
}
