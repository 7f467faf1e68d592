//! Deterministic token hashing.
//!
//! [`Token::fnv1a_hash`](crate::token::Token::fnv1a_hash) hashes a token's
//! primary fields (§4.3) and is what
//! [`Session::accept_report_for_token`](crate::session::Session::accept_report_for_token)
//! uses to detect a report submitted against a superseded token. This must
//! be reproducible across processes and platforms, so it cannot use
//! [`std::hash::RandomState`] (its seed varies per process). FNV-1a is a
//! small, well-known, allocation-free non-cryptographic hash with no crate
//! in this workspace's dependency graph providing it, so it is implemented
//! directly here, in the same spirit as `scanner_calib_jsonc_strip`'s
//! self-contained parser.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a byte slice with 64-bit FNV-1a.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash a string's UTF-8 bytes with 64-bit FNV-1a.
#[must_use]
pub fn fnv1a_str(s: &str) -> u64 {
    fnv1a(s.as_bytes())
}
