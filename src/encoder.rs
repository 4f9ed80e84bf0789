// Base-27 prompt encoding: digit 0 is a space, digits 1..=26 are A..Z

pub const ALPHABET: &[u8; 27] = b" ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE: u64 = ALPHABET.len() as u64;

// Tweet-length bound on a prompt
pub const MAX_PROMPT_LEN: usize = 280;

// Most significant symbol first; encode(0) is "". A u64 needs at most 14
// symbols, so the length cap never bites.
pub fn encode(mut n: u64) -> String {
    let mut symbols = Vec::new();
    while n > 0 {
        symbols.push(ALPHABET[(n % BASE) as usize]);
        n /= BASE;
    }
    symbols.reverse();
    symbols.truncate(MAX_PROMPT_LEN);

    // only ASCII from ALPHABET was pushed
    symbols.into_iter().map(char::from).collect()
}

// None on a foreign symbol or on overflow
pub fn decode(s: &str) -> Option<u64> {
    s.bytes().try_fold(0u64, |acc, b| {
        let digit = ALPHABET.iter().position(|&c| c == b)? as u64;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}
