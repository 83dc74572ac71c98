//! flic.kr short URLs: base-58 encoding of the numeric photo id.

const ALPHABET: &[u8; 58] = b"123456789abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

pub const SHORT_URL_PREFIX: &str = "https://flic.kr/p/";

pub fn base58_encode(mut n: u64) -> String {
    let mut out = Vec::new();
    while n >= 58 {
        out.push(ALPHABET[(n % 58) as usize]);
        n /= 58;
    }
    out.push(ALPHABET[n as usize]);
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Short URL for a photo id. Ids that are not numeric fall back to the long-form URL.
pub fn short_url(id: &str) -> String {
    match id.parse::<u64>() {
        Ok(n) => format!("{SHORT_URL_PREFIX}{}", base58_encode(n)),
        Err(_) => format!("https://www.flickr.com/photo.gne?id={id}"),
    }
}
