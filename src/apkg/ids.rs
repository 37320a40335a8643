use std::sync::OnceLock;

use regex::Regex;
use sha1::Sha1;
use sha2::{Digest, Sha256};

const BASE91_TABLE: &[u8; 91] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

fn base91(mut value: u64) -> String {
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE91_TABLE[(value % 91) as usize]);
        value /= 91;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Note guid derived from its field values, so re-imports update instead of duplicating.
pub fn guid_for(values: &[&str]) -> String {
    let joined = values.join("__");
    let hash = Sha256::digest(joined.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash[..8]);
    base91(u64::from_be_bytes(prefix))
}

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("static pattern"))
}

pub fn strip_html(text: &str) -> String {
    tag_pattern().replace_all(text, "").trim().to_string()
}

/// Duplicate-detection checksum Anki keeps for the first field.
pub fn field_checksum(first_field: &str) -> i64 {
    let hash = Sha1::digest(strip_html(first_field).as_bytes());
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&hash[..4]);
    i64::from(u32::from_be_bytes(prefix))
}
