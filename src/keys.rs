//! License key generation.
//!
//! Keys look like `PRO-7K3M-Q9TX-HC2A-W4ZP`: a configurable prefix followed by
//! four groups of four symbols from an alphabet without the easily confused
//! `0`, `O`, `1` and `I`. Keys are compared by stored value during
//! verification, so the format only matters to humans typing them in.

use rand::Rng;

pub const DEFAULT_PREFIX: &str = "PRO";

const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GROUP_COUNT: usize = 4;
const GROUP_LEN: usize = 4;

/// Generate a license key in `PREFIX-XXXX-XXXX-XXXX-XXXX` format.
pub fn generate_license_key(prefix: &str) -> String {
    let mut rng = rand::thread_rng();

    let mut group = || -> String {
        (0..GROUP_LEN)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect()
    };

    let groups: Vec<String> = (0..GROUP_COUNT).map(|_| group()).collect();
    format!("{}-{}", prefix, groups.join("-"))
}

/// Whether `key` has the shape produced by [`generate_license_key`] for `prefix`.
pub fn is_well_formed(key: &str, prefix: &str) -> bool {
    let Some(rest) = key.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
        return false;
    };

    let groups: Vec<&str> = rest.split('-').collect();
    groups.len() == GROUP_COUNT
        && groups
            .iter()
            .all(|g| g.len() == GROUP_LEN && g.bytes().all(|b| KEY_ALPHABET.contains(&b)))
}
