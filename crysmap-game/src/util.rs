use std::hash::Hash;

use hashbrown::HashMap;

pub fn sorted_keys<T, U>(hashmap: &HashMap<T, U>) -> Vec<T>
where
    T: Ord + Hash + Copy,
{
    let mut keys: Vec<T> = hashmap.keys().copied().collect();
    keys.sort();
    keys
}

/// Formats a byte slice as space-separated hex, for log output.
pub fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<String>>()
        .join(" ")
}
