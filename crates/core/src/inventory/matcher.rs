//! Variant attribute matching.

use super::types::{VariantAttribute, VariantAttributes};

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn pair_matches(a: &VariantAttribute, b: &VariantAttribute) -> bool {
    normalize(&a.name) == normalize(&b.name) && normalize(&a.value) == normalize(&b.value)
}

/// Returns true if `selector` and `attributes` describe the same variant.
///
/// Both sets must have the same number of pairs and every selector pair must
/// match a distinct attribute pair. Names and values are compared trimmed and
/// case-insensitively; order does not matter.
#[must_use]
pub fn attributes_match(selector: &VariantAttributes, attributes: &VariantAttributes) -> bool {
    if selector.len() != attributes.len() {
        return false;
    }

    let mut used = vec![false; attributes.len()];
    selector.iter().all(|wanted| {
        let hit = attributes
            .iter()
            .enumerate()
            .find(|(i, have)| !used[*i] && pair_matches(wanted, have));
        match hit {
            Some((i, _)) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}
