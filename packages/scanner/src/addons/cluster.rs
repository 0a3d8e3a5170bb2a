//! Avatar clustering: union-find over fingerprinted results.
//!
//! Two results share an edge when their avatar SHA-256 digests are equal
//! or the Hamming distance of their difference hashes is within the
//! threshold. Cluster ids are deterministic: members are numbered by
//! first occurrence iterating providers in lexicographic name order, so
//! ids do not depend on probe completion order.

use std::collections::HashMap;

use crate::types::probe::ProbeResult;

use super::avatar::hamming;

/// Default Hamming-distance threshold for a perceptual match.
pub const DEFAULT_DHASH_THRESHOLD: u32 = 10;

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

struct Fingerprint {
    index: usize,
    sha256: String,
    dhash: Option<u64>,
}

/// Assign `avatar_cluster_id` to every fingerprinted result. Singletons
/// get ids too, so downstream joins always have a key.
pub fn apply(results: &mut [ProbeResult], threshold: u32) {
    let prints: Vec<Fingerprint> = results
        .iter()
        .enumerate()
        .filter_map(|(index, result)| {
            let sha256 = result.profile.avatar_sha256.clone()?;
            let dhash = result
                .profile
                .avatar_dhash
                .as_deref()
                .and_then(|h| u64::from_str_radix(h, 16).ok());
            Some(Fingerprint {
                index,
                sha256,
                dhash,
            })
        })
        .collect();

    let mut set = DisjointSet::new(prints.len());
    for a in 0..prints.len() {
        for b in (a + 1)..prints.len() {
            let byte_equal = prints[a].sha256 == prints[b].sha256;
            let perceptual = match (prints[a].dhash, prints[b].dhash) {
                (Some(ha), Some(hb)) => hamming(ha, hb) <= threshold,
                _ => false,
            };
            if byte_equal || perceptual {
                set.union(a, b);
            }
        }
    }

    // root of each print -> member result indices
    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..prints.len() {
        let root = set.find(i);
        members.entry(root).or_default().push(prints[i].index);
    }

    // number clusters by first occurrence in provider-name order
    let mut ordered: Vec<usize> = (0..results.len())
        .filter(|&i| {
            results[i].profile.avatar_sha256.is_some()
        })
        .collect();
    ordered.sort_by(|&a, &b| results[a].provider.cmp(&results[b].provider));

    let mut root_of_result: HashMap<usize, usize> = HashMap::new();
    for (root, indices) in &members {
        for &index in indices {
            root_of_result.insert(index, *root);
        }
    }

    let mut next_id: u32 = 0;
    let mut id_of_root: HashMap<usize, u32> = HashMap::new();
    for index in ordered {
        let Some(root) = root_of_result.get(&index) else {
            continue;
        };
        let id = *id_of_root.entry(*root).or_insert_with(|| {
            let id = next_id;
            next_id += 1;
            id
        });
        results[index].profile.avatar_cluster_id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::probe::{ProbeResult, ProbeStatus, Profile};

    fn result(provider: &str, sha256: Option<&str>, dhash: Option<u64>) -> ProbeResult {
        ProbeResult::new(provider, ProbeStatus::Found, "u").with_profile(Profile {
            avatar_sha256: sha256.map(str::to_string),
            avatar_dhash: dhash.map(|h| format!("{h:016x}")),
            ..Default::default()
        })
    }

    #[test]
    fn test_identical_sha_clusters_together() {
        let mut results = vec![
            result("b_site", Some("aaaa"), None),
            result("a_site", Some("aaaa"), None),
            result("c_site", Some("bbbb"), None),
        ];
        apply(&mut results, DEFAULT_DHASH_THRESHOLD);

        // a_site sorts first, so its cluster is id 0
        assert_eq!(results[0].profile.avatar_cluster_id, Some(0));
        assert_eq!(results[1].profile.avatar_cluster_id, Some(0));
        assert_eq!(results[2].profile.avatar_cluster_id, Some(1));
    }

    #[test]
    fn test_near_dhash_joins_cluster() {
        let base: u64 = 0b1111_0000;
        let near = base ^ 0b0000_0111; // 3 bits apart
        let far = base ^ 0xFFFFF; // 20 bits apart

        let mut results = vec![
            result("a", Some("s1"), Some(base)),
            result("b", Some("s2"), Some(near)),
            result("c", Some("s3"), Some(far)),
        ];
        apply(&mut results, DEFAULT_DHASH_THRESHOLD);

        assert_eq!(results[0].profile.avatar_cluster_id, Some(0));
        assert_eq!(results[1].profile.avatar_cluster_id, Some(0));
        assert_eq!(results[2].profile.avatar_cluster_id, Some(1));
    }

    #[test]
    fn test_transitive_closure() {
        // a-b within threshold, b-c within threshold, a-c not
        let a: u64 = 0;
        let b: u64 = (1 << 8) - 1; // 8 bits from a
        let c = b | (0xFF << 8); // 8 bits from b, 16 from a

        let mut results = vec![
            result("a", Some("s1"), Some(a)),
            result("b", Some("s2"), Some(b)),
            result("c", Some("s3"), Some(c)),
        ];
        apply(&mut results, 10);

        let ids: Vec<_> = results
            .iter()
            .map(|r| r.profile.avatar_cluster_id.unwrap())
            .collect();
        assert_eq!(ids, vec![0, 0, 0]);
    }

    #[test]
    fn test_unfingerprinted_results_get_no_id() {
        let mut results = vec![result("a", Some("s"), None), result("b", None, None)];
        apply(&mut results, DEFAULT_DHASH_THRESHOLD);
        assert_eq!(results[0].profile.avatar_cluster_id, Some(0));
        assert_eq!(results[1].profile.avatar_cluster_id, None);
    }

    #[test]
    fn test_ids_independent_of_result_order() {
        let make = |order: &[usize]| {
            let base = [
                result("x_site", Some("same"), None),
                result("a_site", Some("same"), None),
                result("m_site", Some("other"), None),
            ];
            let mut results: Vec<ProbeResult> =
                order.iter().map(|&i| base[i].clone()).collect();
            apply(&mut results, DEFAULT_DHASH_THRESHOLD);
            results
                .into_iter()
                .map(|r| (r.provider.clone(), r.profile.avatar_cluster_id))
                .collect::<HashMap<_, _>>()
        };

        let forward = make(&[0, 1, 2]);
        let shuffled = make(&[2, 0, 1]);
        assert_eq!(forward, shuffled);
        // a_site's cluster comes first lexicographically
        assert_eq!(forward["a_site"], Some(0));
        assert_eq!(forward["m_site"], Some(1));
    }
}
