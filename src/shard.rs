//! Deterministic sharded storage paths for repository ids.
//!
//! Ids are zero-padded to 10 digits and split so no leaf directory holds
//! more than 10,000 repositories: id 47_500_123 maps to
//! `000004/0047500123.git`.

/// Exact character length of every valid shard path.
///
/// The archiver refuses to run its recursive delete on a path of any
/// other length.
pub const SHARD_PATH_LEN: usize = 21;

/// Computes the shard path for a repository id.
///
/// Ids up to 10 digits produce a path of exactly [`SHARD_PATH_LEN`]
/// characters; larger ids produce a longer path which the archiver
/// rejects before touching the filesystem.
pub fn shard_path(id: u64) -> String {
    let padded = format!("{:010}", id);
    // Drop the last 4 digits for the parent directory.
    format!("{}/{}.git", &padded[..padded.len() - 4], padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_path_is_deterministic() {
        assert_eq!(shard_path(42), shard_path(42));
        assert_eq!(shard_path(42), "000000/0000000042.git");
    }

    #[test]
    fn test_shard_path_length() {
        for id in [0, 1, 42, 9_999, 10_000, 47_500_123, 9_999_999_999] {
            assert_eq!(shard_path(id).len(), SHARD_PATH_LEN, "id {}", id);
        }
    }

    #[test]
    fn test_ids_sharing_prefix_share_parent_directory() {
        let a = shard_path(47_500_123);
        let b = shard_path(47_509_999);
        assert_eq!(a.split('/').next(), b.split('/').next());
        assert_ne!(a, b);
    }

    #[test]
    fn test_adjacent_shards_differ() {
        let a = shard_path(47_509_999);
        let b = shard_path(47_510_000);
        assert_ne!(a.split('/').next(), b.split('/').next());
    }

    #[test]
    fn test_oversized_id_exceeds_fixed_length() {
        // 11 digits; the archiver must reject this before deleting anything.
        assert!(shard_path(10_000_000_000).len() > SHARD_PATH_LEN);
    }
}
