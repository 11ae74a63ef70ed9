//! Content digests compatible with git's object naming.
//!
//! Every record in the mirror store is keyed by the git blob id of its
//! message-id. Reproducing git's hashing here means the store's tree listing
//! already enumerates every known message-id: `git hash-object` of a file
//! containing `<key>\n` yields exactly the entry name the store uses, so no
//! separate index has to be maintained or persisted.

use sha1::{Digest, Sha1};

/// Compute the git blob object id for content `key` plus a trailing newline.
///
/// Matches `printf '%s\n' "$key" | git hash-object --stdin` byte for byte:
/// the digest is SHA-1 over `"blob " + (len(key)+1) + NUL + key + "\n"`.
pub fn blob_digest(key: &str) -> String {
    let bytes = key.as_bytes();
    let mut hasher = Sha1::new();
    hasher.update(b"blob ");
    hasher.update((bytes.len() + 1).to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hasher.update(b"\n");

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}
