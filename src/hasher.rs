//! Content hashing and manifest construction.
//!
//! The digest is a pure function of the file bytes: the same bytes always
//! produce the same digest regardless of path, which is what lets both
//! backends recognise re-uploaded content as already known.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::contract::{ContentManifest, DeployableFile};
use crate::error::{DeployError, DeployResult};

const INDEX_SUFFIX: &str = "/index.html";

/// Hex SHA-256 of the given bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Build the path→digest manifest for a file set.
///
/// Besides the literal paths, the manifest carries two derived equivalences
/// so directory-style requests resolve without a separate routing rule:
/// - `/x/index.html` additionally maps `/x` and `/x/` to the same digest;
/// - when `/index.html` exists and no explicit `/` entry does, `/` is
///   injected with its digest.
///
/// Two different byte payloads producing the same digest is an integrity
/// violation and aborts with [`DeployError::HashCollision`].
pub fn build_manifest(files: &[DeployableFile]) -> DeployResult<ContentManifest> {
    let mut manifest = ContentManifest::new();
    let mut seen: HashMap<String, (&str, &[u8])> = HashMap::new();

    for file in files {
        let digest = hash_bytes(&file.content);
        if let Some((other_path, other_bytes)) = seen.get(&digest) {
            if *other_bytes != file.content.as_slice() {
                return Err(DeployError::HashCollision {
                    existing: (*other_path).to_string(),
                    incoming: file.path.clone(),
                    digest,
                });
            }
        } else {
            seen.insert(digest.clone(), (file.path.as_str(), file.content.as_slice()));
        }

        let path = leading_slash(&file.path);
        manifest.insert(path.clone(), digest.clone());

        if let Some(folder) = path.strip_suffix(INDEX_SUFFIX) {
            if !folder.is_empty() {
                manifest.insert(folder.to_string(), digest.clone());
                manifest.insert(format!("{folder}/"), digest.clone());
            }
        }
    }

    if !manifest.contains_key("/") {
        if let Some(root_digest) = manifest.get(INDEX_SUFFIX).cloned() {
            manifest.insert("/".to_string(), root_digest);
        }
    }

    debug!(
        files = files.len(),
        entries = manifest.len(),
        "[HASH] Manifest built"
    );
    Ok(manifest)
}

/// Normalize a path to exactly one leading slash.
pub fn leading_slash(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
