//! Storage for checkout payment proofs, served back under `/uploads`.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// URL prefix the upload directory is mounted at
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Extension of the client's file name, kept only when it is short and alphanumeric
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// `proof-<millis>-<random><ext>`
pub fn proof_file_name(original_name: Option<&str>) -> String {
    let random = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!(
        "proof-{}-{}{}",
        Utc::now().timestamp_millis(),
        random,
        extension_of(original_name)
    )
}

/// Write a proof into `dir` and return its public URL
pub async fn store_proof(dir: &Path, original_name: Option<&str>, bytes: &[u8]) -> std::io::Result<String> {
    fs::create_dir_all(dir).await?;
    let file_name = proof_file_name(original_name);
    let path: PathBuf = dir.join(&file_name);
    fs::write(&path, bytes).await?;
    tracing::info!("Stored payment proof {} ({} bytes)", file_name, bytes.len());
    Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
}

/// Remove a proof stored by [`store_proof`]; URLs outside the upload prefix are ignored
pub async fn discard_proof(dir: &Path, url: &str) {
    let Some(file_name) = url
        .strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
    else {
        return;
    };
    match fs::remove_file(dir.join(file_name)).await {
        Ok(()) => tracing::info!("Discarded payment proof {}", file_name),
        Err(e) => tracing::warn!("Could not discard payment proof {}: {}", file_name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_keep_safe_extensions() {
        let name = proof_file_name(Some("comprovante.PNG"));
        assert!(name.starts_with("proof-"));
        assert!(name.ends_with(".png"));
        assert!(!proof_file_name(Some("../../etc/passwd")).contains('/'));
        assert!(!proof_file_name(Some("x.p h p")).contains(' '));
        assert_eq!(extension_of(None), "");
    }

    #[tokio::test]
    async fn proofs_are_written_under_the_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let url = store_proof(dir.path(), Some("pix.jpg"), b"fake image").await.unwrap();
        assert!(url.starts_with("/uploads/proof-"));
        let file_name = url.trim_start_matches("/uploads/");
        let written = std::fs::read(dir.path().join(file_name)).unwrap();
        assert_eq!(written, b"fake image");
    }

    #[tokio::test]
    async fn discarded_proofs_leave_the_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let url = store_proof(dir.path(), Some("pix.jpg"), b"fake image").await.unwrap();
        discard_proof(dir.path(), &url).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn discard_stays_inside_the_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"x").unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir(&uploads).unwrap();

        discard_proof(&uploads, "/uploads/../keep.txt").await;
        discard_proof(&uploads, "/elsewhere/keep.txt").await;
        assert!(outside.exists());
    }
}
