//! Client side: hash a directory, upload it, keep the trusted root, verify
//! downloads.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::merkle::{verify_proof_with, HashScheme, MerkleTree};

use super::{
    validate_file_name, DownloadResponse, StoredFile, Vault, VaultError, VaultResult,
};

/// A local file and its leaf digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    pub path: PathBuf,
    /// Name the file is stored under (its base name)
    pub file_name: String,
    pub digest: String,
}

/// Outcome of uploading a directory.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub session_id: Uuid,
    /// Client tree over the uploaded files, in upload order
    pub tree: MerkleTree,
    pub files: Vec<StoredFile>,
}

impl UploadReport {
    /// Trusted root computed on the client; `None` for an empty directory.
    pub fn root(&self) -> Option<&str> {
        self.tree.root()
    }
}

/// Hash every regular file under `dir`, recursively, ordered by path.
pub fn hash_directory(dir: &Path, scheme: HashScheme) -> VaultResult<Vec<HashedFile>> {
    let mut paths = Vec::new();
    collect_files(dir, &mut paths)?;

    paths
        .into_iter()
        .map(|path| -> VaultResult<HashedFile> {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let digest = scheme.hash_file(&path)?;
            debug!(path = %path.display(), digest = %digest, "file hashed");
            Ok(HashedFile {
                path,
                file_name,
                digest,
            })
        })
        .collect()
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> VaultResult<()> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), out)?;
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

/// Upload every file under `dir` into a new vault session.
///
/// The client builds its own tree from the digests it computed before
/// sending; the resulting root must match the session root reported by the
/// vault.
pub fn upload_directory(vault: &Vault, dir: &Path) -> VaultResult<UploadReport> {
    let scheme = vault.scheme();
    let hashed = hash_directory(dir, scheme)?;
    check_upload_names(&hashed)?;

    let session_id = vault.begin_upload()?;
    let mut tree = MerkleTree::with_scheme(scheme);
    let mut files = Vec::with_capacity(hashed.len());

    for file in &hashed {
        let data = fs::read(&file.path)?;
        if scheme.leaf_digest(&data) != file.digest {
            // Contents changed between hashing and upload.
            return Err(VaultError::IntegrityFailure(file.path.display().to_string()));
        }
        let stored = vault.store_file(session_id, &file.file_name, &data)?;
        tree.add_leaf(file.digest.clone());
        files.push(stored);
    }

    let client_root = tree.root().map(str::to_string);
    let server_root = vault.session_root(session_id)?;
    if client_root != server_root {
        return Err(VaultError::RootMismatch {
            client: client_root.unwrap_or_default(),
            server: server_root.unwrap_or_default(),
        });
    }

    info!(
        session = %session_id,
        files = files.len(),
        root = client_root.as_deref().unwrap_or_default(),
        "directory uploaded"
    );

    Ok(UploadReport {
        session_id,
        tree,
        files,
    })
}

/// Reject names the vault would refuse before any session is opened.
fn check_upload_names(files: &[HashedFile]) -> VaultResult<()> {
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        validate_file_name(&file.file_name)?;
        if !seen.insert(file.file_name.as_str()) {
            return Err(VaultError::DuplicateFile(file.file_name.clone()));
        }
    }
    Ok(())
}

/// Check a download against a trusted root and return the verified bytes.
pub fn verify_download(
    response: &DownloadResponse,
    trusted_root: &str,
    scheme: HashScheme,
) -> VaultResult<Vec<u8>> {
    let digest = scheme.leaf_digest(&response.file_data);
    if verify_proof_with(scheme, &digest, &response.proof, trusted_root) {
        Ok(response.file_data.clone())
    } else {
        warn!(file = %response.file_name, "file integrity verification failed");
        Err(VaultError::IntegrityFailure(response.file_name.clone()))
    }
}

/// Persist a trusted root as bare hex.
pub fn save_root<P: AsRef<Path>>(path: P, root: &str) -> VaultResult<()> {
    fs::write(path, root)?;
    Ok(())
}

/// Load a trusted root written by [`save_root`].
pub fn load_root<P: AsRef<Path>>(path: P) -> VaultResult<String> {
    let path = path.as_ref();
    let root = match fs::read_to_string(path) {
        Ok(raw) => raw.trim().to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if root.is_empty() {
        return Err(VaultError::MissingRoot(path.to_path_buf()));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::merkle::hash_data;

    fn write_tree(dir: &Path) {
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.txt"), b"bravo").unwrap();
        fs::write(dir.join("a.txt"), b"alpha").unwrap();
        fs::write(dir.join("nested").join("c.txt"), b"charlie").unwrap();
    }

    #[test]
    fn test_hash_directory_sorted_and_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        write_tree(tmp.path());

        let hashed = hash_directory(tmp.path(), HashScheme::Plain).unwrap();
        let names: Vec<_> = hashed.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(hashed[2].digest, hash_data(b"charlie"));
    }

    #[test]
    fn test_upload_then_verify() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        write_tree(&source);

        let vault = Vault::with_database(
            tmp.path().join("vault"),
            Database::open_in_memory().unwrap(),
            HashScheme::Plain,
        )
        .unwrap();

        let report = upload_directory(&vault, &source).unwrap();
        assert_eq!(report.files.len(), 3);
        let root = report.root().unwrap().to_string();

        for (name, relative) in [
            ("a.txt", "a.txt"),
            ("b.txt", "b.txt"),
            ("c.txt", "nested/c.txt"),
        ] {
            let response = vault.download(report.session_id, name).unwrap();
            let data = verify_download(&response, &root, HashScheme::Plain).unwrap();
            assert_eq!(data, fs::read(source.join(relative)).unwrap());
        }
    }

    #[test]
    fn test_tampered_download_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        write_tree(&source);

        let vault = Vault::with_database(
            tmp.path().join("vault"),
            Database::open_in_memory().unwrap(),
            HashScheme::Plain,
        )
        .unwrap();
        let report = upload_directory(&vault, &source).unwrap();
        let root = report.root().unwrap();

        let mut response = vault.download(report.session_id, "b.txt").unwrap();
        response.file_data[0] ^= 0x01;
        assert!(matches!(
            verify_download(&response, root, HashScheme::Plain),
            Err(VaultError::IntegrityFailure(_))
        ));
    }

    #[test]
    fn test_duplicate_base_names_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(source.join("x")).unwrap();
        fs::write(source.join("same.txt"), b"1").unwrap();
        fs::write(source.join("x").join("same.txt"), b"2").unwrap();

        let vault = Vault::with_database(
            tmp.path().join("vault"),
            Database::open_in_memory().unwrap(),
            HashScheme::Plain,
        )
        .unwrap();
        assert!(matches!(
            upload_directory(&vault, &source),
            Err(VaultError::DuplicateFile(name)) if name == "same.txt"
        ));

        // The rejected upload leaves no session behind.
        assert!(vault.list_sessions().unwrap().is_empty());
        assert_eq!(fs::read_dir(vault.dir()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_invalid_name_rejected_before_session() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"alpha").unwrap();
        fs::write(source.join("back\\slash.txt"), b"beta").unwrap();

        let vault = Vault::with_database(
            tmp.path().join("vault"),
            Database::open_in_memory().unwrap(),
            HashScheme::Plain,
        )
        .unwrap();
        assert!(matches!(
            upload_directory(&vault, &source),
            Err(VaultError::InvalidFileName(_))
        ));
        assert!(vault.list_sessions().unwrap().is_empty());
        assert_eq!(fs::read_dir(vault.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_root_file_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("merkle_root.txt");

        assert!(matches!(load_root(&path), Err(VaultError::MissingRoot(_))));

        save_root(&path, "abc123").unwrap();
        assert_eq!(load_root(&path).unwrap(), "abc123");

        fs::write(&path, "  \n").unwrap();
        assert!(matches!(load_root(&path), Err(VaultError::MissingRoot(_))));
    }
}
