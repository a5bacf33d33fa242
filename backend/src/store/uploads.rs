use std::io;
use std::path::{Path, PathBuf};

use hex;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Keeps submitted images on local disk under the directory that is also
/// mounted at `/static`, so a stored record's `image_path` stays
/// servable. Files are keyed by content hash; resubmitting the same
/// image lands on the same key.
#[derive(Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn upload_key(upload: &UploadedImage) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&upload.data);
        let hash = hex::encode(hasher.finalize());

        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "img".to_string());
        format!("{hash}.{extension}")
    }

    /// Writes the image and returns the web path it is served under.
    pub fn save(&self, upload: &UploadedImage) -> io::Result<String> {
        let key = Self::upload_key(upload);
        std::fs::write(self.dir.join(&key), &upload.data)?;
        Ok(format!("/static/{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> UploadStore {
        let dir = std::env::temp_dir().join(format!(
            "upload-store-test-{}",
            std::process::id()
        ));
        UploadStore::new(dir).unwrap()
    }

    fn upload(name: &str, data: &[u8]) -> UploadedImage {
        UploadedImage {
            file_name: name.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn keys_are_content_hashes_with_the_original_extension() {
        let a = upload("scan.PNG", b"pixels");
        let b = upload("other-name.png", b"pixels");
        let key_a = UploadStore::upload_key(&a);
        let key_b = UploadStore::upload_key(&b);
        assert!(key_a.ends_with(".png"));
        // Same bytes, same key, regardless of the client's file name.
        assert_eq!(key_a.split('.').next(), key_b.split('.').next());

        let c = upload("extensionless", b"pixels");
        assert!(UploadStore::upload_key(&c).ends_with(".img"));
    }

    #[test]
    fn save_writes_the_file_and_returns_the_web_path() {
        let store = temp_store();
        let image = upload("scan.jpg", b"jpeg bytes");
        let web_path = store.save(&image).unwrap();
        assert!(web_path.starts_with("/static/"));
        assert!(web_path.ends_with(".jpg"));

        let key = web_path.trim_start_matches("/static/");
        let on_disk = store.dir.join(key);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"jpeg bytes");
    }
}
