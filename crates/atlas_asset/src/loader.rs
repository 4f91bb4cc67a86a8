use std::{
    collections::HashMap,
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::search::SearchPaths;

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("'{path}' not found in search paths {searched:?}")]
    NotFound { path: PathBuf, searched: Vec<PathBuf> },
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Raw bytes of a loaded file, together with where it was found.
#[derive(Clone, Debug)]
pub struct Asset {
    pub path: PathBuf,
    pub bytes: Arc<[u8]>,
}

impl Asset {
    /// Interpret the asset as UTF-8 text.
    pub fn text(&self) -> Result<&str, AssetError> {
        std::str::from_utf8(&self.bytes).map_err(|err| AssetError::Io {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, err),
        })
    }
}

/// Resolves relative asset paths through [SearchPaths] and caches what it reads.
pub struct Loader {
    search_paths: SearchPaths,
    assets: HashMap<PathBuf, Asset>,
}

impl Loader {
    pub fn new(search_paths: SearchPaths) -> Self {
        Self {
            search_paths,
            assets: HashMap::new(),
        }
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    /// Find the file for `relative` without reading it.
    pub fn resolve<P: AsRef<Path>>(&self, relative: P) -> Result<PathBuf, AssetError> {
        let relative = relative.as_ref();
        self.search_paths
            .find(relative)
            .ok_or_else(|| AssetError::NotFound {
                path: relative.to_path_buf(),
                searched: self.search_paths.candidates(relative),
            })
    }

    /// Resolve and read `relative`. Repeated loads of the same file are served from the cache.
    pub fn load<P: AsRef<Path>>(&mut self, relative: P) -> Result<Asset, AssetError> {
        let path = self.resolve(relative)?;
        if let Some(asset) = self.assets.get(&path) {
            return Ok(asset.clone());
        }

        let asset = read_asset(&path)?;
        self.assets.insert(path, asset.clone());
        Ok(asset)
    }

    pub fn is_cached<P: AsRef<Path>>(&self, path: P) -> bool {
        self.assets.contains_key(path.as_ref())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(SearchPaths::default())
    }
}

fn read_asset(path: &Path) -> Result<Asset, AssetError> {
    let io_err = |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;
    Ok(Asset {
        path: path.to_path_buf(),
        bytes: bytes.into(),
    })
}
