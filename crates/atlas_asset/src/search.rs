use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Environment variable conventionally used to provide asset search directories.
pub const DEFAULT_ENV_VAR: &str = "ATLAS_TEXT_FILE_PATH";

/// An ordered list of directories that relative asset paths are resolved against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchPaths {
    paths: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Read search directories from an environment variable.
    ///
    /// The value is split with the platform path separator (`:` on unix, `;` on windows). An
    /// unset variable yields an empty list.
    pub fn from_env<K: AsRef<OsStr>>(var: K) -> Self {
        let paths = env::var_os(var)
            .map(|value| {
                env::split_paths(&value)
                    .filter(|path| !path.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { paths }
    }

    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.push(path);
        self
    }

    pub fn push<P: Into<PathBuf>>(&mut self, path: P) {
        self.paths.push(path.into());
    }

    /// Append every directory of `other` after the existing ones.
    pub fn extend(&mut self, other: SearchPaths) {
        self.paths.extend(other.paths);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Resolve `relative` against each directory in order, returning the first existing file.
    ///
    /// An absolute path is returned as-is if it exists.
    pub fn find<P: AsRef<Path>>(&self, relative: P) -> Option<PathBuf> {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            return relative.is_file().then(|| relative.to_path_buf());
        }

        let found = self
            .paths
            .iter()
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file());
        match &found {
            Some(path) => log::debug!("resolved {:?} to {:?}", relative, path),
            None => log::debug!("{:?} not found in {} search path(s)", relative, self.paths.len()),
        }
        found
    }

    /// The candidate locations `find` would check for `relative`, in order.
    pub fn candidates<P: AsRef<Path>>(&self, relative: P) -> Vec<PathBuf> {
        self.paths
            .iter()
            .map(|dir| dir.join(relative.as_ref()))
            .collect()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for SearchPaths {
    fn from_iter<T: IntoIterator<Item = P>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}
