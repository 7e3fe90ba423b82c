use std::{
    ffi::{OsStr, OsString},
    path::PathBuf,
};

pub trait DashcapPathExt {
    /// Add suffix to file name without changing extension.
    ///
    /// Note this function does not handle multiple suffixes.
    /// For example, `test.tar.gz` with `_suffix` will be `test.tar_suffix.gz`.
    fn add_suffix<T: AsRef<OsStr>>(&mut self, suffix: T);

    /// Prepend `prefix` to the file name.
    fn add_prefix<T: AsRef<OsStr>>(&mut self, prefix: T);

    /// `name.ext` => `name.ext.part`
    fn with_part_extension(&self) -> PathBuf;
}

impl DashcapPathExt for PathBuf {
    fn add_suffix<T: AsRef<OsStr>>(&mut self, suffix: T) {
        let mut filename = OsString::new();

        // {file_stem}_{suffix}.{ext}
        if let Some(file_stem) = self.file_stem() {
            filename.push(file_stem);
        }
        filename.push("_");
        filename.push(suffix);

        if let Some(ext) = self.extension() {
            filename.push(".");
            filename.push(ext);
        }

        self.set_file_name(filename);
    }

    fn add_prefix<T: AsRef<OsStr>>(&mut self, prefix: T) {
        let mut filename = OsString::from(prefix.as_ref());
        if let Some(name) = self.file_name() {
            filename.push(name);
        }
        self.set_file_name(filename);
    }

    fn with_part_extension(&self) -> PathBuf {
        let mut filename = self.file_name().unwrap_or_default().to_os_string();
        filename.push(".part");
        self.with_file_name(filename)
    }
}
