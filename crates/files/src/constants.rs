/// Folder, relative to a repository root, that holds stored binary files.
///
/// Must be listed in the repository's `.gitignore`.
pub const FILES_FOLDER_NAME: &str = "files";

/// Hash algorithm folder under [`FILES_FOLDER_NAME`].
pub(crate) const HASH_ALGORITHM: &str = "sha256";
