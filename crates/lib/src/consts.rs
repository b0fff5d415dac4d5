//! Crate-wide constants.

/// Application name, used for cache and config directories.
pub const APP_NAME: &str = "fab";

/// Environment variable overriding the local artifact repository location.
pub const REPOSITORY_ENV: &str = "FAB_REPOSITORY";

/// Artifact type assumed when a coordinate does not name one.
pub const DEFAULT_TYPE: &str = "jar";

/// Artifact type of feature descriptors.
pub const FEATURE_TYPE: &str = "feature";

/// Prefix of assembled-map keys holding synthesized aggregate features.
pub const AGGREGATE_KEY_PREFIX: &str = ":aggregate:";

/// Feature directory of the main scope, relative to a module directory.
pub const MAIN_FEATURES_DIR: &str = "src/main/features";

/// Feature directory of the test scope, relative to a module directory.
pub const TEST_FEATURES_DIR: &str = "src/test/features";

/// File extension of feature descriptors on disk.
pub const FEATURE_FILE_EXT: &str = "json";

/// Default name of the reactor manifest.
pub const MANIFEST_FILENAME: &str = "fab.json";

/// Length of the hex digest shown for assembled features.
pub const DIGEST_PREFIX_LEN: usize = 16;
