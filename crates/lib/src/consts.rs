/// Application name, used for config/data/cache directory names.
pub const APP_NAME: &str = "pour";

/// Environment variable overriding the install prefix.
pub const PREFIX_ENV: &str = "POUR_PREFIX";

/// Environment variable overriding the formula directory.
pub const FORMULA_PATH_ENV: &str = "POUR_FORMULA_PATH";

/// Environment variable overriding the scratch root.
pub const SCRATCH_DIR_ENV: &str = "POUR_SCRATCH_DIR";

/// Directory (relative to the prefix) holding install receipts and the prefix lock.
pub const RECEIPT_DIR: &str = "var/db/pour";

/// Value of `SOURCE_DATE_EPOCH` for build steps: 1980-01-01T00:00:00Z (ZIP epoch).
pub const SOURCE_DATE_EPOCH: &str = "315532800";
