//! Default configuration values

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Base delay between download retries (in milliseconds)
pub const DOWNLOAD_RETRY_BASE_MS: u64 = 1000;

/// Upper bound on the delay between download retries (in milliseconds)
pub const DOWNLOAD_RETRY_MAX_MS: u64 = 30_000;

/// HTTP request timeout (in seconds)
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Third-party tree root, relative to the working directory
pub const DEFAULT_ROOT: &str = "3rd";

/// CMake generator on Linux and macOS
pub const UNIX_GENERATOR: &str = "Unix Makefiles";

/// CMake generator on Windows
pub const WINDOWS_GENERATOR: &str = "Visual Studio 16 2019";

/// Name of the revision cache file inside a configuration tree
pub const CACHE_FILE_NAME: &str = "revisions.toml";

/// On-disk format version of the revision cache
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Name of the global configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the tree root
pub const ENV_ROOT: &str = "DEPSMITH_ROOT";

/// Environment variable overriding the parallelism hint
pub const ENV_JOBS: &str = "DEPSMITH_JOBS";
