pub const DEFAULT_CONFIG_PATH: &str = "./digest_config.yaml";
pub const CONFIG_PATH_ENV: &str = "DIGEST_CONFIG_PATH";
pub const BIND_ADDRESS_ENV: &str = "BIND_ADDRESS";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:9091";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 70_000;
pub const PING_PATH: &str = "/ping";
pub const SUMMARIES_STREAM_PATH: &str = "/v1/summaries/stream";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
