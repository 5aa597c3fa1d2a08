//! Application constants and configuration values

// === Backend tables ===
pub const STICKERS_TABLE: &str = "stickers";
pub const SUBSCRIPTIONS_TABLE: &str = "user_subscriptions";
pub const PROFILES_TABLE: &str = "user_profiles";

// === Backend columns & conflict keys ===
pub const SUBSCRIPTION_KEY_COLUMN: &str = "email";
pub const PROFILE_EMAIL_COLUMN: &str = "email";
pub const PROFILE_USER_ID_COLUMN: &str = "user_id";
pub const STICKER_LIKES_COLUMN: &str = "likes";
pub const DEFAULT_SUBSCRIPTION_STATUS: &str = "active";

// === Atomic like counter RPC ===
pub const TOGGLE_LIKES_RPC: &str = "toggle_likes";
pub const TOGGLE_LIKES_ID_ARG: &str = "sticker_id";
pub const TOGGLE_LIKES_FLAG_ARG: &str = "should_increment";

// === Storage paths ===
pub const REST_PATH: &str = "rest/v1";
pub const STICKER_IMAGE_PATH: &str = "storage/v1/object/public/stickers";

// === Local persistence ===
pub const APP_DATA_DIR: &str = "stickerdrop";
pub const LIKED_DB_FILE: &str = "liked.db";

// === Networking ===
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STUDIO_CONTACT: &str = "studio@stickerdrop.app";

// === Display ===
pub const COMPACT_COUNT_THRESHOLD: u64 = 1000;
