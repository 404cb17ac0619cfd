//! Storage key constants.

/// Keys used in the credential store.
pub struct StorageKeys;

impl StorageKeys {
    /// Session bearer token
    pub const TOKEN: &'static str = "token";

    /// Theme preference (`light` / `dark`)
    pub const THEME: &'static str = "theme";

    /// Identity payload received over the cross-origin message channel
    pub const CROSS_MESSAGE_INIT_DATA: &'static str = "initData_from_postMessage";

    /// All keys owned by this client.
    pub const ALL: [&'static str; 3] = [Self::TOKEN, Self::THEME, Self::CROSS_MESSAGE_INIT_DATA];
}
