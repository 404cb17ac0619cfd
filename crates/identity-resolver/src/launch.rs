//! Launch URL query parameters.

use std::collections::BTreeMap;
use url::Url;

/// Query keys that wrap a complete identity blob.
const BLOB_KEYS: [&str; 3] = ["initData", "init_data", "tgWebAppData"];

/// Query parameters the mini-app was launched with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    params: BTreeMap<String, String>,
}

impl LaunchParams {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    /// Parse a bare query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    fn from_pairs<'a>(
        pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
    ) -> Self {
        Self {
            params: pairs
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Raw identity blob carried by the URL.
    ///
    /// A wrapped blob wins over identity fields passed directly.
    pub fn identity_payload(&self) -> Option<String> {
        for key in BLOB_KEYS {
            if let Some(blob) = self.get(key) {
                return Some(blob.to_string());
            }
        }

        if self.get("user_id").is_some() || self.get("id").is_some() {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
            return Some(query.finish());
        }

        None
    }
}
