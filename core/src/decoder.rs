//! File decoders keyed by extension.
//!
//! A decoder turns raw file bytes into a JSON value. Each extension maps to
//! an ordered chain of candidate decoders; loading tries them in order and
//! keeps the first result that decodes successfully *and* is an object.
//! JSON (`json`) is registered by default.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Error type returned by decoder functions.
pub type DecodeError = Box<dyn std::error::Error + Send + Sync>;

/// A shareable decoder function.
pub type Decoder = Arc<dyn Fn(&[u8]) -> Result<Value, DecodeError> + Send + Sync>;

/// Wraps a closure as a [`Decoder`].
///
/// # Examples
///
/// ```
/// use config_schema_core::decoder;
///
/// let upper = decoder(|bytes| Ok(serde_json::json!({ "len": bytes.len() })));
/// assert_eq!(upper(b"abc").unwrap(), serde_json::json!({"len": 3}));
/// ```
pub fn decoder<F>(f: F) -> Decoder
where
    F: Fn(&[u8]) -> Result<Value, DecodeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Decodes JSON bytes.
pub fn json_decoder(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[derive(Clone)]
pub(crate) struct DecoderTable {
    chains: HashMap<String, Vec<Decoder>>,
}

impl DecoderTable {
    pub(crate) fn new() -> Self {
        let mut chains = HashMap::new();
        chains.insert("json".to_string(), vec![decoder(json_decoder)]);
        Self { chains }
    }

    /// Replaces the chain for `ext`.
    pub(crate) fn set(&mut self, ext: &str, chain: Vec<Decoder>) {
        self.chains.insert(normalize_ext(ext), chain);
    }

    pub(crate) fn get(&self, ext: &str) -> Option<&[Decoder]> {
        self.chains.get(&normalize_ext(ext)).map(Vec::as_slice)
    }

    pub(crate) fn contains(&self, ext: &str) -> bool {
        self.get(ext).is_some_and(|chain| !chain.is_empty())
    }
}

impl fmt::Debug for DecoderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exts: Vec<(&str, usize)> = self
            .chains
            .iter()
            .map(|(ext, chain)| (ext.as_str(), chain.len()))
            .collect();
        exts.sort_unstable();
        f.debug_map().entries(exts).finish()
    }
}

pub(crate) fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}
