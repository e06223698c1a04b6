use std::fs;

use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Error, Result};

/// Bytes left as-is by query encoding; everything else becomes `%XX`.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The four `--data*` flag families, each in command-line order.
#[derive(Debug, Clone, Default)]
pub struct DataFlags {
    /// `--data` followed by `--data-ascii`.
    pub ascii: Vec<String>,
    pub raw: Vec<String>,
    pub binary: Vec<String>,
    pub urlencode: Vec<String>,
}

impl DataFlags {
    pub fn is_empty(&self) -> bool {
        self.ascii.is_empty()
            && self.raw.is_empty()
            && self.binary.is_empty()
            && self.urlencode.is_empty()
    }
}

/// One `key=value` or bare unit of a URL-encoded body, as sent on the wire.
pub type Fragment = Vec<u8>;

/// Merge all data flags into the ordered list of body fragments.
///
/// `@file` values in the ascii family are read eagerly with CR and LF removed
/// and otherwise passed through byte for byte; a file that cannot be read is a
/// fatal error.
pub fn aggregate(flags: &DataFlags) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::new();

    for entry in &flags.ascii {
        let Some((key, value)) = entry.split_once('=') else {
            fragments.push(entry.clone().into_bytes());
            continue;
        };
        match value.strip_prefix('@') {
            Some(path) => {
                let content = fs::read(path).map_err(|source| Error::DataFile {
                    path: path.to_string(),
                    key: key.to_string(),
                    source,
                })?;
                debug!("Read {} bytes for data element {} from {}", content.len(), key, path);
                let mut fragment = Vec::with_capacity(key.len() + 1 + content.len());
                fragment.extend_from_slice(key.as_bytes());
                fragment.push(b'=');
                fragment.extend(content.into_iter().filter(|b| *b != b'\r' && *b != b'\n'));
                fragments.push(fragment);
            }
            None => fragments.push(entry.clone().into_bytes()),
        }
    }

    for entry in flags.raw.iter().chain(&flags.binary) {
        let (key, value) = split_pair(entry)?;
        fragments.push(format!("{}={}", key, value).into_bytes());
    }

    let mut encoded = Vec::with_capacity(flags.urlencode.len());
    for entry in &flags.urlencode {
        let (key, value) = split_pair(entry)?;
        encoded.push(format!("{}={}", query_escape(key), query_escape(value)));
    }
    if !encoded.is_empty() {
        fragments.push(encoded.join("&").into_bytes());
    }

    Ok(fragments)
}

/// Join fragments into the `application/x-www-form-urlencoded` body.
pub fn join(fragments: &[Fragment]) -> Vec<u8> {
    fragments.join(&b'&')
}

fn split_pair(entry: &str) -> Result<(&str, &str)> {
    entry
        .split_once('=')
        .ok_or_else(|| Error::MalformedData(entry.to_string()))
}

/// Query-string escaping: unreserved bytes kept, space as `+`.
fn query_escape(s: &str) -> String {
    utf8_percent_encode(s, QUERY)
        .to_string()
        .replace("%20", "+")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(ascii: &[&str], raw: &[&str], binary: &[&str], urlencode: &[&str]) -> DataFlags {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        DataFlags {
            ascii: owned(ascii),
            raw: owned(raw),
            binary: owned(binary),
            urlencode: owned(urlencode),
        }
    }

    fn text(fragments: &[Fragment]) -> Vec<&str> {
        fragments
            .iter()
            .map(|f| std::str::from_utf8(f).unwrap())
            .collect()
    }

    #[test]
    fn test_order_is_preserved() {
        let f = flags(&["z=1", "a=2"], &["r=3"], &["b=4"], &["k2=v2", "k1=v1"]);
        let fragments = aggregate(&f).unwrap();
        assert_eq!(text(&fragments), vec!["z=1", "a=2", "r=3", "b=4", "k2=v2&k1=v1"]);
        assert_eq!(join(&fragments), b"z=1&a=2&r=3&b=4&k2=v2&k1=v1".to_vec());
    }

    #[test]
    fn test_file_value_strips_line_breaks() {
        let path = std::env::temp_dir().join(format!("kurl-data-{}.txt", std::process::id()));
        std::fs::write(&path, "a\r\nb\n").unwrap();
        let entry = format!("key=@{}", path.display());

        let fragments = aggregate(&flags(&[&entry], &[], &[], &[])).unwrap();
        assert_eq!(text(&fragments), vec!["key=ab"]);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_file_value_keeps_non_utf8_bytes() {
        let path = std::env::temp_dir().join(format!("kurl-latin1-{}.txt", std::process::id()));
        std::fs::write(&path, b"caf\xE9\n").unwrap();
        let entry = format!("k=@{}", path.display());

        let fragments = aggregate(&flags(&[&entry], &[], &[], &[])).unwrap();
        assert_eq!(fragments, vec![b"k=caf\xE9".to_vec()]);
        assert_eq!(join(&fragments), b"k=caf\xE9".to_vec());

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = aggregate(&flags(&["key=@/no/such/kurl/file"], &[], &[], &[])).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, Error::DataFile { ref key, .. } if key == "key"));
    }

    #[test]
    fn test_bare_entry_is_verbatim() {
        let fragments = aggregate(&flags(&["just-some text", "@notafile"], &[], &[], &[])).unwrap();
        assert_eq!(text(&fragments), vec!["just-some text", "@notafile"]);
    }

    #[test]
    fn test_raw_keeps_at_sign() {
        let fragments = aggregate(&flags(&[], &["key=@literal"], &["bin=@x=y"], &[])).unwrap();
        assert_eq!(text(&fragments), vec!["key=@literal", "bin=@x=y"]);
    }

    #[test]
    fn test_raw_without_equals_is_rejected() {
        let err = aggregate(&flags(&[], &["noequals"], &[], &[])).unwrap_err();
        assert!(matches!(err, Error::MalformedData(ref s) if s == "noequals"));
        assert!(aggregate(&flags(&[], &[], &[], &["alone"])).is_err());
    }

    #[test]
    fn test_urlencode_escapes_key_and_value() {
        let fragments = aggregate(&flags(&[], &[], &[], &["a b=c&d", "ü=1+1=2"])).unwrap();
        assert_eq!(text(&fragments), vec!["a+b=c%26d&%C3%BC=1%2B1%3D2"]);
    }

    #[test]
    fn test_urlencode_does_not_double_decode_literal_percent() {
        assert_eq!(query_escape("%20"), "%2520");
        assert_eq!(query_escape("safe-_.~"), "safe-_.~");
    }

    #[test]
    fn test_empty_flags() {
        let f = DataFlags::default();
        assert!(f.is_empty());
        assert!(aggregate(&f).unwrap().is_empty());
    }
}
