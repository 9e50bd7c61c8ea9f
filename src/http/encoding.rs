use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

#[derive(EnumString, IntoStaticStr, Debug, PartialEq, Eq, Hash, Clone, Copy, Display)]
pub enum Encoding {
    #[strum(serialize = "gzip")]
    Gzip,
    #[strum(serialize = "compress")]
    Compress,
    #[strum(serialize = "deflate")]
    Deflate,
    #[strum(serialize = "br")]
    Br,
    #[strum(serialize = "zstd")]
    Zstd,

    #[strum(serialize = "identity")]
    Identity,
    #[strum(serialize = "*")]
    Any,
}

#[derive(Debug, PartialEq)]
pub struct EncodingVal {
    pub encoding: Encoding,
    pub quality: f32,
}

static ACCEPT_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<enc>[\w*\-]+)\s*(?:;\s*q=(?P<q>0(?:\.\d+)?|1(?:\.0+)?))?")
        .expect("accept-encoding pattern is valid")
});

/// Parses `Accept-Encoding` values into the codings they name. Tokens are
/// matched exactly, so `GZIP` or `x-gzip` are not gzip. Unknown codings and
/// entries with a broken quality are skipped.
pub fn parse_accept_encoding<'a>(
    values: impl IntoIterator<Item = &'a str>,
) -> HashMap<Encoding, EncodingVal> {
    values
        .into_iter()
        .flat_map(|v| v.split(','))
        .filter_map(|entry| {
            let cap = ACCEPT_ENCODING_RE.captures(entry)?;
            let encoding = match Encoding::from_str(cap.name("enc")?.as_str()) {
                Ok(encoding) => encoding,
                Err(_) => {
                    debug!(entry, "skipping unsupported content coding");
                    return None;
                }
            };
            let quality = match cap.name("q") {
                Some(q) => q.as_str().parse::<f32>().ok()?,
                None => 1.0,
            };

            Some((encoding, EncodingVal { encoding, quality }))
        })
        .collect()
}

pub fn accepts(encodings: &HashMap<Encoding, EncodingVal>, encoding: Encoding) -> bool {
    encodings
        .get(&encoding)
        .is_some_and(|v| v.quality > 0.0)
}
