use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One media item as reported by the camera.
///
/// `url` is the primary asset. The auxiliary URLs point at companion files
/// (FIT metadata track, low-resolution preview video, thumbnail); the camera
/// reports a missing companion as an empty string, which is decoded as
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "fitURL", deserialize_with = "empty_as_none")]
    pub fit_url: Option<String>,
    #[serde(default, rename = "lowResVideoPath", deserialize_with = "empty_as_none")]
    pub low_res_video_url: Option<String>,
    #[serde(default, rename = "thumbUrl", deserialize_with = "empty_as_none")]
    pub thumb_url: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "empty_as_none")]
    pub media_type: Option<String>,
    /// Capture time in unix seconds.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub date: Option<i64>,
    #[serde(default, rename = "fileSize", deserialize_with = "lenient_u64")]
    pub file_size: Option<u64>,
}

impl MediaDescriptor {
    /// Auxiliary URLs in a fixed order: FIT track, low-res video, thumbnail.
    pub fn auxiliary_urls(&self) -> impl Iterator<Item = &str> {
        [&self.fit_url, &self.low_res_video_url, &self.thumb_url]
            .into_iter()
            .filter_map(|u| u.as_deref())
    }

    /// Apply `f` to every non-empty URL carried by this descriptor.
    pub(crate) fn rewrite_urls(&mut self, f: impl Fn(&str) -> String) {
        if !self.url.is_empty() {
            self.url = f(&self.url);
        }
        for url in [
            &mut self.fit_url,
            &mut self.low_res_video_url,
            &mut self.thumb_url,
        ]
        .into_iter()
        .flatten()
        {
            *url = f(url);
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

// Firmware revisions disagree on whether numbers are sent as JSON numbers or
// strings, so accept both and drop anything else.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
