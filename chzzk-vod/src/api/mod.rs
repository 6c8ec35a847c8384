pub mod mpd;
mod vod;

pub use vod::{
    RewindPlayback, parse_info, resolve, resolve_manifest_locator,
    resolve_segmented_playback_locator,
};

use crate::error::{Error, Result};
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

pub const VOD_INFO_API: &str = "https://api.chzzk.naver.com/service/v2/videos/";
pub const VOD_PLAYBACK_API: &str = "https://apis.naver.com/neonplayer/vodplay/v2/playback/";

static VOD_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?://)?(?:m\.)?chzzk\.naver\.com/video/(\d+)/?(?:[?#].*)?$").unwrap());

/// Extract the numeric video number from a vod page url.
pub fn video_no(source_url: &str) -> Result<String> {
    VOD_URL
        .captures(source_url.trim())
        .and_then(|x| x.get(1))
        .map(|x| x.as_str().to_owned())
        .ok_or_else(|| {
            Error::invalid_input(format!(
                "{} is not a chzzk vod url (https://chzzk.naver.com/video/<number>)",
                source_url.trim()
            ))
        })
}

/// Headers sent to the chzzk api and forwarded to external downloaders.
#[derive(Clone, Debug)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
    pub cookie: Option<String>,
}

impl RequestHeaders {
    pub fn new(cookies: &BTreeMap<String, String>) -> Self {
        let user_agent = if cfg!(target_os = "windows") {
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36"
        } else {
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36"
        };

        Self {
            user_agent: user_agent.to_owned(),
            referer: "https://chzzk.naver.com/".to_owned(),
            origin: "https://chzzk.naver.com".to_owned(),
            cookie: cookie_header(cookies),
        }
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let invalid = |name: &str| Error::invalid_input(format!("invalid {} header value", name));

        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.user_agent).map_err(|_| invalid("user-agent"))?,
        );
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&self.referer).map_err(|_| invalid("referer"))?,
        );
        headers.insert(
            HeaderName::from_static("origin"),
            HeaderValue::from_str(&self.origin).map_err(|_| invalid("origin"))?,
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, */*"));

        if let Some(cookie) = &self.cookie {
            headers.insert(
                header::COOKIE,
                HeaderValue::from_str(cookie).map_err(|_| invalid("cookie"))?,
            );
        }

        Ok(headers)
    }
}

/// `name=value; name=value` join of the stored cookies.
pub fn cookie_header(cookies: &BTreeMap<String, String>) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }

    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Http client preloaded with chzzk request headers.
#[derive(Clone)]
pub struct Client {
    pub headers: RequestHeaders,
    inner: reqwest::Client,
}

impl Client {
    pub fn new(headers: RequestHeaders) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .default_headers(headers.header_map()?)
            .build()?;
        Ok(Self { headers, inner })
    }

    pub(crate) async fn get_text(&self, url: &str, accept: Option<&'static str>) -> Result<String> {
        let mut request = self.inner.get(url);

        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // The info endpoint reports failures inside a json envelope, keep the body for it.
        if !status.is_success() && !text.trim_start().starts_with('{') {
            return Err(Error::upstream(format!("{} responded with {}", url, status)));
        }

        Ok(text)
    }

    /// Content length of `url` learnt from a HEAD request.
    pub async fn probe_size(&self, url: &str) -> Result<Option<u64>> {
        let response = self
            .inner
            .head(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;

        Ok(response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|x| x.to_str().ok())
            .and_then(|x| x.parse::<u64>().ok())
            .filter(|x| *x > 0))
    }
}
