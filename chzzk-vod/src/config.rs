//! Persisted user settings and session cookies.
//!
//! Everything lives next to the executable unless another base directory is
//! given: `settings.json` at the top and `dependent/cookie.json` beside the
//! bundled tools.

use crate::{
    error::{Error, Result},
    utils,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    env, fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

pub const COOKIE_FILE: &str = "cookie.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const MAX_RECENT_VODS: usize = 5;
const MAX_RECENT_TITLE: usize = 50;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RecentVod {
    pub url: String,
    pub title: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_folder: Option<PathBuf>,
    #[serde(default)]
    pub is_adult_content: bool,
    #[serde(default)]
    pub last_quality_name: String,
    #[serde(default, rename = "lastVodURL")]
    pub last_vod_url: String,
    #[serde(default)]
    pub recent_vods: Vec<RecentVod>,
    /// Older settings files only kept urls.
    #[serde(default, rename = "recentVodURLs", skip_serializing)]
    recent_vod_urls: Vec<String>,
}

impl UserSettings {
    /// Put a vod at the front of the recent list, dropping an older entry of
    /// the same url and anything past [`MAX_RECENT_VODS`].
    pub fn add_recent_vod(&mut self, url: &str, title: &str) {
        self.recent_vods.retain(|x| x.url != url);
        self.recent_vods.insert(
            0,
            RecentVod {
                url: url.to_owned(),
                title: utils::truncate_chars(title, MAX_RECENT_TITLE),
            },
        );
        self.recent_vods.truncate(MAX_RECENT_VODS);
        self.last_vod_url = url.to_owned();
    }

    fn migrate(&mut self) {
        if self.recent_vods.is_empty() {
            self.recent_vods = self
                .recent_vod_urls
                .iter()
                .map(|x| RecentVod {
                    url: x.to_owned(),
                    title: "(untitled)".to_owned(),
                })
                .collect();
        }

        self.recent_vod_urls.clear();
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    base_dir: PathBuf,
}

impl Config {
    /// `base_dir` defaults to the directory of the running executable, then
    /// to the current directory.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        let base_dir = base_dir
            .or_else(|| {
                env::current_exe()
                    .ok()
                    .and_then(|x| x.parent().map(|y| y.to_path_buf()))
            })
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn deps_dir(&self) -> PathBuf {
        self.base_dir.join("dependent")
    }

    pub fn cookie_file(&self) -> PathBuf {
        self.deps_dir().join(COOKIE_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }

    pub fn default_download_folder(&self) -> PathBuf {
        self.base_dir.join("downloads")
    }

    pub fn download_folder(&self, settings: &UserSettings) -> PathBuf {
        settings
            .download_folder
            .clone()
            .filter(|x| !x.as_os_str().is_empty())
            .unwrap_or_else(|| self.default_download_folder())
    }

    /// Stored cookies, empty when the file is missing or unreadable.
    pub fn load_cookies(&self) -> BTreeMap<String, String> {
        let path = self.cookie_file();

        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                debug!("ignoring corrupt {}: {}", path.to_string_lossy(), e);
                BTreeMap::new()
            }),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!("could not read {}: {}", path.to_string_lossy(), e);
                }
                BTreeMap::new()
            }
        }
    }

    pub fn save_cookies(&self, cookies: &BTreeMap<String, String>) -> Result<()> {
        let deps_dir = self.deps_dir();
        fs::create_dir_all(&deps_dir).map_err(|e| Error::fs(&deps_dir, e))?;
        write_json(&self.cookie_file(), cookies)
    }

    /// Store the naver login cookies which unlock age restricted vods.
    pub fn set_adult_cookies(&self, nid_aut: &str, nid_ses: &str) -> Result<()> {
        let mut cookies = self.load_cookies();
        cookies.insert("NID_AUT".to_owned(), nid_aut.trim().to_owned());
        cookies.insert("NID_SES".to_owned(), nid_ses.trim().to_owned());
        self.update_user_settings(|x| x.is_adult_content = true)?;
        self.save_cookies(&cookies)
    }

    pub fn clear_cookies(&self) -> Result<()> {
        let path = self.cookie_file();

        match fs::remove_file(&path) {
            Ok(_) => (),
            Err(e) if e.kind() == ErrorKind::NotFound => (),
            Err(e) => return Err(Error::fs(path, e)),
        }

        self.update_user_settings(|x| x.is_adult_content = false)
    }

    /// Settings on disk, defaults when there is no settings file yet.
    pub fn load_user_settings(&self) -> Result<UserSettings> {
        let path = self.settings_file();

        let bytes = match fs::read(&path) {
            Ok(x) => x,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UserSettings::default()),
            Err(e) => return Err(Error::fs(path, e)),
        };

        let mut settings = serde_json::from_slice::<UserSettings>(&bytes)
            .map_err(|e| Error::fs(&path, io::Error::from(e)))?;
        settings.migrate();
        Ok(settings)
    }

    pub fn save_user_settings(&self, settings: &UserSettings) -> Result<()> {
        fs::create_dir_all(&self.base_dir).map_err(|e| Error::fs(&self.base_dir, e))?;
        write_json(&self.settings_file(), settings)
    }

    pub fn update_user_settings<F>(&self, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut UserSettings),
    {
        let mut settings = self.load_user_settings()?;
        mutator(&mut settings);
        self.save_user_settings(&settings)
    }

    pub fn add_recent_vod(&self, url: &str, title: &str) -> Result<()> {
        self.update_user_settings(|x| x.add_recent_vod(url, title))
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| Error::fs(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_vods_are_capped_and_deduplicated() {
        let mut settings = UserSettings::default();

        for i in 0..7 {
            settings.add_recent_vod(&format!("https://chzzk.naver.com/video/{}", i), "title");
        }

        assert_eq!(settings.recent_vods.len(), MAX_RECENT_VODS);
        assert_eq!(settings.recent_vods[0].url, "https://chzzk.naver.com/video/6");
        assert_eq!(settings.recent_vods[4].url, "https://chzzk.naver.com/video/2");

        settings.add_recent_vod("https://chzzk.naver.com/video/4", "again");
        assert_eq!(settings.recent_vods.len(), MAX_RECENT_VODS);
        assert_eq!(settings.recent_vods[0].title, "again");
        assert_eq!(
            settings
                .recent_vods
                .iter()
                .filter(|x| x.url.ends_with("/4"))
                .count(),
            1
        );
        assert_eq!(settings.last_vod_url, "https://chzzk.naver.com/video/4");
    }

    #[test]
    fn long_titles_are_cut() {
        let mut settings = UserSettings::default();
        let title = "가".repeat(60);
        settings.add_recent_vod("u", &title);

        let stored = &settings.recent_vods[0].title;
        assert_eq!(stored.chars().count(), 50);
        assert!(stored.ends_with("..."));
        assert!(stored.starts_with(&"가".repeat(47)));
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(Some(dir.path().to_path_buf()));

        let settings = config.load_user_settings().unwrap();
        assert!(settings.recent_vods.is_empty());
        assert_eq!(config.download_folder(&settings), dir.path().join("downloads"));

        config.add_recent_vod("https://chzzk.naver.com/video/1", "first").unwrap();
        config
            .update_user_settings(|x| x.last_quality_name = "1080p".to_owned())
            .unwrap();

        let settings = config.load_user_settings().unwrap();
        assert_eq!(settings.recent_vods[0].title, "first");
        assert_eq!(settings.last_quality_name, "1080p");

        let raw = fs::read_to_string(config.settings_file()).unwrap();
        assert!(raw.contains("\"lastVodURL\""));
        assert!(raw.contains("\"recentVods\""));
    }

    #[test]
    fn legacy_recent_urls() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(Some(dir.path().to_path_buf()));
        fs::write(
            config.settings_file(),
            r#"{"downloadFolder":"","recentVodURLs":["https://chzzk.naver.com/video/9"]}"#,
        )
        .unwrap();

        let settings = config.load_user_settings().unwrap();
        assert_eq!(settings.recent_vods.len(), 1);
        assert_eq!(settings.recent_vods[0].url, "https://chzzk.naver.com/video/9");
        assert_eq!(config.download_folder(&settings), config.default_download_folder());
    }

    #[test]
    fn corrupt_settings_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(Some(dir.path().to_path_buf()));
        fs::write(config.settings_file(), b"{\"recentVods\": [").unwrap();

        match config.load_user_settings() {
            Err(Error::FileSystem { path, source }) => {
                assert_eq!(path, config.settings_file());
                assert_eq!(source.kind(), ErrorKind::UnexpectedEof);
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn cookies() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(Some(dir.path().to_path_buf()));
        assert!(config.load_cookies().is_empty());

        config.set_adult_cookies(" aut ", "ses").unwrap();
        let cookies = config.load_cookies();
        assert_eq!(cookies["NID_AUT"], "aut");
        assert_eq!(cookies["NID_SES"], "ses");
        assert!(config.load_user_settings().unwrap().is_adult_content);

        fs::write(config.cookie_file(), b"not json").unwrap();
        assert!(config.load_cookies().is_empty());

        config.clear_cookies().unwrap();
        assert!(!config.cookie_file().exists());
        assert!(!config.load_user_settings().unwrap().is_adult_content);
        config.clear_cookies().unwrap();
    }
}
