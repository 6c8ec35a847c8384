use cookie::Cookie;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

/// One entry of a browser cookie export (puppeteer, devtools).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CookieParam {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CookieJson {
    List(Vec<CookieParam>),
    Map(BTreeMap<String, String>),
}

impl From<CookieJson> for BTreeMap<String, String> {
    fn from(value: CookieJson) -> Self {
        match value {
            CookieJson::List(x) => x
                .into_iter()
                .filter(|y| !y.name.is_empty())
                .map(|y| (y.name, y.value))
                .collect(),
            CookieJson::Map(x) => x,
        }
    }
}

/// Parse cookies given as a json file path, json text or `document.cookie` text.
pub fn cookie_parser(s: &str) -> Result<BTreeMap<String, String>, String> {
    if Path::new(s).exists() {
        let bytes = std::fs::read(s).map_err(|_| format!("could not read {}.", s))?;
        return serde_json::from_slice::<CookieJson>(&bytes)
            .map(Into::into)
            .map_err(|_| "could not deserialize cookies from json file.".to_owned());
    }

    if let Ok(cookies) = serde_json::from_str::<CookieJson>(s) {
        return Ok(cookies.into());
    }

    let mut cookies = BTreeMap::new();

    for cookie in Cookie::split_parse(s) {
        match cookie {
            Ok(x) => {
                cookies.insert(x.name().to_owned(), x.value().to_owned());
            }
            Err(_) => return Err("could not split parse cookies.".to_owned()),
        }
    }

    if cookies.is_empty() {
        return Err("no cookies were found.".to_owned());
    }

    Ok(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_cookie() {
        let cookies = cookie_parser("NID_AUT=aut; NID_SES=ses").unwrap();
        assert_eq!(cookies["NID_AUT"], "aut");
        assert_eq!(cookies["NID_SES"], "ses");
    }

    #[test]
    fn json_forms() {
        let cookies =
            cookie_parser(r#"[{"name":"NID_AUT","value":"aut","domain":".naver.com"}]"#).unwrap();
        assert_eq!(cookies["NID_AUT"], "aut");

        let cookies = cookie_parser(r#"{"NID_SES":"ses"}"#).unwrap();
        assert_eq!(cookies["NID_SES"], "ses");
    }

    #[test]
    fn json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, r#"{"NID_AUT":"a","NID_SES":"b"}"#).unwrap();

        let cookies = cookie_parser(path.to_str().unwrap()).unwrap();
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn empty_input() {
        assert!(cookie_parser("").is_err());
    }
}
