use std::fmt;

use log::debug;
use url::Url;

use crate::{Error, Result};

const WEBSHARE_ENDPOINT: &str = "http://p.webshare.io:80/";

/// Proxy used for every request the session makes, chosen once at startup
#[derive(Clone, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Webshare rotating residential proxy
    Webshare { username: String, password: String },
    /// Plain proxy URLs, at least one of which is set
    Generic {
        http_url: Option<String>,
        https_url: Option<String>,
    },
}

impl ProxyConfig {
    /// Pick a proxy from the startup settings.
    ///
    /// Webshare wins when both credentials are present; otherwise any proxy URL
    /// yields a generic proxy. Empty strings count as unset.
    pub fn select(
        webshare_username: Option<&str>,
        webshare_password: Option<&str>,
        http_proxy: Option<&str>,
        https_proxy: Option<&str>,
    ) -> Option<Self> {
        let present = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);

        match (present(webshare_username), present(webshare_password)) {
            (Some(username), Some(password)) => return Some(ProxyConfig::Webshare { username, password }),
            (Some(_), None) | (None, Some(_)) => {
                debug!("Ignoring incomplete Webshare credentials");
            }
            (None, None) => {}
        }

        let http_url = present(http_proxy);
        let https_url = present(https_proxy);
        if http_url.is_none() && https_url.is_none() {
            return None;
        }
        Some(ProxyConfig::Generic { http_url, https_url })
    }

    /// Proxy URLs to use for `http` and `https` traffic respectively
    pub fn routes(&self) -> Result<(String, String)> {
        match self {
            ProxyConfig::Webshare { username, password } => {
                let url = webshare_url(username, password)?;
                Ok((url.clone(), url))
            }
            ProxyConfig::Generic { http_url, https_url } => {
                let http = http_url.as_ref().or(https_url.as_ref());
                let https = https_url.as_ref().or(http_url.as_ref());
                match (http, https) {
                    (Some(http), Some(https)) => Ok((http.clone(), https.clone())),
                    _ => Err(Error::Proxy("no proxy URL given".to_string())),
                }
            }
        }
    }

    /// Rotating proxies hand out a new IP per connection, so pooled connections are not kept
    pub fn reuses_connections(&self) -> bool {
        !matches!(self, ProxyConfig::Webshare { .. })
    }

    pub(crate) fn apply(&self, builder: reqwest::ClientBuilder) -> Result<reqwest::ClientBuilder> {
        let (http, https) = self.routes()?;
        let http = reqwest::Proxy::http(&http).map_err(|e| Error::Proxy(e.to_string()))?;
        let https = reqwest::Proxy::https(&https).map_err(|e| Error::Proxy(e.to_string()))?;

        let builder = builder.proxy(http).proxy(https);
        if self.reuses_connections() {
            Ok(builder)
        } else {
            Ok(builder.pool_max_idle_per_host(0))
        }
    }
}

fn webshare_url(username: &str, password: &str) -> Result<String> {
    let mut url = Url::parse(WEBSHARE_ENDPOINT).map_err(|e| Error::Proxy(e.to_string()))?;
    url.set_username(&format!("{username}-rotate"))
        .and_then(|_| url.set_password(Some(password)))
        .map_err(|_| Error::Proxy("could not embed Webshare credentials".to_string()))?;
    Ok(url.to_string())
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyConfig::Webshare { username, .. } => f
                .debug_struct("Webshare")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            ProxyConfig::Generic { http_url, https_url } => f
                .debug_struct("Generic")
                .field("http_url", http_url)
                .field("https_url", https_url)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_none() {
        assert_eq!(ProxyConfig::select(None, None, None, None), None);
    }

    #[test]
    fn test_select_webshare() {
        let proxy = ProxyConfig::select(Some("test_user"), Some("test_pass"), None, None);
        assert_eq!(
            proxy,
            Some(ProxyConfig::Webshare {
                username: "test_user".to_string(),
                password: "test_pass".to_string(),
            })
        );
    }

    #[test]
    fn test_webshare_wins_over_urls() {
        let proxy = ProxyConfig::select(
            Some("test_user"),
            Some("test_pass"),
            Some("http://localhost:8080"),
            None,
        );
        assert!(matches!(proxy, Some(ProxyConfig::Webshare { .. })));
    }

    #[test]
    fn test_incomplete_webshare_is_ignored() {
        assert_eq!(ProxyConfig::select(Some("test_user"), None, None, None), None);
        assert_eq!(ProxyConfig::select(None, Some("test_pass"), None, None), None);
        assert_eq!(ProxyConfig::select(Some("test_user"), Some(""), None, None), None);
    }

    #[test]
    fn test_select_generic_both() {
        let proxy = ProxyConfig::select(
            None,
            None,
            Some("http://localhost:8080"),
            Some("https://localhost:8080"),
        );
        assert_eq!(
            proxy,
            Some(ProxyConfig::Generic {
                http_url: Some("http://localhost:8080".to_string()),
                https_url: Some("https://localhost:8080".to_string()),
            })
        );
    }

    #[test]
    fn test_select_generic_http_only() {
        let proxy = ProxyConfig::select(None, None, Some("http://localhost:8080"), None).unwrap();
        assert_eq!(
            proxy,
            ProxyConfig::Generic {
                http_url: Some("http://localhost:8080".to_string()),
                https_url: None,
            }
        );
        let (http, https) = proxy.routes().unwrap();
        assert_eq!(http, "http://localhost:8080");
        assert_eq!(https, "http://localhost:8080");
    }

    #[test]
    fn test_select_generic_https_only() {
        let proxy = ProxyConfig::select(None, None, None, Some("https://localhost:8080")).unwrap();
        let (http, https) = proxy.routes().unwrap();
        assert_eq!(http, "https://localhost:8080");
        assert_eq!(https, "https://localhost:8080");
        assert!(proxy.reuses_connections());
    }

    #[test]
    fn test_webshare_routes() {
        let proxy = ProxyConfig::Webshare {
            username: "test_user".to_string(),
            password: "test_pass".to_string(),
        };
        let (http, https) = proxy.routes().unwrap();
        assert_eq!(http, https);

        let url = Url::parse(&http).unwrap();
        assert_eq!(url.host_str(), Some("p.webshare.io"));
        assert_eq!(url.username(), "test_user-rotate");
        assert_eq!(url.password(), Some("test_pass"));
        assert!(!proxy.reuses_connections());
    }

    #[test]
    fn test_debug_redacts_password() {
        let proxy = ProxyConfig::Webshare {
            username: "test_user".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{proxy:?}");
        assert!(rendered.contains("test_user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_apply_rejects_bad_url() {
        let proxy = ProxyConfig::Generic {
            http_url: Some("not a url".to_string()),
            https_url: None,
        };
        assert!(matches!(
            proxy.apply(reqwest::Client::builder()),
            Err(Error::Proxy(_))
        ));
    }
}
