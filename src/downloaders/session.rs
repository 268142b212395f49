use crate::config::DownloadConfig;
use crate::error::Result;
use crate::traits::BrowserCookie;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP session for one issue, carrying a snapshot of the browser's identity.
///
/// Page images are served from hosts other than the reader site that set the
/// cookies, so every cookie is also stored host-only for each image origin.
#[derive(Clone)]
pub struct DownloadSession {
    client: Client,
}

impl DownloadSession {
    pub fn create(
        cookies: &[BrowserCookie],
        user_agent: &str,
        config: &DownloadConfig,
        extra_headers: &HashMap<String, String>,
        image_origins: &[Url],
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();

        for (key, value) in extra_headers {
            match HeaderName::from_bytes(key.as_bytes()) {
                Ok(name) => {
                    headers.insert(name, HeaderValue::from_str(value)?);
                }
                Err(e) => warn!("Ignoring invalid header name {:?}: {}", key, e),
            }
        }

        let jar = Self::cookie_jar(cookies, image_origins);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(user_agent)
            .default_headers(headers)
            .cookie_provider(Arc::new(jar))
            .build()?;

        debug!(
            "Download session created with {} cookies for {} image hosts",
            cookies.len(),
            image_origins.len()
        );
        Ok(Self { client })
    }

    fn cookie_jar(cookies: &[BrowserCookie], image_origins: &[Url]) -> Jar {
        let jar = Jar::default();

        for cookie in cookies.iter().filter(|c| !c.name.is_empty()) {
            let path = if cookie.path.is_empty() { "/" } else { cookie.path.as_str() };
            let host = cookie.domain.trim_start_matches('.');
            if !host.is_empty() {
                match Url::parse(&format!("https://{}{}", host, path)) {
                    Ok(origin) => jar.add_cookie_str(
                        &format!(
                            "{}={}; Domain={}; Path={}",
                            cookie.name, cookie.value, host, path
                        ),
                        &origin,
                    ),
                    Err(e) => debug!("Cookie {} has unusable domain {:?}: {}", cookie.name, host, e),
                }
            }

            for origin in image_origins {
                jar.add_cookie_str(&format!("{}={}; Path=/", cookie.name, cookie.value), origin);
            }
        }

        jar
    }

    /// GET that fails on any non-2xx status.
    pub async fn get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await?;
        Ok(response.error_for_status()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::cookie::CookieStore;

    fn cookie(name: &str, value: &str) -> BrowserCookie {
        BrowserCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: ".readcomiconline.li".to_string(),
            path: "/".to_string(),
        }
    }

    fn cookie_values(jar: &Jar, url: &str) -> String {
        jar.cookies(&Url::parse(url).unwrap())
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_cookie_jar_scopes_to_domain_and_image_hosts() {
        let image_host = Url::parse("https://2.bp.blogspot.com/").unwrap();
        let cookies = vec![
            cookie("rco_quality", "hq"),
            BrowserCookie {
                path: "/Comic".to_string(),
                ..cookie("cf_clearance", "abc123")
            },
        ];
        let jar = DownloadSession::cookie_jar(&cookies, &[image_host]);

        let reader = cookie_values(&jar, "https://readcomiconline.li/Comic/Saga");
        assert!(reader.contains("rco_quality=hq"));
        assert!(reader.contains("cf_clearance=abc123"));

        let outside_path = cookie_values(&jar, "https://readcomiconline.li/Home");
        assert!(outside_path.contains("rco_quality=hq"));
        assert!(!outside_path.contains("cf_clearance"));

        let image = cookie_values(&jar, "https://2.bp.blogspot.com/x/RCO001.jpg");
        assert!(image.contains("rco_quality=hq"));
        assert!(image.contains("cf_clearance=abc123"));

        assert!(jar.cookies(&Url::parse("https://example.com/").unwrap()).is_none());
    }

    #[tokio::test]
    async fn test_requests_carry_browser_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page.jpg")
            .match_header("user-agent", "BrowserAgent/2.0")
            .match_header(
                "cookie",
                Matcher::AllOf(vec![
                    Matcher::Regex("session=xyz".to_string()),
                    Matcher::Regex("theme=dark".to_string()),
                ]),
            )
            .match_header("referer", "https://readcomiconline.li/")
            .with_status(200)
            .with_body("img")
            .create_async()
            .await;

        let mut extra = HashMap::new();
        extra.insert("Referer".to_string(), "https://readcomiconline.li/".to_string());
        let origin = Url::parse(&server.url()).unwrap();
        let session = DownloadSession::create(
            &[cookie("session", "xyz"), cookie("theme", "dark")],
            "BrowserAgent/2.0",
            &DownloadConfig::default(),
            &extra,
            &[origin],
        )
        .unwrap();

        let response = session.get(&format!("{}/page.jpg", server.url())).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "img");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let session =
            DownloadSession::create(&[], "UA", &DownloadConfig::default(), &HashMap::new(), &[])
                .unwrap();
        assert!(session.get(&format!("{}/missing.jpg", server.url())).await.is_err());
    }
}
