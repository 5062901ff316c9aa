use crate::{
    config::{Config, Verbosity},
    error::{InspectError, InspectResult},
    utils::format_size,
};
use log::{debug, Level};
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use std::{
    path::Path,
    time::Duration,
};
use url::Url;

pub trait Fetch {
    fn fetch_text(&self, url: &str) -> InspectResult<String>;

    fn download(&self, url: &str, dest: &Path) -> InspectResult<u64>;
}

/// Blocking HTTP(S) fetcher. Automatic redirects are disabled in the
/// underlying client; 301/302 are followed here, up to `max_redirects` hops.
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
    verbosity: Verbosity,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> InspectResult<Self> {
        let client = Self::create_http_client(config)?;
        Ok(Self {
            client,
            max_redirects: config.max_redirects,
            verbosity: config.log_level,
        })
    }

    fn create_http_client(config: &Config) -> InspectResult<Client> {
        let mut client_builder = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout_seconds.map(Duration::from_secs));
        if let Some(secs) = config.connect_timeout_seconds {
            client_builder = client_builder.connect_timeout(Duration::from_secs(secs));
        }
        if !config.use_env_proxy {
            client_builder = client_builder.no_proxy();
        }
        if let Some(ref proxy) = config.http_proxy {
            client_builder = client_builder.proxy(reqwest::Proxy::http(proxy)?);
        }
        if let Some(ref proxy) = config.https_proxy {
            client_builder = client_builder.proxy(reqwest::Proxy::https(proxy)?);
        }
        Ok(client_builder.build()?)
    }

    fn send(&self, url: &str) -> InspectResult<Response> {
        let mut current = Url::parse(url)?;
        for _ in 0..=self.max_redirects {
            if self.verbosity.allows(Level::Debug) {
                debug!("GETing {} ...", current);
            }
            let response = self.client.get(current.clone()).send()?;
            let status = response.status().as_u16();
            match status {
                200 => return Ok(response),
                301 | 302 => {
                    let location = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|value| value.to_str().ok())
                        .ok_or_else(|| InspectError::MissingLocation {
                            status,
                            url: current.to_string(),
                        })?;
                    let next = current.join(location)?;
                    if self.verbosity.allows(Level::Debug) {
                        debug!("{} redirected ({}) to {}", current, status, next);
                    }
                    current = next;
                }
                _ => {
                    return Err(InspectError::Transport {
                        status,
                        url: current.to_string(),
                    });
                }
            }
        }
        Err(InspectError::RedirectLoop {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch_text(&self, url: &str) -> InspectResult<String> {
        let response = self.send(url)?;
        let body = response.bytes()?;
        Ok(String::from_utf8(body.to_vec())?)
    }

    fn download(&self, url: &str, dest: &Path) -> InspectResult<u64> {
        if self.verbosity.allows(Level::Debug) {
            debug!("downloading {} to {} ...", url, dest.display());
        }
        let mut response = self.send(url)?;

        let parent = match dest.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        // Written next to the destination, then renamed over it, so readers
        // never see a partially downloaded index.
        let mut staging = tempfile::NamedTempFile::new_in(parent)?;
        let written = response.copy_to(&mut staging)?;
        staging.as_file().sync_all()?;
        staging.persist(dest)?;

        if self.verbosity.allows(Level::Debug) {
            debug!("wrote {} to {}", format_size(written), dest.display());
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Mock, Server, ServerGuard};

    fn fetcher(max_redirects: usize) -> HttpFetcher {
        let config = Config {
            use_env_proxy: false,
            max_redirects,
            ..Config::default()
        };
        HttpFetcher::new(&config).unwrap()
    }

    fn redirect(server: &mut ServerGuard, path: &str, status: usize, location: &str) -> Mock {
        server
            .mock("GET", path)
            .with_status(status)
            .with_header("location", location)
            .create()
    }

    fn ok(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
        server.mock("GET", path).with_status(200).with_body(body).create()
    }

    fn not_found(server: &mut ServerGuard, path: &str) -> Mock {
        server
            .mock("GET", path)
            .with_status(404)
            .with_body("nothing here")
            .create()
    }

    #[test]
    fn test_redirect_is_followed() {
        let mut server = Server::new();
        let second_url = format!("{}/second", server.url());
        let first = redirect(&mut server, "/first", 302, &second_url);
        let second = ok(&mut server, "/second", "second body");

        let body = fetcher(10)
            .fetch_text(&format!("{}/first", server.url()))
            .unwrap();
        assert_eq!(body, "second body");
        first.assert();
        second.assert();
    }

    #[test]
    fn test_relative_location_resolves_against_current_url() {
        let mut server = Server::new();
        let _moved = redirect(&mut server, "/moved", 301, "relative/target");
        let target = ok(&mut server, "/relative/target", "relative body");

        let body = fetcher(10)
            .fetch_text(&format!("{}/moved", server.url()))
            .unwrap();
        assert_eq!(body, "relative body");
        target.assert();
    }

    #[test]
    fn test_not_found_is_transport_error() {
        let mut server = Server::new();
        let _missing = not_found(&mut server, "/missing");

        let err = fetcher(10)
            .fetch_text(&format!("{}/missing", server.url()))
            .unwrap_err();
        assert!(matches!(err, InspectError::Transport { status: 404, .. }));
    }

    #[test]
    fn test_redirect_to_failure_reports_final_status() {
        let mut server = Server::new();
        let _hop = redirect(&mut server, "/to-missing", 302, "/missing");
        let _missing = not_found(&mut server, "/missing");

        let err = fetcher(10)
            .fetch_text(&format!("{}/to-missing", server.url()))
            .unwrap_err();
        match err {
            InspectError::Transport { status, url } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_only_200_is_success() {
        let mut server = Server::new();
        let _created = server
            .mock("GET", "/created")
            .with_status(201)
            .with_body("not quite")
            .create();

        let err = fetcher(10)
            .fetch_text(&format!("{}/created", server.url()))
            .unwrap_err();
        assert_eq!(err.status(), Some(201));
    }

    #[test]
    fn test_redirect_without_location() {
        let mut server = Server::new();
        let _bare = server.mock("GET", "/no-location").with_status(302).create();

        let err = fetcher(10)
            .fetch_text(&format!("{}/no-location", server.url()))
            .unwrap_err();
        assert!(matches!(err, InspectError::MissingLocation { status: 302, .. }));
    }

    #[test]
    fn test_redirect_loop_is_bounded() {
        let mut server = Server::new();
        let looping = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect(4)
            .create();

        let err = fetcher(3)
            .fetch_text(&format!("{}/loop", server.url()))
            .unwrap_err();
        assert!(matches!(err, InspectError::RedirectLoop { limit: 3, .. }));
        looping.assert();
    }

    #[test]
    fn test_download_creates_parent_directories() {
        let mut server = Server::new();
        let _first = redirect(&mut server, "/first", 302, "/second");
        let _second = ok(&mut server, "/second", "second body");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b/c/index.gz");

        let written = fetcher(10)
            .download(&format!("{}/first", server.url()), &dest)
            .unwrap();
        assert_eq!(written, "second body".len() as u64);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "second body");
    }

    #[test]
    fn test_failed_download_leaves_no_file() {
        let mut server = Server::new();
        let _missing = not_found(&mut server, "/missing");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("index.gz");

        assert!(fetcher(10)
            .download(&format!("{}/missing", server.url()), &dest)
            .is_err());
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
