#![allow(dead_code)]

use browser_scenarios::core::config::SessionConfig;
use browser_scenarios::scenario::catalog::LOGIN_SUCCESS_TITLE;
use browser_scenarios::testing::{FakeRoute, FakeSite};
use browser_scenarios::Config;
use std::path::Path;

pub const BASE: &str = "https://localhost:8443/cas";
pub const PEER: &str = "https://localhost:8444/cas";

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

/// Short timeouts and no settle delay; artifacts go to `artifacts`.
pub fn test_config(artifacts: &Path) -> Config {
    let mut config = Config::default();
    config.session = SessionConfig {
        navigation_timeout_ms: 1000,
        element_timeout_ms: 200,
        poll_interval_ms: 20,
        settle_delay_ms: 0,
    };
    config.runner.screenshot_on_failure = false;
    config.runner.artifacts_dir = artifacts.to_path_buf();
    config
}

pub fn login_form() -> FakeRoute {
    FakeRoute::new("CAS - Central Authentication Service")
        .element("#username", "")
        .element("#password", "")
        .element("li #SAML2Client", "SAML2Client")
}

pub fn login_success() -> FakeRoute {
    FakeRoute::new(LOGIN_SUCCESS_TITLE)
        .element("#content div h2", "Log In Successful")
        .set_cookie("TGC", "eyJhbGciOiJIUzUxMiJ9.TGT-1")
}

/// A CAS node with login and logout pages; Enter on the login form logs in.
pub fn cas_site() -> FakeSite {
    let site = FakeSite::new();
    site.route(&url("/login"), login_form())
        .route(
            &url("/logout"),
            FakeRoute::new("CAS - Central Authentication Service Logout")
                .element("#content div h2", "Logout successful")
                .clear_cookies(),
        )
        .on("key:Enter", login_success());
    site
}
