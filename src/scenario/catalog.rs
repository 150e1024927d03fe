//! Built-in scenarios for a CAS deployment.
//!
//! Credentials and peer URLs come from `target.variables`, so the same
//! catalog runs against any deployment the config points at.

use super::step::{Scenario, Step};
use crate::core::ChannelKind;

pub const LOGIN_SUCCESS_TITLE: &str = "CAS - Central Authentication Service Log In Successful";

/// Type credentials into the login form and press Enter.
pub fn login_steps(username: &str, password: &str) -> Vec<Step> {
    vec![
        Step::type_text("#username", username),
        Step::type_text("#password", password),
        Step::press_key("Enter"),
        Step::wait_fixed(0),
    ]
}

fn login_and_logout() -> Vec<Step> {
    let mut steps = vec![Step::navigate("/login"), Step::assert_response_ok()];
    steps.extend(login_steps("${username}", "${password}"));
    steps.extend([
        Step::assert_cookie(true),
        Step::assert_title(LOGIN_SUCCESS_TITLE),
        Step::assert_text("#content div h2", "Log In Successful"),
        Step::navigate("/logout"),
        Step::assert_url("/logout"),
        Step::wait_fixed(0),
        Step::assert_cookie(false),
    ]);
    steps
}

pub fn login_logout() -> Scenario {
    Scenario::new("login-logout")
        .description("Log in with the default credentials, then log out")
        .tag("smoke")
        .steps(login_and_logout())
}

pub fn delegated_saml_sso() -> Scenario {
    Scenario::new("delegated-saml-sso")
        .description("Delegated SAML2 login, with the SSO session honoured by a peer node")
        .tag("saml")
        .tag("delegation")
        .steps(login_and_logout())
        .steps([
            Step::log("Logging in using external SAML2 identity provider..."),
            Step::navigate("/login"),
            Step::wait_fixed(0),
            Step::click("li #SAML2Client"),
            Step::wait_for_navigation(),
        ])
        .steps(login_steps("user1", "password"))
        .steps([
            Step::assert_cookie(true),
            Step::navigate("${sso_peer_url}/login"),
            Step::wait_fixed(0),
            Step::assert_cookie(true),
        ])
        .cleanup("saml-md")
}

pub fn passwordless_surrogate() -> Scenario {
    Scenario::new("passwordless-surrogate")
        .description("Passwordless login as a surrogate with an emailed token")
        .tag("passwordless")
        .tag("surrogate")
        .steps([
            Step::navigate("/login"),
            Step::wait_fixed(0),
            Step::assert_absent("#password"),
            Step::type_text("#username", "user3+casuser"),
            Step::press_key("Enter"),
            Step::wait_fixed(0),
            Step::assert_text("#login h3", "Provide Token"),
            Step::assert_text_starts_with(
                "#login p",
                "Please provide the security token sent to you",
            ),
            Step::assert_visible("#token"),
            Step::extract_code(ChannelKind::Email, "code"),
            Step::type_text("#token", "${code}"),
            Step::submit_form("#fm1"),
            Step::wait_fixed(0),
            Step::assert_cookie(true),
            Step::assert_text_starts_with(
                "#content div p",
                "You, user3, have successfully logged in",
            ),
            Step::click("#auth-tab"),
            Step::wait_fixed(0),
            Step::type_text("#attribute-tab-1 input[type=search]", "surrogate"),
            Step::wait_fixed(0),
            Step::screenshot(None),
            Step::assert_text_starts_with("#surrogateEnabled td code kbd", "[true]"),
            Step::assert_text_starts_with("#surrogatePrincipal td code kbd", "[casuser]"),
            Step::assert_text_starts_with("#surrogateUser td code kbd", "[user3]"),
        ])
}

pub fn all() -> Vec<Scenario> {
    vec![login_logout(), delegated_saml_sso(), passwordless_surrogate()]
}
