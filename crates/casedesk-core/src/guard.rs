use crate::config::GatewayConfig;
use crate::session::Claims;

/// Outcome of running the session guard over one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    /// Unauthenticated on a protected path: go to the login page and drop
    /// every session cookie.
    RedirectToLogin(String),
    Redirect(String),
}

/// Path rules for the session guard.
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    pub protected_prefixes: Vec<String>,
    pub login_path: String,
    pub auth_pages: Vec<String>,
}

impl GuardPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            protected_prefixes: config.protected_prefixes.clone(),
            login_path: config.login_path.clone(),
            auth_pages: vec![config.login_path.clone(), "/signup".to_string()],
        }
    }

    /// Paths the guard never looks at: the API surface and build assets.
    pub fn is_exempt(path: &str) -> bool {
        path.starts_with("/api")
            || path.starts_with("/_next/static")
            || path.starts_with("/_next/image")
            || path.ends_with(".png")
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Decide what to do with `path`.
    ///
    /// `claims` is `Some` only for a verified session. The role comes from
    /// the token when it carries one, otherwise from the `role` cookie.
    pub fn decide(
        &self,
        path: &str,
        claims: Option<&Claims>,
        role_cookie: Option<&str>,
    ) -> GuardDecision {
        if Self::is_exempt(path) {
            return GuardDecision::Pass;
        }

        let Some(claims) = claims else {
            if self.is_protected(path) {
                return GuardDecision::RedirectToLogin(self.login_path.clone());
            }
            return GuardDecision::Pass;
        };

        let role = claims.role.as_deref().or(role_cookie);

        match role {
            Some("admin") if path.starts_with("/dashboard/user") => {
                return GuardDecision::Redirect("/dashboard/admin".to_string());
            }
            Some("user") if path.starts_with("/dashboard/admin") => {
                return GuardDecision::Redirect("/dashboard/user".to_string());
            }
            _ => {}
        }

        if self.auth_pages.iter().any(|p| p == path) {
            return GuardDecision::Redirect(landing_page(role).to_string());
        }

        GuardDecision::Pass
    }
}

/// Where an authenticated user lands after hitting an auth page.
pub fn landing_page(role: Option<&str>) -> &'static str {
    match role {
        Some("admin") => "/dashboard/admin",
        Some("user") => "/dashboard/user",
        _ => "/dashboard",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> GuardPolicy {
        GuardPolicy::from_config(&GatewayConfig::default())
    }

    fn claims(role: Option<&str>) -> Claims {
        Claims {
            sub: Some(serde_json::json!(1)),
            role: role.map(str::to_string),
            exp: None,
            nbf: None,
            iat: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn anonymous_protected_redirects_to_login() {
        assert_eq!(
            policy().decide("/dashboard", None, None),
            GuardDecision::RedirectToLogin("/login".to_string())
        );
        assert_eq!(
            policy().decide("/dashboard/user/cases", None, Some("user")),
            GuardDecision::RedirectToLogin("/login".to_string())
        );
    }

    #[test]
    fn anonymous_public_passes() {
        assert_eq!(policy().decide("/", None, None), GuardDecision::Pass);
        assert_eq!(policy().decide("/login", None, None), GuardDecision::Pass);
        assert_eq!(policy().decide("/pricing", None, None), GuardDecision::Pass);
    }

    #[test]
    fn authenticated_protected_passes() {
        let c = claims(None);
        assert_eq!(
            policy().decide("/dashboard", Some(&c), None),
            GuardDecision::Pass
        );
    }

    #[test]
    fn api_and_assets_are_exempt() {
        for path in ["/api/case", "/_next/static/app.js", "/_next/image", "/dashboard/logo.png"] {
            assert_eq!(policy().decide(path, None, None), GuardDecision::Pass, "{path}");
        }
    }

    #[test]
    fn auth_pages_redirect_by_role() {
        let p = policy();
        assert_eq!(
            p.decide("/login", Some(&claims(Some("admin"))), None),
            GuardDecision::Redirect("/dashboard/admin".to_string())
        );
        assert_eq!(
            p.decide("/signup", Some(&claims(None)), Some("user")),
            GuardDecision::Redirect("/dashboard/user".to_string())
        );
        assert_eq!(
            p.decide("/login", Some(&claims(None)), None),
            GuardDecision::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn token_role_wins_over_cookie() {
        assert_eq!(
            policy().decide("/login", Some(&claims(Some("admin"))), Some("user")),
            GuardDecision::Redirect("/dashboard/admin".to_string())
        );
    }

    #[test]
    fn cross_role_dashboards_redirect() {
        let p = policy();
        assert_eq!(
            p.decide("/dashboard/user/settings", Some(&claims(Some("admin"))), None),
            GuardDecision::Redirect("/dashboard/admin".to_string())
        );
        assert_eq!(
            p.decide("/dashboard/admin", Some(&claims(None)), Some("user")),
            GuardDecision::Redirect("/dashboard/user".to_string())
        );
        assert_eq!(
            p.decide("/dashboard/admin", Some(&claims(Some("admin"))), None),
            GuardDecision::Pass
        );
    }

    #[test]
    fn custom_prefixes_are_honoured() {
        let mut config = GatewayConfig::default();
        config.protected_prefixes.push("/cases".to_string());
        let p = GuardPolicy::from_config(&config);
        assert!(p.is_protected("/cases/12"));
        assert_eq!(
            p.decide("/cases/12", None, None),
            GuardDecision::RedirectToLogin("/login".to_string())
        );
    }
}
