//! Session cookie names and `Set-Cookie` rendering.

pub const AUTH_TOKEN: &str = "authToken";
pub const USER_ID: &str = "ID";
pub const ROLE: &str = "role";
pub const NAME: &str = "name";

/// Every cookie that belongs to a session; cleared together.
pub const SESSION_COOKIES: &[&str] = &[USER_ID, ROLE, AUTH_TOKEN, NAME];

/// Find `name` in a raw `Cookie:` header value.
pub fn find<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Attributes applied to cookies the gateway issues.
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub max_age_secs: u64,
    pub secure: bool,
}

/// `name=value; Path=/; Max-Age=…; HttpOnly; SameSite=Lax[; Secure]`
pub fn session(name: &str, value: &str, opts: CookieOptions) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        opts.max_age_secs
    );
    if opts.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn expired(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly")
}

/// Cookie values must not contain separators; anything outside the
/// cookie-octet range is percent-encoded.
pub fn encode_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E if b != b'%' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_locates_named_cookie() {
        let header = "theme=dark; authToken=abc.def.ghi; role=user";
        assert_eq!(find(header, AUTH_TOKEN), Some("abc.def.ghi"));
        assert_eq!(find(header, ROLE), Some("user"));
        assert_eq!(find(header, NAME), None);
    }

    #[test]
    fn find_does_not_match_prefix() {
        assert_eq!(find("xauthToken=1", AUTH_TOKEN), None);
    }

    #[test]
    fn find_keeps_equals_inside_value() {
        assert_eq!(find("authToken=a=b", AUTH_TOKEN), Some("a=b"));
    }

    #[test]
    fn session_cookie_attributes() {
        let c = session(
            AUTH_TOKEN,
            "tok",
            CookieOptions {
                max_age_secs: 604800,
                secure: false,
            },
        );
        assert_eq!(
            c,
            "authToken=tok; Path=/; Max-Age=604800; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn secure_flag_appended() {
        let c = session(
            ROLE,
            "admin",
            CookieOptions {
                max_age_secs: 10,
                secure: true,
            },
        );
        assert!(c.ends_with("; Secure"));
    }

    #[test]
    fn expired_cookie_has_zero_max_age() {
        assert_eq!(expired(NAME), "name=; Path=/; Max-Age=0; HttpOnly");
    }

    #[test]
    fn encode_value_escapes_separators() {
        assert_eq!(encode_value("Jane Doe"), "Jane%20Doe");
        assert_eq!(encode_value("a;b,c"), "a%3Bb%2Cc");
        assert_eq!(encode_value("plain-42"), "plain-42");
        assert_eq!(encode_value("100%"), "100%25");
    }
}
