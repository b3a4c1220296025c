// Session credentials
//
// DirectAdmin lets a reseller or admin act as one of its accounts by
// sending `owner|account` as the Basic auth username together with the
// owner's own password. A `Credential` records both halves so derived
// connections never need the managed account's secret.

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// Identity and secret for one logical session.
///
/// Immutable: impersonation produces a new `Credential` via
/// [`login_as`](Self::login_as) instead of mutating this one.
#[derive(Debug, Clone)]
pub struct Credential {
    authenticated_user: String,
    acting_user: String,
    secret: SecretString,
    base_url: Url,
}

impl Credential {
    /// Parse a qualified username (`user` or `owner|user`).
    ///
    /// The first segment is the authenticated account, the last segment the
    /// acting account. Both are the same when no pipe is present.
    pub fn parse(base_url: Url, qualified_username: &str, secret: SecretString) -> Result<Self, Error> {
        let mut segments = qualified_username.split('|').map(str::trim);
        let authenticated = segments.next().unwrap_or_default();
        let acting = segments.next_back().unwrap_or(authenticated);

        if authenticated.is_empty() || acting.is_empty() {
            return Err(Error::InvalidCredential {
                reason: format!("empty account name in {qualified_username:?}"),
            });
        }

        Ok(Self {
            authenticated_user: authenticated.to_owned(),
            acting_user: acting.to_owned(),
            secret,
            base_url: normalize_base_url(base_url),
        })
    }

    /// A credential acting as `username` under the same authenticated account.
    pub fn login_as(&self, username: &str) -> Self {
        Self {
            authenticated_user: self.authenticated_user.clone(),
            acting_user: username.to_owned(),
            secret: self.secret.clone(),
            base_url: self.base_url.clone(),
        }
    }

    /// The account whose secret opened the session.
    pub fn authenticated_user(&self) -> &str {
        &self.authenticated_user
    }

    /// The account requests are performed as.
    pub fn acting_user(&self) -> &str {
        &self.acting_user
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Panel root, always with a trailing slash.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether this credential was derived through "login as".
    pub fn is_managed(&self) -> bool {
        self.acting_user != self.authenticated_user
    }

    /// The Basic auth username sent on the wire.
    pub fn wire_username(&self) -> String {
        if self.is_managed() {
            format!("{}|{}", self.authenticated_user, self.acting_user)
        } else {
            self.acting_user.clone()
        }
    }
}

fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://panel.example.com:2222").unwrap()
    }

    fn secret() -> SecretString {
        SecretString::from("hunter2".to_string())
    }

    #[test]
    fn plain_username_is_unmanaged() {
        let cred = Credential::parse(url(), "admin", secret()).unwrap();
        assert_eq!(cred.authenticated_user(), "admin");
        assert_eq!(cred.acting_user(), "admin");
        assert!(!cred.is_managed());
        assert_eq!(cred.wire_username(), "admin");
    }

    #[test]
    fn piped_username_is_managed() {
        let cred = Credential::parse(url(), "admin|bob", secret()).unwrap();
        assert_eq!(cred.authenticated_user(), "admin");
        assert_eq!(cred.acting_user(), "bob");
        assert!(cred.is_managed());
        assert_eq!(cred.wire_username(), "admin|bob");
    }

    #[test]
    fn middle_segments_are_ignored() {
        let cred = Credential::parse(url(), "admin|reseller|bob", secret()).unwrap();
        assert_eq!(cred.authenticated_user(), "admin");
        assert_eq!(cred.acting_user(), "bob");
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert!(matches!(
            Credential::parse(url(), "admin|", secret()),
            Err(Error::InvalidCredential { .. })
        ));
        assert!(Credential::parse(url(), "", secret()).is_err());
    }

    #[test]
    fn login_as_keeps_authenticated_user() {
        let cred = Credential::parse(url(), "admin", secret()).unwrap();
        let derived = cred.login_as("bob").login_as("carol");
        assert_eq!(derived.authenticated_user(), "admin");
        assert_eq!(derived.acting_user(), "carol");
        assert_eq!(cred.acting_user(), "admin");
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let cred = Credential::parse(
            Url::parse("https://host:2222/panel").unwrap(),
            "admin",
            secret(),
        )
        .unwrap();
        assert_eq!(cred.base_url().as_str(), "https://host:2222/panel/");
    }
}
