//! Grants exchanged for tokens at the token endpoint.

// self
use crate::{_prelude::*, auth::TokenSecret};

const INSTALLED_CLIENT_GRANT: &str = "https://oauth.reddit.com/grants/installed_client";

/// Grant types accepted by Reddit's token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// App-only token for confidential clients.
	ClientCredentials,
	/// Refresh Token grant for permanent authorizations.
	RefreshToken,
	/// Resource Owner Password Credentials grant for script apps.
	Password,
	/// Authorization Code grant completing the web/installed app flow.
	AuthorizationCode,
	/// App-only token for installed (public) clients, keyed by a device id.
	InstalledClient,
}
impl GrantType {
	/// Returns the `grant_type` form value.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::ClientCredentials => "client_credentials",
			GrantType::RefreshToken => "refresh_token",
			GrantType::Password => "password",
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::InstalledClient => INSTALLED_CLIENT_GRANT,
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Credential payload exchanged for a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Grant {
	/// `grant_type=client_credentials`.
	ClientCredentials,
	/// `grant_type=refresh_token`.
	RefreshToken {
		/// Refresh token issued by a previous exchange.
		refresh_token: TokenSecret,
	},
	/// `grant_type=password`.
	Password {
		/// Reddit username.
		username: String,
		/// Account password; append `:<otp>` for two-factor accounts.
		password: TokenSecret,
	},
	/// `grant_type=authorization_code`.
	AuthorizationCode {
		/// Code returned to the redirect URI.
		code: String,
		/// Redirect URI used when the code was requested.
		redirect_uri: String,
	},
	/// Installed-client app-only grant.
	InstalledClient {
		/// 20-30 character device identifier; `DO_NOT_TRACK_THIS_DEVICE` opts out of tracking.
		device_id: String,
	},
}
impl Grant {
	/// Grant type label.
	pub fn grant_type(&self) -> GrantType {
		match self {
			Grant::ClientCredentials => GrantType::ClientCredentials,
			Grant::RefreshToken { .. } => GrantType::RefreshToken,
			Grant::Password { .. } => GrantType::Password,
			Grant::AuthorizationCode { .. } => GrantType::AuthorizationCode,
			Grant::InstalledClient { .. } => GrantType::InstalledClient,
		}
	}

	/// Form fields posted to the token endpoint, `grant_type` first.
	pub fn form(&self) -> Vec<(String, String)> {
		let mut form = vec![("grant_type".to_owned(), self.grant_type().as_str().to_owned())];

		match self {
			Grant::ClientCredentials => {},
			Grant::RefreshToken { refresh_token } =>
				form.push(("refresh_token".into(), refresh_token.expose().into())),
			Grant::Password { username, password } => {
				form.push(("username".into(), username.clone()));
				form.push(("password".into(), password.expose().into()));
			},
			Grant::AuthorizationCode { code, redirect_uri } => {
				form.push(("code".into(), code.clone()));
				form.push(("redirect_uri".into(), redirect_uri.clone()));
			},
			Grant::InstalledClient { device_id } => form.push(("device_id".into(), device_id.clone())),
		}

		form
	}

	/// Whether a rejection of this grant blames the grant payload rather than the client.
	pub fn carries_user_credentials(&self) -> bool {
		matches!(
			self,
			Grant::RefreshToken { .. } | Grant::Password { .. } | Grant::AuthorizationCode { .. }
		)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn forms_lead_with_grant_type() {
		let form = Grant::Password { username: "spez".into(), password: "hunter2".into() }.form();

		assert_eq!(form[0], ("grant_type".into(), "password".into()));
		assert!(form.contains(&("password".into(), "hunter2".into())));
	}

	#[test]
	fn installed_client_uses_reddit_grant_uri() {
		let form = Grant::InstalledClient { device_id: "DO_NOT_TRACK_THIS_DEVICE".into() }.form();

		assert_eq!(form[0].1, "https://oauth.reddit.com/grants/installed_client");
		assert_eq!(form[1], ("device_id".into(), "DO_NOT_TRACK_THIS_DEVICE".into()));
	}
}
