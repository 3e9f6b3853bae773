use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Public Sheets API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Google OAuth token endpoint for the service-account grant.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Connection settings for one spreadsheet.
///
/// Either a service account (email plus private key) or a pre-issued access
/// token authenticates requests. The service account wins when both are set.
#[derive(Clone)]
pub struct SheetsConfig {
    /// The id from the spreadsheet URL.
    pub spreadsheet_id: String,
    /// Pre-issued OAuth access token sent as-is.
    pub access_token: String,
    pub service_account_email: String,
    /// PEM private key. Literal `\n` sequences are read as newlines.
    pub private_key: String,
    /// Base64 of the PEM private key, used when `private_key` is blank.
    pub private_key_base64: String,
    /// OAuth token endpoint, overridable for tests.
    pub token_url: String,
    /// API root, overridable for tests.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            access_token: String::new(),
            service_account_email: String::new(),
            private_key: String::new(),
            private_key_base64: String::new(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

impl std::fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("service_account_email", &self.service_account_email)
            .field("token_url", &self.token_url)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

impl SheetsConfig {
    /// Email and some form of private key are both present.
    pub fn has_service_account(&self) -> bool {
        is_set(&self.service_account_email)
            && (is_set(&self.private_key) || is_set(&self.private_key_base64))
    }

    /// Name of the first missing required setting, if any.
    pub fn missing(&self) -> Option<&'static str> {
        if !is_set(&self.spreadsheet_id) {
            Some("spreadsheet_id")
        } else if !self.has_service_account() && !is_set(&self.access_token) {
            Some("credentials")
        } else {
            None
        }
    }

    /// The PEM text of the service-account key, from either form.
    pub fn private_key_pem(&self) -> Result<String, String> {
        let raw = if is_set(&self.private_key) {
            self.private_key.trim().to_string()
        } else {
            let bytes = STANDARD
                .decode(self.private_key_base64.trim())
                .map_err(|e| format!("private key base64 is invalid: {e}"))?;
            String::from_utf8(bytes).map_err(|_| "decoded private key is not UTF-8".to_string())?
        };
        Ok(raw.replace("\\n", "\n"))
    }
}
