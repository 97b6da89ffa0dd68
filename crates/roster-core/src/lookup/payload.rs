//! Line-oriented lookup payload carried by a profile's visual code.
//!
//! ```text
//! UserID: <profile id>
//! Name: <title first last>
//! Email: <email>
//! Phone: <phone>
//! Location: <city>, <country>
//! ```

use serde::{Deserialize, Serialize};

use crate::models::{Profile, ProfileId};

const USER_ID: &str = "UserID:";
const NAME: &str = "Name:";
const EMAIL: &str = "Email:";
const PHONE: &str = "Phone:";
const LOCATION: &str = "Location:";

/// Parsed payload. Only `user_id` is required; the rest is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupPayload {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

impl LookupPayload {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            user_id: profile.id.to_string(),
            name: Some(profile.full_name()),
            email: Some(profile.email.clone()),
            phone: Some(profile.phone.clone()),
            location: Some(profile.location.summary()),
        }
    }

    /// Render one `Key: value` line per field, in fixed order. Absent fields render empty.
    ///
    /// Line breaks inside a value become spaces, so each field stays on its own line.
    pub fn to_text(&self) -> String {
        let field = |value: &Option<String>| single_line(value.as_deref().unwrap_or_default());
        format!(
            "{USER_ID} {}\n{NAME} {}\n{EMAIL} {}\n{PHONE} {}\n{LOCATION} {}\n",
            single_line(&self.user_id),
            field(&self.name),
            field(&self.email),
            field(&self.phone),
            field(&self.location),
        )
    }

    /// `None` unless a non-blank `UserID:` line is present.
    ///
    /// The first `UserID:` line names the profile; for the other fields later lines win.
    pub fn parse(text: &str) -> Option<Self> {
        let mut user_id = None;
        let mut name = None;
        let mut email = None;
        let mut phone = None;
        let mut location = None;

        for line in text.lines() {
            let line = line.trim_start();
            if let Some(value) = line.strip_prefix(USER_ID) {
                if user_id.is_none() {
                    user_id = Some(value.trim().to_string());
                }
            } else if let Some(value) = line.strip_prefix(NAME) {
                name = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix(EMAIL) {
                email = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix(PHONE) {
                phone = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix(LOCATION) {
                location = Some(value.trim().to_string());
            }
        }

        let user_id = user_id.filter(|id| !id.is_empty())?;
        Some(Self {
            user_id,
            name,
            email,
            phone,
            location,
        })
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Payload text for `profile`.
pub fn encode(profile: &Profile) -> String {
    LookupPayload::from_profile(profile).to_text()
}

pub fn parse(text: &str) -> Option<LookupPayload> {
    LookupPayload::parse(text)
}

/// The profile id named by a scanned payload, if it is one.
pub fn extract_identifier(text: &str) -> Option<ProfileId> {
    parse(text)?.user_id.parse().ok()
}
