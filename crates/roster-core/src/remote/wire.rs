//! JSON shapes returned by the profile endpoint.

use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::models::{
    Credentials, DatedAge, Location, NationalId, PersonName, Pictures, Profile, ProfileId,
    Provenance,
};
use crate::util::normalize_text_option;

/// Top-level response: `{"results": [...], "info": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct RandomUserResponse {
    pub results: Vec<RandomUser>,
    #[serde(default)]
    pub info: Option<ResponseInfo>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ResponseInfo {
    pub seed: String,
    pub results: u32,
    pub page: u32,
    pub version: String,
}

/// One generated profile, in the endpoint's nested form.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomUser {
    pub gender: String,
    pub name: WireName,
    pub location: WireLocation,
    pub email: String,
    pub login: WireLogin,
    pub dob: WireDated,
    pub registered: WireDated,
    pub phone: String,
    pub cell: String,
    #[serde(default)]
    pub id: WireNationalId,
    pub picture: WirePicture,
    pub nat: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireName {
    pub title: String,
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLocation {
    pub street: WireStreet,
    pub city: String,
    pub state: String,
    pub country: String,
    /// Numeric for some nationalities, text for others
    #[serde(deserialize_with = "string_or_number")]
    pub postcode: String,
    pub coordinates: WireCoordinates,
    pub timezone: WireTimezone,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireStreet {
    pub number: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCoordinates {
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireTimezone {
    pub offset: String,
    pub description: String,
}

#[derive(Clone, Deserialize)]
pub struct WireLogin {
    pub uuid: String,
    pub username: String,
    pub password: String,
    pub salt: String,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

impl std::fmt::Debug for WireLogin {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WireLogin")
            .field("uuid", &self.uuid)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireDated {
    pub date: String,
    pub age: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireNationalId {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePicture {
    pub large: String,
    pub medium: String,
    pub thumbnail: String,
}

impl RandomUser {
    /// Flatten into a remote-provenance [`Profile`] created at `created_at` (Unix ms).
    ///
    /// Fails only when the remote uuid is blank.
    pub fn into_profile(self, created_at: i64) -> Result<Profile> {
        let id = ProfileId::qualified(&self.login.uuid, created_at)?;
        Ok(Profile {
            id,
            gender: self.gender,
            name: PersonName {
                title: self.name.title,
                first: self.name.first,
                last: self.name.last,
            },
            email: self.email,
            phone: self.phone,
            cell: self.cell,
            nationality: self.nat,
            location: Location {
                street_number: self.location.street.number,
                street_name: self.location.street.name,
                city: self.location.city,
                state: self.location.state,
                country: self.location.country,
                postcode: self.location.postcode,
                latitude: self.location.coordinates.latitude,
                longitude: self.location.coordinates.longitude,
                timezone_offset: self.location.timezone.offset,
                timezone_description: self.location.timezone.description,
            },
            date_of_birth: DatedAge {
                date: self.dob.date,
                age: self.dob.age,
            },
            registered: DatedAge {
                date: self.registered.date,
                age: self.registered.age,
            },
            login: Credentials {
                uuid: self.login.uuid,
                username: self.login.username,
                password: self.login.password,
                salt: self.login.salt,
                md5: self.login.md5,
                sha1: self.login.sha1,
                sha256: self.login.sha256,
            },
            national_id: NationalId {
                name: normalize_text_option(self.id.name),
                value: normalize_text_option(self.id.value),
            },
            picture: Pictures {
                large: self.picture.large,
                medium: self.picture.medium,
                thumbnail: self.picture.thumbnail,
            },
            created_at,
            provenance: Provenance::Remote,
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(value) => value,
        Raw::Integer(value) => value.to_string(),
        Raw::Float(value) => value.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn response_deserializes_with_info() {
        let response: RandomUserResponse = serde_json::from_str(fixtures::RESPONSE).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(
            response.info,
            Some(ResponseInfo {
                seed: "56d27f4a53bd5441".to_string(),
                results: 2,
                page: 1,
                version: "1.4".to_string(),
            })
        );
    }

    #[test]
    fn numeric_postcode_becomes_text() {
        let response: RandomUserResponse = serde_json::from_str(fixtures::RESPONSE).unwrap();
        assert_eq!(response.results[0].location.postcode, "63104");
        assert_eq!(response.results[1].location.postcode, "1234");
    }

    #[test]
    fn into_profile_flattens_nested_fields() {
        let response: RandomUserResponse = serde_json::from_str(fixtures::RESPONSE).unwrap();
        let user = response.results.into_iter().next().unwrap();
        let profile = user.into_profile(1_700_000_000_000).unwrap();

        assert_eq!(
            profile.id.as_str(),
            "7a0eed16-9430-4d68-901f-c0d4c1c3bf00_1700000000000"
        );
        assert_eq!(profile.provenance, Provenance::Remote);
        assert_eq!(profile.created_at, 1_700_000_000_000);
        assert_eq!(profile.name.full_name(), "Miss Jennie Nichols");
        assert_eq!(profile.location.street_number, 8929);
        assert_eq!(profile.location.summary(), "Billings, United States");
        assert_eq!(profile.location.timezone_offset, "+9:30");
        assert_eq!(profile.date_of_birth.age, 30);
        assert_eq!(profile.login.username, "yellowpeacock117");
        assert_eq!(profile.national_id.value.as_deref(), Some("405-88-3636"));
        assert_eq!(profile.nationality, "US");
    }

    #[test]
    fn missing_national_id_value_stays_absent() {
        let response: RandomUserResponse = serde_json::from_str(fixtures::RESPONSE).unwrap();
        let user = response.results.into_iter().nth(1).unwrap();
        let profile = user.into_profile(1).unwrap();
        assert_eq!(profile.national_id.name.as_deref(), Some("FN"));
        assert_eq!(profile.national_id.value, None);
    }

    #[test]
    fn wire_login_debug_hides_secrets() {
        let response: RandomUserResponse = serde_json::from_str(fixtures::RESPONSE).unwrap();
        let debug = format!("{:?}", response.results[0].login);
        assert!(!debug.contains("addison"));
        assert!(debug.contains("yellowpeacock117"));
    }
}
