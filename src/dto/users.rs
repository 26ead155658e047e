use serde::Deserialize;
use utoipa::ToSchema;

/// Profile as reported by the identity provider on first sign-in.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    pub image_url: Option<String>,
    pub profile_image_url: Option<String>,
}

impl ExternalProfile {
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|e| e.email_address.trim())
            .filter(|e| !e.is_empty())
    }

    pub fn image(&self) -> Option<String> {
        self.image_url
            .clone()
            .or_else(|| self.profile_image_url.clone())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    #[serde(default)]
    pub email_address: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpsertUserRequest {
    pub user: Option<ExternalProfile>,
}
