use serde::{Deserialize, Serialize};

/// A field-organization user as provisioned by the external admin flow.
/// `reports_to` is a weak reference used only for subordinate lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role_code: String,
    pub territory: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub state: Option<String>,
    pub reports_to: Option<String>,
}

/// The viewer projection consumed by the visibility filters and aggregator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub id: String,
    pub role_code: String,
    pub territory: Option<String>,
    pub zone: Option<String>,
    pub state: Option<String>,
}

impl User {
    pub fn context(&self) -> UserContext {
        UserContext {
            id: self.id.clone(),
            role_code: self.role_code.clone(),
            territory: self.territory.clone(),
            zone: self.zone.clone(),
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::User;

    #[test]
    fn context_projects_identity_and_geography() {
        let user = User {
            id: "U-100".to_string(),
            name: "Asha Patil".to_string(),
            role_code: "TSM".to_string(),
            territory: Some("North Delhi".to_string()),
            region: Some("Delhi NCR".to_string()),
            zone: Some("North".to_string()),
            state: Some("Delhi".to_string()),
            reports_to: Some("U-010".to_string()),
        };

        let context = user.context();
        assert_eq!(context.id, "U-100");
        assert_eq!(context.role_code, "TSM");
        assert_eq!(context.territory.as_deref(), Some("North Delhi"));
        assert_eq!(context.state.as_deref(), Some("Delhi"));
    }
}
