use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::config::DeployEnvironment;

/// Organization taxonomy. Stored as its snake_case name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrganizationType {
    PrimaryCareClinic,
    SpecialityClinic,
    MultispecialtyClinic,
    InpatientFacility,
    EmergencyRoom,
    UrgentCare,
    AcademicFacility,
    HealthItVendor,
    Other,
}

impl OrganizationType {
    pub fn kind(&self) -> OrganizationKind {
        match self {
            Self::HealthItVendor => OrganizationKind::Vendor,
            Self::PrimaryCareClinic
            | Self::SpecialityClinic
            | Self::MultispecialtyClinic
            | Self::InpatientFacility
            | Self::EmergencyRoom
            | Self::UrgentCare
            | Self::AcademicFacility
            | Self::Other => OrganizationKind::Provider,
        }
    }

    /// Human label for select boxes
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrimaryCareClinic => "Primary Care Clinic",
            Self::SpecialityClinic => "Speciality Clinic",
            Self::MultispecialtyClinic => "Multispecialty Clinic",
            Self::InpatientFacility => "Inpatient Facility",
            Self::EmergencyRoom => "Emergency Room",
            Self::UrgentCare => "Urgent Care",
            Self::AcademicFacility => "Academic Facility",
            Self::HealthItVendor => "Health IT Vendor",
            Self::Other => "Other",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrganizationKind {
    Vendor,
    Provider,
}

/// API environment a registered organization lives in
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApiEnvironment {
    Sandbox,
    Production,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AddressType {
    Physical,
    Postal,
    Both,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AddressUse {
    Home,
    Work,
    Temp,
    Old,
    Billing,
}

/// FHIR Endpoint.status value set
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FhirEndpointStatus {
    Active,
    Suspended,
    Error,
    Off,
    EnteredInError,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub organization_type: OrganizationType,
    pub npi: Option<String>,
    pub sandbox_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn kind(&self) -> OrganizationKind {
        self.organization_type.kind()
    }

    /// Identifier sent to the API: the sandbox id in prod-sbx, otherwise the NPI
    pub fn external_identifier(&self, deploy: DeployEnvironment) -> Option<&str> {
        if deploy.is_prod_sbx() {
            self.sandbox_id.as_deref()
        } else {
            self.npi.as_deref()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub street_2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub address_type: AddressType,
    pub address_use: AddressUse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FhirEndpoint {
    pub name: String,
    pub status: FhirEndpointStatus,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredOrganization {
    pub id: i32,
    pub organization_id: i32,
    pub api_env: ApiEnvironment,
    pub api_id: String,
    pub fhir_endpoint: FhirEndpoint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalUser {
    pub id: i32,
    pub provider: String,
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: DateTime<Utc>,
}

/// An organization together with its address and registrations
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationProfile {
    pub organization: Organization,
    pub address: Option<Address>,
    pub registered_organizations: Vec<RegisteredOrganization>,
}

impl OrganizationProfile {
    pub fn api_credentialable(&self) -> bool {
        !self.registered_organizations.is_empty()
    }

    pub fn registered_api_envs(&self) -> Vec<ApiEnvironment> {
        self.registered_organizations
            .iter()
            .map(|r| r.api_env)
            .collect()
    }

    pub fn registered_organization(&self, env: ApiEnvironment) -> Option<&RegisteredOrganization> {
        self.registered_organizations
            .iter()
            .find(|r| r.api_env == env)
    }

    pub fn sandbox_enabled(&self) -> bool {
        self.registered_organization(ApiEnvironment::Sandbox)
            .is_some()
    }

    pub fn production_enabled(&self) -> bool {
        self.registered_organization(ApiEnvironment::Production)
            .is_some()
    }

    pub fn sandbox_fhir_endpoint(&self) -> Option<&FhirEndpoint> {
        self.registered_organization(ApiEnvironment::Sandbox)
            .map(|r| &r.fhir_endpoint)
    }

    pub fn production_fhir_endpoint(&self) -> Option<&FhirEndpoint> {
        self.registered_organization(ApiEnvironment::Production)
            .map(|r| &r.fhir_endpoint)
    }

    pub fn address_type(&self) -> Option<AddressType> {
        self.address.as_ref().map(|a| a.address_type)
    }

    pub fn address_use(&self) -> Option<AddressUse> {
        self.address.as_ref().map(|a| a.address_use)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub storage_type: String,
}
