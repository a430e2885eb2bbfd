use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_type", rename_all = "snake_case")]
pub enum UserType {
    Individual,
    Hospital,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Individual => "individual",
            UserType::Hospital => "hospital",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Donor,
    Seeker,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Donor => "donor",
            UserRole::Seeker => "seeker",
        }
    }
}

/// The eight ABO/Rh groups. Matching is exact equality; no donor-compatibility
/// matrix is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "blood_group")]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    #[sqlx(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    #[sqlx(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    #[sqlx(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    #[sqlx(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    #[sqlx(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    #[sqlx(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    #[sqlx(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    #[sqlx(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

/// Declared in ascending severity so the matching Postgres enum sorts
/// critical > high > medium > low under `ORDER BY urgency DESC`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "urgency", rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Active,
    Fulfilled,
    Cancelled,
    Expired,
}

impl RequestStatus {
    /// Draft and active requests may still be edited or transitioned;
    /// fulfilled, cancelled and expired are frozen.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Draft | RequestStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Active => "active",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "donation_status", rename_all = "snake_case")]
pub enum DonationStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Scheduled => "scheduled",
            DonationStatus::Completed => "completed",
            DonationStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
pub enum NotificationType {
    DonationRequest,
    DonationConfirmed,
    RequestFulfilled,
    General,
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error")]
    Internal,
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blood_group_serde_uses_clinical_labels() {
        let g: BloodGroup = serde_json::from_str("\"O-\"").unwrap();
        assert_eq!(g, BloodGroup::ONegative);
        assert_eq!(
            serde_json::to_string(&BloodGroup::AbPositive).unwrap(),
            "\"AB+\""
        );
    }

    #[test]
    fn unknown_blood_group_is_rejected() {
        assert!(serde_json::from_str::<BloodGroup>("\"C+\"").is_err());
    }

    #[test]
    fn urgency_orders_by_severity() {
        assert!(Urgency::Critical > Urgency::High);
        assert!(Urgency::High > Urgency::Medium);
        assert!(Urgency::Medium > Urgency::Low);
    }

    #[test]
    fn request_status_openness() {
        assert!(RequestStatus::Draft.is_open());
        assert!(RequestStatus::Active.is_open());
        assert!(!RequestStatus::Fulfilled.is_open());
        assert!(!RequestStatus::Cancelled.is_open());
        assert!(!RequestStatus::Expired.is_open());
    }

    #[test]
    fn snake_case_wire_labels() {
        assert_eq!(
            serde_json::to_string(&UserType::Individual).unwrap(),
            "\"individual\""
        );
        assert_eq!(serde_json::to_string(&Urgency::Critical).unwrap(), "\"critical\"");
        assert_eq!(
            serde_json::to_string(&NotificationType::RequestFulfilled).unwrap(),
            "\"request_fulfilled\""
        );
    }
}
