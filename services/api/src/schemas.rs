use chrono::{DateTime, NaiveDate, Utc};
use common::{BloodGroup, DonationStatus, RequestStatus, Urgency, UserRole, UserType};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Digits with an optional leading `+`, 8-15 digits total.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

fn validate_digits(code: &str) -> Result<(), ValidationError> {
    if code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("digits"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_register"))]
pub struct RegisterInput {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub user_type: UserType,
    pub role: Option<UserRole>,
    pub blood_group: Option<BloodGroup>,
    #[validate(length(min = 1, max = 200))]
    pub hospital_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub hospital_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
}

fn validate_register(input: &RegisterInput) -> Result<(), ValidationError> {
    match input.user_type {
        UserType::Individual if input.role.is_none() => {
            Err(ValidationError::new("role_required_for_individuals"))
        }
        UserType::Hospital if input.hospital_name.is_none() => {
            Err(ValidationError::new("hospital_name_required"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpInput {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OtpLoginInput {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(equal = 6), custom(function = "validate_digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordInput {
    pub current_password: Option<String>,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub blood_group: Option<BloodGroup>,
    #[validate(length(min = 1, max = 200))]
    pub hospital_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[validate(range(min = 30.0, max = 300.0))]
    pub weight_kg: Option<f64>,
    pub medications: Option<String>,
    pub last_donation_date: Option<NaiveDate>,
    pub available: Option<bool>,
    #[validate(range(min = 0, max = 1000))]
    pub max_travel_km: Option<i32>,
    pub is_smoker: Option<bool>,
    pub has_chronic_disease: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestInput {
    #[validate(length(min = 1, max = 120))]
    pub patient_name: String,
    pub blood_group: BloodGroup,
    #[validate(range(min = 1, max = 20))]
    pub units_needed: i32,
    pub urgency: Urgency,
    #[validate(length(min = 1, max = 200))]
    pub hospital_name: String,
    pub hospital_address: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub contact_number: String,
    pub description: Option<String>,
    /// Only draft or active are accepted as an initial status.
    pub status: Option<RequestStatus>,
    pub required_by: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRequestInput {
    #[validate(length(min = 1, max = 120))]
    pub patient_name: Option<String>,
    pub blood_group: Option<BloodGroup>,
    #[validate(range(min = 1, max = 20))]
    pub units_needed: Option<i32>,
    pub urgency: Option<Urgency>,
    #[validate(length(min = 1, max = 200))]
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub contact_number: Option<String>,
    pub description: Option<String>,
    pub required_by: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RequestStatusInput {
    pub status: RequestStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDonationInput {
    pub request_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub hospital_name: String,
    pub donation_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 10))]
    pub units: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDonationInput {
    #[validate(length(min = 1, max = 200))]
    pub hospital_name: Option<String>,
    pub donation_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 10))]
    pub units: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DonationStatusInput {
    pub status: DonationStatus,
}

#[derive(Debug, Deserialize)]
pub struct DonorFilter {
    pub blood_group: Option<BloodGroup>,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DonorSearch {
    pub blood_group: Option<BloodGroup>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnreadFilter {
    pub unread: Option<bool>,
}
