use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::AppError;

/// Fallback shown when a document has no usable `displayName`
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Review status of an applicant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    #[default]
    Pending,
}

impl UserStatus {
    /// Selector order used by the detail view
    pub const ALL: [UserStatus; 3] = [UserStatus::Active, UserStatus::Inactive, UserStatus::Pending];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Pending => "pending",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
            UserStatus::Pending => "Pending",
        }
    }

    /// Badge style the dashboard uses for this status
    pub fn badge_variant(&self) -> &'static str {
        match self {
            UserStatus::Active => "default",
            UserStatus::Inactive => "secondary",
            UserStatus::Pending => "destructive",
        }
    }

    /// Maps whatever the store holds onto the enum; anything unrecognized is `Pending`
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "pending" => Ok(UserStatus::Pending),
            other => Err(AppError::InvalidRequest(format!("Unknown status '{}'", other))),
        }
    }
}

/// Answer to "do you have a plan without funding?"
///
/// Stored upstream as free text. Only the leading word decides the answer so
/// that "yes, partially" and "Yes." are both `Yes`, while prose that merely
/// contains the letters "yes" somewhere is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FundingPlan {
    Yes,
    No,
    Unspecified,
}

impl FundingPlan {
    pub fn classify(answer: &str) -> Self {
        let first_word = answer
            .trim()
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            .map(|w| w.to_lowercase());

        match first_word.as_deref() {
            Some("yes") | Some("y") | Some("true") => FundingPlan::Yes,
            Some("no") | Some("n") | Some("false") | Some("none") => FundingPlan::No,
            _ => FundingPlan::Unspecified,
        }
    }

    /// A "yes" is highlighted for the reviewer
    pub fn needs_attention(&self) -> bool {
        matches!(self, FundingPlan::Yes)
    }
}

/// A document exactly as the store returned it
#[derive(Debug, Clone, PartialEq)]
pub struct RawUserDocument {
    pub id: String,
    pub data: Document,
}

impl RawUserDocument {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Self { id: id.into(), data }
    }

    /// Splits `_id` off a MongoDB document. Documents without an id are skipped.
    pub fn from_document(mut doc: Document) -> Option<Self> {
        let id = match doc.remove("_id")? {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s,
            other => other.to_string(),
        };
        Some(Self { id, data: doc })
    }
}

/// Normalized applicant record; no field is ever missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub phone_number: String,
    pub funding_use: String,
    pub future_vision: String,
    pub problem_solving: String,
    pub personal_experience: String,
    pub unique_solution: String,
    pub validation: String,
    pub no_funding_plan: String,
    pub status: UserStatus,
    pub join_date: String,
}

impl UserRecord {
    /// Substitutes the documented defaults for anything absent, empty or of the wrong type.
    /// `now` is used when the document carries no `updatedAt`.
    pub fn from_raw(raw: &RawUserDocument, now: DateTime<Utc>) -> Self {
        let data = &raw.data;
        UserRecord {
            id: raw.id.clone(),
            display_name: text_field(data, "displayName")
                .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
            email: text_field(data, "email").unwrap_or_default(),
            phone_number: text_field(data, "phoneNumber").unwrap_or_default(),
            funding_use: text_field(data, "fundingUse").unwrap_or_default(),
            future_vision: text_field(data, "futureVision").unwrap_or_default(),
            problem_solving: text_field(data, "problemSolving").unwrap_or_default(),
            personal_experience: text_field(data, "personalExperience").unwrap_or_default(),
            unique_solution: text_field(data, "uniqueSolution").unwrap_or_default(),
            validation: text_field(data, "validation").unwrap_or_default(),
            no_funding_plan: text_field(data, "noFundingPlan").unwrap_or_default(),
            status: UserStatus::normalize(text_field(data, "status").as_deref()),
            join_date: join_date(data)
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    /// `term` must already be lowercase
    pub fn matches_search(&self, term: &str) -> bool {
        self.display_name.to_lowercase().contains(term) || self.email.to_lowercase().contains(term)
    }

    pub fn funding_plan(&self) -> FundingPlan {
        FundingPlan::classify(&self.no_funding_plan)
    }
}

/// Normalizes a whole snapshot with a single timestamp for missing join dates
pub fn normalize_all(docs: &[RawUserDocument]) -> Vec<UserRecord> {
    let now = Utc::now();
    docs.iter().map(|raw| UserRecord::from_raw(raw, now)).collect()
}

fn text_field(data: &Document, key: &str) -> Option<String> {
    match data.get(key) {
        Some(Bson::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn join_date(data: &Document) -> Option<String> {
    match data.get("updatedAt") {
        Some(Bson::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Bson::DateTime(dt)) => dt.try_to_rfc3339_string().ok(),
        _ => None,
    }
}
